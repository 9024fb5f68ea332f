//! jlens-core: shared configuration for the jlens panel.
//!
//! Holds the root configuration struct with defaults, validation, YAML
//! file loading, environment variable overrides, and the standard config
//! search paths.

pub mod config;

pub use config::{Config, ServerConfig, SessionConfig, TuiConfig};
