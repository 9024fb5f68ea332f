//! jlens-client: backend client for the jlens panel.
//!
//! Provides a transport-agnostic `PanelService` trait with implementations
//! for:
//! - `HttpPanelService`: reqwest-backed service talking to the panel backend
//! - `MockPanelService`: configurable mock for unit testing
//!
//! plus the multi-instance core: the known-instance registry, the
//! incremental event-stream parser, and the fan-out reducer that combines
//! per-instance successes and failures into one outcome.

pub mod error;
pub mod fanout;
pub mod http;
pub mod mock;
pub mod registry;
pub mod rest;
pub mod service;
pub mod sse;
pub mod types;

pub use error::PanelError;
pub use fanout::{
    fan_out, fan_out_collect, CollectOutcome, FanOutLog, FanOutOutcome, InstanceOp, InstanceReply,
};
pub use registry::InstanceRegistry;
pub use rest::HttpPanelService;
pub use service::{AnalyzeOp, PanelService};
pub use types::{
    AnalyzeMode, AnalyzeRequest, Instance, MaskKind, NewProject, Project, ProjectsReply,
    SearchReply, UiState,
};
