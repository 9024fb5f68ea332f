//! Configuration types for the jlens panel.
//!
//! Root configuration struct and nested section types with full defaults,
//! validation, YAML file loading, and environment variable overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

// ---------------------------------------------------------------------------
// Root config
// ---------------------------------------------------------------------------

/// Root configuration for the jlens panel.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub tui: TuiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            session: SessionConfig::default(),
            tui: TuiConfig::default(),
        }
    }
}

impl Config {
    /// Validates the entire configuration, returning an error message on failure.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.base_url.trim().is_empty() {
            return Err("server.base_url is required".into());
        }
        if !self.server.base_url.starts_with("http://") && !self.server.base_url.starts_with("https://")
        {
            return Err(format!(
                "server.base_url must start with http:// or https:// (got {:?})",
                self.server.base_url
            ));
        }
        if self.server.request_timeout_secs == 0 {
            return Err("server.request_timeout_secs must be positive".into());
        }
        if self.session.cookie_name.trim().is_empty() {
            return Err("session.cookie_name is required".into());
        }
        if self.tui.status_lines == 0 {
            return Err("tui.status_lines must be positive".into());
        }
        Ok(())
    }

    /// Effective request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Effective announce debounce as a `Duration`.
    pub fn announce_delay(&self) -> Duration {
        Duration::from_millis(self.tui.announce_delay_ms)
    }

    /// Session cookie header value, `None` when no session value is set.
    pub fn session_cookie(&self) -> Option<String> {
        if self.session.cookie_value.is_empty() {
            return None;
        }
        Some(format!(
            "{}={}",
            self.session.cookie_name, self.session.cookie_value
        ))
    }

    /// Loads configuration from the standard search paths, then applies
    /// environment overrides. Missing config file yields the defaults.
    pub fn load() -> Result<Self, String> {
        let mut cfg = match find_config_file() {
            Some(path) => Self::load_from_path(&path)?,
            None => Self::default(),
        };
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Loads configuration from an explicit YAML file.
    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| format!("read config {}: {err}", path.display()))?;
        serde_yaml::from_str(&raw)
            .map_err(|err| format!("parse config {}: {err}", path.display()))
    }

    /// Applies `JLENS_*` environment variable overrides on top of file values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("JLENS_BASE_URL") {
            if !url.trim().is_empty() {
                self.server.base_url = url;
            }
        }
        if let Ok(session) = std::env::var("JLENS_SESSION") {
            if !session.trim().is_empty() {
                self.session.cookie_value = session;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Backend panel server settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the panel backend, e.g. `http://127.0.0.1:8080`.
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Session credential forwarded with every request.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub cookie_value: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "jlens_session".to_string(),
            cookie_value: String::new(),
        }
    }
}

/// Terminal panel settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TuiConfig {
    /// Number of lines reserved for the status/log region.
    pub status_lines: usize,
    /// Debounce applied before a status announcement becomes visible.
    pub announce_delay_ms: u64,
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            status_lines: 8,
            announce_delay_ms: 50,
        }
    }
}

// ---------------------------------------------------------------------------
// File discovery
// ---------------------------------------------------------------------------

/// Search for a configuration file in the standard locations.
/// Returns `None` if no config file is found.
pub fn find_config_file() -> Option<PathBuf> {
    for dir in config_search_paths() {
        let candidate = dir.join("config.yaml");
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Returns the list of directories to search for config files.
fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        paths.push(Path::new(&xdg).join("jlens"));
    }

    let home = home_dir();
    if home.as_os_str() != "" {
        paths.push(home.join(".config/jlens"));
    }

    paths.push(PathBuf::from("."));

    paths
}

/// Get the user's home directory, falling back to `/` on failure.
fn home_dir() -> PathBuf {
    #[allow(deprecated)]
    std::env::home_dir().unwrap_or_else(|| PathBuf::from("/"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.server.base_url, "http://127.0.0.1:8080");
        assert_eq!(cfg.server.request_timeout_secs, 30);
        assert_eq!(cfg.session.cookie_name, "jlens_session");
        assert_eq!(cfg.tui.status_lines, 8);
        assert_eq!(cfg.tui.announce_delay_ms, 50);
    }

    #[test]
    fn config_default_validates() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok(), "default config must validate");
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let mut cfg = Config::default();
        cfg.server.base_url = "ftp://panel".to_string();
        assert!(cfg.validate().is_err());

        cfg.server.base_url = String::new();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout_and_status_lines() {
        let mut cfg = Config::default();
        cfg.server.request_timeout_secs = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.tui.status_lines = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn yaml_parse_with_partial_sections() {
        let raw = "server:\n  base_url: https://jira-panel.internal\ntui:\n  status_lines: 12\n";
        let cfg: Config = serde_yaml::from_str(raw).unwrap();
        assert_eq!(cfg.server.base_url, "https://jira-panel.internal");
        assert_eq!(cfg.server.request_timeout_secs, 30);
        assert_eq!(cfg.tui.status_lines, 12);
        assert_eq!(cfg.session.cookie_value, "");
    }

    #[test]
    fn session_cookie_requires_value() {
        let mut cfg = Config::default();
        assert_eq!(cfg.session_cookie(), None);
        cfg.session.cookie_value = "abc123".to_string();
        assert_eq!(cfg.session_cookie().as_deref(), Some("jlens_session=abc123"));
    }
}
