//! Terminal panel for multi-instance Jira work: project tabs with
//! activity-based ordering, per-instance toggles, streaming AI issue
//! analysis, JQL search, and AI summaries.
//!
//! All interaction state lives in pure models ([`app::App`] and the
//! modules it composes); the binary owns the terminal and the event
//! loop and nothing else.

pub mod announce;
pub mod app;
pub mod panel;
pub mod projects;
pub mod tabs;
