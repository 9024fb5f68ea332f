//! Panel service trait — the primary abstraction for backend operations.
//!
//! Implementations can run against the real panel backend over HTTP or be
//! mocked for testing. Streaming analysis reports progress through the
//! fan-out log and terminates on the first `result`/`error` channel.

use async_trait::async_trait;

use crate::error::PanelError;
use crate::fanout::{FanOutLog, InstanceOp, InstanceReply};
use crate::types::{
    AnalyzeRequest, Instance, MaskKind, NewProject, ProjectsReply, SearchReply, UiState,
};

/// The panel service interface.
#[async_trait]
pub trait PanelService: Send + Sync {
    /// Session/state query used at boot.
    async fn ui_state(&self) -> Result<UiState, PanelError>;

    /// Lists the configured remote Jira instances.
    async fn list_instances(&self) -> Result<Vec<Instance>, PanelError>;

    /// Fetches the tracked project lists.
    async fn list_projects(&self) -> Result<ProjectsReply, PanelError>;

    /// Triggers a server-side sync, then returns the refreshed lists.
    async fn refresh_projects(&self) -> Result<ProjectsReply, PanelError>;

    /// Creates (or re-adds) a tracked project.
    async fn add_project(&self, project: NewProject) -> Result<(), PanelError>;

    /// Masks a project with the given reason.
    async fn mask_project(
        &self,
        project_key: &str,
        cloud_id: Option<&str>,
        mask: MaskKind,
    ) -> Result<(), PanelError>;

    /// Streams an AI analysis of one issue on one instance. Failures are
    /// inert — they come back as a reply, never as an `Err`.
    async fn analyze_issue(
        &self,
        instance: &Instance,
        request: &AnalyzeRequest,
        log: &mut FanOutLog<'_>,
    ) -> InstanceReply;

    /// Runs a JQL search on one instance.
    async fn search_jql(&self, instance: &Instance, jql: &str) -> Result<SearchReply, PanelError>;

    /// Asks for a plain-text AI summary of a JQL result on one instance.
    async fn summarize_jql(
        &self,
        instance: &Instance,
        jql: &str,
        max_results: u32,
    ) -> Result<String, PanelError>;
}

/// Adapter exposing `analyze_issue` as a fan-out operation.
pub struct AnalyzeOp<'a> {
    service: &'a dyn PanelService,
    request: AnalyzeRequest,
}

impl<'a> AnalyzeOp<'a> {
    pub fn new(service: &'a dyn PanelService, request: AnalyzeRequest) -> Self {
        Self { service, request }
    }
}

#[async_trait]
impl InstanceOp for AnalyzeOp<'_> {
    async fn invoke(&self, instance: &Instance, log: &mut FanOutLog<'_>) -> InstanceReply {
        self.service.analyze_issue(instance, &self.request, log).await
    }
}
