//! Mock panel service for unit testing.
//!
//! Records all calls and returns pre-configured responses. Project
//! mutations (add/mask) are applied to the stored project lists so
//! mutate-then-reload flows behave like the real backend.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::PanelError;
use crate::fanout::{FanOutLog, InstanceReply};
use crate::service::PanelService;
use crate::types::{
    AnalyzeRequest, Instance, MaskKind, NewProject, Project, ProjectsReply, SearchReply, UiState,
};

/// A recorded call to the mock service.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    UiState,
    ListInstances,
    ListProjects,
    RefreshProjects,
    AddProject(NewProject),
    MaskProject {
        project_key: String,
        cloud_id: Option<String>,
        mask: MaskKind,
    },
    AnalyzeIssue {
        instance_id: String,
        issue_key: String,
    },
    SearchJql {
        instance_id: String,
        jql: String,
    },
    SummarizeJql {
        instance_id: String,
        jql: String,
    },
}

/// Scripted streaming analysis for one instance: log lines pushed before
/// the terminal reply.
#[derive(Debug, Clone)]
pub struct AnalyzeScript {
    pub log_lines: Vec<String>,
    pub reply: InstanceReply,
}

impl AnalyzeScript {
    pub fn result(text: &str) -> Self {
        Self {
            log_lines: Vec::new(),
            reply: InstanceReply::Result(text.to_string()),
        }
    }

    pub fn failure(code: Option<u16>, message: &str) -> Self {
        Self {
            log_lines: Vec::new(),
            reply: InstanceReply::Failure {
                code,
                message: message.to_string(),
            },
        }
    }

    pub fn with_log(mut self, line: &str) -> Self {
        self.log_lines.push(line.to_string());
        self
    }
}

/// Mock implementation of `PanelService` for testing.
pub struct MockPanelService {
    ui_state: Mutex<Result<UiState, PanelError>>,
    instances: Mutex<Result<Vec<Instance>, PanelError>>,
    projects: Mutex<Result<ProjectsReply, PanelError>>,
    analyze: Mutex<HashMap<String, AnalyzeScript>>,
    searches: Mutex<HashMap<String, Result<SearchReply, PanelError>>>,
    summaries: Mutex<HashMap<String, Result<String, PanelError>>>,
    calls: Mutex<Vec<MockCall>>,
}

fn locked<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl Default for MockPanelService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPanelService {
    pub fn new() -> Self {
        Self {
            ui_state: Mutex::new(Ok(UiState {
                logged_in: true,
                logout_url: Some("/logout".to_string()),
            })),
            instances: Mutex::new(Ok(Vec::new())),
            projects: Mutex::new(Ok(ProjectsReply::default())),
            analyze: Mutex::new(HashMap::new()),
            searches: Mutex::new(HashMap::new()),
            summaries: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_ui_state(self, state: Result<UiState, PanelError>) -> Self {
        *locked(&self.ui_state) = state;
        self
    }

    pub fn with_instances(self, instances: Vec<Instance>) -> Self {
        *locked(&self.instances) = Ok(instances);
        self
    }

    pub fn with_instances_error(self, err: PanelError) -> Self {
        *locked(&self.instances) = Err(err);
        self
    }

    pub fn with_projects(self, reply: ProjectsReply) -> Self {
        *locked(&self.projects) = Ok(reply);
        self
    }

    pub fn with_projects_error(self, err: PanelError) -> Self {
        *locked(&self.projects) = Err(err);
        self
    }

    pub fn with_analyze(self, instance_id: &str, script: AnalyzeScript) -> Self {
        locked(&self.analyze).insert(instance_id.to_string(), script);
        self
    }

    pub fn with_search(self, instance_id: &str, reply: Result<SearchReply, PanelError>) -> Self {
        locked(&self.searches).insert(instance_id.to_string(), reply);
        self
    }

    pub fn with_summary(self, instance_id: &str, reply: Result<String, PanelError>) -> Self {
        locked(&self.summaries).insert(instance_id.to_string(), reply);
        self
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        locked(&self.calls).clone()
    }

    fn record(&self, call: MockCall) {
        locked(&self.calls).push(call);
    }
}

fn same_slot(project: &Project, key: &str, cloud_id: Option<&str>) -> bool {
    project.project_key == key && project.cloud_id.as_deref() == cloud_id
}

#[async_trait]
impl PanelService for MockPanelService {
    async fn ui_state(&self) -> Result<UiState, PanelError> {
        self.record(MockCall::UiState);
        locked(&self.ui_state).clone()
    }

    async fn list_instances(&self) -> Result<Vec<Instance>, PanelError> {
        self.record(MockCall::ListInstances);
        locked(&self.instances).clone()
    }

    async fn list_projects(&self) -> Result<ProjectsReply, PanelError> {
        self.record(MockCall::ListProjects);
        locked(&self.projects).clone()
    }

    async fn refresh_projects(&self) -> Result<ProjectsReply, PanelError> {
        self.record(MockCall::RefreshProjects);
        locked(&self.projects).clone()
    }

    async fn add_project(&self, project: NewProject) -> Result<(), PanelError> {
        self.record(MockCall::AddProject(project.clone()));
        let mut stored = locked(&self.projects);
        if let Ok(reply) = stored.as_mut() {
            reply.inactive_projects.retain(|candidate| {
                !same_slot(
                    candidate,
                    &project.project_key,
                    project.cloud_id.as_deref(),
                )
            });
            reply.projects.push(Project {
                cloud_id: project.cloud_id.clone(),
                project_key: project.project_key.clone(),
                project_name: Some(project.project_name.clone()),
                source: Some(project.source.clone()),
                is_active: project.is_active,
                mask_type: None,
                story_etude_open_assigned_count: None,
                story_open_assigned_count: None,
                etude_open_assigned_count: None,
            });
        }
        Ok(())
    }

    async fn mask_project(
        &self,
        project_key: &str,
        cloud_id: Option<&str>,
        mask: MaskKind,
    ) -> Result<(), PanelError> {
        self.record(MockCall::MaskProject {
            project_key: project_key.to_string(),
            cloud_id: cloud_id.map(str::to_string),
            mask,
        });
        let mut stored = locked(&self.projects);
        if let Ok(reply) = stored.as_mut() {
            for project in reply
                .projects
                .iter_mut()
                .chain(reply.inactive_projects.iter_mut())
            {
                if same_slot(project, project_key, cloud_id) {
                    project.mask_type = Some(mask.as_str().to_string());
                }
            }
        }
        Ok(())
    }

    async fn analyze_issue(
        &self,
        instance: &Instance,
        request: &AnalyzeRequest,
        log: &mut FanOutLog<'_>,
    ) -> InstanceReply {
        self.record(MockCall::AnalyzeIssue {
            instance_id: instance.id.clone(),
            issue_key: request.issue_key.clone(),
        });
        let script = locked(&self.analyze).get(&instance.id).cloned();
        match script {
            Some(script) => {
                for line in &script.log_lines {
                    log.push(line.clone());
                }
                script.reply
            }
            None => InstanceReply::Failure {
                code: None,
                message: "unscripted instance".to_string(),
            },
        }
    }

    async fn search_jql(&self, instance: &Instance, jql: &str) -> Result<SearchReply, PanelError> {
        self.record(MockCall::SearchJql {
            instance_id: instance.id.clone(),
            jql: jql.to_string(),
        });
        locked(&self.searches)
            .get(&instance.id)
            .cloned()
            .unwrap_or_else(|| Ok(SearchReply::default()))
    }

    async fn summarize_jql(
        &self,
        instance: &Instance,
        jql: &str,
        _max_results: u32,
    ) -> Result<String, PanelError> {
        self.record(MockCall::SummarizeJql {
            instance_id: instance.id.clone(),
            jql: jql.to_string(),
        });
        locked(&self.summaries)
            .get(&instance.id)
            .cloned()
            .unwrap_or_else(|| Ok(String::new()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::{AnalyzeScript, MockCall, MockPanelService};
    use crate::fanout::{FanOutLog, InstanceReply};
    use crate::service::PanelService;
    use crate::types::{AnalyzeMode, AnalyzeRequest, Instance, MaskKind, NewProject, Project, ProjectsReply};

    fn site(id: &str) -> Instance {
        Instance {
            id: id.to_string(),
            name: None,
            url: None,
        }
    }

    fn project(key: &str) -> Project {
        Project {
            cloud_id: None,
            project_key: key.to_string(),
            project_name: None,
            source: None,
            is_active: true,
            mask_type: None,
            story_etude_open_assigned_count: None,
            story_open_assigned_count: None,
            etude_open_assigned_count: None,
        }
    }

    #[tokio::test]
    async fn analyze_pushes_scripted_log_lines() {
        let mock = MockPanelService::new().with_analyze(
            "a",
            AnalyzeScript::result("done").with_log("fetching issue"),
        );
        let mut log = FanOutLog::new();
        let request = AnalyzeRequest {
            issue_key: "X-1".to_string(),
            mode: AnalyzeMode::Quick,
        };
        let reply = mock.analyze_issue(&site("a"), &request, &mut log).await;
        assert_eq!(reply, InstanceReply::Result("done".to_string()));
        assert_eq!(log.lines(), ["fetching issue"]);
        assert!(matches!(
            mock.calls().as_slice(),
            [MockCall::AnalyzeIssue { .. }]
        ));
    }

    #[tokio::test]
    async fn mask_then_reload_shows_masked_project() {
        let mock = MockPanelService::new().with_projects(ProjectsReply {
            projects: vec![project("ABC")],
            inactive_projects: Vec::new(),
            last_synced_at: None,
        });

        mock.mask_project("ABC", None, MaskKind::Temporary)
            .await
            .unwrap();
        let reply = mock.list_projects().await.unwrap();
        assert_eq!(reply.projects[0].mask_type.as_deref(), Some("temporary"));
        assert!(reply.projects[0].is_masked());
    }

    #[tokio::test]
    async fn add_moves_project_out_of_inactive() {
        let mock = MockPanelService::new().with_projects(ProjectsReply {
            projects: Vec::new(),
            inactive_projects: vec![project("XY")],
            last_synced_at: None,
        });

        mock.add_project(NewProject::manual("XY", "XY project"))
            .await
            .unwrap();
        let reply = mock.list_projects().await.unwrap();
        assert!(reply.inactive_projects.is_empty());
        assert_eq!(reply.projects[0].project_key, "XY");
    }
}
