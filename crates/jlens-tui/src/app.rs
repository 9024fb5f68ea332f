//! App shell and state model for the jlens panel.
//!
//! Owns the instance registry, project view state, tab focus, announcer,
//! and the status/output regions. Key handling is a pure state transition
//! returning a command; the async command runner performs the backend
//! calls. All shared state is mutated only between awaits on the single
//! control thread, and every fan-out captures its active-instance
//! snapshot at start so later toggles cannot change an in-flight run.

use std::time::{Duration, Instant};

use jlens_client::fanout::{fan_out, fan_out_collect, FanOutLog, FanOutOutcome};
use jlens_client::registry::InstanceRegistry;
use jlens_client::service::{AnalyzeOp, PanelService};
use jlens_client::types::{AnalyzeMode, AnalyzeRequest, MaskKind, NewProject};
use jlens_client::PanelError;

use crate::announce::Announcer;
use crate::panel::{render_panel, PanelView};
use crate::projects::{ProjectFilter, ProjectViewState};
use crate::tabs::{resolve_focus_after_render, FocusTarget, TabStrip};

/// Terminal-agnostic key input, mapped from crossterm in the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Char(char),
    Enter,
    Esc,
    Backspace,
    Left,
    Right,
}

/// Which text field is being edited, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Browse,
    EditIssue,
    EditJql,
    EditAdd,
}

/// Deferred work produced by a key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    None,
    Quit,
    Analyze(AnalyzeMode),
    Search,
    Summarize,
    Refresh,
    Mask(MaskKind),
    Readd,
    AddProject,
}

/// Control flow after an async command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterCommand {
    Continue,
    LoginRequired,
}

/// Outcome of the boot sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootOutcome {
    Ready,
    LoginRequired,
    Halted(String),
}

const SUMMARY_MAX_RESULTS: u32 = 20;

pub struct App {
    pub registry: InstanceRegistry,
    pub view: ProjectViewState,
    pub tabs: TabStrip,
    announcer: Announcer,
    status_lines: usize,
    pub mode: InputMode,
    pub issue_input: String,
    pub jql_input: String,
    pub add_input: String,
    pub status: Vec<String>,
    pub output: Vec<String>,
    pub logged_in: bool,
}

impl App {
    pub fn new(announce_delay: Duration, status_lines: usize) -> Self {
        Self {
            registry: InstanceRegistry::new(),
            view: ProjectViewState::new(),
            tabs: TabStrip::new(),
            announcer: Announcer::new(announce_delay),
            status_lines: status_lines.max(1),
            mode: InputMode::Browse,
            issue_input: String::new(),
            jql_input: String::new(),
            add_input: String::new(),
            status: Vec::new(),
            output: Vec::new(),
            logged_in: false,
        }
    }

    // -- boot ---------------------------------------------------------------

    /// Boot sequence: session state, instance list, initial project sync.
    /// An unreachable state endpoint halts initialization after logging;
    /// a logged-out session or an empty instance list requires login.
    pub async fn boot(&mut self, service: &dyn PanelService) -> BootOutcome {
        match service.ui_state().await {
            Err(err) => {
                self.status.push(format!("Failed to load panel state: {err}"));
                return BootOutcome::Halted(err.to_string());
            }
            Ok(state) if !state.logged_in => return BootOutcome::LoginRequired,
            Ok(_) => self.logged_in = true,
        }

        match service.list_instances().await {
            Ok(sites) if !sites.is_empty() => self.registry.replace(sites),
            _ => return BootOutcome::LoginRequired,
        }

        if self.reload(service, true).await == AfterCommand::LoginRequired {
            return BootOutcome::LoginRequired;
        }
        self.announce("Projects loaded.");
        BootOutcome::Ready
    }

    // -- key handling -------------------------------------------------------

    pub fn update(&mut self, key: KeyInput) -> AppCommand {
        match self.mode {
            InputMode::Browse => self.update_browse(key),
            _ => self.update_editing(key),
        }
    }

    fn update_browse(&mut self, key: KeyInput) -> AppCommand {
        match key {
            KeyInput::Char('q') => AppCommand::Quit,
            KeyInput::Char('i') => {
                self.mode = InputMode::EditIssue;
                AppCommand::None
            }
            KeyInput::Char('j') => {
                self.mode = InputMode::EditJql;
                AppCommand::None
            }
            KeyInput::Char('n') => {
                self.mode = InputMode::EditAdd;
                self.add_input.clear();
                AppCommand::None
            }
            KeyInput::Char('f') => {
                self.view.set_filter(self.view.filter.next());
                self.tabs.clear();
                self.reconcile();
                let count = self.current_len();
                self.announce(format!(
                    "{} filter applied, {count} projects.",
                    self.view.filter.label()
                ));
                AppCommand::None
            }
            KeyInput::Char('o') => {
                self.view.toggle_inactive_open();
                AppCommand::None
            }
            KeyInput::Char('a') => AppCommand::Analyze(AnalyzeMode::Quick),
            KeyInput::Char('d') => AppCommand::Analyze(AnalyzeMode::Detail),
            KeyInput::Char('s') => AppCommand::Search,
            KeyInput::Char('y') => AppCommand::Summarize,
            KeyInput::Char('r') => AppCommand::Refresh,
            KeyInput::Char('m') => AppCommand::Mask(MaskKind::Temporary),
            KeyInput::Char('M') => AppCommand::Mask(MaskKind::Definitive),
            KeyInput::Char('e') => AppCommand::Readd,
            KeyInput::Char(digit @ '1'..='9') => {
                let idx = digit as usize - '1' as usize;
                if let Some(id) = self.registry.known().get(idx).map(|s| s.id.clone()) {
                    self.registry.toggle(&id);
                    self.reconcile();
                }
                AppCommand::None
            }
            KeyInput::Left => {
                let len = self.current_len();
                self.tabs.focus_prev(len);
                AppCommand::None
            }
            KeyInput::Right => {
                let len = self.current_len();
                self.tabs.focus_next(len);
                AppCommand::None
            }
            KeyInput::Enter | KeyInput::Char(' ') => {
                self.select_reachable_tab();
                AppCommand::None
            }
            _ => AppCommand::None,
        }
    }

    fn update_editing(&mut self, key: KeyInput) -> AppCommand {
        match key {
            KeyInput::Esc => {
                self.mode = InputMode::Browse;
                AppCommand::None
            }
            KeyInput::Enter => {
                let mode = std::mem::take(&mut self.mode);
                match mode {
                    InputMode::EditIssue => AppCommand::Analyze(AnalyzeMode::Quick),
                    InputMode::EditAdd => AppCommand::AddProject,
                    _ => AppCommand::None,
                }
            }
            KeyInput::Backspace => {
                if let Some(buffer) = self.edit_buffer() {
                    buffer.pop();
                }
                AppCommand::None
            }
            KeyInput::Char(ch) => {
                if let Some(buffer) = self.edit_buffer() {
                    buffer.push(ch);
                }
                AppCommand::None
            }
            _ => AppCommand::None,
        }
    }

    fn edit_buffer(&mut self) -> Option<&mut String> {
        match self.mode {
            InputMode::EditIssue => Some(&mut self.issue_input),
            InputMode::EditJql => Some(&mut self.jql_input),
            InputMode::EditAdd => Some(&mut self.add_input),
            InputMode::Browse => None,
        }
    }

    fn current_len(&self) -> usize {
        let derived = self.view.derive(self.registry.active_set());
        derived.list(self.view.filter).len()
    }

    fn select_reachable_tab(&mut self) {
        let derived = self.view.derive(self.registry.active_set());
        let current = derived.list(self.view.filter);
        let selected_idx = self.view.selected_idx(current);
        if let Some(idx) = self.tabs.reachable(selected_idx, current.len()) {
            if let Some(project) = current.get(idx) {
                let slot = project.slot_id();
                self.view.select(&slot, true);
            }
        }
    }

    /// Re-derives the partitions and repairs selection and tab focus.
    fn reconcile(&mut self) {
        let derived = self.view.derive(self.registry.active_set());
        let current = derived.list(self.view.filter);
        self.view.repair_selection(current);
        self.tabs.sync(current.len());
    }

    // -- commands -----------------------------------------------------------

    pub async fn run_command(
        &mut self,
        command: AppCommand,
        service: &dyn PanelService,
        on_progress: &mut (dyn FnMut(&str) + Send),
    ) -> AfterCommand {
        match command {
            AppCommand::None | AppCommand::Quit => AfterCommand::Continue,
            AppCommand::Analyze(mode) => {
                self.analyze(mode, service, on_progress).await;
                AfterCommand::Continue
            }
            AppCommand::Search => {
                self.search(service).await;
                AfterCommand::Continue
            }
            AppCommand::Summarize => {
                self.summarize(service).await;
                AfterCommand::Continue
            }
            AppCommand::Refresh => {
                let after = self.reload(service, true).await;
                if after == AfterCommand::Continue {
                    self.announce("Projects refreshed.");
                }
                after
            }
            AppCommand::Mask(kind) => self.mask(kind, service).await,
            AppCommand::Readd => self.readd(service).await,
            AppCommand::AddProject => self.add_project(service).await,
        }
    }

    async fn analyze(
        &mut self,
        mode: AnalyzeMode,
        service: &dyn PanelService,
        on_progress: &mut (dyn FnMut(&str) + Send),
    ) {
        let issue_key = self.issue_input.trim().to_string();
        self.output.clear();
        self.status.clear();
        if issue_key.is_empty() {
            self.status
                .push("Enter an issue key (e.g. ABC-123).".to_string());
            return;
        }

        // Snapshot of the active set; toggles during the run have no effect.
        let targets = self.registry.active_instances();
        if targets.is_empty() {
            self.status
                .push("Enable at least one Jira instance.".to_string());
            return;
        }

        let op = AnalyzeOp::new(service, AnalyzeRequest { issue_key, mode });
        let mut log = FanOutLog::with_observer(on_progress);
        let outcome = fan_out(&targets, &op, &mut log).await;
        self.status = log.into_lines();

        match outcome {
            FanOutOutcome::Success { instance_id, text } => {
                self.output = text.lines().map(str::to_string).collect();
                let label = self.registry.label(&instance_id);
                self.announce(format!("Analysis complete ({label})."));
            }
            failed @ FanOutOutcome::Failed { .. } => {
                if let Some(report) = failed.failure_report() {
                    self.status.push(report);
                }
            }
        }
    }

    async fn search(&mut self, service: &dyn PanelService) {
        let jql = self.jql_input.trim().to_string();
        self.output.clear();
        if jql.is_empty() {
            self.status = vec!["Enter a JQL query.".to_string()];
            return;
        }
        let targets = self.registry.active_instances();
        if targets.is_empty() {
            self.status = vec!["Enable at least one Jira instance.".to_string()];
            return;
        }

        let outcome = fan_out_collect(&targets, |site| {
            let jql = jql.as_str();
            async move { service.search_jql(&site, jql).await }
        })
        .await;

        if outcome.all_failed() {
            self.status = vec![outcome.last_error.unwrap_or_default()];
            return;
        }

        let mut total = 0u64;
        let mut issues = Vec::new();
        for success in outcome.successes {
            total += success.value.effective_total();
            issues.extend(success.value.issues);
        }
        let summary = serde_json::json!({
            "total": total,
            "returned": issues.len(),
            "issues": issues,
        });
        self.output = serde_json::to_string_pretty(&summary)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect();
        self.status.clear();
    }

    async fn summarize(&mut self, service: &dyn PanelService) {
        let jql = self.jql_input.trim().to_string();
        self.output.clear();
        if jql.is_empty() {
            self.status = vec!["Enter a JQL query.".to_string()];
            return;
        }
        let targets = self.registry.active_instances();
        if targets.is_empty() {
            self.status = vec!["Enable at least one Jira instance.".to_string()];
            return;
        }
        self.status = vec!["Running AI summary...".to_string()];

        let outcome = fan_out_collect(&targets, |site| {
            let jql = jql.as_str();
            async move { service.summarize_jql(&site, jql, SUMMARY_MAX_RESULTS).await }
        })
        .await;

        if outcome.all_failed() {
            self.status = vec![outcome.last_error.unwrap_or_default()];
            return;
        }

        self.status.clear();
        if targets.len() == 1 && outcome.successes.len() == 1 {
            let text = &outcome.successes[0].value;
            let text = if text.is_empty() { "(empty reply)" } else { text };
            self.output = text.lines().map(str::to_string).collect();
            return;
        }
        let mut lines = Vec::new();
        for (i, success) in outcome.successes.iter().enumerate() {
            if i > 0 {
                lines.push(String::new());
            }
            lines.push(format!("Instance {}:", success.instance_id));
            lines.extend(success.value.lines().map(str::to_string));
        }
        self.output = lines;
    }

    async fn mask(&mut self, kind: MaskKind, service: &dyn PanelService) -> AfterCommand {
        if self.view.filter != ProjectFilter::Active {
            self.status = vec!["Masking is available on the Active filter only.".to_string()];
            return AfterCommand::Continue;
        }
        let derived = self.view.derive(self.registry.active_set());
        let Some(selected) = self
            .view
            .selected_project(derived.list(ProjectFilter::Active))
            .cloned()
        else {
            return AfterCommand::Continue;
        };

        match service
            .mask_project(&selected.project_key, selected.cloud_id.as_deref(), kind)
            .await
        {
            Ok(()) => {
                let after = self.reload(service, false).await;
                if after == AfterCommand::Continue {
                    self.announce("Project masked.");
                }
                after
            }
            Err(PanelError::Unauthorized) => AfterCommand::LoginRequired,
            Err(err) => {
                self.status = vec![format!("Masking failed: {err}")];
                AfterCommand::Continue
            }
        }
    }

    async fn readd(&mut self, service: &dyn PanelService) -> AfterCommand {
        if self.view.filter != ProjectFilter::Inactive {
            return AfterCommand::Continue;
        }
        let derived = self.view.derive(self.registry.active_set());
        let Some(selected) = self
            .view
            .selected_project(derived.list(ProjectFilter::Inactive))
            .cloned()
        else {
            return AfterCommand::Continue;
        };

        match service.add_project(NewProject::readd(&selected)).await {
            Ok(()) => {
                let after = self.reload(service, false).await;
                if after == AfterCommand::Continue {
                    self.announce("Inactive project re-added.");
                }
                after
            }
            Err(PanelError::Unauthorized) => AfterCommand::LoginRequired,
            Err(err) => {
                self.status = vec![format!("Re-add failed: {err}")];
                AfterCommand::Continue
            }
        }
    }

    async fn add_project(&mut self, service: &dyn PanelService) -> AfterCommand {
        let input = self.add_input.trim().to_string();
        if input.is_empty() {
            return AfterCommand::Continue;
        }
        let (key, name) = match input.split_once(' ') {
            Some((key, name)) => (key.trim(), name.trim()),
            None => (input.as_str(), input.as_str()),
        };

        match service.add_project(NewProject::manual(key, name)).await {
            Ok(()) => {
                self.add_input.clear();
                let after = self.reload(service, false).await;
                if after == AfterCommand::Continue {
                    self.announce("Project added.");
                }
                after
            }
            Err(PanelError::Unauthorized) => AfterCommand::LoginRequired,
            Err(err) => {
                self.status = vec![format!("Adding the project failed: {err}")];
                AfterCommand::Continue
            }
        }
    }

    /// Reloads the project lists (full reload, never optimistic) and
    /// re-establishes the selection invariant.
    async fn reload(&mut self, service: &dyn PanelService, refresh: bool) -> AfterCommand {
        let reply = if refresh {
            service.refresh_projects().await
        } else {
            service.list_projects().await
        };
        match reply {
            Ok(reply) => {
                self.view.apply_reload(reply);
                self.reconcile();
                AfterCommand::Continue
            }
            Err(PanelError::Unauthorized) => AfterCommand::LoginRequired,
            Err(err) => {
                self.status = vec![format!("Failed to load projects: {err}")];
                AfterCommand::Continue
            }
        }
    }

    // -- rendering ----------------------------------------------------------

    pub fn render(&self) -> Vec<String> {
        let derived = self.view.derive(self.registry.active_set());
        // Only the newest status lines fit the status region.
        let status_from = self.status.len().saturating_sub(self.status_lines);
        let panel = PanelView {
            logged_in: self.logged_in,
            registry: &self.registry,
            view: &self.view,
            derived: &derived,
            tabs: &self.tabs,
            status: &self.status[status_from..],
            announcement: self.announcer.current(),
            output: &self.output,
        };
        let mut lines = render_panel(&panel);
        lines.push(String::new());
        lines.push(self.input_line("Issue", &self.issue_input, InputMode::EditIssue));
        lines.push(self.input_line("JQL", &self.jql_input, InputMode::EditJql));
        if self.mode == InputMode::EditAdd {
            lines.push(self.input_line("Add project", &self.add_input, InputMode::EditAdd));
        }
        lines.push(
            "keys: a analyze  d detail  s search  y summary  i issue  j jql  n add  r refresh  \
             f filter  m/M mask  e re-add  o inactive  1-9 instances  q quit"
                .to_string(),
        );
        lines
    }

    fn input_line(&self, label: &str, value: &str, mode: InputMode) -> String {
        if self.mode == mode {
            format!("{label}: {value}_")
        } else {
            format!("{label}: {value}")
        }
    }

    /// Applies the post-render focus policy and resets the interaction
    /// flags, mirroring a browser moving real focus after a DOM update.
    pub fn finish_render(&mut self) -> FocusTarget {
        let derived = self.view.derive(self.registry.active_set());
        let current = derived.list(self.view.filter);
        let target = resolve_focus_after_render(
            self.view.keyboard_interaction,
            self.view.selected_id.as_deref(),
            self.view.last_selected_id.as_deref(),
            self.view.selected_idx(current),
        );
        match target {
            FocusTarget::Detail => self.tabs.clear(),
            FocusTarget::Tab(idx) => self.tabs.set_focus(Some(idx)),
            FocusTarget::None => {}
        }
        self.view.last_selected_id = self.view.selected_id.clone();
        self.view.keyboard_interaction = false;
        target
    }

    // -- announcements ------------------------------------------------------

    fn announce(&mut self, text: impl Into<String>) {
        self.announcer.announce(text, Instant::now());
    }

    /// Fires due announcements; returns true when a repaint is needed.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.announcer.tick(now)
    }

    pub fn next_announce_due(&self) -> Option<Instant> {
        self.announcer.next_due()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::time::Duration;

    use jlens_client::mock::{AnalyzeScript, MockCall, MockPanelService};
    use jlens_client::types::{Instance, Project, ProjectsReply, SearchReply, UiState};
    use jlens_client::PanelError;

    use super::{AfterCommand, App, AppCommand, BootOutcome, InputMode, KeyInput};
    use crate::projects::ProjectFilter;
    use jlens_client::types::{AnalyzeMode, MaskKind};

    fn app() -> App {
        App::new(Duration::from_millis(50), 8)
    }

    fn site(id: &str, name: &str) -> Instance {
        Instance {
            id: id.to_string(),
            name: Some(name.to_string()),
            url: None,
        }
    }

    fn project(key: &str, cloud_id: Option<&str>) -> Project {
        Project {
            cloud_id: cloud_id.map(str::to_string),
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

    fn two_site_mock() -> MockPanelService {
        MockPanelService::new()
            .with_instances(vec![site("a", "Alpha"), site("b", "Beta")])
            .with_projects(ProjectsReply {
                projects: vec![project("ABC", None)],
                inactive_projects: Vec::new(),
                last_synced_at: None,
            })
    }

    fn progress() -> impl FnMut(&str) + Send {
        |_line: &str| {}
    }

    #[tokio::test]
    async fn boot_requires_login_when_logged_out() {
        let mock = MockPanelService::new().with_ui_state(Ok(UiState {
            logged_in: false,
            logout_url: None,
        }));
        let mut app = app();
        assert_eq!(app.boot(&mock).await, BootOutcome::LoginRequired);
    }

    #[tokio::test]
    async fn boot_requires_login_on_empty_instance_list() {
        let mock = MockPanelService::new().with_instances(Vec::new());
        let mut app = app();
        assert_eq!(app.boot(&mock).await, BootOutcome::LoginRequired);
    }

    #[tokio::test]
    async fn boot_halts_on_unreachable_state_endpoint() {
        let mock = MockPanelService::new()
            .with_ui_state(Err(PanelError::Transport("refused".to_string())));
        let mut app = app();
        let outcome = app.boot(&mock).await;
        assert!(matches!(outcome, BootOutcome::Halted(_)));
        assert!(app.status[0].contains("refused"));
    }

    #[tokio::test]
    async fn boot_syncs_projects_and_selects_first() {
        let mock = two_site_mock();
        let mut app = app();
        assert_eq!(app.boot(&mock).await, BootOutcome::Ready);
        assert_eq!(app.registry.active_ids(), vec!["a", "b"]);
        assert_eq!(app.view.selected_id.as_deref(), Some("default:ABC"));
        assert!(mock.calls().contains(&MockCall::RefreshProjects));
    }

    #[tokio::test]
    async fn analyze_renders_first_success_after_not_found() {
        // Known instances A and B, both active; A answers 404, B succeeds.
        let mock = two_site_mock()
            .with_analyze("a", AnalyzeScript::failure(Some(404), "Issue not found."))
            .with_analyze("b", AnalyzeScript::result("ok"));
        let mut app = app();
        app.boot(&mock).await;
        app.issue_input = "X-1".to_string();

        let mut on_progress = progress();
        app.run_command(
            AppCommand::Analyze(AnalyzeMode::Quick),
            &mock,
            &mut on_progress,
        )
        .await;

        assert_eq!(app.output, vec!["ok"]);
        assert!(app
            .status
            .iter()
            .any(|line| line.contains("Alpha") && line.contains("not found")));
        assert!(app
            .status
            .iter()
            .any(|line| line.contains("Beta") && line.contains("result received")));

        let analyze_calls: Vec<_> = mock
            .calls()
            .into_iter()
            .filter(|call| matches!(call, MockCall::AnalyzeIssue { .. }))
            .collect();
        assert_eq!(analyze_calls.len(), 2);
    }

    #[tokio::test]
    async fn analyze_without_issue_key_short_circuits() {
        let mock = two_site_mock();
        let mut app = app();
        app.boot(&mock).await;

        let mut on_progress = progress();
        app.run_command(
            AppCommand::Analyze(AnalyzeMode::Quick),
            &mock,
            &mut on_progress,
        )
        .await;

        assert!(app.status[0].contains("issue key"));
        assert!(!mock
            .calls()
            .iter()
            .any(|call| matches!(call, MockCall::AnalyzeIssue { .. })));
    }

    #[tokio::test]
    async fn analyze_without_active_instances_short_circuits() {
        let mock = two_site_mock();
        let mut app = app();
        app.boot(&mock).await;
        app.update(KeyInput::Char('1'));
        app.update(KeyInput::Char('2'));
        assert!(app.registry.active_ids().is_empty());

        app.issue_input = "X-1".to_string();
        let mut on_progress = progress();
        app.run_command(
            AppCommand::Analyze(AnalyzeMode::Quick),
            &mock,
            &mut on_progress,
        )
        .await;

        assert!(app.status[0].contains("at least one"));
        assert!(!mock
            .calls()
            .iter()
            .any(|call| matches!(call, MockCall::AnalyzeIssue { .. })));
    }

    #[tokio::test]
    async fn search_merges_issues_across_instances() {
        let mock = two_site_mock()
            .with_search(
                "a",
                Ok(SearchReply {
                    total: Some(2),
                    issues: vec![serde_json::json!({"key": "A-1"})],
                }),
            )
            .with_search(
                "b",
                Ok(SearchReply {
                    total: None,
                    issues: vec![serde_json::json!({"key": "B-1"})],
                }),
            );
        let mut app = app();
        app.boot(&mock).await;
        app.jql_input = "project = X".to_string();

        let mut on_progress = progress();
        app.run_command(AppCommand::Search, &mock, &mut on_progress)
            .await;

        let joined = app.output.join("\n");
        assert!(joined.contains("\"total\": 3"));
        assert!(joined.contains("\"returned\": 2"));
        assert!(joined.contains("A-1"));
        assert!(joined.contains("B-1"));
    }

    #[tokio::test]
    async fn search_surfaces_last_error_when_all_fail() {
        let mock = two_site_mock()
            .with_search("a", Err(PanelError::Transport("a down".to_string())))
            .with_search("b", Err(PanelError::Transport("b down".to_string())));
        let mut app = app();
        app.boot(&mock).await;
        app.jql_input = "project = X".to_string();

        let mut on_progress = progress();
        app.run_command(AppCommand::Search, &mock, &mut on_progress)
            .await;

        assert!(app.output.is_empty());
        assert_eq!(app.status, vec!["transport: b down"]);
    }

    #[tokio::test]
    async fn summary_single_instance_renders_bare_text() {
        let mock = MockPanelService::new()
            .with_instances(vec![site("a", "Alpha")])
            .with_summary("a", Ok("all good".to_string()));
        let mut app = app();
        app.boot(&mock).await;
        app.jql_input = "project = X".to_string();

        let mut on_progress = progress();
        app.run_command(AppCommand::Summarize, &mock, &mut on_progress)
            .await;

        assert_eq!(app.output, vec!["all good"]);
    }

    #[tokio::test]
    async fn summary_multiple_instances_render_sections() {
        let mock = two_site_mock()
            .with_summary("a", Ok("alpha view".to_string()))
            .with_summary("b", Ok("beta view".to_string()));
        let mut app = app();
        app.boot(&mock).await;
        app.jql_input = "project = X".to_string();

        let mut on_progress = progress();
        app.run_command(AppCommand::Summarize, &mock, &mut on_progress)
            .await;

        let joined = app.output.join("\n");
        assert!(joined.contains("Instance a:\nalpha view"));
        assert!(joined.contains("Instance b:\nbeta view"));
    }

    #[tokio::test]
    async fn mask_round_trip_moves_project_to_masked_list() {
        let mock = two_site_mock();
        let mut app = app();
        app.boot(&mock).await;
        assert_eq!(app.view.selected_id.as_deref(), Some("default:ABC"));

        let mut on_progress = progress();
        let after = app
            .run_command(AppCommand::Mask(MaskKind::Temporary), &mock, &mut on_progress)
            .await;
        assert_eq!(after, AfterCommand::Continue);

        let derived = app.view.derive(app.registry.active_set());
        assert!(derived.visible_active.is_empty());
        assert!(derived.visible_inactive.is_empty());
        assert_eq!(derived.masked.len(), 1);
        assert_eq!(derived.masked[0].project_key, "ABC");
    }

    #[tokio::test]
    async fn mask_requires_active_filter() {
        let mock = two_site_mock();
        let mut app = app();
        app.boot(&mock).await;
        app.view.set_filter(ProjectFilter::Masked);

        let mut on_progress = progress();
        app.run_command(AppCommand::Mask(MaskKind::Definitive), &mock, &mut on_progress)
            .await;

        assert!(app.status[0].contains("Active filter"));
        assert!(!mock
            .calls()
            .iter()
            .any(|call| matches!(call, MockCall::MaskProject { .. })));
    }

    #[tokio::test]
    async fn unauthorized_reload_requires_login() {
        let mock = two_site_mock();
        let mut app = app();
        app.boot(&mock).await;

        let mock = MockPanelService::new()
            .with_instances(vec![site("a", "Alpha")])
            .with_projects_error(PanelError::Unauthorized);
        let mut on_progress = progress();
        let after = app
            .run_command(AppCommand::Refresh, &mock, &mut on_progress)
            .await;
        assert_eq!(after, AfterCommand::LoginRequired);
    }

    #[test]
    fn filter_cycle_clears_selection() {
        let mut app = app();
        app.view.selected_id = Some("default:ABC".to_string());
        let command = app.update(KeyInput::Char('f'));
        assert_eq!(command, AppCommand::None);
        assert_eq!(app.view.filter, ProjectFilter::Inactive);
        assert_eq!(app.view.selected_id, None);
    }

    #[test]
    fn edit_mode_collects_issue_key_and_submits() {
        let mut app = app();
        assert_eq!(app.update(KeyInput::Char('i')), AppCommand::None);
        assert_eq!(app.mode, InputMode::EditIssue);
        for ch in "X-1".chars() {
            app.update(KeyInput::Char(ch));
        }
        assert_eq!(app.issue_input, "X-1");
        let command = app.update(KeyInput::Enter);
        assert_eq!(command, AppCommand::Analyze(AnalyzeMode::Quick));
        assert_eq!(app.mode, InputMode::Browse);
    }

    #[test]
    fn status_region_keeps_only_the_newest_lines() {
        let mut app = App::new(Duration::from_millis(50), 2);
        app.status = (1..=5).map(|n| format!("line {n}")).collect();
        let lines = app.render();
        assert!(!lines.iter().any(|l| l == "line 3"));
        assert!(lines.iter().any(|l| l == "line 4"));
        assert!(lines.iter().any(|l| l == "line 5"));
    }

    #[test]
    fn quit_key_quits_from_browse_only() {
        let mut app = app();
        assert_eq!(app.update(KeyInput::Char('q')), AppCommand::Quit);
        app.update(KeyInput::Char('j'));
        assert_eq!(app.update(KeyInput::Char('q')), AppCommand::None);
        assert_eq!(app.jql_input, "q");
    }

    #[tokio::test]
    async fn keyboard_selection_focuses_detail_once() {
        let mock = MockPanelService::new()
            .with_instances(vec![site("a", "Alpha")])
            .with_projects(ProjectsReply {
                projects: vec![project("ABC", None), project("XYZ", None)],
                inactive_projects: Vec::new(),
                last_synced_at: None,
            });
        let mut app = app();
        app.boot(&mock).await;
        let _ = app.finish_render();

        app.update(KeyInput::Right);
        app.update(KeyInput::Right);
        app.update(KeyInput::Enter);
        assert_eq!(app.view.selected_id.as_deref(), Some("default:XYZ"));

        use crate::tabs::FocusTarget;
        assert_eq!(app.finish_render(), FocusTarget::Detail);
        // Re-render with the same selection does not steal focus again.
        assert_eq!(app.finish_render(), FocusTarget::None);
    }
}
