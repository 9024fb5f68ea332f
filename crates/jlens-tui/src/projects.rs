//! Project list view state: visibility partitions, sorting, selection.
//!
//! The three visibility partitions (active/inactive/masked) are derived on
//! every render as a pure function of the raw project arrays, the active
//! instance set, and the current filter — they are never mutated directly.
//! Selection survives reloads unless invalidated, in which case it falls
//! back to the first item of the current list.

use std::collections::BTreeSet;

use jlens_client::types::{Project, ProjectsReply};

/// Which partition the tab strip is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectFilter {
    #[default]
    Active,
    Inactive,
    Masked,
}

impl ProjectFilter {
    pub const ALL: [ProjectFilter; 3] = [Self::Active, Self::Inactive, Self::Masked];

    pub fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
            Self::Masked => "Masked",
        }
    }

    pub fn empty_message(self) -> &'static str {
        match self {
            Self::Active => "No active projects",
            Self::Inactive => "No projects detected without activity",
            Self::Masked => "No masked projects",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Active => Self::Inactive,
            Self::Inactive => Self::Masked,
            Self::Masked => Self::Active,
        }
    }
}

/// Activity score: the first present counter in a fixed candidate order.
pub fn activity_score(project: &Project) -> i64 {
    [
        project.story_etude_open_assigned_count,
        project.story_open_assigned_count,
        project.etude_open_assigned_count,
    ]
    .into_iter()
    .flatten()
    .next()
    .unwrap_or(0)
}

/// Descending activity score, ties broken by ascending project key.
pub fn sort_projects(list: &mut [Project]) {
    list.sort_by(|a, b| {
        activity_score(b)
            .cmp(&activity_score(a))
            .then_with(|| a.project_key.cmp(&b.project_key))
    });
}

fn visible_for_instances(project: &Project, active: &BTreeSet<String>) -> bool {
    let Some(cloud_id) = project.cloud_id.as_deref() else {
        return true;
    };
    active.is_empty() || active.contains(cloud_id)
}

/// The three disjoint-by-visibility partitions for one render.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DerivedProjects {
    pub visible_active: Vec<Project>,
    pub visible_inactive: Vec<Project>,
    pub masked: Vec<Project>,
}

impl DerivedProjects {
    pub fn list(&self, filter: ProjectFilter) -> &[Project] {
        match filter {
            ProjectFilter::Active => &self.visible_active,
            ProjectFilter::Inactive => &self.visible_inactive,
            ProjectFilter::Masked => &self.masked,
        }
    }

    pub fn count(&self, filter: ProjectFilter) -> usize {
        self.list(filter).len()
    }
}

/// Splits one raw array into (visible, masked), dropping projects hidden
/// by the instance filter entirely.
fn split_masked(items: &[Project], active: &BTreeSet<String>) -> (Vec<Project>, Vec<Project>) {
    let mut visible = Vec::new();
    let mut masked = Vec::new();
    for project in items {
        if !visible_for_instances(project, active) {
            continue;
        }
        if project.is_masked() {
            masked.push(project.clone());
        } else {
            visible.push(project.clone());
        }
    }
    (visible, masked)
}

/// Mutable view state around the raw project data. Raw arrays are replaced
/// wholesale on reload; only selection and presentation flags persist.
#[derive(Debug, Clone, Default)]
pub struct ProjectViewState {
    pub projects: Vec<Project>,
    pub inactive: Vec<Project>,
    pub last_synced_at: Option<i64>,
    pub filter: ProjectFilter,
    pub selected_id: Option<String>,
    pub last_selected_id: Option<String>,
    pub keyboard_interaction: bool,
    pub inactive_open: bool,
}

impl ProjectViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the raw data after a backend reload. Selection is kept and
    /// repaired on the next derivation.
    pub fn apply_reload(&mut self, reply: ProjectsReply) {
        self.projects = reply.projects;
        self.inactive = reply.inactive_projects;
        self.last_synced_at = reply.last_synced_at;
    }

    /// Pure derivation of the three partitions from raw data + ActiveSet.
    pub fn derive(&self, active: &BTreeSet<String>) -> DerivedProjects {
        let (mut visible_active, masked_a) = split_masked(&self.projects, active);
        let (mut visible_inactive, masked_b) = split_masked(&self.inactive, active);
        let mut masked = masked_a;
        masked.extend(masked_b);

        sort_projects(&mut visible_active);
        sort_projects(&mut visible_inactive);
        sort_projects(&mut masked);

        DerivedProjects {
            visible_active,
            visible_inactive,
            masked,
        }
    }

    /// Selection-repair invariant: the selection must reference a project
    /// in the current list, else it resets to the first item or none.
    pub fn repair_selection(&mut self, current: &[Project]) {
        let still_there = self
            .selected_id
            .as_deref()
            .is_some_and(|id| current.iter().any(|p| p.slot_id() == id));
        if !still_there {
            self.selected_id = current.first().map(Project::slot_id);
        }
    }

    /// Switches the filter; always clears the selection so the first item
    /// of the new list gets selected on the next derivation.
    pub fn set_filter(&mut self, filter: ProjectFilter) {
        if self.filter == filter {
            return;
        }
        self.filter = filter;
        self.selected_id = None;
        self.keyboard_interaction = true;
    }

    pub fn select(&mut self, slot_id: &str, keyboard: bool) {
        self.selected_id = Some(slot_id.to_string());
        self.keyboard_interaction = keyboard;
    }

    pub fn selected_project<'a>(&self, current: &'a [Project]) -> Option<&'a Project> {
        let selected = self.selected_id.as_deref()?;
        current.iter().find(|p| p.slot_id() == selected)
    }

    /// Index of the selected project in the current list.
    pub fn selected_idx(&self, current: &[Project]) -> Option<usize> {
        let selected = self.selected_id.as_deref()?;
        current.iter().position(|p| p.slot_id() == selected)
    }

    pub fn toggle_inactive_open(&mut self) {
        self.inactive_open = !self.inactive_open;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::collections::BTreeSet;

    use super::{activity_score, ProjectFilter, ProjectViewState};
    use jlens_client::types::{Project, ProjectsReply};

    fn project(key: &str, cloud_id: Option<&str>, mask: Option<&str>, story: Option<i64>) -> Project {
        Project {
            cloud_id: cloud_id.map(str::to_string),
            project_key: key.to_string(),
            project_name: None,
            source: None,
            is_active: true,
            mask_type: mask.map(str::to_string),
            story_etude_open_assigned_count: None,
            story_open_assigned_count: story,
            etude_open_assigned_count: None,
        }
    }

    fn active(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    fn keys(list: &[Project]) -> Vec<&str> {
        list.iter().map(|p| p.project_key.as_str()).collect()
    }

    #[test]
    fn score_uses_first_present_counter() {
        let mut p = project("A", None, None, Some(3));
        assert_eq!(activity_score(&p), 3);
        p.story_etude_open_assigned_count = Some(7);
        assert_eq!(activity_score(&p), 7);
        p = project("A", None, None, None);
        assert_eq!(activity_score(&p), 0);
    }

    #[test]
    fn score_reads_backend_counter_names() {
        let p: Project = serde_json::from_str(
            r#"{"project_key":"A","etude_open_assigned_count":9,"story_etude_open_assigned_count":7}"#,
        )
        .unwrap();
        assert_eq!(p.story_etude_open_assigned_count, Some(7));
        assert_eq!(p.etude_open_assigned_count, Some(9));
        assert_eq!(activity_score(&p), 7);
    }

    #[test]
    fn score_tie_breaks_on_ascending_key() {
        let mut state = ProjectViewState::new();
        state.projects = vec![
            project("B", None, Some("none"), Some(2)),
            project("A", None, Some("none"), Some(2)),
        ];
        let derived = state.derive(&active(&[]));
        assert_eq!(keys(&derived.visible_active), ["A", "B"]);
    }

    #[test]
    fn higher_score_sorts_first() {
        let mut state = ProjectViewState::new();
        state.projects = vec![
            project("LOW", None, None, Some(1)),
            project("HIGH", None, None, Some(9)),
        ];
        let derived = state.derive(&active(&[]));
        assert_eq!(keys(&derived.visible_active), ["HIGH", "LOW"]);
    }

    #[test]
    fn masked_projects_merge_from_both_arrays() {
        let mut state = ProjectViewState::new();
        state.projects = vec![
            project("A", None, Some("temporary"), None),
            project("B", None, None, None),
        ];
        state.inactive = vec![project("C", None, Some("definitive"), None)];

        let derived = state.derive(&active(&[]));
        assert_eq!(keys(&derived.visible_active), ["B"]);
        assert!(derived.visible_inactive.is_empty());
        assert_eq!(keys(&derived.masked), ["A", "C"]);
    }

    #[test]
    fn instance_filter_hides_other_clouds_but_keeps_unscoped() {
        let mut state = ProjectViewState::new();
        state.projects = vec![
            project("ON", Some("c1"), None, None),
            project("OFF", Some("c2"), None, None),
            project("ANY", None, None, None),
        ];
        let derived = state.derive(&active(&["c1"]));
        assert_eq!(keys(&derived.visible_active), ["ANY", "ON"]);

        // Empty active set means everything is visible.
        let derived = state.derive(&active(&[]));
        assert_eq!(derived.visible_active.len(), 3);
    }

    #[test]
    fn derivation_is_idempotent() {
        let mut state = ProjectViewState::new();
        state.projects = vec![
            project("B", Some("c1"), None, Some(2)),
            project("A", None, Some("temporary"), Some(5)),
        ];
        state.inactive = vec![project("C", None, None, None)];
        let set = active(&["c1"]);

        let first = state.derive(&set);
        state.repair_selection(first.list(state.filter));
        let first_selection = state.selected_id.clone();

        let second = state.derive(&set);
        state.repair_selection(second.list(state.filter));

        assert_eq!(first, second);
        assert_eq!(state.selected_id, first_selection);
    }

    #[test]
    fn selection_repair_keeps_valid_and_resets_stale() {
        let mut state = ProjectViewState::new();
        state.projects = vec![project("A", None, None, None), project("B", None, None, None)];
        let derived = state.derive(&active(&[]));

        state.selected_id = Some("default:B".to_string());
        state.repair_selection(derived.list(ProjectFilter::Active));
        assert_eq!(state.selected_id.as_deref(), Some("default:B"));

        state.selected_id = Some("default:GONE".to_string());
        state.repair_selection(derived.list(ProjectFilter::Active));
        assert_eq!(state.selected_id.as_deref(), Some("default:A"));

        state.projects.clear();
        let derived = state.derive(&active(&[]));
        state.repair_selection(derived.list(ProjectFilter::Active));
        assert_eq!(state.selected_id, None);
    }

    #[test]
    fn filter_switch_clears_selection() {
        let mut state = ProjectViewState::new();
        state.selected_id = Some("default:A".to_string());
        state.set_filter(ProjectFilter::Masked);
        assert_eq!(state.selected_id, None);
        assert!(state.keyboard_interaction);

        // Re-applying the current filter is a no-op.
        state.selected_id = Some("default:A".to_string());
        state.keyboard_interaction = false;
        state.set_filter(ProjectFilter::Masked);
        assert_eq!(state.selected_id.as_deref(), Some("default:A"));
    }

    #[test]
    fn reload_replaces_raw_data_wholesale() {
        let mut state = ProjectViewState::new();
        state.projects = vec![project("OLD", None, None, None)];
        state.apply_reload(ProjectsReply {
            projects: vec![project("NEW", None, None, None)],
            inactive_projects: Vec::new(),
            last_synced_at: Some(1_700_000_000),
        });
        assert_eq!(keys(&state.projects), ["NEW"]);
        assert_eq!(state.last_synced_at, Some(1_700_000_000));
    }

    #[test]
    fn filter_cycle_wraps() {
        assert_eq!(ProjectFilter::Active.next(), ProjectFilter::Inactive);
        assert_eq!(ProjectFilter::Masked.next(), ProjectFilter::Active);
    }
}
