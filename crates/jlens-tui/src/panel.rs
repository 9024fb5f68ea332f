//! Deterministic panel rendering.
//!
//! Renders the registry and project view state into plain text lines —
//! state in, lines out, no hidden rendering state — so repeated renders
//! with identical state produce identical output and the whole surface is
//! testable without a terminal.

use jlens_client::registry::InstanceRegistry;

use crate::projects::{activity_score, DerivedProjects, ProjectFilter, ProjectViewState};
use crate::tabs::TabStrip;

/// Everything one frame is rendered from.
pub struct PanelView<'a> {
    pub logged_in: bool,
    pub registry: &'a InstanceRegistry,
    pub view: &'a ProjectViewState,
    pub derived: &'a DerivedProjects,
    pub tabs: &'a TabStrip,
    pub status: &'a [String],
    pub announcement: Option<&'a str>,
    pub output: &'a [String],
}

/// Formats a unix timestamp for the "last synced" line.
pub fn format_ts(ts: Option<i64>) -> String {
    let Some(ts) = ts else {
        return String::new();
    };
    match chrono::DateTime::from_timestamp(ts, 0) {
        Some(when) => when.format("%Y-%m-%d %H:%M").to_string(),
        None => String::new(),
    }
}

pub fn render_panel(view: &PanelView) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push(render_topbar(view.logged_in));
    lines.push(render_instances(view.registry));
    lines.push(render_filters(view));
    lines.push(String::new());
    render_tabs(view, &mut lines);
    lines.push(String::new());
    render_detail(view, &mut lines);
    lines.push(String::new());
    render_inactive(view, &mut lines);

    let synced = format_ts(view.view.last_synced_at);
    if !synced.is_empty() {
        lines.push(format!("Last synced: {synced}"));
    }

    if !view.output.is_empty() {
        lines.push(String::new());
        lines.push("Result:".to_string());
        lines.extend(view.output.iter().cloned());
    }

    if !view.status.is_empty() {
        lines.push(String::new());
        lines.extend(view.status.iter().cloned());
    }
    if let Some(announcement) = view.announcement {
        lines.push(format!(">> {announcement}"));
    }

    lines
}

fn render_topbar(logged_in: bool) -> String {
    if logged_in {
        "jlens — Jira panel                [logout]".to_string()
    } else {
        "jlens — Jira panel".to_string()
    }
}

fn render_instances(registry: &InstanceRegistry) -> String {
    if registry.is_empty() {
        return "Instances: (none)".to_string();
    }
    let pills: Vec<String> = registry
        .known()
        .iter()
        .map(|site| {
            let pressed = if registry.is_active(&site.id) { "x" } else { " " };
            format!("[{pressed}] {}", site.label())
        })
        .collect();
    format!("Instances: {}", pills.join("  "))
}

fn render_filters(view: &PanelView) -> String {
    let pills: Vec<String> = ProjectFilter::ALL
        .iter()
        .map(|filter| {
            let count = view.derived.count(*filter);
            if *filter == view.view.filter {
                format!("[{} ({count})]", filter.label())
            } else {
                format!("{} ({count})", filter.label())
            }
        })
        .collect();
    format!("Filters: {}", pills.join("  "))
}

fn render_tabs(view: &PanelView, lines: &mut Vec<String>) {
    let current = view.derived.list(view.view.filter);
    if current.is_empty() {
        lines.push(view.view.filter.empty_message().to_string());
        return;
    }
    let selected_idx = view.view.selected_idx(current);
    let reachable = view.tabs.reachable(selected_idx, current.len());
    for (idx, project) in current.iter().enumerate() {
        let select_mark = if Some(idx) == selected_idx { '›' } else { ' ' };
        let focus_mark = if Some(idx) == reachable { '*' } else { ' ' };
        let state = if project.is_active { "active" } else { "inactive" };
        lines.push(format!(
            "{select_mark}{focus_mark} {:<12} {:>3} focus  {state}",
            project.project_key,
            activity_score(project)
        ));
    }
}

fn render_detail(view: &PanelView, lines: &mut Vec<String>) {
    let current = view.derived.list(view.view.filter);
    let Some(selected) = view.view.selected_project(current) else {
        lines.push("Select a project.".to_string());
        return;
    };

    lines.push(format!(
        "Project: {}",
        selected
            .project_name
            .as_deref()
            .unwrap_or(&selected.project_key)
    ));
    lines.push(format!("Key: {}", selected.project_key));
    lines.push(format!(
        "Source: {}",
        selected.source.as_deref().unwrap_or("?")
    ));
    lines.push(format!(
        "Instance: {}",
        selected.cloud_id.as_deref().unwrap_or("default")
    ));
    if view.view.filter == ProjectFilter::Masked {
        if let Some(mask) = selected.mask_type.as_deref() {
            lines.push(format!("Masked: {mask}"));
        }
    }
    lines.push(format!(
        "Active: {}",
        if selected.is_active { "yes" } else { "no" }
    ));
    lines.push(render_actions(view.view.filter));
}

fn render_actions(filter: ProjectFilter) -> String {
    match filter {
        ProjectFilter::Active => "Actions: mask temporary (m)  mask definitive (M)".to_string(),
        ProjectFilter::Inactive => "Actions: re-add (e)".to_string(),
        ProjectFilter::Masked => "Actions: none".to_string(),
    }
}

fn render_inactive(view: &PanelView, lines: &mut Vec<String>) {
    let inactive = &view.derived.visible_inactive;
    if !view.view.inactive_open {
        lines.push(format!(
            "Inactive projects ({}) — collapsed (o to open)",
            inactive.len()
        ));
        return;
    }
    lines.push(format!("Inactive projects ({}):", inactive.len()));
    if inactive.is_empty() {
        lines.push("  No inactive projects".to_string());
        return;
    }
    for project in inactive {
        lines.push(format!(
            "  {} — {} (instance {})",
            project.project_key,
            project
                .project_name
                .as_deref()
                .unwrap_or(&project.project_key),
            project.cloud_id.as_deref().unwrap_or("default"),
        ));
    }
}
