//! Transport-agnostic panel types.
//!
//! DTOs mirroring the backend JSON contracts, decoupled from the HTTP
//! layer. Project visibility/sorting rules live in the TUI crate; these
//! types only carry the raw data.

use serde::{Deserialize, Serialize};

/// Session state reported by the backend at boot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct UiState {
    #[serde(default)]
    pub logged_in: bool,
    #[serde(default)]
    pub logout_url: Option<String>,
}

/// A configured remote Jira instance. Identity is `id`; the known set is
/// replaced wholesale on each registry refresh.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Instance {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl Instance {
    /// Human-readable label: name, else url, else the raw id.
    pub fn label(&self) -> &str {
        if let Some(name) = self.name.as_deref() {
            if !name.is_empty() {
                return name;
            }
        }
        if let Some(url) = self.url.as_deref() {
            if !url.is_empty() {
                return url;
            }
        }
        &self.id
    }
}

/// A tracked project row as returned by the project endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Project {
    #[serde(default)]
    pub cloud_id: Option<String>,
    pub project_key: String,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Anything other than absent/"none" means the project is masked.
    #[serde(default)]
    pub mask_type: Option<String>,
    #[serde(default)]
    pub story_etude_open_assigned_count: Option<i64>,
    #[serde(default)]
    pub story_open_assigned_count: Option<i64>,
    #[serde(default)]
    pub etude_open_assigned_count: Option<i64>,
}

fn default_true() -> bool {
    true
}

impl Project {
    /// Logical identity: `(cloud_id or "default", project_key)`.
    pub fn slot_id(&self) -> String {
        format!(
            "{}:{}",
            self.cloud_id.as_deref().unwrap_or("default"),
            self.project_key
        )
    }

    /// Whether the project is masked (excluded from active/inactive views).
    pub fn is_masked(&self) -> bool {
        matches!(self.mask_type.as_deref(), Some(mask) if mask != "none")
    }
}

/// Reply of the project list/refresh endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct ProjectsReply {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub inactive_projects: Vec<Project>,
    #[serde(default)]
    pub last_synced_at: Option<i64>,
}

/// Payload for creating (or re-adding) a tracked project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProject {
    pub project_key: String,
    pub project_name: String,
    pub source: String,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_id: Option<String>,
}

impl NewProject {
    /// Manual entry from user input.
    pub fn manual(key: &str, name: &str) -> Self {
        Self {
            project_key: key.trim().to_string(),
            project_name: name.trim().to_string(),
            source: "manual".to_string(),
            is_active: true,
            cloud_id: None,
        }
    }

    /// Re-add of a project currently sitting in the inactive list.
    pub fn readd(project: &Project) -> Self {
        Self {
            project_key: project.project_key.clone(),
            project_name: project
                .project_name
                .clone()
                .unwrap_or_else(|| project.project_key.clone()),
            source: "manual".to_string(),
            is_active: true,
            cloud_id: project.cloud_id.clone(),
        }
    }
}

/// Mask reason attached when hiding a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskKind {
    Temporary,
    Definitive,
}

impl MaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Temporary => "temporary",
            Self::Definitive => "definitive",
        }
    }
}

/// Analysis depth for the issue analysis operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzeMode {
    Quick,
    Detail,
}

impl AnalyzeMode {
    /// `(max_links, max_comments)` limits per mode.
    pub fn limits(self) -> (u32, u32) {
        match self {
            Self::Quick => (1, 1),
            Self::Detail => (4, 6),
        }
    }
}

/// Request for the streaming issue analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeRequest {
    pub issue_key: String,
    pub mode: AnalyzeMode,
}

/// Reply of the JQL search endpoint. Issues pass through as opaque JSON.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct SearchReply {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub issues: Vec<serde_json::Value>,
}

impl SearchReply {
    /// Effective total: reported total, else the returned count.
    pub fn effective_total(&self) -> u64 {
        self.total.unwrap_or(self.issues.len() as u64)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn instance_label_precedence() {
        let mut site = Instance {
            id: "cloud-1".to_string(),
            name: Some("Prod".to_string()),
            url: Some("https://prod.example".to_string()),
        };
        assert_eq!(site.label(), "Prod");
        site.name = None;
        assert_eq!(site.label(), "https://prod.example");
        site.url = Some(String::new());
        assert_eq!(site.label(), "cloud-1");
    }

    #[test]
    fn project_slot_id_defaults_cloud() {
        let p: Project = serde_json::from_str(r#"{"project_key":"ABC"}"#).unwrap();
        assert_eq!(p.slot_id(), "default:ABC");
        assert!(p.is_active);
        assert!(!p.is_masked());
    }

    #[test]
    fn mask_none_is_not_masked() {
        let p: Project =
            serde_json::from_str(r#"{"project_key":"ABC","mask_type":"none"}"#).unwrap();
        assert!(!p.is_masked());
        let p: Project =
            serde_json::from_str(r#"{"project_key":"ABC","mask_type":"temporary"}"#).unwrap();
        assert!(p.is_masked());
    }

    #[test]
    fn analyze_limits_per_mode() {
        assert_eq!(AnalyzeMode::Quick.limits(), (1, 1));
        assert_eq!(AnalyzeMode::Detail.limits(), (4, 6));
    }

    #[test]
    fn search_reply_effective_total() {
        let reply: SearchReply =
            serde_json::from_str(r#"{"issues":[{"key":"A-1"},{"key":"A-2"}]}"#).unwrap();
        assert_eq!(reply.effective_total(), 2);
        let reply: SearchReply = serde_json::from_str(r#"{"total":40,"issues":[]}"#).unwrap();
        assert_eq!(reply.effective_total(), 40);
    }

    #[test]
    fn new_project_readd_falls_back_to_key() {
        let p: Project = serde_json::from_str(r#"{"project_key":"XY","cloud_id":"c1"}"#).unwrap();
        let req = NewProject::readd(&p);
        assert_eq!(req.project_name, "XY");
        assert_eq!(req.cloud_id.as_deref(), Some("c1"));
        assert!(req.is_active);
    }
}
