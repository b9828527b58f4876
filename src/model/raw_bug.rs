use serde::{Deserialize, Serialize};

use super::status::{BugStatus, Importance};

/// A Launchpad bug as returned by the source service, before any
/// normalisation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBug {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub heat: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub web_link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_last_updated: Option<String>,
    #[serde(default)]
    pub tasks: Vec<RawTask>,
}

/// One bug task: the bug as it affects a single package/series target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTask {
    /// e.g. `"systemd (Ubuntu Focal)"`
    pub target_name: String,
    pub status: BugStatus,
    pub importance: Importance,
    /// Launchpad account name, without the `~`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
}

impl RawTask {
    pub fn new(target_name: &str, status: BugStatus, importance: Importance) -> Self {
        Self {
            target_name: target_name.to_string(),
            status,
            importance,
            assignee: None,
        }
    }
}
