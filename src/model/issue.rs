use serde::{Deserialize, Serialize};

/// The token embedding a source identifier in a target summary, e.g. the
/// `ID#` in `"ID#123 [systemd] Boot hangs"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SummaryMarker(String);

impl SummaryMarker {
    pub fn new(marker: impl Into<String>) -> Self {
        Self(marker.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `"ID#123"`
    pub fn token(&self, id: u64) -> String {
        format!("{}{id}", self.0)
    }

    /// `"ID#123 [systemd] Boot hangs"`
    pub fn summary(&self, id: u64, packages: &str, title: &str) -> String {
        format!("{} [{packages}] {title}", self.token(id))
    }

    /// The source identifier is the run of digits directly after the
    /// marker. Anything else (no marker, no digits) does not parse.
    pub fn extract_id(&self, summary: &str) -> Option<u64> {
        let start = summary.find(&self.0)? + self.0.len();
        let digits: String = summary[start..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok()
    }
}

impl Default for SummaryMarker {
    fn default() -> Self {
        Self::new("ID#")
    }
}

/// Fields sent to the target service to create an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetIssuePayload {
    pub project: String,
    pub summary: String,
    pub description: String,
    pub issue_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
}

/// An issue as returned by a target search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSummary {
    pub id: String,
    pub key: String,
    pub summary: String,
    pub status: String,
}

/// Handle on a created or found issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRef {
    pub id: String,
    pub key: String,
}

impl From<&IssueSummary> for IssueRef {
    fn from(issue: &IssueSummary) -> Self {
        IssueRef {
            id: issue.id.clone(),
            key: issue.key.clone(),
        }
    }
}
