use serde::{Deserialize, Serialize};
use std::fmt;

/// Launchpad task status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BugStatus {
    New,
    Incomplete,
    Opinion,
    Invalid,
    #[serde(rename = "Won't Fix")]
    WontFix,
    Expired,
    Confirmed,
    Triaged,
    #[serde(rename = "In Progress")]
    InProgress,
    Deferred,
    #[serde(rename = "Fix Committed")]
    FixCommitted,
    #[serde(rename = "Fix Released")]
    FixReleased,
    #[serde(rename = "Does Not Exist")]
    DoesNotExist,
    #[serde(other)]
    Unknown,
}

impl BugStatus {
    /// Statuses requested when searching a project's tasks.
    pub const SEARCHABLE: [BugStatus; 10] = [
        BugStatus::New,
        BugStatus::Incomplete,
        BugStatus::Triaged,
        BugStatus::Opinion,
        BugStatus::Invalid,
        BugStatus::WontFix,
        BugStatus::Confirmed,
        BugStatus::InProgress,
        BugStatus::FixCommitted,
        BugStatus::FixReleased,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BugStatus::New => "New",
            BugStatus::Incomplete => "Incomplete",
            BugStatus::Opinion => "Opinion",
            BugStatus::Invalid => "Invalid",
            BugStatus::WontFix => "Won't Fix",
            BugStatus::Expired => "Expired",
            BugStatus::Confirmed => "Confirmed",
            BugStatus::Triaged => "Triaged",
            BugStatus::InProgress => "In Progress",
            BugStatus::Deferred => "Deferred",
            BugStatus::FixCommitted => "Fix Committed",
            BugStatus::FixReleased => "Fix Released",
            BugStatus::DoesNotExist => "Does Not Exist",
            BugStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for BugStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Launchpad task importance, declared from most to least severe so the
/// derived ordering is the severity rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Importance {
    Critical,
    High,
    Medium,
    Low,
    Wishlist,
    Undecided,
    #[serde(other)]
    Unknown,
}

impl Importance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Importance::Critical => "Critical",
            Importance::High => "High",
            Importance::Medium => "Medium",
            Importance::Low => "Low",
            Importance::Wishlist => "Wishlist",
            Importance::Undecided => "Undecided",
            Importance::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Importance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_uses_launchpad_names() {
        let s: BugStatus = serde_json::from_str("\"Fix Released\"").unwrap();
        assert_eq!(s, BugStatus::FixReleased);
        assert_eq!(s.to_string(), "Fix Released");

        let s: BugStatus = serde_json::from_str("\"Something New\"").unwrap();
        assert_eq!(s, BugStatus::Unknown);
    }

    #[test]
    fn importance_orders_by_severity() {
        let mut all = vec![Importance::Wishlist, Importance::Critical, Importance::Medium];
        all.sort();
        assert_eq!(
            all,
            vec![Importance::Critical, Importance::Medium, Importance::Wishlist]
        );
    }
}
