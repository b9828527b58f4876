pub mod jira;
pub mod launchpad;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::model::issue::{IssueRef, IssueSummary, TargetIssuePayload};
use crate::model::raw_bug::RawBug;

/// The bug tracker records are read from.
#[async_trait]
pub trait SourceService: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch_record(&self, id: u64) -> Result<RawBug>;
    /// Ids of bugs with a task in `project`, in discovery order. Tags with a
    /// leading `-` exclude bugs carrying that tag.
    async fn search_project_tasks(
        &self,
        project: &str,
        since: Option<NaiveDate>,
        tags: &[String],
    ) -> Result<Vec<u64>>;
    /// Persist the bug's tags and description.
    async fn save(&self, bug: &RawBug) -> Result<()>;
}

/// The issue tracker records are mirrored into.
#[async_trait]
pub trait TargetService: Send + Sync {
    fn name(&self) -> &str;
    /// One page of results starting at `start_at`; empty once exhausted.
    async fn search_issues(&self, query: &str, start_at: usize) -> Result<Vec<IssueSummary>>;
    async fn create_issue(&self, payload: &TargetIssuePayload) -> Result<IssueRef>;
    async fn add_link(&self, issue: &IssueRef, url: &str, title: &str) -> Result<()>;
    async fn add_to_epic(&self, epic: &str, issue_ids: &[String]) -> Result<()>;
    async fn transition(&self, key: &str, state: &str) -> Result<()>;
    async fn add_comment(&self, key: &str, text: &str) -> Result<()>;
    async fn update_summary(&self, key: &str, summary: &str) -> Result<()>;
    fn browse_url(&self, key: &str) -> String;
}

#[cfg(test)]
pub mod tests;
