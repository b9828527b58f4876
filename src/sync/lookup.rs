use crate::error::Result;
use crate::model::issue::{IssueSummary, SummaryMarker};
use crate::providers::TargetService;

/// Find the issue in `project` already imported from source record `id`.
///
/// The target's text search is fuzzy, so a hit only counts when its summary
/// parses back to exactly `id`.
pub async fn find_existing(
    target: &dyn TargetService,
    marker: &SummaryMarker,
    project: &str,
    id: u64,
) -> Result<Option<IssueSummary>> {
    let query = format!(
        "project = \"{project}\" AND summary ~ \"{}\"",
        marker.token(id)
    );
    let issues = target.search_issues(&query, 0).await?;
    Ok(issues
        .into_iter()
        .find(|issue| marker.extract_id(&issue.summary) == Some(id)))
}
