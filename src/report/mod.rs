//! Joins target issues with their live source records.

pub mod render;

use std::collections::HashSet;

use crate::config::PolicyConfig;
use crate::error::Result;
use crate::model::entry::ReconciliationEntry;
use crate::model::issue::{IssueSummary, SummaryMarker};
use crate::model::raw_bug::RawBug;
use crate::model::series::Series;
use crate::model::source_record::SourceRecord;
use crate::providers::{SourceService, TargetService};

/// An entry for `issue` when its summary carries a source identifier.
pub fn entry_from_issue(issue: &IssueSummary, marker: &SummaryMarker) -> Option<ReconciliationEntry> {
    let id = marker.extract_id(&issue.summary)?;
    Some(ReconciliationEntry::new(
        &issue.key,
        &issue.summary,
        &issue.status,
        id,
    ))
}

fn search_query(project: &str, policy: &PolicyConfig) -> String {
    let statuses: Vec<String> = policy
        .active_statuses
        .iter()
        .map(|s| format!("\"{s}\""))
        .collect();
    format!(
        "project = \"{project}\" AND summary ~ \"{}\" AND status in ({})",
        policy.summary_marker.as_str(),
        statuses.join(", ")
    )
}

/// Every active issue in `project` imported from a source record, one
/// page at a time until a page comes back empty.
pub async fn find_issues_in_project(
    target: &dyn TargetService,
    project: &str,
    policy: &PolicyConfig,
) -> Result<Vec<ReconciliationEntry>> {
    let query = search_query(project, policy);
    let mut entries = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut start_at = 0;

    loop {
        let page = target.search_issues(&query, start_at).await?;
        if page.is_empty() {
            break;
        }
        start_at += page.len();

        let mut advanced = false;
        for issue in &page {
            if !seen.insert(issue.key.clone()) {
                continue;
            }
            advanced = true;
            if let Some(entry) = entry_from_issue(issue, &policy.summary_marker) {
                entries.push(entry);
            }
        }
        if !advanced {
            log::warn!(
                "{} returned the same issues again at offset {start_at}, stopping search",
                target.name()
            );
            break;
        }
    }

    Ok(entries)
}

/// Fill the source-derived columns from the live record. Importance and
/// per-series statuses are only meaningful when one package is affected.
pub fn merge_source_data(entry: &mut ReconciliationEntry, bug: &RawBug) {
    let record = SourceRecord::from_raw(bug);
    let packages = record.affected_packages();

    entry.source_id = bug.id.to_string();
    entry.heat = bug.heat.to_string();
    entry.packages = packages.join(", ");
    entry.importance.clear();
    entry.series = Default::default();

    if let [package] = packages.as_slice() {
        if let Some(importance) = bug.tasks.iter().map(|t| t.importance).min() {
            entry.importance = importance.to_string();
        }
        for (column, series) in entry.series.iter_mut().zip(Series::TRACKED) {
            *column = record.package_detail(package, series, "status");
        }
    }
}

/// Build the full report for `project`. A record that cannot be fetched
/// still yields an entry, with every source column marked unavailable.
pub async fn build_report(
    source: &dyn SourceService,
    target: &dyn TargetService,
    project: &str,
    policy: &PolicyConfig,
) -> Result<Vec<ReconciliationEntry>> {
    log::info!("Searching for {} issues in {project} ...", target.name());
    let mut entries = find_issues_in_project(target, project, policy).await?;

    for entry in &mut entries {
        let Some(id) = entry.source_id() else {
            continue;
        };
        match source.fetch_record(id).await {
            Ok(bug) => merge_source_data(entry, &bug),
            Err(e) => {
                log::warn!("Couldn't find the Launchpad bug {id}: {e}");
                entry.mark_unavailable();
            }
        }
    }

    log::info!("Found {} issues", entries.len());
    Ok(entries)
}
