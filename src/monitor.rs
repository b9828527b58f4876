//! Polls imported source records on a fixed interval and reports the ones
//! that changed since the last pass.

use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::PolicyConfig;
use crate::error::SyncError;
use crate::providers::{SourceService, TargetService};
use crate::report::find_issues_in_project;
use crate::snapshot::{Snapshot, SnapshotEntry};

#[derive(Debug, Clone)]
pub struct MonitorOptions {
    pub project: String,
    pub snapshot: PathBuf,
    pub interval: Duration,
    /// Stop after this many passes; run until interrupted when unset.
    pub passes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub id: u64,
    pub jira_key: String,
    pub previous: String,
    pub current: String,
}

#[derive(Debug, Default)]
pub struct PollReport {
    pub changes: Vec<Change>,
    pub errors: Vec<(u64, SyncError)>,
}

/// Snapshot every imported issue of `project` with its record's current
/// update time. Records that cannot be fetched are left out.
pub async fn build_snapshot(
    source: &dyn SourceService,
    target: &dyn TargetService,
    policy: &PolicyConfig,
    options: &MonitorOptions,
) -> crate::error::Result<Snapshot> {
    let mut snapshot = Snapshot::new(&options.snapshot);
    for entry in find_issues_in_project(target, &options.project, policy).await? {
        let Some(id) = entry.source_id() else {
            continue;
        };
        match source.fetch_record(id).await {
            Ok(bug) => snapshot.insert(
                id,
                SnapshotEntry {
                    jira_key: entry.key,
                    last_change: bug.date_last_updated.unwrap_or_default(),
                },
            ),
            Err(e) => log::warn!("{}: skipping Launchpad bug {id}: {e}", entry.key),
        }
    }
    Ok(snapshot)
}

/// Compare every snapshot entry with its live record, recording changes
/// into the snapshot.
pub async fn poll_once(source: &dyn SourceService, snapshot: &mut Snapshot) -> PollReport {
    let mut report = PollReport::default();

    for id in snapshot.ids() {
        let bug = match source.fetch_record(id).await {
            Ok(bug) => bug,
            Err(e) => {
                report.errors.push((id, e));
                continue;
            }
        };
        let current = bug.date_last_updated.unwrap_or_default();
        let Some(known) = snapshot.get(id) else {
            continue;
        };
        if known.last_change != current {
            report.changes.push(Change {
                id,
                jira_key: known.jira_key.clone(),
                previous: known.last_change.clone(),
                current: current.clone(),
            });
            snapshot.set_last_change(id, &current);
        }
    }

    report
}

pub async fn run(
    source: &dyn SourceService,
    target: &dyn TargetService,
    policy: &PolicyConfig,
    options: &MonitorOptions,
) -> Result<()> {
    let mut snapshot = match Snapshot::load(&options.snapshot)? {
        Some(snapshot) => snapshot,
        None => build_snapshot(source, target, policy, options).await?,
    };
    log::info!(
        "Found {} issues, snapshot at {}",
        snapshot.len(),
        snapshot.path().display()
    );
    if snapshot.is_empty() {
        log::warn!("No imported issues to watch in {}", options.project);
    }
    snapshot.save()?;

    let mut interval = tokio::time::interval(options.interval);
    let mut pass = 0u64;
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted, stopping");
                break;
            }
        }

        pass += 1;
        log::info!("Searching for changes (pass {pass})");
        let report = poll_once(source, &mut snapshot).await;
        for change in &report.changes {
            log::info!(
                "Launchpad bug {} ({}) has changed since last refresh: {} -> {}",
                change.id,
                change.jira_key,
                change.previous,
                change.current
            );
        }
        for (id, err) in &report.errors {
            log::error!("Launchpad bug {id}: {err}");
        }
        if !report.changes.is_empty() {
            snapshot.save()?;
        }

        if options.passes.is_some_and(|max| pass >= max) {
            break;
        }
    }

    Ok(())
}
