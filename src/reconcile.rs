//! Drift correction for issues that were already imported: titles follow
//! the source record, and issues whose series are all released get closed.

use std::collections::HashSet;

use crate::config::PolicyConfig;
use crate::error::{Result, SyncError};
use crate::model::entry::ReconciliationEntry;
use crate::model::issue::SummaryMarker;
use crate::providers::{SourceService, TargetService};
use crate::report::merge_source_data;

const TOOL: &str = env!("CARGO_PKG_NAME");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleOutcome {
    Unchanged,
    Updated,
    /// The summary has no `]` to split on.
    BadFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    /// Every series column is empty.
    NotEvaluated,
    Open,
    AlreadyDone,
    Transitioned,
}

impl StatusOutcome {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StatusOutcome::AlreadyDone | StatusOutcome::Transitioned)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub titles_updated: usize,
    pub transitioned: usize,
    pub bad_format: usize,
    pub failed: usize,
}

/// Split `"ID#123 [pkg] Title"` into `("ID#123 [pkg]", "Title")`. The
/// bracket searched for is the first one after the marker, so brackets in
/// the title or before the marker do not confuse it.
pub fn split_summary<'s>(summary: &'s str, marker: &SummaryMarker) -> Option<(&'s str, &'s str)> {
    let from = summary.find(marker.as_str()).unwrap_or(0);
    let close = from + summary[from..].find(']')?;
    Some((&summary[..=close], summary[close + 1..].trim_start()))
}

/// `Some(true)` when every non-empty status equals `released`, `None` when
/// there is nothing to judge.
pub fn released_state(statuses: &[String], released: &str) -> Option<bool> {
    let mut set = statuses.iter().filter(|s| !s.is_empty()).peekable();
    set.peek()?;
    Some(set.all(|s| s == released))
}

pub struct Reconciler<'a> {
    target: &'a dyn TargetService,
    policy: &'a PolicyConfig,
    dry_run: bool,
}

impl<'a> Reconciler<'a> {
    pub fn new(target: &'a dyn TargetService, policy: &'a PolicyConfig, dry_run: bool) -> Self {
        Self {
            target,
            policy,
            dry_run,
        }
    }

    pub async fn sync_title(
        &self,
        entry: &mut ReconciliationEntry,
        live_title: &str,
    ) -> Result<TitleOutcome> {
        let Some((prefix, current)) = split_summary(&entry.summary, &self.policy.summary_marker)
        else {
            log::warn!(
                "{}: {}",
                entry.key,
                SyncError::ParseFailure(entry.summary.clone())
            );
            return Ok(TitleOutcome::BadFormat);
        };
        let live_title = live_title.trim();
        if current.trim_end() == live_title {
            return Ok(TitleOutcome::Unchanged);
        }

        let summary = format!("{prefix} {live_title}");
        log::info!("{}: title changed, updating summary to {summary:?}", entry.key);
        if !self.dry_run {
            self.target.update_summary(&entry.key, &summary).await?;
            let comment = format!(
                "[{TOOL}] Summary updated automatically to match the title of Launchpad bug {}.",
                entry.source_id
            );
            self.target.add_comment(&entry.key, &comment).await?;
        }
        entry.summary = summary;
        Ok(TitleOutcome::Updated)
    }

    pub async fn sync_status(&self, entry: &mut ReconciliationEntry) -> Result<StatusOutcome> {
        let done = &self.policy.done_state;
        if entry.status.eq_ignore_ascii_case(done) {
            return Ok(StatusOutcome::AlreadyDone);
        }
        match released_state(&entry.series, &self.policy.released_status) {
            None => Ok(StatusOutcome::NotEvaluated),
            Some(false) => Ok(StatusOutcome::Open),
            Some(true) => {
                log::info!(
                    "{}: every series of LP#{} is {}, moving to {done}",
                    entry.key,
                    entry.source_id,
                    self.policy.released_status
                );
                if !self.dry_run {
                    self.target.transition(&entry.key, done).await?;
                    let comment = format!(
                        "[{TOOL}] Moved to {done}: Launchpad bug {} is {} in every series.",
                        entry.source_id, self.policy.released_status
                    );
                    self.target.add_comment(&entry.key, &comment).await?;
                }
                entry.status = done.clone();
                Ok(StatusOutcome::Transitioned)
            }
        }
    }

    /// Title then status. Returns true once the entry is terminal.
    pub async fn reconcile_entry(
        &self,
        entry: &mut ReconciliationEntry,
        live_title: &str,
    ) -> Result<bool> {
        self.sync_title(entry, live_title).await?;
        Ok(self.sync_status(entry).await?.is_terminal())
    }

    /// One pass over the working set. Entries that reach a terminal state
    /// are removed; per-entry failures are logged and counted.
    pub async fn run(
        &self,
        source: &dyn SourceService,
        entries: &mut Vec<ReconciliationEntry>,
    ) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();
        let mut finished: HashSet<String> = HashSet::new();

        for entry in entries.iter_mut() {
            let Some(id) = entry.source_id() else {
                continue;
            };
            let bug = match source.fetch_record(id).await {
                Ok(bug) => bug,
                Err(e) => {
                    log::error!("{}: cannot fetch Launchpad bug {id}: {e}", entry.key);
                    summary.failed += 1;
                    continue;
                }
            };
            merge_source_data(entry, &bug);

            match self.sync_title(entry, &bug.title).await {
                Ok(TitleOutcome::Updated) => summary.titles_updated += 1,
                Ok(TitleOutcome::BadFormat) => summary.bad_format += 1,
                Ok(TitleOutcome::Unchanged) => {}
                Err(e) => {
                    log::error!("{}: title sync failed: {e}", entry.key);
                    summary.failed += 1;
                    continue;
                }
            }

            match self.sync_status(entry).await {
                Ok(outcome) => {
                    if outcome == StatusOutcome::Transitioned {
                        summary.transitioned += 1;
                    }
                    if outcome.is_terminal() {
                        finished.insert(entry.key.clone());
                    }
                }
                Err(e) => {
                    log::error!("{}: status sync failed: {e}", entry.key);
                    summary.failed += 1;
                }
            }
        }

        entries.retain(|e| !finished.contains(&e.key));
        summary
    }
}
