//! Source-to-target import: existence check, eligibility, issue creation
//! and back-tagging of the source record.

pub mod lookup;
pub mod payload;

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::config::{PolicyConfig, SyncJob};
use crate::error::Result;
use crate::model::issue::{IssueRef, IssueSummary, TargetIssuePayload};
use crate::model::raw_bug::RawBug;
use crate::model::source_record::SourceRecord;
use crate::providers::{SourceService, TargetService};
use crate::reconcile::Reconciler;
use crate::report;

use lookup::find_existing;
use payload::{IssueFields, PayloadBuilder};

pub const SOURCE_LINK_TITLE: &str = "Launchpad Link";

/// Behaviour shared by every record of a run.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub policy: PolicyConfig,
    pub components: HashMap<String, String>,
    /// Overrides the job's component.
    pub component: Option<String>,
    /// Overrides the job's epic.
    pub epic: Option<String>,
    /// Overrides the job's label.
    pub label: Option<String>,
    pub assignee: Option<String>,
    pub dry_run: bool,
    /// Tag the source record with the new issue key.
    pub tag_source: bool,
    /// Append a link to the new issue to the source description.
    pub link_in_description: bool,
    /// Leave records that were already imported alone instead of running
    /// the title and status reconcilers on them.
    pub skip_reconcile: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    AlreadyImported(IssueSummary),
    /// No task is assigned to anyone on the job's allow-list.
    Skipped,
    DryRun(TargetIssuePayload),
    Created(IssueRef),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    pub created: usize,
    pub existing: usize,
    pub skipped: usize,
    pub dry_run: usize,
    pub failed: usize,
}

impl SyncSummary {
    fn record(&mut self, outcome: &SyncOutcome) {
        match outcome {
            SyncOutcome::AlreadyImported(_) => self.existing += 1,
            SyncOutcome::Skipped => self.skipped += 1,
            SyncOutcome::DryRun(_) => self.dry_run += 1,
            SyncOutcome::Created(_) => self.created += 1,
        }
    }
}

/// True when the job has no allow-list or a task is assigned to someone
/// on it.
pub fn is_eligible(bug: &RawBug, assignees: Option<&[String]>) -> bool {
    let Some(allowed) = assignees else {
        return true;
    };
    bug.tasks
        .iter()
        .filter_map(|t| t.assignee.as_deref())
        .any(|a| allowed.iter().any(|x| x == a))
}

pub struct Syncer<'a> {
    source: &'a dyn SourceService,
    target: &'a dyn TargetService,
    options: &'a SyncOptions,
}

impl<'a> Syncer<'a> {
    pub fn new(
        source: &'a dyn SourceService,
        target: &'a dyn TargetService,
        options: &'a SyncOptions,
    ) -> Self {
        Self {
            source,
            target,
            options,
        }
    }

    pub async fn sync_bug(&self, bug: &RawBug, job: &SyncJob) -> Result<SyncOutcome> {
        let marker = &self.options.policy.summary_marker;

        if let Some(issue) = find_existing(self.target, marker, &job.jira_project, bug.id).await? {
            log::info!(
                "Launchpad bug {} is already logged in {} here {}",
                bug.id,
                self.target.name(),
                self.target.browse_url(&issue.key)
            );
            if !self.options.skip_reconcile {
                self.reconcile_existing(&issue, bug).await;
            }
            return Ok(SyncOutcome::AlreadyImported(issue));
        }

        if !is_eligible(bug, job.assignees.as_deref()) {
            log::debug!("Bug {} has no task assigned to the allow-list, skipping", bug.id);
            return Ok(SyncOutcome::Skipped);
        }

        let record = SourceRecord::from_raw(bug);
        let builder = PayloadBuilder {
            marker,
            components: &self.options.components,
            fallback_component: self.options.policy.fallback_component.as_deref(),
        };
        let issue_type = job
            .issue_type
            .as_deref()
            .unwrap_or(&self.options.policy.issue_type);
        let fields = IssueFields {
            component: self.options.component.as_deref(),
            job_component: job.component.as_deref(),
            label: self.options.label.as_deref().or(job.label.as_deref()),
            assignee: self.options.assignee.as_deref(),
        };
        let payload = builder.build(&record, &job.jira_project, issue_type, &fields);

        if self.options.dry_run {
            log::info!(
                "(dry-run) Creating {} issue {}",
                self.target.name(),
                serde_json::to_string(&payload).unwrap_or_else(|_| payload.summary.clone())
            );
            if self.options.link_in_description {
                log::info!("(dry-run) Adding issue link to bug {} description", bug.id);
            }
            if self.options.tag_source {
                log::info!("(dry-run) Adding issue key to bug {} tags", bug.id);
            }
            return Ok(SyncOutcome::DryRun(payload));
        }

        let issue = self.create(&payload, bug, job).await?;
        self.tag_back(bug, &issue).await?;
        Ok(SyncOutcome::Created(issue))
    }

    async fn create(
        &self,
        payload: &TargetIssuePayload,
        bug: &RawBug,
        job: &SyncJob,
    ) -> Result<IssueRef> {
        let issue = self.target.create_issue(payload).await?;
        log::info!("Created {}", self.target.browse_url(&issue.key));

        // The issue exists from here on; the next run finds it, so nothing
        // below may turn this into a failed import.
        if let Err(e) = self
            .target
            .add_link(&issue, &bug.web_link, SOURCE_LINK_TITLE)
            .await
        {
            log::warn!("Failed to link {} to {}: {e}", issue.key, bug.web_link);
        }

        if let Some(epic) = self.options.epic.as_deref().or(job.epic.as_deref()) {
            match self.target.add_to_epic(epic, &[issue.id.clone()]).await {
                Ok(()) => log::info!("Added {} to Epic {epic}", issue.key),
                Err(e) => log::warn!("Failed to add {} to Epic {epic}: {e}", issue.key),
            }
        }

        Ok(issue)
    }

    async fn tag_back(&self, bug: &RawBug, issue: &IssueRef) -> Result<()> {
        if !self.options.tag_source && !self.options.link_in_description {
            return Ok(());
        }

        let mut updated = bug.clone();
        if self.options.link_in_description {
            updated.description.push_str(&format!(
                "\n\n---\nExternal link: {}",
                self.target.browse_url(&issue.key)
            ));
        }
        if self.options.tag_source {
            let tag = issue.key.to_lowercase();
            if !updated.tags.contains(&tag) {
                updated.tags.push(tag);
            }
        }

        self.source.save(&updated).await?;
        log::info!("Updated Launchpad bug {} with a reference to {}", bug.id, issue.key);
        Ok(())
    }

    async fn reconcile_existing(&self, issue: &IssueSummary, bug: &RawBug) {
        let Some(mut entry) = report::entry_from_issue(issue, &self.options.policy.summary_marker)
        else {
            return;
        };
        report::merge_source_data(&mut entry, bug);

        let reconciler = Reconciler::new(self.target, &self.options.policy, self.options.dry_run);
        if let Err(e) = reconciler.reconcile_entry(&mut entry, &bug.title).await {
            log::warn!("Failed to reconcile {}: {e}", issue.key);
        }
    }

    /// Sync every bug with a task in the job's Launchpad project. Per-bug
    /// failures are logged and counted; only a missing project fails.
    pub async fn sync_project(
        &self,
        job: &SyncJob,
        since: Option<NaiveDate>,
        tags: &[String],
    ) -> Result<SyncSummary> {
        let ids = self
            .source
            .search_project_tasks(&job.launchpad_project, since, tags)
            .await?;
        log::info!(
            "Found {} bugs in {} project {}",
            ids.len(),
            self.source.name(),
            job.launchpad_project
        );

        let mut summary = SyncSummary::default();
        for id in ids {
            let result = match self.source.fetch_record(id).await {
                Ok(bug) => self.sync_bug(&bug, job).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(outcome) => summary.record(&outcome),
                Err(e) => {
                    log::error!("Failed to sync bug {id}: {e}");
                    summary.failed += 1;
                }
            }
        }
        Ok(summary)
    }
}
