use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use crate::config::{self, AppConfig, SyncJob};
use crate::error::SyncError;
use crate::model::source_record::{parse_id, SourceRecord};
use crate::monitor::{self, MonitorOptions};
use crate::providers::jira::JiraProvider;
use crate::providers::launchpad::LaunchpadProvider;
use crate::providers::{SourceService, TargetService};
use crate::reconcile::Reconciler;
use crate::report::{self, render};
use crate::sync::lookup::find_existing;
use crate::sync::{SyncOptions, SyncOutcome, Syncer};

/// Mirror Launchpad bugs into Jira
#[derive(Parser, Debug)]
#[command(
    name = "lp-to-jira",
    version,
    about = "Create Jira issues from Launchpad bugs and keep them in step",
    after_help = "Examples:\n  \
                  lp-to-jira import 3215487 FR\n  \
                  lp-to-jira import --exists 3215487 FR\n  \
                  lp-to-jira import -l ubuntu-meeting 3215487 PR\n  \
                  lp-to-jira import --no-lp-tag -c Network -E FS-543 123231 PR\n  \
                  lp-to-jira sync -s ubuntu -d 3 IQA\n  \
                  lp-to-jira sync -s ubuntu -t go-to-jira -t=-ignore-these PR\n  \
                  lp-to-jira report --html results.html FR"
)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (default: ~/.lp-to-jira/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Options applied when issues get created.
#[derive(Args, Debug, Clone, Default)]
pub struct CreateArgs {
    /// Add LABEL to the Jira issue
    #[arg(short, long)]
    pub label: Option<String>,

    /// Specify COMPONENT to assign the issue to
    #[arg(short, long)]
    pub component: Option<String>,

    /// Specify EPIC to link new issues to
    #[arg(short = 'E', long)]
    pub epic: Option<String>,

    /// Add the Jira link to the Launchpad bug description
    #[arg(long = "add-link-in-lp-desc")]
    pub lp_link: bool,

    /// Do not tag the Launchpad bug with the Jira key
    #[arg(long)]
    pub no_lp_tag: bool,

    /// Make no changes, only log what would happen
    #[arg(long)]
    pub dry_run: bool,

    /// Do not sync title and status of bugs that were already imported
    #[arg(long)]
    pub no_reconcile: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Import one Launchpad bug into a Jira project
    Import {
        /// The Launchpad numeric bug ID
        bug: String,

        /// The Jira project key
        project: String,

        /// Only check whether the bug was already imported
        #[arg(short, long)]
        exists: bool,

        #[command(flatten)]
        create: CreateArgs,
    },

    /// Import the bugs of a Launchpad project, or every configured sync job
    Sync {
        /// The Jira project key (required with --sync-project-bugs)
        project: Option<String>,

        /// Launchpad project whose bugs are added to the Jira project
        #[arg(short = 's', long, requires = "project")]
        sync_project_bugs: Option<String>,

        /// Only look for bugs filed in the past N days
        #[arg(short, long)]
        days: Option<i64>,

        /// Only look for bugs with this tag; prefix with '-' to exclude
        #[arg(short = 't', long = "tag", allow_hyphen_values = true)]
        tags: Vec<String>,

        #[command(flatten)]
        create: CreateArgs,
    },

    /// Report every active imported issue of a Jira project
    Report {
        /// The Jira project key
        project: String,

        /// Export the report to FILE in csv format
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Export the report to FILE in json format
        #[arg(long)]
        json: Option<PathBuf>,

        /// Export the report to FILE in html format
        #[arg(long)]
        html: Option<PathBuf>,
    },

    /// Sync titles and close issues whose bug is released everywhere
    Reconcile {
        /// The Jira project key
        project: String,

        /// Make no changes, only log what would happen
        #[arg(long)]
        dry_run: bool,
    },

    /// Watch imported bugs for upstream changes
    Monitor {
        /// The Jira project key
        project: String,

        /// Seconds between passes
        #[arg(long)]
        interval: Option<u64>,

        /// Stop after N passes
        #[arg(long)]
        passes: Option<u64>,

        /// Snapshot file
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// Print a Launchpad bug as seen by the importer
    Show {
        /// The Launchpad numeric bug ID
        bug: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(cli: Cli) -> Result<ExitCode> {
    let config = config::load_config(cli.config.as_deref())?;
    let source = LaunchpadProvider::new(&config.launchpad);

    match cli.command {
        Command::Show { bug, json } => handle_show(&source, &bug, json).await,
        Command::Import {
            bug,
            project,
            exists,
            create,
        } => {
            let target = jira(&config)?;
            handle_import(&config, &source, &target, &bug, &project, exists, &create).await
        }
        Command::Sync {
            project,
            sync_project_bugs,
            days,
            tags,
            create,
        } => {
            let target = jira(&config)?;
            let jobs = sync_jobs(&config, project, sync_project_bugs)?;
            let since = days.map(days_ago);
            handle_sync(&config, &source, &target, &jobs, since, &tags, &create).await
        }
        Command::Report {
            project,
            csv,
            json,
            html,
        } => {
            let target = jira(&config)?;
            let outputs = render::ReportOutputs { csv, json, html };
            handle_report(&config, &source, &target, &project, &outputs).await
        }
        Command::Reconcile { project, dry_run } => {
            let target = jira(&config)?;
            handle_reconcile(&config, &source, &target, &project, dry_run).await
        }
        Command::Monitor {
            project,
            interval,
            passes,
            snapshot,
        } => {
            let target = jira(&config)?;
            let options = MonitorOptions {
                project,
                snapshot: snapshot.unwrap_or_else(|| config.monitor.snapshot.clone()),
                interval: Duration::from_secs(interval.unwrap_or(config.monitor.interval_secs)),
                passes,
            };
            monitor::run(&source, &target, &config.policy, &options).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn jira(config: &AppConfig) -> Result<JiraProvider> {
    let Some(jira) = &config.jira else {
        bail!("No Jira credentials configured. Add a [jira] section to ~/.lp-to-jira/config.toml");
    };
    Ok(JiraProvider::new(jira, config.policy.page_size))
}

fn sync_options(config: &AppConfig, create: &CreateArgs) -> SyncOptions {
    SyncOptions {
        policy: config.policy.clone(),
        components: config.components.clone(),
        component: create.component.clone(),
        epic: create.epic.clone(),
        label: create.label.clone(),
        assignee: None,
        dry_run: create.dry_run,
        tag_source: !create.no_lp_tag,
        link_in_description: create.lp_link,
        skip_reconcile: create.no_reconcile,
    }
}

/// A job for `--sync-project-bugs`, or the configured jobs.
fn sync_jobs(
    config: &AppConfig,
    project: Option<String>,
    sync_project_bugs: Option<String>,
) -> Result<Vec<SyncJob>> {
    if let (Some(launchpad_project), Some(jira_project)) = (sync_project_bugs, project) {
        return Ok(vec![SyncJob {
            launchpad_project,
            jira_project,
            ..SyncJob::default()
        }]);
    }
    if config.sync.is_empty() {
        bail!("Nothing to sync: pass --sync-project-bugs <project> or add [[sync]] jobs to the config");
    }
    Ok(config.sync.clone())
}

fn days_ago(days: i64) -> chrono::NaiveDate {
    (chrono::Local::now() - chrono::Duration::days(days)).date_naive()
}

async fn handle_show(source: &dyn SourceService, bug: &str, json: bool) -> Result<ExitCode> {
    let record = match SourceRecord::fetch(source, bug).await {
        Ok(record) => record,
        Err(e @ (SyncError::NotFound(_) | SyncError::InvalidArgument(_))) => {
            log::error!("{e}");
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        println!("{record}");
        for package in record.packages() {
            println!(
                "{}: {}",
                package.name,
                record.affected_versions(&package.name).join(", ")
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn handle_import(
    config: &AppConfig,
    source: &dyn SourceService,
    target: &dyn TargetService,
    bug: &str,
    project: &str,
    exists: bool,
    create: &CreateArgs,
) -> Result<ExitCode> {
    let id = parse_id(bug)?;
    let raw = match source.fetch_record(id).await {
        Ok(raw) => raw,
        Err(SyncError::NotFound(_)) => {
            log::error!("Couldn't find the Launchpad bug {id}");
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };

    if exists {
        let marker = &config.policy.summary_marker;
        return Ok(match find_existing(target, marker, project, id).await? {
            Some(issue) => {
                println!("{}", target.browse_url(&issue.key));
                ExitCode::SUCCESS
            }
            None => {
                println!("Launchpad bug {id} is not in Jira project {project}");
                ExitCode::FAILURE
            }
        });
    }

    let options = sync_options(config, create);
    let job = SyncJob {
        jira_project: project.to_string(),
        ..SyncJob::default()
    };
    let outcome = Syncer::new(source, target, &options)
        .sync_bug(&raw, &job)
        .await
        .with_context(|| format!("Failed to import Launchpad bug {id}"))?;

    match outcome {
        SyncOutcome::Created(issue) => println!("{}", target.browse_url(&issue.key)),
        SyncOutcome::AlreadyImported(issue) => println!(
            "Launchpad bug {id} is already logged here {}",
            target.browse_url(&issue.key)
        ),
        SyncOutcome::DryRun(payload) => println!("(dry-run) {}", payload.summary),
        SyncOutcome::Skipped => {}
    }
    Ok(ExitCode::SUCCESS)
}

async fn handle_sync(
    config: &AppConfig,
    source: &dyn SourceService,
    target: &dyn TargetService,
    jobs: &[SyncJob],
    since: Option<chrono::NaiveDate>,
    tags: &[String],
    create: &CreateArgs,
) -> Result<ExitCode> {
    let options = sync_options(config, create);
    let syncer = Syncer::new(source, target, &options);

    for job in jobs {
        match syncer.sync_project(job, since, tags).await {
            Ok(summary) => log::info!(
                "{} -> {}: {} created, {} already imported, {} skipped, {} dry-run, {} failed",
                job.launchpad_project,
                job.jira_project,
                summary.created,
                summary.existing,
                summary.skipped,
                summary.dry_run,
                summary.failed
            ),
            Err(e) => log::error!(
                "Couldn't sync Launchpad project \"{}\": {e}",
                job.launchpad_project
            ),
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn handle_report(
    config: &AppConfig,
    source: &dyn SourceService,
    target: &dyn TargetService,
    project: &str,
    outputs: &render::ReportOutputs,
) -> Result<ExitCode> {
    let entries = report::build_report(source, target, project, &config.policy).await?;
    if entries.is_empty() {
        log::error!("No imported issues found in {project}");
        return Ok(ExitCode::FAILURE);
    }

    let requested = [&outputs.csv, &outputs.json, &outputs.html]
        .iter()
        .filter(|o| o.is_some())
        .count();
    let failures = render::write_all(&entries, outputs, &|key| target.browse_url(key));
    if requested > 0 && failures == requested {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

async fn handle_reconcile(
    config: &AppConfig,
    source: &dyn SourceService,
    target: &dyn TargetService,
    project: &str,
    dry_run: bool,
) -> Result<ExitCode> {
    let mut entries = report::build_report(source, target, project, &config.policy).await?;
    let reconciler = Reconciler::new(target, &config.policy, dry_run);
    let summary = reconciler.run(source, &mut entries).await;
    log::info!(
        "{} titles updated, {} issues moved to {}, {} unparseable, {} failed, {} still open",
        summary.titles_updated,
        summary.transitioned,
        config.policy.done_state,
        summary.bad_format,
        summary.failed,
        entries.len()
    );
    Ok(ExitCode::SUCCESS)
}
