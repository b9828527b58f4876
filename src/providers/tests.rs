//! In-memory services used by the sync, reconcile and report tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::{SourceService, TargetService};
use crate::error::{Result, SyncError};
use crate::model::issue::{IssueRef, IssueSummary, TargetIssuePayload};
use crate::model::raw_bug::{RawBug, RawTask};
use crate::model::status::{BugStatus, Importance};

pub fn raw_bug(id: u64, title: &str, tasks: Vec<RawTask>) -> RawBug {
    RawBug {
        id,
        title: title.to_string(),
        description: "This is the longer description".into(),
        heat: 0,
        tags: vec![],
        web_link: format!("https://bugs.launchpad.net/bugs/{id}"),
        date_last_updated: Some("2021-10-01 10:00:00+00:00".into()),
        tasks,
    }
}

pub fn task(target: &str, status: BugStatus, importance: Importance) -> RawTask {
    RawTask::new(target, status, importance)
}

#[derive(Default)]
pub struct FakeSource {
    pub bugs: Mutex<HashMap<u64, RawBug>>,
    pub projects: HashMap<String, Vec<u64>>,
    pub saved: Mutex<Vec<RawBug>>,
    pub failing_ids: Vec<u64>,
    pub fail_save: bool,
}

impl FakeSource {
    pub fn with_bugs(bugs: Vec<RawBug>) -> Self {
        Self {
            bugs: Mutex::new(bugs.into_iter().map(|b| (b.id, b)).collect()),
            ..Self::default()
        }
    }

    pub fn with_project(mut self, project: &str, ids: Vec<u64>) -> Self {
        self.projects.insert(project.to_string(), ids);
        self
    }

    pub fn bug(&self, id: u64) -> RawBug {
        self.bugs.lock().unwrap()[&id].clone()
    }

    pub fn set_title(&self, id: u64, title: &str) {
        self.bugs.lock().unwrap().get_mut(&id).unwrap().title = title.to_string();
    }
}

#[async_trait]
impl SourceService for FakeSource {
    fn name(&self) -> &str {
        "FakeSource"
    }

    async fn fetch_record(&self, id: u64) -> Result<RawBug> {
        if self.failing_ids.contains(&id) {
            return Err(SyncError::Remote(format!("connection reset fetching {id}")));
        }
        self.bugs
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(format!("Bug {id}")))
    }

    async fn search_project_tasks(
        &self,
        project: &str,
        _since: Option<NaiveDate>,
        _tags: &[String],
    ) -> Result<Vec<u64>> {
        self.projects
            .get(project)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(format!("Project {project}")))
    }

    async fn save(&self, bug: &RawBug) -> Result<()> {
        if self.fail_save {
            return Err(SyncError::Remote(format!("HTTP 401 saving bug {}", bug.id)));
        }
        self.bugs.lock().unwrap().insert(bug.id, bug.clone());
        self.saved.lock().unwrap().push(bug.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeTarget {
    pub issues: Mutex<Vec<IssueSummary>>,
    pub created: Mutex<Vec<TargetIssuePayload>>,
    pub links: Mutex<Vec<(String, String, String)>>,
    pub epics: Mutex<Vec<(String, Vec<String>)>>,
    pub transitions: Mutex<Vec<(String, String)>>,
    pub comments: Mutex<Vec<(String, String)>>,
    pub summaries: Mutex<Vec<(String, String)>>,
    pub searches: Mutex<Vec<(String, usize)>>,
    pub page_size: usize,
    pub fail_epic: bool,
    pub fail_create: bool,
    /// Keep answering with the first page no matter the start index.
    pub stuck_pagination: bool,
}

impl FakeTarget {
    pub fn new() -> Self {
        Self {
            page_size: 50,
            ..Self::default()
        }
    }

    pub fn with_issue(self, key: &str, summary: &str, status: &str) -> Self {
        {
            let mut issues = self.issues.lock().unwrap();
            let id = format!("1{}", issues.len());
            issues.push(IssueSummary {
                id,
                key: key.to_string(),
                summary: summary.to_string(),
                status: status.to_string(),
            });
        }
        self
    }

    pub fn issue(&self, key: &str) -> IssueSummary {
        self.issues
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.key == key)
            .cloned()
            .unwrap()
    }
}

/// Value of the first `<field> <op> "<value>"` clause in a query.
fn quoted_after<'a>(query: &'a str, clause: &str) -> Option<&'a str> {
    let start = query.find(clause)? + clause.len();
    let rest = query[start..].trim_start().strip_prefix('"')?;
    rest.split('"').next()
}

#[async_trait]
impl TargetService for FakeTarget {
    fn name(&self) -> &str {
        "FakeTarget"
    }

    async fn search_issues(&self, query: &str, start_at: usize) -> Result<Vec<IssueSummary>> {
        self.searches
            .lock()
            .unwrap()
            .push((query.to_string(), start_at));

        let project = quoted_after(query, "project =").unwrap_or_default();
        let needle = quoted_after(query, "summary ~").unwrap_or_default();
        let start = if self.stuck_pagination { 0 } else { start_at };

        Ok(self
            .issues
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.key.starts_with(&format!("{project}-")))
            .filter(|i| i.summary.contains(needle))
            .skip(start)
            .take(self.page_size)
            .cloned()
            .collect())
    }

    async fn create_issue(&self, payload: &TargetIssuePayload) -> Result<IssueRef> {
        if self.fail_create {
            return Err(SyncError::Remote("HTTP 500".into()));
        }
        let mut issues = self.issues.lock().unwrap();
        let n = issues.len() + 1;
        let issue = IssueSummary {
            id: format!("100{n}"),
            key: format!("{}-{n}", payload.project),
            summary: payload.summary.clone(),
            status: "Backlog".into(),
        };
        let issue_ref = IssueRef::from(&issue);
        issues.push(issue);
        self.created.lock().unwrap().push(payload.clone());
        Ok(issue_ref)
    }

    async fn add_link(&self, issue: &IssueRef, url: &str, title: &str) -> Result<()> {
        self.links
            .lock()
            .unwrap()
            .push((issue.key.clone(), url.to_string(), title.to_string()));
        Ok(())
    }

    async fn add_to_epic(&self, epic: &str, issue_ids: &[String]) -> Result<()> {
        if self.fail_epic {
            return Err(SyncError::NotFound(format!("Epic {epic}")));
        }
        self.epics
            .lock()
            .unwrap()
            .push((epic.to_string(), issue_ids.to_vec()));
        Ok(())
    }

    async fn transition(&self, key: &str, state: &str) -> Result<()> {
        let mut issues = self.issues.lock().unwrap();
        let issue = issues
            .iter_mut()
            .find(|i| i.key == key)
            .ok_or_else(|| SyncError::NotFound(key.to_string()))?;
        issue.status = state.to_string();
        self.transitions
            .lock()
            .unwrap()
            .push((key.to_string(), state.to_string()));
        Ok(())
    }

    async fn add_comment(&self, key: &str, text: &str) -> Result<()> {
        self.comments
            .lock()
            .unwrap()
            .push((key.to_string(), text.to_string()));
        Ok(())
    }

    async fn update_summary(&self, key: &str, summary: &str) -> Result<()> {
        let mut issues = self.issues.lock().unwrap();
        let issue = issues
            .iter_mut()
            .find(|i| i.key == key)
            .ok_or_else(|| SyncError::NotFound(key.to_string()))?;
        issue.summary = summary.to_string();
        self.summaries
            .lock()
            .unwrap()
            .push((key.to_string(), summary.to_string()));
        Ok(())
    }

    fn browse_url(&self, key: &str) -> String {
        format!("https://jira.example.com/browse/{key}")
    }
}

#[tokio::test]
async fn fake_target_filters_by_project_and_summary() {
    let target = FakeTarget::new()
        .with_issue("FR-1", "ID#1 [apt] one", "Backlog")
        .with_issue("FR-2", "unrelated", "Backlog")
        .with_issue("PR-3", "ID#1 [apt] one", "Backlog");

    let found = target
        .search_issues("project = \"FR\" AND summary ~ \"ID#1\"", 0)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].key, "FR-1");

    let past_end = target
        .search_issues("project = \"FR\" AND summary ~ \"ID#1\"", 50)
        .await
        .unwrap();
    assert!(past_end.is_empty());
}

#[tokio::test]
async fn fake_source_reports_missing_bugs() {
    let source = FakeSource::with_bugs(vec![raw_bug(1, "one", vec![])]);
    assert!(source.fetch_record(1).await.is_ok());
    assert!(matches!(
        source.fetch_record(2).await,
        Err(SyncError::NotFound(_))
    ));
    assert!(matches!(
        source.search_project_tasks("nope", None, &[]).await,
        Err(SyncError::NotFound(_))
    ));
}
