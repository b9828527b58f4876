use std::collections::HashMap;

use crate::model::issue::{SummaryMarker, TargetIssuePayload};
use crate::model::source_record::SourceRecord;

/// Per-issue choices layered over the configured defaults.
#[derive(Debug, Clone, Default)]
pub struct IssueFields<'a> {
    /// Explicit component, e.g. from the command line.
    pub component: Option<&'a str>,
    /// Component configured on the sync job.
    pub job_component: Option<&'a str>,
    pub label: Option<&'a str>,
    pub assignee: Option<&'a str>,
}

pub struct PayloadBuilder<'a> {
    pub marker: &'a SummaryMarker,
    pub components: &'a HashMap<String, String>,
    /// Used when nothing else resolves; `None` omits the component.
    pub fallback_component: Option<&'a str>,
}

impl PayloadBuilder<'_> {
    pub fn build(
        &self,
        record: &SourceRecord,
        project: &str,
        issue_type: &str,
        fields: &IssueFields<'_>,
    ) -> TargetIssuePayload {
        TargetIssuePayload {
            project: project.to_string(),
            summary: self
                .marker
                .summary(record.id, &package_list(record), record.title.trim()),
            description: record.description.clone(),
            issue_type: issue_type.to_string(),
            component: self.resolve_component(record, fields),
            label: fields.label.map(String::from),
            assignee: fields.assignee.map(String::from),
        }
    }

    /// Explicit override, then the job default, then the package table,
    /// then the configured fallback.
    pub fn resolve_component(&self, record: &SourceRecord, fields: &IssueFields<'_>) -> Option<String> {
        fields
            .component
            .or(fields.job_component)
            .map(String::from)
            .or_else(|| {
                record
                    .affected_packages()
                    .iter()
                    .find_map(|pkg| self.components.get(*pkg).cloned())
            })
            .or_else(|| self.fallback_component.map(String::from))
    }
}

/// Text inside the summary brackets.
fn package_list(record: &SourceRecord) -> String {
    let packages = record.affected_packages();
    if packages.is_empty() {
        "none".into()
    } else {
        packages.join(", ")
    }
}
