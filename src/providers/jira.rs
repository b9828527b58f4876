use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;

use super::TargetService;
use crate::config::JiraConfig;
use crate::error::{Result, SyncError};
use crate::model::issue::{IssueRef, IssueSummary, TargetIssuePayload};
use crate::util::adf::text_to_adf;

const LAUNCHPAD_FAVICON: &str = "https://bugs.launchpad.net/favicon.ico";

pub struct JiraProvider {
    base_url: String,
    auth_header: String,
    page_size: usize,
    client: reqwest::Client,
    tokens: PageTokens,
}

/// `/search/jql` pages by opaque token. Remember the token that continues
/// each query at each offset so searches can still be asked for by offset.
#[derive(Default)]
struct PageTokens(Mutex<HashMap<(String, usize), String>>);

impl PageTokens {
    fn get(&self, query: &str, offset: usize) -> Option<String> {
        let tokens = self.0.lock().ok()?;
        tokens.get(&(query.to_string(), offset)).cloned()
    }

    fn record(&self, query: &str, offset: usize, token: String) {
        if let Ok(mut tokens) = self.0.lock() {
            tokens.insert((query.to_string(), offset), token);
        }
    }
}

impl JiraProvider {
    pub fn new(config: &JiraConfig, page_size: usize) -> Self {
        let creds = format!("{}:{}", config.login, config.api_token);
        let encoded = base64::engine::general_purpose::STANDARD.encode(creds);
        Self {
            base_url: config.server.trim_end_matches('/').to_string(),
            auth_header: format!("Basic {encoded}"),
            page_size,
            client: reqwest::Client::new(),
            tokens: PageTokens::default(),
        }
    }

    fn search_path(&self, query: &str, token: Option<&str>) -> String {
        let mut path = format!(
            "/rest/api/3/search/jql?jql={}&maxResults={}&fields=summary,status",
            urlencoding::encode(query),
            self.page_size
        );
        if let Some(token) = token {
            path.push_str(&format!("&nextPageToken={}", urlencoding::encode(token)));
        }
        path
    }

    async fn search_page(&self, query: &str, token: Option<&str>) -> Result<SearchResponse> {
        let path = self.search_path(query, token);
        let resp = check(self.get(&path).send().await?, "Jira search").await?;
        Ok(resp.json().await?)
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{path}", self.base_url))
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
    }

    fn post(&self, path: &str, body: &serde_json::Value) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{path}", self.base_url))
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .json(body)
    }
}

/// Map non-success responses onto the error taxonomy.
async fn check(resp: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(SyncError::NotFound(what.to_string()));
    }
    let body = resp.text().await.unwrap_or_default();
    Err(SyncError::Remote(format!("{what}: HTTP {status}: {body}")))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<JiraIssue>,
    next_page_token: Option<String>,
}

impl From<JiraIssue> for IssueSummary {
    fn from(issue: JiraIssue) -> Self {
        IssueSummary {
            id: issue.id,
            key: issue.key,
            summary: issue.fields.summary.unwrap_or_default(),
            status: issue.fields.status.map(|s| s.name).unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
struct JiraIssue {
    id: String,
    key: String,
    fields: IssueFields,
}

#[derive(Deserialize)]
struct IssueFields {
    summary: Option<String>,
    status: Option<StatusField>,
}

#[derive(Deserialize)]
struct StatusField {
    name: String,
}

#[derive(Deserialize)]
struct CreatedIssue {
    id: String,
    key: String,
}

#[derive(Deserialize)]
struct TransitionsResponse {
    transitions: Vec<Transition>,
}

#[derive(Deserialize)]
struct Transition {
    id: String,
    name: String,
    to: Option<StatusField>,
}

fn issue_fields(payload: &TargetIssuePayload) -> serde_json::Value {
    let mut fields = json!({
        "project": { "key": payload.project },
        "summary": payload.summary,
        "description": text_to_adf(&payload.description),
        "issuetype": { "name": payload.issue_type },
    });
    if let Some(component) = &payload.component {
        fields["components"] = json!([{ "name": component }]);
    }
    if let Some(label) = &payload.label {
        fields["labels"] = json!([label]);
    }
    if let Some(assignee) = &payload.assignee {
        fields["assignee"] = json!({ "accountId": assignee });
    }
    fields
}

#[async_trait]
impl TargetService for JiraProvider {
    fn name(&self) -> &str {
        "Jira"
    }

    async fn search_issues(&self, query: &str, start_at: usize) -> Result<Vec<IssueSummary>> {
        // Resume from a remembered token, or walk forward from the start.
        let (mut offset, mut token) = match self.tokens.get(query, start_at) {
            Some(token) if start_at > 0 => (start_at, Some(token)),
            _ => (0, None),
        };

        loop {
            let page = self.search_page(query, token.as_deref()).await?;
            let next_offset = offset + page.issues.len();
            if let Some(next) = &page.next_page_token {
                self.tokens.record(query, next_offset, next.clone());
            }

            let done = page.issues.is_empty() || page.next_page_token.is_none();
            if next_offset > start_at || done {
                return Ok(page
                    .issues
                    .into_iter()
                    .skip(start_at.saturating_sub(offset))
                    .map(IssueSummary::from)
                    .collect());
            }
            offset = next_offset;
            token = page.next_page_token;
        }
    }

    async fn create_issue(&self, payload: &TargetIssuePayload) -> Result<IssueRef> {
        let body = json!({ "fields": issue_fields(payload) });
        let resp = check(
            self.post("/rest/api/3/issue", &body).send().await?,
            "Jira issue creation",
        )
        .await?;
        let created: CreatedIssue = resp.json().await?;
        Ok(IssueRef {
            id: created.id,
            key: created.key,
        })
    }

    async fn add_link(&self, issue: &IssueRef, url: &str, title: &str) -> Result<()> {
        let body = json!({
            "object": {
                "url": url,
                "title": title,
                "icon": { "url16x16": LAUNCHPAD_FAVICON },
            }
        });
        let path = format!("/rest/api/3/issue/{}/remotelink", issue.key);
        check(self.post(&path, &body).send().await?, "Jira remote link").await?;
        Ok(())
    }

    async fn add_to_epic(&self, epic: &str, issue_ids: &[String]) -> Result<()> {
        let body = json!({ "issues": issue_ids });
        let path = format!("/rest/agile/1.0/epic/{epic}/issue");
        check(self.post(&path, &body).send().await?, &format!("Epic {epic}")).await?;
        Ok(())
    }

    async fn transition(&self, key: &str, state: &str) -> Result<()> {
        let path = format!("/rest/api/3/issue/{key}/transitions");
        let resp = check(self.get(&path).send().await?, key).await?;
        let available: TransitionsResponse = resp.json().await?;

        let transition = available
            .transitions
            .iter()
            .find(|t| {
                t.name.eq_ignore_ascii_case(state)
                    || t.to
                        .as_ref()
                        .is_some_and(|to| to.name.eq_ignore_ascii_case(state))
            })
            .ok_or_else(|| SyncError::NotFound(format!("Transition to {state} for {key}")))?;

        let body = json!({ "transition": { "id": transition.id } });
        check(self.post(&path, &body).send().await?, key).await?;
        Ok(())
    }

    async fn add_comment(&self, key: &str, text: &str) -> Result<()> {
        let body = json!({ "body": text_to_adf(text) });
        let path = format!("/rest/api/3/issue/{key}/comment");
        check(self.post(&path, &body).send().await?, key).await?;
        Ok(())
    }

    async fn update_summary(&self, key: &str, summary: &str) -> Result<()> {
        let body = json!({ "fields": { "summary": summary } });
        let resp = self
            .client
            .put(format!("{}/rest/api/3/issue/{key}", self.base_url))
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;
        check(resp, key).await?;
        Ok(())
    }

    fn browse_url(&self, key: &str) -> String {
        format!("{}/browse/{key}", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> JiraProvider {
        JiraProvider::new(
            &JiraConfig {
                server: "https://example.atlassian.net/".into(),
                login: "me@example.com".into(),
                api_token: "token".into(),
            },
            50,
        )
    }

    #[test]
    fn browse_url_strips_trailing_slash() {
        assert_eq!(
            provider().browse_url("FR-12"),
            "https://example.atlassian.net/browse/FR-12"
        );
    }

    #[test]
    fn search_uses_jql_endpoint_with_token() {
        let jira = provider();
        assert_eq!(
            jira.search_path("project = \"FR\"", None),
            "/rest/api/3/search/jql?jql=project%20%3D%20%22FR%22&maxResults=50&fields=summary,status"
        );
        assert!(jira
            .search_path("project = \"FR\"", Some("a+b="))
            .ends_with("&nextPageToken=a%2Bb%3D"));
    }

    #[test]
    fn page_tokens_are_keyed_by_query_and_offset() {
        let tokens = PageTokens::default();
        tokens.record("q", 50, "t1".into());
        assert_eq!(tokens.get("q", 50).as_deref(), Some("t1"));
        assert_eq!(tokens.get("q", 100), None);
        assert_eq!(tokens.get("other", 50), None);
    }

    #[test]
    fn search_response_carries_next_token() {
        let page: SearchResponse = serde_json::from_value(json!({
            "issues": [{
                "id": "10001",
                "key": "FR-1",
                "fields": { "summary": "ID#1 [apt] t", "status": { "name": "Backlog" } }
            }],
            "nextPageToken": "abc",
            "isLast": false
        }))
        .unwrap();
        assert_eq!(page.next_page_token.as_deref(), Some("abc"));
        let issue = IssueSummary::from(page.issues.into_iter().next().unwrap());
        assert_eq!(issue.key, "FR-1");
        assert_eq!(issue.status, "Backlog");
    }

    #[test]
    fn fields_include_only_set_optionals() {
        let mut payload = TargetIssuePayload {
            project: "FR".into(),
            summary: "ID#1 [apt] Broken".into(),
            description: "text".into(),
            issue_type: "Bug".into(),
            component: None,
            label: None,
            assignee: None,
        };
        let fields = issue_fields(&payload);
        assert_eq!(fields["project"]["key"], "FR");
        assert_eq!(fields["issuetype"]["name"], "Bug");
        assert!(fields.get("components").is_none());
        assert!(fields.get("labels").is_none());

        payload.component = Some("Package Management".into());
        payload.label = Some("ubuntu-meeting".into());
        let fields = issue_fields(&payload);
        assert_eq!(fields["components"][0]["name"], "Package Management");
        assert_eq!(fields["labels"][0], "ubuntu-meeting");
    }
}
