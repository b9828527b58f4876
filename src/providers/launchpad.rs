use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::SourceService;
use crate::config::LaunchpadConfig;
use crate::error::{Result, SyncError};
use crate::model::raw_bug::{RawBug, RawTask};
use crate::model::status::{BugStatus, Importance};

struct Credentials {
    consumer_key: String,
    token: String,
    secret: String,
}

pub struct LaunchpadProvider {
    api_base: String,
    credentials: Option<Credentials>,
    client: reqwest::Client,
}

impl LaunchpadProvider {
    pub fn new(config: &LaunchpadConfig) -> Self {
        let credentials = match (
            &config.consumer_key,
            &config.access_token,
            &config.access_secret,
        ) {
            (Some(consumer_key), Some(token), Some(secret)) => Some(Credentials {
                consumer_key: consumer_key.clone(),
                token: token.clone(),
                secret: secret.clone(),
            }),
            _ => None,
        };
        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            credentials,
            client: reqwest::Client::new(),
        }
    }

    /// OAuth 1.0 PLAINTEXT header as Launchpad expects it.
    fn authorization(&self) -> Option<String> {
        let creds = self.credentials.as_ref()?;
        let now = chrono::Utc::now();
        Some(format!(
            "OAuth realm=\"https://api.launchpad.net/\", \
             oauth_consumer_key=\"{}\", oauth_token=\"{}\", \
             oauth_signature_method=\"PLAINTEXT\", oauth_signature=\"{}\", \
             oauth_timestamp=\"{}\", oauth_nonce=\"{}\", oauth_version=\"1.0\"",
            urlencoding::encode(&creds.consumer_key),
            urlencoding::encode(&creds.token),
            urlencoding::encode(&format!("&{}", creds.secret)),
            now.timestamp(),
            now.timestamp_nanos_opt().unwrap_or_default(),
        ))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        let mut req = self.client.get(url).header("Accept", "application/json");
        if let Some(auth) = self.authorization() {
            req = req.header("Authorization", auth);
        }
        let resp = req.send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(SyncError::NotFound(what.to_string()));
        }
        let resp = resp.error_for_status()?;
        Ok(resp.json().await?)
    }

    /// Follow `next_collection_link` until the collection is exhausted.
    async fn collect_entries<T: DeserializeOwned>(&self, first: String, what: &str) -> Result<Vec<T>> {
        let mut entries = Vec::new();
        let mut next = Some(first);
        let mut previous: Option<String> = None;

        while let Some(url) = next.take() {
            if previous.as_deref() == Some(url.as_str()) {
                log::warn!("{what}: collection link did not advance, stopping at {url}");
                break;
            }
            let page: Collection<T> = self.get_json(&url, what).await?;
            entries.extend(page.entries);
            next = page.next_collection_link;
            previous = Some(url);
        }

        Ok(entries)
    }
}

#[derive(Deserialize)]
struct Collection<T> {
    #[serde(default = "Vec::new")]
    entries: Vec<T>,
    next_collection_link: Option<String>,
}

#[derive(Deserialize)]
struct LpBug {
    id: u64,
    title: String,
    description: Option<String>,
    heat: Option<u64>,
    #[serde(default)]
    tags: Vec<String>,
    web_link: Option<String>,
    date_last_updated: Option<String>,
    bug_tasks_collection_link: String,
}

#[derive(Deserialize)]
struct LpTask {
    bug_target_name: String,
    status: BugStatus,
    importance: Importance,
    assignee_link: Option<String>,
}

#[derive(Deserialize)]
struct LpTaskRef {
    bug_link: String,
}

/// `https://api.launchpad.net/devel/~alice` -> `alice`
fn account_name(link: &str) -> Option<String> {
    link.rsplit('/')
        .next()
        .and_then(|s| s.strip_prefix('~'))
        .map(String::from)
}

/// `https://api.launchpad.net/devel/bugs/123` -> `123`
fn bug_id_from_link(link: &str) -> Option<u64> {
    link.trim_end_matches('/').rsplit('/').next()?.parse().ok()
}

fn search_query(since: Option<NaiveDate>, tags: &[String]) -> String {
    let mut params = vec!["ws.op=searchTasks".to_string()];
    params.extend(
        BugStatus::SEARCHABLE
            .iter()
            .map(|s| format!("status={}", urlencoding::encode(s.as_str()))),
    );
    if let Some(date) = since {
        params.push(format!("created_since={}", date.format("%Y-%m-%d")));
    }
    params.extend(tags.iter().map(|t| format!("tags={}", urlencoding::encode(t))));
    params.join("&")
}

#[async_trait]
impl SourceService for LaunchpadProvider {
    fn name(&self) -> &str {
        "Launchpad"
    }

    async fn fetch_record(&self, id: u64) -> Result<RawBug> {
        let what = format!("Launchpad bug {id}");
        let bug: LpBug = self
            .get_json(&format!("{}/bugs/{id}", self.api_base), &what)
            .await?;
        let tasks: Vec<LpTask> = self
            .collect_entries(bug.bug_tasks_collection_link.clone(), &what)
            .await?;

        Ok(RawBug {
            id: bug.id,
            title: bug.title,
            description: bug.description.unwrap_or_default(),
            heat: bug.heat.unwrap_or_default(),
            tags: bug.tags,
            web_link: bug
                .web_link
                .unwrap_or_else(|| format!("https://bugs.launchpad.net/bugs/{id}")),
            date_last_updated: bug.date_last_updated,
            tasks: tasks
                .into_iter()
                .map(|t| RawTask {
                    target_name: t.bug_target_name,
                    status: t.status,
                    importance: t.importance,
                    assignee: t.assignee_link.as_deref().and_then(account_name),
                })
                .collect(),
        })
    }

    async fn search_project_tasks(
        &self,
        project: &str,
        since: Option<NaiveDate>,
        tags: &[String],
    ) -> Result<Vec<u64>> {
        let url = format!("{}/{project}?{}", self.api_base, search_query(since, tags));
        let what = format!("Launchpad project \"{project}\"");
        let refs: Vec<LpTaskRef> = self.collect_entries(url, &what).await?;

        let mut ids: Vec<u64> = Vec::new();
        for task in refs {
            match bug_id_from_link(&task.bug_link) {
                Some(id) if !ids.contains(&id) => ids.push(id),
                Some(_) => {}
                None => log::warn!("Ignoring task with unexpected bug link {}", task.bug_link),
            }
        }
        Ok(ids)
    }

    async fn save(&self, bug: &RawBug) -> Result<()> {
        let auth = self.authorization().ok_or_else(|| {
            SyncError::Remote("Launchpad credentials are required to modify bugs".into())
        })?;
        let body = json!({ "tags": bug.tags, "description": bug.description });
        let resp = self
            .client
            .patch(format!("{}/bugs/{}", self.api_base, bug.id))
            .header("Authorization", auth)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(SyncError::NotFound(format!("Launchpad bug {}", bug.id)));
        }
        resp.error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_links() {
        assert_eq!(
            account_name("https://api.launchpad.net/devel/~alice").as_deref(),
            Some("alice")
        );
        assert_eq!(account_name("https://api.launchpad.net/devel/alice"), None);
        assert_eq!(
            bug_id_from_link("https://api.launchpad.net/devel/bugs/1234567"),
            Some(1234567)
        );
        assert_eq!(bug_id_from_link("https://api.launchpad.net/devel/bugs/x"), None);
    }

    #[test]
    fn search_query_carries_filters() {
        let since = NaiveDate::from_ymd_opt(2021, 10, 1);
        let query = search_query(since, &["go-to-jira".into(), "-ignore-these".into()]);
        assert!(query.starts_with("ws.op=searchTasks&status=New&"));
        assert!(query.contains("status=Won%27t%20Fix"));
        assert!(query.contains("status=Fix%20Released"));
        assert!(query.contains("created_since=2021-10-01"));
        assert!(query.ends_with("tags=go-to-jira&tags=-ignore-these"));
    }

    #[test]
    fn anonymous_without_credentials() {
        let provider = LaunchpadProvider::new(&LaunchpadConfig::default());
        assert!(provider.authorization().is_none());

        let provider = LaunchpadProvider::new(&LaunchpadConfig {
            consumer_key: Some("lp-to-jira".into()),
            access_token: Some("tok".into()),
            access_secret: Some("sec".into()),
            ..LaunchpadConfig::default()
        });
        let auth = provider.authorization().unwrap();
        assert!(auth.starts_with("OAuth realm="));
        assert!(auth.contains("oauth_signature=\"%26sec\""));
        assert!(auth.contains("oauth_token=\"tok\""));
    }

    #[test]
    fn task_entries_deserialize() {
        let page: Collection<LpTask> = serde_json::from_value(serde_json::json!({
            "entries": [{
                "bug_target_name": "systemd (Ubuntu Focal)",
                "status": "Fix Committed",
                "importance": "High",
                "assignee_link": null
            }],
            "total_size": 1
        }))
        .unwrap();
        assert!(page.next_collection_link.is_none());
        assert_eq!(page.entries[0].status, BugStatus::FixCommitted);
        assert_eq!(page.entries[0].importance, Importance::High);
    }
}
