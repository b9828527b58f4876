use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::model::issue::SummaryMarker;

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    pub jira: Option<JiraConfig>,
    #[serde(default)]
    pub launchpad: LaunchpadConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    /// Package name -> Jira component, used when no component is given.
    #[serde(default = "default_components")]
    pub components: HashMap<String, String>,
    #[serde(default)]
    pub sync: Vec<SyncJob>,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

#[derive(Debug, Deserialize)]
pub struct JiraConfig {
    /// e.g. `https://example.atlassian.net`
    pub server: String,
    pub login: String,
    pub api_token: String,
}

#[derive(Debug, Deserialize)]
pub struct LaunchpadConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    pub consumer_key: Option<String>,
    pub access_token: Option<String>,
    pub access_secret: Option<String>,
}

impl Default for LaunchpadConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            consumer_key: None,
            access_token: None,
            access_secret: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub summary_marker: SummaryMarker,
    /// Component used when nothing else resolves. Unset means the issue is
    /// created without a component.
    pub fallback_component: Option<String>,
    pub issue_type: String,
    pub released_status: String,
    pub done_state: String,
    pub active_statuses: Vec<String>,
    pub page_size: usize,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            summary_marker: SummaryMarker::default(),
            fallback_component: None,
            issue_type: "Bug".into(),
            released_status: "Fix Released".into(),
            done_state: "Done".into(),
            active_statuses: [
                "BLOCKED",
                "Backlog",
                "In Progress",
                "REVIEW",
                "Selected for Development",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            page_size: 50,
        }
    }
}

/// One Launchpad project mirrored into one Jira project.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SyncJob {
    pub launchpad_project: String,
    pub jira_project: String,
    /// Only bugs with a task assigned to one of these accounts are synced.
    /// Unset syncs everything.
    pub assignees: Option<Vec<String>>,
    pub issue_type: Option<String>,
    pub component: Option<String>,
    pub epic: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub interval_secs: u64,
    pub snapshot: PathBuf,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            snapshot: PathBuf::from("lp_to_jira_db.json"),
        }
    }
}

fn default_api_base() -> String {
    "https://api.launchpad.net/devel".into()
}

fn default_components() -> HashMap<String, String> {
    [
        ("nplan", "netplan"),
        ("netplan.io", "netplan"),
        ("netplan", "netplan"),
        ("systemd", "systemd"),
        ("s390-tools", "IBM"),
        ("subiquity", "subiquity"),
        ("curtin", "subiquity"),
        ("ubuntu-image", "Ubuntu Image"),
        ("shim-signed", "Secure Boot"),
        ("openjdk-lts", "OpenJDK"),
        ("apt", "Package Management"),
        ("aptdaemon", "Package Management"),
        ("ubuntu-release-upgrader", "Package Management"),
        ("solutions-qa-ci", "Solutions QA CI"),
        ("cpe-foundation", "FCE"),
        ("fce-templates", "FCE Templates"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".lp-to-jira")
}

fn config_path() -> PathBuf {
    data_dir().join("config.toml")
}

pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_path);
    if !path.exists() {
        return Ok(AppConfig {
            components: default_components(),
            ..AppConfig::default()
        });
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert!(config.jira.is_none());
        assert_eq!(config.launchpad.api_base, "https://api.launchpad.net/devel");
        assert_eq!(config.policy.summary_marker.as_str(), "ID#");
        assert_eq!(config.policy.fallback_component, None);
        assert_eq!(config.policy.page_size, 50);
        assert_eq!(config.components.get("curtin").map(String::as_str), Some("subiquity"));
        assert_eq!(config.monitor.interval_secs, 300);
    }

    #[test]
    fn full_config() {
        let config = parse_config(
            r#"
            [jira]
            server = "https://example.atlassian.net"
            login = "me@example.com"
            api_token = "secret"

            [policy]
            summary_marker = "LP#"
            fallback_component = "Distro"
            done_state = "Closed"

            [components]
            zsh = "Shells"

            [[sync]]
            launchpad_project = "subiquity"
            jira_project = "FR"
            assignees = ["alice", "bob"]
            epic = "FR-1"

            [monitor]
            interval_secs = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.jira.unwrap().login, "me@example.com");
        assert_eq!(config.policy.summary_marker.as_str(), "LP#");
        assert_eq!(config.policy.fallback_component.as_deref(), Some("Distro"));
        assert_eq!(config.policy.done_state, "Closed");
        assert_eq!(config.policy.issue_type, "Bug");
        assert_eq!(config.components.len(), 1);
        assert_eq!(config.sync.len(), 1);
        assert_eq!(
            config.sync[0].assignees.as_deref(),
            Some(&["alice".to_string(), "bob".to_string()][..])
        );
        assert_eq!(config.monitor.interval_secs, 60);
    }

    #[test]
    fn load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("nope.toml"))).unwrap();
        assert!(config.sync.is_empty());
        assert!(!config.components.is_empty());
    }

    #[test]
    fn load_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[jira").unwrap();
        let err = load_config(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }
}
