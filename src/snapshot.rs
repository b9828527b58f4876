use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub jira_key: String,
    pub last_change: String,
}

/// Source identifier -> imported issue and the source's last update time,
/// persisted as a flat JSON object.
pub struct Snapshot {
    path: PathBuf,
    entries: BTreeMap<u64, SnapshotEntry>,
}

impl Snapshot {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            entries: BTreeMap::new(),
        }
    }

    /// Load `path`, or `None` when there is no snapshot yet.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let entries = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(Self {
            path: path.to_path_buf(),
            entries,
        }))
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }

    pub fn insert(&mut self, id: u64, entry: SnapshotEntry) {
        self.entries.insert(id, entry);
    }

    pub fn get(&self, id: u64) -> Option<&SnapshotEntry> {
        self.entries.get(&id)
    }

    pub fn set_last_change(&mut self, id: u64, last_change: &str) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.last_change = last_change.to_string();
        }
    }

    pub fn ids(&self) -> Vec<u64> {
        self.entries.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("db.json");
        assert!(Snapshot::load(&path).unwrap().is_none());

        let mut snapshot = Snapshot::new(&path);
        assert!(snapshot.is_empty());
        snapshot.insert(
            1_234_567,
            SnapshotEntry {
                jira_key: "FR-1".into(),
                last_change: "2021-10-01".into(),
            },
        );
        snapshot.save().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"1234567\""));
        assert!(contents.contains("\"jira_key\": \"FR-1\""));

        let mut loaded = Snapshot::load(&path).unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(!loaded.is_empty());
        loaded.set_last_change(1_234_567, "2021-10-02");
        assert_eq!(loaded.get(1_234_567).unwrap().last_change, "2021-10-02");
        assert_eq!(loaded.ids(), vec![1_234_567]);
    }

    #[test]
    fn corrupt_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(Snapshot::load(&path).is_err());
    }
}
