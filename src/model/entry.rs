use serde::ser::{Serialize, SerializeMap, Serializer};

use super::series::{Series, TRACKED_COUNT};

pub const NOT_AVAILABLE: &str = "N/A";

/// One row of the report: a target issue joined with its source record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationEntry {
    pub key: String,
    pub summary: String,
    pub status: String,
    /// Source identifier as text; `N/A` when the source record is gone.
    pub source_id: String,
    pub heat: String,
    pub importance: String,
    pub packages: String,
    /// One status per entry of [`Series::TRACKED`].
    pub series: [String; TRACKED_COUNT],
}

impl ReconciliationEntry {
    pub fn new(key: &str, summary: &str, status: &str, source_id: u64) -> Self {
        Self {
            key: key.to_string(),
            summary: summary.to_string(),
            status: status.to_string(),
            source_id: source_id.to_string(),
            heat: String::new(),
            importance: String::new(),
            packages: String::new(),
            series: Default::default(),
        }
    }

    /// Mark every source-derived column as unavailable.
    pub fn mark_unavailable(&mut self) {
        self.source_id = NOT_AVAILABLE.into();
        self.heat = NOT_AVAILABLE.into();
        self.importance = NOT_AVAILABLE.into();
        self.packages = NOT_AVAILABLE.into();
        self.series = std::array::from_fn(|_| NOT_AVAILABLE.to_string());
    }

    pub fn source_id(&self) -> Option<u64> {
        self.source_id.parse().ok()
    }

    pub fn headers() -> Vec<&'static str> {
        let mut headers = vec![
            "Jira ID",
            "Summary",
            "Status",
            "LaunchPad ID",
            "Heat",
            "Importance",
            "Packages",
        ];
        headers.extend(Series::TRACKED.iter().map(Series::column_name));
        headers
    }

    pub fn row(&self) -> Vec<&str> {
        let mut row = vec![
            self.key.as_str(),
            self.summary.as_str(),
            self.status.as_str(),
            self.source_id.as_str(),
            self.heat.as_str(),
            self.importance.as_str(),
            self.packages.as_str(),
        ];
        row.extend(self.series.iter().map(String::as_str));
        row
    }
}

impl Serialize for ReconciliationEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let headers = Self::headers();
        let row = self.row();
        let mut map = serializer.serialize_map(Some(headers.len()))?;
        for (header, value) in headers.iter().zip(row) {
            map.serialize_entry(header, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_series_column_is_present() {
        let entry = ReconciliationEntry::new("KEY-001", "ID#1 [x] t", "Backlog", 1);
        assert_eq!(entry.row().len(), ReconciliationEntry::headers().len());

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.starts_with("{\"Jira ID\":\"KEY-001\",\"Summary\":"));
        assert!(json.contains("\"Devel\":\"\""));
        assert!(json.ends_with("\"Trusty\":\"\"}"));
    }

    #[test]
    fn unavailable_entries() {
        let mut entry = ReconciliationEntry::new("KEY-001", "ID#1 [x] t", "Backlog", 1);
        assert_eq!(entry.source_id(), Some(1));
        entry.mark_unavailable();
        assert_eq!(entry.source_id(), None);
        assert!(entry.series.iter().all(|s| s == NOT_AVAILABLE));
    }
}
