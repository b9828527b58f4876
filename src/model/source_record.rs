use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

use super::raw_bug::RawBug;
use super::series::{parse_target_name, platform_package, Series};
use super::status::{BugStatus, Importance};
use crate::error::{Result, SyncError};
use crate::providers::SourceService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesDetail {
    pub status: BugStatus,
    pub importance: Importance,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    pub name: String,
    /// Series in the order their tasks were discovered.
    pub series: Vec<(Series, SeriesDetail)>,
}

/// A source bug normalised into package -> series -> {status, importance}.
///
/// Only tasks against the platform distribution contribute; a task with no
/// series counts for the development series and tasks on unknown series
/// are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub heat: u64,
    packages: Vec<PackageInfo>,
}

/// Parse a numeric bug identifier as typed by a user.
pub fn parse_id(id: &str) -> Result<u64> {
    id.trim()
        .parse()
        .map_err(|_| SyncError::InvalidArgument(format!("bug id {id:?} is not a number")))
}

impl SourceRecord {
    /// Fetch and normalise the record identified by `id`.
    pub async fn fetch(source: &dyn SourceService, id: &str) -> Result<SourceRecord> {
        let id = parse_id(id)?;
        let raw = source.fetch_record(id).await?;
        Ok(SourceRecord::from_raw(&raw))
    }

    pub fn from_raw(raw: &RawBug) -> SourceRecord {
        let mut packages: Vec<PackageInfo> = Vec::new();

        for task in &raw.tasks {
            let Some(name) = platform_package(&task.target_name) else {
                continue;
            };

            let idx = match packages.iter().position(|p| p.name == name) {
                Some(idx) => idx,
                None => {
                    packages.push(PackageInfo {
                        name: name.to_string(),
                        series: Vec::new(),
                    });
                    packages.len() - 1
                }
            };

            let Some((_, series)) = parse_target_name(&task.target_name) else {
                continue;
            };

            let detail = SeriesDetail {
                status: task.status,
                importance: task.importance,
            };
            let entries = &mut packages[idx].series;
            match entries.iter_mut().find(|(s, _)| *s == series) {
                Some(entry) => entry.1 = detail,
                None => entries.push((series, detail)),
            }
        }

        SourceRecord {
            id: raw.id,
            title: raw.title.clone(),
            description: raw.description.clone(),
            heat: raw.heat,
            packages,
        }
    }

    pub fn packages(&self) -> &[PackageInfo] {
        &self.packages
    }

    pub fn affected_packages(&self) -> Vec<&str> {
        self.packages.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn affected_series(&self, package: &str) -> Vec<Series> {
        self.package(package)
            .map(|p| p.series.iter().map(|(s, _)| *s).collect())
            .unwrap_or_default()
    }

    pub fn affected_versions(&self, package: &str) -> Vec<&'static str> {
        self.affected_series(package)
            .iter()
            .map(Series::version)
            .collect()
    }

    pub fn detail(&self, package: &str, series: Series) -> Option<SeriesDetail> {
        self.package(package)?
            .series
            .iter()
            .find(|(s, _)| *s == series)
            .map(|(_, d)| *d)
    }

    /// Look up `"status"` or `"importance"` for a package/series, or an
    /// empty string when any part of the lookup is absent.
    pub fn package_detail(&self, package: &str, series: Series, detail: &str) -> String {
        let Some(d) = self.detail(package, series) else {
            return String::new();
        };
        match detail {
            "status" => d.status.to_string(),
            "importance" => d.importance.to_string(),
            _ => String::new(),
        }
    }

    fn package(&self, package: &str) -> Option<&PackageInfo> {
        self.packages.iter().find(|p| p.name == package)
    }
}

impl fmt::Display for SourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LP: #{} : {}", self.id, self.title)?;
        write!(f, "\nHeat: {}", self.heat)?;
        for pkg in &self.packages {
            write!(f, "\n - {}:", pkg.name)?;
            for (series, detail) in &pkg.series {
                write!(
                    f,
                    "\n   - {} : {} ({})",
                    series, detail.status, detail.importance
                )?;
            }
        }
        Ok(())
    }
}

struct SeriesMap<'a>(&'a [(Series, SeriesDetail)]);

impl Serialize for SeriesMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (series, detail) in self.0 {
            map.serialize_entry(
                series.as_str(),
                &serde_json::json!({
                    "status": detail.status,
                    "importance": detail.importance,
                }),
            )?;
        }
        map.end()
    }
}

struct PackageMap<'a>(&'a [PackageInfo]);

impl Serialize for PackageMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for pkg in self.0 {
            let mut inner = std::collections::BTreeMap::new();
            inner.insert("series", SeriesMap(&pkg.series));
            map.serialize_entry(&pkg.name, &inner)?;
        }
        map.end()
    }
}

impl Serialize for SourceRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("title", &self.title)?;
        map.serialize_entry("packages", &PackageMap(&self.packages))?;
        map.end()
    }
}
