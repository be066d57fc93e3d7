//! Data-access collaborators yielding raw profile and sensor records
//!
//! The engine never reads storage directly. A [`RecordSource`] hands it a
//! raw CPU profile by identifier and raw power readings by time range; the
//! pipeline turns those into validated profiles.

use crate::cpu_profile::RawCpuProfile;
use crate::power_profile::RawPowerSample;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Supplies raw records to the engine
pub trait RecordSource {
    /// Raw CPU profile stored under `profile_id`
    fn cpu_profile(&self, profile_id: &str) -> Result<RawCpuProfile>;

    /// Raw power readings with `start <= timestamp <= end`, in the
    /// collector's own timestamp unit, ordered as stored
    fn power_samples(&self, start: i64, end: i64) -> Result<Vec<RawPowerSample>>;
}

/// Records kept on disk
///
/// Layout:
/// ```text
/// <root>/profiles/<profile_id>.cpuprofile   V8 cpuprofile JSON
/// <root>/power.json                         [{"timestamp": .., "power": ..}, ...]
/// ```
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn profile_path(&self, profile_id: &str) -> PathBuf {
        self.root
            .join("profiles")
            .join(format!("{}.cpuprofile", profile_id))
    }

    pub fn power_path(&self) -> PathBuf {
        self.root.join("power.json")
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}: {}", what, path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}: {}", what, path.display()))
}

impl RecordSource for DirectorySource {
    fn cpu_profile(&self, profile_id: &str) -> Result<RawCpuProfile> {
        let path = self.profile_path(profile_id);
        tracing::debug!(path = %path.display(), "loading cpu profile");
        read_json(&path, "CPU profile")
    }

    fn power_samples(&self, start: i64, end: i64) -> Result<Vec<RawPowerSample>> {
        let path = self.power_path();
        tracing::debug!(path = %path.display(), start, end, "loading power samples");
        let all: Vec<RawPowerSample> = read_json(&path, "power samples")?;
        Ok(all
            .into_iter()
            .filter(|s| start <= s.timestamp && s.timestamp <= end)
            .collect())
    }
}

/// Records held in memory, for embedding and tests
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    profiles: HashMap<String, RawCpuProfile>,
    power: Vec<RawPowerSample>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, profile_id: impl Into<String>, profile: RawCpuProfile) -> Self {
        self.profiles.insert(profile_id.into(), profile);
        self
    }

    pub fn with_power(mut self, samples: Vec<RawPowerSample>) -> Self {
        self.power = samples;
        self
    }
}

impl RecordSource for MemorySource {
    fn cpu_profile(&self, profile_id: &str) -> Result<RawCpuProfile> {
        self.profiles
            .get(profile_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("No CPU profile with id '{}'", profile_id))
    }

    fn power_samples(&self, start: i64, end: i64) -> Result<Vec<RawPowerSample>> {
        Ok(self
            .power
            .iter()
            .filter(|s| start <= s.timestamp && s.timestamp <= end)
            .copied()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu_profile::RawCpuNode;

    fn raw_profile() -> RawCpuProfile {
        RawCpuProfile {
            nodes: vec![RawCpuNode::new(1, "(root)", vec![])],
            start_time: 0,
            end_time: 10,
            samples: vec![1, 1],
            time_deltas: vec![0, 10],
        }
    }

    #[test]
    fn test_memory_source_filters_inclusive_range() {
        let source = MemorySource::new().with_power(vec![
            RawPowerSample::new(0, 1.0),
            RawPowerSample::new(5, 2.0),
            RawPowerSample::new(10, 3.0),
            RawPowerSample::new(15, 4.0),
        ]);
        let samples = source.power_samples(5, 10).unwrap();
        assert_eq!(
            samples,
            vec![RawPowerSample::new(5, 2.0), RawPowerSample::new(10, 3.0)]
        );
    }

    #[test]
    fn test_memory_source_unknown_profile() {
        let source = MemorySource::new().with_profile("known", raw_profile());
        assert!(source.cpu_profile("known").is_ok());
        let err = source.cpu_profile("missing").unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_directory_source_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("profiles")).unwrap();
        fs::write(
            dir.path().join("profiles/p1.cpuprofile"),
            serde_json::to_string(&raw_profile()).unwrap(),
        )
        .unwrap();
        fs::write(
            dir.path().join("power.json"),
            r#"[{"timestamp": -5, "power": 1.0}, {"timestamp": 0, "power": 2.0}, {"timestamp": 20, "watts": 3.0}]"#,
        )
        .unwrap();

        let source = DirectorySource::new(dir.path());
        assert_eq!(source.cpu_profile("p1").unwrap(), raw_profile());
        assert_eq!(source.power_samples(0, 20).unwrap().len(), 2);
    }

    #[test]
    fn test_directory_source_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectorySource::new(dir.path());

        let err = source.cpu_profile("nope").unwrap_err();
        assert!(err.to_string().contains("Failed to read CPU profile"));
        let err = source.power_samples(0, 1).unwrap_err();
        assert!(err.to_string().contains("Failed to read power samples"));
    }

    #[test]
    fn test_directory_source_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("power.json"), "{not json").unwrap();
        let err = DirectorySource::new(dir.path())
            .power_samples(0, 1)
            .unwrap_err();
        assert!(err.to_string().contains("Failed to parse power samples"));
    }
}
