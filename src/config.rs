//! Engine configuration
//!
//! Settings come from an optional TOML file and are then overridden by CLI
//! flags. Nothing here is global: the binary builds an [`EngineConfig`] and
//! passes it to [`crate::pipeline::run_engine`].
//!
//! # Example TOML
//! ```toml
//! report_name = "checkout-flow"
//! profile_id = "5f1c2a"
//! sensor_start = 1_690_000_000_000
//! sensor_end = 1_690_000_060_000
//! data_dir = "/var/lib/vatio"
//!
//! [sensor_clock]
//! unit = "microseconds"
//! offset_us = 0
//! ```

use crate::cpu_profile::{DuplicateTimestampPolicy, ProfileOptions};
use crate::energy_attribution::{AttributionOptions, Integration};
use crate::timeline::{ClockAlignment, Micros};
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Format used when exporting a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

/// Full configuration of one engine run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Name stored in the report document
    pub report_name: String,

    /// Opaque identifier of the CPU profile to attribute
    pub profile_id: String,

    /// Start of the sensor window on the CPU clock (microseconds)
    pub sensor_start: Option<Micros>,

    /// End of the sensor window on the CPU clock (microseconds)
    pub sensor_end: Option<Micros>,

    /// When set and no explicit sensor window is given, fetch sensor data
    /// from `profile start - margin` to `profile end + margin`.
    ///
    /// Best-effort only: disabled by default, logged as a warning when used.
    pub best_effort_margin_us: Option<u64>,

    /// Subdivide intervals at sensor readings (exact piecewise-linear
    /// integral) or use interval endpoints only
    pub integration: Integration,

    /// Handling of consecutive CPU samples that share a timestamp
    pub duplicate_timestamps: DuplicateTimestampPolicy,

    /// Unit and offset mapping sensor timestamps onto the CPU clock
    pub sensor_clock: ClockAlignment,

    /// Directory holding `profiles/<id>.cpuprofile` and `power.json`
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory where the report is saved as `<report_name>.json`
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Optional export target written after the internal save succeeds
    pub export_path: Option<PathBuf>,

    pub export_format: ExportFormat,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("reports")
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            report_name: String::new(),
            profile_id: String::new(),
            sensor_start: None,
            sensor_end: None,
            best_effort_margin_us: None,
            integration: Integration::default(),
            duplicate_timestamps: DuplicateTimestampPolicy::default(),
            sensor_clock: ClockAlignment::identity(),
            data_dir: default_data_dir(),
            output_dir: default_output_dir(),
            export_path: None,
            export_format: ExportFormat::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML engine configuration")
    }

    pub fn profile_options(&self) -> ProfileOptions {
        ProfileOptions {
            duplicate_timestamps: self.duplicate_timestamps,
        }
    }

    pub fn attribution_options(&self) -> AttributionOptions {
        AttributionOptions {
            integration: self.integration,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.report_name.trim().is_empty() {
            return Err("report_name must not be empty".to_string());
        }

        if self.report_name.contains(['/', '\\']) {
            return Err(format!(
                "report_name must not contain path separators, got '{}'",
                self.report_name
            ));
        }

        if self.profile_id.trim().is_empty() {
            return Err("profile_id must not be empty".to_string());
        }

        if self.profile_id.contains(['/', '\\']) || self.profile_id.contains("..") {
            return Err(format!(
                "profile_id must be a plain identifier, got '{}'",
                self.profile_id
            ));
        }

        match (self.sensor_start, self.sensor_end) {
            (Some(start), Some(end)) if start > end => {
                return Err(format!(
                    "sensor_start ({}) must not be after sensor_end ({})",
                    start, end
                ));
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err("sensor_start and sensor_end must be given together".to_string());
            }
            (None, None) if self.best_effort_margin_us.is_none() => {
                return Err(
                    "sensor_start/sensor_end are required unless best_effort_margin_us is set"
                        .to_string(),
                );
            }
            _ => {}
        }

        Ok(())
    }
}
