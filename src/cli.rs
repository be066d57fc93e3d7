//! CLI argument parsing for vatio

use crate::config::{EngineConfig, ExportFormat};
use crate::cpu_profile::DuplicateTimestampPolicy;
use crate::energy_attribution::Integration;
use crate::timeline::TimeUnit;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for the report printed on stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary with hotspots (default)
    Text,
    /// JSON report document
    Json,
    /// CSV per-node breakdown
    Csv,
    /// Print nothing; only write the configured files
    #[value(name = "none")]
    Quiet,
}

#[derive(Parser, Debug)]
#[command(name = "vatio")]
#[command(version)]
#[command(about = "Attribute measured power consumption to CPU profile call-tree nodes", long_about = None)]
pub struct Cli {
    /// TOML configuration file; flags below override its values
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Identifier of the CPU profile to attribute
    #[arg(long = "profile-id", value_name = "ID")]
    pub profile_id: Option<String>,

    /// Name of the generated report
    #[arg(long = "report-name", value_name = "NAME")]
    pub report_name: Option<String>,

    /// Start of the sensor window (microseconds, CPU clock)
    #[arg(long = "sensor-start", value_name = "US", allow_hyphen_values = true)]
    pub sensor_start: Option<i64>,

    /// End of the sensor window (microseconds, CPU clock)
    #[arg(long = "sensor-end", value_name = "US", allow_hyphen_values = true)]
    pub sensor_end: Option<i64>,

    /// Best-effort mode: without sensor bounds, fetch the profile span widened by this margin
    #[arg(long = "best-effort-margin", value_name = "US")]
    pub best_effort_margin_us: Option<u64>,

    /// Directory holding profiles/<id>.cpuprofile and power.json
    #[arg(short = 'd', long = "data-dir", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory where the report is saved as <report-name>.json
    #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Additionally export the report to this file
    #[arg(long = "export", value_name = "FILE")]
    pub export_path: Option<PathBuf>,

    /// Format of the exported file
    #[arg(long = "export-format", value_enum)]
    pub export_format: Option<ExportFormat>,

    /// Integrate with interval endpoints only instead of splitting at sensor readings
    #[arg(long = "endpoints-only")]
    pub endpoints_only: bool,

    /// Accept CPU samples that share a timestamp but name different nodes
    #[arg(long = "allow-duplicate-timestamps")]
    pub allow_duplicate_timestamps: bool,

    /// Unit of raw sensor timestamps
    #[arg(long = "sensor-unit", value_enum)]
    pub sensor_unit: Option<SensorUnitArg>,

    /// Offset added to sensor timestamps after unit conversion (microseconds)
    #[arg(long = "sensor-offset", value_name = "US", allow_hyphen_values = true)]
    pub sensor_offset_us: Option<i64>,

    /// Output format on stdout
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose diagnostics on stderr
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// CLI spelling of [`TimeUnit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SensorUnitArg {
    Ns,
    Us,
    Ms,
    S,
}

impl From<SensorUnitArg> for TimeUnit {
    fn from(arg: SensorUnitArg) -> Self {
        match arg {
            SensorUnitArg::Ns => TimeUnit::Nanoseconds,
            SensorUnitArg::Us => TimeUnit::Microseconds,
            SensorUnitArg::Ms => TimeUnit::Milliseconds,
            SensorUnitArg::S => TimeUnit::Seconds,
        }
    }
}

impl Cli {
    /// Overlay command-line values on a base configuration
    pub fn apply_to(&self, mut config: EngineConfig) -> EngineConfig {
        if let Some(id) = &self.profile_id {
            config.profile_id = id.clone();
        }
        if let Some(name) = &self.report_name {
            config.report_name = name.clone();
        }
        if self.sensor_start.is_some() || self.sensor_end.is_some() {
            config.sensor_start = self.sensor_start;
            config.sensor_end = self.sensor_end;
        }
        if let Some(margin) = self.best_effort_margin_us {
            config.best_effort_margin_us = Some(margin);
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(path) = &self.export_path {
            config.export_path = Some(path.clone());
        }
        if let Some(format) = self.export_format {
            config.export_format = format;
        }
        if self.endpoints_only {
            config.integration = Integration::Endpoints;
        }
        if self.allow_duplicate_timestamps {
            config.duplicate_timestamps = DuplicateTimestampPolicy::ZeroDuration;
        }
        if let Some(unit) = self.sensor_unit {
            config.sensor_clock.unit = unit.into();
        }
        if let Some(offset) = self.sensor_offset_us {
            config.sensor_clock.offset_us = offset;
        }
        config
    }
}
