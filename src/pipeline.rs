//! End-to-end engine run
//!
//! Fetch raw records → build profiles → gate on coverage → attribute →
//! assemble the report → hand it to sinks. Sinks run only after the report
//! exists, internal save first, export second.

use crate::config::EngineConfig;
use crate::coverage::{check_window, validate_coverage};
use crate::cpu_profile::CpuProfile;
use crate::diagnostics::{DiagnosticEvent, DiagnosticSink};
use crate::energy_attribution::attribute;
use crate::error::EngineError;
use crate::power_profile::PowerProfile;
use crate::report::Report;
use crate::sink::{FileSink, ReportSink};
use crate::source::RecordSource;
use crate::timeline::TimeSpan;
use anyhow::{Context, Result};

/// Sensor window used for a run and how it was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorWindow {
    pub span: TimeSpan,
    /// True when derived from the profile bounds plus a margin
    pub best_effort: bool,
}

/// Pick the sensor window for `cpu_span`
///
/// Explicit bounds must enclose the profile; they are checked here, before
/// any sensor data is fetched. Without explicit bounds the best-effort margin
/// is used if configured, otherwise the run fails.
pub fn resolve_window(config: &EngineConfig, cpu_span: TimeSpan) -> Result<SensorWindow> {
    match (config.sensor_start, config.sensor_end, config.best_effort_margin_us) {
        (Some(start), Some(end), _) => {
            let span = TimeSpan::new(start, end);
            check_window(cpu_span, span)
                .context("Requested sensor window does not cover the CPU profile")?;
            Ok(SensorWindow {
                span,
                best_effort: false,
            })
        }
        (None, None, Some(margin)) => Ok(SensorWindow {
            span: cpu_span.widened(margin),
            best_effort: true,
        }),
        _ => anyhow::bail!(
            "No sensor window: pass both sensor bounds or enable the best-effort margin"
        ),
    }
}

/// Compute a report without persisting it
pub fn compute_report(
    config: &EngineConfig,
    source: &dyn RecordSource,
    diagnostics: &dyn DiagnosticSink,
) -> Result<Report> {
    config.validate().map_err(anyhow::Error::msg)?;

    let raw_profile = source
        .cpu_profile(&config.profile_id)
        .with_context(|| format!("Failed to fetch CPU profile '{}'", config.profile_id))?;
    let cpu = CpuProfile::from_raw(raw_profile, config.profile_options())?;
    diagnostics.record(&DiagnosticEvent::CpuProfileBuilt {
        nodes: cpu.node_count(),
        samples: cpu.samples().len(),
        start: cpu.start_time(),
        end: cpu.end_time(),
    });

    let window = resolve_window(config, cpu.span())?;
    diagnostics.record(&DiagnosticEvent::SensorWindowResolved {
        start: window.span.start,
        end: window.span.end,
        best_effort: window.best_effort,
    });

    let (raw_start, raw_end) = config.sensor_clock.to_source_range(window.span);
    let raw_power = source
        .power_samples(raw_start, raw_end)
        .with_context(|| format!("Failed to fetch power samples for {}", window.span))?;
    let power = PowerProfile::from_raw(&raw_power, config.sensor_clock)?;
    diagnostics.record(&DiagnosticEvent::PowerProfileBuilt {
        samples: power.len(),
        start: power.start_time(),
        end: power.end_time(),
    });

    let covered = validate_coverage(&cpu, &power, diagnostics)?;
    let attribution = attribute(&covered, config.attribution_options(), diagnostics)?;
    let report = Report::build(&config.report_name, &covered, &attribution, diagnostics)?;

    Ok(report)
}

/// Sinks implied by the configuration: internal save, then optional export
pub fn configured_sinks(config: &EngineConfig) -> Vec<Box<dyn ReportSink>> {
    let mut sinks: Vec<Box<dyn ReportSink>> = vec![Box::new(FileSink::internal(
        &config.output_dir,
        &config.report_name,
    ))];
    if let Some(path) = &config.export_path {
        sinks.push(Box::new(FileSink::new(
            "export",
            path.clone(),
            config.export_format,
        )));
    }
    sinks
}

/// Compute a report and persist it through every sink, in order
pub fn run_engine(
    config: &EngineConfig,
    source: &dyn RecordSource,
    sinks: &mut [Box<dyn ReportSink>],
    diagnostics: &dyn DiagnosticSink,
) -> Result<Report> {
    let report = compute_report(config, source, diagnostics)?;

    for sink in sinks.iter_mut() {
        sink.persist(report.document())
            .with_context(|| format!("Failed to persist report via {} sink", sink.name()))?;
    }

    tracing::info!(report = %report.name(), "Data processing complete.");
    Ok(report)
}

/// Mark engine invariant violations so they read differently from bad input
pub fn flag_internal(err: anyhow::Error) -> anyhow::Error {
    let internal = err
        .chain()
        .filter_map(|e| e.downcast_ref::<EngineError>())
        .any(EngineError::is_internal);
    if internal {
        err.context("Internal engine error (invariant violated after validation); please report this")
    } else {
        err
    }
}
