//! Structured diagnostics emitted by the attribution core
//!
//! The core never configures or writes to a global logger. Callers inject a
//! [`DiagnosticSink`] and decide where events go: [`TracingSink`] forwards
//! them to `tracing`, [`NullSink`] drops them, and any `Fn(&DiagnosticEvent)`
//! closure works as an ad-hoc observer.

use crate::cpu_profile::NodeId;
use crate::Micros;

/// A single observation made while building profiles or attributing energy
#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticEvent {
    /// CPU profile normalized from its raw record
    CpuProfileBuilt {
        nodes: usize,
        samples: usize,
        start: Micros,
        end: Micros,
    },
    /// Power series normalized and aligned onto the CPU clock
    PowerProfileBuilt {
        samples: usize,
        start: Micros,
        end: Micros,
    },
    /// Sensor window chosen for the fetch
    SensorWindowResolved {
        start: Micros,
        end: Micros,
        best_effort: bool,
    },
    /// Coverage check passed; slack is how far the sensor data extends past
    /// each end of the profile
    CoverageValidated {
        leading_slack_us: u64,
        trailing_slack_us: u64,
    },
    /// Two consecutive samples shared a timestamp
    ZeroDurationInterval { node: NodeId, at: Micros },
    /// Engine finished walking every interval
    AttributionComplete {
        intervals: usize,
        nodes_touched: usize,
        total_energy_joules: f64,
    },
    /// Report assembled and ready for persistence
    ReportBuilt {
        name: String,
        nodes: usize,
        total_energy_joules: f64,
    },
}

/// Observer for core diagnostics
pub trait DiagnosticSink {
    fn record(&self, event: &DiagnosticEvent);
}

impl<F> DiagnosticSink for F
where
    F: Fn(&DiagnosticEvent),
{
    fn record(&self, event: &DiagnosticEvent) {
        self(event)
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn record(&self, _event: &DiagnosticEvent) {}
}

/// Forwards events to the `tracing` subscriber installed by the binary
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, event: &DiagnosticEvent) {
        match event {
            DiagnosticEvent::CpuProfileBuilt {
                nodes,
                samples,
                start,
                end,
            } => tracing::debug!(nodes, samples, start, end, "cpu profile built"),
            DiagnosticEvent::PowerProfileBuilt {
                samples,
                start,
                end,
            } => tracing::debug!(samples, start, end, "power profile built"),
            DiagnosticEvent::SensorWindowResolved {
                start,
                end,
                best_effort,
            } => {
                if *best_effort {
                    tracing::warn!(
                        start,
                        end,
                        "no explicit sensor bounds; using best-effort window around profile"
                    );
                } else {
                    tracing::debug!(start, end, "sensor window resolved");
                }
            }
            DiagnosticEvent::CoverageValidated {
                leading_slack_us,
                trailing_slack_us,
            } => tracing::debug!(leading_slack_us, trailing_slack_us, "coverage validated"),
            DiagnosticEvent::ZeroDurationInterval { node, at } => {
                tracing::trace!(node, at, "zero-duration interval")
            }
            DiagnosticEvent::AttributionComplete {
                intervals,
                nodes_touched,
                total_energy_joules,
            } => tracing::info!(
                intervals,
                nodes_touched,
                total_energy_joules,
                "attribution complete"
            ),
            DiagnosticEvent::ReportBuilt {
                name,
                nodes,
                total_energy_joules,
            } => tracing::info!(name = %name, nodes, total_energy_joules, "report built"),
        }
    }
}
