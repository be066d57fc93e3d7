//! Energy report assembly
//!
//! A [`Report`] is the terminal artifact of one engine run: summary totals
//! plus a per-node breakdown, built from borrowed profiles and then detached
//! from them. It performs no I/O; sinks receive its [`ReportDocument`].

use crate::coverage::CoveredProfiles;
use crate::cpu_profile::{NodeId, SourceLocation};
use crate::diagnostics::{DiagnosticEvent, DiagnosticSink};
use crate::energy_attribution::EnergyAttribution;
use crate::error::{EngineError, Result};
use crate::timeline::{Micros, MICROS_PER_SECOND};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Energy breakdown for one call-tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeBreakdown {
    pub node_id: NodeId,
    pub function_name: String,
    pub self_energy_joules: f64,
    pub inclusive_energy_joules: f64,
    pub self_duration_us: u64,
    /// Self energy as a percentage of total energy
    pub percent_of_total: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceLocation>,
}

/// Bounds and sizes of the inputs a report was computed from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub cpu_start_us: Micros,
    pub cpu_end_us: Micros,
    pub cpu_samples: usize,
    pub cpu_nodes: usize,
    pub power_start_us: Micros,
    pub power_end_us: Micros,
    pub power_samples: usize,
}

/// Serialized form handed to persistence and export sinks
///
/// Field names are stable; `nodes` is ordered by `node_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub name: String,
    pub total_energy_joules: f64,
    pub total_duration_us: u64,
    pub mean_power_watts: f64,
    pub nodes: Vec<NodeBreakdown>,
    pub provenance: Provenance,
}

/// Immutable energy report for one profiled run
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    document: ReportDocument,
}

impl Report {
    /// Assemble the report from validated profiles and their attribution
    ///
    /// # Errors
    /// `DegenerateDuration` if the profile spans zero microseconds.
    pub fn build(
        name: impl Into<String>,
        covered: &CoveredProfiles<'_>,
        attribution: &EnergyAttribution,
        diagnostics: &dyn DiagnosticSink,
    ) -> Result<Self> {
        let cpu = covered.cpu();
        let power = covered.power();

        let total_duration_us = cpu.span().duration_us();
        if total_duration_us == 0 {
            return Err(EngineError::DegenerateDuration {
                at: cpu.start_time(),
            });
        }

        let total_energy_joules = attribution.total_energy_joules();
        let mean_power_watts = total_energy_joules / (total_duration_us as f64 / MICROS_PER_SECOND);

        let ids: BTreeSet<NodeId> = attribution
            .touched()
            .map(|(id, _)| id)
            .chain(attribution.inclusive().map(|(id, _)| id))
            .collect();

        let nodes = ids
            .into_iter()
            .map(|id| {
                let node = cpu.node(id);
                let self_energy_joules = attribution.self_energy_joules(id);
                let percent_of_total = if total_energy_joules > 0.0 {
                    self_energy_joules / total_energy_joules * 100.0
                } else {
                    0.0
                };
                NodeBreakdown {
                    node_id: id,
                    function_name: node
                        .map(|n| n.display_name().to_string())
                        .unwrap_or_default(),
                    self_energy_joules,
                    inclusive_energy_joules: attribution.inclusive_energy_joules(id),
                    self_duration_us: attribution
                        .node(id)
                        .map(|e| e.self_duration_us)
                        .unwrap_or(0),
                    percent_of_total,
                    source: node.and_then(|n| n.source.clone()),
                }
            })
            .collect::<Vec<_>>();

        let document = ReportDocument {
            name: name.into(),
            total_energy_joules,
            total_duration_us,
            mean_power_watts,
            nodes,
            provenance: Provenance {
                cpu_start_us: cpu.start_time(),
                cpu_end_us: cpu.end_time(),
                cpu_samples: cpu.samples().len(),
                cpu_nodes: cpu.node_count(),
                power_start_us: power.start_time(),
                power_end_us: power.end_time(),
                power_samples: power.len(),
            },
        };

        diagnostics.record(&DiagnosticEvent::ReportBuilt {
            name: document.name.clone(),
            nodes: document.nodes.len(),
            total_energy_joules,
        });

        Ok(Self { document })
    }

    pub fn name(&self) -> &str {
        &self.document.name
    }

    pub fn total_energy_joules(&self) -> f64 {
        self.document.total_energy_joules
    }

    pub fn total_duration_us(&self) -> u64 {
        self.document.total_duration_us
    }

    pub fn mean_power_watts(&self) -> f64 {
        self.document.mean_power_watts
    }

    /// Per-node breakdown ordered by node id
    pub fn nodes(&self) -> &[NodeBreakdown] {
        &self.document.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeBreakdown> {
        self.document
            .nodes
            .binary_search_by_key(&id, |n| n.node_id)
            .ok()
            .map(|i| &self.document.nodes[i])
    }

    pub fn provenance(&self) -> &Provenance {
        &self.document.provenance
    }

    pub fn document(&self) -> &ReportDocument {
        &self.document
    }

    /// Pretty-printed JSON document
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::validate_coverage;
    use crate::cpu_profile::{CpuProfile, CpuSample, ProfileOptions, RawCpuNode};
    use crate::diagnostics::NullSink;
    use crate::energy_attribution::{attribute, AttributionOptions};
    use crate::power_profile::{PowerProfile, PowerSample};

    fn nodes() -> Vec<RawCpuNode> {
        vec![
            RawCpuNode::new(1, "(root)", vec![2]),
            RawCpuNode::new(2, "main", vec![3]),
            RawCpuNode::new(3, "hash", vec![]).with_location("file:///h.js", 0, 0),
        ]
    }

    fn build(samples: Vec<CpuSample>, power: Vec<PowerSample>) -> Result<Report> {
        let cpu = CpuProfile::new(nodes(), samples, ProfileOptions::default())?;
        let power = PowerProfile::new(power)?;
        let covered = validate_coverage(&cpu, &power, &NullSink)?;
        let attribution = attribute(&covered, AttributionOptions::default(), &NullSink)?;
        Report::build("run", &covered, &attribution, &NullSink)
    }

    #[test]
    fn test_summary_totals() {
        let report = build(
            vec![
                CpuSample::new(0, 2),
                CpuSample::new(500_000, 3),
                CpuSample::new(1_000_000, 3),
            ],
            vec![PowerSample::new(0, 4.0), PowerSample::new(1_000_000, 4.0)],
        )
        .unwrap();

        assert_eq!(report.name(), "run");
        assert_eq!(report.total_duration_us(), 1_000_000);
        assert!((report.total_energy_joules() - 4.0).abs() < 1e-12);
        assert!((report.mean_power_watts() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_breakdown_includes_untouched_ancestors() {
        let report = build(
            vec![CpuSample::new(0, 3), CpuSample::new(1_000, 3)],
            vec![PowerSample::new(0, 1.0), PowerSample::new(1_000, 1.0)],
        )
        .unwrap();

        let ids: Vec<NodeId> = report.nodes().iter().map(|n| n.node_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        let root = report.node(1).unwrap();
        assert_eq!(root.self_energy_joules, 0.0);
        assert_eq!(root.self_duration_us, 0);
        assert_eq!(root.percent_of_total, 0.0);
        assert!((root.inclusive_energy_joules - report.total_energy_joules()).abs() < 1e-15);

        let leaf = report.node(3).unwrap();
        assert_eq!(leaf.percent_of_total, 100.0);
        assert_eq!(leaf.source.as_ref().unwrap().url, "file:///h.js");
    }

    #[test]
    fn test_zero_duration_is_degenerate() {
        let err = build(
            vec![CpuSample::new(100, 2)],
            vec![PowerSample::new(0, 1.0), PowerSample::new(200, 1.0)],
        )
        .unwrap_err();
        assert_eq!(err, EngineError::DegenerateDuration { at: 100 });
    }

    #[test]
    fn test_zero_power_gives_zero_percentages() {
        let report = build(
            vec![CpuSample::new(0, 2), CpuSample::new(10, 3)],
            vec![PowerSample::new(0, 0.0), PowerSample::new(10, 0.0)],
        )
        .unwrap();
        assert_eq!(report.total_energy_joules(), 0.0);
        assert_eq!(report.mean_power_watts(), 0.0);
        assert!(report.nodes().iter().all(|n| n.percent_of_total == 0.0));
    }

    #[test]
    fn test_document_field_names() {
        let report = build(
            vec![CpuSample::new(0, 2), CpuSample::new(10, 2)],
            vec![PowerSample::new(0, 1.0), PowerSample::new(10, 1.0)],
        )
        .unwrap();

        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        for field in [
            "name",
            "total_energy_joules",
            "total_duration_us",
            "mean_power_watts",
            "nodes",
            "provenance",
        ] {
            assert!(value.get(field).is_some(), "missing {}", field);
        }
        let node = &value["nodes"][0];
        for field in [
            "node_id",
            "function_name",
            "self_energy_joules",
            "inclusive_energy_joules",
            "self_duration_us",
            "percent_of_total",
        ] {
            assert!(node.get(field).is_some(), "missing node field {}", field);
        }
        assert!(node.get("source").is_none());
        assert_eq!(value["provenance"]["power_samples"], 2);
    }
}
