// Energy attribution over call-tree nodes
//
// Walks the CPU profile's intervals in time order, integrates the power
// curve over each one and credits the result to the node that was on-CPU.
// Self totals accumulate per node identity; the inclusive rollup is a
// second pass over the precomputed post-order.

use crate::coverage::CoveredProfiles;
use crate::cpu_profile::{CpuSample, NodeId};
use crate::diagnostics::{DiagnosticEvent, DiagnosticSink};
use crate::energy_attribution::integrate::{interval_energy_watt_us, to_joules, Integration};
use crate::error::Result;
use std::collections::{BTreeMap, HashMap};

/// Tunables for a single attribution run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttributionOptions {
    pub integration: Integration,
}

/// Self totals for one call-tree node
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeEnergy {
    /// Accumulated self energy in watt-microseconds
    pub self_watt_us: f64,
    /// Accumulated on-CPU time in microseconds
    pub self_duration_us: u64,
    /// Number of intervals credited to this node, zero-length ones included
    pub intervals: usize,
}

impl NodeEnergy {
    pub fn self_energy_joules(&self) -> f64 {
        to_joules(self.self_watt_us)
    }
}

/// Per-node self and inclusive energy for one profile
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyAttribution {
    self_energy: BTreeMap<NodeId, NodeEnergy>,
    inclusive_joules: BTreeMap<NodeId, f64>,
    interval_count: usize,
    boundary: CpuSample,
}

impl EnergyAttribution {
    /// Self totals for `node`, if it was ever sampled
    pub fn node(&self, node: NodeId) -> Option<&NodeEnergy> {
        self.self_energy.get(&node)
    }

    /// Self energy in joules; zero for nodes never on-CPU
    pub fn self_energy_joules(&self, node: NodeId) -> f64 {
        self.node(node)
            .map(NodeEnergy::self_energy_joules)
            .unwrap_or(0.0)
    }

    /// Inclusive energy in joules; zero for nodes with no sampled descendant
    pub fn inclusive_energy_joules(&self, node: NodeId) -> f64 {
        self.inclusive_joules.get(&node).copied().unwrap_or(0.0)
    }

    /// True if any sample named this node, including the closing boundary sample
    pub fn is_touched(&self, node: NodeId) -> bool {
        self.self_energy.contains_key(&node)
    }

    /// Touched nodes with their self totals, ordered by node id
    pub fn touched(&self) -> impl Iterator<Item = (NodeId, &NodeEnergy)> {
        self.self_energy.iter().map(|(&id, energy)| (id, energy))
    }

    /// Nodes that were touched or have a touched descendant, with inclusive
    /// energy in joules, ordered by node id
    pub fn inclusive(&self) -> impl Iterator<Item = (NodeId, f64)> + '_ {
        self.inclusive_joules.iter().map(|(&id, &j)| (id, j))
    }

    pub fn nodes_touched(&self) -> usize {
        self.self_energy.len()
    }

    pub fn interval_count(&self) -> usize {
        self.interval_count
    }

    /// Final sample of the profile; it opens no interval
    pub fn boundary(&self) -> CpuSample {
        self.boundary
    }

    /// Sum of self energy over all nodes, in node-id order
    pub fn total_energy_joules(&self) -> f64 {
        to_joules(self.self_energy.values().map(|e| e.self_watt_us).sum())
    }
}

/// Attribute the power series' energy to call-tree nodes
///
/// Requires [`CoveredProfiles`], i.e. a passed coverage check. Fails fast on
/// the first interval whose power lookup falls outside the series; no
/// partial result is returned.
///
/// # Example
/// ```
/// use vatio::coverage::validate_coverage;
/// use vatio::cpu_profile::{CpuProfile, CpuSample, ProfileOptions, RawCpuNode};
/// use vatio::diagnostics::NullSink;
/// use vatio::energy_attribution::{attribute, AttributionOptions};
/// use vatio::power_profile::{PowerProfile, PowerSample};
///
/// let cpu = CpuProfile::new(
///     vec![RawCpuNode::new(1, "main", vec![])],
///     vec![CpuSample::new(0, 1), CpuSample::new(1_000_000, 1)],
///     ProfileOptions::default(),
/// ).unwrap();
/// let power = PowerProfile::new(vec![
///     PowerSample::new(0, 5.0),
///     PowerSample::new(1_000_000, 5.0),
/// ]).unwrap();
///
/// let covered = validate_coverage(&cpu, &power, &NullSink).unwrap();
/// let attribution = attribute(&covered, AttributionOptions::default(), &NullSink).unwrap();
/// assert_eq!(attribution.self_energy_joules(1), 5.0);
/// ```
pub fn attribute(
    covered: &CoveredProfiles<'_>,
    options: AttributionOptions,
    diagnostics: &dyn DiagnosticSink,
) -> Result<EnergyAttribution> {
    let cpu = covered.cpu();
    let power = covered.power();

    let mut self_energy: BTreeMap<NodeId, NodeEnergy> = BTreeMap::new();
    let mut interval_count = 0;

    for interval in cpu.intervals() {
        interval_count += 1;
        let entry = self_energy.entry(interval.node).or_default();
        entry.intervals += 1;

        if interval.is_empty() {
            diagnostics.record(&DiagnosticEvent::ZeroDurationInterval {
                node: interval.node,
                at: interval.start,
            });
            continue;
        }

        let watt_us =
            interval_energy_watt_us(power, interval.start, interval.end, options.integration)?;
        entry.self_watt_us += watt_us;
        entry.self_duration_us += interval.duration_us();
    }

    let boundary = cpu.boundary();
    self_energy.entry(boundary.node).or_default();

    let inclusive_joules = inclusive_rollup(cpu.post_order(), &self_energy, |id| {
        cpu.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    });

    let attribution = EnergyAttribution {
        self_energy,
        inclusive_joules,
        interval_count,
        boundary,
    };

    diagnostics.record(&DiagnosticEvent::AttributionComplete {
        intervals: attribution.interval_count,
        nodes_touched: attribution.nodes_touched(),
        total_energy_joules: attribution.total_energy_joules(),
    });

    Ok(attribution)
}

/// Sum self energy up the tree; `post_order` lists children before parents
fn inclusive_rollup<'a, F>(
    post_order: &[NodeId],
    self_energy: &BTreeMap<NodeId, NodeEnergy>,
    children_of: F,
) -> BTreeMap<NodeId, f64>
where
    F: Fn(NodeId) -> &'a [NodeId],
{
    let mut subtotal: HashMap<NodeId, f64> = HashMap::with_capacity(post_order.len());
    let mut inclusive = BTreeMap::new();

    for &id in post_order {
        let own = self_energy.get(&id).map(|e| e.self_watt_us);
        let mut reached = own.is_some();
        let mut watt_us = own.unwrap_or(0.0);

        for child in children_of(id) {
            if let Some(&child_watt_us) = subtotal.get(child) {
                reached = true;
                watt_us += child_watt_us;
            }
        }

        if reached {
            subtotal.insert(id, watt_us);
            inclusive.insert(id, to_joules(watt_us));
        }
    }

    inclusive
}
