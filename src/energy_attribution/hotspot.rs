// Hotspot identification for energy reports
//
// Picks out call-tree nodes whose self energy exceeds 5% of the run's total
// and attaches a short explanation, with special wording for the synthetic
// nodes V8 inserts into every profile.

use crate::cpu_profile::NodeId;
use crate::report::NodeBreakdown;

/// Share of total energy above which a node is reported
pub const HOTSPOT_THRESHOLD_PERCENT: f64 = 5.0;

/// A node that consumed a notable share of total energy
#[derive(Debug, Clone, PartialEq)]
pub struct Hotspot {
    pub node_id: NodeId,
    pub function_name: String,
    pub energy_joules: f64,
    pub percentage: f64,
    pub explanation: String,
    /// False for time the profiler could not attribute to user code
    pub is_user_code: bool,
}

impl Hotspot {
    /// Format as human-readable report
    pub fn to_report_string(&self) -> String {
        let marker = if self.is_user_code { "●" } else { "○" };
        format!(
            "{} {} [node {}] ({:.1}%, {:.6} J)\n   {}",
            marker,
            self.function_name,
            self.node_id,
            self.percentage,
            self.energy_joules,
            self.explanation
        )
    }
}

/// Identify energy hotspots, highest share first (ties broken by node id)
pub fn identify_hotspots(nodes: &[NodeBreakdown]) -> Vec<Hotspot> {
    let mut hotspots: Vec<Hotspot> = nodes
        .iter()
        .filter(|n| n.percent_of_total > HOTSPOT_THRESHOLD_PERCENT)
        .map(|n| Hotspot {
            node_id: n.node_id,
            function_name: n.function_name.clone(),
            energy_joules: n.self_energy_joules,
            percentage: n.percent_of_total,
            explanation: explain_hotspot(&n.function_name, n.percent_of_total),
            is_user_code: !is_synthetic(&n.function_name),
        })
        .collect();

    hotspots.sort_by(|a, b| {
        b.percentage
            .total_cmp(&a.percentage)
            .then(a.node_id.cmp(&b.node_id))
    });
    hotspots
}

fn explain_hotspot(function_name: &str, percentage: f64) -> String {
    match function_name {
        "(garbage collector)" => format!(
            "Garbage collection draws {:.1}% of energy. Look for allocation-heavy loops or large short-lived objects.",
            percentage
        ),
        "(idle)" => format!(
            "The process was idle for {:.1}% of energy. Baseline platform draw while waiting on I/O or timers.",
            percentage
        ),
        "(program)" => format!(
            "Native/engine code outside JavaScript accounts for {:.1}% of energy.",
            percentage
        ),
        "(root)" => format!(
            "{:.1}% of energy landed on the profile root. The sampler could not resolve a frame.",
            percentage
        ),
        _ => {
            if percentage > 50.0 {
                format!(
                    "{} dominates energy consumption ({:.1}%).",
                    function_name, percentage
                )
            } else {
                format!("{} uses {:.1}% of total energy.", function_name, percentage)
            }
        }
    }
}

fn is_synthetic(function_name: &str) -> bool {
    matches!(
        function_name,
        "(garbage collector)" | "(idle)" | "(program)" | "(root)"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: NodeId, name: &str, percent: f64) -> NodeBreakdown {
        NodeBreakdown {
            node_id: id,
            function_name: name.to_string(),
            self_energy_joules: percent / 100.0,
            inclusive_energy_joules: percent / 100.0,
            self_duration_us: 10,
            percent_of_total: percent,
            source: None,
        }
    }

    #[test]
    fn test_threshold_filters_small_nodes() {
        let nodes = vec![node(1, "a", 5.0), node(2, "b", 5.1), node(3, "c", 89.9)];
        let hotspots = identify_hotspots(&nodes);
        let ids: Vec<NodeId> = hotspots.iter().map(|h| h.node_id).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn test_sorted_with_stable_ties() {
        let nodes = vec![node(9, "x", 40.0), node(4, "y", 40.0), node(5, "z", 20.0)];
        let ids: Vec<NodeId> = identify_hotspots(&nodes).iter().map(|h| h.node_id).collect();
        assert_eq!(ids, vec![4, 9, 5]);
    }

    #[test]
    fn test_synthetic_nodes_explained() {
        let nodes = vec![node(2, "(garbage collector)", 30.0), node(3, "render", 70.0)];
        let hotspots = identify_hotspots(&nodes);

        let gc = hotspots.iter().find(|h| h.node_id == 2).unwrap();
        assert!(!gc.is_user_code);
        assert!(gc.explanation.contains("Garbage collection"));

        let render = hotspots.iter().find(|h| h.node_id == 3).unwrap();
        assert!(render.is_user_code);
        assert!(render.explanation.contains("dominates"));
        assert!(render.to_report_string().contains("render [node 3]"));
    }

    #[test]
    fn test_empty_input() {
        assert!(identify_hotspots(&[]).is_empty());
    }
}
