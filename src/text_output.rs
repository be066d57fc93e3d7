//! Human-readable energy summary
//!
//! Renders the per-node breakdown as a table sorted by self energy, followed
//! by the hotspot list.

use crate::energy_attribution::identify_hotspots;
use crate::report::Report;
use std::fmt::{self, Write};

/// Width of the function-name column before truncation
const NAME_WIDTH: usize = 40;

/// Render the report summary as plain text
pub fn render_summary(report: &Report) -> String {
    let mut out = String::new();
    // fmt::Write for String never fails
    let _ = write_summary(&mut out, report);
    out
}

/// Write the report summary to any formatter sink
pub fn write_summary<W: Write>(out: &mut W, report: &Report) -> fmt::Result {
    writeln!(out, "╔════════════════════════════════════════════════════════════════════════════════╗")?;
    writeln!(out, "║  Energy Attribution Summary (sorted by self energy)                            ║")?;
    writeln!(out, "╚════════════════════════════════════════════════════════════════════════════════╝")?;
    writeln!(out)?;
    writeln!(out, "Report:        {}", report.name())?;
    writeln!(out, "Total energy:  {:.6} J", report.total_energy_joules())?;
    writeln!(
        out,
        "Duration:      {:.6} s",
        report.total_duration_us() as f64 / 1_000_000.0
    )?;
    writeln!(out, "Mean power:    {:.3} W", report.mean_power_watts())?;
    writeln!(out)?;

    if report.nodes().is_empty() {
        return writeln!(out, "No energy attributed.");
    }

    writeln!(
        out,
        "{:<8} {:<width$} {:>14} {:>14} {:>12} {:>8}",
        "Node",
        "Function",
        "Self (J)",
        "Inclusive (J)",
        "Self (us)",
        "Share",
        width = NAME_WIDTH
    )?;
    writeln!(out, "{}", "─".repeat(101))?;

    let mut sorted: Vec<_> = report.nodes().iter().collect();
    sorted.sort_by(|a, b| {
        b.self_energy_joules
            .total_cmp(&a.self_energy_joules)
            .then(a.node_id.cmp(&b.node_id))
    });

    for node in sorted {
        writeln!(
            out,
            "{:<8} {:<width$} {:>14.6} {:>14.6} {:>12} {:>7.2}%",
            node.node_id,
            truncate(&node.function_name, NAME_WIDTH),
            node.self_energy_joules,
            node.inclusive_energy_joules,
            node.self_duration_us,
            node.percent_of_total,
            width = NAME_WIDTH
        )?;
    }
    writeln!(out, "{}", "─".repeat(101))?;

    let hotspots = identify_hotspots(report.nodes());
    if !hotspots.is_empty() {
        writeln!(out)?;
        writeln!(out, "Hotspots:")?;
        for hotspot in hotspots {
            writeln!(out, "{}", hotspot.to_report_string())?;
        }
    }

    Ok(())
}

fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        name.to_string()
    } else {
        let kept: String = name.chars().take(width - 1).collect();
        format!("{}…", kept)
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

    fn report() -> Report {
        let cpu = CpuProfile::new(
            vec![
                RawCpuNode::new(1, "(root)", vec![2, 3]),
                RawCpuNode::new(2, "tiny", vec![]),
                RawCpuNode::new(3, "heavy_function", vec![]),
            ],
            vec![
                CpuSample::new(0, 2),
                CpuSample::new(10, 3),
                CpuSample::new(1000, 3),
            ],
            ProfileOptions::default(),
        )
        .unwrap();
        let power =
            PowerProfile::new(vec![PowerSample::new(0, 2.0), PowerSample::new(1000, 2.0)]).unwrap();
        let covered = validate_coverage(&cpu, &power, &NullSink).unwrap();
        let attribution = attribute(&covered, AttributionOptions::default(), &NullSink).unwrap();
        Report::build("summary-test", &covered, &attribution, &NullSink).unwrap()
    }

    #[test]
    fn test_summary_lists_nodes_by_energy() {
        let text = render_summary(&report());
        assert!(text.contains("Report:        summary-test"));
        assert!(text.contains("Mean power:    2.000 W"));

        let heavy = text.find("heavy_function").unwrap();
        let tiny = text.find("tiny").unwrap();
        assert!(heavy < tiny);
    }

    #[test]
    fn test_summary_hotspots() {
        let text = render_summary(&report());
        assert!(text.contains("Hotspots:"));
        assert!(text.contains("heavy_function dominates"));
    }

    #[test]
    fn test_write_summary_propagates_writer_errors() {
        struct Full;
        impl Write for Full {
            fn write_str(&mut self, _s: &str) -> fmt::Result {
                Err(fmt::Error)
            }
        }
        assert!(write_summary(&mut Full, &report()).is_err());

        let mut text = String::new();
        write_summary(&mut text, &report()).unwrap();
        assert_eq!(text, render_summary(&report()));
    }

    #[test]
    fn test_truncate_long_names() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 5), "abcd…");
    }
}
