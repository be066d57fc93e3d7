//! CSV output format for energy reports
//!
//! One row per call-tree node, for spreadsheet analysis and machine parsing.

use crate::report::{NodeBreakdown, ReportDocument};

/// CSV output formatter
#[derive(Debug)]
pub struct CsvOutput {
    include_source: bool,
}

impl CsvOutput {
    /// Create a new CSV output formatter
    pub fn new(include_source: bool) -> Self {
        Self { include_source }
    }

    /// Generate CSV header row based on enabled flags
    fn header(&self) -> String {
        let mut headers = vec![
            "node_id",
            "function_name",
            "self_energy_joules",
            "inclusive_energy_joules",
            "self_duration_us",
            "percent_of_total",
        ];

        if self.include_source {
            headers.push("source_location");
        }

        headers.join(",")
    }

    /// Escape CSV field (handle commas, quotes, newlines)
    fn escape_field(field: &str) -> String {
        if field.contains(',') || field.contains('"') || field.contains('\n') {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    /// Format a node as CSV row
    fn format_node(&self, node: &NodeBreakdown) -> String {
        let mut fields = vec![
            node.node_id.to_string(),
            Self::escape_field(&node.function_name),
            node.self_energy_joules.to_string(),
            node.inclusive_energy_joules.to_string(),
            node.self_duration_us.to_string(),
            format!("{:.4}", node.percent_of_total),
        ];

        if self.include_source {
            match &node.source {
                Some(source) => fields.push(Self::escape_field(&source.to_string())),
                None => fields.push(String::new()),
            }
        }

        fields.join(",")
    }

    /// Render the full document as CSV
    pub fn render(&self, document: &ReportDocument) -> String {
        let mut output = self.header();
        output.push('\n');

        for node in &document.nodes {
            output.push_str(&self.format_node(node));
            output.push('\n');
        }

        output
    }
}
