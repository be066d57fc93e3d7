//! Persistence and export collaborators
//!
//! Sinks receive a finished [`ReportDocument`]. The pipeline only calls them
//! after a report has been fully built, so a failed run never leaves a
//! partial document behind.

use crate::config::ExportFormat;
use crate::csv_output::CsvOutput;
use crate::report::ReportDocument;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Accepts finished report documents
pub trait ReportSink {
    /// Short label used in logs
    fn name(&self) -> &str;

    fn persist(&mut self, document: &ReportDocument) -> Result<()>;
}

/// Writes the document to a file in the chosen format
#[derive(Debug, Clone)]
pub struct FileSink {
    label: String,
    path: PathBuf,
    format: ExportFormat,
}

impl FileSink {
    pub fn new(label: impl Into<String>, path: impl Into<PathBuf>, format: ExportFormat) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
            format,
        }
    }

    /// `<dir>/<report_name>.json`, the internal save location
    pub fn internal(dir: &Path, report_name: &str) -> Self {
        Self::new(
            "internal",
            dir.join(format!("{}.json", report_name)),
            ExportFormat::Json,
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for FileSink {
    fn name(&self) -> &str {
        &self.label
    }

    fn persist(&mut self, document: &ReportDocument) -> Result<()> {
        let content = match self.format {
            ExportFormat::Json => serde_json::to_string_pretty(document)
                .context("Failed to serialize report document")?,
            ExportFormat::Csv => CsvOutput::new(true).render(document),
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create report directory: {}", parent.display())
                })?;
            }
        }

        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write report: {}", self.path.display()))?;
        tracing::info!(sink = %self.label, path = %self.path.display(), "report written");
        Ok(())
    }
}

/// Keeps documents in memory, for embedding and tests
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub documents: Vec<ReportDocument>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReportSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn persist(&mut self, document: &ReportDocument) -> Result<()> {
        self.documents.push(document.clone());
        Ok(())
    }
}
