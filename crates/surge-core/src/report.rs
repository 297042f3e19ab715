use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
};

use surge_model::Report;
use tracing::info;

use crate::error::CoreError;

/// Writes a [`Report`] as JSON, replacing whatever was at the path.
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    path: PathBuf,
}

impl ReportBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn write(&self, report: &Report) -> Result<(), CoreError> {
        let fail = |reason: String| CoreError::Report {
            path: self.path.clone(),
            reason,
        };

        let file = File::create(&self.path).map_err(|e| fail(e.to_string()))?;
        let mut out = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut out, report).map_err(|e| fail(e.to_string()))?;
        out.write_all(b"\n").map_err(|e| fail(e.to_string()))?;
        out.flush().map_err(|e| fail(e.to_string()))?;

        info!(
            target: "surge.core.report",
            path = %self.path.display(),
            units = report.units.len(),
            succeeded = report.succeeded,
            "report written"
        );
        Ok(())
    }
}
