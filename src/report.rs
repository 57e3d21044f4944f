//! The report artifact and the aggregate tally printed after a run.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::error::ReportError;
use crate::job::{JobStatus, Outcome, ValidationResult};

/// Counts over a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub total: usize,
    pub converted: usize,
    pub failed: usize,
    pub skipped: usize,
    pub validation_passed: usize,
    pub validation_failed: usize,
    pub validation_errors: usize,
}

impl Tally {
    pub fn from_outcomes(outcomes: &[Outcome]) -> Self {
        let mut tally = Tally {
            total: outcomes.len(),
            ..Tally::default()
        };
        for outcome in outcomes {
            match outcome.status {
                JobStatus::Converted => tally.converted += 1,
                JobStatus::Failed => tally.failed += 1,
                JobStatus::Skipped => tally.skipped += 1,
            }
            match outcome.validation {
                ValidationResult::Passed => tally.validation_passed += 1,
                ValidationResult::Failed => tally.validation_failed += 1,
                ValidationResult::Error => tally.validation_errors += 1,
                ValidationResult::NotRequested => {}
            }
        }
        tally
    }

    /// Outcomes that carry a validator verdict.
    pub fn validated(&self) -> usize {
        self.validation_passed + self.validation_failed + self.validation_errors
    }
}

/// Writes the run's outcomes as a JSON array, once.
#[derive(Debug)]
pub struct ReportWriter {
    path: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: &Path, file_name: &str) -> Self {
        Self {
            path: output_dir.join(file_name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serializes `outcomes` to the report path and returns it. The report is
    /// written to a sibling temp file first and renamed into place, so readers
    /// never see a half-written report.
    pub fn write(self, outcomes: &[Outcome]) -> Result<PathBuf, ReportError> {
        let io_err = |source| ReportError::Write {
            path: self.path.clone(),
            source,
        };

        let staging = self.path.with_extension("json.tmp");
        {
            let file = File::create(&staging).map_err(io_err)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, outcomes)?;
            writer.write_all(b"\n").map_err(io_err)?;
            writer.flush().map_err(io_err)?;
        }
        std::fs::rename(&staging, &self.path).map_err(io_err)?;

        info!(path = %self.path.display(), records = outcomes.len(), "report written");
        Ok(self.path)
    }
}
