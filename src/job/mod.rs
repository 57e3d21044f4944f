mod outcome;
pub mod pipeline;
mod state;
pub mod temp;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub use outcome::{JobStatus, Outcome, ValidationResult};
pub use pipeline::{JobAbort, JobContext, run_job};
use state::{JobState, Step};
pub use temp::StagingArea;

/// One file's conversion pipeline. Owned by the worker that runs it.
#[derive(Debug, Clone)]
pub struct Job {
    /// Position of the input in discovery order.
    pub index: usize,
    pub input: PathBuf,
    /// Makes the job's staged artifact name unique across concurrent workers.
    pub artifact_id: Uuid,
    pub state: JobState,
    pub state_history: Vec<JobState>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn new(index: usize, input: PathBuf) -> Self {
        Self {
            index,
            input,
            artifact_id: Uuid::new_v4(),
            state: JobState::Pending,
            state_history: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// File name as shown in the report.
    pub fn file_name(&self) -> String {
        file_name_of(&self.input)
    }

    /// File name without its extension.
    pub fn stem(&self) -> String {
        self.input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "input".to_string())
    }

    /// Moves the job to its next state, recording the one it leaves.
    pub fn advance(&mut self, step: Step, validate: bool) -> JobState {
        let next = self.state.next(step, validate);
        if next != self.state {
            self.state_history.push(self.state);
            self.state = next;
        }
        next
    }
}

/// File name component of `path`, lossily decoded.
pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
