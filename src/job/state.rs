use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a conversion job.
///
/// Each job flows through: PENDING → SCREENING → COMPRESSING → CONVERTING →
/// (VALIDATING) → DONE. A failed or skipped step jumps straight to DONE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Pending,
    Screening,
    Compressing,
    Converting,
    Validating,
    Done,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Pending => write!(f, "PENDING"),
            JobState::Screening => write!(f, "SCREENING"),
            JobState::Compressing => write!(f, "COMPRESSING"),
            JobState::Converting => write!(f, "CONVERTING"),
            JobState::Validating => write!(f, "VALIDATING"),
            JobState::Done => write!(f, "DONE"),
        }
    }
}

/// Result of the step performed in the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The step succeeded; continue the pipeline.
    Proceed,
    /// The step ended the job (failure or skip); no further steps run.
    Stop,
}

impl JobState {
    /// Computes the state that follows `self` given the step result.
    ///
    /// VALIDATING is only entered when `validate` is set, and only from a
    /// successful conversion. DONE is terminal.
    pub fn next(self, step: Step, validate: bool) -> JobState {
        match (self, step) {
            (JobState::Done, _) => JobState::Done,
            (_, Step::Stop) => JobState::Done,
            (JobState::Pending, Step::Proceed) => JobState::Screening,
            (JobState::Screening, Step::Proceed) => JobState::Compressing,
            (JobState::Compressing, Step::Proceed) => JobState::Converting,
            (JobState::Converting, Step::Proceed) if validate => JobState::Validating,
            (JobState::Converting, Step::Proceed) => JobState::Done,
            (JobState::Validating, Step::Proceed) => JobState::Done,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == JobState::Done
    }
}
