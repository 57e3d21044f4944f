//! Error types for external tool invocations.

use std::time::Duration;

use thiserror::Error;

use crate::error::{ConfigError, JobError};

/// Why a child process did not produce a [`ToolOutput`](super::ToolOutput).
#[derive(Debug, Error)]
pub enum ToolError {
    /// The program could not be found.
    #[error("program `{program}` not found")]
    NotFound { program: String },

    /// The program exists but may not be executed.
    #[error("program `{program}` is not executable")]
    NotExecutable { program: String },

    /// The process exceeded its deadline and was killed.
    #[error("timed out after {}s", after.as_secs_f32())]
    TimedOut { after: Duration },

    /// Any other I/O failure while spawning or waiting.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// Classifies a spawn failure for `program`.
    pub fn from_spawn(program: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => ToolError::NotFound {
                program: program.to_string(),
            },
            std::io::ErrorKind::PermissionDenied => ToolError::NotExecutable {
                program: program.to_string(),
            },
            _ => ToolError::Io(err),
        }
    }
}

/// Result of a failed conversion: either confined to the job or fatal for the run.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Job(#[from] JobError),

    #[error(transparent)]
    Fatal(#[from] ConfigError),
}
