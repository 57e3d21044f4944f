//! Error taxonomy for a conversion run.
//!
//! Fatal errors ([`ConfigError`], [`ReportError`]) abort the run and decide the
//! process exit code through [`BatchError`]. Per-file errors ([`JobError`]) never
//! leave the job that raised them; they are rendered into the outcome message.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal problems detected before or while scheduling jobs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("external tool `{program}` not found")]
    ToolNotFound { program: String },

    #[error("external tool `{program}` is not executable")]
    ToolNotExecutable { program: String },

    #[error("input directory {} is unreadable: {source}", path.display())]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot prepare output directory {}: {source}", path.display())]
    OutputUnwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot create staging directory: {0}")]
    Staging(#[source] std::io::Error),

    #[error("cannot read config file {}: {source}", path.display())]
    ConfigUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// The report artifact could not be written at all.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("cannot write report {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level error returned by a run.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

impl BatchError {
    /// Process exit code for this error. Per-file failures never reach here.
    pub fn exit_code(&self) -> u8 {
        match self {
            BatchError::Config(_) => 2,
            BatchError::Report(_) => 3,
        }
    }
}

/// A failure confined to one job. The `Display` output is the exact message that
/// lands in the report record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("compression_error: {0}")]
    Compression(String),

    #[error("converter_error: {0}")]
    Converter(String),

    #[error("empty_output")]
    EmptyOutput,

    #[error("timeout")]
    Timeout,

    #[error("unexpected_error: {0}")]
    Unexpected(String),
}
