//! Command-line interface built on clap.
//!
//! Defines [`Cli`] with the [`Command`] subcommands (convert, check) and the
//! global flags (--config, --verbose).

use std::num::{NonZeroU64, NonZeroUsize};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::commands::ConvertArgs;

/// Batch-converts Tenhou XML game logs to mjai JSON through an external converter.
#[derive(Debug, Parser)]
#[command(name = "mjconv", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (defaults to ./mjconv.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging on stderr.
    #[arg(long, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Convert every log in INPUT_DIR and write the results to OUTPUT_DIR.
    Convert(ConvertOpts),

    /// Check that the configured converter and validator can be started.
    Check,
}

#[derive(Debug, Args)]
pub struct ConvertOpts {
    pub input_dir: PathBuf,

    pub output_dir: PathBuf,

    /// Run the validator on each converted file.
    #[arg(long, short)]
    pub validate: bool,

    /// Number of parallel workers.
    #[arg(long, short)]
    pub workers: Option<NonZeroUsize>,

    /// Convert at most this many files (for testing).
    #[arg(long, short)]
    pub limit: Option<NonZeroUsize>,

    /// Converter timeout in seconds.
    #[arg(long)]
    pub timeout: Option<NonZeroU64>,
}

impl From<ConvertOpts> for ConvertArgs {
    fn from(opts: ConvertOpts) -> Self {
        ConvertArgs {
            input_dir: opts.input_dir,
            output_dir: opts.output_dir,
            validate: opts.validate,
            workers: opts.workers.map(NonZeroUsize::get),
            limit: opts.limit.map(NonZeroUsize::get),
            timeout_secs: opts.timeout.map(NonZeroU64::get),
        }
    }
}
