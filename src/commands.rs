//! Subcommand implementations wired up by `main`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::Ordering;

use console::Style;
use tracing::{info, warn};

use crate::config::{MjconvConfig, RunConfig};
use crate::discover::discover_inputs;
use crate::error::{BatchError, ConfigError};
use crate::report::{ReportWriter, Tally};
use crate::runner::JobRunner;
use crate::tools::{ProcessRunner, locate_program};
use crate::ui;

/// Options for `mjconv convert` after command-line parsing.
#[derive(Debug, Clone)]
pub struct ConvertArgs {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub validate: bool,
    pub workers: Option<usize>,
    pub limit: Option<usize>,
    pub timeout_secs: Option<u64>,
}

/// Converts every matching file in the input directory and writes the report.
pub async fn convert(config_path: Option<&Path>, args: ConvertArgs) -> Result<(), BatchError> {
    let mut config = MjconvConfig::load(config_path)?;
    if let Some(secs) = args.timeout_secs {
        config.converter.timeout_secs = secs;
    }
    let run = RunConfig::new(
        args.workers.unwrap_or(config.workers),
        args.limit,
        args.validate,
    )?;

    preflight(&config, run.validate)?;

    let inputs = discover_inputs(&args.input_dir, &config.source_extension)?;
    if inputs.is_empty() {
        println!(
            "No input files found in {} (*.{})",
            args.input_dir.display(),
            config.source_extension
        );
        return Ok(());
    }

    std::fs::create_dir_all(&args.output_dir).map_err(|source| {
        ConfigError::OutputUnwritable {
            path: args.output_dir.clone(),
            source,
        }
    })?;

    let scheduled = run.limit.map_or(inputs.len(), |l| l.min(inputs.len()));
    let report_file = config.report_file.clone();
    let runner = JobRunner::new(
        Arc::new(ProcessRunner),
        config,
        run,
        args.output_dir.clone(),
    );

    let interrupt = runner.interrupt_flag();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing running jobs");
            interrupt.store(true, Ordering::SeqCst);
        }
    });

    ui::print_start(scheduled, run.workers.min(scheduled), chrono::Utc::now());
    let mut progress = ui::BatchProgress::start(scheduled);
    let result = runner.run(inputs, &mut progress).await;
    progress.finish();
    ctrl_c.abort();
    let batch = result?;

    let tally = Tally::from_outcomes(&batch.outcomes);
    info!(
        converted = tally.converted,
        failed = tally.failed,
        skipped = tally.skipped,
        peak_concurrency = batch.peak_concurrency,
        elapsed_ms = batch.elapsed().as_millis() as u64,
        "batch finished"
    );
    ui::print_summary(&batch, &tally, run.validate);

    let path = ReportWriter::new(&args.output_dir, &report_file).write(&batch.outcomes)?;
    ui::print_report_location(&path);
    Ok(())
}

/// Reports whether the configured tools can be started.
pub fn check(config_path: Option<&Path>) -> Result<(), BatchError> {
    let config = MjconvConfig::load(config_path)?;
    let ok = Style::new().green().bold();
    let bad = Style::new().red().bold();

    let converter = locate_program(&config.converter.program);
    match &converter {
        Ok(path) => println!("{} converter: {}", ok.apply_to("✓"), path.display()),
        Err(e) => println!("{} converter: {e}", bad.apply_to("✗")),
    }
    match locate_program(&config.validator.program) {
        Ok(path) => println!("{} validator: {}", ok.apply_to("✓"), path.display()),
        Err(e) => println!("{} validator: {e} (needed only with --validate)", bad.apply_to("✗")),
    }

    converter?;
    Ok(())
}

/// The converter must be startable. A missing validator only degrades each
/// validation to an `error` result, so it is reported but not fatal.
fn preflight(config: &MjconvConfig, validate: bool) -> Result<(), ConfigError> {
    let converter = locate_program(&config.converter.program)?;
    info!(converter = %converter.display(), "converter located");

    if validate
        && let Err(e) = locate_program(&config.validator.program)
    {
        warn!(error = %e, "validator unavailable, validation results will be errors");
    }
    Ok(())
}
