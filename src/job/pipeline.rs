//! Drives one job through its states: screen, compress, convert, validate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, instrument};

use super::outcome::Outcome;
use super::state::Step;
use super::temp::StagingArea;
use super::Job;
use crate::compress::gzip_file;
use crate::config::MjconvConfig;
use crate::error::{ConfigError, JobError};
use crate::tools::{ConvertError, ToolRunner, convert, validate};

/// Shared, read-only inputs of every job in a run.
#[derive(Debug)]
pub struct JobContext<R> {
    pub runner: Arc<R>,
    pub config: MjconvConfig,
    pub validate: bool,
    pub output_dir: PathBuf,
    pub staging: StagingArea,
}

/// Ways a job can end without producing its own outcome.
#[derive(Debug, Error)]
pub enum JobAbort {
    /// No job in this run can succeed; the run must stop.
    #[error(transparent)]
    Fatal(#[from] ConfigError),

    /// Something unanticipated broke inside the job.
    #[error("{0:#}")]
    Unexpected(#[from] anyhow::Error),
}

/// Runs `job` to completion and returns its outcome.
///
/// Per-file failures are folded into the returned [`Outcome`]. The staged artifact
/// is released when this function returns, whatever the path taken.
#[instrument(skip_all, fields(index = job.index, file = %job.file_name()))]
pub async fn run_job<R: ToolRunner>(
    ctx: &JobContext<R>,
    mut job: Job,
) -> Result<Outcome, JobAbort> {
    let outcome = run_steps(ctx, &mut job).await?;
    let elapsed_ms = (Utc::now() - job.created_at).num_milliseconds();
    debug!(
        status = ?outcome.status,
        state = %job.state,
        path = ?job.state_history,
        elapsed_ms,
        "job finished"
    );
    Ok(outcome)
}

async fn run_steps<R: ToolRunner>(
    ctx: &JobContext<R>,
    job: &mut Job,
) -> Result<Outcome, JobAbort> {
    let name = job.file_name();
    let validate_enabled = ctx.validate;

    // PENDING → SCREENING
    job.advance(Step::Proceed, validate_enabled);
    if let Some(marker) = find_skip_marker(&job.input, &ctx.config.skip_markers).await {
        job.advance(Step::Stop, validate_enabled);
        debug!(%marker, "skipped");
        return Ok(Outcome::skipped(name, skip_reason(&marker)));
    }

    // SCREENING → COMPRESSING
    job.advance(Step::Proceed, validate_enabled);
    let artifact = ctx.staging.allocate(
        job.artifact_id,
        &job.stem(),
        &ctx.config.converter.staged_extension,
    );
    let source = job.input.clone();
    let dest = artifact.path().to_path_buf();
    let compressed = tokio::task::spawn_blocking(move || gzip_file(&source, &dest))
        .await
        .context("compression task did not complete")?;
    match compressed {
        Ok(bytes) => debug!(bytes, artifact = %artifact.path().display(), "staged"),
        Err(e) => {
            job.advance(Step::Stop, validate_enabled);
            return Ok(Outcome::failed(name, &JobError::Compression(e.to_string())));
        }
    }

    // COMPRESSING → CONVERTING
    job.advance(Step::Proceed, validate_enabled);
    let output = output_path(
        &ctx.output_dir,
        &job.stem(),
        &ctx.config.converter.output_extension,
    );
    match convert(ctx.runner.as_ref(), &ctx.config.converter, artifact.path(), &output).await {
        Ok(bytes) => debug!(bytes, output = %output.display(), "converted"),
        Err(ConvertError::Job(e)) => {
            job.advance(Step::Stop, validate_enabled);
            return Ok(Outcome::failed(name, &e));
        }
        Err(ConvertError::Fatal(e)) => return Err(e.into()),
    }
    drop(artifact);

    // CONVERTING → VALIDATING | DONE
    if job.advance(Step::Proceed, validate_enabled).is_terminal() {
        return Ok(Outcome::converted(name));
    }

    let validation = validate(ctx.runner.as_ref(), &ctx.config.validator, &output).await;
    debug!(result = ?validation.result, detail = %validation.detail, "validated");
    job.advance(Step::Proceed, validate_enabled);
    Ok(Outcome::validated(name, validation))
}

/// Where the converted stream for `stem` lands.
pub fn output_path(output_dir: &Path, stem: &str, extension: &str) -> PathBuf {
    output_dir.join(format!("{stem}.{extension}"))
}

/// First configured marker present in the raw input, if any. An unreadable
/// input is not skipped; compression will report it.
async fn find_skip_marker(input: &Path, markers: &[String]) -> Option<String> {
    if markers.iter().all(|m| m.is_empty()) {
        return None;
    }
    let bytes = match tokio::fs::read(input).await {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(error = %e, "cannot screen input");
            return None;
        }
    };
    let text = String::from_utf8_lossy(&bytes);
    markers
        .iter()
        .find(|m| !m.is_empty() && text.contains(m.as_str()))
        .cloned()
}

fn skip_reason(marker: &str) -> String {
    match marker {
        "BYE" => "contains BYE event (player disconnection)".to_string(),
        other => format!("contains {other} event"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobStatus, ValidationResult};
    use crate::tools::fake::ScriptedTools;

    fn context(tools: ScriptedTools, validate: bool) -> (tempfile::TempDir, JobContext<ScriptedTools>) {
        let out = tempfile::tempdir().unwrap();
        let ctx = JobContext {
            runner: Arc::new(tools),
            config: ScriptedTools::config(),
            validate,
            output_dir: out.path().to_path_buf(),
            staging: StagingArea::new().unwrap(),
        };
        (out, ctx)
    }

    fn input(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    fn staged_files(ctx: &JobContext<ScriptedTools>) -> usize {
        std::fs::read_dir(ctx.staging.path()).unwrap().count()
    }

    #[tokio::test]
    async fn converts_and_cleans_staging() {
        let inputs = tempfile::tempdir().unwrap();
        let (out, ctx) = context(ScriptedTools::default(), false);
        let path = input(inputs.path(), "game.xml", "<mjloggm/>");

        let outcome = run_job(&ctx, Job::new(0, path)).await.unwrap();
        assert_eq!(outcome, Outcome::converted("game.xml"));
        assert!(out.path().join("game.mjson").exists());
        assert_eq!(staged_files(&ctx), 0);
    }

    #[tokio::test]
    async fn skip_marker_skips_before_conversion() {
        let inputs = tempfile::tempdir().unwrap();
        let tools = ScriptedTools::default();
        let (out, ctx) = context(tools, false);
        let path = input(inputs.path(), "game.xml", "<mjloggm><BYE who=\"2\"/></mjloggm>");

        let outcome = run_job(&ctx, Job::new(0, path)).await.unwrap();
        assert_eq!(outcome.status, JobStatus::Skipped);
        assert_eq!(
            outcome.error.as_deref(),
            Some("contains BYE event (player disconnection)")
        );
        assert_eq!(ctx.runner.invocations(), 0);
        assert!(!out.path().join("game.mjson").exists());
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn skipped_files_stay_quiet_at_default_level() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new(
                crate::logging::default_filter(false),
            ))
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let inputs = tempfile::tempdir().unwrap();
        let (_out, ctx) = context(ScriptedTools::default(), false);
        let path = input(inputs.path(), "game.xml", "<mjloggm><BYE who=\"1\"/></mjloggm>");
        let outcome = run_job(&ctx, Job::new(0, path)).await.unwrap();
        assert_eq!(outcome.status, JobStatus::Skipped);

        let logged = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logged.is_empty(), "per-file log at default level: {logged}");
    }

    #[tokio::test]
    async fn unreadable_input_is_a_compression_error() {
        let inputs = tempfile::tempdir().unwrap();
        let (_out, ctx) = context(ScriptedTools::default(), false);

        let outcome = run_job(&ctx, Job::new(0, inputs.path().join("gone.xml")))
            .await
            .unwrap();
        assert_eq!(outcome.status, JobStatus::Failed);
        assert!(
            outcome
                .error
                .as_deref()
                .unwrap()
                .starts_with("compression_error: ")
        );
        assert_eq!(ctx.runner.invocations(), 0, "converter must not run");
        assert_eq!(staged_files(&ctx), 0);
    }

    #[tokio::test]
    async fn converter_failure_is_recorded_and_staging_cleaned() {
        let inputs = tempfile::tempdir().unwrap();
        let (_out, ctx) = context(ScriptedTools::default(), true);
        let path = input(inputs.path(), "bad.xml", "fail: broken INIT tag");

        let outcome = run_job(&ctx, Job::new(0, path)).await.unwrap();
        assert_eq!(outcome.status, JobStatus::Failed);
        assert_eq!(
            outcome.error.as_deref(),
            Some("converter_error: parse error: broken INIT tag")
        );
        assert_eq!(outcome.validation, ValidationResult::NotRequested);
        assert_eq!(ctx.runner.invocations(), 1, "validator must not run");
        assert_eq!(staged_files(&ctx), 0);
    }

    #[tokio::test]
    async fn validation_annotates_converted_outcome() {
        let inputs = tempfile::tempdir().unwrap();
        let (_out, ctx) = context(ScriptedTools::default(), true);
        let good = input(inputs.path(), "good.xml", "<mjloggm/>");
        let odd = input(inputs.path(), "odd.xml", "invalid discard");

        let passed = run_job(&ctx, Job::new(0, good)).await.unwrap();
        assert_eq!(passed.status, JobStatus::Converted);
        assert_eq!(passed.validation, ValidationResult::Passed);

        let failed = run_job(&ctx, Job::new(1, odd)).await.unwrap();
        assert_eq!(failed.status, JobStatus::Converted);
        assert_eq!(failed.validation, ValidationResult::Failed);
        assert!(failed.error.is_none());
        assert!(failed.validation_detail.unwrap().contains("fails"));
    }

    #[tokio::test]
    async fn missing_converter_aborts() {
        let inputs = tempfile::tempdir().unwrap();
        let (_out, ctx) = context(ScriptedTools::missing_converter(), false);
        let path = input(inputs.path(), "game.xml", "<mjloggm/>");

        let err = run_job(&ctx, Job::new(0, path)).await.unwrap_err();
        assert!(matches!(err, JobAbort::Fatal(ConfigError::ToolNotFound { .. })));
        assert_eq!(staged_files(&ctx), 0);
    }

    #[test]
    fn output_path_uses_stem_and_extension() {
        assert_eq!(
            output_path(Path::new("/out"), "game", "mjson"),
            PathBuf::from("/out/game.mjson")
        );
    }

    #[test]
    fn skip_reason_wording() {
        assert_eq!(skip_reason("BYE"), "contains BYE event (player disconnection)");
        assert_eq!(skip_reason("UN"), "contains UN event");
    }
}
