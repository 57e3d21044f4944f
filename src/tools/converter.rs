//! Invocation of the external mjlog → MJAI translation tool.
//!
//! Maps the child's result onto job outcomes: a non-empty output is a conversion,
//! anything else is a [`JobError`]. A converter that cannot be started at all is a
//! configuration problem and surfaces as [`ConvertError::Fatal`].

use std::path::Path;

use tracing::debug;

use super::error::{ConvertError, ToolError};
use super::process::ToolRunner;
use super::types::{ToolInvocation, excerpt};
use crate::config::{ConverterConfig, OutputMode};
use crate::error::{ConfigError, JobError};

/// Longest stderr excerpt kept in a `converter_error` message.
const STDERR_EXCERPT_CHARS: usize = 200;

/// Marker the converter prints for inputs it does not understand.
const UNSUPPORTED_MARKER: &str = "Skipping unsupported file";

/// Converts the staged artifact at `staged` into `output`, returning the size of
/// the written event stream in bytes.
///
/// On any failure `output` is removed, so a failed job never leaves a partial file
/// in the output directory.
pub async fn convert<R: ToolRunner>(
    runner: &R,
    config: &ConverterConfig,
    staged: &Path,
    output: &Path,
) -> Result<u64, ConvertError> {
    let invocation = ToolInvocation::from_template(
        &config.program,
        &config.args,
        staged,
        Some(output),
        config.timeout(),
    );

    let result = run_converter(runner, &invocation, config.output, output).await;
    if result.is_err() {
        remove_partial(output).await;
    }
    result
}

async fn run_converter<R: ToolRunner>(
    runner: &R,
    invocation: &ToolInvocation,
    mode: OutputMode,
    output: &Path,
) -> Result<u64, ConvertError> {
    let tool_output = match runner.invoke(invocation).await {
        Ok(out) => out,
        Err(ToolError::NotFound { program }) => {
            return Err(ConfigError::ToolNotFound { program }.into());
        }
        Err(ToolError::NotExecutable { program }) => {
            return Err(ConfigError::ToolNotExecutable { program }.into());
        }
        Err(ToolError::TimedOut { .. }) => return Err(JobError::Timeout.into()),
        Err(ToolError::Io(e)) => return Err(JobError::Unexpected(e.to_string()).into()),
    };

    if !tool_output.success() {
        let detail = if tool_output.stderr.contains(UNSUPPORTED_MARKER) {
            "unsupported format".to_string()
        } else {
            let text = excerpt(&tool_output.stderr, STDERR_EXCERPT_CHARS);
            if text.is_empty() {
                tool_output.describe_status()
            } else {
                text
            }
        };
        return Err(JobError::Converter(detail).into());
    }

    let written = match mode {
        OutputMode::Stdout => {
            if tool_output.stdout.is_empty() {
                return Err(JobError::EmptyOutput.into());
            }
            tokio::fs::write(output, &tool_output.stdout)
                .await
                .map_err(|e| JobError::Unexpected(format!("writing {}: {e}", output.display())))?;
            tool_output.stdout.len() as u64
        }
        OutputMode::File => match tokio::fs::metadata(output).await {
            Ok(meta) if meta.len() > 0 => meta.len(),
            _ => return Err(JobError::EmptyOutput.into()),
        },
    };

    debug!(output = %output.display(), bytes = written, "converter finished");
    Ok(written)
}

async fn remove_partial(output: &Path) {
    if let Err(e) = tokio::fs::remove_file(output).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(output = %output.display(), error = %e, "failed to remove partial output");
    }
}
