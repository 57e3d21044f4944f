//! Invocation of the external MJAI log validator.
//!
//! The validator is a secondary check on an already converted file. Every anomaly
//! (tool missing, timeout, unreadable verdict) becomes a terminal `error` result;
//! nothing here is retried and nothing here changes the job's primary status.

use std::path::Path;

use super::error::ToolError;
use super::process::ToolRunner;
use super::types::{ToolInvocation, excerpt};
use crate::config::ValidatorConfig;
use crate::job::ValidationResult;

/// Longest diagnostic line kept for a failed validation.
const DIAGNOSTIC_CHARS: usize = 100;

/// Longest stderr excerpt kept when the verdict cannot be interpreted.
const UNRECOGNIZED_CHARS: usize = 200;

/// Verdict of one validator run plus the text explaining it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub result: ValidationResult,
    pub detail: String,
}

impl Validation {
    fn new(result: ValidationResult, detail: impl Into<String>) -> Self {
        Self {
            result,
            detail: detail.into(),
        }
    }
}

/// Runs the validator against `converted` and interprets its verdict.
///
/// Exit 0 passes. A non-zero exit whose stderr holds a line with the configured
/// fail marker fails with that line as diagnostic. Anything else is an `error`.
pub async fn validate<R: ToolRunner>(
    runner: &R,
    config: &ValidatorConfig,
    converted: &Path,
) -> Validation {
    let invocation = ToolInvocation::from_template(
        &config.program,
        &config.args,
        converted,
        None,
        config.timeout(),
    );

    let output = match runner.invoke(&invocation).await {
        Ok(out) => out,
        Err(ToolError::TimedOut { .. }) => return Validation::new(ValidationResult::Error, "timeout"),
        Err(e) => return Validation::new(ValidationResult::Error, e.to_string()),
    };

    if output.success() {
        return Validation::new(ValidationResult::Passed, "validation passed");
    }

    let diagnostic = output
        .stderr
        .lines()
        .find(|line| line.contains(config.fail_marker.as_str()));
    match diagnostic {
        Some(line) => Validation::new(ValidationResult::Failed, excerpt(line, DIAGNOSTIC_CHARS)),
        None => {
            let text = excerpt(&output.stderr, UNRECOGNIZED_CHARS);
            let detail = if text.is_empty() {
                output.describe_status()
            } else {
                text
            };
            Validation::new(ValidationResult::Error, detail)
        }
    }
}
