use serde::{Deserialize, Serialize};

use crate::error::JobError;
use crate::tools::Validation;

/// Primary status of a finished job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Converted,
    Failed,
    Skipped,
}

/// Secondary annotation from the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationResult {
    Passed,
    Failed,
    NotRequested,
    Error,
}

/// Terminal result of one job, as written to the report.
///
/// `error` is set exactly when `status` is not `converted`; `validation_detail`
/// exactly when `validation` is not `not_requested`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub file: String,
    pub status: JobStatus,
    pub error: Option<String>,
    pub validation: ValidationResult,
    pub validation_detail: Option<String>,
}

impl Outcome {
    pub fn converted(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            status: JobStatus::Converted,
            error: None,
            validation: ValidationResult::NotRequested,
            validation_detail: None,
        }
    }

    /// A converted outcome annotated with the validator's verdict.
    pub fn validated(file: impl Into<String>, validation: Validation) -> Self {
        Self {
            validation: validation.result,
            validation_detail: Some(validation.detail),
            ..Self::converted(file)
        }
    }

    pub fn failed(file: impl Into<String>, error: &JobError) -> Self {
        Self {
            file: file.into(),
            status: JobStatus::Failed,
            error: Some(error.to_string()),
            validation: ValidationResult::NotRequested,
            validation_detail: None,
        }
    }

    pub fn skipped(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            status: JobStatus::Skipped,
            error: Some(reason.into()),
            validation: ValidationResult::NotRequested,
            validation_detail: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converted_has_no_error() {
        let o = Outcome::converted("a.xml");
        assert_eq!(o.status, JobStatus::Converted);
        assert!(o.error.is_none());
        assert_eq!(o.validation, ValidationResult::NotRequested);
        assert!(o.validation_detail.is_none());
    }

    #[test]
    fn validated_keeps_converted_status() {
        let o = Outcome::validated(
            "a.xml",
            Validation {
                result: ValidationResult::Failed,
                detail: "line 3 fails".into(),
            },
        );
        assert_eq!(o.status, JobStatus::Converted);
        assert_eq!(o.validation, ValidationResult::Failed);
        assert_eq!(o.validation_detail.as_deref(), Some("line 3 fails"));
    }

    #[test]
    fn failed_renders_job_error() {
        let o = Outcome::failed("b.xml", &JobError::EmptyOutput);
        assert_eq!(o.status, JobStatus::Failed);
        assert_eq!(o.error.as_deref(), Some("empty_output"));
    }

    #[test]
    fn record_shape() {
        let o = Outcome::failed("b.xml", &JobError::Timeout);
        let json = serde_json::to_value(&o).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "file": "b.xml",
                "status": "failed",
                "error": "timeout",
                "validation": "not_requested",
                "validation_detail": null
            })
        );
    }
}
