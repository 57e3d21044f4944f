//! Scripted stand-ins for the converter and validator.
//!
//! The fake converter un-gzips the staged artifact and reacts to its content:
//!
//! - `sleep:<ms>` on the first line delays, then the rest of the file is used
//! - `panic` panics inside the tool call
//! - `timeout` reports a timed-out process
//! - `fail: <reason>` exits 1 with `parse error: <reason>` on stderr
//! - blank content produces an empty output file
//! - anything else is copied into the output behind a `start_game` event
//!
//! The fake validator fails any output containing `invalid`.

use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use flate2::read::GzDecoder;

use super::error::ToolError;
use super::process::ToolRunner;
use super::types::{ToolInvocation, ToolOutput};
use crate::config::MjconvConfig;

const CONVERTER: &str = "mjai";
const VALIDATOR: &str = "validate_logs";

#[derive(Debug, Default)]
pub struct ScriptedTools {
    missing_converter: bool,
    calls: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedTools {
    /// Configuration whose program names route to this fake.
    pub fn config() -> MjconvConfig {
        let mut config = MjconvConfig::default();
        config.converter.program = CONVERTER.into();
        config.validator.program = VALIDATOR.into();
        config
    }

    pub fn missing_converter() -> Self {
        Self {
            missing_converter: true,
            ..Self::default()
        }
    }

    /// Total tool invocations so far.
    pub fn invocations(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of tool invocations that were running at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn converter(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        if self.missing_converter {
            return Err(ToolError::NotFound {
                program: invocation.program.clone(),
            });
        }
        let staged = &invocation.args[1];
        let output = &invocation.args[2];

        let mut text = String::new();
        GzDecoder::new(std::fs::File::open(staged)?).read_to_string(&mut text)?;

        if let Some(rest) = text.strip_prefix("sleep:") {
            let (ms, remainder) = rest.split_once('\n').unwrap_or((rest, ""));
            tokio::time::sleep(Duration::from_millis(ms.trim().parse().unwrap_or(0))).await;
            text = remainder.to_string();
        }

        if text.starts_with("panic") {
            panic!("converter exploded on {staged}");
        }
        if text.starts_with("timeout") {
            return Err(ToolError::TimedOut {
                after: invocation.timeout,
            });
        }
        if let Some(reason) = text.strip_prefix("fail: ") {
            return Ok(exit(1, format!("parse error: {}\n", reason.trim())));
        }

        let body = if text.trim().is_empty() {
            String::new()
        } else {
            format!("{{\"type\":\"start_game\"}}\n{}\n", text.trim())
        };
        std::fs::write(output, body)?;
        Ok(exit(0, String::new()))
    }

    async fn validator(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        let converted = std::fs::read_to_string(&invocation.args[0])?;
        if converted.contains("invalid") {
            Ok(exit(1, "checking events\nline 2 fails: invalid event\n".into()))
        } else {
            Ok(exit(0, String::new()))
        }
    }
}

fn exit(code: i32, stderr: String) -> ToolOutput {
    ToolOutput {
        status: Some(code),
        stdout: Vec::new(),
        stderr,
    }
}

impl ToolRunner for ScriptedTools {
    async fn invoke(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let result = if invocation.program == VALIDATOR {
            self.validator(invocation).await
        } else {
            self.converter(invocation).await
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
