//! Request and response types for external tool invocations.

use std::path::Path;
use std::time::Duration;

/// One child-process invocation: program, expanded arguments and deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl ToolInvocation {
    /// Builds an invocation from an argument template, substituting `{input}` and
    /// `{output}` with the given paths.
    pub fn from_template(
        program: &str,
        template: &[String],
        input: &Path,
        output: Option<&Path>,
        timeout: Duration,
    ) -> Self {
        let input = input.to_string_lossy();
        let output = output.map(|p| p.to_string_lossy()).unwrap_or_default();
        let args = template
            .iter()
            .map(|arg| arg.replace("{input}", &input).replace("{output}", &output))
            .collect();
        Self {
            program: program.to_string(),
            args,
            timeout,
        }
    }
}

/// Captured result of a child process that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Human-readable exit description used when stderr is empty.
    pub fn describe_status(&self) -> String {
        match self.status {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

/// First `max_chars` characters of trimmed `text`.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    text.trim().chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn template_substitutes_placeholders() {
        let template = vec!["convert".to_string(), "{input}".into(), "{output}".into()];
        let inv = ToolInvocation::from_template(
            "mjai",
            &template,
            &PathBuf::from("/tmp/stage/a.mjlog"),
            Some(&PathBuf::from("/out/a.mjson")),
            Duration::from_secs(5),
        );
        assert_eq!(inv.program, "mjai");
        assert_eq!(inv.args, vec!["convert", "/tmp/stage/a.mjlog", "/out/a.mjson"]);
        assert_eq!(inv.timeout, Duration::from_secs(5));
    }

    #[test]
    fn template_without_output_leaves_placeholder_empty() {
        let template = vec!["--file={input}".to_string(), "{output}".into()];
        let inv = ToolInvocation::from_template(
            "validate_logs",
            &template,
            &PathBuf::from("x.mjson"),
            None,
            Duration::from_secs(1),
        );
        assert_eq!(inv.args, vec!["--file=x.mjson", ""]);
    }

    #[test]
    fn excerpt_trims_and_caps() {
        assert_eq!(excerpt("  hello world \n", 5), "hello");
        assert_eq!(excerpt("ok", 200), "ok");
        assert_eq!(excerpt("牌牌牌", 2), "牌牌");
    }

    #[test]
    fn status_description() {
        let out = ToolOutput {
            status: Some(3),
            ..Default::default()
        };
        assert!(!out.success());
        assert_eq!(out.describe_status(), "exit status 3");
        let killed = ToolOutput::default();
        assert_eq!(killed.describe_status(), "terminated by signal");
    }
}
