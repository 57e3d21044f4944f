use std::ffi::OsStr;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use super::error::ToolError;
use super::types::{ToolInvocation, ToolOutput};
use crate::error::ConfigError;

/// Capability to run an external tool and capture its result.
///
/// [`ProcessRunner`] is the real implementation; tests substitute fakes that return
/// canned outputs.
pub trait ToolRunner: Send + Sync {
    fn invoke(
        &self,
        invocation: &ToolInvocation,
    ) -> impl Future<Output = Result<ToolOutput, ToolError>> + Send;
}

/// Runs tools as child processes with piped output and a hard deadline.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    async fn invoke(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group: a terminal Ctrl-C reaches us, not the tools, so running
        // jobs finish while the run winds down. Timeouts kill the whole group.
        #[cfg(unix)]
        command.process_group(0);

        let child = command
            .spawn()
            .map_err(|e| ToolError::from_spawn(&invocation.program, e))?;
        let pid = child.id();
        debug!(program = %invocation.program, pid, "spawned tool");

        // Dropping the wait future on timeout drops the child, which kills it.
        // Anything it started is killed through the process group.
        match timeout(invocation.timeout, child.wait_with_output()).await {
            Ok(output) => {
                let output = output?;
                Ok(ToolOutput {
                    status: output.status.code(),
                    stdout: output.stdout,
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                })
            }
            Err(_) => {
                kill_process_group(pid);
                Err(ToolError::TimedOut {
                    after: invocation.timeout,
                })
            }
        }
    }
}

/// Sends SIGKILL to the group led by `pid`, reaching wrapper scripts' children.
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    let Some(pid) = pid.and_then(|p| libc::pid_t::try_from(p).ok()) else {
        return;
    };
    // SAFETY: killpg only sends a signal; the group was created for this child.
    let r = unsafe { libc::killpg(pid, libc::SIGKILL) };
    if r != 0 {
        debug!(pid, error = %std::io::Error::last_os_error(), "process group already gone");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

/// Resolves `program` the way a shell would: paths are checked directly, bare
/// names are searched on `PATH`.
pub fn locate_program(program: &str) -> Result<PathBuf, ConfigError> {
    let path_var = std::env::var_os("PATH").unwrap_or_default();
    locate_in(program, &path_var)
}

fn locate_in(program: &str, path_var: &OsStr) -> Result<PathBuf, ConfigError> {
    let candidate = Path::new(program);
    if candidate.is_absolute() || candidate.components().count() > 1 {
        return check_executable(candidate, program);
    }

    for dir in std::env::split_paths(path_var) {
        for name in candidate_names(program) {
            let full = dir.join(&name);
            if full.is_file() {
                return check_executable(&full, program);
            }
        }
    }

    Err(ConfigError::ToolNotFound {
        program: program.to_string(),
    })
}

fn candidate_names(program: &str) -> Vec<String> {
    if cfg!(windows) && Path::new(program).extension().is_none() {
        [".exe", ".bat", ".cmd"]
            .iter()
            .map(|ext| format!("{program}{ext}"))
            .collect()
    } else {
        vec![program.to_string()]
    }
}

fn check_executable(path: &Path, program: &str) -> Result<PathBuf, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::ToolNotFound {
            program: program.to_string(),
        });
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = path
            .metadata()
            .map(|m| m.permissions().mode())
            .unwrap_or(0);
        if mode & 0o111 == 0 {
            return Err(ConfigError::ToolNotExecutable {
                program: program.to_string(),
            });
        }
    }

    Ok(path.to_path_buf())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::time::Duration;

    fn sh(script: &str, timeout: Duration) -> ToolInvocation {
        ToolInvocation {
            program: "sh".into(),
            args: vec!["-c".into(), script.into()],
            timeout,
        }
    }

    #[tokio::test]
    async fn captures_stdout_stderr_and_status() {
        let out = ProcessRunner
            .invoke(&sh("echo event; echo oops >&2; exit 3", Duration::from_secs(5)))
            .await
            .unwrap();
        assert_eq!(out.status, Some(3));
        assert_eq!(out.stdout, b"event\n");
        assert_eq!(out.stderr, "oops\n");
    }

    #[tokio::test]
    async fn successful_exit() {
        let out = ProcessRunner
            .invoke(&sh("true", Duration::from_secs(5)))
            .await
            .unwrap();
        assert!(out.success());
        assert!(out.stdout.is_empty());
    }

    #[tokio::test]
    async fn slow_process_times_out() {
        let started = std::time::Instant::now();
        let err = ProcessRunner
            .invoke(&sh("sleep 5", Duration::from_millis(100)))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::TimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn timeout_kills_grandchildren() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("late.mjson");
        let script = format!("(sleep 0.5; touch '{}') & wait", marker.display());

        let err = ProcessRunner
            .invoke(&sh(&script, Duration::from_millis(100)))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::TimedOut { .. }));

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert!(!marker.exists(), "background job outlived the timeout");
    }

    #[tokio::test]
    async fn missing_program_is_not_found() {
        let inv = ToolInvocation {
            program: "/definitely/not/here/mjai".into(),
            args: vec![],
            timeout: Duration::from_secs(1),
        };
        let err = ProcessRunner.invoke(&inv).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound { .. }));
    }

    #[test]
    fn locate_searches_path() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("mjai");
        std::fs::write(&tool, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let found = locate_in("mjai", dir.path().as_os_str()).unwrap();
        assert_eq!(found, tool);
        assert!(matches!(
            locate_in("validate_logs", dir.path().as_os_str()),
            Err(ConfigError::ToolNotFound { .. })
        ));
    }

    #[test]
    fn locate_rejects_non_executable() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("mjai");
        std::fs::write(&tool, "not a program").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o644)).unwrap();

        let err = locate_in(tool.to_str().unwrap(), OsStr::new("")).unwrap_err();
        assert!(matches!(err, ConfigError::ToolNotExecutable { .. }));
    }
}
