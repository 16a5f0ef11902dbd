//! Subprocess execution helpers.
//!
//! Every capability in this tool is a thin layer over an external command
//! (`apt`, `systemctl`, `certbot`, `nginx`, `df`, ...). This module is the
//! single place that spawns those commands: capture-style runners for
//! probes and actions, and a piped spawner for `tail -f`-style streaming.

use crate::error::{Error, Result};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};

/// Captured result of a finished command.
///
/// A non-zero exit is data, not an error: probe-style callers routinely
/// inspect `code` (e.g. `systemctl is-active` exits 3 for inactive units).
/// Use [`CommandOutput::into_checked`] when non-zero should fail.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Convert a non-zero exit into [`Error::CommandFailed`].
    pub fn into_checked(self, command: &str) -> Result<CommandOutput> {
        if self.success() {
            Ok(self)
        } else {
            Err(Error::CommandFailed {
                command: command.to_string(),
                code: self.code,
                stderr: if self.stderr.is_empty() {
                    self.stdout.clone()
                } else {
                    self.stderr.clone()
                },
            })
        }
    }
}

/// Run a command and capture its output. Missing binaries map to
/// [`Error::CommandNotFound`]; any exit code is returned as data.
pub async fn run(program: &str, args: &[&str]) -> Result<CommandOutput> {
    tracing::debug!("exec: {} {}", program, args.join(" "));
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::CommandNotFound(program.to_string())
            } else {
                Error::Io(e)
            }
        })?;

    Ok(CommandOutput {
        code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).trim_end().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
    })
}

/// Run a command with `sudo` prepended.
pub async fn run_sudo(program: &str, args: &[&str]) -> Result<CommandOutput> {
    let mut sudo_args = vec![program];
    sudo_args.extend_from_slice(args);
    run("sudo", &sudo_args).await
}

/// Run a full shell line via `/bin/bash -c`.
///
/// Only for recipes that genuinely need shell features (pipes, globs,
/// command substitution) — the installer one-liners. The line comes from
/// this crate's own recipe tables, never from untrusted input.
pub async fn run_shell(line: &str) -> Result<CommandOutput> {
    run("/bin/bash", &["-c", line]).await
}

/// Run a command, failing the call if it exits non-zero.
pub async fn run_checked(program: &str, args: &[&str]) -> Result<CommandOutput> {
    let rendered = format!("{} {}", program, args.join(" "));
    run(program, args).await?.into_checked(&rendered)
}

/// Run with a deadline. Expired timeouts report as exit code -1 so probe
/// callers can treat a hung tool like a failed one.
pub async fn run_with_timeout(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<CommandOutput> {
    match tokio::time::timeout(timeout, run(program, args)).await {
        Ok(result) => result,
        Err(_) => Ok(CommandOutput {
            code: -1,
            stdout: String::new(),
            stderr: format!("timed out after {:?}", timeout),
        }),
    }
}

/// Run a command and return stdout, or None on any failure.
pub async fn output_of(program: &str, args: &[&str]) -> Option<String> {
    match run(program, args).await {
        Ok(out) if out.success() => Some(out.stdout),
        _ => None,
    }
}

/// Check whether a command is available on PATH.
pub fn command_exists(name: &str) -> bool {
    let path = std::env::var_os("PATH").unwrap_or_default();
    std::env::split_paths(&path).any(|dir| {
        let candidate = dir.join(name);
        candidate.is_file()
    })
}

/// Spawn a command with piped stdout/stderr for line-by-line streaming.
/// The caller owns the child and is responsible for killing it.
pub fn spawn_piped(program: &str, args: &[&str]) -> Result<Child> {
    tracing::debug!("spawn: {} {}", program, args.join(" "));
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::CommandNotFound(program.to_string())
            } else {
                Error::Io(e)
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let out = run("echo", &["hello"]).await.unwrap();
        assert!(out.success());
        assert_eq!(out.stdout, "hello");
    }

    #[tokio::test]
    async fn nonzero_exit_is_data_not_error() {
        let out = run("false", &[]).await.unwrap();
        assert!(!out.success());
        assert_eq!(out.code, 1);
    }

    #[tokio::test]
    async fn missing_binary_maps_to_command_not_found() {
        let err = run("definitely-not-a-real-binary-xyz", &[]).await.unwrap_err();
        assert!(matches!(err, Error::CommandNotFound(_)));
    }

    #[tokio::test]
    async fn checked_run_fails_on_nonzero() {
        let err = run_checked("false", &[]).await.unwrap_err();
        assert!(matches!(err, Error::CommandFailed { code: 1, .. }));
    }

    #[tokio::test]
    async fn shell_line_supports_pipes() {
        let out = run_shell("echo one two | wc -w").await.unwrap();
        assert_eq!(out.stdout.trim(), "2");
    }

    #[test]
    fn command_exists_finds_sh() {
        assert!(command_exists("sh"));
        assert!(!command_exists("definitely-not-a-real-binary-xyz"));
    }
}
