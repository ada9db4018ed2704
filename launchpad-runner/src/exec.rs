//! External command seam.
//!
//! Every podman/oc invocation goes through [`CommandRunner`], so stages can be
//! driven by a scripted runner in tests. [`ProcessRunner`] is the real
//! implementation on top of `tokio::process`.

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::RunnerError;

// ---------------------------------------------------------------------------
// Command description
// ---------------------------------------------------------------------------

/// One external command. `stdin` is never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<String>,
    pub timeout: Option<Duration>,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            stdin: None,
            timeout: None,
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdin(mut self, input: String) -> Self {
        self.stdin = Some(input);
        self
    }

    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Shell-like rendering for logs and error messages.
    pub fn display(&self) -> String {
        let mut out = self.program.clone();
        for arg in &self.args {
            out.push(' ');
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                out.push('\'');
                out.push_str(arg);
                out.push('\'');
            } else {
                out.push_str(arg);
            }
        }
        out
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("command", &self.display())
            .field("stdin", &self.stdin.as_ref().map(|s| format!("<{} bytes>", s.len())))
            .field("timeout", &self.timeout)
            .field("cwd", &self.cwd)
            .finish()
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` if the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    pub fn ok(stdout: &str) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: &str) -> Self {
        Self {
            status: Some(code),
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    fn status_label(&self) -> String {
        match self.status {
            Some(code) => format!("exit {code}"),
            None => "killed by signal".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Runner trait
// ---------------------------------------------------------------------------

/// Executes external commands.
///
/// `Ok` is returned for any command that ran to completion, whatever its exit
/// status; `Err` only when it could not be started or exceeded its timeout.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, RunnerError>;
}

/// Run `spec` and turn a non-zero exit into [`RunnerError::CommandFailed`].
pub async fn run_checked(
    runner: &dyn CommandRunner,
    spec: &CommandSpec,
    hint: &str,
) -> Result<CommandOutput, RunnerError> {
    let output = runner.run(spec).await?;
    if output.success() {
        return Ok(output);
    }
    Err(failure(spec, &output, hint))
}

/// [`RunnerError::CommandFailed`] for a finished, unsuccessful command.
pub(crate) fn failure(spec: &CommandSpec, output: &CommandOutput, hint: &str) -> RunnerError {
    RunnerError::CommandFailed {
        command: spec.display(),
        status: output.status_label(),
        stderr: tail(&output.stderr, 20),
        hint: hint.to_string(),
    }
}

/// Last `lines` lines of `text`, trimmed.
fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.trim_end().lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}

// ---------------------------------------------------------------------------
// ProcessRunner
// ---------------------------------------------------------------------------

/// Spawns real processes. Output is captured; children are killed if their
/// timeout elapses.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, RunnerError> {
        let spawn_err = |source| RunnerError::Spawn {
            program: spec.program.clone(),
            source,
        };

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }

        tracing::debug!(command = %spec.display(), "exec");
        let mut child = cmd.spawn().map_err(spawn_err)?;

        if let Some(input) = &spec.stdin {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(input.as_bytes()).await.map_err(spawn_err)?;
                // Dropping the handle closes the pipe so the child sees EOF.
                drop(stdin);
            }
        }

        let wait = child.wait_with_output();
        let output = match spec.timeout {
            Some(limit) => tokio::time::timeout(limit, wait).await.map_err(|_| {
                RunnerError::CommandTimeout {
                    command: spec.display(),
                    after: limit,
                    hint: format!("re-run `{}` by hand to see where it stalls", spec.display()),
                }
            })?,
            None => wait.await,
        }
        .map_err(spawn_err)?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
