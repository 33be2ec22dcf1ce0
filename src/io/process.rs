//! External process invocation for dbgen, qgen and the benchmark client.
//!
//! The orchestrator only talks to the [`ProcessRunner`] trait, so tests can swap in
//! a fake that materializes files instead of spawning binaries.

use crate::error::{PipelineError, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

/// One external command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to execute. Relative paths containing a separator resolve against `working_dir`.
    pub program: String,
    /// Arguments passed to the program
    pub args: Vec<String>,
    /// Working directory of the child
    pub working_dir: PathBuf,
    /// File receiving the child's stdout (inherited when unset)
    pub stdout: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
            stdout: None,
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

    pub fn stdout_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout = Some(path.into());
        self
    }

    /// Program and arguments joined for logging.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Blocking-from-the-caller's-view capability to run an external command.
pub trait ProcessRunner {
    /// Run the command to completion and return its exit code.
    fn run(&self, invocation: &Invocation) -> impl Future<Output = Result<i32>> + Send;
}

/// Run an invocation and turn a non-zero exit code into `ExternalProcessFailure`.
pub async fn run_checked<R: ProcessRunner>(runner: &R, invocation: &Invocation) -> Result<()> {
    tracing::info!("Running {}", invocation.command_line());
    let code = runner.run(invocation).await?;
    if code != 0 {
        return Err(PipelineError::ExternalProcessFailure {
            program: invocation.program.clone(),
            code,
        });
    }
    Ok(())
}

/// Production runner backed by `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct TokioProcessRunner {
    timeout: Option<Duration>,
}

impl TokioProcessRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<i32> {
        let program = resolve_program(&invocation.program, &invocation.working_dir)?;

        let mut command = tokio::process::Command::new(&program);
        command
            .args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .kill_on_drop(true);

        if let Some(path) = &invocation.stdout {
            let file = std::fs::File::create(path).map_err(|e| PipelineError::write(path, e))?;
            command.stdout(Stdio::from(file));
        }

        let mut child = command.spawn().map_err(|e| PipelineError::ExternalProcessSpawn {
            program: invocation.program.clone(),
            source: e,
        })?;

        let status = match self.timeout {
            Some(timeout) => {
                let waited = tokio::time::timeout(timeout, child.wait()).await;
                match waited {
                    Ok(status) => status,
                    Err(_) => {
                        if let Err(e) = child.kill().await {
                            tracing::warn!("Failed to kill {}: {}", invocation.program, e);
                        }
                        return Err(PipelineError::ExternalProcessTimeout {
                            program: invocation.program.clone(),
                            timeout,
                        });
                    }
                }
            }
            None => child.wait().await,
        }
        .map_err(|e| PipelineError::io(&invocation.working_dir, e))?;

        // Killed by a signal
        Ok(status.code().unwrap_or(-1))
    }
}

/// Resolve `./tool`-style programs against the child's working directory.
fn resolve_program(program: &str, working_dir: &Path) -> Result<PathBuf> {
    let path = Path::new(program);
    if path.is_absolute() || path.components().count() < 2 {
        return Ok(path.to_path_buf());
    }
    let base = working_dir
        .canonicalize()
        .map_err(|e| PipelineError::open_source(working_dir, e))?;
    Ok(base.join(path))
}
