//! Subprocess execution for ffmpeg, ffprobe and the device listing tools.
//!
//! Two shapes are supported: `run` executes a command to completion (optionally
//! with a time limit) and `stream` spawns a long-running process that the caller
//! waits on and can signal.

use crate::error::{RecordError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};

pub const SIGINT: i32 = 2;
pub const SIGTERM: i32 = 15;

/// How a process ended: an exit code, or the signal that terminated it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitReport {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl ExitReport {
    pub fn exited(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    pub fn signalled(signal: i32) -> Self {
        Self {
            code: None,
            signal: Some(signal),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Human-readable reason used in failure messages.
    pub fn describe(&self) -> String {
        match (self.code, self.signal) {
            (Some(code), _) => format!("exit code {code}"),
            (None, Some(signal)) => format!("terminated by signal {signal}"),
            (None, None) => "unknown exit status".to_string(),
        }
    }
}

impl From<ExitStatus> for ExitReport {
    fn from(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

/// Options for a run-to-completion call.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Share the terminal with the child instead of capturing its output.
    pub inherit_stdio: bool,
    /// Kill the child and fail with `RecordError::Timeout` after this long.
    pub timeout: Option<Duration>,
}

impl RunOptions {
    pub fn captured() -> Self {
        Self::default()
    }

    pub fn inherited(timeout: Duration) -> Self {
        Self {
            inherit_stdio: true,
            timeout: Some(timeout),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub status: ExitReport,
    pub stdout: String,
    pub stderr: String,
}

/// Termination request sent to a streaming process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopKind {
    /// SIGTERM: let the process finalize its output.
    Graceful,
    /// SIGKILL.
    Force,
}

/// A spawned long-running process.
#[async_trait]
pub trait CaptureHandle: Send {
    /// Waits for the process to exit. Safe to call again after a cancelled wait.
    async fn wait(&mut self) -> Result<ExitReport>;

    fn stop(&mut self, kind: StopKind) -> Result<()>;
}

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    type Handle: CaptureHandle;

    async fn run(&self, program: &Path, args: &[String], options: RunOptions) -> Result<ProcessOutput>;

    /// Spawns `program` sharing the terminal's stdin/stdout/stderr.
    fn stream(&self, program: &Path, args: &[String]) -> Result<Self::Handle>;
}

/// Runs real processes through tokio.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl ProcessRunner for SystemRunner {
    type Handle = ChildHandle;

    async fn run(&self, program: &Path, args: &[String], options: RunOptions) -> Result<ProcessOutput> {
        let name = program_name(program);
        let mut cmd = Command::new(program);
        cmd.args(args).stdin(Stdio::null()).kill_on_drop(true);
        if options.inherit_stdio {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
            // Out of the terminal's foreground group, so Ctrl+C only reaches the capture.
            #[cfg(unix)]
            cmd.process_group(0);
        }

        tracing::debug!("Running {} {}", name, args.join(" "));

        let child = cmd
            .spawn()
            .map_err(|e| RecordError::subprocess(&name, format!("could not be started: {e}")))?;

        // Dropping the child on timeout kills it.
        let finished = async move {
            if options.inherit_stdio {
                let mut child = child;
                let status = child.wait().await?;
                Ok::<_, std::io::Error>(ProcessOutput {
                    status: status.into(),
                    stdout: String::new(),
                    stderr: String::new(),
                })
            } else {
                let output = child.wait_with_output().await?;
                Ok(ProcessOutput {
                    status: output.status.into(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                })
            }
        };

        let output = match options.timeout {
            Some(limit) => match tokio::time::timeout(limit, finished).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!("{} exceeded its {}s limit, killed", name, limit.as_secs());
                    return Err(RecordError::Timeout { program: name, limit });
                }
            },
            None => finished.await,
        }
        .map_err(|e| RecordError::subprocess(&name, format!("could not be waited on: {e}")))?;

        Ok(output)
    }

    fn stream(&self, program: &Path, args: &[String]) -> Result<ChildHandle> {
        let name = program_name(program);
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RecordError::subprocess(&name, format!("could not be started: {e}")))?;

        tracing::info!("Spawned {} (pid {:?})", name, child.id());
        Ok(ChildHandle { child, name })
    }
}

/// Handle over a child spawned by [`SystemRunner::stream`].
pub struct ChildHandle {
    child: Child,
    name: String,
}

#[async_trait]
impl CaptureHandle for ChildHandle {
    async fn wait(&mut self) -> Result<ExitReport> {
        let status = self.child.wait().await?;
        Ok(status.into())
    }

    fn stop(&mut self, kind: StopKind) -> Result<()> {
        match kind {
            StopKind::Graceful => self.terminate(),
            StopKind::Force => {
                tracing::warn!("Force killing {}", self.name);
                self.child.start_kill().map_err(RecordError::from)
            }
        }
    }
}

impl ChildHandle {
    #[cfg(unix)]
    fn terminate(&mut self) -> Result<()> {
        // Already reaped: nothing left to signal.
        let Some(pid) = self.child.id() else {
            return Ok(());
        };
        tracing::info!("Sending SIGTERM to {} (pid {})", self.name, pid);
        let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if rc == -1 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::ESRCH) {
                return Err(err.into());
            }
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn terminate(&mut self) -> Result<()> {
        self.child.start_kill().map_err(RecordError::from)
    }
}

fn program_name(program: &Path) -> String {
    program
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.display().to_string())
}
