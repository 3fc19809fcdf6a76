//! Process launching.
//!
//! [`launch`] spawns the target detached from the caller's terminal and hands
//! the child to a supervisor task. The supervisor is the only place that
//! waits on or signals the child, which keeps the PID valid (unreaped) for as
//! long as anyone may still signal it.

use crate::handle::{ExitInfo, ExitReason, LaunchCommand, ProcessHandle, StopRequest};
use crate::validation::resolve_executable;
use chrono::Utc;
use liveprobe_common::{LaunchError, LaunchResult};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// What to start and how.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchSpec {
    pub executable: String,
    pub args: Vec<String>,
    pub working_directory: Option<PathBuf>,
    pub environment: HashMap<String, String>,
    /// Wall-clock limit after which the process is killed regardless of
    /// what the caller is doing.
    pub background_timeout: Option<Duration>,
}

impl LaunchSpec {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            ..Default::default()
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn with_background_timeout(mut self, timeout: Duration) -> Self {
        self.background_timeout = Some(timeout);
        self
    }

    pub fn command(&self) -> LaunchCommand {
        LaunchCommand {
            executable: self.executable.clone(),
            args: self.args.clone(),
        }
    }
}

/// Start `spec` as a background process and return as soon as it has a PID.
///
/// stdin, stdout and stderr are all redirected to the null device. Must be
/// called from within a tokio runtime.
pub async fn launch(spec: &LaunchSpec) -> LaunchResult<ProcessHandle> {
    let program = resolve_executable(&spec.executable, spec.working_directory.as_deref())?;
    let command = spec.command();

    debug!("Launching {} (resolved to {})", command, program.display());

    let mut cmd = Command::new(&program);
    cmd.args(&spec.args)
        .envs(&spec.environment)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    if let Some(dir) = &spec.working_directory {
        cmd.current_dir(dir);
    }

    let child = cmd.spawn().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => LaunchError::executable_not_found(&spec.executable),
        _ => LaunchError::spawn_failed(&spec.executable, e.to_string()),
    })?;

    let pid = child
        .id()
        .ok_or_else(|| LaunchError::missing_pid(&spec.executable))?;

    let (exit_tx, exit_rx) = watch::channel(None);
    let (stop_tx, stop_rx) = mpsc::unbounded_channel();

    tokio::spawn(supervise(child, pid, spec.background_timeout, stop_rx, exit_tx));

    match spec.background_timeout {
        Some(limit) => info!(
            "Process launched: {} (PID: {}, background timeout {:?})",
            command, pid, limit
        ),
        None => info!("Process launched: {} (PID: {})", command, pid),
    }

    Ok(ProcessHandle::new(pid, command, exit_rx, stop_tx))
}

/// Own the child until it is reaped, then publish its exit.
async fn supervise(
    mut child: Child,
    pid: u32,
    background_timeout: Option<Duration>,
    mut stop_rx: mpsc::UnboundedReceiver<StopRequest>,
    exit_tx: watch::Sender<Option<ExitInfo>>,
) {
    let deadline = async move {
        match background_timeout {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    let mut reason = ExitReason::Exited;
    let mut deadline_armed = true;
    let mut handle_alive = true;

    let status = loop {
        tokio::select! {
            status = child.wait() => break status,
            _ = &mut deadline, if deadline_armed => {
                deadline_armed = false;
                warn!("Background timeout reached for PID {}, killing process", pid);
                reason = ExitReason::BackgroundTimeout;
                if let Err(e) = child.start_kill() {
                    warn!("Failed to kill PID {} after background timeout: {}", pid, e);
                }
            }
            request = stop_rx.recv(), if handle_alive => match request {
                Some(StopRequest::Terminate) => {
                    if deliver_terminate(&mut child, pid) && reason == ExitReason::Exited {
                        reason = ExitReason::Killed;
                    }
                }
                Some(StopRequest::Kill) => {
                    if reason == ExitReason::Exited {
                        reason = ExitReason::Killed;
                    }
                    if let Err(e) = child.start_kill() {
                        debug!("Kill request for PID {} not delivered: {}", pid, e);
                    }
                }
                None => {
                    handle_alive = false;
                    warn!("Process handle for PID {} dropped while running, killing process", pid);
                    if reason == ExitReason::Exited {
                        reason = ExitReason::Killed;
                    }
                    if let Err(e) = child.start_kill() {
                        debug!("Kill for dropped handle PID {} not delivered: {}", pid, e);
                    }
                }
            },
        }
    };

    let info = match status {
        Ok(status) => exit_info(status, reason),
        Err(e) => {
            warn!("Failed to wait for PID {}: {}", pid, e);
            ExitInfo {
                code: None,
                signal: None,
                reason,
                exited_at: Utc::now(),
            }
        }
    };

    debug!(
        "Process exited: PID {} (reason={:?}, code={:?}, signal={:?})",
        pid, info.reason, info.code, info.signal
    );
    exit_tx.send_replace(Some(info));
}

/// Ask the child to stop. Returns whether a signal was delivered.
fn deliver_terminate(child: &mut Child, pid: u32) -> bool {
    #[cfg(unix)]
    {
        let _ = child;
        match crate::terminate::terminate_gracefully(pid) {
            Ok(delivered) => delivered,
            Err(e) => {
                warn!("SIGTERM to PID {} failed: {}", pid, e);
                false
            }
        }
    }

    #[cfg(not(unix))]
    {
        match child.start_kill() {
            Ok(()) => true,
            Err(e) => {
                debug!("Terminate request for PID {} not delivered: {}", pid, e);
                false
            }
        }
    }
}

fn exit_info(status: ExitStatus, reason: ExitReason) -> ExitInfo {
    #[cfg(unix)]
    let signal = {
        use std::os::unix::process::ExitStatusExt;
        status.signal()
    };
    #[cfg(not(unix))]
    let signal = None;

    ExitInfo {
        code: status.code(),
        signal,
        reason,
        exited_at: Utc::now(),
    }
}
