//! The handle a stage holds on to between launch and teardown.

use crate::check::process_exists;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Executable and arguments a process was started with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchCommand {
    pub executable: String,
    pub args: Vec<String>,
}

impl fmt::Display for LaunchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.executable)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Why a launched process is no longer running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// The process ended on its own.
    Exited,
    /// The background timeout elapsed and the process was killed.
    BackgroundTimeout,
    /// The harness asked it to stop (teardown, or the handle was dropped).
    Killed,
}

/// Exit details published by the supervisor once the process is reaped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExitInfo {
    pub code: Option<i32>,
    pub signal: Option<i32>,
    pub reason: ExitReason,
    pub exited_at: DateTime<Utc>,
}

/// Stop requests forwarded to the supervisor task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StopRequest {
    /// SIGTERM on Unix.
    Terminate,
    /// SIGKILL / TerminateProcess.
    Kill,
}

/// One launched process.
///
/// Only [`crate::launch`] creates handles. The handle is not `Clone`: the
/// stage that launched the process owns it and lends it to teardown. When the
/// handle is dropped while the process is still running, the supervisor kills
/// it.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: u32,
    command: LaunchCommand,
    launched_at: DateTime<Utc>,
    exit_rx: watch::Receiver<Option<ExitInfo>>,
    stop_tx: mpsc::UnboundedSender<StopRequest>,
}

impl ProcessHandle {
    pub(crate) fn new(
        pid: u32,
        command: LaunchCommand,
        exit_rx: watch::Receiver<Option<ExitInfo>>,
        stop_tx: mpsc::UnboundedSender<StopRequest>,
    ) -> Self {
        Self {
            pid,
            command,
            launched_at: Utc::now(),
            exit_rx,
            stop_tx,
        }
    }

    /// OS process identifier.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn command(&self) -> &LaunchCommand {
        &self.command
    }

    pub fn launched_at(&self) -> DateTime<Utc> {
        self.launched_at
    }

    /// Exit details, once the process has been reaped.
    pub fn exit_info(&self) -> Option<ExitInfo> {
        self.exit_rx.borrow().clone()
    }

    /// True once the process has exited for any reason.
    pub fn has_exited(&self) -> bool {
        self.exit_rx.borrow().is_some() || self.stop_tx.is_closed()
    }

    /// True while the process has not exited and its PID still answers.
    pub fn is_running(&self) -> bool {
        !self.has_exited() && process_exists(self.pid).unwrap_or(false)
    }

    /// Wait up to `timeout` for the process to exit. Returns whether it did.
    pub async fn wait_for_exit(&self, timeout: Duration) -> bool {
        let mut rx = self.exit_rx.clone();
        // A closed channel means the supervisor is gone, and the child with it.
        let exited = tokio::time::timeout(timeout, rx.wait_for(Option::is_some))
            .await
            .is_ok();
        exited
    }

    /// Forward a stop request to the supervisor. Returns false when the
    /// supervisor has already finished.
    pub(crate) fn request_stop(&self, request: StopRequest) -> bool {
        self.stop_tx.send(request).is_ok()
    }
}
