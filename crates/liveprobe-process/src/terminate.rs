//! Process termination.
//!
//! [`teardown`] is the stage-level operation. [`terminate_gracefully`] is
//! used by the launch supervisor, which is the only code allowed to signal a
//! child while it is still unreaped.

use crate::handle::{ExitReason, ProcessHandle, StopRequest};
use liveprobe_common::{ProcessError, ProcessResult};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

/// How long to wait for a force-killed process to be reaped.
pub const FORCE_KILL_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of a teardown. Never an error for processes that were already gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TeardownOutcome {
    /// The process was running and has been stopped by this teardown.
    Terminated { forced: bool },
    /// The process had already exited (on its own, through its background
    /// timeout, or through an earlier teardown).
    AlreadyExited,
}

impl TeardownOutcome {
    pub fn terminated(&self) -> bool {
        matches!(self, Self::Terminated { .. })
    }

    pub fn already_exited(&self) -> bool {
        matches!(self, Self::AlreadyExited)
    }
}

/// Stop the process behind `handle`.
///
/// Sends a graceful termination request, waits up to `grace`, then force
/// kills. Calling this again on the same handle reports
/// [`TeardownOutcome::AlreadyExited`].
pub async fn teardown(handle: &ProcessHandle, grace: Duration) -> ProcessResult<TeardownOutcome> {
    let pid = handle.pid();

    if handle.has_exited() {
        info!("Process already exited: {} (PID: {})", handle.command(), pid);
        return Ok(TeardownOutcome::AlreadyExited);
    }

    if !handle.request_stop(StopRequest::Terminate) {
        info!("Process already exited: {} (PID: {})", handle.command(), pid);
        return Ok(TeardownOutcome::AlreadyExited);
    }

    if handle.wait_for_exit(grace).await {
        return Ok(classify_exit(handle, false));
    }

    warn!(
        "Process {} (PID: {}) did not exit within {:?}, force killing",
        handle.command(),
        pid,
        grace
    );

    if !handle.request_stop(StopRequest::Kill) || handle.wait_for_exit(FORCE_KILL_TIMEOUT).await {
        return Ok(classify_exit(handle, true));
    }

    Err(ProcessError::timeout(
        pid,
        format!("did not exit after force kill within {:?}", FORCE_KILL_TIMEOUT),
    ))
}

/// A process that exited on its own while we were signalling it counts as
/// already exited.
fn classify_exit(handle: &ProcessHandle, forced: bool) -> TeardownOutcome {
    let pid = handle.pid();
    match handle.exit_info().map(|info| info.reason) {
        Some(ExitReason::Killed) | None => {
            info!("Process terminated: {} (PID: {})", handle.command(), pid);
            TeardownOutcome::Terminated { forced }
        }
        Some(ExitReason::Exited) | Some(ExitReason::BackgroundTimeout) => {
            info!(
                "Process exited before it could be stopped: {} (PID: {})",
                handle.command(),
                pid
            );
            TeardownOutcome::AlreadyExited
        }
    }
}

/// Send SIGTERM. Returns `Ok(false)` if the process no longer exists.
#[cfg(unix)]
pub fn terminate_gracefully(pid: u32) -> ProcessResult<bool> {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid).map_err(|_| ProcessError::stop_failed(pid, "PID out of range"))?;

    match kill(Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        Err(e) => Err(ProcessError::stop_failed(pid, e.to_string())),
    }
}
