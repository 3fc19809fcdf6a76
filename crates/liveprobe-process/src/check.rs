//! Process existence checking.

use liveprobe_common::ProcessResult;

/// Check if a process with the given PID exists.
///
/// On Unix this uses `kill(pid, 0)`, which sends no signal but reports
/// whether the PID is known to the kernel. A zombie that has not been reaped
/// yet still counts as existing.
///
/// # Returns
///
/// * `Ok(true)` - Process exists
/// * `Ok(false)` - Process does not exist
/// * `Err(_)` - The check itself failed
///
/// # Examples
///
/// ```rust,no_run
/// use liveprobe_process::process_exists;
///
/// if process_exists(1234).unwrap() {
///     println!("Process 1234 is running");
/// }
/// ```
pub fn process_exists(pid: u32) -> ProcessResult<bool> {
    #[cfg(unix)]
    {
        process_exists_unix(pid)
    }

    #[cfg(not(unix))]
    {
        Err(liveprobe_common::ProcessError::check_failed(
            pid,
            "process existence checks are only supported on Unix",
        ))
    }
}

#[cfg(unix)]
fn process_exists_unix(pid: u32) -> ProcessResult<bool> {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let raw = i32::try_from(pid).map_err(|_| {
        liveprobe_common::ProcessError::check_failed(pid, "PID out of range")
    })?;

    match kill(Pid::from_raw(raw), None) {
        Ok(()) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        // Exists, but owned by someone else.
        Err(Errno::EPERM) => Ok(true),
        Err(e) => Err(liveprobe_common::ProcessError::check_failed(
            pid,
            format!("Failed to check process: {}", e),
        )),
    }
}
