//! Error types for liveprobe.
//!
//! Three families live here:
//! - [`LaunchError`]: a process could not be started. This is the only
//!   condition that aborts a pipeline stage.
//! - [`ProcessError`]: checking or stopping an already launched process
//!   failed in a way that is not "it was already gone".
//! - [`Error`]: rejected input such as an unusable stage name.
//!
//! Probe transport failures are deliberately absent: they are folded into a
//! probe result with `responded = false` by the monitoring crate.

use thiserror::Error;

/// Result type alias for general liveprobe operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Invalid input, such as a stage name that cannot be used.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Validation error: {message}")]
    Validation { message: String },
}

impl Error {
    /// Creates a Validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

// ==============================================================================
// Launch Errors
// ==============================================================================

/// Failure to start a process. Fatal to the calling stage only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LaunchError {
    #[error("Invalid launch command: {reason}")]
    InvalidCommand { reason: String },

    #[error("Executable not found: {executable}")]
    ExecutableNotFound { executable: String },

    #[error("Process spawn failed: {executable} - {reason}")]
    SpawnFailed { executable: String, reason: String },

    #[error("Process exited before its PID could be read: {executable}")]
    MissingPid { executable: String },
}

impl LaunchError {
    pub fn invalid_command(reason: impl Into<String>) -> Self {
        Self::InvalidCommand {
            reason: reason.into(),
        }
    }

    pub fn executable_not_found(executable: impl Into<String>) -> Self {
        Self::ExecutableNotFound {
            executable: executable.into(),
        }
    }

    pub fn spawn_failed(executable: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            executable: executable.into(),
            reason: reason.into(),
        }
    }

    pub fn missing_pid(executable: impl Into<String>) -> Self {
        Self::MissingPid {
            executable: executable.into(),
        }
    }
}

/// Result type for launch operations.
pub type LaunchResult<T> = std::result::Result<T, LaunchError>;

// ==============================================================================
// Process Errors
// ==============================================================================

/// Errors raised while checking or stopping a launched process.
///
/// "Process already exited" is never one of these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    #[error("Process stop failed: {pid} - {reason}")]
    StopFailed { pid: u32, reason: String },

    #[error("Process check failed: {pid} - {reason}")]
    CheckFailed { pid: u32, reason: String },

    #[error("Process timeout: {pid} - {operation}")]
    Timeout { pid: u32, operation: String },
}

impl ProcessError {
    pub fn stop_failed(pid: u32, reason: impl Into<String>) -> Self {
        Self::StopFailed {
            pid,
            reason: reason.into(),
        }
    }

    pub fn check_failed(pid: u32, reason: impl Into<String>) -> Self {
        Self::CheckFailed {
            pid,
            reason: reason.into(),
        }
    }

    pub fn timeout(pid: u32, operation: impl Into<String>) -> Self {
        Self::Timeout {
            pid,
            operation: operation.into(),
        }
    }
}

/// Result type for process operations.
pub type ProcessResult<T> = std::result::Result<T, ProcessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::validation("bad stage");
        assert!(matches!(err, Error::Validation { .. }));
        assert_eq!(err.to_string(), "Validation error: bad stage");
    }

    #[test]
    fn test_launch_error_messages() {
        assert_eq!(
            LaunchError::executable_not_found("python").to_string(),
            "Executable not found: python"
        );
        assert_eq!(
            LaunchError::spawn_failed("python", "permission denied").to_string(),
            "Process spawn failed: python - permission denied"
        );
    }

    #[test]
    fn test_process_error_construction() {
        let error = ProcessError::stop_failed(42, "EPERM");
        assert!(matches!(error, ProcessError::StopFailed { pid: 42, .. }));
        assert_eq!(format!("{}", error), "Process stop failed: 42 - EPERM");

        let error = ProcessError::timeout(7, "force kill");
        assert!(format!("{}", error).contains("force kill"));
    }
}
