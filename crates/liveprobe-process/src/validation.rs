//! Validation utilities for launch commands and stage names.

use liveprobe_common::{Error, LaunchError, LaunchResult, Result};
use std::path::{Path, PathBuf};

/// Resolve an executable to the path that will actually be spawned.
///
/// A value containing a path separator is treated as a file path (relative
/// paths are resolved against `working_directory` when given). Anything else
/// is looked up on `PATH`.
pub fn resolve_executable(
    executable: &str,
    working_directory: Option<&Path>,
) -> LaunchResult<PathBuf> {
    if executable.trim().is_empty() {
        return Err(LaunchError::invalid_command("Executable path cannot be empty"));
    }

    let candidate = Path::new(executable);
    if candidate.components().count() > 1 || candidate.is_absolute() {
        let full = match working_directory {
            Some(dir) if candidate.is_relative() => dir.join(candidate),
            _ => candidate.to_path_buf(),
        };
        if !full.is_file() {
            return Err(LaunchError::executable_not_found(executable));
        }
        return std::fs::canonicalize(&full)
            .map_err(|e| LaunchError::spawn_failed(executable, e.to_string()));
    }

    which::which(executable).map_err(|_| LaunchError::executable_not_found(executable))
}

/// Validate a stage name.
pub fn validate_stage_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::validation("Stage name cannot be empty"));
    }

    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::validation(format!(
            "Stage name '{}' can only contain alphanumeric characters, hyphens, and underscores",
            name
        )));
    }

    Ok(())
}
