//! # liveprobe common
//!
//! Types shared by every liveprobe crate: the error taxonomy for launching
//! and stopping processes, and the identifiers used to name pipeline stages.

pub mod errors;
pub mod types;

// Re-export commonly used items
pub use errors::{Error, LaunchError, LaunchResult, ProcessError, ProcessResult, Result};
pub use types::StageName;
