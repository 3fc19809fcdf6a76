//! # liveprobe process
//!
//! Low-level process operations for the probe harness:
//! - Launching a detached background process ([`launch`])
//! - Tracking it through a [`ProcessHandle`]
//! - Process existence verification ([`process_exists`])
//! - Tearing it down again ([`teardown`]), tolerating processes that are
//!   already gone
//! - Validating executables before spawning

pub mod check;
pub mod execute;
pub mod handle;
pub mod terminate;
pub mod validation;

// Re-export main types
pub use check::*;
pub use execute::*;
pub use handle::*;
pub use terminate::*;
pub use validation::*;
