//! # liveprobe harness
//!
//! Runs pipeline stages that each launch a service, wait for it, probe its
//! endpoints and tear it down again.
//!
//! A stage always tears down what it launched, whatever the probes reported.
//! Probe failures are advisory unless strict probing is enabled; only a
//! launch failure (or a process that refuses to die) fails a stage by
//! default.

pub mod config;
pub mod pipeline;
pub mod report;
pub mod stage;

pub use config::{
    parse_duration, LaunchConfig, PipelineConfig, PipelineOptions, ProbeConfig, ReadinessConfig,
    StageConfig, TeardownConfig,
};
pub use pipeline::{Pipeline, RunOptions};
pub use report::{PipelineReport, StageReport};
pub use stage::run_stage;
