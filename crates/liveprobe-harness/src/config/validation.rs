use super::*;
use anyhow::{anyhow, Result};
use liveprobe_process::validate_stage_name;
use std::collections::HashSet;

/// Validate the complete configuration
pub fn validate_config(config: &PipelineConfig) -> Result<()> {
    validate_pipeline_options(&config.pipeline)?;
    validate_stage_configs(&config.stages)?;
    Ok(())
}

/// Validate pipeline-wide options
fn validate_pipeline_options(options: &PipelineOptions) -> Result<()> {
    match options.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(anyhow!(
            "Invalid log level: {}, must be one of: trace, debug, info, warn, error",
            options.log_level
        )),
    }
}

/// Validate all stage configurations
fn validate_stage_configs(stages: &[StageConfig]) -> Result<()> {
    if stages.is_empty() {
        return Err(anyhow!("At least one stage must be configured"));
    }

    let mut names = HashSet::new();
    for stage in stages {
        if !names.insert(&stage.name) {
            return Err(anyhow!("Duplicate stage name: {}", stage.name));
        }

        validate_stage_config(stage)?;
    }

    Ok(())
}

/// Validate a single stage configuration
fn validate_stage_config(stage: &StageConfig) -> Result<()> {
    validate_stage_name(&stage.name)?;

    if stage.name.len() > 64 {
        return Err(anyhow!("Stage name too long (max 64 characters): {}", stage.name));
    }

    if stage.launch.executable.trim().is_empty() {
        return Err(anyhow!("Stage {}: executable cannot be empty", stage.name));
    }

    if let Some(timeout) = stage.launch.background_timeout {
        if timeout.is_zero() {
            return Err(anyhow!("Stage {}: background_timeout must be greater than 0", stage.name));
        }
    }

    validate_probe_config(&stage.name, &stage.probe)?;
    validate_readiness_config(&stage.name, &stage.readiness)?;

    Ok(())
}

fn validate_probe_config(stage: &str, probe: &ProbeConfig) -> Result<()> {
    if !probe.base_url.starts_with("http://") {
        return Err(anyhow!(
            "Stage {}: base_url must start with http://, got: {}",
            stage,
            probe.base_url
        ));
    }

    if probe.endpoints.is_empty() {
        return Err(anyhow!("Stage {}: at least one probe endpoint is required", stage));
    }

    if probe.endpoints.iter().any(|e| e.trim().is_empty()) {
        return Err(anyhow!("Stage {}: probe endpoints cannot be empty", stage));
    }

    if probe.timeout.is_zero() {
        return Err(anyhow!("Stage {}: probe timeout must be greater than 0", stage));
    }

    Ok(())
}

fn validate_readiness_config(stage: &str, readiness: &ReadinessConfig) -> Result<()> {
    if let ReadinessConfig::Poll {
        initial_interval,
        backoff_rate,
        max_interval,
        deadline,
        ..
    } = readiness
    {
        if deadline.is_zero() {
            return Err(anyhow!("Stage {}: readiness deadline must be greater than 0", stage));
        }
        if initial_interval.is_zero() {
            return Err(anyhow!(
                "Stage {}: readiness initial_interval must be greater than 0",
                stage
            ));
        }
        if !backoff_rate.is_finite() || *backoff_rate < 1.0 {
            return Err(anyhow!(
                "Stage {}: backoff_rate must be at least 1.0, got: {}",
                stage,
                backoff_rate
            ));
        }
        if max_interval < initial_interval {
            return Err(anyhow!(
                "Stage {}: max_interval must not be shorter than initial_interval",
                stage
            ));
        }
    }

    Ok(())
}
