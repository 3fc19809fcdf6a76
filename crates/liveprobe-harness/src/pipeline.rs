//! Sequential pipeline runner.

use crate::config::{PipelineConfig, StageConfig};
use crate::report::PipelineReport;
use crate::stage::run_stage;
use anyhow::{anyhow, Result};
use chrono::Utc;
use liveprobe_monitoring::HttpProber;
use tracing::{info, warn};

/// Options for a single pipeline run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Run only these stages (by name). Empty means every enabled stage.
    pub stages: Vec<String>,
    /// Force strict probing on (or off) for every stage.
    pub strict: Option<bool>,
}

/// Runs configured stages one after another. Stages never overlap, so at
/// most one launched process is alive at a time.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Stages selected by `names`, in configuration order.
    ///
    /// Naming a stage explicitly runs it even when it is disabled.
    pub fn select_stages(&self, names: &[String]) -> Result<Vec<&StageConfig>> {
        if names.is_empty() {
            return Ok(self.config.enabled_stages());
        }

        if let Some(unknown) = names
            .iter()
            .find(|n| !self.config.stages.iter().any(|s| &s.name == *n))
        {
            return Err(anyhow!("Unknown stage: {}", unknown));
        }

        Ok(self
            .config
            .stages
            .iter()
            .filter(|s| names.contains(&s.name))
            .collect())
    }

    /// Run the selected stages. A stage whose launch fails does not stop
    /// the stages after it.
    pub async fn run(&self, options: &RunOptions) -> Result<PipelineReport> {
        let stages = self.select_stages(&options.stages)?;
        let started_at = Utc::now();

        info!("Running {} stage(s)", stages.len());

        let mut reports = Vec::with_capacity(stages.len());
        for stage in stages {
            let strict = options
                .strict
                .unwrap_or_else(|| stage.is_strict(self.config.pipeline.strict_probes));
            let prober = HttpProber::new(stage.http_probe_config());

            let report = run_stage(stage, &prober, strict).await;
            if report.succeeded() {
                info!("Stage {} passed", report.stage);
            } else {
                warn!("Stage {} failed", report.stage);
            }
            reports.push(report);
        }

        Ok(PipelineReport {
            stages: reports,
            started_at,
            finished_at: Utc::now(),
        })
    }
}
