//! Stage and pipeline reports.

use chrono::{DateTime, Utc};
use liveprobe_common::StageName;
use liveprobe_monitoring::{ProbeResult, ReadinessOutcome};
use liveprobe_process::{LaunchCommand, TeardownOutcome};
use serde::Serialize;

/// Everything one stage observed.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: StageName,
    pub command: LaunchCommand,
    pub strict: bool,
    /// None when the launch failed.
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launched_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readiness: Option<ReadinessOutcome>,
    pub probes: Vec<ProbeResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teardown: Option<TeardownOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teardown_error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl StageReport {
    /// Stage success signal.
    ///
    /// Probe results only count when the stage is strict; otherwise a
    /// stage that launched and tore down its process succeeds regardless of
    /// what the probes saw.
    pub fn succeeded(&self) -> bool {
        if self.launch_error.is_some() || self.teardown_error.is_some() {
            return false;
        }
        if !self.strict {
            return true;
        }
        self.all_probes_responded() && !self.readiness.is_some_and(|r| r.timed_out())
    }

    pub fn all_probes_responded(&self) -> bool {
        self.probes.iter().all(|p| p.responded)
    }

    /// Operator-facing lines: one per probe, then the unconditional stop line.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.probes.len() + 2);

        if let Some(error) = &self.launch_error {
            lines.push(format!("[{}] ✗ launch failed: {}", self.stage, error));
            return lines;
        }

        if let Some(ReadinessOutcome::TimedOut {
            attempts,
            elapsed_ms,
        }) = self.readiness
        {
            lines.push(format!(
                "[{}] ✗ not ready after {} attempt(s) in {}ms",
                self.stage, attempts, elapsed_ms
            ));
        }

        for probe in &self.probes {
            lines.push(probe_line(&self.stage, probe));
        }

        let pid = self.pid.map(|p| p.to_string()).unwrap_or_else(|| "?".to_string());
        let how = match (&self.teardown, &self.teardown_error) {
            (Some(TeardownOutcome::Terminated { forced: false }), _) => "terminated".to_string(),
            (Some(TeardownOutcome::Terminated { forced: true }), _) => {
                "terminated (forced)".to_string()
            }
            (Some(TeardownOutcome::AlreadyExited), _) => "already exited".to_string(),
            (None, Some(error)) => format!("stop failed: {}", error),
            (None, None) => "not stopped".to_string(),
        };
        lines.push(format!(
            "[{}] stopped {} (PID {}): {}",
            self.stage, self.command, pid, how
        ));

        lines
    }
}

fn probe_line(stage: &StageName, probe: &ProbeResult) -> String {
    if probe.responded {
        let status = probe
            .status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "[{}] ✓ {} responded (status {}, {}ms)",
            stage, probe.endpoint, status, probe.response_time_ms
        )
    } else {
        format!(
            "[{}] ✗ {} did not respond: {}",
            stage,
            probe.endpoint,
            probe.error.as_deref().unwrap_or("no response")
        )
    }
}

/// Reports for every stage that ran, in order.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub stages: Vec<StageReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PipelineReport {
    pub fn succeeded(&self) -> bool {
        self.stages.iter().all(StageReport::succeeded)
    }

    /// Process exit code for the invoking automation.
    pub fn exit_code(&self) -> i32 {
        if self.succeeded() {
            0
        } else {
            1
        }
    }

    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .stages
            .iter()
            .flat_map(StageReport::summary_lines)
            .collect();

        let failed: Vec<&str> = self
            .stages
            .iter()
            .filter(|s| !s.succeeded())
            .map(|s| s.stage.as_str())
            .collect();

        if failed.is_empty() {
            lines.push(format!("{} stage(s) passed", self.stages.len()));
        } else {
            lines.push(format!(
                "{} of {} stage(s) failed: {}",
                failed.len(),
                self.stages.len(),
                failed.join(", ")
            ));
        }
        lines
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
