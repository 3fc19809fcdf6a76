//! One stage: launch, wait, probe, teardown.

use crate::config::StageConfig;
use crate::report::StageReport;
use chrono::Utc;
use liveprobe_common::StageName;
use liveprobe_monitoring::{wait_until_ready, Prober};
use liveprobe_process::{launch, teardown, validate_stage_name};
use tracing::{error, info, warn};

/// Run `stage` against `prober`.
///
/// Never returns an error: an unusable stage name or a launch failure is
/// recorded in the report and ends the stage before anything else happens. Once a process has been
/// launched, teardown runs exactly once after all probes, whatever they
/// reported.
pub async fn run_stage(stage: &StageConfig, prober: &dyn Prober, strict: bool) -> StageReport {
    let started_at = Utc::now();
    let name = StageName::from(stage.name.as_str());
    let spec = stage.launch_spec();

    let launched = match validate_stage_name(&stage.name) {
        Ok(()) => {
            info!("Stage {}: launching {}", name, spec.command());
            launch(&spec).await.map_err(|e| e.to_string())
        }
        Err(e) => Err(e.to_string()),
    };

    let handle = match launched {
        Ok(handle) => handle,
        Err(e) => {
            error!("Stage {}: launch failed: {}", name, e);
            return StageReport {
                stage: name,
                command: spec.command(),
                strict,
                pid: None,
                launched_at: None,
                launch_error: Some(e),
                readiness: None,
                probes: Vec::new(),
                teardown: None,
                teardown_error: None,
                started_at,
                finished_at: Utc::now(),
            };
        }
    };

    let readiness = wait_until_ready(&stage.readiness_strategy(), prober).await;

    let probes = prober.probe_all(&stage.probe_urls()).await;
    let unanswered = probes.iter().filter(|p| !p.responded).count();
    if unanswered > 0 {
        warn!(
            "Stage {}: {} of {} probe(s) got no response",
            name,
            unanswered,
            probes.len()
        );
    }

    let (teardown_outcome, teardown_error) = match teardown(&handle, stage.teardown.grace).await {
        Ok(outcome) => (Some(outcome), None),
        Err(e) => {
            error!("Stage {}: teardown failed: {}", name, e);
            (None, Some(e.to_string()))
        }
    };

    info!("Stage {}: stopped {} (PID: {})", name, handle.command(), handle.pid());

    StageReport {
        stage: name,
        command: handle.command().clone(),
        strict,
        pid: Some(handle.pid()),
        launched_at: Some(handle.launched_at()),
        launch_error: None,
        readiness: Some(readiness),
        probes,
        teardown: teardown_outcome,
        teardown_error,
        started_at,
        finished_at: Utc::now(),
    }
}
