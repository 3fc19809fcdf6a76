//! End-to-end stage scenarios against the `testexe` echo service.

#![cfg(unix)]

use e2e_tests::{free_port, pipeline_config, TestStage};
use liveprobe_harness::{run_stage, Pipeline, RunOptions};
use liveprobe_monitoring::{HttpProber, ReadinessOutcome};
use liveprobe_process::{launch, process_exists, teardown, LaunchSpec, TeardownOutcome};
use std::path::Path;
use std::time::Duration;

fn testexe() -> &'static Path {
    Path::new(env!("CARGO_BIN_EXE_testexe"))
}

fn banner(title: &str) {
    println!("\n========================================");
    println!("TEST: {}", title);
    println!("========================================\n");
}

#[tokio::test]
async fn test_health_endpoint_responds() {
    banner("Health endpoint responds");
    let port = free_port();
    let stage = TestStage::new("echo", port).build(testexe());
    let prober = HttpProber::new(stage.http_probe_config());

    println!("Step 1: Running stage against port {}...", port);
    let report = run_stage(&stage, &prober, false).await;

    println!("Step 2: Checking the report...");
    assert!(report.launch_error.is_none());
    assert_eq!(report.probes.len(), 1);
    assert!(report.probes[0].responded, "{:?}", report.probes[0]);
    assert_eq!(report.probes[0].status, Some(200));
    assert_eq!(report.teardown, Some(TeardownOutcome::Terminated { forced: false }));
    assert!(report.succeeded());
    assert!(!process_exists(report.pid.unwrap()).unwrap());
    println!("✓ /health responded and the service was terminated\n");
}

#[tokio::test]
async fn test_background_timeout_before_teardown() {
    banner("Background timeout shorter than the wait");
    let port = free_port();
    let stage = TestStage::new("short-lived", port)
        .background_timeout("200ms")
        .fixed_delay("1s")
        .build(testexe());
    let prober = HttpProber::new(stage.http_probe_config());

    let report = run_stage(&stage, &prober, false).await;

    assert!(!report.probes[0].responded);
    assert_eq!(report.teardown, Some(TeardownOutcome::AlreadyExited));
    assert!(report.teardown_error.is_none());
    assert!(report.succeeded());
    println!("✓ Teardown reported an already exited process without error\n");
}

#[tokio::test]
async fn test_nothing_listening_is_not_fatal() {
    banner("Nothing listening on the probed port");
    let port = free_port();
    let stage = TestStage::new("silent", port)
        .without_server()
        .fixed_delay("100ms")
        .build(testexe());
    let prober = HttpProber::new(stage.http_probe_config());

    let report = run_stage(&stage, &prober, false).await;

    assert!(!report.probes[0].responded);
    assert!(report.probes[0].error.is_some());
    assert!(report.teardown.unwrap().terminated());
    assert!(report.succeeded());

    let strict = run_stage(&stage, &prober, true).await;
    assert!(!strict.succeeded());
    println!("✓ Unanswered probe only fails the stage in strict mode\n");
}

#[tokio::test]
async fn test_three_endpoints_one_process() {
    banner("Three endpoints against one process");
    let port = free_port();
    let stage = TestStage::new("smoke", port)
        .endpoints(&["/health", "/facts", "/facts/categories"])
        .poll("10s")
        .build(testexe());
    let prober = HttpProber::new(stage.http_probe_config());

    let report = run_stage(&stage, &prober, false).await;

    assert!(matches!(report.readiness, Some(ReadinessOutcome::Ready { .. })));
    let endpoints: Vec<&str> = report.probes.iter().map(|p| p.endpoint.as_str()).collect();
    assert_eq!(
        endpoints,
        vec![
            format!("http://127.0.0.1:{}/health", port),
            format!("http://127.0.0.1:{}/facts", port),
            format!("http://127.0.0.1:{}/facts/categories", port),
        ]
    );
    assert!(report.all_probes_responded());
    assert_eq!(report.teardown, Some(TeardownOutcome::Terminated { forced: false }));
    println!("✓ Three results recorded, one teardown\n");
}

#[tokio::test]
async fn test_handle_valid_until_teardown() {
    banner("Handle validity and teardown idempotence");
    let spec = LaunchSpec::new(testexe().to_string_lossy());

    let handle = launch(&spec).await.expect("launch testexe");
    assert!(handle.pid() > 0);
    assert!(handle.is_running());
    assert!(process_exists(handle.pid()).unwrap());

    let first = teardown(&handle, Duration::from_secs(2)).await.unwrap();
    assert_eq!(first, TeardownOutcome::Terminated { forced: false });

    let second = teardown(&handle, Duration::from_secs(2)).await.unwrap();
    assert_eq!(second, TeardownOutcome::AlreadyExited);
    println!("✓ Second teardown is a no-op\n");
}

#[tokio::test]
async fn test_sigterm_ignored_forces_kill() {
    banner("Forced teardown");
    let port = free_port();
    let stage = TestStage::new("stubborn", port)
        .arg("--ignore-sigterm")
        .fixed_delay("300ms")
        .grace("300ms")
        .build(testexe());
    let prober = HttpProber::new(stage.http_probe_config());

    let report = run_stage(&stage, &prober, false).await;

    assert_eq!(report.teardown, Some(TeardownOutcome::Terminated { forced: true }));
    assert!(!process_exists(report.pid.unwrap()).unwrap());
    println!("✓ SIGKILL followed the grace period\n");
}

#[tokio::test]
async fn test_pipeline_runs_stages_in_order() {
    banner("Pipeline of two stages");
    let first = free_port();
    let second = free_port();
    let config = pipeline_config(
        testexe(),
        &[
            TestStage::new("test-server", first).background_timeout("10s"),
            TestStage::new("smoke", second).endpoints(&["/health", "/facts"]),
        ],
    );

    let report = Pipeline::new(config).run(&RunOptions::default()).await.unwrap();

    let names: Vec<&str> = report.stages.iter().map(|s| s.stage.as_str()).collect();
    assert_eq!(names, vec!["test-server", "smoke"]);
    assert!(report.succeeded());
    assert_eq!(report.exit_code(), 0);
    assert!(report
        .summary_lines()
        .last()
        .unwrap()
        .contains("2 stage(s) passed"));
    println!("✓ Both stages passed\n");
}
