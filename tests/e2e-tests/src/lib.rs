//! Helpers for end-to-end liveprobe tests.
//!
//! Scenario tests launch the `testexe` binary from this package. Cargo only
//! exposes its path to integration tests, so callers pass it in via
//! `env!("CARGO_BIN_EXE_testexe")`.

use liveprobe_harness::{PipelineConfig, StageConfig};
use std::net::TcpListener;
use std::path::Path;

/// A port that was free a moment ago on 127.0.0.1.
pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .map(|addr| addr.port())
        .expect("Failed to reserve a local port")
}

/// Builds the YAML for one stage that launches `testexe`.
#[derive(Debug, Clone)]
pub struct TestStage {
    name: String,
    args: Vec<String>,
    port: u16,
    endpoints: Vec<String>,
    readiness: String,
    background_timeout: Option<String>,
    probe_timeout: String,
    grace: String,
}

impl TestStage {
    /// A stage serving on `port` and probing `/health` after a 500ms delay.
    pub fn new(name: &str, port: u16) -> Self {
        Self {
            name: name.to_string(),
            args: vec!["--port".to_string(), port.to_string()],
            port,
            endpoints: vec!["/health".to_string()],
            readiness: "{ strategy: fixed_delay, delay: 500ms }".to_string(),
            background_timeout: None,
            probe_timeout: "2s".to_string(),
            grace: "2s".to_string(),
        }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.args.push(arg.to_string());
        self
    }

    /// Drop the `--port` flag so nothing listens on the probed port.
    pub fn without_server(mut self) -> Self {
        self.args.clear();
        self
    }

    pub fn endpoints(mut self, endpoints: &[&str]) -> Self {
        self.endpoints = endpoints.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn fixed_delay(mut self, delay: &str) -> Self {
        self.readiness = format!("{{ strategy: fixed_delay, delay: {} }}", delay);
        self
    }

    pub fn poll(mut self, deadline: &str) -> Self {
        self.readiness = format!(
            "{{ strategy: poll, initial_interval: 50ms, max_interval: 500ms, deadline: {} }}",
            deadline
        );
        self
    }

    pub fn background_timeout(mut self, timeout: &str) -> Self {
        self.background_timeout = Some(timeout.to_string());
        self
    }

    pub fn grace(mut self, grace: &str) -> Self {
        self.grace = grace.to_string();
        self
    }

    /// Render the stage as a YAML list item.
    pub fn to_yaml(&self, testexe: &Path) -> String {
        // JSON strings are valid YAML scalars and survive odd characters in paths.
        let quote = |s: &str| serde_json::Value::String(s.to_string()).to_string();
        let args: Vec<String> = self.args.iter().map(|a| quote(a)).collect();
        let endpoints: Vec<String> = self.endpoints.iter().map(|e| quote(e)).collect();

        let mut yaml = format!(
            "  - name: {}\n    launch:\n      executable: {}\n      args: [{}]\n",
            self.name,
            quote(&testexe.to_string_lossy()),
            args.join(", ")
        );
        if let Some(timeout) = &self.background_timeout {
            yaml.push_str(&format!("      background_timeout: {}\n", timeout));
        }
        yaml.push_str(&format!("    readiness: {}\n", self.readiness));
        yaml.push_str(&format!(
            "    probe:\n      base_url: \"http://127.0.0.1:{}\"\n      endpoints: [{}]\n      timeout: {}\n",
            self.port,
            endpoints.join(", "),
            self.probe_timeout
        ));
        yaml.push_str(&format!("    teardown:\n      grace: {}\n", self.grace));
        yaml
    }

    pub fn build(&self, testexe: &Path) -> StageConfig {
        let mut config = pipeline_config(testexe, &[self.clone()]);
        config.stages.remove(0)
    }
}

/// A validated pipeline configuration made of `stages`.
pub fn pipeline_config(testexe: &Path, stages: &[TestStage]) -> PipelineConfig {
    let mut yaml = String::from("stages:\n");
    for stage in stages {
        yaml.push_str(&stage.to_yaml(testexe));
    }
    PipelineConfig::load_from_string(&yaml)
        .unwrap_or_else(|e| panic!("Invalid test configuration: {}\n{}", e, yaml))
}
