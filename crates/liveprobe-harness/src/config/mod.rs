use anyhow::{Context, Result};
use liveprobe_monitoring::{
    join_endpoint, HttpMethod, HttpProbeConfig, PollConfig, ReadinessStrategy,
};
use liveprobe_process::LaunchSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

pub mod validation;

pub use duration_serde::parse_duration;

/// Top-level configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub pipeline: PipelineOptions,
    pub stages: Vec<StageConfig>,
}

/// Options that apply to every stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOptions {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Fail a stage when any of its probes gets no response.
    #[serde(default)]
    pub strict_probes: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            strict_probes: false,
        }
    }
}

/// One launch/wait/probe/teardown cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub launch: LaunchConfig,
    #[serde(default)]
    pub readiness: ReadinessConfig,
    pub probe: ProbeConfig,
    #[serde(default)]
    pub teardown: TeardownConfig,

    /// Overrides `pipeline.strict_probes` for this stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict_probes: Option<bool>,
}

/// What to launch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchConfig {
    pub executable: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
    #[serde(default)]
    pub environment: HashMap<String, String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "option_duration_serde"
    )]
    pub background_timeout: Option<Duration>,
}

/// Readiness strategy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ReadinessConfig {
    FixedDelay {
        #[serde(default = "default_readiness_delay", with = "duration_serde")]
        delay: Duration,
    },
    Poll {
        /// Endpoint to poll; defaults to the first probe endpoint.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        endpoint: Option<String>,
        #[serde(default = "default_initial_interval", with = "duration_serde")]
        initial_interval: Duration,
        #[serde(default = "default_backoff_rate")]
        backoff_rate: f64,
        #[serde(default = "default_max_interval", with = "duration_serde")]
        max_interval: Duration,
        #[serde(default = "default_poll_deadline", with = "duration_serde")]
        deadline: Duration,
    },
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self::FixedDelay {
            delay: default_readiness_delay(),
        }
    }
}

/// Which endpoints to probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub base_url: String,
    pub endpoints: Vec<String>,
    #[serde(default = "default_probe_timeout", with = "duration_serde")]
    pub timeout: Duration,
    /// `get` (default) or `head`.
    #[serde(default)]
    pub method: HttpMethod,
}

/// How to stop the launched process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeardownConfig {
    #[serde(default = "default_grace", with = "duration_serde")]
    pub grace: Duration,
}

impl Default for TeardownConfig {
    fn default() -> Self {
        Self {
            grace: default_grace(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        Self::load_from_string(&content)
    }

    /// Load configuration from a YAML string
    pub fn load_from_string(content: &str) -> Result<Self> {
        let config: PipelineConfig =
            serde_yaml::from_str(content).context("Failed to parse YAML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Get enabled stages only
    pub fn enabled_stages(&self) -> Vec<&StageConfig> {
        self.stages.iter().filter(|s| s.enabled).collect()
    }
}

impl StageConfig {
    pub fn launch_spec(&self) -> LaunchSpec {
        LaunchSpec {
            executable: self.launch.executable.clone(),
            args: self.launch.args.clone(),
            working_directory: self.launch.working_directory.as_ref().map(Into::into),
            environment: self.launch.environment.clone(),
            background_timeout: self.launch.background_timeout,
        }
    }

    /// Absolute probe URLs, in configured order.
    pub fn probe_urls(&self) -> Vec<String> {
        self.probe
            .endpoints
            .iter()
            .map(|path| join_endpoint(&self.probe.base_url, path))
            .collect()
    }

    pub fn http_probe_config(&self) -> HttpProbeConfig {
        HttpProbeConfig::default()
            .with_timeout(self.probe.timeout)
            .with_method(self.probe.method)
    }

    pub fn readiness_strategy(&self) -> ReadinessStrategy {
        match &self.readiness {
            ReadinessConfig::FixedDelay { delay } => ReadinessStrategy::FixedDelay { delay: *delay },
            ReadinessConfig::Poll {
                endpoint,
                initial_interval,
                backoff_rate,
                max_interval,
                deadline,
            } => {
                let target = match endpoint {
                    Some(path) => join_endpoint(&self.probe.base_url, path),
                    None => self
                        .probe_urls()
                        .into_iter()
                        .next()
                        .unwrap_or_else(|| self.probe.base_url.clone()),
                };
                ReadinessStrategy::Poll(
                    PollConfig::new(target)
                        .with_backoff(*initial_interval, *backoff_rate, *max_interval)
                        .with_deadline(*deadline),
                )
            }
        }
    }

    /// Effective strictness given the pipeline-wide default.
    pub fn is_strict(&self, pipeline_default: bool) -> bool {
        self.strict_probes.unwrap_or(pipeline_default)
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_enabled() -> bool {
    true
}

fn default_readiness_delay() -> Duration {
    Duration::from_secs(3)
}

fn default_initial_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_backoff_rate() -> f64 {
    2.0
}

fn default_max_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_poll_deadline() -> Duration {
    Duration::from_secs(30)
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_grace() -> Duration {
    Duration::from_secs(5)
}

// Custom serialization for Duration
pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_duration(duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub fn format_duration(duration: &Duration) -> String {
        if duration.subsec_millis() == 0 {
            format!("{}s", duration.as_secs())
        } else {
            format!("{}ms", duration.as_millis())
        }
    }

    pub fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        // Check for "ms" BEFORE "s" since "ms" ends with 's'
        if let Some(num_str) = s.strip_suffix("ms") {
            let millis: u64 = num_str.parse().map_err(|_| format!("Invalid duration: {}", s))?;
            Ok(Duration::from_millis(millis))
        } else if let Some(num_str) = s.strip_suffix('s') {
            let secs: u64 = num_str.parse().map_err(|_| format!("Invalid duration: {}", s))?;
            Ok(Duration::from_secs(secs))
        } else if let Some(num_str) = s.strip_suffix('m') {
            let mins: u64 = num_str.parse().map_err(|_| format!("Invalid duration: {}", s))?;
            let secs = mins
                .checked_mul(60)
                .ok_or_else(|| format!("Duration too large: {}", s))?;
            Ok(Duration::from_secs(secs))
        } else {
            Err(format!("Duration must end with 's', 'ms', or 'm': {}", s))
        }
    }
}

// Custom serialization for Option<Duration>
mod option_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_str(&super::duration_serde::format_duration(d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt: Option<String> = Option::deserialize(deserializer)?;
        match opt {
            Some(s) => super::duration_serde::parse_duration(&s)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
