use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};

use liveprobe_harness::{parse_duration, Pipeline, PipelineConfig, RunOptions};
use liveprobe_monitoring::{HttpMethod, HttpProbeConfig, HttpProber, Prober};

/// Launch a service, check that it answers, and stop it again
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the stages of a pipeline configuration
    Run {
        /// Configuration file path (YAML)
        #[arg(short, long, value_name = "FILE")]
        config: String,

        /// Run only this stage (repeatable)
        #[arg(short, long = "stage", value_name = "NAME")]
        stages: Vec<String>,

        /// Fail stages whose probes get no response
        #[arg(long)]
        strict: bool,

        /// Print the report as JSON instead of summary lines
        #[arg(long)]
        json: bool,
    },

    /// Probe URLs once each
    Probe {
        #[arg(required = true, value_name = "URL")]
        urls: Vec<String>,

        /// Per-probe timeout, e.g. 500ms or 5s
        #[arg(long, default_value = "5s", value_parser = parse_duration)]
        timeout: Duration,

        /// Request method: get or head
        #[arg(long, default_value = "get")]
        method: HttpMethod,

        /// Exit non-zero when any URL does not respond
        #[arg(long)]
        strict: bool,
    },

    /// Load and validate a pipeline configuration
    Validate {
        /// Configuration file path (YAML)
        #[arg(short, long, value_name = "FILE")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // The pipeline file may set the log level, so load it before logging starts.
    let loaded = args.command.config_path().map(PipelineConfig::load_from_file);
    let config_level = match &loaded {
        Some(Ok(config)) => Some(config.pipeline.log_level.as_str()),
        _ => None,
    };

    if let Err(e) = initialize_logging(log_level(args.debug, config_level)) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    let config = match loaded.transpose() {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match execute(args.command, config).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

impl Command {
    fn config_path(&self) -> Option<&str> {
        match self {
            Command::Run { config, .. } | Command::Validate { config } => Some(config),
            Command::Probe { .. } => None,
        }
    }
}

async fn execute(command: Command, config: Option<PipelineConfig>) -> Result<ExitCode> {
    match (command, config) {
        (
            Command::Run {
                config: path,
                stages,
                strict,
                json,
            },
            Some(config),
        ) => {
            info!("Config file: {}", path);
            run(config, stages, strict, json).await
        }
        (
            Command::Probe {
                urls,
                timeout,
                method,
                strict,
            },
            _,
        ) => probe(&urls, timeout, method, strict).await,
        (Command::Validate { .. }, Some(config)) => {
            println!("Configuration OK: {} stage(s)", config.stages.len());
            Ok(ExitCode::SUCCESS)
        }
        (_, None) => Err(anyhow!("No configuration loaded")),
    }
}

async fn run(
    config: PipelineConfig,
    stages: Vec<String>,
    strict: bool,
    json: bool,
) -> Result<ExitCode> {
    let pipeline = Pipeline::new(config);
    let options = RunOptions {
        stages,
        strict: strict.then_some(true),
    };

    let report = tokio::select! {
        report = pipeline.run(&options) => report?,
        _ = shutdown_signal() => {
            // Dropping the in-flight stage kills its process.
            return Err(anyhow!("Interrupted, pipeline aborted"));
        }
    };

    if json {
        println!("{}", report.to_json()?);
    } else {
        for line in report.summary_lines() {
            println!("{}", line);
        }
    }

    Ok(exit_code(report.exit_code()))
}

async fn probe(
    urls: &[String],
    timeout: Duration,
    method: HttpMethod,
    strict: bool,
) -> Result<ExitCode> {
    let config = HttpProbeConfig::default()
        .with_timeout(timeout)
        .with_method(method);
    let prober = HttpProber::new(config);
    let results = prober.probe_all(urls).await;

    for result in &results {
        match (result.responded, result.status) {
            (true, Some(status)) => println!("✓ {} responded (status {})", result.endpoint, status),
            (true, None) => println!("✓ {} responded", result.endpoint),
            (false, _) => println!(
                "✗ {} did not respond: {}",
                result.endpoint,
                result.error.as_deref().unwrap_or("no response")
            ),
        }
    }

    let all_responded = results.iter().all(|r| r.responded);
    Ok(if strict && !all_responded {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn exit_code(code: i32) -> ExitCode {
    u8::try_from(code).map(ExitCode::from).unwrap_or(ExitCode::FAILURE)
}

/// `--debug` wins over the pipeline's `log_level`. `RUST_LOG`, when set,
/// overrides both inside [`initialize_logging`].
fn log_level(debug: bool, config_level: Option<&str>) -> String {
    if debug {
        return "debug".to_string();
    }
    config_level.unwrap_or("info").to_lowercase()
}

fn initialize_logging(level: String) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("{}", e))
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                _ => {
                    error!("Failed to install signal handlers");
                    return std::future::pending().await;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM signal");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT signal");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received Ctrl+C signal");
    }
}
