//! Readiness waiting.
//!
//! Two strategies:
//! - [`ReadinessStrategy::FixedDelay`]: sleep for a fixed grace period. This
//!   cannot observe readiness and always waits the full delay.
//! - [`ReadinessStrategy::Poll`]: probe an endpoint until it responds, backing
//!   off exponentially between attempts, and give up at a deadline.

use crate::Prober;
use serde::Serialize;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info};

/// Backoff polling configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    pub endpoint: String,
    pub initial_interval: Duration,
    pub backoff_rate: f64,
    pub max_interval: Duration,
    pub deadline: Duration,
}

impl PollConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            initial_interval: Duration::from_millis(100),
            backoff_rate: 2.0,
            max_interval: Duration::from_secs(2),
            deadline: Duration::from_secs(30),
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_backoff(mut self, initial: Duration, rate: f64, max: Duration) -> Self {
        self.initial_interval = initial;
        self.backoff_rate = rate;
        self.max_interval = max;
        self
    }
}

/// How to decide that a launched process is ready for probing.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadinessStrategy {
    FixedDelay { delay: Duration },
    Poll(PollConfig),
}

impl Default for ReadinessStrategy {
    fn default() -> Self {
        Self::FixedDelay {
            delay: Duration::from_secs(3),
        }
    }
}

/// What the readiness step observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "readiness", rename_all = "snake_case")]
pub enum ReadinessOutcome {
    /// A fixed delay elapsed. Readiness was assumed, not observed.
    Waited { elapsed_ms: u64 },
    /// The poll endpoint responded.
    Ready { attempts: u32, elapsed_ms: u64 },
    /// The deadline passed without a response.
    TimedOut { attempts: u32, elapsed_ms: u64 },
}

impl ReadinessOutcome {
    pub fn timed_out(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

/// Intervals between poll attempts: `initial`, then multiplied by `rate`,
/// capped at `max`. Growth that would overflow a `Duration` settles at `max`.
pub fn backoff_schedule(
    initial: Duration,
    rate: f64,
    max: Duration,
) -> impl Iterator<Item = Duration> {
    let rate = if rate.is_finite() && rate >= 1.0 { rate } else { 1.0 };
    std::iter::successors(Some(initial.min(max)), move |previous| {
        let next = Duration::try_from_secs_f64(previous.as_secs_f64() * rate).unwrap_or(max);
        Some(next.min(max))
    })
}

/// Wait according to `strategy`. Never fails; a poll that runs out of time
/// returns [`ReadinessOutcome::TimedOut`].
pub async fn wait_until_ready(strategy: &ReadinessStrategy, prober: &dyn Prober) -> ReadinessOutcome {
    match strategy {
        ReadinessStrategy::FixedDelay { delay } => {
            info!("Waiting {:?} for process to initialize", delay);
            let start = Instant::now();
            sleep(*delay).await;
            ReadinessOutcome::Waited {
                elapsed_ms: start.elapsed().as_millis() as u64,
            }
        }
        ReadinessStrategy::Poll(config) => poll_until_ready(config, prober).await,
    }
}

async fn poll_until_ready(config: &PollConfig, prober: &dyn Prober) -> ReadinessOutcome {
    info!(
        "Polling {} for readiness (deadline {:?})",
        config.endpoint, config.deadline
    );

    let start = Instant::now();
    // None when the deadline lies beyond what an Instant can represent.
    let give_up_at = start.checked_add(config.deadline);
    let mut attempts = 0u32;

    let mut schedule = backoff_schedule(
        config.initial_interval,
        config.backoff_rate,
        config.max_interval,
    );

    loop {
        attempts += 1;
        let result = prober.probe(&config.endpoint).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        if result.responded {
            info!(
                "Service ready: {} after {} attempt(s) in {}ms",
                config.endpoint, attempts, elapsed_ms
            );
            return ReadinessOutcome::Ready {
                attempts,
                elapsed_ms,
            };
        }

        let now = Instant::now();
        if give_up_at.is_some_and(|t| now >= t) {
            error!(
                "Service not ready: {} did not respond within {:?} ({} attempts)",
                config.endpoint, config.deadline, attempts
            );
            return ReadinessOutcome::TimedOut {
                attempts,
                elapsed_ms,
            };
        }

        let interval = schedule.next().unwrap_or(config.max_interval);
        let pause = match give_up_at {
            Some(t) => interval.min(t - now),
            None => interval,
        };
        debug!(
            "Readiness attempt {} failed for {}, retrying in {:?}",
            attempts, config.endpoint, pause
        );
        sleep(pause).await;
    }
}
