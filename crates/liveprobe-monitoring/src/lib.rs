//! # liveprobe monitoring
//!
//! Liveness probing and readiness waiting for a launched service.
//!
//! This crate provides:
//! - HTTP liveness probes that classify an endpoint as responding or not
//! - A [`Prober`] seam so the stage runner can be driven by other probes
//! - Readiness waiting, either as a fixed grace delay or as a polling loop
//!   with exponential backoff
//!
//! Transport failures are never errors here. A probe that gets no answer
//! produces a [`ProbeResult`] with `responded = false`.

pub mod http;
pub mod readiness;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of one probe against one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub endpoint: String,
    /// True if anything answered, whatever the status code.
    pub responded: bool,
    pub status: Option<u16>,
    pub observed_at: DateTime<Utc>,
    pub response_time_ms: u64,
    pub error: Option<String>,
}

impl ProbeResult {
    pub fn responded(endpoint: impl Into<String>, status: u16, response_time_ms: u64) -> Self {
        Self {
            endpoint: endpoint.into(),
            responded: true,
            status: Some(status),
            observed_at: Utc::now(),
            response_time_ms,
            error: None,
        }
    }

    pub fn no_response(
        endpoint: impl Into<String>,
        error: impl Into<String>,
        response_time_ms: u64,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            responded: false,
            status: None,
            observed_at: Utc::now(),
            response_time_ms,
            error: Some(error.into()),
        }
    }
}

/// Something that can check whether an endpoint answers.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Issue exactly one probe. Never retries.
    async fn probe(&self, endpoint: &str) -> ProbeResult;

    /// Probe every endpoint once, in order. Always returns one result per
    /// endpoint; one endpoint's outcome has no influence on another's.
    async fn probe_all(&self, endpoints: &[String]) -> Vec<ProbeResult> {
        let mut results = Vec::with_capacity(endpoints.len());
        for endpoint in endpoints {
            results.push(self.probe(endpoint).await);
        }
        results
    }
}

// Re-export main types
pub use http::*;
pub use readiness::*;
