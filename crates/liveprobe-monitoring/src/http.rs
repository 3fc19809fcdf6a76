// HTTP liveness probe implementation

use crate::{ProbeResult, Prober};
use async_trait::async_trait;
use http_body_util::Empty;
use hyper::body::Bytes;
use hyper::{Method, Request, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// HTTP probe configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpProbeConfig {
    pub timeout: Duration,
    pub method: HttpMethod,
    pub user_agent: String,
}

/// HTTP methods supported for probes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    #[default]
    Get,
    Head,
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Self::Get),
            "head" => Ok(Self::Head),
            other => Err(format!("Unsupported probe method: {} (expected get or head)", other)),
        }
    }
}

impl Default for HttpProbeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            method: HttpMethod::Get,
            user_agent: format!("liveprobe/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpProbeConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }
}

/// Build a probe URL from a base address and a path.
///
/// Paths that are already absolute URLs are returned unchanged.
pub fn join_endpoint(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base_url.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Probes endpoints over plain HTTP/1.
///
/// Connections are never pooled, so every probe is an independent attempt.
pub struct HttpProber {
    config: HttpProbeConfig,
    client: Client<HttpConnector, Empty<Bytes>>,
}

impl HttpProber {
    pub fn new(config: HttpProbeConfig) -> Self {
        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .build_http();
        Self { config, client }
    }

    pub fn config(&self) -> &HttpProbeConfig {
        &self.config
    }
}

impl Default for HttpProber {
    fn default() -> Self {
        Self::new(HttpProbeConfig::default())
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, endpoint: &str) -> ProbeResult {
        let start_time = Instant::now();

        debug!("Starting HTTP probe: {}", endpoint);

        let uri: Uri = match endpoint.parse() {
            Ok(uri) => uri,
            Err(e) => {
                warn!("Probe failed: {} - invalid URI: {}", endpoint, e);
                return ProbeResult::no_response(endpoint, format!("Invalid URI: {}", e), 0);
            }
        };

        let method = match self.config.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Head => Method::HEAD,
        };

        let request = match Request::builder()
            .method(method)
            .uri(uri)
            .header("User-Agent", self.config.user_agent.as_str())
            .body(Empty::<Bytes>::new())
        {
            Ok(request) => request,
            Err(e) => {
                warn!("Probe failed: {} - cannot build request: {}", endpoint, e);
                return ProbeResult::no_response(
                    endpoint,
                    format!("Failed to build request: {}", e),
                    0,
                );
            }
        };

        let response = match timeout(self.config.timeout, self.client.request(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                let elapsed = start_time.elapsed().as_millis() as u64;
                warn!("Probe failed: {} - connection failed: {}", endpoint, e);
                return ProbeResult::no_response(
                    endpoint,
                    format!("Connection failed: {}", e),
                    elapsed,
                );
            }
            Err(_) => {
                warn!(
                    "Probe failed: {} - no response within {:?}",
                    endpoint, self.config.timeout
                );
                return ProbeResult::no_response(
                    endpoint,
                    "Timeout",
                    self.config.timeout.as_millis() as u64,
                );
            }
        };

        let status = response.status();
        let elapsed = start_time.elapsed().as_millis() as u64;

        info!(
            "Probe responded: {} - status={} time={}ms",
            endpoint, status, elapsed
        );

        ProbeResult::responded(endpoint, status.as_u16(), elapsed)
    }
}

/// Probe a single endpoint with the given configuration.
pub async fn probe_endpoint(endpoint: &str, config: &HttpProbeConfig) -> ProbeResult {
    HttpProber::new(config.clone()).probe(endpoint).await
}
