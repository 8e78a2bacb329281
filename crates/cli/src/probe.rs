//! Upstream model-provider reachability check.

use std::time::Duration;

use {
    async_trait::async_trait,
    clawboot_common::{Error, Result},
    tracing::{debug, warn},
};

/// Upper bound on the whole probe request.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reachability {
    /// The endpoint answered with the given HTTP status.
    Reachable { status: u16 },
    /// Transport failure or timeout.
    Unreachable { reason: String },
}

impl Reachability {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Reachable { .. })
    }

    /// The response status, or an error describing why `url` was unreachable.
    pub fn into_result(self, url: &str) -> Result<u16> {
        match self {
            Self::Reachable { status } => Ok(status),
            Self::Unreachable { reason } => {
                Err(Error::message(format!("{url} unreachable: {reason}")))
            },
        }
    }
}

#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    async fn check(&self, url: &str) -> Reachability;
}

/// GET probe over `reqwest`. Any HTTP response, including 4xx/5xx, means
/// the host is reachable.
pub struct HttpProbe {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new() -> Self {
        Self::with_timeout(PROBE_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let client = match reqwest::Client::builder().timeout(timeout).build() {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "failed to build probe client, using defaults");
                reqwest::Client::new()
            },
        };
        Self { client, timeout }
    }
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReadinessProbe for HttpProbe {
    async fn check(&self, url: &str) -> Reachability {
        debug!(url, "probing upstream");
        let timed_out = || Reachability::Unreachable {
            reason: format!("timed out after {:?}", self.timeout),
        };
        // The client carries the same bound; this one also holds if it was
        // built without it.
        match tokio::time::timeout(self.timeout, self.client.get(url).send()).await {
            Err(_) => timed_out(),
            Ok(Ok(resp)) => Reachability::Reachable {
                status: resp.status().as_u16(),
            },
            Ok(Err(e)) if e.is_timeout() => timed_out(),
            Ok(Err(e)) => Reachability::Unreachable {
                reason: e.to_string(),
            },
        }
    }
}
