//! Endpoint fallback and retry for Overpass queries.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::OverpassResponse;
use crate::config::{RetryConfig, ServiceConfig};
use crate::error::{EndpointFailure, FetchError};

/// Executes one query against one endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, endpoint: &str, query: &str)
        -> Result<OverpassResponse, EndpointFailure>;
}

/// `Transport` over HTTP GET with the query in the `data` parameter
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &ServiceConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(
        &self,
        endpoint: &str,
        query: &str,
    ) -> Result<OverpassResponse, EndpointFailure> {
        let url = Url::parse_with_params(endpoint, &[("data", query)]).map_err(|e| {
            EndpointFailure::Transport {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            }
        })?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| EndpointFailure::Transport {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(EndpointFailure::Status {
                endpoint: endpoint.to_string(),
                status: response.status().as_u16(),
            });
        }

        response
            .json::<OverpassResponse>()
            .await
            .map_err(|e| EndpointFailure::Decode {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            })
    }
}

/// Bounded retry with linear backoff: after failed pass `n` wait `n * base_delay`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay before the pass following failed pass `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
        )
    }
}

/// Runs queries against an ordered list of equivalent endpoints
pub struct EndpointFetcher<T> {
    transport: T,
    endpoints: Vec<String>,
}

impl<T: Transport> EndpointFetcher<T> {
    pub fn new(transport: T, endpoints: Vec<String>) -> Self {
        Self {
            transport,
            endpoints,
        }
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// One pass through the endpoint list. The first success wins and no
    /// later endpoint is contacted.
    pub async fn fetch(&self, query: &str) -> Result<OverpassResponse, FetchError> {
        let mut failures = Vec::with_capacity(self.endpoints.len());

        for endpoint in &self.endpoints {
            match self.transport.execute(endpoint, query).await {
                Ok(response) => {
                    debug!(
                        "{} returned {} elements",
                        endpoint,
                        response.elements.len()
                    );
                    return Ok(response);
                }
                Err(failure) => {
                    warn!("Overpass endpoint failed, trying next: {}", failure);
                    failures.push(failure);
                }
            }
        }

        Err(FetchError::ServiceUnavailable { failures })
    }

    /// Repeat [`fetch`](Self::fetch) up to `policy.max_attempts` times,
    /// sleeping between passes.
    pub async fn fetch_with_retry(
        &self,
        query: &str,
        policy: &RetryPolicy,
    ) -> Result<OverpassResponse, FetchError> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.fetch(query).await {
                Ok(response) => return Ok(response),
                Err(err) if attempt < policy.max_attempts => {
                    let delay = policy.delay_after(attempt);
                    warn!(
                        "Fetch failed (attempt {}/{}): {}; retrying in {:?}",
                        attempt, policy.max_attempts, err, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    info!("Giving up after {} attempts", attempt);
                    return Err(FetchError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_response, ScriptedTransport};

    const A: &str = "https://a.example/api/interpreter";
    const B: &str = "https://b.example/api/interpreter";
    const C: &str = "https://c.example/api/interpreter";

    fn endpoints() -> Vec<String> {
        vec![A.to_string(), B.to_string(), C.to_string()]
    }

    #[tokio::test]
    async fn test_fallback_stops_at_first_success() {
        let transport = ScriptedTransport::new();
        transport.fail_status(A, 504);
        transport.succeed(B, sample_response(2));
        transport.succeed(C, sample_response(5));

        let fetcher = EndpointFetcher::new(transport.clone(), endpoints());
        let response = fetcher.fetch("q").await.unwrap();

        assert_eq!(response, sample_response(2));
        assert_eq!(transport.calls_to(A), 1);
        assert_eq!(transport.calls_to(B), 1);
        assert_eq!(transport.calls_to(C), 0);
    }

    #[tokio::test]
    async fn test_all_endpoints_failing_is_service_unavailable() {
        let transport = ScriptedTransport::new();
        transport.fail_status(A, 500);
        transport.fail_transport(B, "connection reset");

        let fetcher = EndpointFetcher::new(transport.clone(), vec![A.to_string(), B.to_string()]);
        let err = fetcher.fetch("q").await.unwrap_err();

        match err {
            FetchError::ServiceUnavailable { failures } => {
                assert_eq!(failures.len(), 2);
                assert_eq!(failures[0].endpoint(), A);
                assert_eq!(failures[1].endpoint(), B);
            }
            other => panic!("expected ServiceUnavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_retry_stops_after_max_attempts() {
        let transport = ScriptedTransport::new();
        transport.fail_status(A, 429);
        transport.fail_status(B, 429);

        let fetcher = EndpointFetcher::new(transport.clone(), vec![A.to_string(), B.to_string()]);
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let err = fetcher.fetch_with_retry("q", &policy).await.unwrap_err();

        assert_eq!(err.attempts(), 3);
        assert_eq!(transport.calls_to(A), 3);
        assert_eq!(transport.calls_to(B), 3);
    }

    #[tokio::test]
    async fn test_retry_recovers_on_later_attempt() {
        let transport = ScriptedTransport::new();
        transport.fail_status_once(A, 503);
        transport.succeed(A, sample_response(1));

        let fetcher = EndpointFetcher::new(transport.clone(), vec![A.to_string()]);
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let response = fetcher.fetch_with_retry("q", &policy).await.unwrap();

        assert_eq!(response, sample_response(1));
        assert_eq!(transport.calls_to(A), 2);
    }

    #[test]
    fn test_backoff_is_linear() {
        let policy = RetryPolicy::new(3, Duration::from_millis(2000));
        assert_eq!(policy.delay_after(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_after(2), Duration::from_millis(4000));
    }

    #[test]
    fn test_zero_attempts_is_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }
}
