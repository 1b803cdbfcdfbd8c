use std::time;

use tracing::{error, warn};
use url::Url;

use crate::error::{ConfigError, DeliveryError};

pub const BASE_URL: &str = "https://api.nanigans.com";

const REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(10);

/// The two destination endpoints. Each requires a different account identity
/// parameter, which is why endpoint selection happens before parameters are
/// finalized (see the dispatcher).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    Server,
    Mobile,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Server => "/event.php",
            Endpoint::Mobile => "/mobile.php",
        }
    }
}

/// Terminal success metadata for one delivered request.
#[derive(Clone, Debug)]
pub struct DeliveryResponse {
    pub status: u16,
    pub body: String,
}

/// Backoff schedule for retryable delivery failures.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    max_retries: u32,
    /// Backoff before the first retry; doubles for every further attempt.
    initial_interval: time::Duration,
}

impl RetryPolicy {
    fn backoff(&self, attempt: u32) -> time::Duration {
        self.initial_interval * 2u32.pow(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_interval: time::Duration::from_millis(250),
        }
    }
}

/// Transport to the destination API: plain GETs with the parameters in the
/// query string, a bounded retry loop, and non-2xx classified as failure.
///
/// Retried requests resend identical query parameters, which the destination
/// treats as idempotent.
pub struct NanigansClient {
    client: reqwest::Client,
    retry_policy: RetryPolicy,
    server_url: Url,
    mobile_url: Url,
}

impl NanigansClient {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let base: Url = base_url.parse()?;

        let client = reqwest::Client::builder()
            .user_agent("Segment (Nanigans)")
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to construct reqwest client for nanigans");

        Ok(Self {
            client,
            retry_policy: RetryPolicy::default(),
            server_url: base.join(Endpoint::Server.path())?,
            mobile_url: base.join(Endpoint::Mobile.path())?,
        })
    }

    /// GET one endpoint with the given query pairs. Array parameters arrive
    /// here as repeated keys and serialize as `sku=1&sku=2`.
    ///
    /// Connection errors, timeouts, 429 and 5XX are retried on the client's
    /// backoff schedule; anything still failing after that surfaces as the
    /// final `DeliveryError`.
    pub async fn get(
        &self,
        endpoint: Endpoint,
        query: &[(String, String)],
    ) -> Result<DeliveryResponse, DeliveryError> {
        let url = match endpoint {
            Endpoint::Server => &self.server_url,
            Endpoint::Mobile => &self.mobile_url,
        };
        let labels = [("endpoint", endpoint.path())];

        let mut attempt = 0;
        loop {
            metrics::counter!("nanigans_requests_total", &labels).increment(1);
            let now = tokio::time::Instant::now();

            let result = self.send(url, query).await;

            metrics::histogram!("nanigans_request_duration_seconds", &labels)
                .record(now.elapsed().as_secs_f64());

            match result {
                Ok(response) => return Ok(response),
                Err(error) if is_retryable(&error) && attempt < self.retry_policy.max_retries => {
                    metrics::counter!("nanigans_requests_retried", &labels).increment(1);
                    warn!(
                        endpoint = endpoint.path(),
                        attempt, "retrying failed nanigans request: {}", error
                    );
                    tokio::time::sleep(self.retry_policy.backoff(attempt)).await;
                    attempt += 1;
                }
                Err(error) => {
                    metrics::counter!("nanigans_requests_failed", &labels).increment(1);
                    error!(
                        endpoint = endpoint.path(),
                        "failed to deliver nanigans request: {}", error
                    );
                    return Err(error);
                }
            }
        }
    }

    async fn send(
        &self,
        url: &Url,
        query: &[(String, String)],
    ) -> Result<DeliveryResponse, DeliveryError> {
        let response = self.client.get(url.clone()).query(query).send().await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(DeliveryError::FailureStatus { status, body });
        }

        Ok(DeliveryResponse {
            status: status.as_u16(),
            body,
        })
    }
}

/// Whether retrying at a later point could resolve the failure: connection
/// errors and timeouts, plus 429 and any 5XX.
fn is_retryable(error: &DeliveryError) -> bool {
    match error {
        DeliveryError::Request(_) => true,
        DeliveryError::FailureStatus { status, .. } => {
            *status == http::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
        }
    }
}
