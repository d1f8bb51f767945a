//! Outbound webhook delivery with timeout, retry, and backoff.
//!
//! Every outcome in this module is a [`NotificationResult`] value; the
//! dispatcher never raises an error past its boundary. A broken chat
//! integration must never break the system being monitored.

use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::DeliveryConfig;
use crate::models::{NotificationResult, Platform};

/// Ceiling on the exponential backoff between attempts.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Classified outcome of a single HTTP attempt.
enum AttemptOutcome {
    Delivered,
    /// 5xx, timeout, or network failure; eligible for retry.
    Transient(String),
    /// 4xx; retrying cannot help.
    Permanent(String),
}

/// HTTP delivery engine shared by all outbound sends.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    http: reqwest::Client,
    retry_attempts: u32,
    retry_delay: Duration,
    timeout: Duration,
}

impl Dispatcher {
    /// Build a dispatcher from the global delivery configuration.
    #[must_use]
    pub fn new(config: &DeliveryConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            retry_attempts: config.retry_attempts,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    /// Deliver a formatted message body to a webhook endpoint.
    ///
    /// Makes at most `retry_attempts + 1` HTTP calls. Each attempt is
    /// bounded by the configured timeout; transient failures (5xx,
    /// timeout, connection errors) back off exponentially, permanent
    /// failures (4xx) short-circuit immediately.
    pub async fn deliver(
        &self,
        platform: Platform,
        channel: &str,
        endpoint: &str,
        body: &Value,
    ) -> NotificationResult {
        let mut backoff = self.retry_delay;
        let mut last_error = String::from("no attempts made");

        for attempt in 0..=self.retry_attempts {
            let started = Instant::now();
            let outcome = self.attempt(endpoint, body).await;
            let duration_ms =
                u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

            match outcome {
                AttemptOutcome::Delivered => {
                    info!(%platform, channel, attempt, duration_ms, "delivered");
                    return NotificationResult::delivered(platform, channel);
                }
                AttemptOutcome::Permanent(err) => {
                    warn!(%platform, channel, attempt, duration_ms, error = %err, "permanent delivery failure");
                    return NotificationResult::failed(platform, channel, err);
                }
                AttemptOutcome::Transient(err) => {
                    debug!(%platform, channel, attempt, duration_ms, error = %err, "transient delivery failure");
                    last_error = err;
                }
            }

            if attempt < self.retry_attempts {
                sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_RETRY_DELAY);
            }
        }

        warn!(%platform, channel, error = %last_error, "delivery failed after retries");
        NotificationResult::failed(platform, channel, last_error)
    }

    async fn attempt(&self, endpoint: &str, body: &Value) -> AttemptOutcome {
        let response = self
            .http
            .post(endpoint)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await;

        match response {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    AttemptOutcome::Delivered
                } else if status.is_client_error() {
                    AttemptOutcome::Permanent(format!("http {status}"))
                } else {
                    AttemptOutcome::Transient(format!("http {status}"))
                }
            }
            Err(err) if err.is_timeout() => {
                AttemptOutcome::Transient(format!("timeout after {:?}", self.timeout))
            }
            Err(err) => AttemptOutcome::Transient(format!("network error: {err}")),
        }
    }
}
