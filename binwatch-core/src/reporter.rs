//! Telemetry reporter: one reading in, one POST out, one outcome back.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use reqwest::Url;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, error, info, warn};

use crate::model::BinStatus;
use crate::outcome::{DeliveryFailure, DeliveryOutcome};
use crate::ports::{RequestConfig, Transport, TransportError};
use crate::settings::{ConfigError, Settings};

const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Retry and status handling applied to every reading.
pub struct DeliveryPolicy {
    /// Attempts per reading, at least one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for every further retry.
    pub backoff: Duration,
    /// Treat non-2xx responses as failed deliveries.
    pub reject_http_errors: bool,
}

impl DeliveryPolicy {
    /// One attempt, status ignored.
    #[must_use]
    pub fn single_shot() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
            reject_http_errors: false,
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    #[must_use]
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff.saturating_mul(factor)
    }
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self::single_shot()
    }
}

/// Posts fill-level readings to the backend as [`BinStatus`] documents.
///
/// The reporter holds no mutable state. Every call builds its own document, buffer and
/// request handle, all dropped before the call returns, so it can be shared between
/// threads freely.
pub struct TelemetryReporter {
    transport: Arc<dyn Transport>,
    request: RequestConfig,
    policy: DeliveryPolicy,
}

impl TelemetryReporter {
    /// Create a reporter bound to a transport and request configuration.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        request: RequestConfig,
        policy: DeliveryPolicy,
    ) -> Self {
        Self {
            transport,
            request,
            policy,
        }
    }

    /// Create a reporter from loaded settings.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the settings do not validate.
    pub fn from_settings(
        transport: Arc<dyn Transport>,
        settings: &Settings,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        let policy = DeliveryPolicy {
            max_attempts: settings.delivery.max_attempts,
            backoff: settings.delivery.retry_backoff(),
            reject_http_errors: settings.delivery.reject_http_errors,
        };
        Ok(Self::new(transport, settings.request_config()?, policy))
    }

    /// Backend URL readings are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.request.url
    }

    /// Deliver one reading and log the result.
    ///
    /// Blocks until the transport finishes or gives up. Never panics on transport
    /// failure; the caller can continue with its next cycle whatever the outcome.
    pub fn report(&self, fill_level: f32) -> DeliveryOutcome {
        let outcome = self.deliver(fill_level);
        match &outcome {
            DeliveryOutcome::Delivered { status } => {
                info!(fill_level, status, url = %self.request.url, "delivery succeeded");
            }
            DeliveryOutcome::Failed(failure) => {
                error!(fill_level, code = %failure.code(), error = %failure, "delivery failed");
            }
        }
        outcome
    }

    fn deliver(&self, fill_level: f32) -> DeliveryOutcome {
        if !fill_level.is_finite() {
            return DeliveryOutcome::Failed(DeliveryFailure::InvalidReading(fill_level));
        }

        let body = match BinStatus::from_fill_level(fill_level).to_body() {
            Ok(body) => body,
            Err(err) => return DeliveryOutcome::Failed(err.into()),
        };

        let mut attempt = 1;
        loop {
            match self.attempt(&body) {
                Ok(status) => return self.judge(status),
                Err(err) if attempt < self.policy.max_attempts => {
                    let delay = self.policy.backoff_after(attempt);
                    warn!(
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "delivery attempt failed, retrying"
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => return DeliveryOutcome::Failed(err.into()),
            }
        }
    }

    // The handle lives only inside this function and is dropped on every exit path,
    // including unwinding out of the transport.
    fn attempt(&self, body: &[u8]) -> Result<u16, TransportError> {
        let mut handle = self.transport.open(&self.request)?;
        handle.set_header(CONTENT_TYPE.as_str(), JSON_CONTENT_TYPE)?;
        let response = handle.perform(body)?;
        debug!(status = response.status, bytes = body.len(), "transport completed");
        Ok(response.status)
    }

    fn judge(&self, status: u16) -> DeliveryOutcome {
        if (200..300).contains(&status) {
            return DeliveryOutcome::Delivered { status };
        }
        if self.policy.reject_http_errors {
            return DeliveryOutcome::Failed(DeliveryFailure::Rejected { status });
        }
        debug!(status, "ignoring non-success status from backend");
        DeliveryOutcome::Delivered { status }
    }
}
