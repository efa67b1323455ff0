//! Retry stage with linear backoff.
//!
//! Retries transient failures:
//! - Network errors (refused, reset, DNS)
//! - Timeouts
//! - 5xx server errors
//!
//! It does NOT retry:
//! - 4xx client errors (401 is handled by the refresh stage underneath)
//! - Requests marked `skip_retry`
//! - POST/PUT/DELETE, unless marked idempotent or `retry_mutations` is on

use std::time::Duration;

use async_trait::async_trait;
use cis_core::config::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_MS};
use reqwest::StatusCode;

use crate::error::ApiError;
use crate::request::{ApiRequest, ApiResponse};
use crate::transport::Transport;


/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: u32,
    /// Delay before the first retry; retry `n` waits `n` times this
    pub base_delay: Duration,
    /// Retry state-changing verbs too
    pub retry_mutations: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            retry_mutations: false,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(base_delay_ms),
            retry_mutations: false,
        }
    }

    /// Delay before retry number `attempt` (1-based): `base_delay * attempt`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Whether this request may be sent more than once.
    pub fn applies_to(&self, request: &ApiRequest) -> bool {
        if request.options.skip_retry {
            return false;
        }
        self.retry_mutations || request.is_idempotent()
    }
}

/// Error classification for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    NoRetry,
}

/// Check if a status code is retryable
pub fn is_retryable_status(status: StatusCode) -> RetryDecision {
    if status.is_server_error() {
        tracing::debug!("Server error ({}), will retry", status);
        return RetryDecision::Retry;
    }

    // Everything else, including 401/408/429, is final at this layer.
    RetryDecision::NoRetry
}

/// Check if an error is retryable
pub fn is_retryable_error(error: &ApiError) -> RetryDecision {
    if error.is_transient() {
        tracing::debug!("Transient error, will retry: {}", error);
        return RetryDecision::Retry;
    }
    RetryDecision::NoRetry
}

/// Wraps an inner stage and re-sends transient failures.
pub struct RetryStage<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T: Transport> RetryStage<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<T: Transport> Transport for RetryStage<T> {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        if !self.policy.applies_to(request) {
            tracing::debug!(
                method = %request.method,
                path = %request.path,
                "Single attempt (retry not applicable)"
            );
            return self.inner.send(request).await;
        }

        let max_retries = self.policy.max_retries;
        let mut attempt = 0;

        loop {
            let outcome = self.inner.send(request).await;
            let decision = match &outcome {
                Ok(response) => is_retryable_status(response.status),
                Err(e) => is_retryable_error(e),
            };

            if decision == RetryDecision::NoRetry {
                if attempt > 0 && outcome.is_ok() {
                    tracing::info!("{} {} settled after {} retries", request.method, request.path, attempt);
                }
                return outcome;
            }

            if attempt >= max_retries {
                tracing::error!(
                    "All {} attempts exhausted for {} {}",
                    attempt + 1,
                    request.method,
                    request.path
                );
                return outcome;
            }

            attempt += 1;
            let delay = self.policy.delay_for_attempt(attempt);
            tracing::warn!(
                "Retry attempt {} of {} for {} {}, waiting {:?}",
                attempt,
                max_retries,
                request.method,
                request.path,
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }
}
