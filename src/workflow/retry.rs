use std::time::Duration;

use crate::api::error::{ApiError, ApiErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    Abort,
}

/// Bounded retry keyed off the scheduler cadence.
///
/// Business rejections listed in `retry_codes` retry at the supplied
/// cadence; transport-level failures back off exponentially from that
/// cadence up to `backoff_max`. Everything else aborts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_max: Duration,
    retry_codes: Vec<i64>,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_max: Duration, retry_codes: Vec<i64>) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_max,
            retry_codes,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_retryable_code(&self, code: i64) -> bool {
        self.retry_codes.contains(&code)
    }

    /// `attempt` is zero-based: the number of attempts already failed
    /// before this one.
    pub fn decide(&self, err: &ApiError, attempt: u32, cadence: Duration) -> RetryDecision {
        if attempt.saturating_add(1) >= self.max_attempts {
            return RetryDecision::Abort;
        }

        match err.kind {
            ApiErrorKind::Business => match err.code {
                Some(code) if self.is_retryable_code(code) => RetryDecision::RetryAfter(cadence),
                _ => RetryDecision::Abort,
            },
            _ if err.retryable => RetryDecision::RetryAfter(self.backoff_delay(attempt, cadence)),
            _ => RetryDecision::Abort,
        }
    }

    pub fn backoff_delay(&self, attempt: u32, base: Duration) -> Duration {
        let base_ms = base.as_millis().max(1) as f64;
        let max_ms = self.backoff_max.as_millis().max(1) as f64;
        let exp = attempt.min(16) as i32;
        let without_jitter = (base_ms * 2f64.powi(exp)).min(max_ms);
        let jitter_factor = 0.9 + (attempt as f64 % 3.0) * 0.05;
        Duration::from_millis((without_jitter * jitter_factor) as u64)
    }
}
