//! 退避计算：带抖动的指数退避，支持服务端给出的延迟提示。
//!
//! Exponential backoff with jitter.
//!
//! The calculator is a pure function of the attempt index, the adapter's
//! [`RetryConfig`] and an optional server-supplied delay hint. The random
//! component is drawn once per call; [`backoff_delay_with_sample`] exposes
//! the same computation with an explicit sample for deterministic callers.

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry configuration, supplied once per platform adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per logical call (not "retries after the first").
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Fraction of the exponential delay added as random jitter, in `[0, 1]`.
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            jitter_factor: 0.3,
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, base_delay_ms: u64, max_delay_ms: u64, jitter_factor: f64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms,
            jitter_factor,
        }
    }

    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn with_base_delay_ms(mut self, ms: u64) -> Self {
        self.base_delay_ms = ms;
        self
    }

    pub fn with_max_delay_ms(mut self, ms: u64) -> Self {
        self.max_delay_ms = ms;
        self
    }

    pub fn with_jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = factor;
        self
    }

    /// Upper bound for any single sleep.
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Check `0 < base_delay_ms <= max_delay_ms`, `0 <= jitter_factor <= 1`
    /// and `max_retries >= 1`.
    pub fn validate(&self) -> Result<()> {
        let ctx = || ErrorContext::new().with_source("retry_config");
        if self.max_retries == 0 {
            return Err(Error::configuration_with_context(
                "max_retries must be at least 1",
                ctx().with_field_path("retry.max_retries"),
            ));
        }
        if self.base_delay_ms == 0 {
            return Err(Error::configuration_with_context(
                "base_delay_ms must be greater than zero",
                ctx().with_field_path("retry.base_delay_ms"),
            ));
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err(Error::configuration_with_context(
                format!(
                    "base_delay_ms ({}) exceeds max_delay_ms ({})",
                    self.base_delay_ms, self.max_delay_ms
                ),
                ctx().with_field_path("retry.max_delay_ms"),
            ));
        }
        if !self.jitter_factor.is_finite() || !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(Error::configuration_with_context(
                format!("jitter_factor must be within [0, 1], got {}", self.jitter_factor),
                ctx().with_field_path("retry.jitter_factor"),
            ));
        }
        Ok(())
    }
}

/// Delay before retry number `attempt` (0-based: `attempt = 0` is the first retry).
///
/// A positive `rate_limit_hint` wins and is clamped to `max_delay_ms`.
/// Otherwise: `min(base * 2^attempt + jitter, max_delay_ms)` with
/// `jitter = base * 2^attempt * jitter_factor * U(0, 1)`.
pub fn calculate_backoff_delay(
    attempt: u32,
    config: &RetryConfig,
    rate_limit_hint: Option<Duration>,
) -> Duration {
    backoff_delay_with_sample(attempt, config, rate_limit_hint, rand::random::<f64>())
}

/// Same as [`calculate_backoff_delay`] with the uniform sample supplied by the caller.
///
/// `sample` is clamped into `[0, 1]`.
pub fn backoff_delay_with_sample(
    attempt: u32,
    config: &RetryConfig,
    rate_limit_hint: Option<Duration>,
    sample: f64,
) -> Duration {
    let cap = config.max_delay();

    if let Some(hint) = rate_limit_hint.filter(|h| !h.is_zero()) {
        return hint.min(cap);
    }

    // 2^63 already overflows any sane cap; stop growing there.
    let factor = 2f64.powi(attempt.min(63) as i32);
    let exponential = config.base_delay_ms as f64 * factor;
    let sample = if sample.is_finite() { sample.clamp(0.0, 1.0) } else { 0.0 };
    let jitter = exponential * config.jitter_factor * sample;

    let millis = (exponential + jitter).min(config.max_delay_ms as f64);
    Duration::from_millis(millis as u64)
}
