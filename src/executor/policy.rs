use crate::backoff::{calculate_backoff_delay, RetryConfig};
use crate::classify::ClassifiedError;
use crate::error_code::is_generic_retryable_status;
use std::time::Duration;

/// Decision for how to proceed after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Sleep `delay`, then retry (consumes an attempt).
    Retry { delay: Duration },
    /// Rate limited; notify the hook with `delay`, then retry if `retry` is set.
    RateLimited { delay: Duration, retry: bool },
    /// Ask the caller for a new credential (does not consume an attempt).
    RefreshAuth,
    Fail,
}

/// Per-call policy over one adapter's retry configuration.
///
/// `attempt` is 0-based for the current credential; an attempt "remains"
/// while `attempt + 1 < max_attempts`.
#[derive(Debug, Clone)]
pub struct PolicyEngine<'a> {
    retry: &'a RetryConfig,
    max_attempts: u32,
}

impl<'a> PolicyEngine<'a> {
    pub fn new(retry: &'a RetryConfig, max_attempts: u32) -> Self {
        Self {
            retry,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn has_attempts_left(&self, attempt: u32) -> bool {
        attempt.saturating_add(1) < self.max_attempts
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        calculate_backoff_delay(attempt, self.retry, None)
    }

    /// Explicit server delay when present (clamped), else twice the computed
    /// backoff. The doubled delay may exceed `max_delay_ms`.
    pub fn rate_limit_delay(&self, attempt: u32, err: &ClassifiedError) -> Duration {
        match err.retry_after().filter(|d| !d.is_zero()) {
            Some(hint) => calculate_backoff_delay(attempt, self.retry, Some(hint)),
            None => self.backoff(attempt).saturating_mul(2),
        }
    }

    /// No response at all: back off and retry while attempts remain.
    pub fn on_network_failure(&self, attempt: u32) -> Decision {
        if self.has_attempts_left(attempt) {
            Decision::Retry {
                delay: self.backoff(attempt),
            }
        } else {
            Decision::Fail
        }
    }

    /// Decide after a classified failure. Priority: auth, rate limit, retryable, fail.
    pub fn decide(&self, err: &ClassifiedError, status: u16, attempt: u32, has_refresher: bool) -> Decision {
        if err.is_auth_error {
            return if has_refresher {
                Decision::RefreshAuth
            } else {
                Decision::Fail
            };
        }

        if err.is_rate_limit_error {
            return Decision::RateLimited {
                delay: self.rate_limit_delay(attempt, err),
                retry: self.has_attempts_left(attempt),
            };
        }

        if (err.is_retryable || is_generic_retryable_status(status)) && self.has_attempts_left(attempt) {
            return Decision::Retry {
                delay: self.backoff(attempt),
            };
        }

        Decision::Fail
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_code::ErrorCategory;

    fn cfg() -> RetryConfig {
        RetryConfig::new(3, 1_000, 30_000, 0.0)
    }

    #[test]
    fn auth_never_backs_off() {
        let c = cfg();
        let p = PolicyEngine::new(&c, 3);
        let e = ClassifiedError::new("x", "expired", ErrorCategory::Authentication);
        assert_eq!(p.decide(&e, 401, 0, false), Decision::Fail);
        assert_eq!(p.decide(&e, 401, 0, true), Decision::RefreshAuth);
    }

    #[test]
    fn rate_limit_prefers_clamped_hint() {
        let c = cfg();
        let p = PolicyEngine::new(&c, 3);
        let e = ClassifiedError::new("x", "slow", ErrorCategory::RateLimited).with_retry_after_ms(45_000);
        assert_eq!(
            p.decide(&e, 429, 0, false),
            Decision::RateLimited {
                delay: Duration::from_secs(30),
                retry: true
            }
        );
        assert_eq!(
            p.decide(&e, 429, 2, false),
            Decision::RateLimited {
                delay: Duration::from_secs(30),
                retry: false
            }
        );
    }

    #[test]
    fn rate_limit_without_hint_doubles_backoff() {
        let c = cfg();
        let p = PolicyEngine::new(&c, 5);
        let e = ClassifiedError::new("x", "slow", ErrorCategory::RateLimited);
        assert_eq!(p.rate_limit_delay(0, &e), Duration::from_secs(2));
        assert_eq!(p.rate_limit_delay(2, &e), Duration::from_secs(8));
        // doubling applies after the cap
        assert_eq!(p.rate_limit_delay(4, &e), Duration::from_secs(32));
        assert_eq!(p.rate_limit_delay(5, &e), Duration::from_secs(60));
    }

    #[test]
    fn generic_status_is_retried_even_if_parser_said_client() {
        let c = cfg();
        let p = PolicyEngine::new(&c, 3);
        let e = ClassifiedError::new("x", "odd", ErrorCategory::Client);
        assert_eq!(
            p.decide(&e, 502, 1, false),
            Decision::Retry {
                delay: Duration::from_secs(2)
            }
        );
        assert_eq!(p.decide(&e, 502, 2, false), Decision::Fail);
        assert_eq!(p.decide(&e, 400, 0, false), Decision::Fail);
    }

    #[test]
    fn network_failures_consume_attempts() {
        let c = cfg();
        let p = PolicyEngine::new(&c, 2);
        assert_eq!(
            p.on_network_failure(0),
            Decision::Retry {
                delay: Duration::from_secs(1)
            }
        );
        assert_eq!(p.on_network_failure(1), Decision::Fail);
    }

    #[test]
    fn zero_max_attempts_means_one() {
        let c = cfg();
        let p = PolicyEngine::new(&c, 0);
        assert_eq!(p.max_attempts(), 1);
        assert!(!p.has_attempts_left(0));
    }
}
