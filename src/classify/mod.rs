//! 错误分类：将各广告平台迥异的错误约定归一为统一的分类错误。
//!
//! Classified errors.
//!
//! Each platform adapter turns a failed response into a [`ClassifiedError`]
//! carrying the same four normalized fields (`is_retryable`, `is_auth_error`,
//! `is_rate_limit_error`, `retry_after_ms`) plus platform metadata. Parsers
//! collect raw [`Signals`] and let [`Signals::category`] apply the fixed
//! priority: auth > rate limit > transient > client.

pub mod headers;

use crate::error_code::ErrorCategory;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

pub use headers::{header_first, retry_after_ms};

/// A normalized, machine-readable platform failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{platform} API error{}: {message}", format_status(.http_status, .provider_error_code))]
pub struct ClassifiedError {
    pub platform: String,
    pub message: String,
    pub is_retryable: bool,
    pub is_auth_error: bool,
    pub is_rate_limit_error: bool,
    /// Explicit delay requested by the platform (e.g. `Retry-After`), in ms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_error_code: Option<String>,
    /// Upstream request/trace id, for support tickets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

fn format_status(status: &Option<u16>, code: &Option<String>) -> String {
    match (status, code) {
        (Some(s), Some(c)) => format!(" (HTTP {}, code {})", s, c),
        (Some(s), None) => format!(" (HTTP {})", s),
        (None, Some(c)) => format!(" (code {})", c),
        (None, None) => String::new(),
    }
}

impl ClassifiedError {
    /// Build an error whose flags follow from `category`.
    ///
    /// Auth errors are never marked retryable: they need a new credential.
    pub fn new(platform: impl Into<String>, message: impl Into<String>, category: ErrorCategory) -> Self {
        Self {
            platform: platform.into(),
            message: message.into(),
            is_retryable: category.retryable(),
            is_auth_error: category == ErrorCategory::Authentication,
            is_rate_limit_error: category == ErrorCategory::RateLimited,
            retry_after_ms: None,
            http_status: None,
            provider_error_code: None,
            request_id: None,
        }
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_error_code = Some(code.into());
        self
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    pub fn with_retry_after_ms(mut self, ms: u64) -> Self {
        self.retry_after_ms = Some(ms);
        self
    }

    /// Set optional metadata in one go; `None` leaves the field untouched.
    pub fn with_metadata(
        mut self,
        status: Option<u16>,
        code: Option<String>,
        request_id: Option<String>,
        retry_after_ms: Option<u64>,
    ) -> Self {
        self.http_status = status.or(self.http_status);
        self.provider_error_code = code.or(self.provider_error_code);
        self.request_id = request_id.or(self.request_id);
        self.retry_after_ms = retry_after_ms.or(self.retry_after_ms);
        self
    }

    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after_ms.map(Duration::from_millis)
    }

    /// Category derived from the flags, using the classification priority.
    pub fn category(&self) -> ErrorCategory {
        if self.is_auth_error {
            ErrorCategory::Authentication
        } else if self.is_rate_limit_error {
            ErrorCategory::RateLimited
        } else if self.is_retryable {
            ErrorCategory::TransientServer
        } else {
            ErrorCategory::Client
        }
    }

    /// JSON form used in attempt records.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Raw conditions a parser observed before priority is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Signals {
    pub auth: bool,
    pub rate_limit: bool,
    pub transient: bool,
}

impl Signals {
    pub fn none() -> Self {
        Self::default()
    }

    /// Status-level signals: 401/403 auth, 429 rate limit, 5xx transient.
    pub fn from_status(status: u16) -> Self {
        Self {
            auth: status == 401 || status == 403,
            rate_limit: status == 429,
            transient: (500..=599).contains(&status),
        }
    }

    pub fn auth(mut self) -> Self {
        self.auth = true;
        self
    }

    pub fn rate_limit(mut self) -> Self {
        self.rate_limit = true;
        self
    }

    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    /// Union of two signal sets.
    pub fn merge(self, other: Signals) -> Self {
        Self {
            auth: self.auth || other.auth,
            rate_limit: self.rate_limit || other.rate_limit,
            transient: self.transient || other.transient,
        }
    }

    /// Apply the fixed priority: auth > rate limit > transient > client.
    pub fn category(&self) -> ErrorCategory {
        if self.auth {
            ErrorCategory::Authentication
        } else if self.rate_limit {
            ErrorCategory::RateLimited
        } else if self.transient {
            ErrorCategory::TransientServer
        } else {
            ErrorCategory::Client
        }
    }
}

/// Best-effort human message from a JSON error payload.
///
/// Tries the common shapes (`error.message`, `message`, `error_description`,
/// `error` as string) before falling back to the raw body.
pub fn extract_message(payload: &Value, raw_body: &str) -> String {
    let candidates = [
        payload.pointer("/error/message"),
        payload.pointer("/error/error_user_msg"),
        payload.get("message"),
        payload.get("error_description"),
        payload.get("error"),
    ];
    for v in candidates.into_iter().flatten() {
        if let Some(s) = v.as_str() {
            let s = s.trim();
            if !s.is_empty() {
                return s.to_string();
            }
        }
    }
    let trimmed = raw_body.trim();
    if trimmed.is_empty() {
        "empty error response".to_string()
    } else {
        trimmed.chars().take(512).collect()
    }
}

/// Read a JSON value as a code string, accepting numbers or strings.
pub(crate) fn code_string(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Read a JSON value as an integer code, accepting numbers or numeric strings.
pub(crate) fn code_i64(v: Option<&Value>) -> Option<i64> {
    match v? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
