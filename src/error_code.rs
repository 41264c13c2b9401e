//! 错误类别：五种规范化错误类别及其重试语义。
//!
//! Normalized error categories.
//!
//! Every terminal failure the executor surfaces falls into exactly one of the
//! categories below, regardless of which advertising platform produced it.
//!
//! | Code  | Category          | Retried locally?                         |
//! |-------|-------------------|------------------------------------------|
//! | A1001 | network           | yes, exponential backoff                 |
//! | A2001 | authentication    | no, resolved by one credential refresh   |
//! | A3001 | rate_limited      | yes, server hint or doubled backoff      |
//! | A4001 | transient_server  | yes, exponential backoff                 |
//! | A5001 | client            | never                                    |
//!
//! ## Example
//!
//! ```rust
//! use ads_lib_rust::error_code::ErrorCategory;
//!
//! let category = ErrorCategory::from_http_status(503);
//! assert_eq!(category.code(), "A4001");
//! assert!(category.retryable());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// A1001: No response was received (connect, DNS, TLS, socket timeout)
    Network,
    /// A2001: Expired, invalid or revoked credential, or missing permission
    Authentication,
    /// A3001: Throttled by the platform
    RateLimited,
    /// A4001: 5xx or provider "transient/internal/unavailable" signal
    TransientServer,
    /// A5001: Anything else; surfaced verbatim
    Client,
}

impl ErrorCategory {
    /// Returns the stable code string (e.g. `"A3001"`).
    #[inline]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Network => "A1001",
            Self::Authentication => "A2001",
            Self::RateLimited => "A3001",
            Self::TransientServer => "A4001",
            Self::Client => "A5001",
        }
    }

    /// Returns the snake_case name (e.g. `"rate_limited"`).
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Authentication => "authentication",
            Self::RateLimited => "rate_limited",
            Self::TransientServer => "transient_server",
            Self::Client => "client",
        }
    }

    /// Whether a failure of this category is retried with time-based backoff.
    ///
    /// Authentication is deliberately `false`: it needs a new credential, not time.
    #[inline]
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Self::Network | Self::RateLimited | Self::TransientServer
        )
    }

    /// Maps a bare HTTP status to its default category.
    ///
    /// Platform parsers refine this with payload codes; this is only the
    /// status-level fallback.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Authentication,
            429 => Self::RateLimited,
            500..=599 => Self::TransientServer,
            _ => Self::Client,
        }
    }

    /// Parses a category from its code or name.
    pub fn parse(s: &str) -> Option<Self> {
        let category = match s {
            "A1001" | "network" => Self::Network,
            "A2001" | "authentication" => Self::Authentication,
            "A3001" | "rate_limited" => Self::RateLimited,
            "A4001" | "transient_server" => Self::TransientServer,
            "A5001" | "client" => Self::Client,
            _ => return None,
        };
        Some(category)
    }
}

/// Whether a raw HTTP status is in the generic retryable set (429 or 5xx).
#[inline]
pub fn is_generic_retryable_status(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
