//! # ads-lib-rust
//!
//! 面向广告平台 API 的弹性请求执行器：重试、指数退避、限流延迟、凭证刷新与统一错误分类。
//!
//! Resilient request execution for advertising platform APIs.
//!
//! ## Overview
//!
//! Advertising APIs (Meta Marketing, Google Ads, TikTok Business, LinkedIn
//! Marketing) fail in wildly different ways: HTTP 200 with an embedded error
//! code, rate-limit codes that are not 429, credentials in a header or in the
//! query string. This crate normalizes all of that behind one executor:
//!
//! - **Classification**: each [`PlatformAdapter`] turns a failure into a
//!   [`ClassifiedError`] with `is_retryable`, `is_auth_error`,
//!   `is_rate_limit_error` and an optional `retry_after_ms`.
//! - **Backoff**: exponential with jitter, capped, honoring server hints
//!   ([`backoff::calculate_backoff_delay`]).
//! - **Auth refresh**: a caller-supplied [`AuthRefresher`] is asked for a new
//!   credential, which the adapter re-installs in the header or URL.
//! - **Deadline and cancellation** for the whole call, backoff included.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ads_lib_rust::platforms::TikTokAdapter;
//! use ads_lib_rust::{AdapterConfig, RequestExecutor};
//! use reqwest::Method;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> ads_lib_rust::Result<()> {
//!     let adapter = AdapterConfig::builder(Arc::new(TikTokAdapter::default())).build()?;
//!     let executor = RequestExecutor::from_env()?;
//!
//!     let request = adapter
//!         .request("list_campaigns", Method::GET, "campaign/get/")?
//!         .query("advertiser_id", "7000000000000000000");
//!     let request = adapter.authorize(request, "access-token");
//!
//!     let response = executor.execute_json(&adapter, request).await?;
//!     println!("{} attempts: {}", response.attempts, response.payload);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`executor`] | The retry loop, request descriptors, auth refresh and policy |
//! | [`adapter`] | Platform adapter contract and per-platform configuration |
//! | [`platforms`] | Meta, Google Ads, TikTok and LinkedIn adapters |
//! | [`classify`] | Classified errors and header helpers |
//! | [`backoff`] | Retry configuration and delay computation |
//! | [`transport`] | HTTP transport abstraction (reqwest) |
//! | [`telemetry`] | Per-attempt records and observers |
//! | [`pagination`] | Cursor-following helper over the executor |
//! | [`config`] | YAML settings, env overrides, credential lookup |

pub mod adapter;
pub mod backoff;
pub mod classify;
pub mod config;
pub mod error_code;
pub mod executor;
pub mod pagination;
pub mod platforms;
pub mod redact;
pub mod telemetry;
pub mod transport;

// Re-export main types for convenience
pub use adapter::{AdapterConfig, PageCursor, PlatformAdapter, SuccessPredicate};
pub use backoff::{calculate_backoff_delay, RetryConfig};
pub use classify::ClassifiedError;
pub use error_code::ErrorCategory;
pub use executor::{
    AuthRefresh, AuthRefresher, ExecutedResponse, RequestDescriptor, RequestExecutor,
};
pub use telemetry::{AttemptObserver, AttemptOutcome, AttemptRecord};
pub use tokio_util::sync::CancellationToken;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
