use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::auth::AuthRefresher;

/// Called with the chosen delay whenever a rate-limit error is classified.
pub type RateLimitHook = Arc<dyn Fn(Duration) + Send + Sync>;

/// One logical call. Built fresh per call and consumed by `execute`.
#[derive(Clone)]
pub struct RequestDescriptor {
    pub url: Url,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Value>,
    pub operation_name: String,
    /// Overrides the adapter's `RetryConfig::max_retries` for this call.
    pub max_retries: Option<u32>,
    pub(crate) on_auth_error: Option<Arc<dyn AuthRefresher>>,
    pub(crate) on_rate_limit_hit: Option<RateLimitHook>,
    pub(crate) deadline: Option<Duration>,
    pub(crate) cancel: Option<CancellationToken>,
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("operation_name", &self.operation_name)
            .field("method", &self.method)
            .field("url", &crate::redact::sanitize_url(self.url.as_str()))
            .field("max_retries", &self.max_retries)
            .field("has_auth_refresher", &self.on_auth_error.is_some())
            .field("has_rate_limit_hook", &self.on_rate_limit_hit.is_some())
            .field("deadline", &self.deadline)
            .finish()
    }
}

impl RequestDescriptor {
    pub fn new(operation: impl Into<String>, method: Method, url: Url) -> Self {
        Self {
            url,
            method,
            headers: HeaderMap::new(),
            body: None,
            operation_name: operation.into(),
            max_retries: None,
            on_auth_error: None,
            on_rate_limit_hit: None,
            deadline: None,
            cancel: None,
        }
    }

    pub fn get(operation: impl Into<String>, url: Url) -> Self {
        Self::new(operation, Method::GET, url)
    }

    pub fn post(operation: impl Into<String>, url: Url) -> Self {
        Self::new(operation, Method::POST, url)
    }

    /// Merge `headers` over the current ones.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        for (name, value) in headers.iter() {
            self.headers.insert(name.clone(), value.clone());
        }
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.url.query_pairs_mut().append_pair(key, value);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = Some(n);
        self
    }

    /// Hook asked for a new credential when the platform rejects the current one.
    pub fn on_auth_error(mut self, refresher: Arc<dyn AuthRefresher>) -> Self {
        self.on_auth_error = Some(refresher);
        self
    }

    pub fn on_rate_limit_hit<F>(mut self, hook: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.on_rate_limit_hit = Some(Arc::new(hook));
        self
    }

    /// Overall deadline for the call, covering every attempt and backoff sleep.
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Attempts allowed for this call given the adapter default; never below 1.
    pub(crate) fn effective_max_retries(&self, adapter_default: u32) -> u32 {
        self.max_retries.unwrap_or(adapter_default).max(1)
    }
}
