//! 平台适配契约：每个广告平台提供的 URL、请求头、成功判定与错误解析约定。
//!
//! Platform adapter contract.
//!
//! The executor treats everything platform-specific as opaque and reaches it
//! only through [`PlatformAdapter`]: the success predicate, the error parser,
//! and the two credential rewriters used after an auth refresh. An
//! [`AdapterConfig`] pairs one adapter with its base URL, default headers and
//! [`RetryConfig`]; it is built once per platform and shared by every call.

mod success;

pub use success::SuccessPredicate;

use crate::backoff::RetryConfig;
use crate::classify::{header_first, ClassifiedError};
use crate::executor::RequestDescriptor;
use crate::transport::RawResponse;
use crate::{Error, ErrorContext, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Headers most platforms use for their upstream request id.
pub const COMMON_REQUEST_ID_HEADERS: &[&str] = &["x-request-id", "request-id", "x-amzn-requestid"];

/// Core trait for platform-specific conventions.
///
/// Implementations must be stateless with respect to individual calls; the
/// same adapter value is shared by concurrent requests.
pub trait PlatformAdapter: Send + Sync + fmt::Debug {
    /// Stable identifier used in logs and errors (e.g. `"meta"`).
    fn platform_id(&self) -> &str;

    /// Base URL used when the settings do not override it.
    fn default_base_url(&self) -> &str;

    /// Headers sent with every request (versioning, content negotiation).
    fn default_headers(&self) -> HeaderMap {
        HeaderMap::new()
    }

    /// How this platform signals success. Defaults to HTTP 2xx.
    fn success_predicate(&self) -> SuccessPredicate {
        SuccessPredicate::HttpStatus
    }

    fn is_success(&self, response: &RawResponse, payload: &Value) -> bool {
        self.success_predicate().evaluate(response, payload)
    }

    /// Turn a failed response into a classified error.
    fn parse_error(&self, response: &RawResponse, payload: &Value) -> ClassifiedError;

    /// Install `new_token` into the request headers. Platforms that carry the
    /// credential in the URL return the headers unchanged.
    fn update_auth_header(&self, headers: HeaderMap, _new_token: &str) -> HeaderMap {
        headers
    }

    /// Install `new_token` into the request URL. Header-based platforms return
    /// the URL unchanged.
    fn update_auth_in_url(&self, url: Url, _new_token: &str) -> Url {
        url
    }

    /// Upstream request id for support correlation.
    fn request_id(&self, response: &RawResponse, _payload: &Value) -> Option<String> {
        header_first(&response.headers, COMMON_REQUEST_ID_HEADERS)
    }

    /// Cursor for the page following `payload`, if the platform advertises one.
    fn next_page(&self, _payload: &Value) -> Option<PageCursor> {
        None
    }
}

/// Where the next page lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor {
    /// Fully formed URL to request next.
    Url(Url),
    /// Token to set on the current request: query parameter for bodiless
    /// requests, top-level body field otherwise.
    Param { name: &'static str, value: String },
}

/// Long-lived, immutable per-platform configuration shared by all calls.
#[derive(Clone)]
pub struct AdapterConfig {
    platform: Arc<dyn PlatformAdapter>,
    base_url: Url,
    default_headers: HeaderMap,
    retry: RetryConfig,
    max_auth_refreshes: u32,
}

impl fmt::Debug for AdapterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterConfig")
            .field("platform_id", &self.platform_id())
            .field("base_url", &self.base_url.as_str())
            .field("retry", &self.retry)
            .field("max_auth_refreshes", &self.max_auth_refreshes)
            .finish()
    }
}

impl AdapterConfig {
    pub fn builder(platform: Arc<dyn PlatformAdapter>) -> AdapterConfigBuilder {
        AdapterConfigBuilder::new(platform)
    }

    pub fn platform_id(&self) -> &str {
        self.platform.platform_id()
    }

    pub fn platform(&self) -> &Arc<dyn PlatformAdapter> {
        &self.platform
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }

    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    pub fn max_auth_refreshes(&self) -> u32 {
        self.max_auth_refreshes
    }

    pub fn is_success(&self, response: &RawResponse, payload: &Value) -> bool {
        self.platform.is_success(response, payload)
    }

    /// Parse a failed response, filling status and request id when the
    /// platform parser left them empty.
    pub fn parse_error(&self, response: &RawResponse, payload: &Value) -> ClassifiedError {
        let mut err = self.platform.parse_error(response, payload);
        if err.http_status.is_none() {
            err.http_status = Some(response.status);
        }
        if err.request_id.is_none() {
            err.request_id = self.platform.request_id(response, payload);
        }
        err
    }

    pub fn update_auth_header(&self, headers: HeaderMap, new_token: &str) -> HeaderMap {
        self.platform.update_auth_header(headers, new_token)
    }

    pub fn update_auth_in_url(&self, url: Url, new_token: &str) -> Url {
        self.platform.update_auth_in_url(url, new_token)
    }

    pub fn next_page(&self, payload: &Value) -> Option<PageCursor> {
        self.platform.next_page(payload)
    }

    /// Resolve `path` against the base URL. Absolute URLs pass through.
    pub fn resolve_url(&self, path: &str) -> Result<Url> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Url::parse(path).map_err(|e| invalid_url(path, e));
        }
        let base = self.base_url.as_str().trim_end_matches('/');
        let joined = format!("{}/{}", base, path.trim_start_matches('/'));
        Url::parse(&joined).map_err(|e| invalid_url(&joined, e))
    }

    /// Start a descriptor for `path` seeded with the default headers.
    pub fn request(&self, operation: impl Into<String>, method: Method, path: &str) -> Result<RequestDescriptor> {
        let url = self.resolve_url(path)?;
        Ok(RequestDescriptor::new(operation, method, url).with_headers(self.default_headers.clone()))
    }

    /// Apply a credential to a descriptor the same way a refresh would.
    pub fn authorize(&self, mut descriptor: RequestDescriptor, token: &str) -> RequestDescriptor {
        descriptor.headers = self.update_auth_header(std::mem::take(&mut descriptor.headers), token);
        let url = descriptor.url.clone();
        descriptor.url = self.update_auth_in_url(url, token);
        descriptor
    }
}

fn invalid_url(url: &str, e: url::ParseError) -> Error {
    Error::validation_with_context(
        format!("invalid request URL: {}", e),
        ErrorContext::new()
            .with_details(crate::redact::sanitize_url(url))
            .with_source("adapter_config"),
    )
}

/// Builder for [`AdapterConfig`]; `build` validates the retry settings.
pub struct AdapterConfigBuilder {
    platform: Arc<dyn PlatformAdapter>,
    base_url: Option<String>,
    extra_headers: Vec<(String, String)>,
    retry: RetryConfig,
    max_auth_refreshes: u32,
}

impl AdapterConfigBuilder {
    pub fn new(platform: Arc<dyn PlatformAdapter>) -> Self {
        Self {
            platform,
            base_url: None,
            extra_headers: Vec::new(),
            retry: RetryConfig::default(),
            max_auth_refreshes: 1,
        }
    }

    /// Override the platform's default base URL (e.g. a mock server).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Successful refreshes allowed per logical call (default 1).
    pub fn max_auth_refreshes(mut self, n: u32) -> Self {
        self.max_auth_refreshes = n;
        self
    }

    pub fn build(self) -> Result<AdapterConfig> {
        self.retry.validate()?;

        let raw_base = self
            .base_url
            .unwrap_or_else(|| self.platform.default_base_url().to_string());
        let base_url = Url::parse(&raw_base).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid base URL '{}': {}", raw_base, e),
                ErrorContext::new()
                    .with_field_path("base_url")
                    .with_source("adapter_config"),
            )
        })?;

        let mut default_headers = self.platform.default_headers();
        for (name, value) in self.extra_headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                Error::configuration_with_context(
                    format!("invalid header name '{}': {}", name, e),
                    ErrorContext::new().with_source("adapter_config"),
                )
            })?;
            let header_value = HeaderValue::from_str(&value).map_err(|e| {
                Error::configuration_with_context(
                    format!("invalid value for header '{}': {}", name, e),
                    ErrorContext::new().with_source("adapter_config"),
                )
            })?;
            default_headers.insert(header_name, header_value);
        }

        Ok(AdapterConfig {
            platform: self.platform,
            base_url,
            default_headers,
            retry: self.retry,
            max_auth_refreshes: self.max_auth_refreshes,
        })
    }
}

/// Set `key=value` in the query string, replacing any existing occurrences
/// and keeping the other pairs in order.
pub fn set_query_param(mut url: Url, key: &str, value: &str) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
        pairs.append_pair(key, value);
    }
    url
}

/// Insert a header, silently skipping values that are not valid header text.
pub fn insert_header(mut headers: HeaderMap, name: &'static str, value: &str) -> HeaderMap {
    if let Ok(v) = HeaderValue::from_str(value) {
        headers.insert(HeaderName::from_static(name), v);
    }
    headers
}
