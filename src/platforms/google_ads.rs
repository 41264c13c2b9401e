//! Google Ads API (REST) adapter.
//!
//! Bearer credential plus the `developer-token` and optional
//! `login-customer-id` headers. Failures use the google.rpc `Status` shape;
//! quota exhaustion carries a `retryDelay` such as `"30s"` in its details.

use reqwest::header::HeaderMap;
use serde_json::Value;

use super::parse_seconds_ms;
use crate::adapter::{insert_header, PageCursor, PlatformAdapter};
use crate::classify::{code_string, extract_message, header_first, retry_after_ms, ClassifiedError, Signals};
use crate::config::PlatformSettings;
use crate::transport::RawResponse;

pub const PLATFORM_ID: &str = "google_ads";
pub const DEFAULT_API_VERSION: &str = "v16";

#[derive(Debug, Clone)]
pub struct GoogleAdsAdapter {
    base_url: String,
    developer_token: Option<String>,
    login_customer_id: Option<String>,
}

impl Default for GoogleAdsAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_API_VERSION, None, None)
    }
}

impl GoogleAdsAdapter {
    pub fn new(api_version: &str, developer_token: Option<String>, login_customer_id: Option<String>) -> Self {
        Self {
            base_url: format!("https://googleads.googleapis.com/{}/", api_version),
            developer_token,
            // The header wants the bare digits, settings often carry "123-456-7890".
            login_customer_id: login_customer_id.map(|id| id.replace('-', "")),
        }
    }

    pub fn from_settings(settings: &PlatformSettings) -> Self {
        Self::new(
            settings.api_version.as_deref().unwrap_or(DEFAULT_API_VERSION),
            settings.developer_token.clone(),
            settings.login_customer_id.clone(),
        )
    }

    fn status_signals(status: &str) -> Signals {
        match status {
            "UNAUTHENTICATED" | "PERMISSION_DENIED" => Signals::none().auth(),
            "RESOURCE_EXHAUSTED" => Signals::none().rate_limit(),
            "UNAVAILABLE" | "INTERNAL" | "DEADLINE_EXCEEDED" | "ABORTED" => Signals::none().transient(),
            _ => Signals::none(),
        }
    }

    /// Signals from `GoogleAdsFailure.errors[].errorCode` keys.
    fn failure_signals(details: &[Value]) -> Signals {
        details
            .iter()
            .filter_map(|d| d.get("errors").and_then(Value::as_array))
            .flatten()
            .filter_map(|e| e.get("errorCode").and_then(Value::as_object))
            .flat_map(|code| code.keys())
            .fold(Signals::none(), |acc, key| match key.as_str() {
                "authenticationError" | "authorizationError" => acc.auth(),
                "quotaError" => acc.rate_limit(),
                "internalError" => acc.transient(),
                _ => acc,
            })
    }

    /// First `retryDelay` in the details (QuotaErrorInfo or RetryInfo).
    fn retry_delay_ms(details: &[Value]) -> Option<u64> {
        details
            .iter()
            .filter_map(|d| d.get("retryDelay").and_then(Value::as_str))
            .find_map(parse_seconds_ms)
    }
}

impl PlatformAdapter for GoogleAdsAdapter {
    fn platform_id(&self) -> &str {
        PLATFORM_ID
    }

    fn default_base_url(&self) -> &str {
        &self.base_url
    }

    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.developer_token {
            headers = insert_header(headers, "developer-token", token);
        }
        if let Some(id) = &self.login_customer_id {
            headers = insert_header(headers, "login-customer-id", id);
        }
        headers
    }

    fn parse_error(&self, response: &RawResponse, payload: &Value) -> ClassifiedError {
        let error = payload.get("error").unwrap_or(&Value::Null);
        let status = error.get("status").and_then(Value::as_str).unwrap_or_default();
        let details: &[Value] = error.get("details").and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);

        let signals = Signals::from_status(response.status)
            .merge(Self::status_signals(status))
            .merge(Self::failure_signals(details));

        let mut err = ClassifiedError::new(PLATFORM_ID, extract_message(payload, &response.text()), signals.category())
            .with_http_status(response.status);
        if !status.is_empty() {
            err = err.with_provider_code(status);
        }
        if let Some(id) = self.request_id(response, payload) {
            err = err.with_request_id(id);
        }
        if err.is_rate_limit_error {
            if let Some(ms) = Self::retry_delay_ms(details).or_else(|| retry_after_ms(&response.headers)) {
                err = err.with_retry_after_ms(ms);
            }
        }
        err
    }

    fn update_auth_header(&self, headers: HeaderMap, new_token: &str) -> HeaderMap {
        insert_header(headers, "authorization", &format!("Bearer {}", new_token))
    }

    fn request_id(&self, response: &RawResponse, payload: &Value) -> Option<String> {
        header_first(&response.headers, &["request-id", "x-request-id"]).or_else(|| {
            payload
                .pointer("/error/details")
                .and_then(Value::as_array)?
                .iter()
                .find_map(|d| code_string(d.get("requestId")))
        })
    }

    fn next_page(&self, payload: &Value) -> Option<PageCursor> {
        let token = payload.get("nextPageToken")?.as_str()?;
        (!token.is_empty()).then(|| PageCursor::Param {
            name: "pageToken",
            value: token.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use serde_json::json;

    fn parse(status: u16, body: Value) -> ClassifiedError {
        let resp = RawResponse::new(status, HeaderMap::new(), body.to_string());
        GoogleAdsAdapter::default().parse_error(&resp, &body)
    }

    #[test]
    fn resource_exhausted_uses_quota_retry_delay() {
        let err = parse(
            429,
            json!({"error": {"code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED", "details": [
                {"@type": "type.googleapis.com/google.ads.googleads.v16.errors.GoogleAdsFailure",
                 "errors": [{"errorCode": {"quotaError": "RESOURCE_TEMPORARILY_EXHAUSTED"}, "message": "Too many requests"}],
                 "requestId": "req-9"},
                {"@type": "type.googleapis.com/google.ads.googleads.v16.errors.QuotaErrorInfo", "retryDelay": "30s"}
            ]}}),
        );
        assert!(err.is_rate_limit_error);
        assert_eq!(err.retry_after_ms, Some(30_000));
        assert_eq!(err.provider_error_code.as_deref(), Some("RESOURCE_EXHAUSTED"));
        assert_eq!(err.request_id.as_deref(), Some("req-9"));
    }

    #[test]
    fn unauthenticated_and_permission_denied_are_auth() {
        for status in ["UNAUTHENTICATED", "PERMISSION_DENIED"] {
            let err = parse(400, json!({"error": {"code": 400, "message": "nope", "status": status}}));
            assert!(err.is_auth_error, "{}", status);
            assert!(!err.is_retryable);
        }
    }

    #[test]
    fn authorization_error_inside_bad_request_is_auth() {
        let err = parse(
            400,
            json!({"error": {"status": "INVALID_ARGUMENT", "message": "denied", "details": [
                {"errors": [{"errorCode": {"authorizationError": "USER_PERMISSION_DENIED"}}]}
            ]}}),
        );
        assert!(err.is_auth_error);
    }

    #[test]
    fn transient_statuses_retry() {
        for status in ["UNAVAILABLE", "INTERNAL", "DEADLINE_EXCEEDED", "ABORTED"] {
            let err = parse(400, json!({"error": {"message": "x", "status": status}}));
            assert!(err.is_retryable, "{}", status);
            assert!(!err.is_rate_limit_error);
        }
        assert!(!parse(400, json!({"error": {"message": "bad query", "status": "INVALID_ARGUMENT"}})).is_retryable);
    }

    #[test]
    fn headers_and_bearer() {
        let adapter = GoogleAdsAdapter::new("v16", Some("dev-tok".into()), Some("123-456-7890".into()));
        let headers = adapter.default_headers();
        assert_eq!(headers["developer-token"], "dev-tok");
        assert_eq!(headers["login-customer-id"], "1234567890");
        let headers = adapter.update_auth_header(headers, "ya29.new");
        assert_eq!(headers["authorization"], HeaderValue::from_static("Bearer ya29.new"));
    }

    #[test]
    fn next_page_token() {
        let adapter = GoogleAdsAdapter::default();
        assert_eq!(
            adapter.next_page(&json!({"results": [], "nextPageToken": "CAE"})),
            Some(PageCursor::Param {
                name: "pageToken",
                value: "CAE".into()
            })
        );
        assert_eq!(adapter.next_page(&json!({"results": [], "nextPageToken": ""})), None);
    }
}
