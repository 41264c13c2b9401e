//! LinkedIn Marketing API (Rest.li) adapter.

use reqwest::header::HeaderMap;
use serde_json::Value;

use crate::adapter::{insert_header, PageCursor, PlatformAdapter};
use crate::classify::{code_i64, code_string, extract_message, header_first, retry_after_ms, ClassifiedError, Signals};
use crate::config::PlatformSettings;
use crate::transport::RawResponse;

pub const PLATFORM_ID: &str = "linkedin";
/// `LinkedIn-Version` header value (YYYYMM).
pub const DEFAULT_API_VERSION: &str = "202401";
pub const RESTLI_PROTOCOL_VERSION: &str = "2.0.0";

#[derive(Debug, Clone)]
pub struct LinkedInAdapter {
    api_version: String,
}

impl Default for LinkedInAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_API_VERSION)
    }
}

impl LinkedInAdapter {
    pub fn new(api_version: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
        }
    }

    pub fn from_settings(settings: &PlatformSettings) -> Self {
        Self::new(settings.api_version.as_deref().unwrap_or(DEFAULT_API_VERSION))
    }
}

impl PlatformAdapter for LinkedInAdapter {
    fn platform_id(&self) -> &str {
        PLATFORM_ID
    }

    fn default_base_url(&self) -> &str {
        "https://api.linkedin.com/rest/"
    }

    fn default_headers(&self) -> HeaderMap {
        let headers = insert_header(HeaderMap::new(), "linkedin-version", &self.api_version);
        insert_header(headers, "x-restli-protocol-version", RESTLI_PROTOCOL_VERSION)
    }

    fn parse_error(&self, response: &RawResponse, payload: &Value) -> ClassifiedError {
        let service_code = code_i64(payload.get("serviceErrorCode"));
        let mut signals = Signals::from_status(response.status);
        if matches!(service_code, Some(65600..=65604)) {
            signals = signals.auth();
        }

        let mut err = ClassifiedError::new(PLATFORM_ID, extract_message(payload, &response.text()), signals.category())
            .with_http_status(response.status);
        if let Some(c) = code_string(payload.get("serviceErrorCode")).or_else(|| code_string(payload.get("code"))) {
            err = err.with_provider_code(c);
        }
        if let Some(id) = self.request_id(response, payload) {
            err = err.with_request_id(id);
        }
        if err.is_rate_limit_error {
            if let Some(ms) = retry_after_ms(&response.headers) {
                err = err.with_retry_after_ms(ms);
            }
        }
        err
    }

    fn update_auth_header(&self, headers: HeaderMap, new_token: &str) -> HeaderMap {
        insert_header(headers, "authorization", &format!("Bearer {}", new_token))
    }

    fn request_id(&self, response: &RawResponse, _payload: &Value) -> Option<String> {
        header_first(&response.headers, &["x-li-uuid", "x-li-request-id", "x-request-id"])
    }

    /// Token-based paging when present, else offset paging from `paging.start/count/total`.
    fn next_page(&self, payload: &Value) -> Option<PageCursor> {
        if let Some(token) = payload.pointer("/metadata/nextPageToken").and_then(Value::as_str) {
            return (!token.is_empty()).then(|| PageCursor::Param {
                name: "pageToken",
                value: token.to_string(),
            });
        }
        let paging = payload.get("paging")?;
        let start = code_i64(paging.get("start")).unwrap_or(0);
        let count = code_i64(paging.get("count"))?;
        let total = code_i64(paging.get("total"))?;
        let next = start + count;
        (count > 0 && next < total).then(|| PageCursor::Param {
            name: "start",
            value: next.to_string(),
        })
    }
}
