//! TikTok Business API adapter.
//!
//! Every response is HTTP 200 with an envelope `{"code", "message", "request_id", "data"}`;
//! only `code == 0` means success.

use reqwest::header::HeaderMap;
use serde_json::Value;

use crate::adapter::{insert_header, PageCursor, PlatformAdapter, SuccessPredicate};
use crate::classify::{code_i64, code_string, extract_message, header_first, retry_after_ms, ClassifiedError, Signals};
use crate::config::PlatformSettings;
use crate::transport::RawResponse;

pub const PLATFORM_ID: &str = "tiktok";
pub const DEFAULT_API_VERSION: &str = "v1.3";

const RATE_LIMIT_CODES: &[i64] = &[40100];
const AUTH_CODES: &[i64] = &[40001, 40102, 40104, 40105];
const TRANSIENT_CODES: &[i64] = &[50000, 50002, 51010];

#[derive(Debug, Clone)]
pub struct TikTokAdapter {
    base_url: String,
}

impl Default for TikTokAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_API_VERSION)
    }
}

impl TikTokAdapter {
    pub fn new(api_version: &str) -> Self {
        Self {
            base_url: format!("https://business-api.tiktok.com/open_api/{}/", api_version),
        }
    }

    pub fn from_settings(settings: &PlatformSettings) -> Self {
        Self::new(settings.api_version.as_deref().unwrap_or(DEFAULT_API_VERSION))
    }

    fn code_signals(code: i64) -> Signals {
        if RATE_LIMIT_CODES.contains(&code) {
            Signals::none().rate_limit()
        } else if AUTH_CODES.contains(&code) {
            Signals::none().auth()
        } else if TRANSIENT_CODES.contains(&code) {
            Signals::none().transient()
        } else {
            Signals::none()
        }
    }
}

impl PlatformAdapter for TikTokAdapter {
    fn platform_id(&self) -> &str {
        PLATFORM_ID
    }

    fn default_base_url(&self) -> &str {
        &self.base_url
    }

    fn success_predicate(&self) -> SuccessPredicate {
        SuccessPredicate::EmbeddedCode {
            pointer: "/code",
            success_code: 0,
        }
    }

    fn parse_error(&self, response: &RawResponse, payload: &Value) -> ClassifiedError {
        let code = code_i64(payload.get("code"));
        let signals = Signals::from_status(response.status).merge(code.map(Self::code_signals).unwrap_or_default());

        let mut err = ClassifiedError::new(PLATFORM_ID, extract_message(payload, &response.text()), signals.category())
            .with_http_status(response.status);
        if let Some(c) = code_string(payload.get("code")) {
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
        insert_header(headers, "access-token", new_token)
    }

    fn request_id(&self, response: &RawResponse, payload: &Value) -> Option<String> {
        code_string(payload.get("request_id")).or_else(|| header_first(&response.headers, &["x-tt-logid"]))
    }

    fn next_page(&self, payload: &Value) -> Option<PageCursor> {
        let info = payload.pointer("/data/page_info")?;
        let page = code_i64(info.get("page"))?;
        let total = code_i64(info.get("total_page"))?;
        (page < total).then(|| PageCursor::Param {
            name: "page",
            value: (page + 1).to_string(),
        })
    }
}
