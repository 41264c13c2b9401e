//! Meta Marketing API (Graph API) adapter.
//!
//! - Credential travels in the `access_token` query parameter, optionally
//!   signed with `appsecret_proof = hex(HMAC-SHA256(app_secret, token))`.
//! - Errors: `{"error": {"message", "type", "code", "error_subcode", "is_transient", "fbtrace_id"}}`.
//! - Throttling detail lives in `x-business-use-case-usage`, whose
//!   `estimated_time_to_regain_access` is in minutes.

use hmac::{Hmac, Mac};
use reqwest::header::HeaderMap;
use serde_json::Value;
use sha2::Sha256;
use url::Url;

use crate::adapter::{set_query_param, PageCursor, PlatformAdapter};
use crate::classify::{code_i64, code_string, extract_message, header_first, retry_after_ms, ClassifiedError, Signals};
use crate::config::PlatformSettings;
use crate::transport::RawResponse;

pub const PLATFORM_ID: &str = "meta";
pub const DEFAULT_API_VERSION: &str = "v19.0";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone)]
pub struct MetaAdapter {
    base_url: String,
    app_secret: Option<String>,
}

impl Default for MetaAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_API_VERSION, None)
    }
}

impl MetaAdapter {
    pub fn new(api_version: &str, app_secret: Option<String>) -> Self {
        Self {
            base_url: format!("https://graph.facebook.com/{}/", api_version),
            app_secret: app_secret.filter(|s| !s.is_empty()),
        }
    }

    pub fn from_settings(settings: &PlatformSettings) -> Self {
        Self::new(
            settings.api_version.as_deref().unwrap_or(DEFAULT_API_VERSION),
            settings.app_secret.clone(),
        )
    }

    fn is_auth_code(code: i64) -> bool {
        matches!(code, 190 | 102 | 10 | 200..=299)
    }

    fn is_rate_limit_code(code: i64) -> bool {
        matches!(code, 4 | 17 | 32 | 613 | 80000..=80014)
    }

    /// Longest `estimated_time_to_regain_access` across all business entries, in ms.
    fn business_usage_delay_ms(headers: &HeaderMap) -> Option<u64> {
        let raw = header_first(headers, &["x-business-use-case-usage"])?;
        let usage: Value = serde_json::from_str(&raw).ok()?;
        let minutes = usage
            .as_object()?
            .values()
            .filter_map(|entries| entries.as_array())
            .flatten()
            .filter_map(|entry| code_i64(entry.get("estimated_time_to_regain_access")))
            .max()?;
        (minutes > 0).then(|| (minutes as u64).saturating_mul(60_000))
    }
}

/// `hex(HMAC-SHA256(app_secret, access_token))`.
pub fn appsecret_proof(app_secret: &str, access_token: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes()).ok()?;
    mac.update(access_token.as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

impl PlatformAdapter for MetaAdapter {
    fn platform_id(&self) -> &str {
        PLATFORM_ID
    }

    fn default_base_url(&self) -> &str {
        &self.base_url
    }

    fn parse_error(&self, response: &RawResponse, payload: &Value) -> ClassifiedError {
        let error = payload.get("error").unwrap_or(&Value::Null);
        let code = code_i64(error.get("code"));

        let mut signals = Signals::from_status(response.status);
        if let Some(code) = code {
            if Self::is_auth_code(code) {
                signals = signals.auth();
            } else if Self::is_rate_limit_code(code) {
                signals = signals.rate_limit();
            } else if code == 1 || code == 2 {
                signals = signals.transient();
            }
        }
        if error.get("is_transient").and_then(Value::as_bool) == Some(true) {
            signals = signals.transient();
        }

        let mut err = ClassifiedError::new(PLATFORM_ID, extract_message(payload, &response.text()), signals.category())
            .with_http_status(response.status);

        let provider_code = match (code_string(error.get("code")), code_string(error.get("error_subcode"))) {
            (Some(c), Some(sub)) => Some(format!("{}/{}", c, sub)),
            (c, _) => c,
        };
        if let Some(c) = provider_code {
            err = err.with_provider_code(c);
        }
        if let Some(id) = self.request_id(response, payload) {
            err = err.with_request_id(id);
        }
        if err.is_rate_limit_error {
            if let Some(ms) = Self::business_usage_delay_ms(&response.headers).or_else(|| retry_after_ms(&response.headers)) {
                err = err.with_retry_after_ms(ms);
            }
        }
        err
    }

    fn update_auth_in_url(&self, url: Url, new_token: &str) -> Url {
        let url = set_query_param(url, "access_token", new_token);
        match self.app_secret.as_deref().and_then(|secret| appsecret_proof(secret, new_token)) {
            Some(proof) => set_query_param(url, "appsecret_proof", &proof),
            None => url,
        }
    }

    fn request_id(&self, response: &RawResponse, payload: &Value) -> Option<String> {
        header_first(&response.headers, &["x-fb-trace-id", "x-fb-request-id"])
            .or_else(|| code_string(payload.pointer("/error/fbtrace_id")))
    }

    fn next_page(&self, payload: &Value) -> Option<PageCursor> {
        let next = payload.pointer("/paging/next")?.as_str()?;
        Url::parse(next).ok().map(PageCursor::Url)
    }
}
