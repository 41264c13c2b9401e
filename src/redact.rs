//! Credential redaction for anything that ends up in a log record.

use once_cell::sync::Lazy;
use regex::Regex;

/// Placeholder written in place of credential values.
pub const REDACTED: &str = "[REDACTED]";

static CREDENTIAL_PARAM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([?&;](?:access_token|token|appsecret_proof)=)[^&#;\s)]*")
        .expect("credential pattern is a valid regex")
});

/// Replace the values of `access_token`, `token` and `appsecret_proof`
/// query parameters with [`REDACTED`].
///
/// Works on arbitrary strings, so malformed URLs and error messages that
/// quote a URL are still scrubbed. A value ends at whitespace or `)`.
pub fn sanitize_url(url: &str) -> String {
    CREDENTIAL_PARAM
        .replace_all(url, format!("${{1}}{}", REDACTED).as_str())
        .into_owned()
}
