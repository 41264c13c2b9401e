//! Header helpers shared by platform parsers.

use reqwest::header::HeaderMap;

/// Extract the first non-empty header value from a list of header names.
pub fn header_first(headers: &HeaderMap, names: &[&str]) -> Option<String> {
    for name in names {
        if let Some(v) = headers.get(*name) {
            if let Ok(s) = v.to_str() {
                let s = s.trim();
                if !s.is_empty() {
                    return Some(s.to_string());
                }
            }
        }
    }
    None
}

/// Parse `Retry-After: <seconds>` into milliseconds.
///
/// Fractional seconds are accepted. The HTTP-date form is not supported and yields `None`.
pub fn retry_after_ms(headers: &HeaderMap) -> Option<u64> {
    let raw = header_first(headers, &["retry-after"])?;
    if let Ok(secs) = raw.parse::<u64>() {
        return Some(secs.saturating_mul(1000));
    }
    let secs: f64 = raw.parse().ok()?;
    if secs.is_finite() && secs >= 0.0 {
        Some((secs * 1000.0) as u64)
    } else {
        None
    }
}
