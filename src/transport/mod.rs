//! 传输层：执行器唯一的网络出口，可替换以便测试。
//!
//! Transport seam between the executor and the network.
//!
//! The executor only ever talks to a [`Transport`]. Production code uses
//! [`HttpTransport`] (reqwest); tests plug in scripted fakes.

mod http;

pub use http::HttpTransport;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde_json::Value;
use url::Url;

/// A fully resolved request for one attempt.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

/// Raw response of one attempt, body fully buffered.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    pub fn new(status: u16, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn is_http_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parse the body as JSON. Empty or non-JSON bodies become `Value::Null`.
    pub fn json(&self) -> Value {
        if self.body.is_empty() {
            return Value::Null;
        }
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }
}

/// Issues a single HTTP exchange. No retry logic lives here.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: PreparedRequest) -> Result<RawResponse, TransportError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        match self {
            TransportError::Http(e) => e.is_timeout(),
            TransportError::Other(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_tolerates_empty_and_garbage() {
        let r = RawResponse::new(200, HeaderMap::new(), Bytes::new());
        assert_eq!(r.json(), Value::Null);
        let r = RawResponse::new(502, HeaderMap::new(), "<html>bad gateway</html>");
        assert_eq!(r.json(), Value::Null);
        assert!(r.text().contains("bad gateway"));
        let r = RawResponse::new(200, HeaderMap::new(), r#"{"data":[1]}"#);
        assert_eq!(r.json()["data"][0], 1);
        assert!(r.is_http_success());
    }
}
