use crate::config::HttpSettings;
use crate::Result;
use async_trait::async_trait;
use reqwest::Proxy;
use std::time::Duration;

use super::{PreparedRequest, RawResponse, Transport, TransportError};

/// reqwest-backed transport shared by all platforms.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .pool_max_idle_per_host(settings.pool_max_idle_per_host)
            .pool_idle_timeout(Some(Duration::from_secs(settings.pool_idle_timeout_secs)))
            .user_agent(concat!("ads-lib-rust/", env!("CARGO_PKG_VERSION")));

        if let Some(proxy_url) = settings.proxy_url.as_deref() {
            let proxy = Proxy::all(proxy_url)
                .map_err(|e| crate::Error::Transport(TransportError::Other(e.to_string())))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| crate::Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self { client })
    }

    /// Transport with env-overridable defaults.
    pub fn from_env() -> Result<Self> {
        Self::new(&HttpSettings::default().with_env_overrides())
    }

    /// Wrap an already configured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: PreparedRequest) -> std::result::Result<RawResponse, TransportError> {
        let mut req = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);

        if let Some(body) = &request.body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        // A body that breaks mid-read counts as a network failure, not a response.
        let body = resp.bytes().await?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}
