//! Mock HTTP server setup for integration tests

use ads_lib_rust::config::HttpSettings;
use ads_lib_rust::telemetry::InMemoryObserver;
use ads_lib_rust::transport::HttpTransport;
use ads_lib_rust::{AdapterConfig, PlatformAdapter, RequestExecutor, RetryConfig};
use mockito::{Server, ServerGuard};
use std::sync::Arc;

/// Test fixture that manages a mock server
pub struct MockServerFixture {
    pub server: ServerGuard,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self { server, base_url }
    }

    /// Adapter config pointed at the mock server under `prefix` (e.g. `/rest/`).
    pub fn adapter(&self, platform: impl PlatformAdapter + 'static, prefix: &str, max_retries: u32) -> AdapterConfig {
        AdapterConfig::builder(Arc::new(platform))
            .base_url(format!("{}{}", self.base_url, prefix))
            .retry(fast_retry(max_retries))
            .build()
            .expect("adapter config")
    }
}

/// Millisecond delays so real sleeps stay short.
pub fn fast_retry(max_retries: u32) -> RetryConfig {
    RetryConfig::new(max_retries, 10, 50, 0.0)
}

/// Real reqwest transport with an in-memory observer attached.
pub fn executor() -> (RequestExecutor, InMemoryObserver) {
    let settings = HttpSettings {
        timeout_secs: 5,
        ..HttpSettings::default()
    };
    let transport = HttpTransport::new(&settings).expect("http transport");
    let observer = InMemoryObserver::new();
    let executor = RequestExecutor::new(Arc::new(transport)).with_observer(Arc::new(observer.clone()));
    (executor, observer)
}
