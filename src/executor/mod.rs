//! 弹性请求执行器：所有平台客户端的唯一传输路径，负责重试、退避、限流延迟与凭证刷新。
//!
//! Resilient request executor.
//!
//! Every platform client funnels its HTTP calls through
//! [`RequestExecutor::execute`]. One call runs a strictly sequential series
//! of attempts:
//!
//! | Failure | Consumes an attempt? | Resolution |
//! |---|---|---|
//! | network (no response) | yes | backoff, retry; raw error on exhaustion |
//! | auth, refresher present | no | refresh once, restart attempts |
//! | auth, no refresher / declined | - | returned immediately |
//! | rate limit | yes | server delay or doubled backoff |
//! | retryable / 429 / 5xx | yes | exponential backoff |
//! | anything else | - | returned immediately |
//!
//! Nothing is shared between concurrent calls except the immutable
//! [`AdapterConfig`](crate::adapter::AdapterConfig) and the transport.

pub mod auth;
mod descriptor;
pub mod policy;

pub use auth::{AuthRefresh, AuthRefresher, RefreshCoordinator, RefreshOutcome};
pub use descriptor::{RateLimitHook, RequestDescriptor};
pub use policy::{Decision, PolicyEngine};

use crate::adapter::AdapterConfig;
use crate::redact::sanitize_url;
use crate::telemetry::{AttemptObserver, AttemptOutcome, AttemptRecord};
use crate::transport::{HttpTransport, PreparedRequest, Transport};
use crate::{Error, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// Correlation id header sent on every attempt of a call.
pub const CLIENT_REQUEST_ID_HEADER: &str = "x-ads-request-id";

/// Successful outcome of one logical call.
#[derive(Debug, Clone)]
pub struct ExecutedResponse<T> {
    pub status: u16,
    pub headers: HeaderMap,
    pub payload: T,
    /// Attempts made across all credentials, including the successful one.
    pub attempts: u32,
    pub auth_refreshes: u32,
    pub client_request_id: String,
}

impl<T> ExecutedResponse<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ExecutedResponse<U> {
        ExecutedResponse {
            status: self.status,
            headers: self.headers,
            payload: f(self.payload),
            attempts: self.attempts,
            auth_refreshes: self.auth_refreshes,
            client_request_id: self.client_request_id,
        }
    }
}

/// Shared, stateless executor. Clone freely; concurrent calls need no locking.
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    observer: Arc<dyn AttemptObserver>,
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            observer: crate::telemetry::tracing_observer(),
        }
    }

    /// Executor over an [`HttpTransport`] with env-overridable defaults.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(Arc::new(HttpTransport::from_env()?)))
    }

    /// Replace the default tracing observer.
    pub fn with_observer(mut self, observer: Arc<dyn AttemptObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Run one logical call and deserialize the successful payload into `T`.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        adapter: &AdapterConfig,
        descriptor: RequestDescriptor,
    ) -> Result<ExecutedResponse<T>> {
        let mut raw = self.execute_json(adapter, descriptor).await?;
        let payload: T = serde_json::from_value(std::mem::take(&mut raw.payload))?;
        Ok(raw.map(|_| payload))
    }

    /// Run one logical call and return the payload as raw JSON.
    ///
    /// The optional deadline and cancellation token race the whole attempt
    /// loop, including backoff sleeps.
    pub async fn execute_json(
        &self,
        adapter: &AdapterConfig,
        descriptor: RequestDescriptor,
    ) -> Result<ExecutedResponse<Value>> {
        let deadline = descriptor.deadline;
        let cancel = descriptor.cancel.clone();
        let started = Instant::now();

        let attempts = self.run(adapter, descriptor);
        tokio::pin!(attempts);

        let cancelled = async move {
            match cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<()>().await,
            }
        };
        let expired = async move {
            match deadline {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => Err(Error::Cancelled),
            _ = expired => Err(Error::DeadlineExceeded {
                elapsed_ms: started.elapsed().as_millis(),
            }),
            result = &mut attempts => result,
        }
    }

    async fn run(&self, adapter: &AdapterConfig, descriptor: RequestDescriptor) -> Result<ExecutedResponse<Value>> {
        let max_attempts = descriptor.effective_max_retries(adapter.retry().max_retries);
        let RequestDescriptor {
            mut url,
            method,
            mut headers,
            body,
            operation_name,
            on_auth_error,
            on_rate_limit_hit,
            ..
        } = descriptor;

        let client_request_id = Uuid::new_v4().to_string();
        if let Ok(v) = HeaderValue::from_str(&client_request_id) {
            headers.insert(HeaderName::from_static(CLIENT_REQUEST_ID_HEADER), v);
        }

        let policy = PolicyEngine::new(adapter.retry(), max_attempts);
        let mut refresh = RefreshCoordinator::new(adapter.max_auth_refreshes());
        let mut attempt: u32 = 0;
        let mut total_attempts: u32 = 0;

        loop {
            total_attempts += 1;
            let mut record = AttemptRecord {
                platform: adapter.platform_id().to_string(),
                operation: operation_name.clone(),
                url: sanitize_url(url.as_str()),
                attempt,
                max_retries: max_attempts,
                client_request_id: client_request_id.clone(),
                status_code: None,
                duration_ms: None,
                error: None,
                outcome: AttemptOutcome::Failed,
            };

            let request = PreparedRequest {
                method: method.clone(),
                url: url.clone(),
                headers: headers.clone(),
                body: body.clone(),
            };
            let started = Instant::now();
            let sent = self.transport.send(request).await;
            record.duration_ms = Some(started.elapsed().as_millis() as u64);

            let response = match sent {
                Ok(response) => response,
                Err(e) => {
                    // reqwest quotes the full URL, credentials included
                    record.error = Some(serde_json::json!({ "network": sanitize_url(&e.to_string()) }));
                    match policy.on_network_failure(attempt) {
                        Decision::Retry { delay } => {
                            self.retry_after(&mut record, delay).await;
                            attempt += 1;
                            continue;
                        }
                        _ => {
                            self.observer.record(&record);
                            return Err(Error::Transport(e));
                        }
                    }
                }
            };

            record.status_code = Some(response.status);
            let payload = response.json();

            if adapter.is_success(&response, &payload) {
                record.outcome = AttemptOutcome::Success;
                self.observer.record(&record);
                return Ok(ExecutedResponse {
                    status: response.status,
                    headers: response.headers,
                    payload,
                    attempts: total_attempts,
                    auth_refreshes: refresh.refreshes(),
                    client_request_id,
                });
            }

            let err = adapter.parse_error(&response, &payload);
            record.error = Some(err.to_json());

            match policy.decide(&err, response.status, attempt, on_auth_error.is_some()) {
                Decision::RefreshAuth => match refresh.resolve(on_auth_error.as_deref(), &err).await {
                    RefreshOutcome::Retry { new_token } => {
                        if let Some(token) = new_token {
                            headers = adapter.update_auth_header(headers, &token);
                            url = adapter.update_auth_in_url(url, &token);
                        }
                        record.outcome = AttemptOutcome::AuthRefreshed;
                        self.observer.record(&record);
                        // Fresh credential, fresh attempt budget.
                        attempt = 0;
                        continue;
                    }
                    RefreshOutcome::Surface => {
                        self.observer.record(&record);
                        return Err(err.into());
                    }
                },
                Decision::RateLimited { delay, retry } => {
                    if let Some(hook) = &on_rate_limit_hit {
                        hook(delay);
                    }
                    if retry {
                        self.retry_after(&mut record, delay).await;
                        attempt += 1;
                        continue;
                    }
                    self.observer.record(&record);
                    return Err(err.into());
                }
                Decision::Retry { delay } => {
                    self.retry_after(&mut record, delay).await;
                    attempt += 1;
                    continue;
                }
                Decision::Fail => {
                    self.observer.record(&record);
                    return Err(err.into());
                }
            }
        }
    }

    async fn retry_after(&self, record: &mut AttemptRecord, delay: Duration) {
        record.outcome = AttemptOutcome::Retrying {
            delay_ms: delay.as_millis() as u64,
        };
        self.observer.record(record);
        tokio::time::sleep(delay).await;
    }
}
