//! 尝试记录：每次请求尝试产生一条结构化记录，经可注入的观察者端口输出。
//!
//! Per-attempt records and the observer port.
//!
//! The executor never logs directly. It hands one [`AttemptRecord`] per
//! attempt to an [`AttemptObserver`]; the default [`TracingObserver`] turns
//! records into `tracing` events, while tests install an [`InMemoryObserver`].
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`AttemptRecord`] | One structured record per attempt |
//! | [`AttemptObserver`] | Trait for record destinations |
//! | [`TracingObserver`] | Default observer emitting `tracing` events |
//! | [`InMemoryObserver`] | Captures records for assertions |
//! | [`CompositeObserver`] | Fans records out to several observers |

use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

/// What the executor did after an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Success predicate held; payload returned.
    Success,
    /// Attempt failed and the executor will sleep then retry.
    Retrying { delay_ms: u64 },
    /// Auth error resolved by a credential refresh; retrying immediately.
    AuthRefreshed,
    /// Terminal failure; the error is returned to the caller.
    Failed,
}

/// One structured record per attempt. The URL is always credential-redacted.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptRecord {
    pub platform: String,
    pub operation: String,
    pub url: String,
    /// 0-based attempt index for the current credential.
    pub attempt: u32,
    pub max_retries: u32,
    pub client_request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Serialized `ClassifiedError`, or `{"network": "..."}` for transport failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    pub outcome: AttemptOutcome,
}

impl AttemptRecord {
    pub fn is_success(&self) -> bool {
        self.outcome == AttemptOutcome::Success
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }
}

/// Destination for attempt records.
pub trait AttemptObserver: Send + Sync {
    fn record(&self, record: &AttemptRecord);
}

/// Emits each record as a `tracing` event on target `ads_lib_rust::executor`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl AttemptObserver for TracingObserver {
    fn record(&self, r: &AttemptRecord) {
        let attempt = format!("{}/{}", r.attempt + 1, r.max_retries);
        let error = r.error.as_ref().map(|e| e.to_string());
        match &r.outcome {
            AttemptOutcome::Success => info!(
                target: "ads_lib_rust::executor",
                platform = r.platform.as_str(),
                operation = r.operation.as_str(),
                url = r.url.as_str(),
                attempt = attempt.as_str(),
                status_code = r.status_code,
                duration_ms = r.duration_ms,
                request_id = r.client_request_id.as_str(),
                "request succeeded"
            ),
            AttemptOutcome::Retrying { delay_ms } => warn!(
                target: "ads_lib_rust::executor",
                platform = r.platform.as_str(),
                operation = r.operation.as_str(),
                url = r.url.as_str(),
                attempt = attempt.as_str(),
                status_code = r.status_code,
                duration_ms = r.duration_ms,
                delay_ms = *delay_ms,
                error = error.as_deref(),
                request_id = r.client_request_id.as_str(),
                "request failed, retrying"
            ),
            AttemptOutcome::AuthRefreshed => warn!(
                target: "ads_lib_rust::executor",
                platform = r.platform.as_str(),
                operation = r.operation.as_str(),
                url = r.url.as_str(),
                attempt = attempt.as_str(),
                status_code = r.status_code,
                error = error.as_deref(),
                request_id = r.client_request_id.as_str(),
                "credential rejected, refreshed and retrying"
            ),
            AttemptOutcome::Failed => error!(
                target: "ads_lib_rust::executor",
                platform = r.platform.as_str(),
                operation = r.operation.as_str(),
                url = r.url.as_str(),
                attempt = attempt.as_str(),
                status_code = r.status_code,
                duration_ms = r.duration_ms,
                error = error.as_deref(),
                request_id = r.client_request_id.as_str(),
                "request failed"
            ),
        }
    }
}

/// Discards every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl AttemptObserver for NoopObserver {
    fn record(&self, _record: &AttemptRecord) {}
}

/// In-memory observer for testing.
#[derive(Debug, Default, Clone)]
pub struct InMemoryObserver {
    records: Arc<Mutex<Vec<AttemptRecord>>>,
}

impl InMemoryObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AttemptRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn failures(&self) -> Vec<AttemptRecord> {
        self.records().into_iter().filter(|r| r.is_failure()).collect()
    }

    pub fn successes(&self) -> Vec<AttemptRecord> {
        self.records().into_iter().filter(|r| r.is_success()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut r) = self.records.lock() {
            r.clear();
        }
    }
}

impl AttemptObserver for InMemoryObserver {
    fn record(&self, record: &AttemptRecord) {
        if let Ok(mut r) = self.records.lock() {
            r.push(record.clone());
        }
    }
}

/// Composite observer for multiple destinations.
#[derive(Default, Clone)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn AttemptObserver>>,
}

impl CompositeObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn AttemptObserver>) -> Self {
        self.observers.push(observer);
        self
    }
}

impl AttemptObserver for CompositeObserver {
    fn record(&self, record: &AttemptRecord) {
        for o in &self.observers {
            o.record(record);
        }
    }
}

pub fn tracing_observer() -> Arc<dyn AttemptObserver> {
    Arc::new(TracingObserver)
}
