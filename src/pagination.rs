//! 分页辅助：逐页调用执行器，直到平台不再提供游标或达到页数上限。
//!
//! Caller-side pagination.
//!
//! Each page is an independent [`RequestExecutor::execute_json`] call with
//! its own retry budget; the adapter's [`next_page`](crate::adapter::PlatformAdapter::next_page)
//! decides where the following page lives.

use serde_json::Value;

use crate::adapter::{set_query_param, AdapterConfig, PageCursor};
use crate::executor::{RequestDescriptor, RequestExecutor};
use crate::{Error, ErrorContext, Result};

/// Payloads of every fetched page, in order.
#[derive(Debug, Clone, Default)]
pub struct Pages {
    pub pages: Vec<Value>,
    /// Attempts across all pages.
    pub attempts: u32,
    /// A further page was advertised but the page cap stopped the loop.
    pub truncated: bool,
}

impl Pages {
    /// Concatenate the array found at `pointer` (e.g. `/data`, `/data/list`) in every page.
    pub fn items(&self, pointer: &str) -> Vec<Value> {
        self.pages
            .iter()
            .filter_map(|p| p.pointer(pointer).and_then(Value::as_array))
            .flatten()
            .cloned()
            .collect()
    }
}

/// Apply `cursor` to a copy of the previous page's descriptor.
pub fn advance(mut descriptor: RequestDescriptor, cursor: PageCursor) -> RequestDescriptor {
    match cursor {
        PageCursor::Url(url) => descriptor.url = url,
        PageCursor::Param { name, value } => match descriptor.body.as_mut() {
            Some(Value::Object(body)) => {
                body.insert(name.to_string(), Value::String(value));
            }
            _ => descriptor.url = set_query_param(descriptor.url, name, &value),
        },
    }
    descriptor
}

/// Fetch up to `max_pages` pages starting from `first`.
///
/// Stops at the first error; pages fetched before it are discarded with it.
pub async fn collect_pages(
    executor: &RequestExecutor,
    adapter: &AdapterConfig,
    first: RequestDescriptor,
    max_pages: usize,
) -> Result<Pages> {
    if max_pages == 0 {
        return Err(Error::validation_with_context(
            "max_pages must be at least 1",
            ErrorContext::new().with_field_path("max_pages").with_source("pagination"),
        ));
    }

    let mut out = Pages::default();
    let mut next = Some(first);

    while let Some(descriptor) = next.take() {
        let template = descriptor.clone();
        let response = executor.execute_json(adapter, descriptor).await?;
        out.attempts += response.attempts;
        let cursor = adapter.next_page(&response.payload);
        out.pages.push(response.payload);

        match cursor {
            Some(_) if out.pages.len() >= max_pages => {
                tracing::debug!(
                    platform = adapter.platform_id(),
                    pages = out.pages.len(),
                    "page cap reached; more pages available"
                );
                out.truncated = true;
            }
            Some(cursor) => next = Some(advance(template, cursor)),
            None => {}
        }
    }

    Ok(out)
}
