use crate::transport::RawResponse;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

type PredicateFn = dyn Fn(&RawResponse, &Value) -> bool + Send + Sync;

/// How a platform signals success.
///
/// Most platforms are status-only, but some answer HTTP 200 with an embedded
/// failure code, so the predicate is chosen per platform instead of being
/// inferred from the status.
#[derive(Clone)]
pub enum SuccessPredicate {
    /// HTTP 2xx.
    HttpStatus,
    /// HTTP 2xx and the integer at `pointer` (JSON pointer) equals `success_code`.
    EmbeddedCode {
        pointer: &'static str,
        success_code: i64,
    },
    Custom(Arc<PredicateFn>),
}

impl SuccessPredicate {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&RawResponse, &Value) -> bool + Send + Sync + 'static,
    {
        SuccessPredicate::Custom(Arc::new(f))
    }

    pub fn evaluate(&self, response: &RawResponse, payload: &Value) -> bool {
        match self {
            SuccessPredicate::HttpStatus => response.is_http_success(),
            SuccessPredicate::EmbeddedCode {
                pointer,
                success_code,
            } => {
                response.is_http_success()
                    && crate::classify::code_i64(payload.pointer(pointer)) == Some(*success_code)
            }
            SuccessPredicate::Custom(f) => f(response, payload),
        }
    }
}

impl fmt::Debug for SuccessPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuccessPredicate::HttpStatus => f.write_str("HttpStatus"),
            SuccessPredicate::EmbeddedCode {
                pointer,
                success_code,
            } => f
                .debug_struct("EmbeddedCode")
                .field("pointer", pointer)
                .field("success_code", success_code)
                .finish(),
            SuccessPredicate::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
