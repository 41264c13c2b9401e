use crate::classify::ClassifiedError;
use crate::error_code::ErrorCategory;
use crate::transport::TransportError;
use thiserror::Error;

/// Structured error context for configuration and validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "platforms.meta.retry.max_delay_ms")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected type, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "settings_loader", "adapter_builder")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Unified error type for the executor and its adapters.
///
/// A call either yields a complete payload or exactly one of these.
#[derive(Debug, Error)]
pub enum Error {
    /// Terminal, classified platform failure with all metadata intact.
    #[error("{0}")]
    Api(#[from] ClassifiedError),

    /// No response was received; surfaced unchanged once retries are exhausted.
    #[error("Network transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Request deadline exceeded after {elapsed_ms}ms")]
    DeadlineExceeded { elapsed_ms: u128 },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new validation error with structured context
    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } | Error::Validation { context, .. } => {
                Some(context)
            }
            _ => None,
        }
    }

    /// The classified platform error, if this is one.
    pub fn classified(&self) -> Option<&ClassifiedError> {
        match self {
            Error::Api(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_auth_error(&self) -> bool {
        self.classified().map(|e| e.is_auth_error).unwrap_or(false)
    }

    pub fn is_rate_limit_error(&self) -> bool {
        self.classified().map(|e| e.is_rate_limit_error).unwrap_or(false)
    }

    /// Whether the failure would have been retried had attempts remained.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Api(e) => e.is_retryable,
            Error::Transport(_) => true,
            _ => false,
        }
    }

    /// Normalized category for failures that came from the platform or the network.
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            Error::Api(e) => Some(e.category()),
            Error::Transport(_) => Some(ErrorCategory::Network),
            _ => None,
        }
    }
}
