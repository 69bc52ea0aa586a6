//! Unified error handling for the search provider
//!
//! Every layer (codec, coalescing engine, activation, transport) reports
//! failures through [`ProviderError`], so a single error reply can be
//! produced for any inbound call.

use std::fmt;

/// Unified error types for the search provider
#[derive(Debug, Clone)]
pub enum ProviderError {
    /// Malformed compound item identifier
    InvalidItemId(String),

    /// Malformed node path inside an item identifier
    InvalidNodePath(String),

    /// The item's channel context conflicts with the invoking endpoint
    WrongChannel { item_id: String, channel_id: String },

    /// Opaque failure surfaced verbatim from the backend daemon
    Backend(String),

    /// The coalescing session was superseded before it completed
    Cancelled,

    /// No endpoint is served at the given object path
    NotFound(String),

    /// Configuration-related errors
    Configuration(String),

    /// The external launcher could not be started
    Launch(String),

    /// Internal system errors
    Internal(String),
}

impl ProviderError {
    /// Stable short name for the error kind, used to build transport error names.
    pub fn error_name(&self) -> &'static str {
        match self {
            ProviderError::InvalidItemId(_) => "InvalidItemId",
            ProviderError::InvalidNodePath(_) => "InvalidNodePath",
            ProviderError::WrongChannel { .. } => "WrongChannel",
            ProviderError::Backend(_) => "BackendFailure",
            ProviderError::Cancelled => "Cancelled",
            ProviderError::NotFound(_) => "NotFound",
            ProviderError::Configuration(_) => "Configuration",
            ProviderError::Launch(_) => "Launch",
            ProviderError::Internal(_) => "Internal",
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProviderError::Cancelled)
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::InvalidItemId(id) => write!(f, "{id} is not a valid item id"),
            ProviderError::InvalidNodePath(path) => write!(f, "{path} is not a valid node path"),
            ProviderError::WrongChannel {
                item_id,
                channel_id,
            } => write!(f, "item id {item_id} does not belong in channel {channel_id}"),
            ProviderError::Backend(msg) => write!(f, "Backend error: {msg}"),
            ProviderError::Cancelled => write!(f, "Search was cancelled"),
            ProviderError::NotFound(path) => write!(f, "No search provider at {path}"),
            ProviderError::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            ProviderError::Launch(msg) => write!(f, "Launch error: {msg}"),
            ProviderError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Result type alias for provider operations
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    fn with_context(self, context: &str) -> ProviderResult<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: fmt::Display,
{
    fn with_context(self, context: &str) -> ProviderResult<T> {
        self.map_err(|e| ProviderError::Internal(format!("{context}: {e}")))
    }
}

/// Convenience macros for error creation
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::core::error::ProviderError::Configuration($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::error::ProviderError::Configuration(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::core::error::ProviderError::Internal($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::error::ProviderError::Internal(format!($fmt, $($arg)*))
    };
}
