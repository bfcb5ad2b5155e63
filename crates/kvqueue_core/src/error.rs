//! Error types for the async operation pool.

use kvqueue_store::StoreError;
use thiserror::Error;

/// Result type for async pool operations.
pub type AsyncResult<T> = Result<T, AsyncError>;

/// Errors that can occur while submitting or executing async operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsyncError {
    /// Bad submission, unknown operation kind, or the pool is shut down.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of what was wrong.
        message: String,
    },

    /// A cursor could not be opened on the operation's resource.
    #[error("resource unavailable: {uri}")]
    ResourceUnavailable {
        /// The resource that could not be opened.
        uri: String,
        /// The underlying store error.
        source: StoreError,
    },

    /// The underlying insert, remove or search failed.
    #[error("store error: {0}")]
    Store(StoreError),

    /// The key does not exist (terminal outcome of remove and search).
    #[error("key not found")]
    NotFound,

    /// The dispatch queue is at capacity.
    #[error("queue full: {capacity} operations already queued")]
    Busy {
        /// Configured queue capacity.
        capacity: usize,
    },

    /// A completion callback reported failure.
    #[error("callback failed: {message}")]
    Callback {
        /// Description of the failure.
        message: String,
    },

    /// An internal invariant was broken; the affected claim was abandoned.
    #[error("fatal: {message}")]
    Fatal {
        /// Description of the broken invariant.
        message: String,
    },
}

impl AsyncError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a resource unavailable error.
    pub fn resource_unavailable(uri: impl Into<String>, source: StoreError) -> Self {
        Self::ResourceUnavailable {
            uri: uri.into(),
            source,
        }
    }

    /// Creates a callback error.
    pub fn callback(message: impl Into<String>) -> Self {
        Self::Callback {
            message: message.into(),
        }
    }

    /// Creates a fatal error.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal {
            message: message.into(),
        }
    }

    /// Creates the error returned for any call on a stopped pool.
    pub fn shut_down() -> Self {
        Self::invalid_argument("pool is shut down")
    }

    /// Returns true for the terminal "no such key" outcome.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

impl From<StoreError> for AsyncError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound,
            StoreError::ResourceUnavailable { uri, reason } => Self::ResourceUnavailable {
                uri: uri.clone(),
                source: StoreError::ResourceUnavailable { uri, reason },
            },
            other => Self::Store(other),
        }
    }
}
