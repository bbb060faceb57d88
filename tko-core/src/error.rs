//! Error taxonomy shared by every TKO layer
//!
//! Errors are flat categories rather than a type hierarchy. Stores, the
//! validating decorator and the controllers all speak in these kinds, so a
//! caller can decide whether to fix its input, retry, or give up.

use thiserror::Error;

/// Result type alias for TKO operations
pub type Result<T> = std::result::Result<T, TkoError>;

/// Errors that can occur when talking to a TKO backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TkoError {
    /// The store lacks an optional capability
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Caller supplied invalid input
    #[error("bad argument: {0}")]
    BadArgument(String),

    /// The store declined or could not complete the request
    #[error("not done: {0}")]
    NotDone(String),

    /// Referenced entity, token, or plugin does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// A modification is already in flight
    #[error("busy: {0}")]
    Busy(String),

    /// A modification token expired
    #[error("timeout: {0}")]
    Timeout(String),
}

impl TkoError {
    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::NotImplemented(message.into())
    }

    pub fn bad_argument(message: impl Into<String>) -> Self {
        Self::BadArgument(message.into())
    }

    pub fn not_done(message: impl Into<String>) -> Self {
        Self::NotDone(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn busy(message: impl Into<String>) -> Self {
        Self::Busy(message.into())
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout(message.into())
    }

    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented(_))
    }

    pub fn is_bad_argument(&self) -> bool {
        matches!(self, Self::BadArgument(_))
    }

    pub fn is_not_done(&self) -> bool {
        matches!(self, Self::NotDone(_))
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Whether the caller may reasonably retry the same request later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NotDone(_) | Self::Busy(_))
    }
}
