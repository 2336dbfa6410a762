//! Error hierarchy for the managed object store
//!
//! Store operations return [`StoreError`] values that callers branch on.
//! Handler failures are described by [`HandlerError`]; they are logged and
//! counted by the dispatcher and never reach the commit path.

use std::time::Duration;

use config::ConfigError;
use tokio::task::JoinError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Object store failures (lookup, schema validation, commit)
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Configuration loading and validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Infrastructure-level failures (I/O, serialization, background tasks)
    #[error(transparent)]
    System(#[from] SystemError),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

/// Why a staged mutation was rejected during commit validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// Target object does not exist
    NotFound,
    /// Property is unknown for the object's class, or read-only
    InvalidProperty,
    /// Value violates the property type constraint
    InvalidValue(String),
}

impl std::fmt::Display for AbortReason {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            AbortReason::NotFound => f.write_str("object not found"),
            AbortReason::InvalidProperty => f.write_str("invalid property"),
            AbortReason::InvalidValue(detail) => write!(f, "invalid value: {detail}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid property {property} on {dn}")]
    InvalidProperty { dn: String, property: String },

    #[error("Invalid value for {dn}/{property}: {detail}")]
    InvalidValue {
        dn: String,
        property: String,
        detail: String,
    },

    /// A staged mutation failed validation; nothing was applied
    #[error("Transaction aborted at {dn} property {property}: {reason}")]
    TransactionAborted {
        dn: String,
        property: String,
        reason: AbortReason,
    },

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid Dn {dn:?}: {detail}")]
    InvalidDn { dn: String, detail: String },

    #[error("Invalid watch pattern {pattern:?}: {detail}")]
    InvalidPattern { pattern: String, detail: String },

    #[error("No watch subscription for {dn} pattern {pattern:?}")]
    NotWatched { dn: String, pattern: String },

    #[error("No handler registered")]
    NoHandler,

    #[error("Transaction exceeds the limit of {limit} staged mutations")]
    TransactionTooLarge { limit: usize },
}

impl StoreError {
    /// Stable numeric code for callers that report errors as integers
    pub fn code(&self) -> i32 {
        match self {
            StoreError::NotFound(_) => 1,
            StoreError::AlreadyExists(_) => 2,
            StoreError::InvalidProperty { .. } => 3,
            StoreError::InvalidValue { .. } => 4,
            StoreError::TransactionAborted { .. } => 5,
            StoreError::Timeout(_) => 6,
            StoreError::InvalidDn { .. } => 7,
            StoreError::InvalidPattern { .. } => 8,
            StoreError::NotWatched { .. } => 9,
            StoreError::NoHandler => 10,
            StoreError::TransactionTooLarge { .. } => 11,
        }
    }
}

/// Outcome of a handler invocation that did not succeed
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("Handler for subscription {subscription} exceeded its budget of {budget:?}")]
    Timeout { subscription: u64, budget: Duration },

    #[error("Handler for subscription {subscription} rejected the event")]
    Rejected { subscription: u64 },

    #[error("Handler for subscription {subscription} panicked: {source}")]
    Panicked {
        subscription: u64,
        #[source]
        source: JoinError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    TaskFailed(#[from] JoinError),

    #[error("Event dispatcher is not running")]
    DispatcherStopped,

    #[error("Failed to send shutdown signal: {0}")]
    SignalSendFailed(String),
}

impl Error {
    /// Store error carried by this error, if any
    pub fn as_store(&self) -> Option<&StoreError> {
        match self {
            Error::Store(e) => Some(e),
            _ => None,
        }
    }
}
