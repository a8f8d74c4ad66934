//! Error types for rrsync
//!
//! Fatal failures are variants of [`Error`]. Conditions that are expected
//! during reconciliation (a record that is already gone, several records
//! matching one intent) are not errors: they are reported through the
//! outcome types in [`crate::reconcile`].

use thiserror::Error;

use crate::model::RecordType;

/// Result type alias for rrsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for rrsync
#[derive(Error, Debug)]
pub enum Error {
    /// The remote store could not be reached (connect, TLS, timeout)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The remote store answered with a non-success status
    #[error("API error (status {status}): {message}")]
    RemoteApi {
        /// HTTP status code
        status: u16,
        /// Machine-readable error code, if the body could be decoded
        code: Option<String>,
        /// Message as sent by the remote, verbatim
        message: String,
    },

    /// A success response carried a body that could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// A caller-supplied record violates a structural precondition
    #[error("Invalid record: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The operation was cancelled before it could complete
    #[error("Operation cancelled")]
    Cancelled,

    /// A fatal error annotated with the record key it happened on
    #[error("{operation} {record_type} record '{name}' in {domain}: {source}")]
    Operation {
        /// Lifecycle operation (create, read, update, delete)
        operation: &'static str,
        /// Domain the record belongs to
        domain: String,
        /// Record type
        record_type: RecordType,
        /// Record name within the domain
        name: String,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a remote API error
    pub fn remote_api(status: u16, code: Option<String>, message: impl Into<String>) -> Self {
        Self::RemoteApi {
            status,
            code,
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Attach the operation and record key to this error
    ///
    /// Cancellation is left unwrapped so callers can match on it directly.
    pub fn in_operation(
        self,
        operation: &'static str,
        domain: &str,
        record_type: RecordType,
        name: &str,
    ) -> Self {
        match self {
            Self::Cancelled | Self::Operation { .. } => self,
            other => Self::Operation {
                operation,
                domain: domain.to_string(),
                record_type,
                name: name.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, with operation context stripped
    pub fn root(&self) -> &Error {
        match self {
            Self::Operation { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether this error (or the error it wraps) is a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), Self::Cancelled)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
