//! Error types for the fleet API client.
//!
//! # Design
//! Every `ApiError` variant carries the human-readable message the UI shows,
//! and `Display` prints exactly that message. The variant tells the caller
//! *why* the call failed; the message tells the user *what* failed. Field
//! level validation detail rides along in `Validation::errors` so forms can
//! attribute messages to individual inputs.

use std::collections::BTreeMap;

use thiserror::Error;

/// Field name to the list of validation messages the backend reported for it.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Failure of the HTTP round-trip itself: no response was received.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),
}

/// Errors surfaced by the strict ("fail on error") call convention.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// Network or connection failure. The message is the operation's fallback
    /// text; the raw transport error is kept as the source for logging.
    #[error("{message}")]
    Transport {
        message: String,
        #[source]
        source: TransportError,
    },

    /// The backend answered 401. The session side effects already ran in the
    /// client wrapper by the time a caller sees this.
    #[error("{message}")]
    Unauthorized { message: String },

    /// A 4xx reply carrying structured field errors.
    #[error("{message}")]
    Validation { message: String, errors: FieldErrors },

    /// The backend answered 404 for this resource.
    #[error("{message}")]
    NotFound { message: String },

    /// Any other non-2xx status.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// A 2xx reply whose envelope said `success: false`.
    #[error("{message}")]
    Rejected { message: String },

    /// The body was not JSON or `data` did not have the expected shape.
    #[error("{message}")]
    MalformedResponse { message: String },

    /// The request payload could not be encoded.
    #[error("failed to encode request: {0}")]
    Serialization(String),

    /// The current user's profile could not be loaded.
    #[error("{0}")]
    ProfileLoad(String),
}

impl ApiError {
    /// Field-level validation errors, when the failure carried any.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            ApiError::Validation { errors, .. } => Some(errors),
            _ => None,
        }
    }

    /// HTTP status associated with the failure, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::NotFound { .. } => Some(404),
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors raised by a `SessionStorage` backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("session storage is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}
