//! Error types for the endpoint client.
//!
//! # Design
//! Every failure on the request path collapses into `ApiError::Connection`
//! carrying one human-readable message. Out-of-range statuses, transport
//! failures, undecodable bodies and missing fixtures all look the same to a
//! caller matching on the variant. `FailureKind` rides along for logs and
//! tests but is not part of the message.
//!
//! `Configuration` is raised before anything goes on the wire: a bad base
//! URL, an HTTP client that could not be constructed, or multipart fields
//! passed to a non-upload endpoint.

use thiserror::Error;

/// Message used for every connection failure unless a caller overrides it.
pub const DEFAULT_CONNECTION_MESSAGE: &str = "The connection to the server is unstable.";

/// Result alias used across the crate.
pub type ApiResult<T> = Result<T, ApiError>;

/// What went wrong underneath a connection error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The response status fell outside the endpoint's acceptable range.
    Status(u16),
    /// The transport could not complete the round trip.
    Transport(String),
    /// The body could not be decoded into the requested type.
    Decode(String),
    /// The response body was empty or whitespace only.
    MissingValue,
    /// A fixture file was missing or unreadable.
    Fixture(String),
}

/// Errors returned by `ApiClient` and `MockLoader`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The single error kind seen by callers of the request path.
    #[error("{message}")]
    Connection { message: String, kind: FailureKind },

    /// The client was misconfigured; no request was sent.
    #[error("invalid client configuration: {0}")]
    Configuration(String),
}

impl ApiError {
    /// Connection error with the default message.
    pub fn connection(kind: FailureKind) -> Self {
        ApiError::Connection {
            message: DEFAULT_CONNECTION_MESSAGE.to_string(),
            kind,
        }
    }

    /// Returns the failure kind for connection errors.
    pub fn kind(&self) -> Option<&FailureKind> {
        match self {
            ApiError::Connection { kind, .. } => Some(kind),
            ApiError::Configuration(_) => None,
        }
    }

    /// Status code that caused the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self.kind() {
            Some(FailureKind::Status(status)) => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::connection(FailureKind::Transport(err.to_string()))
    }
}
