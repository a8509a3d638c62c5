//! Error types for the todo API client and the layers above it.
//!
//! # Design
//! `Unauthorized` gets a dedicated variant because a 401 ends the session,
//! while every other non-2xx response is a transient `RequestFailed` carrying
//! the status and the server's message. The synchronizer folds `ApiError`
//! into the smaller `SyncError` taxonomy the presentation layer sees.

use thiserror::Error;

use crate::types::TodoId;

/// Errors returned by `TodoClient` parse methods and by transports.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The server returned 401; the bearer token is no longer accepted.
    #[error("unauthorized")]
    Unauthorized,

    /// The server returned a non-2xx status other than 401.
    #[error("HTTP {status}: {message}")]
    RequestFailed { status: u16, message: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// The request never produced a response.
    #[error("transport failed: {0}")]
    Transport(String),
}

/// Errors surfaced by `TodoSync` operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The server rejected the session. The synchronizer is now
    /// `SessionInvalid` and the caller should log out.
    #[error("Authentication failed. Please log in again.")]
    Unauthorized,

    /// The session was already invalidated; no request was sent.
    #[error("session is no longer valid")]
    SessionInvalid,

    /// A transient failure. Local state is unchanged and the call may be
    /// retried.
    #[error("request failed: {message}")]
    RequestFailed { status: Option<u16>, message: String },

    /// The list endpoint answered with JSON that is not an array.
    #[error("server returned a malformed todo list")]
    MalformedList { raw: String },

    /// Input rejected before any request was made.
    #[error("invalid todo: {0}")]
    Validation(String),

    #[error("todo {0} is not in the local collection")]
    UnknownTodo(TodoId),
}

impl From<ApiError> for SyncError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized => SyncError::Unauthorized,
            ApiError::RequestFailed { status, message } => SyncError::RequestFailed {
                status: Some(status),
                message,
            },
            other => SyncError::RequestFailed {
                status: None,
                message: other.to_string(),
            },
        }
    }
}

/// Errors from the durable session storage.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("session storage is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Errors surfaced by `TodoApp`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Login or signup was refused; the message is user-facing.
    #[error("{0}")]
    Auth(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
