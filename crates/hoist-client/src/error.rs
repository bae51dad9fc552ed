//! Error taxonomy for API calls.
//!
//! Sentinel kinds (`NotFound`, `Unauthorized`, `Forbidden`) are unit
//! variants so callers branch on kind with a `match`, never by string
//! matching. Everything outside [200, 300) that is not one of those lands
//! in [`Error::UnexpectedStatus`], which keeps the raw body so callers can
//! attempt a second, endpoint-specific decode of it.

use http::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error returned by client operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The resource does not exist (404). Callers doing existence checks
    /// usually convert this with [`optional`] rather than propagating it.
    #[error("resource not found")]
    NotFound,

    /// Authentication is missing or expired (401).
    #[error("not authorized")]
    Unauthorized,

    /// Authenticated but not allowed (403).
    #[error("forbidden")]
    Forbidden,

    /// Any other non-2xx response. The body is kept verbatim; it often
    /// carries the actionable detail, and some endpoints put a structured
    /// document in it (see [`Error::decode_domain`]).
    #[error("unexpected response (status {status} {status_text}): {body}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// Canonical status text, e.g. `Internal Server Error`.
        status_text: String,
        /// Raw response body.
        body: String,
    },

    /// The server was reachable but sent a body that failed to decode.
    /// Distinct from [`Error::Transport`]: retry logic must be able to
    /// tell "server sent garbage" apart from "server unreachable".
    #[error("malformed response: {0}")]
    Decode(String),

    /// The request never completed: DNS, connect, or mid-stream read
    /// failure.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Local I/O failure, e.g. while walking or extracting an artifact.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify a non-2xx response.
    pub(crate) fn classify(status: StatusCode, body: String) -> Error {
        match status {
            StatusCode::NOT_FOUND => Error::NotFound,
            StatusCode::UNAUTHORIZED => Error::Unauthorized,
            StatusCode::FORBIDDEN => Error::Forbidden,
            _ => Error::UnexpectedStatus {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("").to_string(),
                body,
            },
        }
    }

    /// Attempt the second decode phase: parse the raw body of an
    /// [`Error::UnexpectedStatus`] into an endpoint-specific error type.
    ///
    /// Returns `None` if this is any other kind, or if the body does not
    /// match `T`; in that case the caller surfaces the generic error it
    /// already holds.
    pub fn decode_domain<T: DeserializeOwned>(&self) -> Option<T> {
        match self {
            Error::UnexpectedStatus { body, .. } => serde_json::from_str(body).ok(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

/// Convert `Err(NotFound)` into `Ok(None)`.
///
/// "Not found" is an expected outcome for existence checks, not an
/// exceptional one. Every other error passes through untouched, so a 500
/// or an unreachable server never masquerades as an absent resource.
pub fn optional<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(Error::NotFound) => Ok(None),
        Err(err) => Err(err),
    }
}
