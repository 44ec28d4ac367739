//! Error types shared by the transport and the browser controller.

use thiserror::Error;

/// Failure of a single round-trip to the file API.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request never produced an HTTP response.
    #[error("network failure: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The addressed file does not exist (404).
    #[error("file not found: {0}")]
    NotFound(String),

    /// The response body could not be understood.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no file selected for upload")]
    NoFileSelected,
}

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("no file with id {0} in the current listing")]
    UnknownEntry(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
