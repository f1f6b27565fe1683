//! Error types for the recommendation client
//!
//! HTTP status failures are not errors here: they come back as a
//! [`RawResponse`](crate::api::RawResponse) and are classified by the
//! controller. These variants cover what happens *around* a response.

use thiserror::Error;

/// Custom Result type using our Error
pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    /// The request never produced a response (connection refused, body read failure, ...)
    #[error("{0}")]
    Transport(String),

    /// A 2xx body that was not the JSON we expected
    #[error("{0}")]
    Parse(#[from] serde_json::Error),

    /// Credential persistence is unavailable
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}
