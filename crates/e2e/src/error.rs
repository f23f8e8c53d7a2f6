//! Error types for E2E verification

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Timeout waiting for {what} after {elapsed:?}")]
    Timeout { what: String, elapsed: Duration },

    #[error("Unexpected response: {context} (status {status})")]
    UnexpectedResponse { context: String, status: u16 },

    #[error("Image decode error: {0}")]
    Decode(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(#[from] signage_common::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    pub fn unexpected(context: impl Into<String>, status: u16) -> Self {
        E2eError::UnexpectedResponse {
            context: context.into(),
            status,
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
