//! Error types for the shopchat engine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShopchatError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("endpoint returned status {0}")]
    BadStatus(u16),

    #[error("stream read failed: {0}")]
    StreamRead(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
