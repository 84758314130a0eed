use thiserror::Error;

use crate::types::LabelId;

/// Errors raised by cache operations, the backend and the view.
#[derive(Debug, Error)]
pub enum Error {
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed backend response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid backend URL: {0}")]
    InvalidUrl(String),

    #[error("invalid host: {0}")]
    InvalidHost(String),

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("unknown label {0}")]
    UnknownLabel(LabelId),

    #[error("view update failed: {0}")]
    View(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
