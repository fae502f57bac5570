//! Error types for talking to the remote calendar API.

use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur while authenticating or importing events.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("{0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Device code expired before the authorization was approved")]
    DeviceCodeExpired,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Authorization failed: {error}{}", describe(.description))]
    Authorization { error: String, description: String },

    #[error("Request failed with status {status}: {body}")]
    Http { status: StatusCode, body: String },

    #[error("Token response did not contain an access_token")]
    MissingAccessToken,

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Token file {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Import stopped after {inserted} event(s): failed to insert '{summary}'")]
    Insert {
        inserted: usize,
        summary: String,
        #[source]
        source: Box<RemoteError>,
    },
}

fn describe(description: &str) -> String {
    if description.is_empty() {
        String::new()
    } else {
        format!(" ({})", description)
    }
}

impl RemoteError {
    pub(crate) fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RemoteError::Persistence {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for remote operations.
pub type RemoteResult<T> = Result<T, RemoteError>;
