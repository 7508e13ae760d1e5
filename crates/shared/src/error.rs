//! Error taxonomy shared by the feed client.

use thiserror::Error;

/// Generic notice shown when a history page cannot be loaded.
pub const FEED_FAILURE_NOTICE: &str = "Failed to fetch feed";

/// Failures while talking to the feed endpoint or the live channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// Network failure or non-2xx response. `status` is `None` when no
    /// response was received at all.
    #[error("fetch failed{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Fetch {
        status: Option<u16>,
        message: String,
    },
    /// Body was not the JSON shape we expected.
    #[error("decode failed: {0}")]
    Decode(String),
    /// Transport failure on the live channel.
    #[error("connection failed: {0}")]
    Connection(String),
}

impl FeedError {
    pub fn network(message: impl Into<String>) -> Self {
        FeedError::Fetch {
            status: None,
            message: message.into(),
        }
    }

    pub fn http(status: u16, body: impl Into<String>) -> Self {
        FeedError::Fetch {
            status: Some(status),
            message: body.into(),
        }
    }

    /// The message surfaced to the user. Details stay in the logs.
    pub fn user_message(&self) -> &'static str {
        FEED_FAILURE_NOTICE
    }
}

/// Failures while uploading an image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    /// Rejected before sending.
    #[error("{0}")]
    Validation(String),
    /// The server answered with a non-2xx status; carries its body verbatim.
    #[error("{0}")]
    Rejected(String),
    /// No response was received.
    #[error("Upload failed: could not connect to server")]
    Transport(String),
}

impl UploadError {
    /// Build a rejection from a response body, falling back to a generic
    /// message when the server sent nothing.
    pub fn rejected(body: &str) -> Self {
        if body.is_empty() {
            UploadError::Rejected("Upload failed".to_string())
        } else {
            UploadError::Rejected(body.to_string())
        }
    }
}
