//! Live channel message definitions.

use serde::{Deserialize, Serialize};

use crate::error::FeedError;
use crate::models::Image;

/// Messages pushed by the server over the live channel.
///
/// Serialized as `{ "type": "new_image", "image": { ... } }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    NewImage { image: Image },
}

impl ServerEvent {
    /// Decode a text frame. Unknown `type` tags fail like malformed JSON.
    pub fn decode(text: &str) -> Result<Self, FeedError> {
        serde_json::from_str(text).map_err(|e| FeedError::Decode(e.to_string()))
    }

    pub fn encode(&self) -> Result<String, FeedError> {
        serde_json::to_string(self).map_err(|e| FeedError::Decode(e.to_string()))
    }

    pub fn into_image(self) -> Image {
        match self {
            ServerEvent::NewImage { image } => image,
        }
    }
}
