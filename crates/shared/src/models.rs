//! Wire models for the image feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::UploadError;

/// Largest image the client will send, enforced before upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// MIME types the upload endpoint accepts.
pub const ACCEPTED_IMAGE_TYPES: [&str; 2] = ["image/jpeg", "image/png"];

// --- Feed ---

/// One uploaded image record. Immutable once received.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Image {
    /// Server-assigned, unique across the feed.
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub filename: String,
    /// Server-relative storage path, e.g. `/uploads/<id>.jpg`.
    #[serde(rename = "url")]
    pub storage_path: String,
    pub created_at: DateTime<Utc>,
}

impl Image {
    pub fn has_tags(&self) -> bool {
        !self.tags.is_empty()
    }
}

/// One server-returned batch of images plus pagination metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedPage {
    pub images: Vec<Image>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

// --- Upload ---

/// A pending upload as collected from the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadForm {
    pub title: String,
    /// Comma-separated tag list, sent as typed.
    pub tags: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadForm {
    /// Client-side checks run before anything is sent.
    pub fn validate(&self) -> Result<(), UploadError> {
        if self.title.trim().is_empty() {
            return Err(UploadError::Validation("title is required".to_string()));
        }
        if !ACCEPTED_IMAGE_TYPES.contains(&self.content_type.as_str()) {
            return Err(UploadError::Validation(
                "only JPEG and PNG images are accepted".to_string(),
            ));
        }
        if self.bytes.len() > MAX_UPLOAD_BYTES {
            return Err(UploadError::Validation(
                "file too large (max 10 MB)".to_string(),
            ));
        }
        Ok(())
    }
}

/// Split a comma-separated tag string, trimming and dropping empty entries.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
