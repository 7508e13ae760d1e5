//! HTTP API client for the feed and upload endpoints.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use snapfeed_shared::{FeedError, FeedPage, Image, UploadError, UploadForm};

use crate::config::ClientConfig;

/// Anything that can serve history pages.
///
/// One call issues one request. Implementations do not retry.
#[async_trait]
pub trait PageSource: Send + Sync + 'static {
    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<FeedPage, FeedError>;
}

/// HTTP client for the feed server.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    async fn get_json<TRes: DeserializeOwned>(&self, url: &str) -> Result<TRes, FeedError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeedError::network(e.to_string()))?;

        let status = resp.status().as_u16();
        let is_success = resp.status().is_success();

        let text = resp
            .text()
            .await
            .map_err(|e| FeedError::network(format!("failed to read body: {e}")))?;

        if !is_success {
            return Err(FeedError::http(status, text));
        }

        serde_json::from_str(&text).map_err(|e| FeedError::Decode(e.to_string()))
    }

    /// Upload an image. The form is validated before anything is sent.
    ///
    /// Returns the created record when the server echoes one back.
    pub async fn upload(&self, form: &UploadForm) -> Result<Option<Image>, UploadError> {
        form.validate()?;

        let part = Part::bytes(form.bytes.clone())
            .file_name(form.file_name.clone())
            .mime_str(&form.content_type)
            .map_err(|e| UploadError::Validation(e.to_string()))?;
        let multipart = Form::new()
            .text("title", form.title.trim().to_string())
            .text("tags", form.tags.trim().to_string())
            .part("image", part);

        let resp = self
            .client
            .post(self.config.upload_url())
            .multipart(multipart)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("upload transport failure: {e}");
                UploadError::Transport(e.to_string())
            })?;

        let is_success = resp.status().is_success();
        let text = resp
            .text()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        if !is_success {
            return Err(UploadError::rejected(&text));
        }

        Ok(serde_json::from_str::<Image>(&text).ok())
    }
}

#[async_trait]
impl PageSource for ApiClient {
    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<FeedPage, FeedError> {
        let url = self.config.feed_url(offset, limit);
        tracing::debug!("fetching page offset={offset} limit={limit}");
        self.get_json(&url).await
    }
}
