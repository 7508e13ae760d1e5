//! Wires the API client, live connection and synchronizer together for one
//! session.

use std::sync::Arc;

use futures_channel::mpsc::unbounded;
use snapfeed_shared::{Image, UploadError, UploadForm};

use crate::api_client::ApiClient;
use crate::config::ClientConfig;
use crate::sync::{FeedSynchronizer, SyncHandle};
use crate::ws::{ConnectionState, LiveConnection, ReconnectConfig};

pub struct FeedSession {
    api: ApiClient,
    live: LiveConnection,
    feed: SyncHandle,
}

impl FeedSession {
    /// Connect the live channel and start loading the first page.
    pub fn start(config: ClientConfig) -> Self {
        Self::start_with(config, ReconnectConfig::default())
    }

    pub fn start_with(config: ClientConfig, reconnect: ReconnectConfig) -> Self {
        let api = ApiClient::new(config.clone());
        let (arrivals_tx, arrivals_rx) = unbounded();
        let live = LiveConnection::spawn(config.live_url(), reconnect, arrivals_tx);
        let feed = FeedSynchronizer::spawn(Arc::new(api.clone()), arrivals_rx);
        tracing::info!("feed session started against {}", config.api_url);
        Self { api, live, feed }
    }

    pub fn feed(&self) -> &SyncHandle {
        &self.feed
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.live.state()
    }

    /// Upload an image and reload the feed on success.
    pub async fn upload(&self, form: &UploadForm) -> Result<Option<Image>, UploadError> {
        let created = self.api.upload(form).await?;
        if let Err(e) = self.feed.refresh() {
            tracing::warn!("could not refresh feed after upload: {e}");
        }
        Ok(created)
    }

    /// Stop the synchronizer, close the live channel and cancel any pending
    /// reconnect.
    pub async fn shutdown(self) {
        self.feed.shutdown().await;
        self.live.shutdown().await;
        tracing::info!("feed session closed");
    }
}
