//! Snapfeed client - headless entry point.
//!
//! Follows the feed of the configured server and logs every change. An
//! optional argument is used as a tag filter.

use snapfeed_client::search::result_count_label;
use snapfeed_client::{ClientConfig, FeedSession};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    snapfeed_client::logging::init();

    let filter = std::env::args().nth(1).unwrap_or_default();
    let config = ClientConfig::from_env();
    let session = FeedSession::start(config);

    // No viewport here: keep the sentinel "visible" so history is paged in.
    session
        .feed()
        .set_sentinel_visible(true)
        .map_err(anyhow::Error::msg)?;

    let mut updates = session.feed().subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                if let Some(error) = &snapshot.last_error {
                    tracing::warn!("{error}");
                }
                tracing::info!(
                    "feed: {}/{} images, loading={}, live={:?}",
                    snapshot.items.len(),
                    snapshot.total,
                    snapshot.loading,
                    session.connection_state()
                );
                if !filter.trim().is_empty() {
                    let hits = session
                        .feed()
                        .search(filter.clone())
                        .await
                        .map_err(anyhow::Error::msg)?;
                    tracing::info!("filter {filter:?}: {}", result_count_label(hits.len()));
                }
            }
        }
    }

    session.shutdown().await;
    Ok(())
}
