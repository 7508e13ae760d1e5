//! Snapfeed client - feed synchronizer for an anonymous image feed.
//!
//! Reconciles the paginated history endpoint with the live push channel,
//! keeps a deduplicated newest-first feed, and filters it by tag.

pub mod api_client;
pub mod config;
pub mod logging;
pub mod scroll;
pub mod search;
pub mod session;
pub mod stores;
pub mod sync;
pub mod ws;

pub use api_client::{ApiClient, PageSource};
pub use config::{ClientConfig, PAGE_SIZE, RECONNECT_DELAY};
pub use search::SearchIndex;
pub use session::FeedSession;
pub use stores::{FeedSnapshot, FeedStore};
pub use sync::{FeedSynchronizer, SyncHandle};
pub use ws::{ConnectionState, LiveConnection, ReconnectConfig};
