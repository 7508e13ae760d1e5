//! In-memory state owned by the synchronizer.

pub mod feed;

pub use feed::{FeedSnapshot, FeedStore};
