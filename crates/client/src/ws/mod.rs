//! Live channel for real-time image announcements.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐   Image    ┌──────────────────┐   FeedSnapshot   ┌──────┐
//! │ LiveConnection │ ─────────▶ │ FeedSynchronizer │ ───────────────▶ │  UI  │
//! │ (reconnects)   │  mpsc      │ (owns FeedStore) │  watch           │      │
//! └────────────────┘            └──────────────────┘                  └──────┘
//! ```
//!
//! The connection never touches the store. It only pushes decoded images
//! into a channel, so the synchronizer can be rebuilt without reconnecting.

mod connection;

pub use connection::{ConnectionState, LiveConnection, ReconnectConfig};
