//! Infinite-scroll trigger driven by the visibility of a sentinel element.
//!
//! Re-entrancy is prevented by the `loading` flag alone: while a page is in
//! flight no further request is produced, however often visibility flickers.

use crate::config::PAGE_SIZE;
use crate::stores::FeedStore;

/// A history request the caller should issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
}

#[derive(Debug, Clone)]
pub struct ScrollTrigger {
    visible: bool,
    page_size: usize,
}

impl Default for ScrollTrigger {
    fn default() -> Self {
        Self::new(PAGE_SIZE)
    }
}

impl ScrollTrigger {
    pub fn new(page_size: usize) -> Self {
        assert!(page_size > 0, "page_size must be greater than 0");
        Self {
            visible: false,
            page_size,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Record a visibility change of the sentinel.
    pub fn set_visible(
        &mut self,
        visible: bool,
        store: &FeedStore,
        loading: bool,
        initial_load: bool,
    ) -> Option<PageRequest> {
        self.visible = visible;
        self.poll(store, loading, initial_load)
    }

    /// Re-evaluate after the feed state changed (a page landed, a live
    /// arrival bumped the total). Fires only while the sentinel is visible.
    pub fn poll(&self, store: &FeedStore, loading: bool, initial_load: bool) -> Option<PageRequest> {
        if !self.visible || loading || initial_load || !store.has_more() {
            return None;
        }
        Some(PageRequest {
            offset: store.len(),
            limit: self.page_size,
        })
    }
}
