//! The authoritative ordered collection of feed images.
//!
//! History pages and live arrivals both land here. The store is a pure
//! reducer: it performs no I/O and cannot fail. Callers serialize access
//! (the synchronizer task is the only writer).

use std::collections::HashSet;
use std::sync::Arc;

use snapfeed_shared::{FeedPage, Image};

/// Newest-first list of images plus the server-reported total.
#[derive(Debug, Default, Clone)]
pub struct FeedStore {
    items: Vec<Image>,
    ids: HashSet<String>,
    total: usize,
    /// Bumped on every change to `items`, used to invalidate derived views.
    revision: u64,
}

impl FeedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[Image] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Merge a history page.
    ///
    /// `offset == 0` replaces the list, anything else appends in page order.
    /// Images already present (typically pushed live while the page was in
    /// flight) are skipped so an id never appears twice.
    ///
    /// `total` takes the server's count but never drops below the number of
    /// items held. A page answered before a live push reports the older,
    /// smaller count while the store already holds the pushed image.
    pub fn apply_page(&mut self, page: FeedPage, offset: usize) {
        if offset == 0 {
            self.items.clear();
            self.ids.clear();
        }

        let before = self.items.len();
        for image in page.images {
            if self.ids.insert(image.id.clone()) {
                self.items.push(image);
            }
        }
        let skipped_all = offset != 0 && self.items.len() == before;

        self.total = page.total.max(self.items.len());
        if !skipped_all {
            self.revision += 1;
        }
    }

    /// Prepend a live arrival unless its id is already present.
    ///
    /// Returns `false` when the image was a duplicate and nothing changed.
    pub fn apply_live_arrival(&mut self, image: Image) -> bool {
        if !self.ids.insert(image.id.clone()) {
            return false;
        }
        self.items.insert(0, image);
        self.total += 1;
        self.revision += 1;
        true
    }

    pub fn has_more(&self) -> bool {
        self.items.len() < self.total
    }

    /// Drop everything, as at synchronizer startup.
    pub fn reset(&mut self) {
        self.items.clear();
        self.ids.clear();
        self.total = 0;
        self.revision += 1;
    }
}

/// Read-only view of the feed handed to UI consumers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedSnapshot {
    pub items: Arc<Vec<Image>>,
    pub total: usize,
    pub loading: bool,
    pub initial_load: bool,
    pub has_more: bool,
    /// Notice from the last failed page fetch, cleared by the next success.
    pub last_error: Option<String>,
}

impl FeedSnapshot {
    pub fn capture(
        store: &FeedStore,
        loading: bool,
        initial_load: bool,
        last_error: Option<String>,
    ) -> Self {
        Self {
            items: Arc::new(store.items().to_vec()),
            total: store.total(),
            loading,
            initial_load,
            has_more: store.has_more(),
            last_error,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    pub(crate) fn image(id: &str, tags: &[&str]) -> Image {
        Image {
            id: id.to_string(),
            title: format!("title {id}"),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            filename: format!("{id}.jpg"),
            storage_path: format!("/uploads/{id}.jpg"),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    fn page(ids: &[&str], total: usize, offset: usize) -> FeedPage {
        FeedPage {
            images: ids.iter().map(|id| image(id, &[])).collect(),
            total,
            offset,
            limit: 20,
        }
    }

    fn ids(store: &FeedStore) -> Vec<&str> {
        store.items().iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn first_page_populates_store() {
        let mut store = FeedStore::new();
        store.apply_page(page(&["A", "B"], 2, 0), 0);

        assert_eq!(ids(&store), vec!["A", "B"]);
        assert_eq!(store.total(), 2);
        assert!(!store.has_more());
    }

    #[test]
    fn live_arrival_is_prepended_and_counted() {
        let mut store = FeedStore::new();
        store.apply_page(page(&["A", "B"], 2, 0), 0);

        assert!(store.apply_live_arrival(image("C", &[])));
        assert_eq!(ids(&store), vec!["C", "A", "B"]);
        assert_eq!(store.total(), 3);
    }

    #[test]
    fn duplicate_live_arrival_is_ignored() {
        let mut store = FeedStore::new();
        store.apply_page(page(&["A", "B"], 2, 0), 0);
        let revision = store.revision();

        assert!(!store.apply_live_arrival(image("A", &[])));
        assert_eq!(ids(&store), vec!["A", "B"]);
        assert_eq!(store.total(), 2);
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn offset_zero_replaces_previous_items() {
        let mut store = FeedStore::new();
        store.apply_page(page(&["A", "B"], 5, 0), 0);
        store.apply_live_arrival(image("Z", &[]));
        store.apply_page(page(&["X", "Y"], 7, 0), 0);

        assert_eq!(ids(&store), vec!["X", "Y"]);
        assert_eq!(store.total(), 7);
        assert!(!store.contains("Z"));
    }

    #[test]
    fn later_pages_append_in_order() {
        let mut store = FeedStore::new();
        store.apply_page(page(&["A", "B"], 4, 0), 0);
        assert!(store.has_more());

        store.apply_page(page(&["C", "D"], 4, 2), 2);
        assert_eq!(ids(&store), vec!["A", "B", "C", "D"]);
        assert!(!store.has_more());
    }

    #[test]
    fn page_overlapping_a_live_arrival_does_not_duplicate() {
        let mut store = FeedStore::new();
        store.apply_page(page(&["A", "B"], 3, 0), 0);
        store.apply_live_arrival(image("N", &[]));

        // The server shifted by one, so the next page repeats B.
        store.apply_page(page(&["B", "C"], 4, 3), 3);
        assert_eq!(ids(&store), vec!["N", "A", "B", "C"]);
        assert!(!store.has_more());
    }

    #[test]
    fn total_never_drops_below_items_held() {
        let mut store = FeedStore::new();
        let first: Vec<String> = (0..20).map(|i| format!("o{i}")).collect();
        let first: Vec<&str> = first.iter().map(String::as_str).collect();
        store.apply_page(page(&first, 40, 0), 0);
        store.apply_live_arrival(image("N", &[]));
        assert_eq!(store.total(), 41);

        // Answered from the server's state before N was pushed.
        let second: Vec<String> = (20..40).map(|i| format!("o{i}")).collect();
        let second: Vec<&str> = second.iter().map(String::as_str).collect();
        store.apply_page(page(&second, 40, 20), 20);

        assert_eq!(store.len(), 41);
        assert_eq!(store.total(), 41);
        assert!(!store.has_more());
    }

    #[test]
    fn reset_empties_the_store() {
        let mut store = FeedStore::new();
        store.apply_page(page(&["A"], 1, 0), 0);
        store.reset();
        assert!(store.is_empty());
        assert_eq!(store.total(), 0);
        assert!(!store.has_more());
    }

    #[test]
    fn snapshot_reflects_store_and_flags() {
        let mut store = FeedStore::new();
        store.apply_page(page(&["A"], 3, 0), 0);
        let snap = FeedSnapshot::capture(&store, true, false, None);
        assert_eq!(snap.items.len(), 1);
        assert_eq!(snap.total, 3);
        assert!(snap.has_more);
        assert!(snap.loading);
        assert!(!snap.initial_load);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Page { len: usize },
        Refresh { len: usize },
        Live { id: u8 },
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..5).prop_map(|len| Op::Page { len }),
            (0usize..5).prop_map(|len| Op::Refresh { len }),
            (0u8..12).prop_map(|id| Op::Live { id }),
        ]
    }

    proptest! {
        #[test]
        fn ids_stay_unique_under_any_interleaving(ops in proptest::collection::vec(op(), 0..40)) {
            let mut store = FeedStore::new();
            let mut next_page_id = 0u8;
            for op in ops {
                match op {
                    Op::Page { len } | Op::Refresh { len } => {
                        let offset = if matches!(op, Op::Refresh { .. }) { 0 } else { store.len() };
                        // Page ids share the live id space so overlaps happen.
                        let ids: Vec<String> = (0..len)
                            .map(|_| { next_page_id = (next_page_id + 1) % 12; next_page_id.to_string() })
                            .collect();
                        let images = ids.iter().map(|id| image(id, &[])).collect();
                        let total = store.total().max(offset + len);
                        store.apply_page(FeedPage { images, total, offset, limit: 20 }, offset);
                    }
                    Op::Live { id } => {
                        store.apply_live_arrival(image(&id.to_string(), &[]));
                    }
                }
                let unique: HashSet<&str> = store.items().iter().map(|i| i.id.as_str()).collect();
                prop_assert_eq!(unique.len(), store.len());
                prop_assert!(store.len() <= store.total());
                prop_assert_eq!(store.has_more(), store.len() < store.total());
            }
        }

        #[test]
        fn live_arrival_is_idempotent(id in "[a-z]{1,6}", existing in proptest::collection::vec("[A-Z]{1,3}", 0..6)) {
            let mut store = FeedStore::new();
            let existing: Vec<String> = existing.into_iter().collect::<HashSet<_>>().into_iter().collect();
            let images: Vec<Image> = existing.iter().map(|id| image(id, &[])).collect();
            store.apply_page(FeedPage { total: images.len(), images, offset: 0, limit: 20 }, 0);

            store.apply_live_arrival(image(&id, &[]));
            let once: Vec<String> = store.items().iter().map(|i| i.id.clone()).collect();
            let total_once = store.total();

            store.apply_live_arrival(image(&id, &[]));
            let twice: Vec<String> = store.items().iter().map(|i| i.id.clone()).collect();
            prop_assert_eq!(once, twice);
            prop_assert_eq!(total_once, store.total());
        }

        #[test]
        fn append_preserves_previous_order(first in 0usize..6, second in 0usize..6) {
            let mut store = FeedStore::new();
            let head: Vec<String> = (0..first).map(|i| format!("h{i}")).collect();
            let tail: Vec<String> = (0..second).map(|i| format!("t{i}")).collect();
            let total = first + second;

            let head_images: Vec<Image> = head.iter().map(|id| image(id, &[])).collect();
            store.apply_page(FeedPage { images: head_images, total, offset: 0, limit: 20 }, 0);
            prop_assert_eq!(store.items().iter().map(|i| i.id.clone()).collect::<Vec<_>>(), head.clone());

            let tail_images: Vec<Image> = tail.iter().map(|id| image(id, &[])).collect();
            store.apply_page(FeedPage { images: tail_images, total, offset: first, limit: 20 }, first);

            let expected: Vec<String> = head.into_iter().chain(tail).collect();
            prop_assert_eq!(store.items().iter().map(|i| i.id.clone()).collect::<Vec<_>>(), expected);
            prop_assert!(!store.has_more());
        }
    }
}
