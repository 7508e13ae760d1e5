//! Client-side fuzzy filtering of the feed by tag.
//!
//! The index is a derived view of a [`FeedStore`]; it is rebuilt lazily the
//! first time it is queried after the store changes and never mutates it.

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use snapfeed_shared::Image;

use crate::stores::FeedStore;

/// Tags for one feed position.
struct IndexEntry {
    position: usize,
    tags: Vec<String>,
}

pub struct SearchIndex {
    matcher: SkimMatcherV2,
    entries: Vec<IndexEntry>,
    /// `(revision, len)` of the store the entries were built from.
    built_from: Option<(u64, usize)>,
}

impl Default for SearchIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchIndex {
    pub fn new() -> Self {
        Self {
            matcher: SkimMatcherV2::default().ignore_case(),
            entries: Vec::new(),
            built_from: None,
        }
    }

    fn is_stale(&self, store: &FeedStore) -> bool {
        self.built_from != Some((store.revision(), store.len()))
    }

    /// Rebuild the entries if the store changed since the last build.
    pub fn refresh(&mut self, store: &FeedStore) {
        if !self.is_stale(store) {
            return;
        }
        self.entries = store
            .items()
            .iter()
            .enumerate()
            .filter(|(_, image)| image.has_tags())
            .map(|(position, image)| IndexEntry {
                position,
                tags: image.tags.clone(),
            })
            .collect();
        self.built_from = Some((store.revision(), store.len()));
        tracing::trace!("search index rebuilt with {} tagged images", self.entries.len());
    }

    /// Filter the store's images by tag, best match first.
    ///
    /// A blank query returns every image in feed order.
    pub fn search(&mut self, store: &FeedStore, query: &str) -> Vec<Image> {
        let query = query.trim();
        if query.is_empty() {
            return store.items().to_vec();
        }

        self.refresh(store);

        let mut scored: Vec<(i64, usize)> = self
            .entries
            .iter()
            .filter_map(|entry| {
                entry
                    .tags
                    .iter()
                    .filter_map(|tag| self.matcher.fuzzy_match(tag, query))
                    .max()
                    .map(|score| (score, entry.position))
            })
            .collect();

        // Stable, so equal scores keep feed order.
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        let items = store.items();
        scored
            .into_iter()
            .map(|(_, position)| items[position].clone())
            .collect()
    }
}

/// Label for the filter bar, e.g. "1 result" or "3 results".
pub fn result_count_label(count: usize) -> String {
    if count == 1 {
        "1 result".to_string()
    } else {
        format!("{count} results")
    }
}
