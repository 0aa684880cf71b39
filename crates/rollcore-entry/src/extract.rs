use std::num::NonZeroUsize;

use lru::LruCache;
use rollcore_host::Host;
use tracing::trace;

use crate::classify::{attribute_numeric_id, row_lines};
use crate::normalize::normalize_for_match;
use crate::{Entry, ENTRY_LINES};

/// Memo of extracted entries keyed by a content fingerprint.
///
/// Keys are derived from what a row shows, not from the node handle, so a row
/// the virtualizer destroyed and re-created still hits the cache.
#[derive(Debug)]
pub struct EntryExtractor {
    cache: LruCache<String, Entry>,
    hits: u64,
    misses: u64,
}

impl EntryExtractor {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    pub fn fingerprint<H: Host>(host: &H, row: &H::Node) -> String {
        let identity = host
            .attribute(row, "data-list-item-id")
            .or_else(|| host.attribute(row, "data-user-id"))
            .unwrap_or_default();
        format!(
            "{}|{}|{}",
            normalize_for_match(&host.text_content(row)),
            host.child_element_count(row),
            identity
        )
    }

    pub fn extract<H: Host>(&mut self, host: &H, row: &H::Node) -> Entry {
        let fingerprint = Self::fingerprint(host, row);
        if let Some(entry) = self.cache.get(&fingerprint) {
            self.hits += 1;
            trace!(signature = %entry.signature, "entry cache hit");
            return entry.clone();
        }

        self.misses += 1;
        let lines = row_lines(&host.inner_text(row), ENTRY_LINES);
        let user_id = attribute_numeric_id(host, row);
        let entry = Entry::from_parts(lines, user_id);
        self.cache.put(fingerprint, entry.clone());
        entry
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rollcore_host::fixture::ReactionFixture;
    use rollcore_host::memory::{MemoryHost, RowSpec};

    fn single_row_host(spec: RowSpec) -> (MemoryHost, rollcore_host::memory::NodeId) {
        let built = ReactionFixture::with_users(vec![spec]).build();
        let row = built.host.mounted_rows(built.scroller)[0];
        (built.host, row)
    }

    #[test]
    fn repeated_extraction_hits_cache() {
        let (host, row) = single_row_host(RowSpec::new(["Nyarla", "@nyarla.dev"]));
        let mut extractor = EntryExtractor::new(16);

        let first = extractor.extract(&host, &row);
        let second = extractor.extract(&host, &row);
        assert_eq!(first, second);
        assert_eq!((extractor.hits(), extractor.misses()), (1, 1));
    }

    #[test]
    fn changed_text_misses_cache() {
        let (host, row) = single_row_host(RowSpec::new(["Nyarla", "@nyarla.dev"]));
        let mut extractor = EntryExtractor::new(16);
        extractor.extract(&host, &row);

        let extra = host.append(row, "div");
        host.set_text(extra, "Server Booster");
        let entry = extractor.extract(&host, &row);
        assert_eq!(extractor.misses(), 2);
        assert_eq!(entry.lines, vec!["Nyarla", "@nyarla.dev", "Server Booster"]);
    }

    #[test]
    fn id_comes_from_list_item_attribute() {
        let (host, row) = single_row_host(
            RowSpec::new(["Nyarla", "@nyarla.dev"]).with_id("123456789012345678"),
        );
        let entry = EntryExtractor::new(4).extract(&host, &row);
        assert_eq!(entry.user_id, "123456789012345678");
        assert_eq!(entry.signature, "123456789012345678");
    }

    #[test]
    fn profile_link_supplies_id() {
        let (host, row) = single_row_host(RowSpec::new(["Nyarla", "@nyarla.dev"]));
        let link = host.append(row, "a");
        host.set_attr(link, "href", "/users/223456789012345678");
        let entry = EntryExtractor::new(4).extract(&host, &row);
        assert_eq!(entry.user_id, "223456789012345678");
    }

    #[test]
    fn capacity_bounds_memo() {
        let built = ReactionFixture::with_users(
            (0..5)
                .map(|i| RowSpec::new([format!("User {i}"), format!("@user{i}")]))
                .collect(),
        )
        .build();
        let mut extractor = EntryExtractor::new(2);
        for row in built.host.mounted_rows(built.scroller) {
            extractor.extract(&built.host, &row);
        }
        assert_eq!(extractor.len(), 2);
    }
}
