use std::hash::Hash;

use rollcore_entry::{Entry, EntryMap};
use rollcore_host::{Host, ScrollAlign};
use rollcore_match::{find_entry, MatchQuery};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::roster::format_roster;
use crate::scan::{ScanOptions, ScanProgress, Scanner};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FindResult {
    pub list: Vec<String>,
    pub entries: EntryMap,
    pub found: bool,
    /// `entries` is the whole roster: it came from the cache, or the scan
    /// ran without finding the target.
    pub complete: bool,
    pub found_entry: Option<Entry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadResult {
    pub list: Vec<String>,
    pub entries: EntryMap,
}

/// Highlights `row` and centers it in its viewport.
pub fn mark_found<H: Host>(host: &H, row: &H::Node) {
    host.set_highlight(row, true);
    host.scroll_into_view(row, ScrollAlign::Center);
}

impl<N: Clone + Eq + Hash + std::fmt::Debug> Scanner<N> {
    /// Clears the highlight from every row currently rendered in `dialog`.
    pub fn clear_highlight<H: Host<Node = N>>(&mut self, host: &H, dialog: &N) {
        let settings = self.settings.clone();
        let scroller = self.locator.locate(host, dialog, &settings);
        for row in self.visible_rows(host, dialog, scroller.as_ref()) {
            host.set_highlight(&row, false);
        }
    }

    /// Finds `query` in the dialog's list.
    ///
    /// A non-empty `cache` answers without scrolling; the matching row is
    /// still highlighted when it happens to be rendered. Otherwise this scans
    /// until the first match.
    pub async fn find_user<H: Host<Node = N>>(
        &mut self,
        host: &H,
        dialog: &N,
        query: &str,
        cache: Option<&EntryMap>,
        progress: Option<&watch::Sender<ScanProgress>>,
    ) -> FindResult {
        self.clear_highlight(host, dialog);

        let query = query.trim();
        let Some(parsed) = MatchQuery::parse(query) else {
            return FindResult::default();
        };

        if let Some(cache) = cache.filter(|cache| !cache.is_empty()) {
            let found_entry = find_entry(cache, query).cloned();
            debug!(hit = found_entry.is_some(), "query answered from cache");

            let settings = self.settings.clone();
            let scroller = self.locator.locate(host, dialog, &settings);
            let rows = self.visible_rows(host, dialog, scroller.as_ref());
            let visible = rows
                .into_iter()
                .find(|row| parsed.matches(&self.extractor.extract(host, row)));
            if let Some(row) = visible {
                mark_found(host, &row);
            }

            return FindResult {
                list: format_roster(cache),
                entries: cache.clone(),
                found: found_entry.is_some(),
                complete: true,
                found_entry,
            };
        }

        let outcome = self
            .scan(
                host,
                dialog,
                ScanOptions::search(query).with_progress(progress),
            )
            .await;

        let found_entry = outcome.found_row.as_ref().map(|row| {
            mark_found(host, row);
            self.extractor.extract(host, row)
        });
        info!(
            found = found_entry.is_some(),
            entries = outcome.entries.len(),
            "find finished"
        );

        FindResult {
            list: format_roster(&outcome.entries),
            entries: outcome.entries,
            found: found_entry.is_some(),
            complete: found_entry.is_none(),
            found_entry,
        }
    }

    /// Scans the whole list and returns every entry in discovery order.
    pub async fn load_all_users<H: Host<Node = N>>(
        &mut self,
        host: &H,
        dialog: &N,
        progress: Option<&watch::Sender<ScanProgress>>,
    ) -> LoadResult {
        self.clear_highlight(host, dialog);
        let outcome = self
            .scan(host, dialog, ScanOptions::load().with_progress(progress))
            .await;
        LoadResult {
            list: format_roster(&outcome.entries),
            entries: outcome.entries,
        }
    }
}
