//! A long-lived handle on one reaction dialog.
//!
//! The session keeps the last full roster so lookups can skip scrolling, drops
//! it when the user switches to another emoji, and refuses to start a second
//! scan while one is running.

use std::cell::{Cell, RefCell};

use rollcore_config::ScanSettings;
use rollcore_entry::EntryMap;
use rollcore_host::{Clipboard, Host};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::clipboard::copy_text;
use crate::dialog::{active_selection_fingerprint, locate_reaction_dialog};
use crate::scan::{ScanProgress, Scanner};
use crate::service::{FindResult, LoadResult};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("a scan is already running")]
    Busy,
    #[error("nothing to copy yet; load the roster first")]
    NothingToCopy,
    #[error("clipboard copy failed")]
    CopyFailed,
}

#[derive(Debug, Default)]
struct RosterCache {
    list: Vec<String>,
    entries: EntryMap,
    selection: String,
}

struct BusyGuard<'a>(&'a Cell<bool>);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

pub struct RosterSession<H: Host> {
    host: H,
    dialog: H::Node,
    settings: ScanSettings,
    busy: Cell<bool>,
    scanner: RefCell<Option<Scanner<H::Node>>>,
    cache: RefCell<RosterCache>,
    progress: watch::Sender<ScanProgress>,
}

impl<H: Host> RosterSession<H> {
    pub fn new(host: H, dialog: H::Node, settings: ScanSettings) -> Self {
        let (progress, _) = watch::channel(ScanProgress::default());
        Self {
            scanner: RefCell::new(Some(Scanner::new(settings.clone()))),
            host,
            dialog,
            settings,
            busy: Cell::new(false),
            cache: RefCell::new(RosterCache::default()),
            progress,
        }
    }

    /// Binds to the first reaction dialog under `root`, if one is open.
    pub fn attach(host: H, root: &H::Node, settings: ScanSettings) -> Option<Self> {
        let dialog = locate_reaction_dialog(&host, root, &settings)?;
        Some(Self::new(host, dialog, settings))
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn dialog(&self) -> &H::Node {
        &self.dialog
    }

    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<ScanProgress> {
        self.progress.subscribe()
    }

    /// Last roster lines shown to the user.
    pub fn list(&self) -> Vec<String> {
        self.cache.borrow().list.clone()
    }

    pub fn cached_entries(&self) -> EntryMap {
        self.cache.borrow().entries.clone()
    }

    fn enter(&self) -> Result<BusyGuard<'_>, SessionError> {
        if self.busy.replace(true) {
            return Err(SessionError::Busy);
        }
        Ok(BusyGuard(&self.busy))
    }

    fn take_scanner(&self) -> Scanner<H::Node> {
        self.scanner
            .borrow_mut()
            .take()
            .unwrap_or_else(|| Scanner::new(self.settings.clone()))
    }

    fn restore_scanner(&self, scanner: Scanner<H::Node>) {
        *self.scanner.borrow_mut() = Some(scanner);
    }

    /// Drops the cached roster when the selected emoji changed since it was
    /// taken. Returns the current fingerprint.
    fn sync_selection(&self) -> String {
        let current = active_selection_fingerprint(&self.host, &self.dialog);
        let mut cache = self.cache.borrow_mut();
        if !cache.selection.is_empty() && !current.is_empty() && cache.selection != current {
            info!(from = %cache.selection, to = %current, "reaction changed, dropping roster");
            cache.list.clear();
            cache.entries.clear();
            if let Some(scanner) = self.scanner.borrow_mut().as_mut() {
                scanner.reset(&self.dialog);
            }
        }
        current
    }

    pub async fn run_find(&self, query: &str) -> Result<FindResult, SessionError> {
        let _guard = self.enter()?;
        let current = self.sync_selection();
        let cached = self.cached_entries();

        let mut scanner = self.take_scanner();
        let result = scanner
            .find_user(
                &self.host,
                &self.dialog,
                query,
                Some(&cached),
                Some(&self.progress),
            )
            .await;
        self.restore_scanner(scanner);

        let mut cache = self.cache.borrow_mut();
        cache.list = result.list.clone();
        if result.complete && !result.entries.is_empty() {
            cache.entries = result.entries.clone();
        }
        if !cache.entries.is_empty() && !current.is_empty() {
            cache.selection = current;
        }
        debug!(found = result.found, cached = cache.entries.len(), "find stored");
        Ok(result)
    }

    pub async fn run_load_all(&self) -> Result<LoadResult, SessionError> {
        let _guard = self.enter()?;
        let current = self.sync_selection();

        let mut scanner = self.take_scanner();
        let result = scanner
            .load_all_users(&self.host, &self.dialog, Some(&self.progress))
            .await;
        self.restore_scanner(scanner);

        let mut cache = self.cache.borrow_mut();
        cache.list = result.list.clone();
        cache.entries = result.entries.clone();
        if !current.is_empty() {
            cache.selection = current;
        }
        Ok(result)
    }

    /// Copies the last roster, one line per user. Returns how many lines
    /// were copied.
    pub async fn run_copy<C: Clipboard + ?Sized>(
        &self,
        clipboard: &C,
    ) -> Result<usize, SessionError> {
        if self.is_busy() {
            return Err(SessionError::Busy);
        }
        let list = self.list();
        if list.is_empty() {
            return Err(SessionError::NothingToCopy);
        }
        if copy_text(clipboard, &list.join("\n")).await {
            Ok(list.len())
        } else {
            Err(SessionError::CopyFailed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use rollcore_host::fixture::{BuiltFixture, ReactionFixture, ReactionTab};
    use rollcore_host::memory::{MemoryHost, NodeId, RowSpec};
    use rollcore_host::ClipboardError;

    fn users(prefix: &str, count: usize) -> Vec<RowSpec> {
        (0..count)
            .map(|i| RowSpec::new([format!("{prefix} {i}"), format!("@{prefix}{i}")]))
            .collect()
    }

    /// Two emoji tabs with disjoint users.
    fn two_tabs() -> BuiltFixture {
        ReactionFixture {
            tabs: vec![
                ReactionTab {
                    emoji: "👍".to_string(),
                    users: users("thumb", 30),
                },
                ReactionTab {
                    emoji: "🎉".to_string(),
                    users: users("party", 15),
                },
            ],
            ..ReactionFixture::default()
        }
        .build()
    }

    fn session(built: &BuiltFixture) -> RosterSession<MemoryHost> {
        RosterSession::new(built.host.clone(), built.dialog, ScanSettings::default())
    }

    #[derive(Default)]
    struct Sink(RefCell<String>);

    #[async_trait(?Send)]
    impl Clipboard for Sink {
        async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
            *self.0.borrow_mut() = text.to_string();
            Ok(())
        }

        fn copy_via_selection(&self, _text: &str) -> Result<bool, ClipboardError> {
            Ok(false)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn load_then_find_uses_cache() {
        let built = two_tabs();
        let session = session(&built);

        let loaded = session.run_load_all().await.unwrap();
        assert_eq!(loaded.list.len(), 30);

        let wheel_before = built.host.wheel_events();
        let found = session.run_find("@thumb4").await.unwrap();
        assert!(found.found && found.complete);
        assert_eq!(built.host.wheel_events(), wheel_before);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustive_miss_is_cached() {
        let built = two_tabs();
        let session = session(&built);

        let missed = session.run_find("@nobody").await.unwrap();
        assert!(missed.complete);
        assert_eq!(session.cached_entries().len(), 30);
    }

    #[tokio::test(start_paused = true)]
    async fn switching_reaction_drops_roster() {
        let built = two_tabs();
        let session = session(&built);
        session.run_load_all().await.unwrap();

        built.select_tab(1);
        session.sync_selection();
        let scanner = session.scanner.borrow();
        assert!(scanner.as_ref().is_some_and(|s| s.extractor().is_empty()));
        drop(scanner);

        let found = session.run_find("@thumb4").await.unwrap();
        assert!(!found.found);
        assert_eq!(found.entries.len(), 15);
        assert_eq!(found.list[0], "1. party 0 @party0");
        assert_eq!(session.list().len(), 15);
    }

    #[tokio::test(start_paused = true)]
    async fn second_scan_is_refused_while_busy() {
        let built = two_tabs();
        let session = session(&built);

        let (load, find) = tokio::join!(session.run_load_all(), session.run_find("@thumb1"));
        assert_eq!(load.map(|r| r.entries.len()), Ok(30));
        assert_eq!(find.map(|r| r.found), Err(SessionError::Busy));
        assert!(!session.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn copy_requires_a_roster() {
        let built = two_tabs();
        let session = session(&built);
        let sink = Sink::default();

        assert_eq!(session.run_copy(&sink).await, Err(SessionError::NothingToCopy));

        session.run_load_all().await.unwrap();
        assert_eq!(session.run_copy(&sink).await, Ok(30));
        let copied = sink.0.borrow().clone();
        assert!(copied.starts_with("1. thumb 0 @thumb0\n2. thumb 1 @thumb1"));
    }

    #[tokio::test(start_paused = true)]
    async fn progress_reaches_subscribers() {
        let built = two_tabs();
        let session = session(&built);
        let rx = session.subscribe();

        session.run_load_all().await.unwrap();
        let last = rx.borrow().clone();
        assert!(last.done);
        assert_eq!(last.scanned, 30);
    }

    #[test]
    fn attach_requires_reaction_dialog() {
        let built = two_tabs();
        let attached =
            RosterSession::attach(built.host.clone(), &built.root, ScanSettings::default());
        assert_eq!(attached.map(|session| *session.dialog()), Some(built.dialog));

        let empty = MemoryHost::new();
        let root: NodeId = empty.root();
        assert!(RosterSession::attach(empty, &root, ScanSettings::default()).is_none());
    }
}
