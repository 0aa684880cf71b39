//! The adaptive scroll-and-collect loop.

use std::hash::Hash;

use rollcore_config::ScanSettings;
use rollcore_entry::{discover_rows, merge_entry, EntryExtractor, EntryMap};
use rollcore_host::{Host, ScrollAlign};
use rollcore_match::MatchQuery;
use rollcore_viewport::ViewportLocator;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};

/// Offsets closer than this are treated as unchanged.
const MOVE_EPSILON: f64 = 1.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    #[default]
    Search,
    Load,
}

/// Snapshot published after every round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanProgress {
    pub mode: ScanMode,
    pub round: usize,
    pub scanned: usize,
    pub done: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Matched,
    NoViewportStalled,
    NoRowsStalled,
    ReachedEnd,
    RoundCeiling,
}

impl Termination {
    /// Whether the loop ran until the list stopped producing rows.
    pub fn is_exhaustive(self) -> bool {
        !matches!(self, Termination::Matched | Termination::RoundCeiling)
    }
}

pub struct ScanOptions<'a> {
    pub target: Option<&'a str>,
    pub stop_when_found: bool,
    pub mode: ScanMode,
    pub progress: Option<&'a watch::Sender<ScanProgress>>,
}

impl<'a> ScanOptions<'a> {
    pub fn search(target: &'a str) -> Self {
        Self {
            target: Some(target),
            stop_when_found: true,
            mode: ScanMode::Search,
            progress: None,
        }
    }

    pub fn load() -> Self {
        Self {
            target: None,
            stop_when_found: false,
            mode: ScanMode::Load,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Option<&'a watch::Sender<ScanProgress>>) -> Self {
        self.progress = progress;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ScanOutcome<N> {
    pub found_row: Option<N>,
    pub entries: EntryMap,
    pub rounds: usize,
    pub termination: Termination,
    /// Accumulator size after each round.
    pub sizes: Vec<usize>,
}

struct Harvest<N> {
    rows: Vec<N>,
    matched: Option<N>,
    new_seen: usize,
}

/// Owns the per-dialog caches that survive between scans.
#[derive(Debug)]
pub struct Scanner<N> {
    pub(crate) settings: ScanSettings,
    pub(crate) extractor: EntryExtractor,
    pub(crate) locator: ViewportLocator<N>,
}

impl<N: Clone + Eq + Hash + std::fmt::Debug> Scanner<N> {
    pub fn new(settings: ScanSettings) -> Self {
        Self {
            extractor: EntryExtractor::new(settings.entry_cache_capacity),
            locator: ViewportLocator::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    pub fn extractor(&self) -> &EntryExtractor {
        &self.extractor
    }

    /// Forgets the viewport elected for `dialog` and every memoized row.
    /// Used when the dialog starts showing a different roster.
    pub fn reset(&mut self, dialog: &N) {
        self.locator.forget(dialog);
        self.extractor.clear();
    }

    /// Rows to inspect this round: the viewport's rows when it has any,
    /// otherwise everything in the dialog.
    pub(crate) fn visible_rows<H: Host<Node = N>>(
        &self,
        host: &H,
        dialog: &N,
        scroller: Option<&N>,
    ) -> Vec<N> {
        let width = host.layout_size(dialog).width;
        if let Some(scroller) = scroller {
            let scoped = discover_rows(host, scroller, width, &self.settings);
            if !scoped.is_empty() {
                return scoped;
            }
        }
        discover_rows(host, dialog, width, &self.settings)
    }

    fn harvest<H: Host<Node = N>>(
        &mut self,
        host: &H,
        dialog: &N,
        scroller: Option<&N>,
        query: Option<&MatchQuery>,
        entries: &mut EntryMap,
    ) -> Harvest<N> {
        let rows = self.visible_rows(host, dialog, scroller);
        let mut matched = None;
        let mut new_seen = 0;
        for row in &rows {
            let entry = self.extractor.extract(host, row);
            if matched.is_none() && query.is_some_and(|query| query.matches(&entry)) {
                matched = Some(row.clone());
            }
            if merge_entry(entries, entry) {
                new_seen += 1;
            }
        }
        Harvest {
            rows,
            matched,
            new_seen,
        }
    }

    /// Advances the list and returns the offset and content height measured
    /// beforehand.
    fn advance<H: Host<Node = N>>(
        &self,
        host: &H,
        scroller: Option<&N>,
        rows: &[N],
        round: usize,
        stagnant: usize,
    ) -> (f64, f64) {
        let last_row = rows.last();
        let before = scroller.map(|s| host.scroll_metrics(s));

        if let Some(last) = last_row {
            if scroller.is_none()
                || round < self.settings.warmup_rounds
                || stagnant >= self.settings.slow_down_after_stagnant
            {
                host.scroll_into_view(last, ScrollAlign::End);
            }
        }

        match (scroller, before) {
            (Some(scroller), Some(before)) => {
                let step = self.settings.scroll_step(before.client_height);
                let target = (before.scroll_top + step).min(before.max_scroll_top());
                host.set_scroll_top(scroller, target);
                let after = host.scroll_metrics(scroller).scroll_top;
                if (after - before.scroll_top).abs() <= MOVE_EPSILON {
                    if let Err(err) = host.dispatch_wheel(scroller, step) {
                        debug!(%err, "wheel nudge rejected");
                    }
                }
                (before.scroll_top, before.scroll_height)
            }
            _ => {
                if let Some(last) = last_row {
                    if let Err(err) = host.dispatch_wheel(last, self.settings.rowless_wheel_delta)
                    {
                        debug!(%err, "wheel on last row rejected");
                    }
                }
                (0.0, 0.0)
            }
        }
    }

    /// Scrolls through the list behind `dialog` collecting every entry it
    /// renders, optionally stopping at the first row matching the target.
    pub async fn scan<H: Host<Node = N>>(
        &mut self,
        host: &H,
        dialog: &N,
        options: ScanOptions<'_>,
    ) -> ScanOutcome<N> {
        let settings = self.settings.clone();
        let query = options.target.and_then(MatchQuery::parse);
        let publish = |round: usize, scanned: usize, done: bool| {
            if let Some(tx) = options.progress {
                tx.send_replace(ScanProgress {
                    mode: options.mode,
                    round,
                    scanned,
                    done,
                });
            }
        };

        let scroller = self.locator.locate(host, dialog, &settings);
        if let Some(scroller) = &scroller {
            host.set_scroll_top(scroller, 0.0);
            host.suspend(settings.top_reset_wait()).await;
        }

        let mut entries = EntryMap::new();
        let mut sizes = Vec::new();
        let mut stagnant = 0usize;
        let mut termination = Termination::RoundCeiling;
        let mut found_row = None;
        let mut rounds = 0;

        for round in 0..settings.max_rounds {
            rounds = round + 1;
            let harvest =
                self.harvest(host, dialog, scroller.as_ref(), query.as_ref(), &mut entries);
            sizes.push(entries.len());
            publish(round, entries.len(), false);

            if options.stop_when_found && harvest.matched.is_some() {
                found_row = harvest.matched;
                termination = Termination::Matched;
                break;
            }

            let (before_top, before_height) =
                self.advance(host, scroller.as_ref(), &harvest.rows, round, stagnant);

            let wait = if stagnant >= settings.slow_down_after_stagnant {
                settings.stagnant_wait()
            } else {
                settings.base_wait()
            };
            host.suspend(wait).await;

            let after = scroller.as_ref().map(|s| host.scroll_metrics(s));
            let moved = after.is_some_and(|after| {
                (after.scroll_top - before_top).abs() > MOVE_EPSILON
                    || after.scroll_height != before_height
            });
            if harvest.new_seen > 0 || moved {
                stagnant = 0;
            } else {
                stagnant += 1;
            }

            debug!(
                round,
                rows = harvest.rows.len(),
                new_seen = harvest.new_seen,
                total = entries.len(),
                stagnant,
                moved,
                "scan round"
            );

            if scroller.is_none() && stagnant >= settings.stall_break_rounds {
                termination = Termination::NoViewportStalled;
                break;
            }
            if harvest.rows.is_empty() && stagnant >= settings.stall_break_rounds {
                termination = Termination::NoRowsStalled;
                break;
            }
            let near_end = after.map_or(true, |after| after.is_near_end(settings.end_slack));
            if near_end && stagnant >= settings.idle_break_rounds {
                termination = Termination::ReachedEnd;
                break;
            }
        }

        publish(rounds, entries.len(), true);
        info!(
            mode = ?options.mode,
            rounds,
            entries = entries.len(),
            ?termination,
            cache_hits = self.extractor.hits(),
            "scan finished"
        );

        ScanOutcome {
            found_row,
            entries,
            rounds,
            termination,
            sizes,
        }
    }
}
