//! Finds the scroll container that actually drives a virtualized list.
//!
//! Every rendered row votes for each scroll-capable ancestor it sits in, with
//! nearer ancestors weighted higher. The election is kept separate from the
//! tree walk so its tie-break rules can be tested on plain values.

use std::collections::HashMap;
use std::hash::Hash;

use indexmap::IndexMap;
use rollcore_config::ScanSettings;
use rollcore_entry::discover_rows;
use rollcore_host::Host;
use tracing::{debug, warn};

/// Weight ceiling for the nearest ancestor; each level up costs one point.
const NEAREST_ANCESTOR_WEIGHT: usize = 30;

/// Score accumulated by one scroll candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Candidate {
    pub hit_score: u64,
    pub max_scroll: f64,
}

impl Candidate {
    /// Higher hit score wins; scroll distance breaks ties.
    pub fn outranks(&self, other: &Candidate) -> bool {
        match self.hit_score.cmp(&other.hit_score) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => self.max_scroll > other.max_scroll,
        }
    }
}

/// Vote weight of an ancestor `depth` levels above a row's parent.
pub fn depth_weight(depth: usize) -> u64 {
    NEAREST_ANCESTOR_WEIGHT.saturating_sub(depth).max(1) as u64
}

/// Best candidate; on a full tie the first inserted one is kept.
pub fn elect<N>(candidates: &IndexMap<N, Candidate>) -> Option<&N> {
    let mut best: Option<(&N, &Candidate)> = None;
    for (node, candidate) in candidates {
        match best {
            Some((_, leader)) if !candidate.outranks(leader) => {}
            _ => best = Some((node, candidate)),
        }
    }
    best.map(|(node, _)| node)
}

pub fn is_potential_scrollable<H: Host>(host: &H, node: &H::Node, slack: f64) -> bool {
    host.scroll_metrics(node).overflow() > slack
}

/// Writes a small offset, reads it back and restores it. Some containers
/// report overflow but ignore programmatic scrolling.
pub fn can_scroll_by_code<H: Host>(host: &H, node: &H::Node, probe_delta: f64) -> bool {
    let before = host.scroll_metrics(node);
    let max_top = before.overflow();
    if max_top <= 1.0 {
        return false;
    }

    let prev = before.scroll_top;
    host.set_scroll_top(node, max_top.min(prev + probe_delta));
    let moved = (host.scroll_metrics(node).scroll_top - prev).abs() > 0.0;
    host.set_scroll_top(node, prev);
    moved || prev > 0.0
}

fn is_scroll_capable<H: Host>(host: &H, node: &H::Node, settings: &ScanSettings) -> bool {
    is_potential_scrollable(host, node, settings.scrollable_slack)
        && can_scroll_by_code(host, node, settings.probe_scroll_delta)
}

/// Scored ancestors of `rows`, up to (excluding) `dialog`.
pub fn row_candidates<H: Host>(
    host: &H,
    dialog: &H::Node,
    rows: &[H::Node],
    settings: &ScanSettings,
) -> IndexMap<H::Node, Candidate> {
    let mut scores: IndexMap<H::Node, Candidate> = IndexMap::new();
    for row in rows {
        let mut depth = 0;
        let mut cursor = host.parent(row);
        while let Some(node) = cursor {
            if &node == dialog {
                break;
            }
            if is_scroll_capable(host, &node, settings) {
                let max_scroll = host.scroll_metrics(&node).max_scroll_top();
                let slot = scores.entry(node.clone()).or_default();
                slot.hit_score += depth_weight(depth);
                slot.max_scroll = max_scroll;
            }
            depth += 1;
            cursor = host.parent(&node);
        }
    }
    scores
}

/// Every scroll-capable element in the dialog, scored by contained rows.
pub fn containment_candidates<H: Host>(
    host: &H,
    dialog: &H::Node,
    rows: &[H::Node],
    settings: &ScanSettings,
) -> IndexMap<H::Node, Candidate> {
    host.descendants(dialog)
        .into_iter()
        .filter(|node| is_scroll_capable(host, node, settings))
        .map(|node| {
            let contained = rows.iter().filter(|row| host.contains(&node, row)).count();
            let candidate = Candidate {
                hit_score: contained as u64,
                max_scroll: host.scroll_metrics(&node).max_scroll_top(),
            };
            (node, candidate)
        })
        .collect()
}

/// Per-dialog cache around the election.
#[derive(Debug)]
pub struct ViewportLocator<N> {
    cache: HashMap<N, N>,
}

impl<N> Default for ViewportLocator<N> {
    fn default() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }
}

impl<N: Clone + Eq + Hash + std::fmt::Debug> ViewportLocator<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The viewport for `dialog`, or `None` when nothing in it scrolls.
    pub fn locate<H: Host<Node = N>>(
        &mut self,
        host: &H,
        dialog: &N,
        settings: &ScanSettings,
    ) -> Option<N> {
        if let Some(cached) = self.cache.get(dialog) {
            if host.is_attached(cached)
                && host.contains(dialog, cached)
                && is_potential_scrollable(host, cached, settings.scrollable_slack)
            {
                return Some(cached.clone());
            }
        }
        self.cache.remove(dialog);

        let width = host.layout_size(dialog).width;
        let rows = discover_rows(host, dialog, width, settings);

        let candidates = row_candidates(host, dialog, &rows, settings);
        let elected = match elect(&candidates) {
            Some(node) => Some(node.clone()),
            None => {
                let fallback = containment_candidates(host, dialog, &rows, settings);
                elect(&fallback).cloned()
            }
        };

        match &elected {
            Some(node) => {
                debug!(?node, rows = rows.len(), "viewport located");
                self.cache.insert(dialog.clone(), node.clone());
            }
            None => warn!(rows = rows.len(), "no scrollable viewport in dialog"),
        }
        elected
    }

    pub fn cached(&self, dialog: &N) -> Option<&N> {
        self.cache.get(dialog)
    }

    pub fn forget(&mut self, dialog: &N) {
        self.cache.remove(dialog);
    }
}
