use rollcore_config::ScanSettings;
use rollcore_host::{Host, Selector};
use tracing::trace;

use crate::classify::{RowFacts, Tier};

const LIST_ITEMS: &[Selector] = &[Selector::Role("listitem")];
const ITEM_LIKE: &[Selector] = &[
    Selector::HasAttribute("data-list-item-id"),
    Selector::Role("option"),
    Selector::Role("button"),
];
const ANY_ELEMENT: &[Selector] = &[Selector::AnyElement];

/// Selector scopes tried in order; the first one yielding rows wins.
const SCOPES: [(&[Selector], Tier); 4] = [
    (LIST_ITEMS, Tier::Strict),
    (ITEM_LIKE, Tier::Strict),
    (ANY_ELEMENT, Tier::Strict),
    (ANY_ELEMENT, Tier::Relaxed),
];

/// Currently rendered user rows under `root`, judged against a viewport of
/// `viewport_width`.
///
/// Semantically marked rows are preferred; wider scopes are only consulted
/// when the narrower ones yield nothing.
pub fn discover_rows<H: Host>(
    host: &H,
    root: &H::Node,
    viewport_width: f64,
    settings: &ScanSettings,
) -> Vec<H::Node> {
    for (scope, (selectors, tier)) in SCOPES.iter().enumerate() {
        let rows: Vec<H::Node> = host
            .select(root, selectors)
            .into_iter()
            .filter(|node| {
                tier.classify(&RowFacts::probe(host, node, settings), viewport_width)
                    .is_entry()
            })
            .collect();
        if !rows.is_empty() {
            trace!(scope, ?tier, rows = rows.len(), "row scope matched");
            return rows;
        }
    }
    Vec::new()
}
