//! Decides whether a rendered node is a user row.
//!
//! Classification is split into two steps so the decision tree stays a pure
//! function: [`RowFacts::probe`] reads everything it needs from the host once,
//! and [`Tier::classify`] judges the snapshot.

use rollcore_config::ScanSettings;
use rollcore_host::Host;

use crate::normalize::{
    extract_numeric_id, has_handle, has_word_like_chars, is_counter_line,
    looks_like_reaction_counter,
};

/// Most lines any tier looks at.
pub const MAX_PROBED_LINES: usize = 10;

/// Trimmed, non-empty text lines of a rendered row.
pub fn row_lines(text: &str, limit: usize) -> Vec<String> {
    text.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(limit)
        .map(str::to_string)
        .collect()
}

/// Geometry and text snapshot of one candidate row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowFacts {
    pub rendered: bool,
    pub width: f64,
    pub height: f64,
    pub lines: Vec<String>,
    pub has_avatar: bool,
    /// Numeric id found in the row's own attributes or links.
    pub attribute_id: Option<String>,
    pub inside_control_surface: bool,
}

impl RowFacts {
    pub fn probe<H: Host>(host: &H, node: &H::Node, settings: &ScanSettings) -> Self {
        if !host.is_rendered(node) {
            return Self::default();
        }
        let size = host.layout_size(node);
        Self {
            rendered: true,
            width: size.width,
            height: size.height,
            lines: row_lines(&host.inner_text(node), MAX_PROBED_LINES),
            has_avatar: has_avatar_marker(host, node, &settings.avatar_cdn_host),
            attribute_id: attribute_numeric_id(host, node),
            inside_control_surface: host
                .closest_with_attribute(node, &settings.control_marker_attr)
                .is_some(),
        }
    }
}

/// Any descendant that looks like an avatar image or avatar container.
pub fn has_avatar_marker<H: Host>(host: &H, row: &H::Node, cdn_host: &str) -> bool {
    let cdn_avatars = format!("{cdn_host}/avatars");
    host.descendants(row).iter().any(|node| {
        let class = host.attribute(node, "class").unwrap_or_default();
        if class.contains("avatar") {
            return true;
        }
        if host.tag_name(node) == "img" {
            let src = host.attribute(node, "src").unwrap_or_default();
            if src.contains("/avatars/") || src.contains(&cdn_avatars) {
                return true;
            }
        }
        host.attribute(node, "style")
            .is_some_and(|style| style.contains("background-image") && style.contains(cdn_host))
    })
}

const ROW_ID_ATTRIBUTES: [&str; 5] = [
    "data-user-id",
    "data-list-item-id",
    "id",
    "aria-label",
    "aria-labelledby",
];

/// Numeric user id from the row's attributes, a tagged descendant, or a profile link.
pub fn attribute_numeric_id<H: Host>(host: &H, row: &H::Node) -> Option<String> {
    let own = ROW_ID_ATTRIBUTES
        .iter()
        .filter_map(|name| host.attribute(row, name))
        .collect::<Vec<_>>();

    let descendants = host.descendants(row);
    let tagged = descendants
        .iter()
        .find_map(|node| host.attribute(node, "data-user-id"));
    let link = |needle: &str| {
        descendants.iter().find_map(|node| {
            (host.tag_name(node) == "a")
                .then(|| host.attribute(node, "href"))
                .flatten()
                .filter(|href| href.contains(needle))
        })
    };

    own.into_iter()
        .chain(tagged)
        .chain(link("/users/"))
        .chain(link("/channels/"))
        .find_map(|value| extract_numeric_id(&value))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierThresholds {
    pub min_height: f64,
    pub max_height: f64,
    pub min_width: f64,
    pub min_width_ratio: f64,
    pub max_lines: usize,
    pub max_chars: usize,
    pub reject_control_surface: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Strict,
    /// Looser bounds for markup that hides its rows in generic containers.
    Relaxed,
}

impl Tier {
    pub fn thresholds(self) -> TierThresholds {
        match self {
            Tier::Strict => TierThresholds {
                min_height: 24.0,
                max_height: 160.0,
                min_width: 96.0,
                min_width_ratio: 0.18,
                max_lines: 6,
                max_chars: 180,
                reject_control_surface: false,
            },
            Tier::Relaxed => TierThresholds {
                min_height: 20.0,
                max_height: 220.0,
                min_width: 72.0,
                min_width_ratio: 0.10,
                max_lines: 10,
                max_chars: 220,
                reject_control_surface: true,
            },
        }
    }

    pub fn classify(self, facts: &RowFacts, viewport_width: f64) -> Verdict {
        let t = self.thresholds();
        if !facts.rendered {
            return Verdict::Rejected(RejectReason::NotRendered);
        }
        if t.reject_control_surface && facts.inside_control_surface {
            return Verdict::Rejected(RejectReason::ControlSurface);
        }
        if facts.height < t.min_height || facts.height > t.max_height {
            return Verdict::Rejected(RejectReason::Height);
        }
        if facts.width < t.min_width.max(viewport_width * t.min_width_ratio) {
            return Verdict::Rejected(RejectReason::Width);
        }

        let lines = &facts.lines[..facts.lines.len().min(t.max_lines)];
        if lines.is_empty() {
            return Verdict::Rejected(RejectReason::NoText);
        }
        if lines.iter().all(|line| is_counter_line(line)) {
            return Verdict::Rejected(RejectReason::AllCounters);
        }
        if looks_like_reaction_counter(lines) {
            return Verdict::Rejected(RejectReason::ReactionCounter);
        }
        if lines.join(" ").chars().count() > t.max_chars {
            return Verdict::Rejected(RejectReason::TooLong);
        }
        if !facts.has_avatar && !has_identity_like(facts.attribute_id.as_deref(), lines) {
            return Verdict::Rejected(RejectReason::NoIdentity);
        }
        Verdict::Entry
    }
}

/// Text that only a user row would carry: an id, a handle, or two real lines.
pub fn has_identity_like(attribute_id: Option<&str>, lines: &[String]) -> bool {
    if attribute_id.is_some() || extract_numeric_id(&lines.join(" ")).is_some() {
        return true;
    }
    if lines.iter().any(|line| has_handle(line)) {
        return true;
    }
    lines
        .iter()
        .filter(|line| !is_counter_line(line) && has_word_like_chars(line))
        .count()
        >= 2
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    NotRendered,
    ControlSurface,
    Height,
    Width,
    NoText,
    AllCounters,
    ReactionCounter,
    TooLong,
    NoIdentity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Entry,
    Rejected(RejectReason),
}

impl Verdict {
    pub fn is_entry(self) -> bool {
        self == Verdict::Entry
    }
}
