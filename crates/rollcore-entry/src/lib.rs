use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub mod classify;
pub mod discover;
pub mod extract;
pub mod normalize;

pub use classify::{RejectReason, RowFacts, Tier, Verdict};
pub use discover::discover_rows;
pub use extract::EntryExtractor;

use normalize::{compact_identity, normalize_for_match, strip_at};

/// Lines kept per entry.
pub const ENTRY_LINES: usize = 6;

/// Lines joined into a signature when no numeric id is available.
const SIGNATURE_LINES: usize = 3;

/// Discovered users keyed by signature, in first-seen order.
pub type EntryMap = IndexMap<String, Entry>;

/// Normalized record of one user row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub signature: String,
    pub display_name: String,
    pub username: String,
    pub user_id: String,
    pub lines: Vec<String>,
    pub normalized_lines: Vec<String>,
    pub match_tokens: BTreeSet<String>,
}

impl Entry {
    pub fn from_parts(lines: Vec<String>, user_id: Option<String>) -> Self {
        let user_id = user_id.unwrap_or_default();
        let normalized_lines: Vec<String> = lines
            .iter()
            .map(|line| normalize_for_match(line))
            .filter(|line| !line.is_empty())
            .collect();

        let mut match_tokens = BTreeSet::new();
        for line in &normalized_lines {
            match_tokens.insert(line.clone());
            let bare = strip_at(line);
            if !bare.is_empty() {
                match_tokens.insert(bare.to_string());
            }
            let compact = compact_identity(line);
            if !compact.is_empty() {
                match_tokens.insert(compact);
            }
        }
        if !user_id.is_empty() {
            match_tokens.insert(user_id.clone());
        }

        let signature = if user_id.is_empty() {
            normalized_lines
                .iter()
                .take(SIGNATURE_LINES)
                .cloned()
                .collect::<Vec<_>>()
                .join(" | ")
        } else {
            user_id.clone()
        };
        let username = lines
            .iter()
            .find(|line| line.trim().starts_with('@'))
            .or_else(|| lines.get(1))
            .cloned()
            .unwrap_or_default();

        Self {
            signature,
            display_name: lines.first().cloned().unwrap_or_default(),
            username,
            user_id,
            lines,
            normalized_lines,
            match_tokens,
        }
    }
}

/// Merges `entry` into `map`; returns whether its signature was new.
pub fn merge_entry(map: &mut EntryMap, entry: Entry) -> bool {
    if entry.signature.is_empty() || map.contains_key(&entry.signature) {
        return false;
    }
    map.insert(entry.signature.clone(), entry);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|line| line.to_string()).collect()
    }

    #[test]
    fn tokens_cover_stripped_and_compact_forms() {
        let entry = Entry::from_parts(lines(&["Nyarla", "@Nyarla.Dev"]), None);
        let tokens: Vec<&str> = entry.match_tokens.iter().map(String::as_str).collect();
        assert_eq!(tokens, vec!["@nyarla.dev", "nyarla", "nyarla.dev", "nyarladev"]);
        assert_eq!(entry.signature, "nyarla | @nyarla.dev");
        assert_eq!(entry.display_name, "Nyarla");
        assert_eq!(entry.username, "@Nyarla.Dev");
    }

    #[test]
    fn numeric_id_becomes_signature_and_token() {
        let entry = Entry::from_parts(
            lines(&["Nyarla", "Online"]),
            Some("123456789012345678".into()),
        );
        assert_eq!(entry.signature, "123456789012345678");
        assert!(entry.match_tokens.contains("123456789012345678"));
        assert_eq!(entry.username, "Online");
    }

    #[test]
    fn merge_keeps_first_and_skips_unsigned() {
        let mut map = EntryMap::new();
        assert!(merge_entry(&mut map, Entry::from_parts(lines(&["A", "@a"]), None)));
        assert!(!merge_entry(&mut map, Entry::from_parts(lines(&["a", "@A"]), None)));
        assert!(!merge_entry(&mut map, Entry::from_parts(Vec::new(), None)));
        assert_eq!(map.len(), 1);
        assert_eq!(map[0].display_name, "A");
    }
}
