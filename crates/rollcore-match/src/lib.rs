use rollcore_entry::normalize::{
    compact_identity, is_bare_numeric_id, normalize_for_match, strip_at,
};
use rollcore_entry::{Entry, EntryMap};
use serde::{Deserialize, Serialize};

/// Below this length the substring fallback is refused.
pub const MIN_SUBSTRING_LEN: usize = 3;

/// Query forms derived once from caller input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchQuery {
    pub normalized: String,
    pub stripped: String,
    pub compact: String,
    pub numeric_id: Option<String>,
}

impl MatchQuery {
    /// `None` when the query normalizes to nothing.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = normalize_for_match(raw);
        if normalized.is_empty() {
            return None;
        }
        let stripped = strip_at(&normalized).to_string();
        let compact = compact_identity(&normalized);
        let numeric_id = is_bare_numeric_id(&stripped).then(|| stripped.clone());
        Some(Self {
            normalized,
            stripped,
            compact,
            numeric_id,
        })
    }

    pub fn matches(&self, entry: &Entry) -> bool {
        // A numeric id only ever matches the same id.
        if let Some(id) = &self.numeric_id {
            return entry.user_id == *id || entry.match_tokens.contains(id);
        }

        let tokens = &entry.match_tokens;
        if tokens.contains(&self.normalized)
            || (!self.stripped.is_empty() && tokens.contains(&self.stripped))
            || (!self.compact.is_empty() && tokens.contains(&self.compact))
        {
            return true;
        }

        if self.stripped.chars().count() < MIN_SUBSTRING_LEN
            && self.compact.chars().count() < MIN_SUBSTRING_LEN
        {
            return false;
        }

        entry.normalized_lines.iter().any(|line| {
            if line.contains(&self.normalized)
                || (!self.stripped.is_empty() && strip_at(line).contains(&self.stripped))
            {
                return true;
            }
            !self.compact.is_empty() && compact_identity(line).contains(&self.compact)
        })
    }
}

/// One-shot form of [`MatchQuery::matches`].
pub fn matches(entry: &Entry, raw_query: &str) -> bool {
    MatchQuery::parse(raw_query).is_some_and(|query| query.matches(entry))
}

/// First entry, in discovery order, matching `raw_query`.
pub fn find_entry<'a>(entries: &'a EntryMap, raw_query: &str) -> Option<&'a Entry> {
    let query = MatchQuery::parse(raw_query)?;
    entries.values().find(|entry| query.matches(entry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rollcore_entry::merge_entry;

    fn entry(lines: &[&str], id: Option<&str>) -> Entry {
        Entry::from_parts(
            lines.iter().map(|line| line.to_string()).collect(),
            id.map(str::to_string),
        )
    }

    #[test]
    fn display_and_handle_forms_match() {
        let nyarla = entry(&["Nyarla", "@Nyarla.Dev"], None);
        for query in ["nyarla", "NYARLA", "@nyarla.dev", "nyarladev", "  Nyarla.Dev ", "arla.d"] {
            assert!(matches(&nyarla, query), "{query}");
        }
    }

    #[test]
    fn separators_before_the_at_sign_still_compact() {
        let nyarla = entry(&["Nyarla", "@Nyarla.Dev"], None);
        assert!(matches(&nyarla, "-@nyarladev"));
        assert!(matches(&nyarla, "._@nyarla.dev"));
        let query = MatchQuery::parse("-@nyarla.dev").unwrap();
        assert_eq!(query.compact, "nyarladev");
    }

    #[test]
    fn short_and_unrelated_queries_do_not_match() {
        let nyarla = entry(&["Nyarla", "@Nyarla.Dev"], None);
        for query in ["na", "@n", "", "   ", "999999999999999999", "somebody"] {
            assert!(!matches(&nyarla, query), "{query:?}");
        }
    }

    #[test]
    fn numeric_id_requires_exact_equality() {
        let with_id = entry(&["Nyarla", "@nyarla.dev"], Some("123456789012345678"));
        assert!(matches(&with_id, "123456789012345678"));
        assert!(matches(&with_id, "@123456789012345678"));
        assert!(!matches(&with_id, "12345678901234567"));
        assert!(!matches(&with_id, "1234567890"));
    }

    #[test]
    fn numeric_id_shown_in_text_still_needs_full_id() {
        let shown = entry(&["Nyarla", "id 123456789012345678"], None);
        assert!(!matches(&shown, "2345678901234567890"));
        assert!(matches(&shown, "id 123456789012345678"));
    }

    #[test]
    fn zero_width_and_fullwidth_queries_normalize() {
        let nyarla = entry(&["Nyarla", "@nyarla.dev"], None);
        assert!(matches(&nyarla, "Ｎｙａｒｌａ"));
        assert!(matches(&nyarla, "nyar\u{200b}la"));
    }

    #[test]
    fn parse_derives_forms() {
        let query = MatchQuery::parse(" @@Some_User ").unwrap();
        assert_eq!(query.normalized, "@@some_user");
        assert_eq!(query.stripped, "some_user");
        assert_eq!(query.compact, "someuser");
        assert_eq!(query.numeric_id, None);
        assert_eq!(
            MatchQuery::parse("123456789012345678").unwrap().numeric_id.as_deref(),
            Some("123456789012345678")
        );
    }

    #[test]
    fn find_entry_returns_first_in_order() {
        let mut map = EntryMap::new();
        merge_entry(&mut map, entry(&["Alpha", "@alpha"], None));
        merge_entry(&mut map, entry(&["Alphabet", "@alphabet"], None));
        assert_eq!(find_entry(&map, "alpha").unwrap().display_name, "Alpha");
        assert_eq!(find_entry(&map, "@alphabet").unwrap().display_name, "Alphabet");
        assert!(find_entry(&map, "omega").is_none());
    }

    proptest::proptest! {
        #[test]
        fn shorter_digit_runs_never_match_an_id(len in 1usize..18) {
            let id = "123456789012345678";
            let with_id = entry(&["Nyarla", "@nyarla.dev"], Some(id));
            proptest::prop_assert!(!matches(&with_id, &id[..len]));
        }
    }
}
