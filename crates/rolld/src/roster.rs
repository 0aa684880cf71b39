use rollcore_entry::{Entry, EntryMap};

const NO_NICKNAME: &str = "(no nickname)";

/// One numbered display line per entry, in discovery order.
pub fn format_roster(entries: &EntryMap) -> Vec<String> {
    entries
        .values()
        .enumerate()
        .map(|(index, entry)| format_line(index + 1, entry))
        .collect()
}

fn format_line(position: usize, entry: &Entry) -> String {
    let name = entry.display_name.trim();
    let name = if name.is_empty() { NO_NICKNAME } else { name };
    let handle = entry.username.trim();
    let handle = handle.strip_prefix('@').unwrap_or(handle);
    if handle.is_empty() {
        format!("{position}. {name}")
    } else {
        format!("{position}. {name} @{handle}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rollcore_entry::merge_entry;

    fn entry(lines: &[&str]) -> Entry {
        Entry::from_parts(lines.iter().map(|line| line.to_string()).collect(), None)
    }

    #[test]
    fn numbers_lines_in_discovery_order() {
        let mut map = EntryMap::new();
        merge_entry(&mut map, entry(&["Nyarla", "@nyarla.dev"]));
        merge_entry(&mut map, entry(&["Ghost", "ghost_42"]));
        merge_entry(&mut map, entry(&["Solo"]));

        assert_eq!(
            format_roster(&map),
            vec![
                "1. Nyarla @nyarla.dev",
                "2. Ghost @ghost_42",
                "3. Solo",
            ]
        );
    }

    #[test]
    fn blank_display_name_gets_placeholder() {
        let mut map = EntryMap::new();
        let mut blank = entry(&["x", "@quiet"]);
        blank.display_name = "  ".to_string();
        merge_entry(&mut map, blank);
        assert_eq!(format_roster(&map), vec!["1. (no nickname) @quiet"]);
    }

    #[test]
    fn only_one_leading_at_is_replaced() {
        let mut map = EntryMap::new();
        let mut doubled = entry(&["Echo", "@@echo"]);
        doubled.username = "@@echo".to_string();
        merge_entry(&mut map, doubled);
        assert_eq!(format_roster(&map), vec!["1. Echo @@echo"]);
    }
}
