//! Text normalization shared by classification, extraction and matching.

use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Collapses whitespace runs, trims and lower-cases.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn is_zero_width(ch: char) -> bool {
    matches!(ch, '\u{200b}'..='\u{200d}' | '\u{feff}')
}

/// NFKC, zero-width removal, then [`normalize`]. Two renderings of the same
/// display name must land on the same string here.
pub fn normalize_for_match(text: &str) -> String {
    let folded: String = text.nfkc().filter(|ch| !is_zero_width(*ch)).collect();
    normalize(&folded)
}

pub fn strip_at(text: &str) -> &str {
    text.trim_start_matches('@')
}

/// Identity form with `@`, whitespace, `.`, `_` and `-` removed.
pub fn compact_identity(text: &str) -> String {
    let joined: String = normalize_for_match(text)
        .chars()
        .filter(|ch| !matches!(ch, '.' | '_' | '-') && !ch.is_whitespace())
        .collect();
    strip_at(&joined).to_string()
}

fn numeric_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|[^0-9])([0-9]{16,21})(?:[^0-9]|$)").expect("numeric id pattern")
    })
}

fn handle_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:^|\s)@[A-Za-z0-9_.\-]{2,}").expect("handle pattern"))
}

/// First 16–21 digit run not touching other digits.
pub fn extract_numeric_id(text: &str) -> Option<String> {
    numeric_id_regex()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// `text` is exactly one long numeric id.
pub fn is_bare_numeric_id(text: &str) -> bool {
    (16..=21).contains(&text.len()) && text.bytes().all(|b| b.is_ascii_digit())
}

pub fn has_handle(line: &str) -> bool {
    handle_regex().is_match(line)
}

pub fn has_word_like_chars(text: &str) -> bool {
    text.chars().any(|ch| {
        ch.is_ascii_alphanumeric()
            || ('\u{4e00}'..='\u{9fff}').contains(&ch)
            || matches!(ch, '@' | '.' | '_' | '-')
    })
}

/// A bare 1–8 digit count, optionally with grouping separators.
pub fn is_counter_line(line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() {
        return true;
    }
    let digits: Vec<char> = line
        .chars()
        .filter(|ch| !ch.is_whitespace() && !matches!(ch, ',' | '.' | '，'))
        .collect();
    (1..=8).contains(&digits.len()) && digits.iter().all(char::is_ascii_digit)
}

/// Shape of an emoji/reaction tab: at most two lines, one a counter, the
/// other carrying no word characters.
pub fn looks_like_reaction_counter(lines: &[String]) -> bool {
    if lines.is_empty() {
        return true;
    }
    lines.len() <= 2
        && lines.iter().any(|line| is_counter_line(line))
        && lines
            .iter()
            .all(|line| is_counter_line(line) || !has_word_like_chars(line))
}
