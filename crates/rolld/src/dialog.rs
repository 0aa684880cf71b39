use rollcore_config::ScanSettings;
use rollcore_entry::normalize::normalize;
use rollcore_host::{Host, Selector};

const DIALOGS: &[Selector] = &[Selector::Role("dialog")];
const HEADINGS: &[Selector] = &[
    Selector::Tag("h1"),
    Selector::Tag("h2"),
    Selector::Role("heading"),
];
const SELECTED: &[Selector] = &[Selector::AttributeEquals("aria-selected", "true")];

/// Whether `dialog` is titled like a reaction dialog, either by a heading or
/// by how its text begins.
pub fn is_reaction_dialog<H: Host>(host: &H, dialog: &H::Node, settings: &ScanSettings) -> bool {
    let titles: Vec<String> = settings.dialog_titles.iter().map(|t| normalize(t)).collect();

    let titled = host
        .select(dialog, HEADINGS)
        .iter()
        .any(|heading| titles.contains(&normalize(&host.text_content(heading))));
    if titled {
        return true;
    }

    let preview: String = host
        .text_content(dialog)
        .chars()
        .take(settings.dialog_preview_chars)
        .collect();
    let preview = normalize(&preview);
    titles
        .iter()
        .any(|title| !title.is_empty() && preview.starts_with(title.as_str()))
}

/// First reaction dialog under `root`, in document order.
pub fn locate_reaction_dialog<H: Host>(
    host: &H,
    root: &H::Node,
    settings: &ScanSettings,
) -> Option<H::Node> {
    host.select(root, DIALOGS)
        .into_iter()
        .find(|dialog| is_reaction_dialog(host, dialog, settings))
}

/// Normalized label of the selected reaction tab, or empty when nothing is
/// selected. Changes whenever the user switches emoji.
pub fn active_selection_fingerprint<H: Host>(host: &H, dialog: &H::Node) -> String {
    let Some(selected) = host.select_first(dialog, SELECTED) else {
        return String::new();
    };
    let text = [
        host.attribute(&selected, "aria-label").unwrap_or_default(),
        host.inner_text(&selected),
        host.text_content(&selected),
    ]
    .into_iter()
    .find(|text| !text.is_empty())
    .unwrap_or_default();
    normalize(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rollcore_host::fixture::{ReactionFixture, ReactionTab};
    use rollcore_host::memory::{MemoryHost, RowSpec};

    #[test]
    fn finds_dialog_by_heading() {
        let built = ReactionFixture::with_users(vec![RowSpec::new(["A", "@a"])]).build();
        let found = locate_reaction_dialog(&built.host, &built.root, &ScanSettings::default());
        assert_eq!(found, Some(built.dialog));
    }

    #[test]
    fn localized_title_is_recognized() {
        let fixture = ReactionFixture {
            title: "反应".to_string(),
            ..ReactionFixture::with_users(Vec::new())
        };
        let built = fixture.build();
        assert!(is_reaction_dialog(&built.host, &built.dialog, &ScanSettings::default()));
    }

    #[test]
    fn other_dialogs_are_skipped() {
        let host = MemoryHost::new();
        let settings = ScanSettings::default();
        let settings_dialog = host.append(host.root(), "div");
        host.set_attr(settings_dialog, "role", "dialog");
        let heading = host.append(settings_dialog, "h2");
        host.set_text(heading, "User Settings");

        let reactions = host.append(host.root(), "div");
        host.set_attr(reactions, "role", "dialog");
        let label = host.append(reactions, "div");
        host.set_text(label, "  Reactions 👍 3");

        assert!(!is_reaction_dialog(&host, &settings_dialog, &settings));
        assert_eq!(
            locate_reaction_dialog(&host, &host.root(), &settings),
            Some(reactions)
        );
    }

    #[test]
    fn fingerprint_follows_selected_tab() {
        let fixture = ReactionFixture {
            tabs: vec![
                ReactionTab {
                    emoji: "👍".to_string(),
                    users: vec![RowSpec::new(["A", "@a"])],
                },
                ReactionTab {
                    emoji: "🎉".to_string(),
                    users: Vec::new(),
                },
            ],
            ..ReactionFixture::default()
        };
        let built = fixture.build();
        assert_eq!(active_selection_fingerprint(&built.host, &built.dialog), "👍, 1");

        built.select_tab(1);
        assert_eq!(active_selection_fingerprint(&built.host, &built.dialog), "🎉, 0");
    }

    #[test]
    fn fingerprint_is_empty_without_selection() {
        let host = MemoryHost::new();
        let dialog = host.append(host.root(), "div");
        assert_eq!(active_selection_fingerprint(&host, &dialog), "");
    }
}
