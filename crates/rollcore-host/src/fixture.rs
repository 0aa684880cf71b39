use serde::{Deserialize, Serialize};

use crate::memory::{MemoryHost, NodeId, RowSpec, VirtualList};

/// One emoji tab of the reaction dialog and the users behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionTab {
    pub emoji: String,
    #[serde(default)]
    pub users: Vec<RowSpec>,
}

/// Serializable description of a reaction dialog, used by tests and the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactionFixture {
    pub title: String,
    pub dialog_width: f64,
    pub viewport_height: f64,
    pub row_height: f64,
    pub overscan: usize,
    pub page_size: usize,
    pub code_scroll_writable: bool,
    pub selected: usize,
    pub tabs: Vec<ReactionTab>,
}

impl Default for ReactionFixture {
    fn default() -> Self {
        Self {
            title: "Reactions".to_string(),
            dialog_width: 440.0,
            viewport_height: 500.0,
            row_height: 50.0,
            overscan: 2,
            page_size: 0,
            code_scroll_writable: true,
            selected: 0,
            tabs: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct BuiltFixture {
    pub host: MemoryHost,
    pub root: NodeId,
    pub dialog: NodeId,
    pub scroller: NodeId,
    pub tabs: Vec<NodeId>,
    pub tab_rows: Vec<Vec<RowSpec>>,
}

const TAB_COLUMN_WIDTH: f64 = 120.0;

impl ReactionFixture {
    pub fn with_users(users: Vec<RowSpec>) -> Self {
        Self {
            tabs: vec![ReactionTab {
                emoji: "👍".to_string(),
                users,
            }],
            ..Self::default()
        }
    }

    pub fn build(&self) -> BuiltFixture {
        let host = MemoryHost::new();
        let root = host.root();

        let body = host.append(root, "body");
        host.set_size(body, 1280.0, 800.0);
        let layer = host.append(body, "div");
        host.set_size(layer, 1280.0, 800.0);

        let dialog = host.append(layer, "div");
        host.set_attr(dialog, "role", "dialog");
        host.set_size(dialog, self.dialog_width, self.viewport_height + 140.0);

        let header = host.append(dialog, "div");
        host.set_size(header, self.dialog_width, 56.0);
        let heading = host.append(header, "h2");
        host.set_text(heading, &self.title);
        host.set_size(heading, self.dialog_width - 32.0, 24.0);

        let content = host.append(dialog, "div");
        host.set_size(content, self.dialog_width, self.viewport_height);

        let column = host.append(content, "div");
        host.set_attr(column, "role", "tablist");
        host.set_size(column, TAB_COLUMN_WIDTH, self.viewport_height);

        let mut tabs = Vec::with_capacity(self.tabs.len());
        for (index, tab) in self.tabs.iter().enumerate() {
            let node = host.append(column, "div");
            host.set_attr(node, "role", "tab");
            host.set_attr(node, "aria-label", &format!("{}, {}", tab.emoji, tab.users.len()));
            host.set_attr(
                node,
                "aria-selected",
                if index == self.selected { "true" } else { "false" },
            );
            host.set_size(node, TAB_COLUMN_WIDTH - 8.0, 36.0);

            let emoji = host.append(node, "span");
            host.set_text(emoji, &tab.emoji);
            host.set_size(emoji, 24.0, 24.0);
            let count = host.append(node, "div");
            host.set_text(count, &tab.users.len().to_string());
            host.set_size(count, 40.0, 18.0);
            tabs.push(node);
        }

        let wrapper = host.append(content, "div");
        host.set_size(wrapper, self.dialog_width - TAB_COLUMN_WIDTH, self.viewport_height);
        let scroller = host.append(wrapper, "div");
        host.set_size(scroller, self.dialog_width - TAB_COLUMN_WIDTH, self.viewport_height);
        host.make_scroller(scroller, self.viewport_height, 0.0);
        host.set_code_scroll_writable(scroller, self.code_scroll_writable);

        let tab_rows: Vec<Vec<RowSpec>> = self.tabs.iter().map(|tab| tab.users.clone()).collect();
        host.virtualize(
            scroller,
            VirtualList {
                rows: tab_rows.get(self.selected).cloned().unwrap_or_default(),
                row_height: self.row_height,
                row_width: self.dialog_width - TAB_COLUMN_WIDTH - 16.0,
                overscan: self.overscan,
                page_size: self.page_size,
            },
        );

        BuiltFixture {
            host,
            root,
            dialog,
            scroller,
            tabs,
            tab_rows,
        }
    }
}

impl BuiltFixture {
    /// Switches the selected tab and swaps the list contents behind the scroller.
    pub fn select_tab(&self, index: usize) {
        for (i, tab) in self.tabs.iter().enumerate() {
            self.host
                .set_attr(*tab, "aria-selected", if i == index { "true" } else { "false" });
        }
        let rows = self.tab_rows.get(index).cloned().unwrap_or_default();
        self.host.replace_rows(self.scroller, rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Host, Selector};
    use pretty_assertions::assert_eq;

    #[test]
    fn fixture_round_trips_through_json() {
        let raw = r#"{
            "title": "Reactions",
            "tabs": [
                { "emoji": "🔥", "users": [ { "lines": ["Nyarla", "@nyarla.dev"], "avatar": true } ] }
            ]
        }"#;
        let fixture: ReactionFixture = serde_json::from_str(raw).unwrap();
        assert_eq!(fixture.row_height, 50.0);
        assert_eq!(fixture.tabs[0].users[0].lines, vec!["Nyarla", "@nyarla.dev"]);

        let built = fixture.build();
        let rows = built.host.select(&built.dialog, &[Selector::Role("listitem")]);
        assert_eq!(rows.len(), 1);
        assert_eq!(built.host.inner_text(&rows[0]), "Nyarla\n@nyarla.dev");
    }

    #[test]
    fn select_tab_swaps_rows_and_selection() {
        let fixture = ReactionFixture {
            tabs: vec![
                ReactionTab {
                    emoji: "👍".to_string(),
                    users: vec![RowSpec::new(["Alpha", "@alpha"])],
                },
                ReactionTab {
                    emoji: "🎉".to_string(),
                    users: vec![RowSpec::new(["Beta", "@beta"]), RowSpec::new(["Gamma", "@gamma"])],
                },
            ],
            ..ReactionFixture::default()
        };
        let built = fixture.build();
        built.select_tab(1);

        assert_eq!(
            built.host.attribute(&built.tabs[1], "aria-selected").as_deref(),
            Some("true")
        );
        let rows = built.host.mounted_rows(built.scroller);
        assert_eq!(rows.len(), 2);
        assert_eq!(built.host.inner_text(&rows[0]), "Beta\n@beta");
    }
}
