//! Capabilities the scanner consumes from the document that owns the list.
//!
//! The engine never touches a concrete DOM. Everything it reads or writes goes
//! through [`Host`], so the same scan logic drives a browser binding and the
//! in-memory [`memory::MemoryHost`] used by tests and the CLI.

use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod fixture;
pub mod memory;

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("node is no longer attached to the document")]
    Detached,
}

#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("clipboard not available")]
    NotAvailable,
    #[error("clipboard write failed: {0}")]
    WriteFailed(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
}

impl ScrollMetrics {
    pub fn overflow(&self) -> f64 {
        self.scroll_height - self.client_height
    }

    pub fn max_scroll_top(&self) -> f64 {
        self.overflow().max(0.0)
    }

    pub fn is_near_end(&self, slack: f64) -> bool {
        self.scroll_top + self.client_height >= self.scroll_height - slack
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAlign {
    Start,
    Center,
    End,
}

/// Element filters understood by [`Host::select`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    Role(&'static str),
    HasAttribute(&'static str),
    AttributeEquals(&'static str, &'static str),
    Tag(&'static str),
    AnyElement,
}

#[async_trait(?Send)]
pub trait Host {
    type Node: Clone + Eq + Hash + Debug;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Every element below `root` in document order, excluding `root`.
    fn descendants(&self, root: &Self::Node) -> Vec<Self::Node>;

    fn tag_name(&self, node: &Self::Node) -> String;
    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;
    fn text_content(&self, node: &Self::Node) -> String;

    /// Rendered text with line breaks between block fragments.
    fn inner_text(&self, node: &Self::Node) -> String {
        self.text_content(node)
    }

    fn child_element_count(&self, node: &Self::Node) -> usize;
    fn is_attached(&self, node: &Self::Node) -> bool;

    /// Attached and laid out with a box, i.e. it has an offset parent.
    fn is_rendered(&self, node: &Self::Node) -> bool;

    fn layout_size(&self, node: &Self::Node) -> Size;
    fn scroll_metrics(&self, node: &Self::Node) -> ScrollMetrics;
    fn set_scroll_top(&self, node: &Self::Node, top: f64);
    fn scroll_into_view(&self, node: &Self::Node, align: ScrollAlign);
    fn dispatch_wheel(&self, node: &Self::Node, delta_y: f64) -> Result<(), HostError>;
    fn set_highlight(&self, node: &Self::Node, on: bool);

    async fn suspend(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn matches(&self, node: &Self::Node, selector: &Selector) -> bool {
        match *selector {
            Selector::Role(role) => self.attribute(node, "role").as_deref() == Some(role),
            Selector::HasAttribute(name) => self.attribute(node, name).is_some(),
            Selector::AttributeEquals(name, value) => {
                self.attribute(node, name).as_deref() == Some(value)
            }
            Selector::Tag(tag) => self.tag_name(node).eq_ignore_ascii_case(tag),
            Selector::AnyElement => true,
        }
    }

    /// Descendants of `root` matching any of `selectors`, in document order.
    fn select(&self, root: &Self::Node, selectors: &[Selector]) -> Vec<Self::Node> {
        self.descendants(root)
            .into_iter()
            .filter(|node| selectors.iter().any(|s| self.matches(node, s)))
            .collect()
    }

    fn select_first(&self, root: &Self::Node, selectors: &[Selector]) -> Option<Self::Node> {
        self.descendants(root)
            .into_iter()
            .find(|node| selectors.iter().any(|s| self.matches(node, s)))
    }

    /// Inclusive containment: a node contains itself.
    fn contains(&self, ancestor: &Self::Node, node: &Self::Node) -> bool {
        let mut cursor = Some(node.clone());
        while let Some(current) = cursor {
            if &current == ancestor {
                return true;
            }
            cursor = self.parent(&current);
        }
        false
    }

    /// Nearest inclusive ancestor carrying `attr`.
    fn closest_with_attribute(&self, node: &Self::Node, attr: &str) -> Option<Self::Node> {
        let mut cursor = Some(node.clone());
        while let Some(current) = cursor {
            if self.attribute(&current, attr).is_some() {
                return Some(current);
            }
            cursor = self.parent(&current);
        }
        None
    }
}

#[async_trait(?Send)]
pub trait Clipboard {
    /// System clipboard write.
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError>;

    /// Manual select-and-copy path for hosts without clipboard access.
    fn copy_via_selection(&self, text: &str) -> Result<bool, ClipboardError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn near_end_uses_slack() {
        let metrics = ScrollMetrics {
            scroll_top: 4497.0,
            scroll_height: 5000.0,
            client_height: 500.0,
        };
        assert!(metrics.is_near_end(4.0));
        assert!(!metrics.is_near_end(2.0));
        assert_eq!(metrics.max_scroll_top(), 4500.0);
    }

    #[test]
    fn overflow_never_yields_negative_max() {
        let metrics = ScrollMetrics {
            scroll_top: 0.0,
            scroll_height: 200.0,
            client_height: 500.0,
        };
        assert_eq!(metrics.max_scroll_top(), 0.0);
    }
}
