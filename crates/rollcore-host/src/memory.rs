//! Arena-backed document with a simulated virtualized list.
//!
//! Rows bound to a [`VirtualList`] are mounted and unmounted on every render
//! tick, the same way a lazily rendered host list behaves: only the rows
//! intersecting the viewport (plus overscan) exist as attached nodes, and the
//! handles of rows scrolled away stay in the arena as detached nodes.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Host, HostError, ScrollAlign, ScrollMetrics, Size};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// One logical row of a virtualized list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowSpec {
    pub lines: Vec<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub avatar: bool,
}

impl RowSpec {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            user_id: None,
            avatar: false,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.user_id = Some(id.into());
        self
    }

    pub fn with_avatar(mut self) -> Self {
        self.avatar = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct VirtualList {
    pub rows: Vec<RowSpec>,
    pub row_height: f64,
    pub row_width: f64,
    pub overscan: usize,
    /// Rows loaded per fetch; `0` loads everything up front.
    pub page_size: usize,
}

#[derive(Debug, Clone, Copy)]
struct ScrollBox {
    top: f64,
    client_height: f64,
    content_height: f64,
    code_writable: bool,
}

impl ScrollBox {
    fn max_top(&self) -> f64 {
        (self.content_height - self.client_height).max(0.0)
    }

    fn clamp(&mut self) {
        self.top = self.top.clamp(0.0, self.max_top());
    }
}

#[derive(Debug, Default)]
struct NodeData {
    tag: String,
    attrs: Vec<(String, String)>,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    size: Size,
    offset_top: Option<f64>,
    scroll: Option<ScrollBox>,
    attached: bool,
    highlighted: bool,
}

#[derive(Debug)]
struct Virtualizer {
    scroller: NodeId,
    list: VirtualList,
    loaded: usize,
    mounted: Vec<(usize, NodeId)>,
}

#[derive(Debug)]
struct Document {
    nodes: Vec<NodeData>,
    virtualizers: Vec<Virtualizer>,
    wheel_events: usize,
    cdn_host: String,
    frozen: bool,
}

impl Document {
    fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0]
    }

    fn append(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        let attached = self.node(parent).attached;
        self.nodes.push(NodeData {
            tag: tag.to_ascii_lowercase(),
            parent: Some(parent),
            attached,
            ..NodeData::default()
        });
        self.node_mut(parent).children.push(id);
        id
    }

    fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        let attrs = &mut self.node_mut(id).attrs;
        match attrs.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = value.to_string(),
            None => attrs.push((name.to_string(), value.to_string())),
        }
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node(id).parent {
            self.node_mut(parent).children.retain(|child| *child != id);
        }
        self.node_mut(id).parent = None;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = self.node_mut(current);
            node.attached = false;
            stack.extend(node.children.iter().copied());
        }
    }

    fn nearest_scroll_box(&self, id: NodeId) -> Option<NodeId> {
        let mut cursor = self.node(id).parent;
        while let Some(current) = cursor {
            if self.node(current).scroll.is_some() {
                return Some(current);
            }
            cursor = self.node(current).parent;
        }
        None
    }

    fn walk(&self, root: NodeId, out: &mut Vec<NodeId>) {
        for child in &self.node(root).children {
            out.push(*child);
            self.walk(*child, out);
        }
    }

    fn mount_row(
        &mut self,
        scroller: NodeId,
        index: usize,
        spec: &RowSpec,
        list: &VirtualList,
    ) -> NodeId {
        let row = self.append(scroller, "div");
        let key = spec
            .user_id
            .clone()
            .unwrap_or_else(|| format!("row-{index}"));
        self.set_attr(row, "role", "listitem");
        self.set_attr(row, "data-list-item-id", &format!("reactions___{key}"));
        {
            let node = self.node_mut(row);
            node.size = Size::new(list.row_width, list.row_height);
            node.offset_top = Some(index as f64 * list.row_height);
        }

        if spec.avatar {
            let img = self.append(row, "img");
            let src = format!("https://{}/avatars/{key}/a_{index}.webp", self.cdn_host);
            self.set_attr(img, "src", &src);
            self.set_attr(img, "class", "avatar__4f2a1");
            self.node_mut(img).size = Size::new(32.0, 32.0);
        }

        let line_height = (list.row_height / spec.lines.len().max(1) as f64).min(20.0);
        for line in &spec.lines {
            let fragment = self.append(row, "div");
            let node = self.node_mut(fragment);
            node.text = line.clone();
            node.size = Size::new((list.row_width - 44.0).max(1.0), line_height);
        }
        row
    }

    fn render(&mut self) {
        if self.frozen {
            return;
        }
        let mut virtualizers = std::mem::take(&mut self.virtualizers);
        for virtualizer in &mut virtualizers {
            self.render_list(virtualizer);
        }
        self.virtualizers = virtualizers;
    }

    fn render_list(&mut self, v: &mut Virtualizer) {
        let total = v.list.rows.len();
        let row_height = v.list.row_height.max(1.0);
        let Some(mut scroll) = self.node(v.scroller).scroll else {
            return;
        };

        if v.list.page_size == 0 {
            v.loaded = total;
        } else {
            v.loaded = v.loaded.max(v.list.page_size.min(total));
            let loaded_height = v.loaded as f64 * row_height;
            if v.loaded < total && scroll.top + 2.0 * scroll.client_height > loaded_height {
                v.loaded = (v.loaded + v.list.page_size).min(total);
            }
        }

        scroll.content_height = v.loaded as f64 * row_height;
        scroll.clamp();
        self.node_mut(v.scroller).scroll = Some(scroll);

        let first = ((scroll.top / row_height).floor() as usize).saturating_sub(v.list.overscan);
        let last = (((scroll.top + scroll.client_height) / row_height).ceil() as usize
            + v.list.overscan)
            .min(v.loaded);

        let (keep, stale): (Vec<_>, Vec<_>) = v
            .mounted
            .drain(..)
            .partition(|(index, _)| (first..last).contains(index));
        for (_, node) in stale {
            self.detach(node);
        }

        let mut mounted = keep;
        for index in first..last {
            if mounted.iter().any(|(i, _)| *i == index) {
                continue;
            }
            let spec = v.list.rows[index].clone();
            let node = self.mount_row(v.scroller, index, &spec, &v.list);
            mounted.push((index, node));
        }
        mounted.sort_by_key(|(index, _)| *index);

        let order: Vec<NodeId> = mounted.iter().map(|(_, node)| *node).collect();
        let children = &mut self.node_mut(v.scroller).children;
        children.retain(|child| !order.contains(child));
        children.extend(order);
        v.mounted = mounted;
    }
}

/// In-memory [`Host`] implementation. Clones share one document.
#[derive(Debug, Clone)]
pub struct MemoryHost {
    doc: Rc<RefCell<Document>>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    pub fn new() -> Self {
        let root = NodeData {
            tag: "html".to_string(),
            size: Size::new(1280.0, 800.0),
            attached: true,
            ..NodeData::default()
        };
        Self {
            doc: Rc::new(RefCell::new(Document {
                nodes: vec![root],
                virtualizers: Vec::new(),
                wheel_events: 0,
                cdn_host: "cdn.discordapp.com".to_string(),
                frozen: false,
            })),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn append(&self, parent: NodeId, tag: &str) -> NodeId {
        self.doc.borrow_mut().append(parent, tag)
    }

    pub fn set_attr(&self, node: NodeId, name: &str, value: &str) {
        self.doc.borrow_mut().set_attr(node, name, value);
    }

    pub fn set_text(&self, node: NodeId, text: &str) {
        self.doc.borrow_mut().node_mut(node).text = text.to_string();
    }

    pub fn set_size(&self, node: NodeId, width: f64, height: f64) {
        self.doc.borrow_mut().node_mut(node).size = Size::new(width, height);
    }

    /// Turns `node` into a scroll container with the given visible and content heights.
    pub fn make_scroller(&self, node: NodeId, client_height: f64, content_height: f64) {
        let mut doc = self.doc.borrow_mut();
        let data = doc.node_mut(node);
        if data.size.height <= 0.0 {
            data.size.height = client_height;
        }
        data.scroll = Some(ScrollBox {
            top: 0.0,
            client_height,
            content_height,
            code_writable: true,
        });
    }

    /// When `false`, offset writes are ignored and only wheel input moves the scroller.
    pub fn set_code_scroll_writable(&self, node: NodeId, writable: bool) {
        if let Some(scroll) = self.doc.borrow_mut().node_mut(node).scroll.as_mut() {
            scroll.code_writable = writable;
        }
    }

    pub fn detach(&self, node: NodeId) {
        self.doc.borrow_mut().detach(node);
    }

    /// Binds a virtualized list to `scroller` and renders the first window.
    pub fn virtualize(&self, scroller: NodeId, list: VirtualList) {
        let mut doc = self.doc.borrow_mut();
        doc.virtualizers.retain(|v| v.scroller != scroller);
        doc.virtualizers.push(Virtualizer {
            scroller,
            list,
            loaded: 0,
            mounted: Vec::new(),
        });
        doc.render();
    }

    /// Replaces the list behind `scroller`, scrolling back to the top.
    pub fn replace_rows(&self, scroller: NodeId, rows: Vec<RowSpec>) {
        let mut doc = self.doc.borrow_mut();
        let mounted: Vec<NodeId> = doc
            .virtualizers
            .iter_mut()
            .filter(|v| v.scroller == scroller)
            .flat_map(|v| {
                v.list.rows = rows.clone();
                v.loaded = 0;
                v.mounted.drain(..).map(|(_, node)| node).collect::<Vec<_>>()
            })
            .collect();
        for node in mounted {
            doc.detach(node);
        }
        if let Some(scroll) = doc.node_mut(scroller).scroll.as_mut() {
            scroll.top = 0.0;
        }
        doc.render();
    }

    /// Stops re-rendering, modelling a host that never mounts new rows.
    pub fn freeze(&self) {
        self.doc.borrow_mut().frozen = true;
    }

    pub fn render(&self) {
        self.doc.borrow_mut().render();
    }

    pub fn mounted_rows(&self, scroller: NodeId) -> Vec<NodeId> {
        self.doc
            .borrow()
            .virtualizers
            .iter()
            .filter(|v| v.scroller == scroller)
            .flat_map(|v| v.mounted.iter().map(|(_, node)| *node))
            .collect()
    }

    pub fn wheel_events(&self) -> usize {
        self.doc.borrow().wheel_events
    }

    pub fn highlighted_nodes(&self) -> Vec<NodeId> {
        let doc = self.doc.borrow();
        (0..doc.nodes.len())
            .map(NodeId)
            .filter(|id| doc.node(*id).highlighted)
            .collect()
    }
}

#[async_trait(?Send)]
impl Host for MemoryHost {
    type Node = NodeId;

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.doc.borrow().node(*node).parent
    }

    fn descendants(&self, root: &NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.doc.borrow().walk(*root, &mut out);
        out
    }

    fn tag_name(&self, node: &NodeId) -> String {
        self.doc.borrow().node(*node).tag.clone()
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        self.doc
            .borrow()
            .node(*node)
            .attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }

    fn text_content(&self, node: &NodeId) -> String {
        let doc = self.doc.borrow();
        let mut out = doc.node(*node).text.clone();
        let mut nodes = Vec::new();
        doc.walk(*node, &mut nodes);
        for id in nodes {
            out.push_str(&doc.node(id).text);
        }
        out
    }

    fn inner_text(&self, node: &NodeId) -> String {
        let doc = self.doc.borrow();
        let mut nodes = vec![*node];
        doc.walk(*node, &mut nodes);
        nodes
            .into_iter()
            .map(|id| doc.node(id).text.as_str())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn child_element_count(&self, node: &NodeId) -> usize {
        self.doc.borrow().node(*node).children.len()
    }

    fn is_attached(&self, node: &NodeId) -> bool {
        self.doc.borrow().node(*node).attached
    }

    fn is_rendered(&self, node: &NodeId) -> bool {
        let doc = self.doc.borrow();
        let data = doc.node(*node);
        data.attached && !data.size.is_empty()
    }

    fn layout_size(&self, node: &NodeId) -> Size {
        self.doc.borrow().node(*node).size
    }

    fn scroll_metrics(&self, node: &NodeId) -> ScrollMetrics {
        let doc = self.doc.borrow();
        let data = doc.node(*node);
        match data.scroll {
            Some(scroll) => ScrollMetrics {
                scroll_top: scroll.top,
                scroll_height: scroll.content_height.max(scroll.client_height),
                client_height: scroll.client_height,
            },
            None => ScrollMetrics {
                scroll_top: 0.0,
                scroll_height: data.size.height,
                client_height: data.size.height,
            },
        }
    }

    fn set_scroll_top(&self, node: &NodeId, top: f64) {
        let mut doc = self.doc.borrow_mut();
        if let Some(scroll) = doc.node_mut(*node).scroll.as_mut() {
            if scroll.code_writable {
                scroll.top = top;
                scroll.clamp();
            }
        }
    }

    fn scroll_into_view(&self, node: &NodeId, align: ScrollAlign) {
        let mut doc = self.doc.borrow_mut();
        let (Some(offset), height) = (doc.node(*node).offset_top, doc.node(*node).size.height)
        else {
            return;
        };
        let Some(scroller) = doc.nearest_scroll_box(*node) else {
            return;
        };
        if let Some(scroll) = doc.node_mut(scroller).scroll.as_mut() {
            if !scroll.code_writable {
                return;
            }
            scroll.top = match align {
                ScrollAlign::Start => offset,
                ScrollAlign::Center => offset + height / 2.0 - scroll.client_height / 2.0,
                ScrollAlign::End => offset + height - scroll.client_height,
            };
            scroll.clamp();
        }
    }

    fn dispatch_wheel(&self, node: &NodeId, delta_y: f64) -> Result<(), HostError> {
        let mut doc = self.doc.borrow_mut();
        if !doc.node(*node).attached {
            return Err(HostError::Detached);
        }
        doc.wheel_events += 1;

        let mut cursor = Some(*node);
        while let Some(current) = cursor {
            if let Some(scroll) = doc.node_mut(current).scroll.as_mut() {
                if scroll.max_top() > 0.0 {
                    scroll.top += delta_y;
                    scroll.clamp();
                    return Ok(());
                }
            }
            cursor = doc.node(current).parent;
        }
        Ok(())
    }

    fn set_highlight(&self, node: &NodeId, on: bool) {
        self.doc.borrow_mut().node_mut(*node).highlighted = on;
    }

    async fn suspend(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
        self.render();
    }
}
