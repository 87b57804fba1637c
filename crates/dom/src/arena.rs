//! Arena-backed document tree.
//!
//! Nodes live in a flat slot vector and are addressed by `NodeId`. Ids are
//! stable for the lifetime of the `Document`: detaching a node removes it from
//! its parent's child list but never invalidates the id, so callers may hold
//! ids across arbitrary tree mutation. Slots are not recycled; a document is
//! expected to host a bounded page worth of nodes, not unbounded churn.
//!
//! Invariants:
//! - A node has at most one parent, and appears in that parent's child list
//!   exactly once.
//! - `parent`/`children` links are kept symmetric by every mutation op.
//! - Only `Fragment` and `Element` nodes carry children.

use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Scalar value assignable to an element property.
///
/// Properties are the non-serialized half of element state: they never appear
/// in markup and are only reachable through the live tree.
#[derive(Clone, Debug, PartialEq)]
pub enum PropValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug)]
pub enum NodeKind {
    Fragment,
    Element {
        name: String,
        attrs: Vec<(String, Option<String>)>,
        props: Vec<(String, PropValue)>,
    },
    Text {
        data: String,
    },
    Comment {
        data: String,
    },
}

#[derive(Debug)]
struct NodeData {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

#[derive(Debug, Default)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Document {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            parent: None,
            children: Vec::new(),
            kind,
        });
        id
    }

    fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.index()]
    }

    pub fn create_fragment(&mut self) -> NodeId {
        self.alloc(NodeKind::Fragment)
    }

    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.alloc(NodeKind::Element {
            name: name.to_string(),
            attrs: Vec::new(),
            props: Vec::new(),
        })
    }

    pub fn create_text(&mut self, data: &str) -> NodeId {
        self.alloc(NodeKind::Text {
            data: data.to_string(),
        })
    }

    pub fn create_comment(&mut self, data: &str) -> NodeId {
        self.alloc(NodeKind::Comment {
            data: data.to_string(),
        })
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).children.first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).children.last().copied()
    }

    pub fn child_index(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.node(parent).children.iter().position(|c| *c == child)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.node(id).parent?;
        let index = self.child_index(parent, id)?;
        self.node(parent).children.get(index + 1).copied()
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.node(id).parent?;
        let index = self.child_index(parent, id)?;
        index.checked_sub(1).map(|i| self.node(parent).children[i])
    }

    /// Remove `id` from its parent's child list. The subtree stays intact and
    /// the id stays valid.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).parent else {
            return;
        };
        self.node_mut(parent).children.retain(|c| *c != id);
        self.node_mut(id).parent = None;
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    /// Insert `child` into `parent` before `before`, or at the end when
    /// `before` is `None`. The child is detached from any previous parent
    /// first.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, before: Option<NodeId>) {
        debug_assert!(
            matches!(
                self.node(parent).kind,
                NodeKind::Fragment | NodeKind::Element { .. }
            ),
            "insert target {parent} cannot have children"
        );
        self.detach(child);
        let position = match before {
            Some(anchor) => self
                .child_index(parent, anchor)
                .expect("insert_before anchor must be a child of parent"),
            None => self.node(parent).children.len(),
        };
        self.node_mut(parent).children.insert(position, child);
        self.node_mut(child).parent = Some(parent);
    }

    /// Insert `child` immediately after the sibling `after`.
    pub fn insert_after(&mut self, parent: NodeId, child: NodeId, after: NodeId) {
        let next = self.next_sibling(after);
        self.insert_before(parent, child, next);
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind, NodeKind::Element { .. })
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind, NodeKind::Text { .. })
    }

    pub fn is_comment(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind, NodeKind::Comment { .. })
    }

    pub fn element_name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Text { data } => Some(data),
            _ => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, new_data: &str) {
        match &mut self.node_mut(id).kind {
            NodeKind::Text { data } => {
                data.clear();
                data.push_str(new_data);
            }
            other => panic!("set_text on non-text node {id}: {other:?}"),
        }
    }

    pub fn comment_data(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Comment { data } => Some(data),
            _ => None,
        }
    }

    pub fn attrs(&self, id: NodeId) -> &[(String, Option<String>)] {
        match &self.node(id).kind {
            NodeKind::Element { attrs, .. } => attrs,
            _ => &[],
        }
    }

    /// Attribute lookup. A present-but-valueless attribute reads as `Some("")`.
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_deref().unwrap_or(""))
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attrs(id).iter().any(|(n, _)| n == name)
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: Option<&str>) {
        let NodeKind::Element { attrs, .. } = &mut self.node_mut(id).kind else {
            panic!("set_attr on non-element node {id}");
        };
        let value = value.map(str::to_string);
        match attrs.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => attrs.push((name.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let NodeKind::Element { attrs, .. } = &mut self.node_mut(id).kind {
            attrs.retain(|(n, _)| n != name);
        }
    }

    pub fn prop(&self, id: NodeId, name: &str) -> Option<&PropValue> {
        match &self.node(id).kind {
            NodeKind::Element { props, .. } => {
                props.iter().find(|(n, _)| n == name).map(|(_, v)| v)
            }
            _ => None,
        }
    }

    pub fn set_prop(&mut self, id: NodeId, name: &str, value: PropValue) {
        let NodeKind::Element { props, .. } = &mut self.node_mut(id).kind else {
            panic!("set_prop on non-element node {id}");
        };
        match props.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => props.push((name.to_string(), value)),
        }
    }

    /// Deep-copy the subtree rooted at `id`. The copy is detached.
    pub fn clone_subtree(&mut self, id: NodeId) -> NodeId {
        let kind = match &self.node(id).kind {
            NodeKind::Fragment => NodeKind::Fragment,
            NodeKind::Element { name, attrs, props } => NodeKind::Element {
                name: name.clone(),
                attrs: attrs.clone(),
                props: props.clone(),
            },
            NodeKind::Text { data } => NodeKind::Text { data: data.clone() },
            NodeKind::Comment { data } => NodeKind::Comment { data: data.clone() },
        };
        let copy = self.alloc(kind);
        let children = self.node(id).children.clone();
        for child in children {
            let child_copy = self.clone_subtree(child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    /// Pre-order descendants of `id`, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.node(id).children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            for child in self.node(next).children.iter().rev() {
                stack.push(*child);
            }
        }
        out
    }
}
