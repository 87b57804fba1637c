//! Contiguous runs of sibling nodes.
//!
//! A span owns the range `start..=end` of its parent's children. Content
//! changes shape through three operations: insert (after `end`), extract
//! (detach the whole range into a fragment) and delete (extract and discard).
//!
//! Invariant: a span is never empty. Extraction and deletion leave behind a
//! placeholder text node (the *marker*) standing in as both bounds, so there
//! is always a real node to insert relative to; the next insertion consumes
//! it and advances `start` past it.

use dom::{Document, NodeId, NodeKind};

#[derive(Debug)]
pub(crate) struct Span {
    pub parent: NodeId,
    pub start: NodeId,
    pub end: NodeId,
    pub marker: Option<NodeId>,
}

impl Span {
    pub fn between(parent: NodeId, start: NodeId, end: NodeId) -> Self {
        Self {
            parent,
            start,
            end,
            marker: None,
        }
    }

    /// Insert `node` (or, for a fragment, its children) immediately after
    /// `end`, extending `end` to the last inserted node. A standing marker is
    /// removed and `start` advances past it.
    pub fn insert_node(&mut self, doc: &mut Document, node: NodeId) {
        let mut last = self.end;
        if matches!(doc.kind(node), NodeKind::Fragment) {
            let children: Vec<NodeId> = doc.children(node).to_vec();
            if children.is_empty() {
                return;
            }
            for child in children {
                doc.insert_after(self.parent, child, last);
                last = child;
            }
        } else {
            doc.insert_after(self.parent, node, last);
            last = node;
        }
        self.end = last;
        if let Some(marker) = self.marker.take() {
            let first = doc
                .next_sibling(marker)
                .expect("inserted content follows the span marker");
            self.start = first;
            doc.detach(marker);
        }
    }

    /// Detach `start..=end` into a fragment and return it, leaving a fresh
    /// marker as the degenerate span.
    pub fn extract_contents(&mut self, doc: &mut Document) -> NodeId {
        let marker = doc.create_text("");
        doc.insert_before(self.parent, marker, Some(self.start));
        let fragment = doc.create_fragment();
        let mut cursor = Some(self.start);
        while let Some(node) = cursor {
            let next = doc.next_sibling(node);
            doc.append_child(fragment, node);
            if node == self.end {
                break;
            }
            cursor = next;
        }
        self.start = marker;
        self.end = marker;
        self.marker = Some(marker);
        fragment
    }

    /// Extract and discard the span contents.
    pub fn delete_contents(&mut self, doc: &mut Document) {
        let _ = self.extract_contents(doc);
    }

    /// Nodes strictly between `start` and `end` (both exclusive).
    pub fn inner_nodes(&self, doc: &Document) -> Vec<NodeId> {
        let mut out = Vec::new();
        if self.start == self.end {
            return out;
        }
        let mut cursor = doc.next_sibling(self.start);
        while let Some(node) = cursor {
            if node == self.end {
                break;
            }
            out.push(node);
            cursor = doc.next_sibling(node);
        }
        out
    }
}
