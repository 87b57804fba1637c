//! Hydration: reattach live behavior to server-rendered markup.
//!
//! The server brackets every dynamic child region with the comment pair
//! `?[` … `?]` (nested regions are depth-balanced). Hydration finds the
//! outermost pair under the mount point, then walks the live region and the
//! compiled template fragment side by side: elements and comments must agree
//! node for node, marker pairs in the live tree are consumed as the pending
//! child-part regions of the current level, and `data-dynparts` annotations
//! on the reference elements recover attribute/property/directive locations.
//! No HTML is re-parsed; a structural disagreement is fatal.

use crate::compile::{CompiledTemplate, PARTS_ATTR, PartKind};
use crate::ctx::Ctx;
use crate::error::Error;
use crate::root::{Root, RootInner};
use crate::span::Span;
use crate::value::Value;
use dom::{Document, NodeId};
use std::collections::{HashMap, VecDeque};

/// Comment data of the region markers. The server writes them as `<?[>` and
/// `<?]>`, which the HTML parser reads back as comments with exactly this
/// data — the one wire contract shared by both renderers.
pub(crate) const OPEN_MARK: &str = "?[";
pub(crate) const CLOSE_MARK: &str = "?]";

/// Attach to server-rendered markup inside `parent` and return a root over
/// it. Subsequent `render` calls patch in place exactly as if the root had
/// rendered `value` itself.
pub fn hydrate(ctx: &mut Ctx, parent: NodeId, value: impl Into<Value>) -> Result<Root, Error> {
    let children: Vec<NodeId> = ctx.doc.children(parent).to_vec();
    let open = children
        .iter()
        .position(|node| ctx.doc.comment_data(*node) == Some(OPEN_MARK))
        .ok_or_else(|| Error::Hydration("hydration start marker \"?[\" not found".to_string()))?;
    let close = matching_close(&ctx.doc, &children, open)?;
    let mut span = Span::between(parent, children[open], children[close]);
    let mut inner = RootInner::new();
    inner.hydrate_value(ctx, &mut span, value.into())?;
    log::debug!(target: "tmpl.hydrate", "hydrated region under {parent}");
    Ok(Root::from_parts(span, inner))
}

pub(crate) struct HydrationBindings {
    /// Part index to the live element carrying that attribute-like part.
    pub elements: HashMap<usize, NodeId>,
    /// Part index to its live `?[` / `?]` marker pair.
    pub regions: HashMap<usize, (NodeId, NodeId)>,
}

/// Parallel-walk the live span against the compiled fragment, recovering
/// every part location without re-parsing.
pub(crate) fn walk_template(
    doc: &Document,
    compiled: &CompiledTemplate,
    span: &Span,
) -> Result<HydrationBindings, Error> {
    let mut bindings = HydrationBindings {
        elements: HashMap::new(),
        regions: HashMap::new(),
    };
    let ref_children = doc.children(compiled.content).to_vec();
    let live = span.inner_nodes(doc);
    let pending = compiled
        .parts
        .iter()
        .filter(|descriptor| descriptor.root)
        .map(|descriptor| descriptor.index)
        .collect();
    walk_level(doc, compiled, &ref_children, &live, pending, &mut bindings)?;
    Ok(bindings)
}

fn walk_level(
    doc: &Document,
    compiled: &CompiledTemplate,
    ref_children: &[NodeId],
    live: &[NodeId],
    pending: Vec<usize>,
    bindings: &mut HydrationBindings,
) -> Result<(), Error> {
    let mut pending: VecDeque<usize> = pending.into();
    let mut r = 0usize;
    let mut l = 0usize;
    while l < live.len() {
        let node = live[l];
        if doc.is_text(node) {
            // Text is not compared: the whitespace contract keeps both sides
            // equivalent and dynamic text was adopted by value.
            l += 1;
            continue;
        }
        if let Some(data) = doc.comment_data(node) {
            if data == OPEN_MARK {
                let close = matching_close(doc, live, l)?;
                let index = pending.pop_front().ok_or_else(|| {
                    Error::Hydration("unexpected hydration marker \"?[\"".to_string())
                })?;
                bindings.regions.insert(index, (node, live[close]));
                l = close + 1;
                continue;
            }
            if data == CLOSE_MARK {
                return Err(Error::Hydration(
                    "unexpected hydration marker \"?]\"".to_string(),
                ));
            }
            let reference = next_structural(doc, ref_children, &mut r).ok_or_else(|| {
                Error::Hydration(format!("unexpected comment <!--{data}-->"))
            })?;
            if !doc.is_comment(reference) {
                return Err(mismatch(doc, reference, node));
            }
            l += 1;
            continue;
        }

        // Live element: it must pair with the next reference element.
        let live_name = doc.element_name(node).unwrap_or_default().to_string();
        let reference = next_structural(doc, ref_children, &mut r)
            .ok_or_else(|| Error::Hydration(format!("unexpected element <{live_name}>")))?;
        let Some(ref_name) = doc.element_name(reference) else {
            return Err(mismatch(doc, reference, node));
        };
        if ref_name != live_name {
            return Err(Error::Hydration(format!(
                "expected element <{ref_name}>, found <{live_name}>"
            )));
        }
        let mut child_pending = Vec::new();
        if let Some(list) = doc.attr(reference, PARTS_ATTR) {
            for index in list.split_whitespace().filter_map(|s| s.parse::<usize>().ok()) {
                match part_kind(compiled, index) {
                    Some(PartKind::Child { .. }) => child_pending.push(index),
                    Some(_) => {
                        bindings.elements.insert(index, node);
                    }
                    None => {}
                }
            }
        }
        let ref_kids = doc.children(reference).to_vec();
        let live_kids = doc.children(node).to_vec();
        walk_level(doc, compiled, &ref_kids, &live_kids, child_pending, bindings)?;
        l += 1;
    }

    if let Some(reference) = next_structural(doc, ref_children, &mut r) {
        return Err(Error::Hydration(format!(
            "missing node {}",
            describe(doc, reference)
        )));
    }
    if let Some(index) = pending.pop_front() {
        return Err(Error::Hydration(format!(
            "hydration markers for dynamic slot {index} not found"
        )));
    }
    Ok(())
}

/// Top-level `?[` / `?]` pairs strictly inside `span`, in order — the
/// per-item regions of a hydrated list.
pub(crate) fn item_regions(doc: &Document, span: &Span) -> Result<Vec<(NodeId, NodeId)>, Error> {
    let nodes = span.inner_nodes(doc);
    let mut out = Vec::new();
    let mut i = 0usize;
    while i < nodes.len() {
        let node = nodes[i];
        if doc.comment_data(node) == Some(OPEN_MARK) {
            let close = matching_close(doc, &nodes, i)?;
            out.push((node, nodes[close]));
            i = close + 1;
        } else {
            i += 1;
        }
    }
    Ok(out)
}

/// Index of the `?]` matching the `?[` at `open`, depth-balanced.
fn matching_close(doc: &Document, nodes: &[NodeId], open: usize) -> Result<usize, Error> {
    let mut depth = 0usize;
    for (k, node) in nodes.iter().enumerate().skip(open + 1) {
        match doc.comment_data(*node) {
            Some(OPEN_MARK) => depth += 1,
            Some(CLOSE_MARK) => {
                if depth == 0 {
                    return Ok(k);
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    Err(Error::Hydration(
        "hydration end marker \"?]\" not found".to_string(),
    ))
}

/// Advance `cursor` past reference text nodes (slot bookends and static
/// text) to the next element or comment.
fn next_structural(doc: &Document, nodes: &[NodeId], cursor: &mut usize) -> Option<NodeId> {
    while *cursor < nodes.len() {
        let node = nodes[*cursor];
        *cursor += 1;
        if !doc.is_text(node) {
            return Some(node);
        }
    }
    None
}

fn part_kind<'c>(compiled: &'c CompiledTemplate, index: usize) -> Option<&'c PartKind> {
    compiled
        .parts
        .iter()
        .find(|descriptor| descriptor.index == index)
        .map(|descriptor| &descriptor.kind)
}

fn describe(doc: &Document, node: NodeId) -> String {
    if let Some(name) = doc.element_name(node) {
        format!("<{name}>")
    } else if let Some(data) = doc.comment_data(node) {
        format!("<!--{data}-->")
    } else {
        "#text".to_string()
    }
}

fn mismatch(doc: &Document, reference: NodeId, live: NodeId) -> Error {
    Error::Hydration(format!(
        "expected {}, found {}",
        describe(doc, reference),
        describe(doc, live)
    ))
}
