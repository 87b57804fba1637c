//! Markup serialization and the escaping/whitespace helpers shared with the
//! string renderer.
//!
//! `inner_html` mirrors what a browser would report: text escaped, attribute
//! values double-quoted and escaped, void elements without close tags,
//! comments as `<!--data-->`. Element properties are live-tree-only state and
//! never serialize.

use crate::arena::{Document, NodeId, NodeKind};
use crate::tokenizer::is_void_element;

pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Collapse every whitespace run longer than one character to a single space.
/// A lone whitespace character is kept as-is.
///
/// Both the template compiler (before handing markup to the parser) and the
/// string renderer (on static segments) apply this; hydration's node-for-node
/// walk relies on the two sides agreeing exactly.
pub fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch.is_ascii_whitespace() && chars.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            while chars.peek().is_some_and(|c| c.is_ascii_whitespace()) {
                chars.next();
            }
            out.push(' ');
        } else {
            out.push(ch);
        }
    }
    out
}

/// Serialize the children of `id`.
pub fn inner_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    for child in doc.children(id) {
        write_node(doc, *child, &mut out);
    }
    out
}

/// Serialize `id` itself, subtree included.
pub fn outer_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, id, &mut out);
    out
}

fn write_node(doc: &Document, id: NodeId, out: &mut String) {
    match doc.kind(id) {
        NodeKind::Fragment => {
            for child in doc.children(id) {
                write_node(doc, *child, out);
            }
        }
        NodeKind::Element { name, attrs, .. } => {
            out.push('<');
            out.push_str(name);
            for (attr, value) in attrs {
                out.push(' ');
                out.push_str(attr);
                if let Some(value) = value {
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
            }
            out.push('>');
            if is_void_element(name) {
                return;
            }
            for child in doc.children(id) {
                write_node(doc, *child, out);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        NodeKind::Text { data } => out.push_str(&escape_text(data)),
        NodeKind::Comment { data } => {
            out.push_str("<!--");
            out.push_str(data);
            out.push_str("-->");
        }
    }
}
