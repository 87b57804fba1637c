//! Indented tree outlines for debugging and test failure output.

use crate::arena::{Document, NodeId, NodeKind};

/// Render the subtree at `id` as one line per node, capped at `cap` nodes.
pub fn outline(doc: &Document, id: NodeId, cap: usize) -> Vec<String> {
    fn walk(doc: &Document, id: NodeId, depth: usize, out: &mut Vec<String>, left: &mut usize) {
        if *left == 0 {
            return;
        }
        *left -= 1;
        let indent = "  ".repeat(depth);
        match doc.kind(id) {
            NodeKind::Fragment => out.push(format!("{indent}#fragment {id}")),
            NodeKind::Element { name, attrs, .. } => {
                let mut line = format!("{indent}<{name}");
                for (attr, value) in attrs {
                    match value {
                        Some(v) => line.push_str(&format!(r#" {attr}="{v}""#)),
                        None => line.push_str(&format!(" {attr}")),
                    }
                }
                line.push_str(&format!("> {id}"));
                out.push(line);
            }
            NodeKind::Text { data } => out.push(format!("{indent}{:?} {id}", truncated(data))),
            NodeKind::Comment { data } => {
                out.push(format!("{indent}<!--{}--> {id}", truncated(data)))
            }
        }
        for child in doc.children(id) {
            walk(doc, *child, depth + 1, out, left);
        }
    }

    let mut out = Vec::new();
    let mut left = cap;
    walk(doc, id, 0, &mut out, &mut left);
    out
}

fn truncated(s: &str) -> String {
    if s.chars().count() > 40 {
        let head: String = s.chars().take(40).collect();
        format!("{head}…")
    } else {
        s.to_string()
    }
}
