//! Token stream to tree construction.
//!
//! A deliberately small tree builder: an open-element stack over the arena,
//! no adoption agency, no implied tags. End tags pop to the nearest matching
//! open element; stray end tags pop nothing past the fragment root. Doctype
//! tokens are ignored in fragment context.

use crate::arena::{Document, NodeId};
use crate::tokenizer::{Token, Tokenizer};

/// Parse `html` into a fresh detached fragment.
pub fn parse_fragment(doc: &mut Document, html: &str) -> NodeId {
    let fragment = doc.create_fragment();
    parse_into(doc, fragment, html);
    fragment
}

/// Parse `html` and append the resulting nodes to `parent`.
pub fn parse_into(doc: &mut Document, parent: NodeId, html: &str) {
    let mut open: Vec<NodeId> = vec![parent];
    for t in Tokenizer::new(html) {
        let top = *open.last().expect("open stack never drains past the root");
        match t.token {
            Token::Doctype(_) => {}
            Token::Text(text) => {
                let node = doc.create_text(&text);
                doc.append_child(top, node);
            }
            Token::Comment(data) => {
                let node = doc.create_comment(&data);
                doc.append_child(top, node);
            }
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                let el = doc.create_element(&name);
                for (attr, value) in &attributes {
                    doc.set_attr(el, attr, value.as_deref());
                }
                doc.append_child(top, el);
                if !self_closing {
                    open.push(el);
                }
            }
            Token::EndTag(name) => {
                let matches_open = open[1..]
                    .iter()
                    .rev()
                    .any(|id| doc.element_name(*id) == Some(name.as_str()));
                if !matches_open {
                    log::trace!(target: "dom.builder", "ignoring stray end tag </{name}>");
                    continue;
                }
                while open.len() > 1 {
                    let popped = open.pop().expect("guarded by len check");
                    if doc.element_name(popped) == Some(name.as_str()) {
                        break;
                    }
                }
            }
        }
    }
}
