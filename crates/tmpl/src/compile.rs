//! Template compilation.
//!
//! The statics of a tagged template are rewritten into parseable HTML with a
//! sentinel (`dyn-$N$`) standing in for each dynamic slot, steered by the
//! lexer's per-character classification: a slot in text position becomes a
//! comment (`<!--dyn-$N$-->`) so the parser materializes a node there, and a
//! slot inside a tag stays inline so it lands in an attribute name or value.
//! Uppercase attribute-name characters are escaped as `$x` to survive the
//! parser's lowercasing and recovered afterwards.
//!
//! The rewritten string is parsed once by the `dom` parser — the single
//! source of structural truth — and the resulting fragment is walked to
//! replace slot comments with empty text-node bookends and to classify
//! attribute slots into attribute/property/directive parts. Elements owning
//! parts are tagged with a `data-dynparts` index list so instances cloned
//! from the fragment can recover part nodes in one scan.
//!
//! Shape errors (slot/dynamic count mismatch, partial attribute
//! interpolation, directives with values) are raised in debug builds only;
//! release builds skip the checks and misrender instead.

use crate::ctx::Ctx;
use crate::error::Error;
use crate::lexer::{self, PLACEHOLDER, State};
use crate::value::Statics;
use dom::{Document, NodeId, collapse_whitespace, parse_fragment};
use std::fmt::Write;
use std::rc::Rc;

pub(crate) const MARKER_PREFIX: &str = "dyn-$";
pub(crate) const PARTS_ATTR: &str = "data-dynparts";

#[derive(Debug)]
pub(crate) struct CompiledTemplate {
    /// Detached fragment holding the parsed skeleton; cloned per instance.
    pub content: NodeId,
    /// One descriptor per dynamic slot, in document (= dynamic) order.
    pub parts: Vec<PartDescriptor>,
}

#[derive(Clone, Debug)]
pub(crate) struct PartDescriptor {
    /// Position in the template's dynamics.
    pub index: usize,
    pub kind: PartKind,
    /// Child parts anchored at the fragment root bind into the owning span
    /// instead of a cloned element.
    pub root: bool,
}

#[derive(Clone, Debug)]
pub(crate) enum PartKind {
    Child { sibling: usize },
    Attribute { name: String },
    Property { name: String },
    Directive,
}

/// Compile (or fetch from the cache) the template for `statics`.
pub(crate) fn compiled(ctx: &mut Ctx, statics: &'static Statics) -> Result<Rc<CompiledTemplate>, Error> {
    let id = statics.id();
    if let Some(cached) = ctx.templates.get(&id) {
        return Ok(cached.clone());
    }
    let compiled = compile(&mut ctx.doc, statics)?;
    log::trace!(
        target: "tmpl.compile",
        "compiled template {id}: {} parts",
        compiled.parts.len()
    );
    let compiled = Rc::new(compiled);
    ctx.templates.insert(id, compiled.clone());
    Ok(compiled)
}

/// The sentinel-embedded, whitespace-collapsed markup for `statics`. The
/// client parses this; the server slices it. Both sides must see the exact
/// same bytes or hydration cannot align.
pub(crate) fn synthetic_markup(statics: &[&str]) -> String {
    let mut out = String::new();
    let mut index = 0usize;
    for (ch, state) in lexer::lex(statics) {
        if ch == PLACEHOLDER {
            match state {
                State::Data => {
                    let _ = write!(out, "<!--{MARKER_PREFIX}{index}$-->");
                }
                _ => {
                    let _ = write!(out, "{MARKER_PREFIX}{index}$");
                }
            }
            index += 1;
        } else if state == State::AttrName && ch.is_ascii_uppercase() {
            out.push('$');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    collapse_whitespace(&out)
}

/// Parse `dyn-$N$` (whole-string match only).
pub(crate) fn parse_marker(s: &str) -> Option<usize> {
    let digits = s.strip_prefix(MARKER_PREFIX)?.strip_suffix('$')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Undo the `$x` case escaping: `my$prop` becomes `myProp`.
pub(crate) fn restore_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars();
    while let Some(ch) = chars.next() {
        if ch == '$' {
            match chars.next() {
                Some(next) => out.push(next.to_ascii_uppercase()),
                None => out.push('$'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Dynamic bindings for these names always go through attributes; everything
/// else is a property assignment.
pub(crate) fn is_forced_attribute(name: &str) -> bool {
    name == "class" || name == "for" || name.contains('-')
}

fn compile(doc: &mut Document, statics: &'static Statics) -> Result<CompiledTemplate, Error> {
    let strings = statics.strings();
    let expected = strings.len().saturating_sub(1);
    let markup = synthetic_markup(strings);
    let content = parse_fragment(doc, &markup);

    let mut found: Vec<Option<PartDescriptor>> = vec![None; expected];
    let mut surplus = false;
    let mut record = |slot: usize, descriptor: PartDescriptor| match found.get_mut(slot) {
        Some(entry) if entry.is_none() => *entry = Some(descriptor),
        _ => surplus = true,
    };

    for node in doc.descendants(content) {
        if let Some(data) = doc.comment_data(node).map(str::to_string) {
            let Some(index) = parse_marker(&data) else {
                continue;
            };
            let parent = doc.parent(node).expect("walked nodes are attached");
            let sibling = doc
                .child_index(parent, node)
                .expect("comment is a child of its parent");
            let lead = doc.create_text("");
            let trail = doc.create_text("");
            doc.insert_before(parent, lead, Some(node));
            doc.insert_before(parent, trail, Some(node));
            doc.detach(node);
            let root = parent == content;
            if !root {
                tag_part(doc, parent, index);
            }
            record(
                index,
                PartDescriptor {
                    index,
                    kind: PartKind::Child { sibling },
                    root,
                },
            );
        } else if doc.is_element(node) {
            compile_element(doc, node, &mut record)?;
        }
    }
    drop(record);

    if cfg!(debug_assertions) {
        if surplus {
            return Err(Error::TemplateShape("got more parts than expected".into()));
        }
        let count = found.iter().filter(|f| f.is_some()).count();
        if count != expected {
            return Err(Error::TemplateShape(format!(
                "expected the same number of dynamics as parts, found {count} parts for {expected} dynamics"
            )));
        }
    }

    Ok(CompiledTemplate {
        content,
        parts: found.into_iter().flatten().collect(),
    })
}

fn compile_element(
    doc: &mut Document,
    node: NodeId,
    record: &mut impl FnMut(usize, PartDescriptor),
) -> Result<(), Error> {
    let attrs: Vec<(String, Option<String>)> = doc.attrs(node).to_vec();
    let mut bound_names: Vec<String> = Vec::new();
    for (name, value) in attrs {
        if let Some(index) = parse_marker(&name) {
            if cfg!(debug_assertions) && !value.as_deref().unwrap_or("").is_empty() {
                return Err(Error::TemplateShape(
                    "a directive attribute must not have a value".into(),
                ));
            }
            doc.remove_attr(node, &name);
            tag_part(doc, node, index);
            record(
                index,
                PartDescriptor {
                    index,
                    kind: PartKind::Directive,
                    root: false,
                },
            );
        } else if name.contains(MARKER_PREFIX) {
            if cfg!(debug_assertions) {
                return Err(Error::TemplateShape(format!(
                    "dynamic attribute names must stand alone, found \"{name}\""
                )));
            }
        } else if let Some(value) = value {
            if let Some(index) = parse_marker(&value) {
                let recovered = restore_case(&name);
                if cfg!(debug_assertions) && bound_names.contains(&recovered) {
                    return Err(Error::TemplateShape(format!(
                        "duplicate dynamic attribute \"{recovered}\" after case recovery"
                    )));
                }
                doc.remove_attr(node, &name);
                tag_part(doc, node, index);
                let kind = if is_forced_attribute(&recovered) {
                    PartKind::Attribute { name: recovered.clone() }
                } else {
                    PartKind::Property { name: recovered.clone() }
                };
                bound_names.push(recovered);
                record(
                    index,
                    PartDescriptor {
                        index,
                        kind,
                        root: false,
                    },
                );
            } else if cfg!(debug_assertions) && value.contains(MARKER_PREFIX) {
                return Err(Error::TemplateShape(format!(
                    "partial interpolation of attribute \"{name}\" is not supported"
                )));
            }
        }
    }
    Ok(())
}

fn tag_part(doc: &mut Document, node: NodeId, index: usize) {
    let list = match doc.attr(node, PARTS_ATTR) {
        Some(existing) => format!("{existing} {index}"),
        None => index.to_string(),
    };
    doc.set_attr(node, PARTS_ATTR, Some(&list));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_strings(strings: &'static [&'static str]) -> Result<(Document, CompiledTemplate), Error> {
        // Tests bypass the cache to exercise distinct statics freely.
        let statics: &'static Statics = Box::leak(Box::new(Statics::new(strings)));
        let mut doc = Document::new();
        let compiled = compile(&mut doc, statics)?;
        Ok((doc, compiled))
    }

    #[test]
    fn child_slot_becomes_bookends_at_recorded_offset() {
        let (doc, compiled) = compile_strings(&["<div>a", "b</div>"]).unwrap();
        assert_eq!(compiled.parts.len(), 1);
        let PartKind::Child { sibling } = &compiled.parts[0].kind else {
            panic!("expected child part, got {:?}", compiled.parts[0].kind);
        };
        assert_eq!(*sibling, 1);
        assert!(!compiled.parts[0].root);
        let div = doc.children(compiled.content)[0];
        // "a", lead, trail, "b"
        assert_eq!(doc.children(div).len(), 4);
        assert!(doc.is_text(doc.children(div)[1]));
        assert!(doc.is_text(doc.children(div)[2]));
        assert_eq!(doc.attr(div, PARTS_ATTR), Some("0"));
    }

    #[test]
    fn root_level_slot_is_marked_root() {
        let (_, compiled) = compile_strings(&["a", "b"]).unwrap();
        assert!(compiled.parts[0].root);
    }

    #[test]
    fn attribute_and_property_split() {
        let (doc, compiled) =
            compile_strings(&["<div class=\"", "\" title=\"", "\"></div>"]).unwrap();
        assert!(matches!(
            &compiled.parts[0].kind,
            PartKind::Attribute { name } if name == "class"
        ));
        assert!(matches!(
            &compiled.parts[1].kind,
            PartKind::Property { name } if name == "title"
        ));
        let div = doc.children(compiled.content)[0];
        // The dynamic attributes never round-trip as literal attributes.
        assert!(doc.attr(div, "class").is_none());
        assert!(doc.attr(div, "title").is_none());
        assert_eq!(doc.attr(div, PARTS_ATTR), Some("0 1"));
    }

    #[test]
    fn hyphenated_names_are_forced_attributes() {
        let (_, compiled) = compile_strings(&["<div data-x=", "></div>"]).unwrap();
        assert!(matches!(
            &compiled.parts[0].kind,
            PartKind::Attribute { name } if name == "data-x"
        ));
    }

    #[test]
    fn uppercase_property_names_survive_parsing() {
        let (_, compiled) = compile_strings(&["<div myProp=\"", "\"></div>"]).unwrap();
        assert!(matches!(
            &compiled.parts[0].kind,
            PartKind::Property { name } if name == "myProp"
        ));
    }

    #[test]
    fn bare_dynamic_attribute_is_a_directive() {
        let (_, compiled) = compile_strings(&["<input ", ">"]).unwrap();
        assert!(matches!(compiled.parts[0].kind, PartKind::Directive));
    }

    #[test]
    fn comment_slot_is_a_child_part_only_on_exact_match() {
        let (_, compiled) = compile_strings(&["<!--", "-->"]).unwrap();
        assert!(matches!(compiled.parts[0].kind, PartKind::Child { .. }));
    }

    #[test]
    #[cfg(debug_assertions)]
    fn padded_comment_slot_is_a_shape_error() {
        let err = compile_strings(&["<!-- ", " -->"]).unwrap_err();
        assert!(matches!(err, Error::TemplateShape(_)), "got {err:?}");
    }

    #[test]
    #[cfg(debug_assertions)]
    fn partial_attribute_interpolation_is_rejected() {
        let err = compile_strings(&["<div class=\"a ", "\"></div>"]).unwrap_err();
        let Error::TemplateShape(msg) = &err else {
            panic!("expected shape error, got {err:?}");
        };
        assert!(msg.contains("partial interpolation"), "got: {msg}");
    }

    #[test]
    #[cfg(debug_assertions)]
    fn hand_written_marker_text_is_detected() {
        let err = compile_strings(&["<p>dyn-$0$<!--dyn-$1$--></p>", "</p>"]);
        // The literal comment marker collides with slot numbering: either
        // surplus or count mismatch, both shape errors.
        assert!(matches!(err, Err(Error::TemplateShape(_))), "got {err:?}");
    }

    #[test]
    fn whitespace_runs_collapse_in_static_text() {
        let markup = synthetic_markup(&["<p>a   b</p>"]);
        assert_eq!(markup, "<p>a b</p>");
    }

    #[test]
    fn restore_case_roundtrip() {
        assert_eq!(restore_case("my$prop"), "myProp");
        assert_eq!(restore_case("plain"), "plain");
        assert_eq!(restore_case("$a$b"), "AB");
    }

    #[test]
    fn parse_marker_requires_whole_match() {
        assert_eq!(parse_marker("dyn-$7$"), Some(7));
        assert_eq!(parse_marker("dyn-$7$x"), None);
        assert_eq!(parse_marker("xdyn-$7$"), None);
        assert_eq!(parse_marker("dyn-$$"), None);
        assert_eq!(parse_marker("dyn-$a$"), None);
    }
}
