//! String rendering with the hydration marker protocol.
//!
//! Server templates are compiled from the same synthetic sentinel markup the
//! client parses, but by slicing: the streaming tokenizer locates each
//! sentinel (child-slot comments by their token range, attribute sentinels
//! inside their start tag's range) and the markup is cut into static
//! segments around them. Property and directive slots cut away the whole
//! attribute — they are client-only and emit nothing. Static segments are
//! whitespace-collapsed identically to the client compiler, which is what
//! lets hydration walk the two trees in lockstep.
//!
//! Rendering is a pull-based chunk stream over an explicit work stack:
//! scalars escape, child regions and list items emit `<?[>` … `<?]>` marker
//! pairs, renderables unwrap with the same fallback-template convention as
//! the client, guarded by a bounded per-renderable render count.

use crate::compile::{is_forced_attribute, parse_marker, restore_case, synthetic_markup};
use crate::ctx::Ctx;
use crate::error::Error;
use crate::lifecycle::Scope;
use crate::value::{Statics, Value, renderable_identity};
use dom::{Token, Tokenizer, escape_attr, escape_text, outer_html};
use std::collections::HashMap;
use std::ops::Range;
use std::rc::Rc;

const OPEN_COMMENT: &str = "<?[>";
const CLOSE_COMMENT: &str = "<?]>";

/// Self-render budget per renderable within one stream. A renderable that
/// keeps producing itself (directly or through a cycle) trips this instead
/// of recursing forever; it is a heuristic bound, not cycle detection.
const RENDER_LIMIT: usize = 64;

#[derive(Debug)]
pub(crate) struct ServerTemplate {
    segments: Vec<String>,
    parts: Vec<ServerPart>,
}

#[derive(Debug)]
struct ServerPart {
    index: usize,
    kind: ServerPartKind,
}

#[derive(Debug)]
enum ServerPartKind {
    Child,
    Attribute { name: String },
    Property,
    Directive,
}

fn server_compiled(ctx: &mut Ctx, statics: &'static Statics) -> Result<Rc<ServerTemplate>, Error> {
    let id = statics.id();
    if let Some(cached) = ctx.server_templates.get(&id) {
        return Ok(cached.clone());
    }
    let template = compile_server(statics)?;
    let template = Rc::new(template);
    ctx.server_templates.insert(id, template.clone());
    Ok(template)
}

fn compile_server(statics: &'static Statics) -> Result<ServerTemplate, Error> {
    let strings = statics.strings();
    let expected = strings.len().saturating_sub(1);
    let synthetic = synthetic_markup(strings);

    let mut found: Vec<(Range<usize>, ServerPart)> = Vec::new();
    for token_at in Tokenizer::new(&synthetic) {
        match &token_at.token {
            Token::Comment(data) => {
                if let Some(index) = parse_marker(data) {
                    found.push((
                        token_at.range.clone(),
                        ServerPart {
                            index,
                            kind: ServerPartKind::Child,
                        },
                    ));
                }
            }
            Token::StartTag { attributes, .. } => {
                for (name, value) in attributes {
                    if let Some(index) = parse_marker(name) {
                        let Some(range) = whole_attribute_range(&synthetic, &token_at.range, name)
                        else {
                            continue;
                        };
                        found.push((
                            range,
                            ServerPart {
                                index,
                                kind: ServerPartKind::Directive,
                            },
                        ));
                    } else if let Some(value) = value.as_deref() {
                        let Some(index) = parse_marker(value) else {
                            continue;
                        };
                        let recovered = restore_case(name);
                        if is_forced_attribute(&recovered) {
                            let Some(range) = value_range(&synthetic, &token_at.range, value)
                            else {
                                continue;
                            };
                            found.push((
                                range,
                                ServerPart {
                                    index,
                                    kind: ServerPartKind::Attribute { name: recovered },
                                },
                            ));
                        } else {
                            let Some(range) =
                                whole_attribute_range(&synthetic, &token_at.range, value)
                            else {
                                continue;
                            };
                            found.push((
                                range,
                                ServerPart {
                                    index,
                                    kind: ServerPartKind::Property,
                                },
                            ));
                        }
                    }
                }
            }
            _ => {}
        }
    }

    found.sort_by_key(|(range, _)| range.start);

    if cfg!(debug_assertions) {
        let mut seen = vec![false; expected];
        let mut surplus = false;
        for (_, part) in &found {
            match seen.get_mut(part.index) {
                Some(slot) if !*slot => *slot = true,
                _ => surplus = true,
            }
        }
        if surplus {
            return Err(Error::TemplateShape("got more parts than expected".into()));
        }
        let count = seen.iter().filter(|s| **s).count();
        if count != expected {
            return Err(Error::TemplateShape(format!(
                "expected the same number of dynamics as parts, found {count} parts for {expected} dynamics"
            )));
        }
    }

    let mut segments = Vec::with_capacity(found.len() + 1);
    let mut parts = Vec::with_capacity(found.len());
    let mut cursor = 0usize;
    for (range, part) in found {
        segments.push(synthetic[cursor..range.start].to_string());
        cursor = range.end;
        parts.push(part);
    }
    segments.push(synthetic[cursor..].to_string());

    Ok(ServerTemplate { segments, parts })
}

/// Byte position of `sentinel` inside the tag's slice of `synthetic`.
/// Sentinels are template-unique strings, so plain search within the token
/// range is exact. `None` only for malformed templates in release builds.
fn sentinel_position(synthetic: &str, tag: &Range<usize>, sentinel: &str) -> Option<usize> {
    synthetic[tag.clone()].find(sentinel).map(|rel| tag.start + rel)
}

/// Range of the sentinel where it stands as an attribute value; the
/// surrounding statics keep their quotes.
fn value_range(synthetic: &str, tag: &Range<usize>, sentinel: &str) -> Option<Range<usize>> {
    let position = sentinel_position(synthetic, tag, sentinel)?;
    Some(position..position + sentinel.len())
}

/// Range of the entire attribute (leading whitespace through the closing
/// quote), for slots that must not serialize at all.
fn whole_attribute_range(
    synthetic: &str,
    tag: &Range<usize>,
    sentinel: &str,
) -> Option<Range<usize>> {
    let bytes = synthetic.as_bytes();
    let position = sentinel_position(synthetic, tag, sentinel)?;
    let mut end = position + sentinel.len();
    let mut p = position;
    if p > tag.start && (bytes[p - 1] == b'"' || bytes[p - 1] == b'\'') {
        p -= 1;
        // Quoted value: the closing quote goes too.
        end += 1;
    }
    let is_name_byte =
        |b: u8| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'$');
    while p > tag.start && bytes[p - 1].is_ascii_whitespace() {
        p -= 1;
    }
    if p > tag.start && bytes[p - 1] == b'=' {
        p -= 1;
        while p > tag.start && bytes[p - 1].is_ascii_whitespace() {
            p -= 1;
        }
        while p > tag.start && is_name_byte(bytes[p - 1]) {
            p -= 1;
        }
    }
    while p > tag.start && bytes[p - 1].is_ascii_whitespace() {
        p -= 1;
    }
    Some(p..end)
}

enum Work {
    Emit(String),
    Child(Value),
}

/// Lazy chunk stream; consumption paces the work. An error chunk is final.
pub struct RenderStream<'c> {
    ctx: &'c mut Ctx,
    stack: Vec<Work>,
    render_counts: HashMap<usize, usize>,
    failed: bool,
}

impl Iterator for RenderStream<'_> {
    type Item = Result<String, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let work = self.stack.pop()?;
            let produced = match work {
                Work::Emit(text) => Ok(Some(text)),
                Work::Child(value) => self.render_child(value),
            };
            match produced {
                Ok(Some(text)) if !text.is_empty() => return Some(Ok(text)),
                Ok(_) => {}
                Err(error) => {
                    self.failed = true;
                    return Some(Err(error));
                }
            }
        }
    }
}

impl RenderStream<'_> {
    fn render_child(&mut self, value: Value) -> Result<Option<String>, Error> {
        match value {
            Value::Null => Ok(None),
            Value::Keyed(_, inner) => {
                self.stack.push(Work::Child(*inner));
                Ok(None)
            }
            Value::Renderable(renderable) => {
                let key = renderable_identity(&renderable);
                let count = self.render_counts.entry(key).or_insert(0);
                *count += 1;
                if *count > RENDER_LIMIT {
                    return Err(Error::CircularRender);
                }
                self.ctx.registry.ensure(&renderable, None, None);
                let mut scope = Scope {
                    registry: &mut self.ctx.registry,
                    queue: &mut self.ctx.queue,
                    key,
                };
                let rendered = match renderable.render(&mut scope) {
                    Ok(value) => value,
                    Err(Error::Suspended(fallback)) => Value::Template(fallback),
                    Err(error) => return Err(error),
                };
                self.stack.push(Work::Child(rendered.unkeyed()));
                Ok(None)
            }
            Value::List(items) => {
                for item in items.into_iter().rev() {
                    self.stack.push(Work::Emit(CLOSE_COMMENT.to_string()));
                    self.stack.push(Work::Child(item));
                    self.stack.push(Work::Emit(OPEN_COMMENT.to_string()));
                }
                Ok(None)
            }
            Value::Template(template) => {
                let server = server_compiled(self.ctx, template.statics)?;
                self.push_template(&server, template.dynamics)
            }
            Value::Node(node) => Ok(Some(outer_html(&self.ctx.doc, node))),
            Value::Directive(_) => {
                if cfg!(debug_assertions) {
                    Err(Error::TemplateShape(
                        "a directive cannot render as child content".into(),
                    ))
                } else {
                    Ok(None)
                }
            }
            scalar => {
                let text = scalar.to_text();
                Ok((!text.is_empty()).then(|| escape_text(&text)))
            }
        }
    }

    fn push_template(
        &mut self,
        server: &ServerTemplate,
        dynamics: Vec<Value>,
    ) -> Result<Option<String>, Error> {
        let mut items: Vec<Work> = Vec::with_capacity(server.segments.len() * 2);
        let Some(first) = server.segments.first() else {
            return Ok(None);
        };
        items.push(Work::Emit(first.clone()));
        for (part, segment) in server.parts.iter().zip(server.segments[1..].iter()) {
            let value = dynamics.get(part.index).cloned().unwrap_or(Value::Null);
            match &part.kind {
                ServerPartKind::Child => {
                    items.push(Work::Emit(OPEN_COMMENT.to_string()));
                    items.push(Work::Child(value));
                    items.push(Work::Emit(CLOSE_COMMENT.to_string()));
                }
                ServerPartKind::Attribute { name } => match &value {
                    Value::Null => {}
                    v if v.is_stringable() => {
                        items.push(Work::Emit(escape_attr(&v.to_text())));
                    }
                    other => {
                        if cfg!(debug_assertions) {
                            return Err(Error::TemplateShape(format!(
                                "attribute \"{name}\" expects a scalar, got {other:?}"
                            )));
                        }
                    }
                },
                // Client-only state: nothing serializes.
                ServerPartKind::Property => {}
                ServerPartKind::Directive => {
                    if cfg!(debug_assertions) && !matches!(value, Value::Directive(_)) {
                        return Err(Error::TemplateShape(format!(
                            "directive slot expects a directive, got {value:?}"
                        )));
                    }
                }
            }
            items.push(Work::Emit(segment.clone()));
        }
        self.stack.extend(items.into_iter().rev());
        Ok(None)
    }
}

fn render_stream(ctx: &mut Ctx, value: Value) -> RenderStream<'_> {
    // The whole result is one dynamic child region, so the top level gets
    // its own marker pair — the pair `hydrate` looks for.
    RenderStream {
        ctx,
        stack: vec![
            Work::Emit(CLOSE_COMMENT.to_string()),
            Work::Child(value),
            Work::Emit(OPEN_COMMENT.to_string()),
        ],
        render_counts: HashMap::new(),
        failed: false,
    }
}

/// Render `value` to a complete HTML string with hydration markers.
pub fn render_to_string(ctx: &mut Ctx, value: impl Into<Value>) -> Result<String, Error> {
    let mut out = String::new();
    for chunk in render_stream(ctx, value.into()) {
        out.push_str(&chunk?);
    }
    Ok(out)
}

/// Render `value` as a stream of UTF-8 chunks. The underlying generator only
/// advances as the iterator is pulled.
pub fn render_to_stream(
    ctx: &mut Ctx,
    value: impl Into<Value>,
) -> impl Iterator<Item = Result<Vec<u8>, Error>> + '_ {
    render_stream(ctx, value.into()).map(|chunk| chunk.map(String::into_bytes))
}
