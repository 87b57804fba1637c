//! Bound parts: the updatable handles behind each dynamic slot.
//!
//! `ChildPart` is the central state machine. Across successive updates it is
//! in exactly one of four modes — renderable-resolved scalar/node, template,
//! or list — and owns the span its content lives in. Mode transitions tear
//! down the old content; same-mode updates patch in place.
//!
//! Classification order matters and is fixed: renderable first (an iterable
//! renderable is a renderable), then list, then template, else scalar.

use crate::ctx::Ctx;
use crate::error::Error;
use crate::lifecycle::{RenderableKey, Scope};
use crate::root::RootInner;
use crate::span::Span;
use crate::value::{
    DirectiveCleanup, DirectiveFn, Key, Renderable, Template, Value, renderable_identity,
};
use dom::{Document, NodeId, PropValue};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

pub(crate) enum BoundPart {
    Child(Rc<RefCell<ChildPart>>),
    Attribute(AttributePart),
    Property(PropertyPart),
    Directive(DirectivePart),
    /// Placeholder for a part whose node could not be recovered (malformed
    /// template in a release build). Ignores every update.
    Vacant,
}

impl BoundPart {
    pub fn update(&mut self, ctx: &mut Ctx, value: Value) -> Result<(), Error> {
        match self {
            BoundPart::Child(cell) => cell.borrow_mut().update(ctx, value),
            BoundPart::Attribute(part) => part.update(&mut ctx.doc, value),
            BoundPart::Property(part) => part.update(&mut ctx.doc, value),
            BoundPart::Directive(part) => part.update(&mut ctx.doc, value),
            BoundPart::Vacant => Ok(()),
        }
    }

    pub fn detach(&mut self, ctx: &mut Ctx) {
        match self {
            BoundPart::Child(cell) => cell.borrow_mut().detach(ctx),
            BoundPart::Directive(part) => part.detach(&mut ctx.doc),
            BoundPart::Attribute(_) | BoundPart::Property(_) | BoundPart::Vacant => {}
        }
    }
}

fn shape_error(message: String) -> Result<(), Error> {
    if cfg!(debug_assertions) {
        Err(Error::TemplateShape(message))
    } else {
        Ok(())
    }
}

pub(crate) struct AttributePart {
    node: NodeId,
    name: String,
    prev: Option<Value>,
}

impl AttributePart {
    pub fn new(node: NodeId, name: String) -> Self {
        Self {
            node,
            name,
            prev: None,
        }
    }

    pub fn update(&mut self, doc: &mut Document, value: Value) -> Result<(), Error> {
        if self.prev.as_ref().is_some_and(|prev| prev.same(&value)) {
            return Ok(());
        }
        match &value {
            Value::Null => doc.remove_attr(self.node, &self.name),
            v if v.is_stringable() => doc.set_attr(self.node, &self.name, Some(&v.to_text())),
            other => {
                return shape_error(format!(
                    "attribute \"{}\" expects a scalar, got {other:?}",
                    self.name
                ));
            }
        }
        self.prev = Some(value);
        Ok(())
    }
}

pub(crate) struct PropertyPart {
    node: NodeId,
    name: String,
    prev: Option<Value>,
}

impl PropertyPart {
    pub fn new(node: NodeId, name: String) -> Self {
        Self {
            node,
            name,
            prev: None,
        }
    }

    pub fn update(&mut self, doc: &mut Document, value: Value) -> Result<(), Error> {
        if self.prev.as_ref().is_some_and(|prev| prev.same(&value)) {
            return Ok(());
        }
        let prop = match &value {
            Value::Null => PropValue::Null,
            Value::Bool(b) => PropValue::Bool(*b),
            Value::Int(i) => PropValue::Int(*i),
            Value::Float(f) => PropValue::Float(*f),
            Value::Str(s) => PropValue::Str(s.to_string()),
            other => {
                return shape_error(format!(
                    "property \"{}\" expects a scalar, got {other:?}",
                    self.name
                ));
            }
        };
        doc.set_prop(self.node, &self.name, prop);
        self.prev = Some(value);
        Ok(())
    }
}

pub(crate) struct DirectivePart {
    node: NodeId,
    prev: Option<Rc<DirectiveFn>>,
    cleanup: Option<DirectiveCleanup>,
}

impl DirectivePart {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            prev: None,
            cleanup: None,
        }
    }

    pub fn update(&mut self, doc: &mut Document, value: Value) -> Result<(), Error> {
        let Value::Directive(directive) = value else {
            return shape_error(format!("directive slot expects a directive, got {value:?}"));
        };
        if self.prev.as_ref().is_some_and(|prev| Rc::ptr_eq(prev, &directive)) {
            return Ok(());
        }
        if let Some(cleanup) = self.cleanup.take() {
            cleanup(doc, self.node);
        }
        self.cleanup = directive(doc, self.node);
        self.prev = Some(directive);
        Ok(())
    }

    pub fn detach(&mut self, doc: &mut Document) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup(doc, self.node);
        }
        self.prev = None;
    }
}

pub(crate) struct Entry {
    pub inner: RootInner,
    pub span: Span,
    pub key: Option<Key>,
}

enum Mode {
    /// Nothing rendered yet. Distinct from an explicit null so the first
    /// render of `Null` still runs.
    Empty,
    Scalar {
        prev: Value,
        /// The lone text node backing a stringable scalar, for in-place
        /// character-data updates.
        text: Option<NodeId>,
    },
    Template(RootInner),
    List(Vec<Entry>),
}

pub(crate) struct ChildPart {
    pub span: Span,
    self_weak: Weak<RefCell<ChildPart>>,
    renderable: Option<Rc<dyn Renderable>>,
    mode: Mode,
}

impl ChildPart {
    pub fn new(span: Span) -> Rc<RefCell<ChildPart>> {
        Rc::new_cyclic(|weak| {
            RefCell::new(ChildPart {
                span,
                self_weak: weak.clone(),
                renderable: None,
                mode: Mode::Empty,
            })
        })
    }

    pub fn update(&mut self, ctx: &mut Ctx, value: Value) -> Result<(), Error> {
        let value = value.unkeyed();
        let (value, pending_mount) = self.resolve_renderable(ctx, value)?;
        match value {
            Value::List(items) => self.update_list(ctx, items)?,
            Value::Template(template) => self.update_template(ctx, template)?,
            other => self.update_scalar(ctx, other)?,
        }
        if let Some(key) = pending_mount {
            ctx.registry.fire_mounts(key);
        }
        Ok(())
    }

    /// Step one of every update: renderable values render themselves and the
    /// result takes their place. Registers (or refreshes) the controller,
    /// applies the fallback-template convention, and wraps a
    /// renderable-returned-renderable in a one-slot template so every level
    /// of a chain gets its own tracked identity.
    fn resolve_renderable(
        &mut self,
        ctx: &mut Ctx,
        value: Value,
    ) -> Result<(Value, Option<RenderableKey>), Error> {
        let renderable = match value {
            Value::Renderable(renderable) => renderable,
            other => {
                if let Some(prev) = self.renderable.take() {
                    ctx.registry.unmount(renderable_identity(&prev));
                }
                return Ok((other, None));
            }
        };

        if let Some(prev) = &self.renderable {
            if !Rc::ptr_eq(prev, &renderable) {
                ctx.registry.unmount(renderable_identity(prev));
            }
        }
        let key = ctx.registry.ensure(
            &renderable,
            Some(self.self_weak.clone()),
            Some(self.span.parent),
        );
        let mut scope = Scope {
            registry: &mut ctx.registry,
            queue: &mut ctx.queue,
            key,
        };
        let rendered = match renderable.render(&mut scope) {
            Ok(value) => value,
            Err(Error::Suspended(fallback)) => Value::Template(fallback),
            Err(error) => return Err(error),
        };
        let mut rendered = rendered.unkeyed();
        if matches!(rendered, Value::Renderable(_)) {
            rendered = Value::Template(Template::wrapping(rendered));
        }
        self.renderable = Some(renderable);
        let pending = (!ctx.registry.mounted(key)).then_some(key);
        Ok((rendered, pending))
    }

    /// Tear down the current mode's content and empty the span. A part that
    /// never rendered keeps its pristine bookends.
    fn clear_content(&mut self, ctx: &mut Ctx) {
        let mode = std::mem::replace(&mut self.mode, Mode::Empty);
        match mode {
            Mode::Empty => return,
            Mode::Scalar { .. } => {}
            Mode::Template(mut inner) => inner.detach(ctx),
            Mode::List(mut entries) => {
                for entry in entries.iter_mut().rev() {
                    entry.inner.detach(ctx);
                }
            }
        }
        self.span.delete_contents(&mut ctx.doc);
    }

    fn update_scalar(&mut self, ctx: &mut Ctx, value: Value) -> Result<(), Error> {
        if let Mode::Scalar { prev, .. } = &self.mode {
            if prev.same(&value) {
                return Ok(());
            }
        }
        match value {
            Value::Node(node) => {
                self.clear_content(ctx);
                self.span.insert_node(&mut ctx.doc, node);
                self.mode = Mode::Scalar {
                    prev: Value::Node(node),
                    text: None,
                };
                Ok(())
            }
            Value::Null => {
                self.clear_content(ctx);
                self.mode = Mode::Scalar {
                    prev: Value::Null,
                    text: None,
                };
                Ok(())
            }
            Value::Directive(_) => {
                shape_error("a directive cannot render as child content".into())
            }
            value => {
                debug_assert!(value.is_stringable(), "unexpected child value {value:?}");
                // Cheap path: two stringables in a row patch the text node's
                // character data without touching the tree.
                if let Mode::Scalar {
                    prev,
                    text: Some(text),
                } = &self.mode
                {
                    if prev.is_stringable() {
                        let text = *text;
                        ctx.doc.set_text(text, &value.to_text());
                        self.mode = Mode::Scalar {
                            prev: value,
                            text: Some(text),
                        };
                        return Ok(());
                    }
                }
                self.clear_content(ctx);
                let text = ctx.doc.create_text(&value.to_text());
                self.span.insert_node(&mut ctx.doc, text);
                self.mode = Mode::Scalar {
                    prev: value,
                    text: Some(text),
                };
                Ok(())
            }
        }
    }

    fn update_template(&mut self, ctx: &mut Ctx, template: Template) -> Result<(), Error> {
        if !matches!(self.mode, Mode::Template(_)) {
            self.clear_content(ctx);
            self.mode = Mode::Template(RootInner::new());
        }
        let Mode::Template(inner) = &mut self.mode else {
            unreachable!("mode set above");
        };
        inner.render(ctx, &mut self.span, Value::Template(template))
    }

    /// Keyed reconciliation over a persistent entry list. No identity
    /// short-circuit: an iterable is walked in full every render.
    fn update_list(&mut self, ctx: &mut Ctx, items: Vec<Value>) -> Result<(), Error> {
        if !matches!(self.mode, Mode::List(_)) {
            self.clear_content(ctx);
            // The deletion placeholder (or the original bookend) stays as a
            // permanent head anchor; entry spans live strictly after it, so
            // the span keeps a stable start however entries churn.
            self.span.marker = None;
            self.mode = Mode::List(Vec::new());
        }
        let span = &mut self.span;
        let Mode::List(entries) = &mut self.mode else {
            unreachable!("mode set above");
        };

        let new_len = items.len();
        for (i, item) in items.into_iter().enumerate() {
            let key = item.implicit_key();
            let item = item.unkeyed();
            if i == entries.len() {
                let anchor = ctx.doc.create_text("");
                let after = if i == 0 {
                    span.end
                } else {
                    entries[i - 1].span.end
                };
                ctx.doc.insert_after(span.parent, anchor, after);
                entries.push(Entry {
                    inner: RootInner::new(),
                    span: Span::between(span.parent, anchor, anchor),
                    key: key.clone(),
                });
            } else {
                if key.is_some() && entries[i].key != key {
                    // Forward linear scan for the matching entry; a hit swaps
                    // the two entries' DOM contents without re-rendering
                    // either. O(n) per mismatch by design.
                    if let Some(j) = (i + 1..entries.len()).find(|&j| entries[j].key == key) {
                        swap_entries(ctx, entries, i, j);
                    }
                }
                entries[i].key = key;
            }
            // Content updates always apply, swapped or not.
            let entry = &mut entries[i];
            entry.inner.render(ctx, &mut entry.span, item)?;
        }

        while entries.len() > new_len {
            let mut entry = entries.pop().expect("length checked above");
            entry.inner.detach(ctx);
            entry.span.delete_contents(&mut ctx.doc);
            if let Some(marker) = entry.span.marker.take() {
                ctx.doc.detach(marker);
            }
        }

        // Entries are the span's entire content after the head anchor, so the
        // bounds can be restated directly instead of tracked per mutation.
        span.end = entries.last().map(|entry| entry.span.end).unwrap_or(span.start);
        Ok(())
    }

    /// Post-order teardown: nested content first, then this part's own
    /// renderable.
    pub fn detach(&mut self, ctx: &mut Ctx) {
        match &mut self.mode {
            Mode::Template(inner) => inner.detach(ctx),
            Mode::List(entries) => {
                for entry in entries.iter_mut().rev() {
                    entry.inner.detach(ctx);
                }
            }
            Mode::Empty | Mode::Scalar { .. } => {}
        }
        if let Some(renderable) = self.renderable.take() {
            ctx.registry.unmount(renderable_identity(&renderable));
        }
    }

    // --- hydration -----------------------------------------------------

    /// Bind this part to pre-rendered content instead of creating it. The
    /// dispatch mirrors `update`, but recursion adopts existing nodes.
    pub fn hydrate(&mut self, ctx: &mut Ctx, value: Value) -> Result<(), Error> {
        let value = value.unkeyed();
        let (value, pending_mount) = self.resolve_renderable(ctx, value)?;
        match value {
            Value::List(items) => self.hydrate_list(ctx, items)?,
            Value::Template(template) => {
                let mut inner = RootInner::new();
                inner.hydrate_template(ctx, &mut self.span, template)?;
                self.mode = Mode::Template(inner);
            }
            other => self.hydrate_scalar(ctx, other)?,
        }
        if let Some(key) = pending_mount {
            ctx.registry.fire_mounts(key);
        }
        Ok(())
    }

    fn hydrate_scalar(&mut self, ctx: &mut Ctx, value: Value) -> Result<(), Error> {
        if matches!(value, Value::Directive(_)) {
            return shape_error("a directive cannot render as child content".into());
        }
        // Adopt the server-emitted text node, if one exists (empty strings
        // and nulls emit none).
        let text = self
            .span
            .inner_nodes(&ctx.doc)
            .into_iter()
            .find(|node| ctx.doc.is_text(*node));
        self.mode = Mode::Scalar { prev: value, text };
        Ok(())
    }

    fn hydrate_list(&mut self, ctx: &mut Ctx, items: Vec<Value>) -> Result<(), Error> {
        let regions = crate::hydrate::item_regions(&ctx.doc, &self.span)?;
        if regions.len() != items.len() {
            return Err(Error::Hydration(format!(
                "expected {} hydrated list item(s), found {}",
                items.len(),
                regions.len()
            )));
        }
        let mut entries = Vec::with_capacity(items.len());
        for ((start, end), item) in regions.into_iter().zip(items) {
            let key = item.implicit_key();
            let item = item.unkeyed();
            let mut entry = Entry {
                inner: RootInner::new(),
                span: Span::between(self.span.parent, start, end),
                key,
            };
            entry.inner.hydrate_value(ctx, &mut entry.span, item)?;
            entries.push(entry);
        }
        // Align with the list invariant: the span ends at the last entry and
        // the open marker is the permanent head anchor. The close marker
        // stays behind as an inert sibling.
        self.span.end = entries
            .last()
            .map(|entry| entry.span.end)
            .unwrap_or(self.span.start);
        self.mode = Mode::List(entries);
        Ok(())
    }
}

fn swap_entries(ctx: &mut Ctx, entries: &mut [Entry], i: usize, j: usize) {
    debug_assert!(i < j);
    let fragment_i = entries[i].span.extract_contents(&mut ctx.doc);
    let fragment_j = entries[j].span.extract_contents(&mut ctx.doc);
    entries[i].span.insert_node(&mut ctx.doc, fragment_j);
    entries[j].span.insert_node(&mut ctx.doc, fragment_i);
    // Roots and keys travel with their content; the spans stay positional.
    let (head, tail) = entries.split_at_mut(j);
    std::mem::swap(&mut head[i].inner, &mut tail[0].inner);
    std::mem::swap(&mut head[i].key, &mut tail[0].key);
}
