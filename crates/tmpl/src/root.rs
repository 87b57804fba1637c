//! Roots: owners of one span's currently mounted template instance.
//!
//! A root decides between two render paths by compiled-template identity:
//! the same template patches each bound part in place; a different template
//! tears the part tree down, deletes the span contents, clones the compiled
//! fragment, recovers part nodes from the `data-dynparts` annotations
//! (stripping them from the instance) and binds fresh parts.
//!
//! Bare scalars and renderables are normalized into a one-slot wrapper
//! template so both paths above are the only two cases.

use crate::compile::{CompiledTemplate, PARTS_ATTR, PartKind, compiled};
use crate::ctx::Ctx;
use crate::error::Error;
use crate::hydrate;
use crate::part::{AttributePart, BoundPart, ChildPart, DirectivePart, PropertyPart};
use crate::span::Span;
use crate::value::{Template, Value, WRAPPER};
use dom::NodeId;
use std::collections::HashMap;
use std::rc::Rc;

pub(crate) struct RootInner {
    compiled: Option<Rc<CompiledTemplate>>,
    parts: Vec<BoundPart>,
}

impl RootInner {
    pub fn new() -> Self {
        Self {
            compiled: None,
            parts: Vec::new(),
        }
    }

    pub fn render(&mut self, ctx: &mut Ctx, span: &mut Span, value: Value) -> Result<(), Error> {
        let template = match value {
            Value::Template(template) => template,
            other => Template::wrapping(other),
        };
        let compiled = compiled(ctx, template.statics)?;
        let same = self
            .compiled
            .as_ref()
            .is_some_and(|current| Rc::ptr_eq(current, &compiled));
        if !same {
            self.detach(ctx);
            span.delete_contents(&mut ctx.doc);
            self.instantiate(ctx, span, &compiled);
            self.compiled = Some(compiled.clone());
        }
        self.update_parts(ctx, span, &compiled, &template.dynamics)
    }

    /// Clone the compiled fragment, bind a part per descriptor, and splice
    /// the instance into the span. Bindings are taken before insertion; node
    /// ids are stable so they survive the splice.
    fn instantiate(&mut self, ctx: &mut Ctx, span: &mut Span, compiled: &CompiledTemplate) {
        let clone = ctx.doc.clone_subtree(compiled.content);
        let mut tagged: HashMap<usize, NodeId> = HashMap::new();
        for node in ctx.doc.descendants(clone) {
            if !ctx.doc.is_element(node) {
                continue;
            }
            let Some(list) = ctx.doc.attr(node, PARTS_ATTR).map(str::to_string) else {
                continue;
            };
            for index in list.split_whitespace() {
                if let Ok(index) = index.parse::<usize>() {
                    tagged.insert(index, node);
                }
            }
            ctx.doc.remove_attr(node, PARTS_ATTR);
        }
        let clone_children: Vec<NodeId> = ctx.doc.children(clone).to_vec();

        self.parts = compiled
            .parts
            .iter()
            .map(|descriptor| {
                let element = tagged.get(&descriptor.index).copied();
                match &descriptor.kind {
                    PartKind::Child { sibling } => {
                        let (parent, bookends): (NodeId, Vec<NodeId>) = if descriptor.root {
                            (span.parent, clone_children.clone())
                        } else {
                            match element {
                                Some(element) => (element, ctx.doc.children(element).to_vec()),
                                None => return BoundPart::Vacant,
                            }
                        };
                        match (bookends.get(*sibling), bookends.get(sibling + 1)) {
                            (Some(&start), Some(&end)) => {
                                BoundPart::Child(ChildPart::new(Span::between(parent, start, end)))
                            }
                            _ => BoundPart::Vacant,
                        }
                    }
                    PartKind::Attribute { name } => match element {
                        Some(element) => {
                            BoundPart::Attribute(AttributePart::new(element, name.clone()))
                        }
                        None => BoundPart::Vacant,
                    },
                    PartKind::Property { name } => match element {
                        Some(element) => {
                            BoundPart::Property(PropertyPart::new(element, name.clone()))
                        }
                        None => BoundPart::Vacant,
                    },
                    PartKind::Directive => match element {
                        Some(element) => BoundPart::Directive(DirectivePart::new(element)),
                        None => BoundPart::Vacant,
                    },
                }
            })
            .collect();

        span.insert_node(&mut ctx.doc, clone);
    }

    /// Feed each part its dynamic. Root-anchored child parts share this
    /// span's bounds; when a part's bound coincided with ours before the
    /// update, the (possibly moved) bound is copied back out so enclosing
    /// spans stay accurate as content grows and shrinks.
    fn update_parts(
        &mut self,
        ctx: &mut Ctx,
        span: &mut Span,
        compiled: &CompiledTemplate,
        dynamics: &[Value],
    ) -> Result<(), Error> {
        for (descriptor, part) in compiled.parts.iter().zip(self.parts.iter_mut()) {
            let Some(value) = dynamics.get(descriptor.index).cloned() else {
                continue;
            };
            if let BoundPart::Child(cell) = part {
                let (starts_equal, ends_equal) = {
                    let part = cell.borrow();
                    (part.span.start == span.start, part.span.end == span.end)
                };
                cell.borrow_mut().update(ctx, value)?;
                let part = cell.borrow();
                if starts_equal {
                    span.start = part.span.start;
                }
                if ends_equal {
                    span.end = part.span.end;
                }
            } else {
                part.update(ctx, value)?;
            }
        }
        Ok(())
    }

    /// Post-order teardown of every owned part (which recursively detach
    /// their own nested roots and controllers). The DOM is left in place.
    pub fn detach(&mut self, ctx: &mut Ctx) {
        for part in self.parts.iter_mut().rev() {
            part.detach(ctx);
        }
        self.parts.clear();
        self.compiled = None;
    }

    // --- hydration -----------------------------------------------------

    /// Bind to pre-rendered content. Templates walk their compiled shape
    /// against the live region; anything else adopts the wrapper form whose
    /// single child part spans the whole region.
    pub fn hydrate_value(
        &mut self,
        ctx: &mut Ctx,
        span: &mut Span,
        value: Value,
    ) -> Result<(), Error> {
        match value {
            Value::Template(template) => self.hydrate_template(ctx, span, template),
            other => {
                let compiled = compiled(ctx, &WRAPPER)?;
                let cell = ChildPart::new(Span::between(span.parent, span.start, span.end));
                cell.borrow_mut().hydrate(ctx, other)?;
                self.parts = vec![BoundPart::Child(cell)];
                self.compiled = Some(compiled);
                Ok(())
            }
        }
    }

    /// Parallel-walk the compiled fragment against the live span, recover
    /// every part's location, then bind and run the forced initial update:
    /// child parts adopt their regions recursively, the rest re-apply their
    /// value (registering directives and properties the server could not
    /// emit).
    pub fn hydrate_template(
        &mut self,
        ctx: &mut Ctx,
        span: &mut Span,
        template: Template,
    ) -> Result<(), Error> {
        let compiled = compiled(ctx, template.statics)?;
        let bindings = hydrate::walk_template(&ctx.doc, &compiled, span)?;
        log::trace!(
            target: "tmpl.hydrate",
            "aligned template {} against live region: {} part(s)",
            template.id(),
            compiled.parts.len()
        );
        let mut parts = Vec::with_capacity(compiled.parts.len());
        for descriptor in &compiled.parts {
            let value = template
                .dynamics
                .get(descriptor.index)
                .cloned()
                .unwrap_or(Value::Null);
            let part = match &descriptor.kind {
                PartKind::Child { .. } => {
                    let &(start, end) =
                        bindings.regions.get(&descriptor.index).ok_or_else(|| {
                            Error::Hydration(format!(
                                "hydration markers for dynamic slot {} not found",
                                descriptor.index
                            ))
                        })?;
                    let parent = ctx
                        .doc
                        .parent(start)
                        .expect("hydration markers are attached");
                    let cell = ChildPart::new(Span::between(parent, start, end));
                    cell.borrow_mut().hydrate(ctx, value)?;
                    BoundPart::Child(cell)
                }
                other => {
                    let element = bindings.elements.get(&descriptor.index).copied();
                    let mut part = match (other, element) {
                        (PartKind::Attribute { name }, Some(element)) => {
                            BoundPart::Attribute(AttributePart::new(element, name.clone()))
                        }
                        (PartKind::Property { name }, Some(element)) => {
                            BoundPart::Property(PropertyPart::new(element, name.clone()))
                        }
                        (PartKind::Directive, Some(element)) => {
                            BoundPart::Directive(DirectivePart::new(element))
                        }
                        (_, None) => {
                            return Err(Error::Hydration(format!(
                                "no element recovered for dynamic slot {}",
                                descriptor.index
                            )));
                        }
                        _ => unreachable!("child parts handled above"),
                    };
                    part.update(ctx, value)?;
                    part
                }
            };
            parts.push(part);
        }
        self.parts = parts;
        self.compiled = Some(compiled);
        Ok(())
    }
}

/// Top-level handle owning a span and its mounted template instance.
pub struct Root {
    span: Span,
    inner: RootInner,
}

impl std::fmt::Debug for Root {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Root").finish_non_exhaustive()
    }
}

impl Root {
    pub(crate) fn from_parts(span: Span, inner: RootInner) -> Self {
        Self { span, inner }
    }

    /// Render `value` into this root's span, patching in place when the
    /// template identity is unchanged.
    pub fn render(&mut self, ctx: &mut Ctx, value: impl Into<Value>) -> Result<(), Error> {
        self.inner.render(ctx, &mut self.span, value.into())
    }

    /// Tear down all owned parts and controllers. Rendered DOM stays put.
    pub fn detach(&mut self, ctx: &mut Ctx) {
        self.inner.detach(ctx);
    }

    /// The parent node this root renders under.
    pub fn container(&self) -> NodeId {
        self.span.parent
    }
}

/// Create a root rendering into `parent`, anchored after its current
/// children.
pub fn create_root(ctx: &mut Ctx, parent: NodeId) -> Root {
    let anchor = ctx.doc.create_text("");
    ctx.doc.append_child(parent, anchor);
    Root {
        span: Span::between(parent, anchor, anchor),
        inner: RootInner::new(),
    }
}
