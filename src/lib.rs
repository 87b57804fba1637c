//! weft — a DOM-targeting template engine.
//!
//! The static skeleton of a template compiles once per call site; rendering
//! instantiates it into live nodes and re-renders patch only the dynamic
//! slots. The same template value renders to a string on the server and
//! hydrates back on the client without re-creating nodes.
//!
//! ```
//! use weft::{Ctx, create_root, html};
//!
//! let mut ctx = Ctx::new();
//! let body = ctx.doc.create_element("body");
//! let mut root = create_root(&mut ctx, body);
//! root.render(&mut ctx, html!("<p>count: " {1} "</p>")).unwrap();
//! assert_eq!(weft::inner_html(&ctx.doc, body), "<p>count: 1</p>");
//! root.render(&mut ctx, html!("<p>count: " {2} "</p>")).unwrap();
//! assert_eq!(weft::inner_html(&ctx.doc, body), "<p>count: 2</p>");
//! ```

pub use dom::{Document, NodeId, NodeKind, PropValue, inner_html, outer_html, parse_into};
pub use tmpl::{
    Ctx, DirectiveCleanup, DirectiveFn, Error, Key, MountFn, Renderable, Root, Scope, Statics,
    Template, UnmountFn, Value, attr, create_root, get_parent_node, html, hydrate, invalidate,
    keyed, on_mount, on_unmount, render_to_stream, render_to_string,
};
