//! DOM-targeting template engine.
//!
//! `html!` captures markup with embedded dynamic values; the compiler turns
//! each distinct call site into a parsed skeleton exactly once; roots
//! instantiate the skeleton into live nodes and later re-renders patch only
//! the dynamic slots. Stateful values ("renderables") get lifecycle hooks
//! and coalesced invalidation, lists reconcile by key, and markup rendered
//! to a string on the server hydrates back into live parts without node
//! re-creation.

mod compile;
mod ctx;
mod error;
mod hydrate;
mod lexer;
mod lifecycle;
mod macros;
mod part;
mod root;
mod server;
mod span;
mod value;

pub use crate::ctx::Ctx;
pub use crate::error::Error;
pub use crate::hydrate::hydrate;
pub use crate::lifecycle::{
    MountFn, Scope, UnmountFn, get_parent_node, invalidate, on_mount, on_unmount,
};
pub use crate::root::{Root, create_root};
pub use crate::server::{RenderStream, render_to_string, render_to_stream};
pub use crate::value::{
    DirectiveCleanup, DirectiveFn, Key, Renderable, Statics, Template, Value, attr, keyed,
};
