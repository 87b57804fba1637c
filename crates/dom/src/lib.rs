//! Arena DOM and HTML plumbing for the `tmpl` engine.
//!
//! This crate is the stand-in for the browser platform: a document tree with
//! stable node ids, the HTML parser the template compiler feeds its rewritten
//! markup to, and the serializer tests read back through. The template engine
//! itself lives in `tmpl` and only ever talks to the tree through `NodeId`
//! handles, which is what makes span bookkeeping safe under arbitrary
//! mutation.

mod arena;
mod builder;
#[cfg(any(test, feature = "debug-outline"))]
pub mod debug;
mod entities;
mod serialize;
mod tokenizer;

pub use crate::arena::{Document, NodeId, NodeKind, PropValue};
pub use crate::builder::{parse_fragment, parse_into};
pub use crate::serialize::{collapse_whitespace, escape_attr, escape_text, inner_html, outer_html};
pub use crate::tokenizer::{Token, TokenAt, Tokenizer, tokenize};
