//! Engine context: the document plus all process-wide side tables.
//!
//! The original design keeps its template cache and controller registry as
//! module globals; here they live in one explicit `Ctx` owned by the caller
//! and threaded through every operation. Lifetimes are the same — the
//! template caches never evict (templates come from a bounded set of call
//! sites, not from data) and controllers are removed when their renderable
//! unmounts.

use crate::compile::CompiledTemplate;
use crate::error::Error;
use crate::lifecycle::{Registry, RenderableKey};
use crate::server::ServerTemplate;
use crate::value::Value;
use dom::Document;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Default)]
pub struct Ctx {
    pub doc: Document,
    pub(crate) registry: Registry,
    pub(crate) queue: Vec<RenderableKey>,
    pub(crate) templates: HashMap<u64, Rc<CompiledTemplate>>,
    pub(crate) server_templates: HashMap<u64, Rc<ServerTemplate>>,
}

impl Ctx {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain pending invalidations, re-rendering each flagged renderable in
    /// place. Re-renders may queue further invalidations; the flush loops
    /// until the queue is empty. Returns after the last re-render completes,
    /// so callers observe the settled document.
    pub fn flush(&mut self) -> Result<(), Error> {
        while !self.queue.is_empty() {
            let keys = std::mem::take(&mut self.queue);
            log::trace!(target: "tmpl.invalidate", "flushing {} invalidation(s)", keys.len());
            for key in keys {
                let Some((part, renderable)) = self.registry.invalidation_target(key) else {
                    // The part or renderable is gone; a stale invalidation is
                    // a no-op.
                    continue;
                };
                part.borrow_mut().update(self, Value::Renderable(renderable))?;
            }
        }
        Ok(())
    }
}
