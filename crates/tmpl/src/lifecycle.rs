//! Renderable lifecycle: the controller registry, mount/unmount callbacks
//! and invalidation.
//!
//! Controllers live in a side table keyed by renderable pointer identity and
//! hold only `Weak` references back to the renderable and its owning child
//! part — the registry never keeps either alive. Entries are removed through
//! the same machinery that created them: a part unmounting its renderable
//! deletes the controller and runs the unmount callbacks.
//!
//! Invalidation is debounced: repeated `invalidate` calls before the next
//! `Ctx::flush` coalesce into a single re-render. A controller whose part or
//! renderable has been dropped by flush time is a safe no-op.

use crate::ctx::Ctx;
use crate::error::Error;
use crate::part::ChildPart;
use crate::value::{Renderable, renderable_identity};
use dom::NodeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// Mount callback; an optional returned closure runs at unmount.
pub type MountFn = Rc<dyn Fn() -> Option<UnmountFn>>;
pub type UnmountFn = Box<dyn FnOnce()>;

pub(crate) type RenderableKey = usize;

pub(crate) struct Controller {
    renderable: Weak<dyn Renderable>,
    part: Option<Weak<RefCell<ChildPart>>>,
    parent: Option<NodeId>,
    mounted: bool,
    queued: bool,
    mount_callbacks: Vec<MountFn>,
    unmount_callbacks: Vec<UnmountFn>,
}

#[derive(Default)]
pub(crate) struct Registry {
    entries: HashMap<RenderableKey, Controller>,
}

impl Registry {
    /// Create or refresh the controller for `renderable`. The invalidation
    /// target and parent node are re-recorded on every render so the
    /// controller always points at the part currently hosting the renderable.
    pub fn ensure(
        &mut self,
        renderable: &Rc<dyn Renderable>,
        part: Option<Weak<RefCell<ChildPart>>>,
        parent: Option<NodeId>,
    ) -> RenderableKey {
        let key = renderable_identity(renderable);
        let entry = self.entries.entry(key).or_insert_with(|| Controller {
            renderable: Rc::downgrade(renderable),
            part: None,
            parent: None,
            mounted: false,
            queued: false,
            mount_callbacks: Vec::new(),
            unmount_callbacks: Vec::new(),
        });
        entry.renderable = Rc::downgrade(renderable);
        if part.is_some() {
            entry.part = part;
        }
        if parent.is_some() {
            entry.parent = parent;
        }
        key
    }

    pub fn mounted(&self, key: RenderableKey) -> bool {
        self.entries.get(&key).is_some_and(|entry| entry.mounted)
    }

    pub fn parent(&self, key: RenderableKey) -> Option<NodeId> {
        self.entries.get(&key).and_then(|entry| entry.parent)
    }

    pub fn rendered(&self, key: RenderableKey) -> bool {
        self.entries
            .get(&key)
            .is_some_and(|entry| entry.part.is_some())
    }

    /// Queue a mount callback, or run it immediately when already mounted.
    /// The same callback (by `Rc` identity) queues at most once.
    pub fn queue_mount(&mut self, key: RenderableKey, callback: MountFn) {
        let Some(entry) = self.entries.get_mut(&key) else {
            return;
        };
        if entry.mounted {
            if let Some(cleanup) = callback() {
                entry.unmount_callbacks.push(cleanup);
            }
            return;
        }
        if entry
            .mount_callbacks
            .iter()
            .any(|existing| Rc::ptr_eq(existing, &callback))
        {
            return;
        }
        entry.mount_callbacks.push(callback);
    }

    /// Mark `key` mounted and run its queued mount callbacks, banking their
    /// cleanups for unmount.
    pub fn fire_mounts(&mut self, key: RenderableKey) {
        let Some(entry) = self.entries.get_mut(&key) else {
            return;
        };
        entry.mounted = true;
        let callbacks = std::mem::take(&mut entry.mount_callbacks);
        let mut cleanups = Vec::new();
        for callback in callbacks {
            if let Some(cleanup) = callback() {
                cleanups.push(cleanup);
            }
        }
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.unmount_callbacks.extend(cleanups);
        }
    }

    /// Drop the controller for `key` and run its unmount callbacks.
    pub fn unmount(&mut self, key: RenderableKey) {
        let Some(entry) = self.entries.remove(&key) else {
            return;
        };
        for callback in entry.unmount_callbacks {
            callback();
        }
    }

    /// Flag `key` for re-render. Returns false when an invalidation is
    /// already pending (the debounce).
    pub fn mark_queued(&mut self, key: RenderableKey) -> bool {
        match self.entries.get_mut(&key) {
            Some(entry) if !entry.queued => {
                entry.queued = true;
                true
            }
            _ => false,
        }
    }

    /// Resolve a queued invalidation back to its live part and renderable.
    /// Either reference may be dead by now; that collapses to `None` and the
    /// invalidation is dropped.
    pub fn invalidation_target(
        &mut self,
        key: RenderableKey,
    ) -> Option<(Rc<RefCell<ChildPart>>, Rc<dyn Renderable>)> {
        let entry = self.entries.get_mut(&key)?;
        entry.queued = false;
        let part = entry.part.as_ref()?.upgrade()?;
        let renderable = entry.renderable.upgrade()?;
        Some((part, renderable))
    }
}

/// Render-time handle a renderable receives: lifecycle registration for
/// itself, plus scheduling.
pub struct Scope<'a> {
    pub(crate) registry: &'a mut Registry,
    pub(crate) queue: &'a mut Vec<RenderableKey>,
    pub(crate) key: RenderableKey,
}

impl Scope<'_> {
    /// Run `callback` once this renderable is mounted (immediately when it
    /// already is). An identical callback registers once per mount.
    pub fn on_mount(&mut self, callback: MountFn) {
        self.registry.queue_mount(self.key, callback);
    }

    /// Run `callback` when this renderable unmounts.
    pub fn on_unmount(&mut self, callback: UnmountFn) {
        let slot = RefCell::new(Some(callback));
        self.registry
            .queue_mount(self.key, Rc::new(move || slot.borrow_mut().take()));
    }

    /// Schedule a re-render of this renderable; coalesces until the next
    /// flush.
    pub fn invalidate(&mut self) {
        if self.registry.mark_queued(self.key) {
            self.queue.push(self.key);
        }
    }

    /// The live parent node this renderable is rendered into, if any (string
    /// rendering has no parent).
    pub fn parent_node(&self) -> Option<NodeId> {
        self.registry.parent(self.key)
    }
}

/// Schedule a re-render of `renderable`. The re-render happens at the next
/// `Ctx::flush`; calls before that flush coalesce into one render.
///
/// Usage error when the renderable has never been rendered.
pub fn invalidate(ctx: &mut Ctx, renderable: &Rc<dyn Renderable>) -> Result<(), Error> {
    let key = renderable_identity(renderable);
    if !ctx.registry.rendered(key) {
        return Err(Error::Usage("the renderable has not been rendered"));
    }
    if ctx.registry.mark_queued(key) {
        ctx.queue.push(key);
        log::trace!(target: "tmpl.invalidate", "queued re-render for renderable {key:#x}");
    }
    Ok(())
}

/// Run `callback` once `renderable` mounts — immediately if it already has.
/// Registering the same callback (by `Rc` identity) twice queues it once.
pub fn on_mount(ctx: &mut Ctx, renderable: &Rc<dyn Renderable>, callback: MountFn) {
    ctx.registry.ensure(renderable, None, None);
    let key = renderable_identity(renderable);
    ctx.registry.queue_mount(key, callback);
}

/// Run `callback` when `renderable` unmounts.
pub fn on_unmount(ctx: &mut Ctx, renderable: &Rc<dyn Renderable>, callback: UnmountFn) {
    ctx.registry.ensure(renderable, None, None);
    let key = renderable_identity(renderable);
    let slot = RefCell::new(Some(callback));
    ctx.registry
        .queue_mount(key, Rc::new(move || slot.borrow_mut().take()));
}

/// The live DOM parent `renderable` is currently rendered into.
///
/// Usage error when the renderable has never been rendered into a document.
pub fn get_parent_node(ctx: &Ctx, renderable: &Rc<dyn Renderable>) -> Result<NodeId, Error> {
    let key = renderable_identity(renderable);
    ctx.registry
        .parent(key)
        .ok_or(Error::Usage("the renderable has not been rendered"))
}
