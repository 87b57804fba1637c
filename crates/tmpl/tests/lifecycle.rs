//! Renderable lifecycle: mount/unmount ordering, invalidation, errors and
//! the fallback-template convention.

use dom::{NodeId, inner_html};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tmpl::{
    Ctx, Error, MountFn, Renderable, Scope, UnmountFn, Value, create_root, get_parent_node, html,
    invalidate, on_mount, on_unmount,
};

fn setup() -> (Ctx, NodeId) {
    let mut ctx = Ctx::new();
    let host = ctx.doc.create_element("div");
    (ctx, host)
}

type Log = Rc<RefCell<Vec<String>>>;

fn push(log: &Log, entry: impl Into<String>) {
    log.borrow_mut().push(entry.into());
}

/// Test component: logs renders, registers one mount callback (constructed
/// once, so re-renders never double-register), optionally renders a child
/// renderable.
struct Logger {
    name: &'static str,
    log: Log,
    child: Option<Rc<dyn Renderable>>,
    mount_cb: MountFn,
}

fn logger(name: &'static str, log: &Log, child: Option<Rc<dyn Renderable>>) -> Rc<Logger> {
    let mount_cb: MountFn = {
        let log = log.clone();
        Rc::new(move || {
            push(&log, format!("{name} mount"));
            let log = log.clone();
            Some(Box::new(move || push(&log, format!("{name} unmount"))) as UnmountFn)
        })
    };
    Rc::new(Logger {
        name,
        log: log.clone(),
        child,
        mount_cb,
    })
}

impl Renderable for Logger {
    fn render(&self, scope: &mut Scope<'_>) -> Result<Value, Error> {
        push(&self.log, format!("{} render", self.name));
        scope.on_mount(self.mount_cb.clone());
        Ok(match &self.child {
            Some(child) => html!("<div>" {child.clone()} "</div>").into(),
            None => "leaf".into(),
        })
    }
}

#[test]
fn nested_renderables_mount_inner_before_outer() {
    let (mut ctx, host) = setup();
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let inner = logger("inner", &log, None);
    let outer = logger("outer", &log, Some(inner.clone() as Rc<dyn Renderable>));

    let mut root = create_root(&mut ctx, host);
    root.render(&mut ctx, Value::Renderable(outer)).unwrap();

    assert_eq!(
        *log.borrow(),
        ["outer render", "inner render", "inner mount", "outer mount"]
    );
    assert_eq!(inner_html(&ctx.doc, host), "<div>leaf</div>");
}

/// A renderable that renders a renderable: every level of the chain gets its
/// own tracked identity and its own mount.
#[test]
fn renderable_returning_renderable_tracks_each_level() {
    struct Chain {
        log: Log,
        next: Option<Rc<dyn Renderable>>,
        name: &'static str,
        mount_cb: MountFn,
    }
    impl Renderable for Chain {
        fn render(&self, scope: &mut Scope<'_>) -> Result<Value, Error> {
            push(&self.log, format!("{} render", self.name));
            scope.on_mount(self.mount_cb.clone());
            Ok(match &self.next {
                Some(next) => Value::Renderable(next.clone()),
                None => "end".into(),
            })
        }
    }
    fn chain(name: &'static str, log: &Log, next: Option<Rc<dyn Renderable>>) -> Rc<Chain> {
        let mount_cb: MountFn = {
            let log = log.clone();
            Rc::new(move || {
                push(&log, format!("{name} mount"));
                None
            })
        };
        Rc::new(Chain {
            log: log.clone(),
            next,
            name,
            mount_cb,
        })
    }

    let (mut ctx, host) = setup();
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let b = chain("b", &log, None);
    let a = chain("a", &log, Some(b as Rc<dyn Renderable>));

    let mut root = create_root(&mut ctx, host);
    root.render(&mut ctx, Value::Renderable(a)).unwrap();
    assert_eq!(
        *log.borrow(),
        ["a render", "b render", "b mount", "a mount"]
    );
    assert_eq!(inner_html(&ctx.doc, host), "end");
}

/// A parent hiding its child unmounts the child without unmounting itself.
#[test]
fn hiding_a_child_unmounts_only_the_child() {
    struct Parent {
        show: Cell<bool>,
        child: Rc<dyn Renderable>,
        log: Log,
        mount_cb: MountFn,
    }
    impl Renderable for Parent {
        fn render(&self, scope: &mut Scope<'_>) -> Result<Value, Error> {
            push(&self.log, "parent render");
            scope.on_mount(self.mount_cb.clone());
            Ok(if self.show.get() {
                html!("<div>" {self.child.clone()} "</div>").into()
            } else {
                html!("<div>hidden</div>").into()
            })
        }
    }

    let (mut ctx, host) = setup();
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let child = logger("child", &log, None);
    let mount_cb: MountFn = {
        let log = log.clone();
        Rc::new(move || {
            push(&log, "parent mount");
            let log = log.clone();
            Some(Box::new(move || push(&log, "parent unmount")) as UnmountFn)
        })
    };
    let parent = Rc::new(Parent {
        show: Cell::new(true),
        child: child as Rc<dyn Renderable>,
        log: log.clone(),
        mount_cb,
    });
    let parent_dyn: Rc<dyn Renderable> = parent.clone();

    let mut root = create_root(&mut ctx, host);
    root.render(&mut ctx, Value::Renderable(parent_dyn.clone()))
        .unwrap();
    assert_eq!(inner_html(&ctx.doc, host), "<div>leaf</div>");

    parent.show.set(false);
    invalidate(&mut ctx, &parent_dyn).unwrap();
    ctx.flush().unwrap();

    assert_eq!(inner_html(&ctx.doc, host), "<div>hidden</div>");
    let entries = log.borrow();
    assert!(
        entries.contains(&"child unmount".to_string()),
        "child must unmount, log: {entries:?}"
    );
    assert!(
        !entries.contains(&"parent unmount".to_string()),
        "parent stays mounted, log: {entries:?}"
    );
}

#[test]
fn invalidate_coalesces_until_flush() {
    struct Counter {
        n: Cell<i64>,
        renders: Cell<usize>,
    }
    impl Renderable for Counter {
        fn render(&self, _scope: &mut Scope<'_>) -> Result<Value, Error> {
            self.renders.set(self.renders.get() + 1);
            Ok(html!("<p>" {self.n.get()} "</p>").into())
        }
    }

    let (mut ctx, host) = setup();
    let counter = Rc::new(Counter {
        n: Cell::new(0),
        renders: Cell::new(0),
    });
    let counter_dyn: Rc<dyn Renderable> = counter.clone();

    let mut root = create_root(&mut ctx, host);
    root.render(&mut ctx, Value::Renderable(counter_dyn.clone()))
        .unwrap();
    assert_eq!(counter.renders.get(), 1);

    counter.n.set(5);
    invalidate(&mut ctx, &counter_dyn).unwrap();
    invalidate(&mut ctx, &counter_dyn).unwrap();
    invalidate(&mut ctx, &counter_dyn).unwrap();
    ctx.flush().unwrap();

    assert_eq!(counter.renders.get(), 2, "three invalidations, one render");
    assert_eq!(inner_html(&ctx.doc, host), "<p>5</p>");
}

#[test]
fn invalidating_an_unrendered_renderable_is_a_usage_error() {
    let (mut ctx, _) = setup();
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let stray: Rc<dyn Renderable> = logger("stray", &log, None);
    let err = invalidate(&mut ctx, &stray).unwrap_err();
    assert!(matches!(err, Error::Usage(_)), "got {err:?}");
    assert_eq!(err.to_string(), "the renderable has not been rendered");
}

#[test]
fn get_parent_node_requires_a_render_and_then_reports_it() {
    let (mut ctx, host) = setup();
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let leaf: Rc<dyn Renderable> = logger("leaf", &log, None);

    assert!(get_parent_node(&ctx, &leaf).is_err());

    let mut root = create_root(&mut ctx, host);
    root.render(&mut ctx, Value::Renderable(leaf.clone())).unwrap();
    assert_eq!(get_parent_node(&ctx, &leaf).unwrap(), host);
}

#[test]
fn on_mount_after_mount_runs_immediately_and_cleans_up_on_unmount() {
    let (mut ctx, host) = setup();
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let leaf: Rc<dyn Renderable> = logger("leaf", &log, None);

    let mut root = create_root(&mut ctx, host);
    root.render(&mut ctx, Value::Renderable(leaf.clone())).unwrap();

    let late: MountFn = {
        let log = log.clone();
        Rc::new(move || {
            push(&log, "late mount");
            let log = log.clone();
            Some(Box::new(move || push(&log, "late cleanup")) as UnmountFn)
        })
    };
    on_mount(&mut ctx, &leaf, late);
    assert!(log.borrow().contains(&"late mount".to_string()));

    // Switching to plain content unmounts the renderable; the late cleanup
    // runs with the rest.
    root.render(&mut ctx, html!("<p>done</p>")).unwrap();
    let entries = log.borrow();
    assert!(entries.contains(&"late cleanup".to_string()), "log: {entries:?}");
    assert!(entries.contains(&"leaf unmount".to_string()), "log: {entries:?}");
}

#[test]
fn on_mount_deduplicates_by_callback_identity() {
    let (mut ctx, host) = setup();
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let leaf: Rc<dyn Renderable> = logger("leaf", &log, None);

    let cb: MountFn = {
        let log = log.clone();
        Rc::new(move || {
            push(&log, "cb");
            None
        })
    };
    on_mount(&mut ctx, &leaf, cb.clone());
    on_mount(&mut ctx, &leaf, cb.clone());

    let mut root = create_root(&mut ctx, host);
    root.render(&mut ctx, Value::Renderable(leaf)).unwrap();
    let count = log.borrow().iter().filter(|e| e.as_str() == "cb").count();
    assert_eq!(count, 1, "identical callback registers once, log: {:?}", log.borrow());
}

#[test]
fn on_unmount_fires_only_at_unmount() {
    let (mut ctx, host) = setup();
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let leaf: Rc<dyn Renderable> = logger("leaf", &log, None);

    let cleanup: UnmountFn = {
        let log = log.clone();
        Box::new(move || push(&log, "explicit unmount"))
    };
    on_unmount(&mut ctx, &leaf, cleanup);

    let mut root = create_root(&mut ctx, host);
    root.render(&mut ctx, Value::Renderable(leaf)).unwrap();
    assert!(!log.borrow().contains(&"explicit unmount".to_string()));

    root.render(&mut ctx, html!("<i>gone</i>")).unwrap();
    assert!(log.borrow().contains(&"explicit unmount".to_string()));
}

#[test]
fn render_errors_propagate_and_leave_no_partial_content() {
    struct Failing;
    impl Renderable for Failing {
        fn render(&self, _scope: &mut Scope<'_>) -> Result<Value, Error> {
            Err(Error::Render("boom".into()))
        }
    }

    let (mut ctx, host) = setup();
    let mut root = create_root(&mut ctx, host);
    let err = root
        .render(&mut ctx, Value::Renderable(Rc::new(Failing)))
        .unwrap_err();
    assert!(matches!(err, Error::Render(msg) if msg == "boom"));
    assert_eq!(inner_html(&ctx.doc, host), "", "no partial artifact");
}

#[test]
fn a_suspended_render_shows_the_fallback_template() {
    struct Suspending;
    impl Renderable for Suspending {
        fn render(&self, _scope: &mut Scope<'_>) -> Result<Value, Error> {
            Err(Error::Suspended(html!("<p>loading</p>")))
        }
    }

    let (mut ctx, host) = setup();
    let mut root = create_root(&mut ctx, host);
    root.render(&mut ctx, Value::Renderable(Rc::new(Suspending)))
        .unwrap();
    assert_eq!(inner_html(&ctx.doc, host), "<p>loading</p>");
}

#[test]
fn stale_invalidation_after_detach_is_a_no_op() {
    let (mut ctx, host) = setup();
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let leaf: Rc<dyn Renderable> = logger("leaf", &log, None);

    let mut root = create_root(&mut ctx, host);
    root.render(&mut ctx, Value::Renderable(leaf.clone())).unwrap();
    invalidate(&mut ctx, &leaf).unwrap();
    // Tearing down between the invalidation and the flush must not crash or
    // re-render into the dead tree.
    root.detach(&mut ctx);
    let renders_before = log.borrow().len();
    ctx.flush().unwrap();
    assert_eq!(log.borrow().len(), renders_before, "log: {:?}", log.borrow());
}
