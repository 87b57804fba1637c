//! Client rendering: instantiation, in-place patching, part semantics.

use dom::{NodeId, PropValue, inner_html};
use std::cell::RefCell;
use std::rc::Rc;
use tmpl::{Ctx, Template, Value, attr, create_root, html};

fn setup() -> (Ctx, NodeId) {
    let mut ctx = Ctx::new();
    let host = ctx.doc.create_element("div");
    (ctx, host)
}

fn element_children(ctx: &Ctx, parent: NodeId) -> Vec<NodeId> {
    ctx.doc
        .children(parent)
        .iter()
        .copied()
        .filter(|node| ctx.doc.is_element(*node))
        .collect()
}

#[test]
fn renders_static_markup() {
    let (mut ctx, host) = setup();
    let mut root = create_root(&mut ctx, host);
    root.render(&mut ctx, html!("<p>hi</p>")).unwrap();
    assert_eq!(inner_html(&ctx.doc, host), "<p>hi</p>");
}

#[test]
fn rerender_patches_text_in_place() {
    fn greeting(n: i64) -> Template {
        html!("<p>count " {n} "</p>")
    }

    let (mut ctx, host) = setup();
    let mut root = create_root(&mut ctx, host);
    root.render(&mut ctx, greeting(1)).unwrap();
    assert_eq!(inner_html(&ctx.doc, host), "<p>count 1</p>");

    let p = element_children(&ctx, host)[0];
    let text = *ctx.doc.children(p).last().unwrap();
    assert_eq!(ctx.doc.text(text), Some("1"));

    root.render(&mut ctx, greeting(2)).unwrap();
    assert_eq!(
        element_children(&ctx, host)[0],
        p,
        "same call site must reuse the element"
    );
    assert_eq!(
        *ctx.doc.children(p).last().unwrap(),
        text,
        "the bound text node is patched, not replaced"
    );
    assert_eq!(ctx.doc.text(text), Some("2"));
    assert_eq!(inner_html(&ctx.doc, host), "<p>count 2</p>");
}

#[test]
fn rerender_with_equal_value_is_a_no_op() {
    fn greeting(n: i64) -> Template {
        html!("<b>" {n} "</b>")
    }

    let (mut ctx, host) = setup();
    let mut root = create_root(&mut ctx, host);
    root.render(&mut ctx, greeting(7)).unwrap();
    let nodes = ctx.doc.descendants(host);
    root.render(&mut ctx, greeting(7)).unwrap();
    assert_eq!(
        ctx.doc.descendants(host),
        nodes,
        "identical render must not touch the tree"
    );
}

#[test]
fn distinct_call_sites_rebuild_even_with_identical_text() {
    let (mut ctx, host) = setup();
    let mut root = create_root(&mut ctx, host);
    root.render(&mut ctx, html!("<p>same</p>")).unwrap();
    let first = element_children(&ctx, host)[0];
    root.render(&mut ctx, html!("<p>same</p>")).unwrap();
    let second = element_children(&ctx, host)[0];
    assert_ne!(first, second, "new statics identity forces a rebuild");
    assert_eq!(inner_html(&ctx.doc, host), "<p>same</p>");
}

#[test]
fn null_renders_empty_and_round_trips() {
    fn slot(v: Value) -> Template {
        html!("<div>" {v} "</div>")
    }

    let (mut ctx, host) = setup();
    let mut root = create_root(&mut ctx, host);
    root.render(&mut ctx, slot(Value::Null)).unwrap();
    assert_eq!(inner_html(&ctx.doc, host), "<div></div>");
    root.render(&mut ctx, slot("x".into())).unwrap();
    assert_eq!(inner_html(&ctx.doc, host), "<div>x</div>");
    root.render(&mut ctx, slot(Value::Null)).unwrap();
    assert_eq!(inner_html(&ctx.doc, host), "<div></div>");
}

#[test]
fn scalar_types_stringify() {
    fn slot(v: Value) -> Template {
        html!("<i>" {v} "</i>")
    }

    let (mut ctx, host) = setup();
    let mut root = create_root(&mut ctx, host);
    root.render(&mut ctx, slot(true.into())).unwrap();
    assert_eq!(inner_html(&ctx.doc, host), "<i>true</i>");
    root.render(&mut ctx, slot(1.5.into())).unwrap();
    assert_eq!(inner_html(&ctx.doc, host), "<i>1.5</i>");
    root.render(&mut ctx, slot((-3i64).into())).unwrap();
    assert_eq!(inner_html(&ctx.doc, host), "<i>-3</i>");
}

#[test]
fn class_goes_through_attributes_and_title_through_properties() {
    let (mut ctx, host) = setup();
    let mut root = create_root(&mut ctx, host);
    root.render(
        &mut ctx,
        html!("<div class=\"" {"a"} "\" title=\"" {"b"} "\"></div>"),
    )
    .unwrap();
    let div = element_children(&ctx, host)[0];
    assert_eq!(ctx.doc.attr(div, "class"), Some("a"));
    assert_eq!(ctx.doc.attr(div, "title"), None, "title is property-bound");
    assert_eq!(ctx.doc.prop(div, "title"), Some(&PropValue::Str("b".into())));
}

#[test]
fn hyphenated_names_bind_as_attributes_and_camel_case_as_properties() {
    let (mut ctx, host) = setup();
    let mut root = create_root(&mut ctx, host);
    root.render(
        &mut ctx,
        html!("<input data-kind=\"" {"k"} "\" myValue=\"" {42} "\">"),
    )
    .unwrap();
    let input = element_children(&ctx, host)[0];
    assert_eq!(ctx.doc.attr(input, "data-kind"), Some("k"));
    assert_eq!(ctx.doc.attr(input, "myvalue"), None);
    assert_eq!(ctx.doc.prop(input, "myValue"), Some(&PropValue::Int(42)));
}

#[test]
fn null_attribute_value_removes_the_attribute() {
    fn classed(v: Value) -> Template {
        html!("<div class=\"" {v} "\"></div>")
    }

    let (mut ctx, host) = setup();
    let mut root = create_root(&mut ctx, host);
    root.render(&mut ctx, classed("x".into())).unwrap();
    let div = element_children(&ctx, host)[0];
    assert_eq!(ctx.doc.attr(div, "class"), Some("x"));
    root.render(&mut ctx, classed(Value::Null)).unwrap();
    assert!(!ctx.doc.has_attr(div, "class"));
}

#[test]
fn dom_node_values_insert_by_identity() {
    fn slot(v: Value) -> Template {
        html!("<div>" {v} "</div>")
    }

    let (mut ctx, host) = setup();
    let hr = ctx.doc.create_element("hr");
    let mut root = create_root(&mut ctx, host);
    root.render(&mut ctx, slot(hr.into())).unwrap();
    assert_eq!(inner_html(&ctx.doc, host), "<div><hr></div>");
    let div = element_children(&ctx, host)[0];
    assert!(ctx.doc.children(div).contains(&hr), "the node itself mounts");
    root.render(&mut ctx, slot(hr.into())).unwrap();
    assert!(
        ctx.doc.children(div).contains(&hr),
        "same node re-render keeps it in place"
    );
}

#[test]
fn directives_run_once_per_identity_and_clean_up_on_replacement() {
    fn slot(d: Value) -> Template {
        html!("<button " {d} ">x</button>")
    }

    let (mut ctx, host) = setup();
    let log: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

    let first = {
        let log = log.clone();
        Value::directive(move |doc, node| {
            log.borrow_mut().push("first");
            doc.set_attr(node, "data-bound", Some(""));
            let log = log.clone();
            Some(Box::new(move |_: &mut dom::Document, _: dom::NodeId| {
                log.borrow_mut().push("first cleanup");
            }) as tmpl::DirectiveCleanup)
        })
    };
    let second = {
        let log = log.clone();
        Value::directive(move |_, _| {
            log.borrow_mut().push("second");
            None
        })
    };

    let mut root = create_root(&mut ctx, host);
    root.render(&mut ctx, slot(first.clone())).unwrap();
    let button = element_children(&ctx, host)[0];
    assert!(ctx.doc.has_attr(button, "data-bound"));
    assert_eq!(*log.borrow(), ["first"]);

    // Same directive identity: no re-invocation.
    root.render(&mut ctx, slot(first.clone())).unwrap();
    assert_eq!(*log.borrow(), ["first"]);

    // New identity: cleanup runs before the replacement.
    root.render(&mut ctx, slot(second)).unwrap();
    assert_eq!(*log.borrow(), ["first", "first cleanup", "second"]);
}

#[test]
fn attr_directive_toggles_sets_and_removes() {
    fn slot(d: Value) -> Template {
        html!("<div " {d} "></div>")
    }

    let (mut ctx, host) = setup();
    let mut root = create_root(&mut ctx, host);
    root.render(&mut ctx, slot(attr("hidden", true))).unwrap();
    let div = element_children(&ctx, host)[0];
    assert_eq!(ctx.doc.attr(div, "hidden"), Some(""));

    root.render(&mut ctx, slot(attr("hidden", false))).unwrap();
    assert!(!ctx.doc.has_attr(div, "hidden"));

    root.render(&mut ctx, slot(attr("hidden", "until-found"))).unwrap();
    assert_eq!(ctx.doc.attr(div, "hidden"), Some("until-found"));
}

#[test]
fn template_switch_replaces_content_and_growth_propagates_to_the_root_span() {
    fn listing(items: Vec<Value>) -> Template {
        html!("<i>h</i>" {items} "")
    }

    let (mut ctx, host) = setup();
    let mut root = create_root(&mut ctx, host);
    let items = |ns: &[i64]| -> Vec<Value> {
        ns.iter().map(|n| Value::from(html!("<p>" {*n} "</p>"))).collect()
    };
    root.render(&mut ctx, listing(items(&[1, 2, 3]))).unwrap();
    assert_eq!(
        inner_html(&ctx.doc, host),
        "<i>h</i><p>1</p><p>2</p><p>3</p>"
    );
    // A trailing dynamic that grew must still be swept away by a template
    // identity change.
    root.render(&mut ctx, html!("<em>other</em>")).unwrap();
    assert_eq!(inner_html(&ctx.doc, host), "<em>other</em>");
}

#[test]
fn nested_templates_patch_in_place() {
    fn inner(n: i64) -> Template {
        html!("<b>" {n} "</b>")
    }
    fn outer(n: i64) -> Template {
        html!("<div>" {inner(n)} "</div>")
    }

    let (mut ctx, host) = setup();
    let mut root = create_root(&mut ctx, host);
    root.render(&mut ctx, outer(1)).unwrap();
    assert_eq!(inner_html(&ctx.doc, host), "<div><b>1</b></div>");
    let div = element_children(&ctx, host)[0];
    let b = element_children(&ctx, div)[0];
    root.render(&mut ctx, outer(2)).unwrap();
    assert_eq!(inner_html(&ctx.doc, host), "<div><b>2</b></div>");
    assert_eq!(element_children(&ctx, div)[0], b, "nested element survives");
}

#[test]
fn detach_leaves_rendered_dom_in_place() {
    let (mut ctx, host) = setup();
    let mut root = create_root(&mut ctx, host);
    root.render(&mut ctx, html!("<p>kept</p>")).unwrap();
    root.detach(&mut ctx);
    assert_eq!(inner_html(&ctx.doc, host), "<p>kept</p>");
}
