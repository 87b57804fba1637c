//! The displayable value model.
//!
//! `Value` is the closed union of everything a dynamic slot accepts. The
//! classification order in `ChildPart` (renderable, then list, then template,
//! else scalar) is load-bearing and mirrored by the order of these variants.

use crate::error::Error;
use crate::lifecycle::Scope;
use dom::{Document, NodeId};
use std::fmt;
use std::rc::Rc;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// A stateful value that knows how to produce its own display output.
///
/// Identity is `Rc` pointer identity; the lifecycle registry, implicit list
/// keys and invalidation all key off it. Returning
/// `Err(Error::Suspended(template))` renders the template as a stand-in;
/// every other error propagates to the caller of the render entry point.
pub trait Renderable {
    fn render(&self, scope: &mut Scope<'_>) -> Result<Value, Error>;
}

pub type DirectiveCleanup = Box<dyn FnOnce(&mut Document, NodeId)>;
pub type DirectiveFn = dyn Fn(&mut Document, NodeId) -> Option<DirectiveCleanup>;

/// The static half of a tagged template: the literal string fragments.
///
/// The `html!` macro expands each call site to its own `static Statics` item.
/// Identity — a process-unique id assigned on first use — is the template
/// cache key, so one call site compiles once and two call sites never share
/// compiled state even when their text is identical.
pub struct Statics {
    strings: &'static [&'static str],
    id: OnceLock<u64>,
}

static NEXT_STATICS_ID: AtomicU64 = AtomicU64::new(1);

impl Statics {
    pub const fn new(strings: &'static [&'static str]) -> Self {
        Self {
            strings,
            id: OnceLock::new(),
        }
    }

    pub fn strings(&self) -> &'static [&'static str] {
        self.strings
    }

    pub(crate) fn id(&self) -> u64 {
        *self
            .id
            .get_or_init(|| NEXT_STATICS_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Single-slot wrapper statics used to normalize bare values into template
/// form, so roots and list entries always mount a template.
pub(crate) static WRAPPER: Statics = Statics::new(&["", ""]);

/// The opaque result of an `html!` call: statics identity plus the dynamic
/// values for this render.
#[derive(Clone)]
pub struct Template {
    pub(crate) statics: &'static Statics,
    pub(crate) dynamics: Vec<Value>,
}

impl Template {
    pub fn new(statics: &'static Statics, dynamics: Vec<Value>) -> Self {
        Self { statics, dynamics }
    }

    pub(crate) fn wrapping(value: Value) -> Self {
        Self {
            statics: &WRAPPER,
            dynamics: vec![value],
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.statics.id()
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "template(id={}, {} dynamics)",
            self.statics.id(),
            self.dynamics.len()
        )
    }
}

/// Reconciliation key for list entries.
#[derive(Clone, Debug, PartialEq)]
pub enum Key {
    Int(i64),
    Str(String),
    Bool(bool),
    /// Float keys compare by bit pattern so a NaN key still matches itself.
    Bits(u64),
    /// A DOM node keys by its own id.
    Node(NodeId),
    /// Pointer identity of a renderable.
    Identity(usize),
}

impl From<i64> for Key {
    fn from(v: i64) -> Self {
        Key::Int(v)
    }
}

impl From<i32> for Key {
    fn from(v: i32) -> Self {
        Key::Int(v as i64)
    }
}

impl From<usize> for Key {
    fn from(v: usize) -> Self {
        Key::Int(v as i64)
    }
}

impl From<&str> for Key {
    fn from(v: &str) -> Self {
        Key::Str(v.to_string())
    }
}

impl From<String> for Key {
    fn from(v: String) -> Self {
        Key::Str(v)
    }
}

impl From<bool> for Key {
    fn from(v: bool) -> Self {
        Key::Bool(v)
    }
}

/// Everything a dynamic slot accepts.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Node(NodeId),
    Template(Template),
    Renderable(Rc<dyn Renderable>),
    List(Vec<Value>),
    Directive(Rc<DirectiveFn>),
    Keyed(Key, Box<Value>),
}

impl Value {
    /// Wrap a function as a directive: invoked with the live node its
    /// attribute slot sits on, optionally returning a cleanup to run when the
    /// part is torn down or the directive is replaced.
    pub fn directive(
        f: impl Fn(&mut Document, NodeId) -> Option<DirectiveCleanup> + 'static,
    ) -> Self {
        Value::Directive(Rc::new(f))
    }

    pub(crate) fn is_stringable(&self) -> bool {
        matches!(
            self,
            Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_)
        )
    }

    /// Text form of a scalar. `Null` stringifies empty.
    pub(crate) fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Str(s) => s.to_string(),
            other => {
                debug_assert!(false, "to_text on non-scalar value {other:?}");
                String::new()
            }
        }
    }

    /// `Object.is`-style sameness for the short-circuit in scalar updates:
    /// value equality for scalars (NaN equals itself), identity for nodes
    /// and renderables, never equal for anything that re-renders every pass.
    pub(crate) fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Node(a), Value::Node(b)) => a == b,
            (Value::Renderable(a), Value::Renderable(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Key a list item reconciles under when no explicit key was attached:
    /// its own identity. Scalars are identical to themselves by value, nodes
    /// and renderables by identity; templates and lists are fresh objects
    /// every render and so have no implicit key.
    pub(crate) fn implicit_key(&self) -> Option<Key> {
        match self {
            Value::Keyed(key, _) => Some(key.clone()),
            Value::Bool(b) => Some(Key::Bool(*b)),
            Value::Int(i) => Some(Key::Int(*i)),
            Value::Float(f) => Some(Key::Bits(f.to_bits())),
            Value::Str(s) => Some(Key::Str(s.to_string())),
            Value::Node(id) => Some(Key::Node(*id)),
            Value::Renderable(rc) => Some(Key::Identity(renderable_identity(rc))),
            Value::Null | Value::Template(_) | Value::List(_) | Value::Directive(_) => None,
        }
    }

    /// Strip a `Keyed` wrapper, if any.
    pub(crate) fn unkeyed(self) -> Value {
        match self {
            Value::Keyed(_, inner) => *inner,
            other => other,
        }
    }
}

/// Registry/controller key for a renderable: its thin pointer address.
pub(crate) fn renderable_identity(rc: &Rc<dyn Renderable>) -> usize {
    Rc::as_ptr(rc) as *const () as usize
}

/// Attach an explicit reconciliation key to a value. Keyed values that move
/// inside a rendered list keep their DOM and state instead of re-rendering.
///
/// Re-keying an already-keyed value is a usage mistake (debug builds panic).
pub fn keyed(value: impl Into<Value>, key: impl Into<Key>) -> Value {
    let value = value.into();
    debug_assert!(
        !matches!(value, Value::Keyed(..)),
        "value is already keyed; a value may be keyed at most once"
    );
    Value::Keyed(key.into(), Box::new(value))
}

/// Prebuilt directive binding one attribute: scalars set it, `true` toggles
/// it on (bare), `false` and `Null` remove it.
pub fn attr(name: &str, value: impl Into<Value>) -> Value {
    let name = name.to_string();
    let value = value.into();
    Value::directive(move |doc, node| {
        match &value {
            Value::Bool(true) => doc.set_attr(node, &name, Some("")),
            Value::Bool(false) | Value::Null => doc.remove_attr(node, &name),
            v if v.is_stringable() => doc.set_attr(node, &name, Some(&v.to_text())),
            other => debug_assert!(false, "attr() expects a scalar, got {other:?}"),
        }
        None
    })
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Node(id) => write!(f, "node({id})"),
            Value::Template(t) => t.fmt(f),
            Value::Renderable(_) => write!(f, "renderable"),
            Value::List(items) => f.debug_list().entries(items.iter()).finish(),
            Value::Directive(_) => write!(f, "directive"),
            Value::Keyed(key, inner) => write!(f, "keyed({key:?}, {inner:?})"),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(Rc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(Rc::from(v.as_str()))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<NodeId> for Value {
    fn from(v: NodeId) -> Self {
        Value::Node(v)
    }
}

impl From<Template> for Value {
    fn from(v: Template) -> Self {
        Value::Template(v)
    }
}

impl From<Rc<dyn Renderable>> for Value {
    fn from(v: Rc<dyn Renderable>) -> Self {
        Value::Renderable(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}
