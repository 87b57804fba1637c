//! Engine error taxonomy.
//!
//! The families carry different checking policies:
//! - `TemplateShape`: template/configuration mistakes, raised in debug builds
//!   only (release builds skip the checks and misrender instead).
//! - `Hydration`: structural disagreement between server markup and the
//!   client template. Always fatal, never recovered from.
//! - `Usage`: API misuse (e.g. invalidating a never-rendered renderable).
//!   Always raised.
//! - `Render` / `CircularRender`: failures out of user render code, and the
//!   server's bounded-recursion guard tripping.
//! - `Suspended`: not a failure. A renderable may return
//!   `Err(Error::Suspended(fallback))` and the engine renders the fallback
//!   template in place of the result; any other error propagates unchanged.
//!   Callers outside the engine only ever see this variant if they construct
//!   it themselves.

use crate::value::Template;
use std::fmt;

#[derive(Debug)]
pub enum Error {
    TemplateShape(String),
    Hydration(String),
    Usage(&'static str),
    /// A renderable's own failure. Propagates unchanged through however many
    /// part layers sit between the renderable and the render entry point.
    Render(String),
    CircularRender,
    Suspended(Template),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TemplateShape(msg) => write!(f, "template error: {msg}"),
            Error::Hydration(msg) => write!(f, "hydration error: {msg}"),
            Error::Usage(msg) => write!(f, "{msg}"),
            Error::Render(msg) => write!(f, "render error: {msg}"),
            Error::CircularRender => write!(f, "circular render"),
            Error::Suspended(_) => write!(f, "render suspended with a fallback template"),
        }
    }
}

impl std::error::Error for Error {}
