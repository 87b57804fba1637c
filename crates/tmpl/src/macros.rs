//! The tagged-template macro.

/// Build a [`Template`](crate::Template) from literal markup fragments and
/// braced dynamic expressions:
///
/// ```
/// use tmpl::html;
/// let name = "world";
/// let greeting = html!("<p>hello " {name} "</p>");
/// ```
///
/// Fragments and dynamics must alternate, starting and ending with a
/// fragment (use `""` where markup is empty: `html!("" {x} "")`). Each
/// expansion site gets its own `static` statics array whose identity keys
/// the compiled-template cache: re-invoking one call site reuses its
/// compiled skeleton, while two call sites never share one even when their
/// text matches.
#[macro_export]
macro_rules! html {
    ($head:literal $( { $dynamic:expr } $tail:literal )*) => {{
        static STATICS: $crate::Statics = $crate::Statics::new(&[$head $(, $tail)*]);
        $crate::Template::new(
            &STATICS,
            ::std::vec![$( $crate::Value::from($dynamic) ),*],
        )
    }};
}
