use core::fmt;

/// Renders an iterable of `Display`-able items separated by `sep`, the way
/// `Ident` lists (`a.b.c`) and projection lists (`a, b, c`) are rendered
/// throughout this crate.
pub fn display_separated<'a, T: fmt::Display + 'a>(
    items: impl IntoIterator<Item = &'a T>,
    sep: &str,
) -> String {
    let mut out = String::new();
    let mut first = true;
    for item in items {
        if !first {
            out.push_str(sep);
        }
        first = false;
        out.push_str(&item.to_string());
    }
    out
}

/// Shorthand for `display_separated(items, ", ")`.
pub fn display_comma_separated<'a, T: fmt::Display + 'a>(
    items: impl IntoIterator<Item = &'a T>,
) -> String {
    display_separated(items, ", ")
}

/// Doubles embedded single quotes so a string round-trips through a SQL
/// single-quoted literal.
pub fn escape_single_quote_string(s: &str) -> String {
    s.replace('\'', "''")
}
