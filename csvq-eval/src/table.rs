use crate::config::Flags;
use crate::error::EvalResult;
use crate::view::View;

/// Where a loaded table came from, for error messages and cache
/// invalidation. Not interpreted by the core beyond display/equality.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TableOrigin {
    pub canonical_path: String,
}

/// The contract the core relies on to turn an `Identifier` literal in a
/// `FROM` clause into a [`View`]. Implemented outside this crate by the CSV
/// reader; the core never opens a file itself.
///
/// The returned view is treated as immutable for the lifetime of the query
/// unless a DML statement targets it.
pub trait TableLoader {
    fn load(&self, identifier: &str, flags: &Flags) -> EvalResult<(View, TableOrigin)>;
}

/// The contract for serializing a [`View`] back out, invoked by top-level
/// statements outside the core rather than by the evaluator itself.
pub trait TableWriter {
    fn write(&self, view: &View, format: &WriteFormat) -> EvalResult<()>;
}

/// Output formatting knobs for [`TableWriter`].
#[derive(Clone, Debug)]
pub struct WriteFormat {
    pub delimiter: char,
    pub quote_all: bool,
    pub encoding: String,
    pub line_terminator: LineTerminator,
    pub with_header: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LineTerminator {
    Lf,
    CrLf,
}

/// An in-memory [`TableLoader`] useful for tests and for `DECLARE TABLE`
/// materialization: tables are registered by name ahead of time rather than
/// read from disk.
#[derive(Default)]
pub struct StaticTableLoader {
    tables: std::collections::HashMap<String, View>,
}

impl StaticTableLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, view: View) {
        self.tables.insert(name.into().to_ascii_uppercase(), view);
    }
}

impl TableLoader for StaticTableLoader {
    fn load(&self, identifier: &str, _flags: &Flags) -> EvalResult<(View, TableOrigin)> {
        self.tables
            .get(&identifier.to_ascii_uppercase())
            .cloned()
            .map(|view| {
                (
                    view,
                    TableOrigin {
                        canonical_path: identifier.to_string(),
                    },
                )
            })
            .ok_or_else(|| crate::error::EvalError::io(format!("file {} does not exist", identifier)))
    }
}
