use core::fmt;

/// Where a node came from in the original source text. Carried on every
/// AST node so that semantic errors raised during evaluation can point back
/// at the statement that produced them, even though this crate never
/// lexes or parses anything itself.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Location {
    pub file: Option<String>,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(file: impl Into<Option<String>>, line: u32, column: u32) -> Self {
        Location {
            file: file.into(),
            line,
            column,
        }
    }

    /// A placeholder location for nodes synthesized by the evaluator itself
    /// (e.g. a desugared `NATURAL JOIN` condition) rather than parsed.
    pub fn synthetic() -> Self {
        Location::default()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}:{}", file, self.line, self.column),
            None => write!(f, "{}:{}", self.line, self.column),
        }
    }
}

/// Implemented by every AST node so callers can recover parse provenance
/// without matching on the node's concrete type.
pub trait Located {
    fn location(&self) -> &Location;
}
