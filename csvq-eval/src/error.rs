use std::fmt;

use csvq_ast::Location;

/// Every error the evaluator can raise, tagged with a stable code plus a
/// human message and, when the trigger was an AST node, the source
/// location that produced it. Hand-rolled rather than derive-macro
/// generated, matching csvq's other crates.
#[derive(Clone, Debug)]
pub struct EvalError {
    pub kind: ErrorKind,
    pub message: String,
    pub location: Option<Location>,
}

/// The taxonomy of evaluator failures. Lexical/syntactic errors are a
/// parser concern and never appear here.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Undeclared variable/cursor/table/function, ambiguous column, arity
    /// mismatch, column count mismatch in a set operation, a non-scalar
    /// subquery used in scalar position, DISTINCT/GROUP BY misuse.
    Semantic,
    /// A non-coercible operand in arithmetic/comparison/concat while
    /// strict mode is active.
    Type,
    /// Redeclared/undeclared/closed/already-open cursor, pseudo-cursor
    /// misuse, an invalid FETCH position argument.
    CursorState,
    /// File not found, permission, encoding, or serialization failure
    /// surfaced by an external collaborator (table loader, writer).
    Io,
    /// Cancellation, or an internal invariant violated by a bug in this
    /// crate rather than by the query.
    System,
    /// Raised by a `TRIGGER` statement, carrying the user's message and
    /// optional user code.
    UserRaised,
}

impl EvalError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        EvalError {
            kind,
            message: message.into(),
            location: None,
        }
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn semantic(message: impl Into<String>) -> Self {
        EvalError::new(ErrorKind::Semantic, message)
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        EvalError::new(ErrorKind::Type, message)
    }

    pub fn cursor_state(message: impl Into<String>) -> Self {
        EvalError::new(ErrorKind::CursorState, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        EvalError::new(ErrorKind::Io, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        EvalError::new(ErrorKind::System, message)
    }

    pub fn cancelled() -> Self {
        EvalError::new(ErrorKind::System, "operation cancelled")
    }

    pub fn user_raised(message: impl Into<String>, code: Option<i64>) -> Self {
        let message = message.into();
        match code {
            Some(code) => EvalError::new(ErrorKind::UserRaised, format!("{} ({})", message, code)),
            None => EvalError::new(ErrorKind::UserRaised, message),
        }
    }

    pub fn unknown_column(name: impl fmt::Display) -> Self {
        EvalError::semantic(format!("field {} does not exist", name))
    }

    pub fn ambiguous_column(name: impl fmt::Display) -> Self {
        EvalError::semantic(format!("field {} is ambiguous", name))
    }

    pub fn undeclared_variable(name: impl fmt::Display) -> Self {
        EvalError::semantic(format!("variable @{} is undeclared", name))
    }

    pub fn redeclared_variable(name: impl fmt::Display) -> Self {
        EvalError::semantic(format!("variable @{} is redeclared", name))
    }

    pub fn undeclared_cursor(name: impl fmt::Display) -> Self {
        EvalError::cursor_state(format!("cursor {} is undeclared", name))
    }

    pub fn redeclared_cursor(name: impl fmt::Display) -> Self {
        EvalError::cursor_state(format!("cursor {} is redeclared", name))
    }

    pub fn cursor_closed(name: impl fmt::Display) -> Self {
        EvalError::cursor_state(format!("cursor {} is closed", name))
    }

    pub fn cursor_open(name: impl fmt::Display) -> Self {
        EvalError::cursor_state(format!("cursor {} is already open", name))
    }

    pub fn pseudo_cursor(name: impl fmt::Display) -> Self {
        EvalError::cursor_state(format!("cursor {} is a pseudo-cursor", name))
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{}: {}", location, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for EvalError {}

pub type EvalResult<T> = Result<T, EvalError>;
