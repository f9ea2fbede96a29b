use core::fmt;

use crate::expr::QueryExpression;
use crate::ident::Identifier;
use crate::location::{Located, Location};
use crate::query::SelectQuery;
use crate::utils::display_comma_separated;

/// Any top-level procedural statement. A csvq program is a sequence of
/// these, executed in order against a shared [scope chain](crate) of
/// variables, cursors, and temporary tables.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Statement {
    Select(Box<SelectQuery>),
    VariableDeclaration(VariableDeclaration),
    Substitution(Box<Substitution>),
    Assignment(Box<Assignment>),
    Print(Box<Print>),

    CursorDeclaration(Box<CursorDeclaration>),
    CursorOpen(CursorOpen),
    CursorClose(CursorClose),
    CursorDispose(CursorDispose),
    CursorFetch(Box<CursorFetch>),

    FunctionDeclaration(Box<FunctionDeclaration>),
    AggregateDeclaration(Box<AggregateDeclaration>),

    If(Box<If>),
    Case(Box<CaseStmt>),
    While(Box<While>),
    WhileInCursor(Box<WhileInCursor>),

    TableDeclaration(Box<TableDeclaration>),

    TransactionControl(TransactionControl),
    FlowControl(FlowControl),
    Trigger(Trigger),
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select(s) => write!(f, "{};", s),
            Self::VariableDeclaration(s) => write!(f, "{};", s),
            Self::Substitution(s) => write!(f, "{};", s),
            Self::Assignment(s) => write!(f, "{};", s),
            Self::Print(s) => write!(f, "{};", s),
            Self::CursorDeclaration(s) => write!(f, "{};", s),
            Self::CursorOpen(s) => write!(f, "{};", s),
            Self::CursorClose(s) => write!(f, "{};", s),
            Self::CursorDispose(s) => write!(f, "{};", s),
            Self::CursorFetch(s) => write!(f, "{};", s),
            Self::FunctionDeclaration(s) => write!(f, "{}", s),
            Self::AggregateDeclaration(s) => write!(f, "{}", s),
            Self::If(s) => write!(f, "{}", s),
            Self::Case(s) => write!(f, "{}", s),
            Self::While(s) => write!(f, "{}", s),
            Self::WhileInCursor(s) => write!(f, "{}", s),
            Self::TableDeclaration(s) => write!(f, "{};", s),
            Self::TransactionControl(s) => write!(f, "{};", s),
            Self::FlowControl(s) => write!(f, "{};", s),
            Self::Trigger(s) => write!(f, "{};", s),
        }
    }
}

/// `VAR @name [:= expr] [, @name2 [:= expr2] ...]`
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VariableDeclaration {
    pub assignments: Vec<VarAssignment>,
    pub location: Location,
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VarAssignment {
    pub name: String,
    pub value: Option<QueryExpression>,
}

impl fmt::Display for VarAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)?;
        if let Some(value) = &self.value {
            write!(f, " := {}", value)?;
        }
        Ok(())
    }
}

impl fmt::Display for VariableDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VAR {}", display_comma_separated(&self.assignments))
    }
}

/// `@name := expr`, reassigning a variable already in scope.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Substitution {
    pub name: String,
    pub value: QueryExpression,
    pub location: Location,
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{} := {}", self.name, self.value)
    }
}

/// `expr := expr`, a general assignment target used in cursor/row contexts
/// (e.g. assigning into a fetch target that is itself a variable list).
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Assignment {
    pub target: Identifier,
    pub value: QueryExpression,
    pub location: Location,
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.target, self.value)
    }
}

/// `PRINT expr`
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Print {
    pub value: QueryExpression,
    pub location: Location,
}

impl fmt::Display for Print {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PRINT {}", self.value)
    }
}

/// `CURSOR name FOR query` or `CURSOR name FOR CSV(...)`-style source.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CursorDeclaration {
    pub name: Identifier,
    pub query: Box<SelectQuery>,
    pub location: Location,
}

impl fmt::Display for CursorDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CURSOR {} FOR {}", self.name, self.query)
    }
}

/// `OPEN name`
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CursorOpen {
    pub name: Identifier,
    pub location: Location,
}

impl fmt::Display for CursorOpen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OPEN {}", self.name)
    }
}

/// `CLOSE name`
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CursorClose {
    pub name: Identifier,
    pub location: Location,
}

impl fmt::Display for CursorClose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CLOSE {}", self.name)
    }
}

/// `DISPOSE CURSOR name`
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CursorDispose {
    pub name: Identifier,
    pub location: Location,
}

impl fmt::Display for CursorDispose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DISPOSE CURSOR {}", self.name)
    }
}

/// The position argument of a `FETCH` statement.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FetchPosition {
    Next,
    Prior,
    First,
    Last,
    Absolute(i64),
    Relative(i64),
}

impl fmt::Display for FetchPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Next => f.write_str("NEXT"),
            Self::Prior => f.write_str("PRIOR"),
            Self::First => f.write_str("FIRST"),
            Self::Last => f.write_str("LAST"),
            Self::Absolute(n) => write!(f, "ABSOLUTE {}", n),
            Self::Relative(n) => write!(f, "RELATIVE {}", n),
        }
    }
}

/// `FETCH [position FROM] name INTO @var [, @var2 ...]`
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CursorFetch {
    pub position: FetchPosition,
    pub name: Identifier,
    pub targets: Vec<String>,
    pub location: Location,
}

impl fmt::Display for CursorFetch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FETCH {} FROM {} INTO ", self.position, self.name)?;
        let mut sep = "";
        for target in &self.targets {
            write!(f, "{}@{}", sep, target)?;
            sep = ", ";
        }
        Ok(())
    }
}

/// `DECLARE FUNCTION name(params) AS BEGIN ... END`
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FunctionDeclaration {
    pub name: Identifier,
    pub params: Vec<String>,
    pub defaults: Vec<(String, QueryExpression)>,
    pub body: Vec<Statement>,
    pub location: Location,
}

impl fmt::Display for FunctionDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DECLARE FUNCTION {} (", self.name)?;
        writeln!(f, "AS BEGIN")?;
        for stmt in &self.body {
            writeln!(f, "  {}", stmt)?;
        }
        write!(f, "END")
    }
}

/// `DECLARE AGGREGATE FUNCTION name(params) AS BEGIN ... END`, a
/// user-defined aggregate with a cursor-style accumulation body.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AggregateDeclaration {
    pub name: Identifier,
    pub cursor_param: String,
    pub params: Vec<String>,
    pub body: Vec<Statement>,
    pub location: Location,
}

impl fmt::Display for AggregateDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DECLARE AGGREGATE FUNCTION {} (", self.name)?;
        writeln!(f, "AS BEGIN")?;
        for stmt in &self.body {
            writeln!(f, "  {}", stmt)?;
        }
        write!(f, "END")
    }
}

/// `IF cond THEN ... [ELSE IF cond THEN ...] [ELSE ...] END IF`
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct If {
    pub condition: QueryExpression,
    pub body: Vec<Statement>,
    pub else_ifs: Vec<ElseIf>,
    pub else_body: Option<Vec<Statement>>,
    pub location: Location,
}

impl fmt::Display for If {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "IF {} THEN", self.condition)?;
        for stmt in &self.body {
            writeln!(f, "  {}", stmt)?;
        }
        for else_if in &self.else_ifs {
            writeln!(f, "{}", else_if)?;
        }
        if let Some(else_body) = &self.else_body {
            writeln!(f, "ELSE")?;
            for stmt in else_body {
                writeln!(f, "  {}", stmt)?;
            }
        }
        write!(f, "END IF")
    }
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElseIf {
    pub condition: QueryExpression,
    pub body: Vec<Statement>,
}

impl fmt::Display for ElseIf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ELSE IF {} THEN", self.condition)?;
        for stmt in &self.body {
            writeln!(f, "  {}", stmt)?;
        }
        Ok(())
    }
}

/// A procedural `CASE WHEN cond THEN block ... [ELSE block] END CASE`,
/// distinct from [`crate::expr::CaseExpr`]: branches run statement blocks
/// rather than producing a value.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CaseStmt {
    pub operand: Option<QueryExpression>,
    pub when: Vec<CaseWhen>,
    pub else_body: Option<Vec<Statement>>,
    pub location: Location,
}

impl fmt::Display for CaseStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CASE")?;
        if let Some(operand) = &self.operand {
            write!(f, " {}", operand)?;
        }
        writeln!(f)?;
        for when in &self.when {
            writeln!(f, "{}", when)?;
        }
        if let Some(else_body) = &self.else_body {
            writeln!(f, "ELSE")?;
            for stmt in else_body {
                writeln!(f, "  {}", stmt)?;
            }
        }
        write!(f, "END CASE")
    }
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CaseWhen {
    pub condition: QueryExpression,
    pub body: Vec<Statement>,
}

impl fmt::Display for CaseWhen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "WHEN {} THEN", self.condition)?;
        for stmt in &self.body {
            writeln!(f, "  {}", stmt)?;
        }
        Ok(())
    }
}

/// `WHILE cond DO ... END WHILE`
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct While {
    pub condition: QueryExpression,
    pub body: Vec<Statement>,
    pub location: Location,
}

impl fmt::Display for While {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "WHILE {} DO", self.condition)?;
        for stmt in &self.body {
            writeln!(f, "  {}", stmt)?;
        }
        write!(f, "END WHILE")
    }
}

/// `WHILE name IN CURSOR cursor_name DO ... END WHILE`, iterating a cursor
/// one row per iteration without an explicit `FETCH`.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WhileInCursor {
    pub variables: Vec<String>,
    pub cursor: Identifier,
    pub body: Vec<Statement>,
    pub location: Location,
}

impl fmt::Display for WhileInCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WHILE ")?;
        let mut sep = "";
        for v in &self.variables {
            write!(f, "{}@{}", sep, v)?;
            sep = ", ";
        }
        writeln!(f, " IN CURSOR {} DO", self.cursor)?;
        for stmt in &self.body {
            writeln!(f, "  {}", stmt)?;
        }
        write!(f, "END WHILE")
    }
}

/// `DECLARE TABLE name (columns) AS query`, a session-scoped temporary
/// table materialized once from a query result.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TableDeclaration {
    pub name: Identifier,
    pub columns: Vec<Identifier>,
    pub query: Box<SelectQuery>,
    pub location: Location,
}

impl fmt::Display for TableDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DECLARE TABLE {} (", self.name)?;
        write!(f, "{}", display_comma_separated(&self.columns))?;
        write!(f, ") AS {}", self.query)
    }
}

/// `COMMIT` or `ROLLBACK`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransactionControl {
    Commit,
    Rollback,
}

impl fmt::Display for TransactionControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Commit => "COMMIT",
            Self::Rollback => "ROLLBACK",
        })
    }
}

/// `BREAK`, `CONTINUE`, or `EXIT [code]`.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FlowControl {
    Break,
    Continue,
    Exit(Option<QueryExpression>),
}

impl fmt::Display for FlowControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Break => f.write_str("BREAK"),
            Self::Continue => f.write_str("CONTINUE"),
            Self::Exit(None) => f.write_str("EXIT"),
            Self::Exit(Some(code)) => write!(f, "EXIT {}", code),
        }
    }
}

/// `TRIGGER name` (raises a named, catchable error from procedure bodies).
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Trigger {
    pub message: QueryExpression,
    pub code: Option<i64>,
    pub location: Location,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TRIGGER {}", self.message)?;
        if let Some(code) = self.code {
            write!(f, ", {}", code)?;
        }
        Ok(())
    }
}

impl Located for Statement {
    fn location(&self) -> &Location {
        match self {
            Self::Select(s) => s.location(),
            Self::VariableDeclaration(s) => &s.location,
            Self::Substitution(s) => &s.location,
            Self::Assignment(s) => &s.location,
            Self::Print(s) => &s.location,
            Self::CursorDeclaration(s) => &s.location,
            Self::CursorOpen(s) => &s.location,
            Self::CursorClose(s) => &s.location,
            Self::CursorDispose(s) => &s.location,
            Self::CursorFetch(s) => &s.location,
            Self::FunctionDeclaration(s) => &s.location,
            Self::AggregateDeclaration(s) => &s.location,
            Self::If(s) => &s.location,
            Self::Case(s) => &s.location,
            Self::While(s) => &s.location,
            Self::WhileInCursor(s) => &s.location,
            Self::TableDeclaration(s) => &s.location,
            Self::TransactionControl(_) => TRANSACTION_LOCATION,
            Self::FlowControl(_) => TRANSACTION_LOCATION,
            Self::Trigger(s) => &s.location,
        }
    }
}

// `TransactionControl`/`FlowControl` carry no location of their own (they
// are single keywords); evaluator errors on them are reported against the
// enclosing statement instead, so `location()` hands back a fixed sentinel.
const TRANSACTION_LOCATION: &Location = &Location {
    file: None,
    line: 0,
    column: 0,
};
