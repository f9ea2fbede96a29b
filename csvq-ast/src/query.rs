use core::fmt;

use crate::expr::QueryExpression;
use crate::ident::Identifier;
use crate::location::{Located, Location};
use crate::utils::display_comma_separated;

/// A complete `SELECT` statement: an optional `WITH` clause wrapping a
/// [`SelectSet`], followed by `ORDER BY`/`LIMIT`/`OFFSET`.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SelectQuery {
    pub with: Option<With>,
    pub body: SelectSet,
    pub order_by: Vec<SortSpec>,
    pub limit: Option<Limit>,
    pub offset: Option<Offset>,
    pub location: Location,
}

impl fmt::Display for SelectQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(with) = &self.with {
            write!(f, "{} ", with)?;
        }
        write!(f, "{}", self.body)?;
        if !self.order_by.is_empty() {
            write!(f, " ORDER BY {}", display_comma_separated(&self.order_by))?;
        }
        if let Some(limit) = &self.limit {
            write!(f, " {}", limit)?;
        }
        if let Some(offset) = &self.offset {
            write!(f, " {}", offset)?;
        }
        Ok(())
    }
}

impl Located for SelectQuery {
    fn location(&self) -> &Location {
        &self.location
    }
}

/// The body of a query: a single `SELECT`, a set operation combining two
/// bodies, or a parenthesized body.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SelectSet {
    Entity(Box<SelectEntity>),
    SetOperation(Box<SetOperation>),
    Paren(Box<SelectQuery>),
}

impl fmt::Display for SelectSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity(e) => write!(f, "{}", e),
            Self::SetOperation(e) => write!(f, "{}", e),
            Self::Paren(e) => write!(f, "({})", e),
        }
    }
}

/// One of `UNION [ALL] | INTERSECT | EXCEPT` combining two query bodies.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SetOperator {
    Union,
    UnionAll,
    Intersect,
    IntersectAll,
    Except,
    ExceptAll,
}

impl fmt::Display for SetOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Union => "UNION",
            Self::UnionAll => "UNION ALL",
            Self::Intersect => "INTERSECT",
            Self::IntersectAll => "INTERSECT ALL",
            Self::Except => "EXCEPT",
            Self::ExceptAll => "EXCEPT ALL",
        })
    }
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SetOperation {
    pub left: SelectSet,
    pub op: SetOperator,
    pub right: SelectSet,
    pub location: Location,
}

impl fmt::Display for SetOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.op, self.right)
    }
}

/// `SELECT [DISTINCT] projection FROM ... [WHERE ...] [GROUP BY ...] [HAVING ...]`
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SelectEntity {
    pub distinct: bool,
    pub projection: Vec<SelectItem>,
    pub from: Option<From>,
    pub filter: Option<QueryExpression>,
    pub group_by: Vec<QueryExpression>,
    pub having: Option<QueryExpression>,
    pub location: Location,
}

impl fmt::Display for SelectEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT ")?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        write!(f, "{}", display_comma_separated(&self.projection))?;
        if let Some(from) = &self.from {
            write!(f, " {}", from)?;
        }
        if let Some(filter) = &self.filter {
            write!(f, " WHERE {}", filter)?;
        }
        if !self.group_by.is_empty() {
            write!(f, " GROUP BY {}", display_comma_separated(&self.group_by))?;
        }
        if let Some(having) = &self.having {
            write!(f, " HAVING {}", having)?;
        }
        Ok(())
    }
}

/// One projected column: `expr [AS alias]`.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SelectItem {
    pub expr: QueryExpression,
    pub alias: Option<Identifier>,
    pub location: Location,
}

impl fmt::Display for SelectItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {}", alias)?;
        }
        Ok(())
    }
}

/// `FROM reference [, reference ...]`
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct From {
    pub references: Vec<TableReference>,
}

impl fmt::Display for From {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FROM {}", display_comma_separated(&self.references))
    }
}

/// A table primary optionally followed by a chain of joins.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TableReference {
    pub factor: TableFactor,
    pub joins: Vec<Join>,
}

impl fmt::Display for TableReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.factor)?;
        for join in &self.joins {
            write!(f, " {}", join)?;
        }
        Ok(())
    }
}

/// A single element of a `FROM` list before joins are attached: a file-
/// backed table, an inline value list, a subquery, a cursor, or a
/// parenthesized reference.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TableFactor {
    Table(TableName),
    Subquery(Subquery),
    Cursor(CursorReference),
    Stdin(Option<Identifier>),
    Paren(Box<TableReference>),
}

impl fmt::Display for TableFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table(t) => write!(f, "{}", t),
            Self::Subquery(s) => write!(f, "{}", s),
            Self::Cursor(c) => write!(f, "{}", c),
            Self::Stdin(alias) => {
                f.write_str("STDIN")?;
                if let Some(alias) = alias {
                    write!(f, " {}", alias)?;
                }
                Ok(())
            }
            Self::Paren(t) => write!(f, "({})", t),
        }
    }
}

/// A file-backed table reference: a path/identifier plus an optional alias.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TableName {
    pub name: Identifier,
    pub alias: Option<Identifier>,
    pub location: Location,
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {}", alias)?;
        }
        Ok(())
    }
}

/// `(subquery) [AS] alias`
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Subquery {
    pub query: Box<SelectQuery>,
    pub alias: Identifier,
    pub location: Location,
}

impl fmt::Display for Subquery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) AS {}", self.query, self.alias)
    }
}

/// A previously-opened cursor used as a row source: `CURSOR name [AS alias]`.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CursorReference {
    pub name: Identifier,
    pub alias: Option<Identifier>,
    pub location: Location,
}

impl fmt::Display for CursorReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CURSOR {}", self.name)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {}", alias)?;
        }
        Ok(())
    }
}

/// `[INNER|LEFT|RIGHT|FULL|CROSS|NATURAL] JOIN factor [ON ... | USING (...)]`
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Join {
    pub kind: JoinKind,
    pub natural: bool,
    pub factor: TableFactor,
    pub condition: Option<JoinCondition>,
    pub location: Location,
}

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.natural {
            write!(f, "NATURAL ")?;
        }
        write!(f, "{} JOIN {}", self.kind, self.factor)?;
        if let Some(condition) = &self.condition {
            write!(f, " {}", condition)?;
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Inner => "INNER",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
            Self::Full => "FULL",
            Self::Cross => "CROSS",
        })
    }
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JoinCondition {
    On(QueryExpression),
    Using(Vec<Identifier>),
}

impl fmt::Display for JoinCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::On(expr) => write!(f, "ON {}", expr),
            Self::Using(cols) => write!(f, "USING ({})", display_comma_separated(cols)),
        }
    }
}

/// One entry of an `ORDER BY` list.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SortSpec {
    pub expr: QueryExpression,
    pub desc: bool,
    pub nulls_first: Option<bool>,
    pub location: Location,
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.expr, if self.desc { "DESC" } else { "ASC" })?;
        match self.nulls_first {
            Some(true) => write!(f, " NULLS FIRST"),
            Some(false) => write!(f, " NULLS LAST"),
            None => Ok(()),
        }
    }
}

/// `LIMIT count [PERCENT] [WITH TIES]`
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Limit {
    pub count: QueryExpression,
    pub percent: bool,
    pub with_ties: bool,
    pub location: Location,
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LIMIT {}", self.count)?;
        if self.percent {
            write!(f, " PERCENT")?;
        }
        if self.with_ties {
            write!(f, " WITH TIES")?;
        }
        Ok(())
    }
}

/// `OFFSET count [ROW|ROWS]`
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Offset {
    pub count: QueryExpression,
    pub location: Location,
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OFFSET {}", self.count)
    }
}

/// `WITH [RECURSIVE] name [(columns)] AS (query) [, ...]`
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct With {
    pub recursive: bool,
    pub ctes: Vec<Cte>,
}

impl fmt::Display for With {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WITH ")?;
        if self.recursive {
            write!(f, "RECURSIVE ")?;
        }
        write!(f, "{}", display_comma_separated(&self.ctes))
    }
}

/// One common table expression.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cte {
    pub name: Identifier,
    pub columns: Vec<Identifier>,
    pub query: Box<SelectQuery>,
    pub location: Location,
}

impl fmt::Display for Cte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.columns.is_empty() {
            write!(f, " ({})", display_comma_separated(&self.columns))?;
        }
        write!(f, " AS ({})", self.query)
    }
}
