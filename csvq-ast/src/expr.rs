use core::fmt;

use csvq_value::Primary;

use crate::ident::Identifier;
use crate::literal::PrimitiveType;
use crate::location::{Located, Location};
use crate::query::SelectQuery;
use crate::utils::display_comma_separated;

/// Any expression that can appear inside a query: a column reference, a
/// literal, an operator application, a function call, or a subquery. Every
/// variant carries its own [`Location`] (reachable via [`Located::location`])
/// and a stable [`fmt::Display`] rendering.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QueryExpression {
    Primitive(PrimitiveType),
    Identifier(Identifier),
    /// `table.column`
    FieldReference(FieldReference),
    /// `table.N`, a positional reference used by some procedural contexts.
    ColumnNumber(ColumnNumber),
    /// `@name`
    Variable(Variable),
    /// Unqualified `*`, or `t.*` when `table` is set.
    AllColumns(AllColumns),

    Arithmetic(Box<Arithmetic>),
    UnaryArithmetic(Box<UnaryArithmetic>),
    Concat(Box<Concat>),
    Comparison(Box<Comparison>),
    Is(Box<Is>),
    Between(Box<Between>),
    In(Box<In>),
    All(Box<All>),
    Any(Box<Any>),
    Like(Box<Like>),
    Exists(Box<Exists>),
    Logic(Box<Logic>),
    UnaryLogic(Box<UnaryLogic>),
    Case(Box<CaseExpr>),

    Function(Box<Function>),
    AggregateFunction(Box<AggregateFunction>),
    AnalyticFunction(Box<AnalyticFunction>),
    ListAgg(Box<ListAgg>),

    Subquery(Box<SelectQuery>),
}

impl fmt::Display for QueryExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(e) => write!(f, "{}", e),
            Self::Identifier(e) => write!(f, "{}", e),
            Self::FieldReference(e) => write!(f, "{}", e),
            Self::ColumnNumber(e) => write!(f, "{}", e),
            Self::Variable(e) => write!(f, "{}", e),
            Self::AllColumns(e) => write!(f, "{}", e),
            Self::Arithmetic(e) => write!(f, "{}", e),
            Self::UnaryArithmetic(e) => write!(f, "{}", e),
            Self::Concat(e) => write!(f, "{}", e),
            Self::Comparison(e) => write!(f, "{}", e),
            Self::Is(e) => write!(f, "{}", e),
            Self::Between(e) => write!(f, "{}", e),
            Self::In(e) => write!(f, "{}", e),
            Self::All(e) => write!(f, "{}", e),
            Self::Any(e) => write!(f, "{}", e),
            Self::Like(e) => write!(f, "{}", e),
            Self::Exists(e) => write!(f, "{}", e),
            Self::Logic(e) => write!(f, "{}", e),
            Self::UnaryLogic(e) => write!(f, "{}", e),
            Self::Case(e) => write!(f, "{}", e),
            Self::Function(e) => write!(f, "{}", e),
            Self::AggregateFunction(e) => write!(f, "{}", e),
            Self::AnalyticFunction(e) => write!(f, "{}", e),
            Self::ListAgg(e) => write!(f, "{}", e),
            Self::Subquery(e) => write!(f, "({})", e),
        }
    }
}

impl Located for QueryExpression {
    fn location(&self) -> &Location {
        match self {
            Self::Primitive(e) => e.location(),
            Self::Identifier(e) => e.location(),
            Self::FieldReference(e) => &e.location,
            Self::ColumnNumber(e) => &e.location,
            Self::Variable(e) => &e.location,
            Self::AllColumns(e) => &e.location,
            Self::Arithmetic(e) => &e.location,
            Self::UnaryArithmetic(e) => &e.location,
            Self::Concat(e) => &e.location,
            Self::Comparison(e) => &e.location,
            Self::Is(e) => &e.location,
            Self::Between(e) => &e.location,
            Self::In(e) => &e.location,
            Self::All(e) => &e.location,
            Self::Any(e) => &e.location,
            Self::Like(e) => &e.location,
            Self::Exists(e) => &e.location,
            Self::Logic(e) => &e.location,
            Self::UnaryLogic(e) => &e.location,
            Self::Case(e) => &e.location,
            Self::Function(e) => &e.location,
            Self::AggregateFunction(e) => &e.location,
            Self::AnalyticFunction(e) => &e.location,
            Self::ListAgg(e) => &e.location,
            Self::Subquery(e) => &e.location,
        }
    }
}

/// `table.column`
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldReference {
    pub table: Identifier,
    pub column: Identifier,
    pub location: Location,
}

impl fmt::Display for FieldReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// `table.N`, a 1-based positional column reference.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColumnNumber {
    pub table: Identifier,
    pub number: u64,
    pub location: Location,
}

impl fmt::Display for ColumnNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.number)
    }
}

/// `@name`, a scope-resolved variable reference.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Variable {
    pub name: String,
    pub location: Location,
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)
    }
}

/// Unqualified `*`, or `table.*` when `table` is `Some`.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AllColumns {
    pub table: Option<Identifier>,
    pub location: Location,
}

impl fmt::Display for AllColumns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.*", table),
            None => f.write_str("*"),
        }
    }
}

// ============================================================================
// operators
// ============================================================================

/// `+ - * / %`
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArithmeticOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl fmt::Display for ArithmeticOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
        })
    }
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Arithmetic {
    pub left: QueryExpression,
    pub op: ArithmeticOperator,
    pub right: QueryExpression,
    pub location: Location,
}

impl fmt::Display for Arithmetic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.op, self.right)
    }
}

/// Unary `+` or `-`.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnaryArithmetic {
    pub negative: bool,
    pub operand: QueryExpression,
    pub location: Location,
}

impl fmt::Display for UnaryArithmetic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", if self.negative { "-" } else { "+" }, self.operand)
    }
}

/// `left || right || ...`
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Concat {
    pub items: Vec<QueryExpression>,
    pub location: Location,
}

impl fmt::Display for Concat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        for item in &self.items {
            write!(f, "{}{}", sep, item)?;
            sep = " || ";
        }
        Ok(())
    }
}

/// `= <> != < > <= >=`
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Equal => "=",
            Self::NotEqual => "<>",
            Self::Less => "<",
            Self::Greater => ">",
            Self::LessOrEqual => "<=",
            Self::GreaterOrEqual => ">=",
        })
    }
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Comparison {
    pub left: QueryExpression,
    pub op: ComparisonOperator,
    pub right: QueryExpression,
    pub location: Location,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.op, self.right)
    }
}

/// The right-hand side of an `IS` test: `IS [NOT] NULL/TRUE/FALSE/UNKNOWN`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IsTarget {
    Null,
    True,
    False,
    Unknown,
}

impl fmt::Display for IsTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Null => "NULL",
            Self::True => "TRUE",
            Self::False => "FALSE",
            Self::Unknown => "UNKNOWN",
        })
    }
}

/// `expr IS [NOT] target`
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Is {
    pub expr: QueryExpression,
    pub negated: bool,
    pub target: IsTarget,
    pub location: Location,
}

impl fmt::Display for Is {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} IS {}{}",
            self.expr,
            if self.negated { "NOT " } else { "" },
            self.target
        )
    }
}

/// `expr [NOT] BETWEEN low AND high`
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Between {
    pub expr: QueryExpression,
    pub negated: bool,
    pub low: QueryExpression,
    pub high: QueryExpression,
    pub location: Location,
}

impl fmt::Display for Between {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}BETWEEN {} AND {}",
            self.expr,
            if self.negated { "NOT " } else { "" },
            self.low,
            self.high
        )
    }
}

/// The right-hand side of `IN`: a literal list or a subquery.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InList {
    Values(Vec<QueryExpression>),
    Subquery(Box<SelectQuery>),
}

impl fmt::Display for InList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Values(values) => write!(f, "({})", display_comma_separated(values)),
            Self::Subquery(query) => write!(f, "({})", query),
        }
    }
}

/// `expr [NOT] IN (list | subquery)`
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct In {
    pub expr: QueryExpression,
    pub negated: bool,
    pub list: InList,
    pub location: Location,
}

impl fmt::Display for In {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}IN {}",
            self.expr,
            if self.negated { "NOT " } else { "" },
            self.list
        )
    }
}

/// `expr op ALL (list | subquery)`
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct All {
    pub expr: QueryExpression,
    pub op: ComparisonOperator,
    pub list: InList,
    pub location: Location,
}

impl fmt::Display for All {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ALL {}", self.expr, self.op, self.list)
    }
}

/// `expr op ANY (list | subquery)` (`SOME` is an alias handled by the parser).
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Any {
    pub expr: QueryExpression,
    pub op: ComparisonOperator,
    pub list: InList,
    pub location: Location,
}

impl fmt::Display for Any {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ANY {}", self.expr, self.op, self.list)
    }
}

/// `expr [NOT] LIKE pattern`
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Like {
    pub expr: QueryExpression,
    pub negated: bool,
    pub pattern: QueryExpression,
    pub location: Location,
}

impl fmt::Display for Like {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}LIKE {}",
            self.expr,
            if self.negated { "NOT " } else { "" },
            self.pattern
        )
    }
}

/// `[NOT] EXISTS (subquery)`
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Exists {
    pub negated: bool,
    pub subquery: Box<SelectQuery>,
    pub location: Location,
}

impl fmt::Display for Exists {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}EXISTS ({})",
            if self.negated { "NOT " } else { "" },
            self.subquery
        )
    }
}

/// `AND OR XOR`
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LogicOperator {
    And,
    Or,
    Xor,
}

impl fmt::Display for LogicOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
        })
    }
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Logic {
    pub left: QueryExpression,
    pub op: LogicOperator,
    pub right: QueryExpression,
    pub location: Location,
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.op, self.right)
    }
}

/// `NOT expr`
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnaryLogic {
    pub operand: QueryExpression,
    pub location: Location,
}

impl fmt::Display for UnaryLogic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NOT {}", self.operand)
    }
}

/// `CASE [operand] WHEN cond THEN result ... [ELSE result] END`
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CaseExpr {
    pub operand: Option<Box<QueryExpression>>,
    pub when_then: Vec<(QueryExpression, QueryExpression)>,
    pub else_result: Option<Box<QueryExpression>>,
    pub location: Location,
}

impl fmt::Display for CaseExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CASE")?;
        if let Some(operand) = &self.operand {
            write!(f, " {}", operand)?;
        }
        for (cond, result) in &self.when_then {
            write!(f, " WHEN {} THEN {}", cond, result)?;
        }
        if let Some(else_result) = &self.else_result {
            write!(f, " ELSE {}", else_result)?;
        }
        f.write_str(" END")
    }
}

// ============================================================================
// functions
// ============================================================================

/// A plain scalar function call, e.g. `SUBSTR(a, 1, 3)`.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Function {
    pub name: Identifier,
    pub args: Vec<QueryExpression>,
    pub location: Location,
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, display_comma_separated(&self.args))
    }
}

/// `COUNT(*)`, `SUM(DISTINCT x)`, etc.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AggregateFunction {
    pub name: Identifier,
    pub distinct: bool,
    /// Empty iff the call is `COUNT(*)`.
    pub args: Vec<QueryExpression>,
    pub location: Location,
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args = if self.args.is_empty() {
            "*".to_string()
        } else {
            display_comma_separated(&self.args)
        };
        write!(
            f,
            "{}({}{})",
            self.name,
            if self.distinct { "DISTINCT " } else { "" },
            args
        )
    }
}

/// `name(args) [IGNORE NULLS] OVER (...)`.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnalyticFunction {
    pub name: Identifier,
    pub args: Vec<QueryExpression>,
    pub ignore_nulls: bool,
    pub over: AnalyticClause,
    pub location: Location,
}

impl fmt::Display for AnalyticFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, display_comma_separated(&self.args))?;
        if self.ignore_nulls {
            write!(f, " IGNORE NULLS")?;
        }
        write!(f, " OVER ({})", self.over)
    }
}

/// `LISTAGG([DISTINCT] expr [, sep]) [WITHIN GROUP (ORDER BY ...)]`
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ListAgg {
    pub distinct: bool,
    pub expr: Box<QueryExpression>,
    pub separator: Option<Box<QueryExpression>>,
    pub within_group_order_by: Vec<crate::query::SortSpec>,
    pub location: Location,
}

impl fmt::Display for ListAgg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LISTAGG({}{}",
            if self.distinct { "DISTINCT " } else { "" },
            self.expr
        )?;
        if let Some(sep) = &self.separator {
            write!(f, ", {}", sep)?;
        }
        f.write_str(")")?;
        if !self.within_group_order_by.is_empty() {
            write!(
                f,
                " WITHIN GROUP (ORDER BY {})",
                display_comma_separated(&self.within_group_order_by)
            )?;
        }
        Ok(())
    }
}

/// `PARTITION BY expr, ...` inside an analytic `OVER` clause.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Partition {
    pub items: Vec<QueryExpression>,
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PARTITION BY {}", display_comma_separated(&self.items))
    }
}

/// The full `OVER (...)` clause of an analytic function call.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnalyticClause {
    pub partition_by: Option<Partition>,
    pub order_by: Vec<crate::query::SortSpec>,
}

impl fmt::Display for AnalyticClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        if let Some(partition_by) = &self.partition_by {
            write!(f, "{}", partition_by)?;
            sep = " ";
        }
        if !self.order_by.is_empty() {
            write!(
                f,
                "{}ORDER BY {}",
                sep,
                display_comma_separated(&self.order_by)
            )?;
        }
        Ok(())
    }
}

/// Used by `PrimitiveType` construction helpers and evaluator literal folding.
pub fn null_literal(location: Location) -> QueryExpression {
    QueryExpression::Primitive(PrimitiveType::new(Primary::Null, location))
}
