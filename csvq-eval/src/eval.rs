use std::cmp::Ordering;

use csvq_ast::expr::{
    All, Any, Arithmetic, ArithmeticOperator, Between, CaseExpr, Comparison, ComparisonOperator,
    Concat, Exists, FieldReference, In, InList, Is, IsTarget, Like, Logic, LogicOperator,
    QueryExpression, UnaryArithmetic, UnaryLogic,
};
use csvq_ast::SelectQuery;
use csvq_value::{Primary, Ternary};

use crate::config::Flags;
use crate::context::CancellationContext;
use crate::error::{EvalError, EvalResult};
use crate::functions;
use crate::scope::ScopeChain;
use crate::view::{Header, Record, View};

/// Runs a subquery to completion, independent of the row currently being
/// evaluated. Implemented by the select pipeline, which is the only place
/// that knows how to run a full `SelectQuery`; plain expression evaluation
/// only needs the result.
pub trait SubqueryRunner {
    fn run(&self, query: &SelectQuery) -> EvalResult<View>;
}

/// Runs the body of a user-declared function or aggregate, called back
/// from [`eval`] when a call name isn't one of the builtins in
/// [`functions`]. Implemented by the statement executor (`crate::exec`),
/// which is the only place that interprets a `Statement` body; plain
/// expression evaluation only needs the returned value.
pub trait FunctionRunner {
    fn call_function(
        &self,
        decl: &csvq_ast::statement::FunctionDeclaration,
        args: &[Primary],
    ) -> EvalResult<Primary>;

    fn call_aggregate(
        &self,
        decl: &csvq_ast::statement::AggregateDeclaration,
        values: &[Primary],
    ) -> EvalResult<Primary>;
}

/// The row an expression is currently evaluated against. Empty for
/// contexts with no `FROM` (e.g. `SELECT 1 + 1` runs against [`Header`]/
/// [`Record`] of zero columns, the synthetic `Dual` table).
pub struct RowContext<'a> {
    pub header: &'a Header,
    pub record: &'a Record,
}

/// The set of member rows backing the current group, made available to
/// aggregate function calls. `None` outside of `GROUP BY`/`HAVING`/a
/// projection list that contains an aggregate.
pub struct GroupContext<'a> {
    pub header: &'a Header,
    pub rows: &'a [Record],
}

/// Everything expression evaluation needs beyond the row itself: session
/// flags (for `NOW()`), the cancellation context, the variable/cursor
/// scope, and optionally the current aggregate group.
pub struct EvalEnv<'a> {
    pub flags: &'a Flags,
    pub cancel: &'a CancellationContext,
    pub scope: &'a ScopeChain,
    pub group: Option<GroupContext<'a>>,
    /// `None` in contexts that cannot run a subquery (e.g. `DECLARE TABLE`
    /// default-value folding); `Exists`/scalar `Subquery`/`IN`-subquery all
    /// fail with a semantic error when this is `None`.
    pub subqueries: Option<&'a dyn SubqueryRunner>,
    /// `None` in contexts that cannot run a user-declared function body;
    /// calling a name that resolves to a user declaration then fails with a
    /// semantic error instead of running it.
    pub user_functions: Option<&'a dyn FunctionRunner>,
}

/// Evaluates `expr` against `row` in `env`, per the expression evaluation
/// rules: literals evaluate to themselves, field references resolve
/// through the header, arithmetic/concat/logic operators coerce operands
/// and propagate `NULL`, and calls dispatch to the builtin function table
/// or the aggregate group.
pub fn eval(expr: &QueryExpression, row: &RowContext<'_>, env: &EvalEnv<'_>) -> EvalResult<Primary> {
    env.cancel.check()?;
    match expr {
        QueryExpression::Primitive(lit) => Ok(lit.value.clone()),
        QueryExpression::Identifier(ident) => {
            let idx = row.header.resolve(&ident.value)?;
            Ok(row.record.value(idx).cloned().unwrap_or(Primary::Null))
        }
        QueryExpression::FieldReference(FieldReference { table, column, .. }) => {
            let idx = row.header.resolve_field(&table.value, &column.value)?;
            Ok(row.record.value(idx).cloned().unwrap_or(Primary::Null))
        }
        QueryExpression::ColumnNumber(cn) => {
            let idx = (cn.number as usize).checked_sub(1).ok_or_else(|| {
                EvalError::semantic(format!("{}.{} is not a valid column number", cn.table, cn.number))
            })?;
            row.record
                .value(idx)
                .cloned()
                .ok_or_else(|| EvalError::unknown_column(format!("{}.{}", cn.table, cn.number)))
        }
        QueryExpression::Variable(v) => env.scope.get_variable(&v.name),
        QueryExpression::AllColumns(_) => Err(EvalError::semantic(
            "* cannot be evaluated as a scalar expression",
        )),

        QueryExpression::Arithmetic(a) => eval_arithmetic(a, row, env),
        QueryExpression::UnaryArithmetic(u) => eval_unary_arithmetic(u, row, env),
        QueryExpression::Concat(c) => eval_concat(c, row, env),
        QueryExpression::Comparison(c) => eval_comparison(c, row, env).map(ternary_to_primary),
        QueryExpression::Is(is) => eval_is(is, row, env).map(ternary_to_primary),
        QueryExpression::Between(b) => eval_between(b, row, env).map(ternary_to_primary),
        QueryExpression::In(i) => eval_in(i, row, env).map(ternary_to_primary),
        QueryExpression::All(a) => eval_all(a, row, env).map(ternary_to_primary),
        QueryExpression::Any(a) => eval_any(a, row, env).map(ternary_to_primary),
        QueryExpression::Like(l) => eval_like(l, row, env).map(ternary_to_primary),
        QueryExpression::Exists(e) => eval_exists(e, env).map(ternary_to_primary),
        QueryExpression::Logic(l) => eval_logic(l, row, env).map(ternary_to_primary),
        QueryExpression::UnaryLogic(u) => eval_unary_logic(u, row, env).map(ternary_to_primary),
        QueryExpression::Case(c) => eval_case(c, row, env),

        QueryExpression::Function(f) => {
            let args = f
                .args
                .iter()
                .map(|a| eval(a, row, env))
                .collect::<EvalResult<Vec<_>>>()?;
            match env.scope.function(&f.name.value) {
                Some(decl) => {
                    let runner = env.user_functions.ok_or_else(|| {
                        EvalError::semantic(format!(
                            "function {} requires the statement executor to run its body",
                            f.name.value
                        ))
                    })?;
                    runner.call_function(&decl, &args)
                }
                None => functions::call_scalar(&f.name.value, &args),
            }
        }
        QueryExpression::AggregateFunction(f) => eval_aggregate(&f.name.value, &f.args, env),
        QueryExpression::AnalyticFunction(_) => Err(EvalError::semantic(
            "analytic functions are resolved by the window stage, not general expression evaluation",
        )),
        QueryExpression::ListAgg(l) => eval_aggregate("LISTAGG", std::slice::from_ref(l.expr.as_ref()), env),

        QueryExpression::Subquery(q) => eval_scalar_subquery(q, env),
    }
}

fn eval_scalar_subquery(query: &SelectQuery, env: &EvalEnv<'_>) -> EvalResult<Primary> {
    let runner = env
        .subqueries
        .ok_or_else(|| EvalError::semantic("subquery evaluation requires the select pipeline"))?;
    let view = runner.run(query)?;
    if view.row_count() != 1 || view.header.len() != 1 {
        return Err(EvalError::semantic(
            "a subquery used as an expression must return exactly one row and one column",
        ));
    }
    Ok(view.records[0].value(0).cloned().unwrap_or(Primary::Null))
}

fn ternary_to_primary(t: Ternary) -> Primary {
    Primary::Ternary(t)
}

fn eval_aggregate(name: &str, args: &[QueryExpression], env: &EvalEnv<'_>) -> EvalResult<Primary> {
    let group = env
        .group
        .as_ref()
        .ok_or_else(|| EvalError::semantic(format!("{} used outside an aggregate context", name)))?;

    let user_declared = env.scope.aggregate(name);

    let values = if args.is_empty() {
        if !name.eq_ignore_ascii_case("COUNT") && user_declared.is_none() {
            return Err(EvalError::semantic(format!("{}(*) is not valid", name)));
        }
        // COUNT(*): count every row in the group, NULLs included.
        vec![Primary::Null; group.rows.len()]
    } else {
        let mut values = Vec::with_capacity(group.rows.len());
        for record in group.rows {
            let row = RowContext {
                header: group.header,
                record,
            };
            let sub_env = EvalEnv {
                flags: env.flags,
                cancel: env.cancel,
                scope: env.scope,
                group: None,
                subqueries: env.subqueries,
                user_functions: env.user_functions,
            };
            let v = eval(&args[0], &row, &sub_env)?;
            if !v.is_null() {
                values.push(v);
            }
        }
        values
    };

    match user_declared {
        Some(decl) => {
            let runner = env.user_functions.ok_or_else(|| {
                EvalError::semantic(format!(
                    "aggregate {} requires the statement executor to run its body",
                    name
                ))
            })?;
            runner.call_aggregate(&decl, &values)
        }
        None => functions::call_aggregate(name, &values),
    }
}

fn eval_arithmetic(a: &Arithmetic, row: &RowContext<'_>, env: &EvalEnv<'_>) -> EvalResult<Primary> {
    let left = eval(&a.left, row, env)?;
    let right = eval(&a.right, row, env)?;
    if left.is_null() || right.is_null() {
        return Ok(Primary::Null);
    }
    if let (Primary::Integer(l), Primary::Integer(r)) = (&left, &right) {
        if a.op != ArithmeticOperator::Divide {
            return integer_arithmetic(a.op, *l, *r).map(Primary::Integer);
        }
    }
    let l = left
        .try_to_float()
        .ok_or_else(|| EvalError::type_error(format!("{} is not numeric", left)))?;
    let r = right
        .try_to_float()
        .ok_or_else(|| EvalError::type_error(format!("{} is not numeric", right)))?;
    Ok(Primary::Float(float_arithmetic(a.op, l, r)))
}

fn integer_arithmetic(op: ArithmeticOperator, l: i64, r: i64) -> EvalResult<i64> {
    match op {
        ArithmeticOperator::Add => Ok(l.wrapping_add(r)),
        ArithmeticOperator::Subtract => Ok(l.wrapping_sub(r)),
        ArithmeticOperator::Multiply => Ok(l.wrapping_mul(r)),
        ArithmeticOperator::Modulo => {
            if r == 0 {
                Err(EvalError::type_error("modulo by zero"))
            } else {
                Ok(l % r)
            }
        }
        ArithmeticOperator::Divide => unreachable!("divide always uses float arithmetic"),
    }
}

fn float_arithmetic(op: ArithmeticOperator, l: f64, r: f64) -> f64 {
    match op {
        ArithmeticOperator::Add => l + r,
        ArithmeticOperator::Subtract => l - r,
        ArithmeticOperator::Multiply => l * r,
        ArithmeticOperator::Divide => l / r,
        ArithmeticOperator::Modulo => l % r,
    }
}

fn eval_unary_arithmetic(u: &UnaryArithmetic, row: &RowContext<'_>, env: &EvalEnv<'_>) -> EvalResult<Primary> {
    let operand = eval(&u.operand, row, env)?;
    if operand.is_null() {
        return Ok(Primary::Null);
    }
    if !u.negative {
        return Ok(operand);
    }
    match operand {
        Primary::Integer(n) => Ok(Primary::Integer(-n)),
        other => {
            let f = other
                .try_to_float()
                .ok_or_else(|| EvalError::type_error(format!("{} is not numeric", other)))?;
            Ok(Primary::Float(-f))
        }
    }
}

fn eval_concat(c: &Concat, row: &RowContext<'_>, env: &EvalEnv<'_>) -> EvalResult<Primary> {
    let mut out = String::new();
    for item in &c.items {
        let v = eval(item, row, env)?;
        if v.is_null() {
            return Ok(Primary::Null);
        }
        out.push_str(&v.to_display_string());
    }
    Ok(Primary::String(out))
}

fn eval_comparison(c: &Comparison, row: &RowContext<'_>, env: &EvalEnv<'_>) -> EvalResult<Ternary> {
    let left = eval(&c.left, row, env)?;
    let right = eval(&c.right, row, env)?;
    Ok(dispatch_comparison(c.op, &left, &right))
}

fn dispatch_comparison(op: ComparisonOperator, left: &Primary, right: &Primary) -> Ternary {
    match op {
        ComparisonOperator::Equal => csvq_value::equal_to(left, right),
        ComparisonOperator::NotEqual => csvq_value::not_equal_to(left, right),
        ComparisonOperator::Less => csvq_value::less_than(left, right),
        ComparisonOperator::Greater => csvq_value::greater_than(left, right),
        ComparisonOperator::LessOrEqual => csvq_value::less_than_or_equal(left, right),
        ComparisonOperator::GreaterOrEqual => csvq_value::greater_than_or_equal(left, right),
    }
}

fn eval_is(is: &Is, row: &RowContext<'_>, env: &EvalEnv<'_>) -> EvalResult<Ternary> {
    let value = eval(&is.expr, row, env)?;
    let target = match is.target {
        IsTarget::Null => Primary::Null,
        IsTarget::True => Primary::Ternary(Ternary::True),
        IsTarget::False => Primary::Ternary(Ternary::False),
        IsTarget::Unknown => Primary::Ternary(Ternary::Unknown),
    };
    let result = csvq_value::is(&value, &target);
    Ok(if is.negated { result.not() } else { result })
}

fn eval_between(b: &Between, row: &RowContext<'_>, env: &EvalEnv<'_>) -> EvalResult<Ternary> {
    let value = eval(&b.expr, row, env)?;
    let low = eval(&b.low, row, env)?;
    let high = eval(&b.high, row, env)?;
    let result = csvq_value::greater_than_or_equal(&value, &low)
        .and(csvq_value::less_than_or_equal(&value, &high));
    Ok(if b.negated { result.not() } else { result })
}

fn eval_in(i: &In, row: &RowContext<'_>, env: &EvalEnv<'_>) -> EvalResult<Ternary> {
    let value = eval(&i.expr, row, env)?;
    let list = eval_in_list(&i.list, row, env)?;
    let result = in_list_membership(&value, &list);
    Ok(if i.negated { result.not() } else { result })
}

fn eval_in_list(list: &InList, row: &RowContext<'_>, env: &EvalEnv<'_>) -> EvalResult<Vec<Primary>> {
    match list {
        InList::Values(values) => values.iter().map(|v| eval(v, row, env)).collect(),
        InList::Subquery(query) => {
            let runner = env
                .subqueries
                .ok_or_else(|| EvalError::semantic("subquery IN-lists require the select pipeline"))?;
            let view = runner.run(query)?;
            if view.header.len() != 1 {
                return Err(EvalError::semantic(
                    "a subquery used as an IN-list must return exactly one column",
                ));
            }
            Ok(view
                .records
                .iter()
                .map(|r| r.value(0).cloned().unwrap_or(Primary::Null))
                .collect())
        }
    }
}

/// SQL `IN` NULL handling: `TRUE` on a match, `FALSE` only when every
/// comparison definitively failed, `UNKNOWN` if any comparison was
/// incommensurable (typically due to a `NULL` in the list) and none matched.
fn in_list_membership(value: &Primary, list: &[Primary]) -> Ternary {
    let mut saw_unknown = false;
    for item in list {
        match csvq_value::equal_to(value, item) {
            Ternary::True => return Ternary::True,
            Ternary::Unknown => saw_unknown = true,
            Ternary::False => {}
        }
    }
    if saw_unknown {
        Ternary::Unknown
    } else {
        Ternary::False
    }
}

fn eval_all(a: &All, row: &RowContext<'_>, env: &EvalEnv<'_>) -> EvalResult<Ternary> {
    let value = eval(&a.expr, row, env)?;
    let list = eval_in_list(&a.list, row, env)?;
    let mut saw_unknown = false;
    for item in &list {
        match dispatch_comparison(a.op, &value, item) {
            Ternary::True => {}
            Ternary::False => return Ok(Ternary::False),
            Ternary::Unknown => saw_unknown = true,
        }
    }
    Ok(if saw_unknown { Ternary::Unknown } else { Ternary::True })
}

fn eval_any(a: &Any, row: &RowContext<'_>, env: &EvalEnv<'_>) -> EvalResult<Ternary> {
    let value = eval(&a.expr, row, env)?;
    let list = eval_in_list(&a.list, row, env)?;
    let mut saw_unknown = false;
    for item in &list {
        match dispatch_comparison(a.op, &value, item) {
            Ternary::True => return Ok(Ternary::True),
            Ternary::False => {}
            Ternary::Unknown => saw_unknown = true,
        }
    }
    Ok(if saw_unknown { Ternary::Unknown } else { Ternary::False })
}

fn eval_like(l: &Like, row: &RowContext<'_>, env: &EvalEnv<'_>) -> EvalResult<Ternary> {
    let subject = eval(&l.expr, row, env)?;
    let pattern = eval(&l.pattern, row, env)?;
    let result = csvq_value::like(&subject, &pattern);
    Ok(if l.negated { result.not() } else { result })
}

fn eval_exists(e: &Exists, env: &EvalEnv<'_>) -> EvalResult<Ternary> {
    let runner = env
        .subqueries
        .ok_or_else(|| EvalError::semantic("EXISTS requires the select pipeline to run the subquery"))?;
    let exists = runner.run(&e.subquery)?.row_count() > 0;
    Ok(Ternary::from_bool(if e.negated { !exists } else { exists }))
}

fn eval_logic(l: &Logic, row: &RowContext<'_>, env: &EvalEnv<'_>) -> EvalResult<Ternary> {
    let left = eval(&l.left, row, env)?.to_ternary();
    let right = eval(&l.right, row, env)?.to_ternary();
    Ok(match l.op {
        LogicOperator::And => left.and(right),
        LogicOperator::Or => left.or(right),
        LogicOperator::Xor => left.xor(right),
    })
}

fn eval_unary_logic(u: &UnaryLogic, row: &RowContext<'_>, env: &EvalEnv<'_>) -> EvalResult<Ternary> {
    Ok(eval(&u.operand, row, env)?.to_ternary().not())
}

fn eval_case(c: &CaseExpr, row: &RowContext<'_>, env: &EvalEnv<'_>) -> EvalResult<Primary> {
    let operand = match &c.operand {
        Some(expr) => Some(eval(expr, row, env)?),
        None => None,
    };
    for (cond, result) in &c.when_then {
        let matched = match &operand {
            Some(operand) => csvq_value::equal_to(operand, &eval(cond, row, env)?).is_true(),
            None => eval(cond, row, env)?.to_ternary().is_true(),
        };
        if matched {
            return eval(result, row, env);
        }
    }
    match &c.else_result {
        Some(expr) => eval(expr, row, env),
        None => Ok(Primary::Null),
    }
}

/// Orders two records by a list of sort keys, used by `ORDER BY` and by
/// window-function ordering within a partition. `nulls_first` defaults to
/// `true` for ascending keys and `false` for descending, per the spec.
pub fn compare_by_keys(keys: &[(Primary, Primary, bool, bool)]) -> Ordering {
    for (va, vb, desc, nulls_first) in keys {
        let ord = match (va.is_null(), vb.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => {
                if *nulls_first {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
            (false, true) => {
                if *nulls_first {
                    Ordering::Greater
                } else {
                    Ordering::Less
                }
            }
            (false, false) => match csvq_value::compare(va, vb) {
                csvq_value::CompareResult::Equal => Ordering::Equal,
                csvq_value::CompareResult::Less => Ordering::Less,
                csvq_value::CompareResult::Greater => Ordering::Greater,
                _ => Ordering::Equal,
            },
        };
        let ord = if *desc { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{ColumnIdentity, Header};
    use csvq_ast::location::Location;
    use csvq_ast::literal::PrimitiveType;

    fn env<'a>(flags: &'a Flags, cancel: &'a CancellationContext, scope: &'a ScopeChain) -> EvalEnv<'a> {
        EvalEnv {
            flags,
            cancel,
            scope,
            group: None,
            subqueries: None,
            user_functions: None,
        }
    }

    fn lit(p: Primary) -> QueryExpression {
        QueryExpression::Primitive(PrimitiveType::new(p, Location::synthetic()))
    }

    #[test]
    fn integer_plus_null_is_null_s1() {
        let flags = Flags::default();
        let cancel = CancellationContext::new();
        let scope = ScopeChain::new();
        let e = env(&flags, &cancel, &scope);
        let header = Header::default();
        let record = Record::new(vec![]);
        let row = RowContext {
            header: &header,
            record: &record,
        };
        let expr = QueryExpression::Arithmetic(Box::new(Arithmetic {
            left: lit(Primary::Integer(1)),
            op: ArithmeticOperator::Add,
            right: lit(Primary::Null),
            location: Location::synthetic(),
        }));
        assert_eq!(eval(&expr, &row, &e).unwrap(), Primary::Null);
    }

    #[test]
    fn in_list_is_unknown_when_null_present_and_nothing_matches() {
        let values = vec![Primary::Integer(1), Primary::Null];
        assert_eq!(
            in_list_membership(&Primary::Integer(2), &values),
            Ternary::Unknown
        );
        assert_eq!(
            in_list_membership(&Primary::Integer(1), &values),
            Ternary::True
        );
    }
}
