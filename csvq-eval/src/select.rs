use std::collections::BTreeMap;

use csvq_ast::query::{
    From, Join, JoinCondition, JoinKind, SelectEntity, SelectItem, SelectSet, SetOperation,
    SetOperator, SortSpec, TableFactor, TableReference,
};
use csvq_ast::{Identifier, SelectQuery};
use csvq_value::Primary;
use log::{debug, trace, warn};

use crate::config::Flags;
use crate::context::CancellationContext;
use crate::error::{EvalError, EvalResult};
use crate::eval::{compare_by_keys, eval, EvalEnv, GroupContext, RowContext};
use crate::functions;
use crate::groupkey::GroupKey;
use crate::scope::ScopeChain;
use crate::table::TableLoader;
use crate::view::{Cell, ColumnIdentity, Header, Record, View};

/// Everything the SELECT pipeline needs beyond the scope chain: session
/// flags, the cancellation context, and the external table loader.
pub struct SelectContext<'a> {
    pub flags: &'a Flags,
    pub cancel: &'a CancellationContext,
    pub loader: &'a dyn TableLoader,
}

/// Bridges [`eval`]'s generic expression evaluation to the select pipeline
/// so `EXISTS`, scalar subqueries, and `IN (subquery)` can run a full
/// `SelectQuery`, and so a call to a user-declared function or aggregate can
/// run its procedural body. Subqueries and function bodies are evaluated
/// against a forked copy of the scope they were reached from: they see the
/// enclosing query's variables and inline/temp tables but not its outer
/// columns, and `crate::exec` owns the actual statement interpretation.
struct SubqueryEvaluator<'s, 'c> {
    ctx: &'s SelectContext<'c>,
    scope: &'s ScopeChain,
}

impl<'s, 'c> crate::eval::SubqueryRunner for SubqueryEvaluator<'s, 'c> {
    fn run(&self, query: &SelectQuery) -> EvalResult<View> {
        let mut forked = self.scope.fork();
        eval_select_query(query, &mut forked, self.ctx)
    }
}

impl<'s, 'c> crate::eval::FunctionRunner for SubqueryEvaluator<'s, 'c> {
    fn call_function(
        &self,
        decl: &csvq_ast::statement::FunctionDeclaration,
        args: &[Primary],
    ) -> EvalResult<Primary> {
        crate::exec::run_function(decl, args, self.scope, self.ctx)
    }

    fn call_aggregate(
        &self,
        decl: &csvq_ast::statement::AggregateDeclaration,
        values: &[Primary],
    ) -> EvalResult<Primary> {
        crate::exec::run_aggregate(decl, values, self.scope, self.ctx)
    }
}

/// Runs a complete `SelectQuery`: `WITH` installs inline tables into
/// `scope`, the body is evaluated to a [`View`], then `ORDER BY`/`LIMIT`/
/// `OFFSET` are applied.
pub fn eval_select_query(
    query: &SelectQuery,
    scope: &mut ScopeChain,
    ctx: &SelectContext<'_>,
) -> EvalResult<View> {
    let marker = scope.push();
    let result = (|| {
        if let Some(with) = &query.with {
            for cte in &with.ctes {
                ctx.cancel.check()?;
                let view = if with.recursive {
                    eval_recursive_cte(&cte.name.value, &cte.columns, &cte.query, scope, ctx)?
                } else {
                    let view = eval_select_query(&cte.query, scope, ctx)?;
                    rename_cte_columns(&cte.name.value, &cte.columns, view)?
                };
                scope.declare_inline_table(&cte.name.value, view);
            }
        }

        let mut view = eval_select_set(&query.body, scope, ctx)?;
        apply_order_by(&mut view, &query.order_by, scope, ctx)?;
        apply_limit_offset(&mut view, query, scope, ctx)?;
        Ok(view)
    })();
    scope.pop(marker);
    result
}

/// Renames a materialized view's header to an explicit `name(columns)` list,
/// the way `DECLARE TABLE` renames its result in `exec::exec_table_declaration`.
fn rename_cte_columns(name: &str, columns: &[Identifier], view: View) -> EvalResult<View> {
    if columns.is_empty() {
        return Ok(view);
    }
    if columns.len() != view.header.len() {
        return Err(EvalError::semantic(format!(
            "common table expression {} declares {} columns but its query returns {}",
            name,
            columns.len(),
            view.header.len()
        )));
    }
    let header = Header::new(
        columns
            .iter()
            .map(|c| ColumnIdentity::new(Some(name.to_string()), c.value.clone()))
            .collect(),
    );
    View::new(header, view.records)
}

/// Evaluates the seed member once, then re-runs the recursive member against
/// only the *previous iteration's new rows* (the working table), stopping
/// once an iteration contributes no rows not already in the accumulated
/// result. Feeding the whole accumulated table back in, rather than just the
/// delta, would never terminate: rows that keep satisfying the recursive
/// member's predicate would keep being re-derived forever.
fn eval_recursive_cte(
    name: &str,
    columns: &[Identifier],
    query: &SelectQuery,
    scope: &mut ScopeChain,
    ctx: &SelectContext<'_>,
) -> EvalResult<View> {
    let (seed, recursive_arm) = match &query.body {
        SelectSet::SetOperation(op) if op.op == SetOperator::UnionAll || op.op == SetOperator::Union => {
            (op.left.clone(), Some((op.op, op.right.clone())))
        }
        other => (other.clone(), None),
    };

    let seed_view = eval_select_set(&seed, scope, ctx)?;
    let mut accumulated = rename_cte_columns(name, columns, seed_view)?;
    let (op, recursive_body) = match recursive_arm {
        Some(v) => v,
        None => return Ok(accumulated),
    };

    let mut working = accumulated.clone();
    let mut seen: Vec<GroupKey> = accumulated.records.iter().map(row_key).collect();

    while !working.records.is_empty() {
        ctx.cancel.check()?;
        scope.declare_inline_table(name, working.clone());
        let next = eval_select_set(&recursive_body, scope, ctx)?;
        let next = rename_cte_columns(name, columns, next)?;

        let mut delta = View {
            header: next.header,
            records: Vec::new(),
        };
        for record in next.records {
            if op == SetOperator::Union {
                let key = row_key(&record);
                if seen.contains(&key) {
                    continue;
                }
                seen.push(key);
            }
            delta.records.push(record);
        }

        accumulated.records.extend(delta.records.clone());
        working = delta;
    }

    Ok(accumulated)
}

fn eval_select_set(set: &SelectSet, scope: &mut ScopeChain, ctx: &SelectContext<'_>) -> EvalResult<View> {
    ctx.cancel.check()?;
    match set {
        SelectSet::Entity(entity) => eval_select_entity(entity, scope, ctx),
        SelectSet::Paren(query) => eval_select_query(query, scope, ctx),
        SelectSet::SetOperation(op) => eval_set_operation(op, scope, ctx),
    }
}

fn eval_set_operation(op: &SetOperation, scope: &mut ScopeChain, ctx: &SelectContext<'_>) -> EvalResult<View> {
    let left = eval_select_set(&op.left, scope, ctx)?;
    let right = eval_select_set(&op.right, scope, ctx)?;
    if left.header.len() != right.header.len() {
        return Err(EvalError::semantic(
            "set operation operands do not have the same number of columns",
        ));
    }

    let mut out = View {
        header: left.header.clone(),
        records: left.records,
    };
    match op.op {
        SetOperator::Union => {
            out.records.extend(right.records);
            dedup_view(&mut out);
        }
        SetOperator::UnionAll => {
            out.records.extend(right.records);
        }
        SetOperator::Intersect => {
            let right_keys: Vec<GroupKey> = right.records.iter().map(row_key).collect();
            out.records.retain(|r| right_keys.contains(&row_key(r)));
            dedup_view(&mut out);
        }
        SetOperator::IntersectAll => {
            let mut right_counts = count_keys(&right.records);
            out.records.retain(|r| {
                let key = row_key(r);
                match right_counts.get_mut(&key) {
                    Some(count) if *count > 0 => {
                        *count -= 1;
                        true
                    }
                    _ => false,
                }
            });
        }
        SetOperator::Except => {
            let right_keys: Vec<GroupKey> = right.records.iter().map(row_key).collect();
            out.records.retain(|r| !right_keys.contains(&row_key(r)));
            dedup_view(&mut out);
        }
        SetOperator::ExceptAll => {
            let mut right_counts = count_keys(&right.records);
            out.records.retain(|r| {
                let key = row_key(r);
                match right_counts.get_mut(&key) {
                    Some(count) if *count > 0 => {
                        *count -= 1;
                        false
                    }
                    _ => true,
                }
            });
        }
    }
    Ok(out)
}

/// Counts each record's occurrences by [`GroupKey`], for multiset `INTERSECT
/// ALL`/`EXCEPT ALL` retain/subtract logic.
fn count_keys(records: &[Record]) -> BTreeMap<GroupKey, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(row_key(record)).or_insert(0usize) += 1;
    }
    counts
}

fn row_key(record: &Record) -> GroupKey {
    GroupKey::new(record.cells().iter().map(|c| c.value.clone()).collect())
}

fn dedup_view(view: &mut View) {
    let mut seen: Vec<GroupKey> = Vec::new();
    view.records.retain(|r| {
        let k = row_key(r);
        if seen.contains(&k) {
            false
        } else {
            seen.push(k);
            true
        }
    });
}

fn eval_select_entity(entity: &SelectEntity, scope: &mut ScopeChain, ctx: &SelectContext<'_>) -> EvalResult<View> {
    let source = match &entity.from {
        Some(from) => eval_from(from, scope, ctx)?,
        None => View::dual(),
    };

    let has_aggregate = entity.projection.iter().any(|item| contains_aggregate(&item.expr))
        || entity.having.as_ref().is_some_and(contains_aggregate);

    let filtered = apply_where(source, &entity.filter, scope, ctx)?;
    let groups = apply_group_by(filtered, &entity.group_by, has_aggregate, scope, ctx)?;
    let groups = apply_having(groups, &entity.having, scope, ctx)?;
    let mut projected = project(&groups, &entity.projection, scope, ctx)?;
    apply_window_functions(&mut projected, &groups, &entity.projection, scope, ctx)?;
    if entity.distinct {
        dedup_view(&mut projected);
    }
    Ok(projected)
}

/// Whether `expr` calls an aggregate anywhere a non-aggregate SELECT with no
/// `GROUP BY` would otherwise need one row per input record. Subqueries and
/// analytic functions have their own, independent evaluation scope, so their
/// insides never force the enclosing query to collapse to a single group.
fn contains_aggregate(expr: &csvq_ast::QueryExpression) -> bool {
    use csvq_ast::QueryExpression as E;
    match expr {
        E::AggregateFunction(_) | E::ListAgg(_) => true,
        E::Primitive(_)
        | E::Identifier(_)
        | E::FieldReference(_)
        | E::ColumnNumber(_)
        | E::Variable(_)
        | E::AllColumns(_)
        | E::AnalyticFunction(_)
        | E::Subquery(_) => false,
        E::Arithmetic(e) => contains_aggregate(&e.left) || contains_aggregate(&e.right),
        E::UnaryArithmetic(e) => contains_aggregate(&e.operand),
        E::Concat(e) => e.items.iter().any(contains_aggregate),
        E::Comparison(e) => contains_aggregate(&e.left) || contains_aggregate(&e.right),
        E::Is(e) => contains_aggregate(&e.expr),
        E::Between(e) => contains_aggregate(&e.expr) || contains_aggregate(&e.low) || contains_aggregate(&e.high),
        E::In(e) => contains_aggregate(&e.expr) || in_list_contains_aggregate(&e.list),
        E::All(e) => contains_aggregate(&e.expr) || in_list_contains_aggregate(&e.list),
        E::Any(e) => contains_aggregate(&e.expr) || in_list_contains_aggregate(&e.list),
        E::Like(e) => contains_aggregate(&e.expr) || contains_aggregate(&e.pattern),
        E::Exists(_) => false,
        E::Logic(e) => contains_aggregate(&e.left) || contains_aggregate(&e.right),
        E::UnaryLogic(e) => contains_aggregate(&e.operand),
        E::Case(e) => {
            e.operand.as_deref().is_some_and(contains_aggregate)
                || e
                    .when_then
                    .iter()
                    .any(|(when, then)| contains_aggregate(when) || contains_aggregate(then))
                || e.else_result.as_deref().is_some_and(contains_aggregate)
        }
        E::Function(e) => e.args.iter().any(contains_aggregate),
    }
}

fn in_list_contains_aggregate(list: &csvq_ast::expr::InList) -> bool {
    match list {
        csvq_ast::expr::InList::Values(items) => items.iter().any(contains_aggregate),
        csvq_ast::expr::InList::Subquery(_) => false,
    }
}

// ---------------------------------------------------------------------
// FROM / JOIN
// ---------------------------------------------------------------------

fn eval_from(from: &From, scope: &mut ScopeChain, ctx: &SelectContext<'_>) -> EvalResult<View> {
    let mut views = Vec::with_capacity(from.references.len());
    for reference in &from.references {
        views.push(eval_table_reference(reference, scope, ctx)?);
    }
    let mut iter = views.into_iter();
    let mut result = iter.next().unwrap_or_else(View::dual);
    for next in iter {
        result = cross_join(result, next)?;
    }
    Ok(result)
}

fn eval_table_reference(reference: &TableReference, scope: &mut ScopeChain, ctx: &SelectContext<'_>) -> EvalResult<View> {
    let mut view = eval_table_factor(&reference.factor, scope, ctx)?;
    for join in &reference.joins {
        let right = eval_table_factor(&join.factor, scope, ctx)?;
        view = apply_join(view, right, join, scope, ctx)?;
    }
    Ok(view)
}

fn eval_table_factor(factor: &TableFactor, scope: &mut ScopeChain, ctx: &SelectContext<'_>) -> EvalResult<View> {
    match factor {
        TableFactor::Table(table_name) => {
            debug!("loading table {}", table_name.name.value);
            let alias = table_name
                .alias
                .as_ref()
                .map(|a| a.value.clone())
                .unwrap_or_else(|| table_name.name.value.clone());
            if let Some(view) = scope.inline_table(&table_name.name.value).cloned() {
                return Ok(rename_view(view, &alias));
            }
            if let Some(view) = scope.temp_table(&table_name.name.value).cloned() {
                return Ok(rename_view(view, &alias));
            }
            let (view, _origin) = ctx.loader.load(&table_name.name.value, ctx.flags)?;
            Ok(rename_view(view, &alias))
        }
        TableFactor::Subquery(subquery) => {
            let view = eval_select_query(&subquery.query, scope, ctx)?;
            Ok(rename_view(view, &subquery.alias.value))
        }
        TableFactor::Cursor(cursor_ref) => {
            let view = scope.cursor(&cursor_ref.name.value)?.snapshot()?;
            let alias = cursor_ref
                .alias
                .as_ref()
                .map(|a| a.value.clone())
                .unwrap_or_else(|| cursor_ref.name.value.clone());
            Ok(rename_view(view, &alias))
        }
        TableFactor::Stdin(alias) => {
            let view = View::dual();
            Ok(rename_view(
                view,
                &alias.as_ref().map(|a| a.value.clone()).unwrap_or_else(|| "STDIN".to_string()),
            ))
        }
        TableFactor::Paren(inner) => eval_table_reference(inner, scope, ctx),
    }
}

fn rename_view(mut view: View, alias: &str) -> View {
    let columns = view
        .header
        .columns()
        .iter()
        .map(|c| ColumnIdentity {
            view_name: Some(alias.to_string()),
            column_name: c.column_name.clone(),
            is_from_table: c.is_from_table,
        })
        .collect();
    view.header = Header::new(columns);
    view
}

fn cross_join(left: View, right: View) -> EvalResult<View> {
    let header = left.header.clone().merge(right.header.clone(), &[]);
    let mut records = Vec::with_capacity(left.records.len() * right.records.len().max(1));
    for l in &left.records {
        for r in &right.records {
            let mut cells = l.cells().to_vec();
            cells.extend(r.cells().to_vec());
            records.push(Record::new(cells));
        }
    }
    View::new(header, records)
}

fn apply_join(left: View, right: View, join: &Join, scope: &mut ScopeChain, ctx: &SelectContext<'_>) -> EvalResult<View> {
    if join.kind == JoinKind::Cross {
        return cross_join(left, right);
    }

    let using: Vec<String> = if join.natural {
        let shared = left.header.shared_column_names(&right.header);
        if shared.is_empty() {
            warn!("NATURAL JOIN found no shared columns, degrading to CROSS JOIN");
        }
        shared
    } else {
        match &join.condition {
            Some(JoinCondition::Using(cols)) => cols.iter().map(|c| c.value.clone()).collect(),
            _ => Vec::new(),
        }
    };

    let header = left.header.clone().merge(right.header.clone(), &using);
    let mut records = Vec::new();
    let mut right_matched = vec![false; right.records.len()];

    for l in &left.records {
        let mut matched_any = false;
        for (ri, r) in right.records.iter().enumerate() {
            ctx.cancel.check()?;
            let matches = row_join_matches(l, r, &left.header, &right.header, join, &using, scope, ctx)?;
            if matches {
                matched_any = true;
                right_matched[ri] = true;
                records.push(join_record(l, r, &right.header, &using));
            }
        }
        if !matched_any && matches!(join.kind, JoinKind::Left | JoinKind::Full) {
            records.push(join_record_with_null_right(l, &right.header, &using));
        }
    }

    if matches!(join.kind, JoinKind::Right | JoinKind::Full) {
        for (ri, r) in right.records.iter().enumerate() {
            if !right_matched[ri] {
                records.push(join_record_with_null_left(r, left.header.len(), &right.header, &using));
            }
        }
    }

    View::new(header, records)
}

fn row_join_matches(
    l: &Record,
    r: &Record,
    left_header: &Header,
    right_header: &Header,
    join: &Join,
    using: &[String],
    scope: &ScopeChain,
    ctx: &SelectContext<'_>,
) -> EvalResult<bool> {
    if !using.is_empty() {
        for name in using {
            let li = left_header.resolve(name)?;
            let ri = right_header.resolve(name)?;
            let lv = l.value(li).cloned().unwrap_or(Primary::Null);
            let rv = r.value(ri).cloned().unwrap_or(Primary::Null);
            if !csvq_value::equivalent_to(&lv, &rv).is_true() {
                return Ok(false);
            }
        }
        return Ok(true);
    }

    match &join.condition {
        Some(JoinCondition::On(expr)) => {
            let mut cells = l.cells().to_vec();
            cells.extend(r.cells().to_vec());
            let combined_header = left_header.clone().merge(right_header.clone(), &[]);
            let combined_record = Record::new(cells);
            let flags = ctx.flags;
            let subq = SubqueryEvaluator { ctx, scope };
            let env = EvalEnv {
                flags,
                cancel: ctx.cancel,
                scope,
                group: None,
                subqueries: Some(&subq),
                user_functions: Some(&subq),
            };
            let row = RowContext {
                header: &combined_header,
                record: &combined_record,
            };
            Ok(eval(expr, &row, &env)?.to_ternary().is_true())
        }
        _ => Ok(true),
    }
}

/// `r`'s cells excluding those whose column is coalesced away by `USING`.
fn right_non_shared_cells(r: &Record, right_header: &Header, using: &[String]) -> Vec<Cell> {
    r.cells()
        .iter()
        .enumerate()
        .filter(|(i, _)| {
            let name = &right_header.columns()[*i].column_name;
            !using.iter().any(|u| u.eq_ignore_ascii_case(name))
        })
        .map(|(_, c)| c.clone())
        .collect()
}

fn join_record(l: &Record, r: &Record, right_header: &Header, using: &[String]) -> Record {
    let mut cells = l.cells().to_vec();
    cells.extend(right_non_shared_cells(r, right_header, using));
    Record::new(cells)
}

fn join_record_with_null_right(l: &Record, right_header: &Header, using: &[String]) -> Record {
    let mut cells = l.cells().to_vec();
    let missing = right_header.len() - using.len();
    cells.extend((0..missing).map(|_| Cell::new(Primary::Null)));
    Record::new(cells)
}

fn join_record_with_null_left(r: &Record, left_len: usize, right_header: &Header, using: &[String]) -> Record {
    let mut cells: Vec<Cell> = (0..left_len).map(|_| Cell::new(Primary::Null)).collect();
    cells.extend(right_non_shared_cells(r, right_header, using));
    Record::new(cells)
}

// ---------------------------------------------------------------------
// WHERE / GROUP BY / HAVING
// ---------------------------------------------------------------------

fn apply_where(
    view: View,
    filter: &Option<csvq_ast::QueryExpression>,
    scope: &ScopeChain,
    ctx: &SelectContext<'_>,
) -> EvalResult<View> {
    let Some(filter) = filter else { return Ok(view) };
    let subq = SubqueryEvaluator { ctx, scope };
    let env = EvalEnv {
        flags: ctx.flags,
        cancel: ctx.cancel,
        scope,
        group: None,
        subqueries: Some(&subq),
        user_functions: Some(&subq),
    };
    let mut records = Vec::new();
    for record in view.records {
        ctx.cancel.check()?;
        let row = RowContext {
            header: &view.header,
            record: &record,
        };
        trace!("evaluating WHERE against a row");
        if eval(filter, &row, &env)?.to_ternary().is_true() {
            records.push(record);
        }
    }
    Ok(View { header: view.header, records })
}

/// The grouped view passed between GROUP BY/HAVING/project: one group per
/// distinct `GroupKey` when `GROUP BY` is present; without it, one group
/// per row, unless the projection or HAVING calls an aggregate, in which
/// case the whole table collapses to a single implicit group (the same
/// rule an aggregate with no `GROUP BY` follows in ordinary SQL).
struct Grouped {
    header: Header,
    groups: Vec<Vec<Record>>,
}

fn apply_group_by(
    view: View,
    group_by: &[csvq_ast::QueryExpression],
    has_aggregate: bool,
    scope: &ScopeChain,
    ctx: &SelectContext<'_>,
) -> EvalResult<Grouped> {
    if group_by.is_empty() {
        let groups = if view.records.is_empty() {
            vec![]
        } else if has_aggregate {
            vec![view.records]
        } else {
            view.records.into_iter().map(|r| vec![r]).collect()
        };
        return Ok(Grouped {
            header: view.header,
            groups,
        });
    }

    let subq = SubqueryEvaluator { ctx, scope };
    let env = EvalEnv {
        flags: ctx.flags,
        cancel: ctx.cancel,
        scope,
        group: None,
        subqueries: Some(&subq),
        user_functions: Some(&subq),
    };
    let mut buckets: BTreeMap<GroupKey, Vec<Record>> = BTreeMap::new();
    let mut order: Vec<GroupKey> = Vec::new();
    for record in view.records {
        ctx.cancel.check()?;
        let row = RowContext {
            header: &view.header,
            record: &record,
        };
        let mut key_values = Vec::with_capacity(group_by.len());
        for expr in group_by {
            key_values.push(eval(expr, &row, &env)?);
        }
        let key = GroupKey::new(key_values);
        if !buckets.contains_key(&key) {
            order.push(key.clone());
        }
        buckets.entry(key).or_default().push(record);
    }
    let groups = order
        .into_iter()
        .map(|k| buckets.remove(&k).unwrap_or_default())
        .collect();
    Ok(Grouped {
        header: view.header,
        groups,
    })
}

fn apply_having(
    grouped: Grouped,
    having: &Option<csvq_ast::QueryExpression>,
    scope: &ScopeChain,
    ctx: &SelectContext<'_>,
) -> EvalResult<Grouped> {
    let Some(having) = having else { return Ok(grouped) };
    let mut kept = Vec::new();
    for group in grouped.groups {
        ctx.cancel.check()?;
        let representative = group.first().cloned().unwrap_or_default();
        let subq = SubqueryEvaluator { ctx, scope };
        let env = EvalEnv {
            flags: ctx.flags,
            cancel: ctx.cancel,
            scope,
            group: Some(GroupContext {
                header: &grouped.header,
                rows: &group,
            }),
            subqueries: Some(&subq),
            user_functions: Some(&subq),
        };
        let row = RowContext {
            header: &grouped.header,
            record: &representative,
        };
        if eval(having, &row, &env)?.to_ternary().is_true() {
            kept.push(group);
        }
    }
    Ok(Grouped {
        header: grouped.header,
        groups: kept,
    })
}

// ---------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------

fn project(grouped: &Grouped, items: &[SelectItem], scope: &ScopeChain, ctx: &SelectContext<'_>) -> EvalResult<View> {
    let mut out_header = Vec::new();
    let mut resolved_items: Vec<(&SelectItem, Vec<usize>)> = Vec::new();
    for item in items {
        match &item.expr {
            csvq_ast::QueryExpression::AllColumns(all) => {
                let indices = match &all.table {
                    Some(table) => grouped.header.indices_for_table(&table.value),
                    None => (0..grouped.header.len()).collect(),
                };
                for &i in &indices {
                    out_header.push(grouped.header.columns()[i].clone());
                }
                resolved_items.push((item, indices));
            }
            _ => {
                let name = item
                    .alias
                    .as_ref()
                    .map(|a| a.value.clone())
                    .unwrap_or_else(|| item.expr.to_string());
                out_header.push(ColumnIdentity::computed(name));
                resolved_items.push((item, vec![]));
            }
        }
    }

    let mut records = Vec::with_capacity(grouped.groups.len());
    for group in &grouped.groups {
        ctx.cancel.check()?;
        let representative = group.first().cloned().unwrap_or_default();
        let subq = SubqueryEvaluator { ctx, scope };
        let env = EvalEnv {
            flags: ctx.flags,
            cancel: ctx.cancel,
            scope,
            group: Some(GroupContext {
                header: &grouped.header,
                rows: group,
            }),
            subqueries: Some(&subq),
            user_functions: Some(&subq),
        };
        let row = RowContext {
            header: &grouped.header,
            record: &representative,
        };

        let mut cells = Vec::new();
        for (item, indices) in &resolved_items {
            if matches!(item.expr, csvq_ast::QueryExpression::AllColumns(_)) {
                for &i in indices {
                    cells.push(representative.get(i).cloned().unwrap_or_else(|| Cell::new(Primary::Null)));
                }
            } else {
                let value = eval(&item.expr, &row, &env)?;
                cells.push(aggregate_cell(&item.expr, value, group, &grouped.header, &env));
            }
        }
        records.push(Record::new(cells));
    }

    View::new(Header::new(out_header), records)
}

// ---------------------------------------------------------------------
// Window functions
// ---------------------------------------------------------------------

/// Evaluates `OVER (...)` calls that sit directly as a top-level projected
/// expression. `view`'s records line up 1:1 with `grouped.groups` (the same
/// correspondence `project` relies on), so a window call's argument,
/// `PARTITION BY`, and `ORDER BY` are resolved against each group's
/// representative row.
///
/// Runs after `project` and before `DISTINCT`: `DISTINCT` can drop rows,
/// which would break the positional correspondence to `grouped.groups` this
/// function depends on. Evaluating window calls first and letting `DISTINCT`
/// dedup their output matches what every other engine observes in practice,
/// since a `DISTINCT` over a window column is rare and the window value
/// itself is computed the same way regardless of row order in the final
/// output.
///
/// There is no frame clause (`ROWS`/`RANGE`) to resolve against — the parsed
/// tree carries only `PARTITION BY`/`ORDER BY` — so aggregate-style calls
/// (`SUM(x) OVER (...)`) run over the whole partition rather than a bounded
/// window, and `FIRST_VALUE`/`LAST_VALUE` mean the partition's first/last row
/// under its `ORDER BY`. Nested analytic calls (an `OVER` expression buried
/// inside another expression) are not resolved; only a direct `SelectItem`
/// expression is recognized here.
fn apply_window_functions(
    view: &mut View,
    grouped: &Grouped,
    items: &[SelectItem],
    scope: &ScopeChain,
    ctx: &SelectContext<'_>,
) -> EvalResult<()> {
    let mut window_items: Vec<(usize, &csvq_ast::expr::AnalyticFunction)> = Vec::new();
    let mut out_idx = 0usize;
    for item in items {
        match &item.expr {
            csvq_ast::QueryExpression::AllColumns(all) => {
                out_idx += match &all.table {
                    Some(table) => grouped.header.indices_for_table(&table.value).len(),
                    None => grouped.header.len(),
                };
            }
            csvq_ast::QueryExpression::AnalyticFunction(af) => {
                window_items.push((out_idx, af.as_ref()));
                out_idx += 1;
            }
            _ => out_idx += 1,
        }
    }
    if window_items.is_empty() {
        return Ok(());
    }

    let representatives: Vec<Record> = grouped
        .groups
        .iter()
        .map(|g| g.first().cloned().unwrap_or_default())
        .collect();

    let subq = SubqueryEvaluator { ctx, scope };
    let env = EvalEnv {
        flags: ctx.flags,
        cancel: ctx.cancel,
        scope,
        group: None,
        subqueries: Some(&subq),
        user_functions: Some(&subq),
    };

    for (out_idx, af) in window_items {
        ctx.cancel.check()?;
        let mut buckets: BTreeMap<GroupKey, Vec<usize>> = BTreeMap::new();
        let mut order: Vec<GroupKey> = Vec::new();
        for (i, rep) in representatives.iter().enumerate() {
            let row = RowContext {
                header: &grouped.header,
                record: rep,
            };
            let mut partition_values = Vec::new();
            if let Some(partition) = &af.over.partition_by {
                for expr in &partition.items {
                    partition_values.push(eval(expr, &row, &env)?);
                }
            }
            let key = GroupKey::new(partition_values);
            if !buckets.contains_key(&key) {
                order.push(key.clone());
            }
            buckets.entry(key).or_default().push(i);
        }

        for key in &order {
            let indices = buckets.remove(key).unwrap_or_default();
            let ordered = order_partition(&indices, &af.over.order_by, &grouped.header, &representatives, &env)?;
            let results = evaluate_analytic(af, &ordered, &grouped.header, &representatives, &env)?;
            for (i, value) in ordered.iter().zip(results) {
                view.records[*i].set(out_idx, Cell::new(value));
            }
        }
    }
    Ok(())
}

/// Sorts a partition's row indices by its `ORDER BY`, stable so ties keep
/// the order they arrived in (the same guarantee `ORDER BY` itself gets from
/// `Vec::sort_by`).
fn order_partition(
    indices: &[usize],
    order_by: &[SortSpec],
    header: &Header,
    representatives: &[Record],
    env: &EvalEnv<'_>,
) -> EvalResult<Vec<usize>> {
    if order_by.is_empty() {
        return Ok(indices.to_vec());
    }
    let mut keyed: Vec<(usize, Vec<Primary>)> = Vec::with_capacity(indices.len());
    for &i in indices {
        let row = RowContext {
            header,
            record: &representatives[i],
        };
        let mut keys = Vec::with_capacity(order_by.len());
        for spec in order_by {
            keys.push(eval(&spec.expr, &row, env)?);
        }
        keyed.push((i, keys));
    }
    keyed.sort_by(|(_, ka), (_, kb)| {
        let pairs: Vec<(Primary, Primary, bool, bool)> = ka
            .iter()
            .zip(kb.iter())
            .zip(order_by.iter())
            .map(|((a, b), spec)| {
                let nulls_first = spec.nulls_first.unwrap_or(!spec.desc);
                (a.clone(), b.clone(), spec.desc, nulls_first)
            })
            .collect();
        compare_by_keys(&pairs)
    });
    Ok(keyed.into_iter().map(|(i, _)| i).collect())
}

/// Dispatches one analytic call over a partition already sorted by its
/// `ORDER BY`, returning one value per entry in `ordered`.
fn evaluate_analytic(
    af: &csvq_ast::expr::AnalyticFunction,
    ordered: &[usize],
    header: &Header,
    representatives: &[Record],
    env: &EvalEnv<'_>,
) -> EvalResult<Vec<Primary>> {
    let name = af.name.value.to_ascii_uppercase();
    let n = ordered.len();

    let arg_value = |pos: usize| -> EvalResult<Primary> {
        match af.args.first() {
            Some(arg) => {
                let row = RowContext {
                    header,
                    record: &representatives[ordered[pos]],
                };
                eval(arg, &row, env)
            }
            None => Ok(Primary::Null),
        }
    };

    match name.as_str() {
        "ROW_NUMBER" => Ok((1..=n as i64).map(Primary::Integer).collect()),
        "RANK" | "DENSE_RANK" => {
            let mut keys = Vec::with_capacity(n);
            for &i in ordered {
                let row = RowContext {
                    header,
                    record: &representatives[i],
                };
                let mut row_keys = Vec::with_capacity(af.over.order_by.len());
                for spec in &af.over.order_by {
                    row_keys.push(eval(&spec.expr, &row, env)?);
                }
                keys.push(row_keys);
            }
            let mut out = Vec::with_capacity(n);
            let mut rank = 1i64;
            let mut dense = 1i64;
            for pos in 0..n {
                if pos > 0 {
                    let tied = GroupKey::new(keys[pos].clone()) == GroupKey::new(keys[pos - 1].clone());
                    if !tied {
                        rank = pos as i64 + 1;
                        dense += 1;
                    }
                }
                out.push(Primary::Integer(if name == "RANK" { rank } else { dense }));
            }
            Ok(out)
        }
        "FIRST_VALUE" => {
            let first = arg_value(0)?;
            Ok(vec![first; n])
        }
        "LAST_VALUE" => {
            let last = arg_value(n.saturating_sub(1))?;
            Ok(vec![last; n])
        }
        "LAG" | "LEAD" => {
            let offset = match af.args.get(1) {
                Some(expr) => match eval(expr, &RowContext { header, record: &representatives[ordered[0]] }, env)? {
                    Primary::Integer(v) => v as i64,
                    _ => 1,
                },
                None => 1,
            };
            let default = match af.args.get(2) {
                Some(expr) => Some(eval(expr, &RowContext { header, record: &representatives[ordered[0]] }, env)?),
                None => None,
            };
            let mut out = Vec::with_capacity(n);
            for pos in 0..n {
                let target = if name == "LAG" {
                    pos as i64 - offset
                } else {
                    pos as i64 + offset
                };
                if target >= 0 && (target as usize) < n {
                    out.push(arg_value(target as usize)?);
                } else {
                    out.push(default.clone().unwrap_or(Primary::Null));
                }
            }
            Ok(out)
        }
        other if functions::is_builtin_aggregate(other) => {
            let mut values = Vec::with_capacity(n);
            for pos in 0..n {
                let value = arg_value(pos)?;
                if !value.is_null() {
                    values.push(value);
                }
            }
            let result = functions::call_aggregate(&name, &values)?;
            Ok(vec![result; n])
        }
        _ => Err(EvalError::semantic(format!("unknown analytic function {}", af.name.value))),
    }
}

/// Attaches source values to the cell of a top-level `AggregateFunction`
/// projection so the view's invariant (a post-aggregation cell backs a
/// value list) holds for directly-projected aggregates.
fn aggregate_cell(
    expr: &csvq_ast::QueryExpression,
    value: Primary,
    group: &[Record],
    header: &Header,
    env: &EvalEnv<'_>,
) -> Cell {
    if let csvq_ast::QueryExpression::AggregateFunction(agg) = expr {
        if functions::is_builtin_aggregate(&agg.name.value) {
            if let Some(arg) = agg.args.first() {
                let sub_env = EvalEnv {
                    flags: env.flags,
                    cancel: env.cancel,
                    scope: env.scope,
                    group: None,
                    subqueries: env.subqueries,
                    user_functions: env.user_functions,
                };
                let sources: Vec<Primary> = group
                    .iter()
                    .filter_map(|r| {
                        let row = RowContext { header, record: r };
                        eval(arg, &row, &sub_env).ok()
                    })
                    .filter(|v| !v.is_null())
                    .collect();
                return Cell::with_sources(value, sources);
            }
        }
    }
    Cell::new(value)
}

// ---------------------------------------------------------------------
// ORDER BY / LIMIT / OFFSET
// ---------------------------------------------------------------------

fn apply_order_by(
    view: &mut View,
    order_by: &[SortSpec],
    scope: &ScopeChain,
    ctx: &SelectContext<'_>,
) -> EvalResult<()> {
    if order_by.is_empty() {
        return Ok(());
    }
    let subq = SubqueryEvaluator { ctx, scope };
    let env = EvalEnv {
        flags: ctx.flags,
        cancel: ctx.cancel,
        scope,
        group: None,
        subqueries: Some(&subq),
        user_functions: Some(&subq),
    };

    let mut keyed: Vec<(Vec<Primary>, Record)> = Vec::with_capacity(view.records.len());
    for record in view.records.drain(..) {
        let row = RowContext {
            header: &view.header,
            record: &record,
        };
        let mut keys = Vec::with_capacity(order_by.len());
        for spec in order_by {
            keys.push(eval(&spec.expr, &row, &env)?);
        }
        keyed.push((keys, record));
    }

    keyed.sort_by(|(ka, _), (kb, _)| {
        let pairs: Vec<(Primary, Primary, bool, bool)> = ka
            .iter()
            .zip(kb.iter())
            .zip(order_by.iter())
            .map(|((a, b), spec)| {
                let nulls_first = spec.nulls_first.unwrap_or(!spec.desc);
                (a.clone(), b.clone(), spec.desc, nulls_first)
            })
            .collect();
        compare_by_keys(&pairs)
    });

    view.records = keyed.into_iter().map(|(_, r)| r).collect();
    Ok(())
}

fn apply_limit_offset(
    view: &mut View,
    query: &SelectQuery,
    scope: &ScopeChain,
    ctx: &SelectContext<'_>,
) -> EvalResult<()> {
    let offset = match &query.offset {
        Some(offset) => {
            let subq = SubqueryEvaluator { ctx, scope };
            let env = EvalEnv {
                flags: ctx.flags,
                cancel: ctx.cancel,
                scope,
                group: None,
                subqueries: Some(&subq),
                user_functions: Some(&subq),
            };
            let row = RowContext {
                header: &Header::default(),
                record: &Record::default(),
            };
            eval(&offset.count, &row, &env)?
                .try_to_integer()
                .ok_or_else(|| EvalError::type_error("OFFSET requires an integer"))?
                .max(0) as usize
        }
        None => 0,
    };
    let offset = offset.min(view.records.len());
    view.records.drain(0..offset);

    if let Some(limit) = &query.limit {
        let subq = SubqueryEvaluator { ctx, scope };
        let env = EvalEnv {
            flags: ctx.flags,
            cancel: ctx.cancel,
            scope,
            group: None,
            subqueries: Some(&subq),
            user_functions: Some(&subq),
        };
        let row = RowContext {
            header: &Header::default(),
            record: &Record::default(),
        };
        let raw = eval(&limit.count, &row, &env)?
            .try_to_integer()
            .ok_or_else(|| EvalError::type_error("LIMIT requires an integer"))?
            .max(0) as usize;
        let count = if limit.percent {
            (view.records.len() * raw) / 100
        } else {
            raw
        };
        let mut count = count.min(view.records.len());
        if limit.with_ties && count > 0 && count < view.records.len() && !query.order_by.is_empty() {
            count = extend_for_ties(view, count, query, scope, ctx)?;
        }
        view.records.truncate(count);
    }
    Ok(())
}

fn extend_for_ties(
    view: &View,
    count: usize,
    query: &SelectQuery,
    scope: &ScopeChain,
    ctx: &SelectContext<'_>,
) -> EvalResult<usize> {
    let subq = SubqueryEvaluator { ctx, scope };
    let env = EvalEnv {
        flags: ctx.flags,
        cancel: ctx.cancel,
        scope,
        group: None,
        subqueries: Some(&subq),
        user_functions: Some(&subq),
    };
    let key_at = |record: &Record| -> EvalResult<Vec<Primary>> {
        let row = RowContext {
            header: &view.header,
            record,
        };
        query.order_by.iter().map(|s| eval(&s.expr, &row, &env)).collect()
    };
    let boundary = key_at(&view.records[count - 1])?;
    let mut extended = count;
    while extended < view.records.len() {
        if key_at(&view.records[extended])? == boundary {
            extended += 1;
        } else {
            break;
        }
    }
    Ok(extended)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::StaticTableLoader;
    use csvq_ast::location::Location;
    use csvq_ast::literal::PrimitiveType;
    use csvq_ast::query::{SelectEntity, TableName};

    fn flags() -> Flags {
        Flags::default()
    }

    fn loc() -> Location {
        Location::synthetic()
    }

    fn values_table(rows: Vec<Vec<Primary>>, columns: &[&str]) -> View {
        let header = Header::new(
            columns
                .iter()
                .map(|c| ColumnIdentity::new(Some("t".to_string()), c.to_string()))
                .collect(),
        );
        let records = rows
            .into_iter()
            .map(|vs| Record::new(vs.into_iter().map(Cell::new).collect()))
            .collect();
        View::new(header, records).unwrap()
    }

    #[test]
    fn select_without_from_uses_dual() {
        let f = flags();
        let cancel = CancellationContext::new();
        let loader = StaticTableLoader::new();
        let ctx = SelectContext {
            flags: &f,
            cancel: &cancel,
            loader: &loader,
        };
        let mut scope = ScopeChain::new();

        let entity = SelectEntity {
            distinct: false,
            projection: vec![SelectItem {
                expr: csvq_ast::QueryExpression::Primitive(PrimitiveType::new(Primary::Integer(1), loc())),
                alias: None,
                location: loc(),
            }],
            from: None,
            filter: None,
            group_by: vec![],
            having: None,
            location: loc(),
        };
        let view = eval_select_entity(&entity, &mut scope, &ctx).unwrap();
        assert_eq!(view.row_count(), 1);
        assert_eq!(view.records[0].value(0), Some(&Primary::Integer(1)));
    }

    fn identifier(name: &str) -> csvq_ast::Identifier {
        csvq_ast::Identifier::new(name, loc())
    }

    fn select_star_from(table: &str) -> SelectEntity {
        SelectEntity {
            distinct: false,
            projection: vec![SelectItem {
                expr: csvq_ast::QueryExpression::AllColumns(csvq_ast::expr::AllColumns {
                    table: None,
                    location: loc(),
                }),
                alias: None,
                location: loc(),
            }],
            from: Some(From {
                references: vec![TableReference {
                    factor: TableFactor::Table(TableName {
                        name: identifier(table),
                        alias: None,
                        location: loc(),
                    }),
                    joins: vec![],
                }],
            }),
            filter: None,
            group_by: vec![],
            having: None,
            location: loc(),
        }
    }

    #[test]
    fn where_filters_out_false_and_unknown_s2() {
        let f = flags();
        let cancel = CancellationContext::new();
        let mut loader = StaticTableLoader::new();
        loader.register(
            "t",
            values_table(
                vec![
                    vec![Primary::Integer(1)],
                    vec![Primary::Integer(2)],
                    vec![Primary::Null],
                ],
                &["a"],
            ),
        );
        let ctx = SelectContext {
            flags: &f,
            cancel: &cancel,
            loader: &loader,
        };
        let mut scope = ScopeChain::new();

        let mut entity = select_star_from("t");
        entity.filter = Some(csvq_ast::QueryExpression::Comparison(Box::new(
            csvq_ast::expr::Comparison {
                left: csvq_ast::QueryExpression::Identifier(identifier("a")),
                op: csvq_ast::expr::ComparisonOperator::Greater,
                right: csvq_ast::QueryExpression::Primitive(PrimitiveType::new(
                    Primary::Integer(0),
                    loc(),
                )),
                location: loc(),
            },
        )));

        let result = eval_select_entity(&entity, &mut scope, &ctx).unwrap();
        assert_eq!(result.row_count(), 2);
    }

    #[test]
    fn group_by_and_having_match_aggregation_scenario_s5() {
        let f = flags();
        let cancel = CancellationContext::new();
        let mut loader = StaticTableLoader::new();
        loader.register(
            "t",
            values_table(
                vec![
                    vec![Primary::String("a".into()), Primary::Integer(1)],
                    vec![Primary::String("a".into()), Primary::Integer(2)],
                    vec![Primary::String("b".into()), Primary::Null],
                ],
                &["g", "v"],
            ),
        );
        let ctx = SelectContext {
            flags: &f,
            cancel: &cancel,
            loader: &loader,
        };
        let mut scope = ScopeChain::new();

        let entity = SelectEntity {
            distinct: false,
            projection: vec![
                SelectItem {
                    expr: csvq_ast::QueryExpression::Identifier(identifier("g")),
                    alias: None,
                    location: loc(),
                },
                SelectItem {
                    expr: csvq_ast::QueryExpression::AggregateFunction(Box::new(
                        csvq_ast::expr::AggregateFunction {
                            name: identifier("SUM"),
                            distinct: false,
                            args: vec![csvq_ast::QueryExpression::Identifier(identifier("v"))],
                            location: loc(),
                        },
                    )),
                    alias: None,
                    location: loc(),
                },
            ],
            from: Some(From {
                references: vec![TableReference {
                    factor: TableFactor::Table(TableName {
                        name: identifier("t"),
                        alias: None,
                        location: loc(),
                    }),
                    joins: vec![],
                }],
            }),
            filter: None,
            group_by: vec![csvq_ast::QueryExpression::Identifier(identifier("g"))],
            having: None,
            location: loc(),
        };

        let result = eval_select_entity(&entity, &mut scope, &ctx).unwrap();
        assert_eq!(result.row_count(), 2);
        assert_eq!(result.records[0].value(0), Some(&Primary::String("a".into())));
        assert_eq!(result.records[0].value(1), Some(&Primary::Integer(3)));
        assert_eq!(result.records[1].value(0), Some(&Primary::String("b".into())));
        assert_eq!(result.records[1].value(1), Some(&Primary::Null));
    }

    #[test]
    fn order_by_and_limit_apply_after_projection() {
        let f = flags();
        let cancel = CancellationContext::new();
        let mut loader = StaticTableLoader::new();
        loader.register(
            "t",
            values_table(
                vec![
                    vec![Primary::Integer(3)],
                    vec![Primary::Integer(1)],
                    vec![Primary::Integer(2)],
                ],
                &["n"],
            ),
        );
        let ctx = SelectContext {
            flags: &f,
            cancel: &cancel,
            loader: &loader,
        };
        let mut scope = ScopeChain::new();

        let query = SelectQuery {
            with: None,
            body: SelectSet::Entity(Box::new(select_star_from("t"))),
            order_by: vec![SortSpec {
                expr: csvq_ast::QueryExpression::Identifier(identifier("n")),
                desc: false,
                nulls_first: None,
                location: loc(),
            }],
            limit: Some(csvq_ast::query::Limit {
                count: csvq_ast::QueryExpression::Primitive(PrimitiveType::new(
                    Primary::Integer(2),
                    loc(),
                )),
                percent: false,
                with_ties: false,
                location: loc(),
            }),
            offset: None,
            location: loc(),
        };

        let result = eval_select_query(&query, &mut scope, &ctx).unwrap();
        assert_eq!(result.row_count(), 2);
        assert_eq!(result.records[0].value(0), Some(&Primary::Integer(1)));
        assert_eq!(result.records[1].value(0), Some(&Primary::Integer(2)));
    }

    #[test]
    fn where_in_subquery_runs_the_inner_query() {
        let f = flags();
        let cancel = CancellationContext::new();
        let mut loader = StaticTableLoader::new();
        loader.register(
            "t",
            values_table(
                vec![
                    vec![Primary::Integer(1)],
                    vec![Primary::Integer(2)],
                    vec![Primary::Integer(3)],
                ],
                &["n"],
            ),
        );
        loader.register(
            "allowed",
            values_table(vec![vec![Primary::Integer(2)]], &["n"]),
        );
        let ctx = SelectContext {
            flags: &f,
            cancel: &cancel,
            loader: &loader,
        };
        let mut scope = ScopeChain::new();

        let mut entity = select_star_from("t");
        entity.filter = Some(csvq_ast::QueryExpression::In(Box::new(csvq_ast::expr::In {
            expr: csvq_ast::QueryExpression::Identifier(identifier("n")),
            negated: false,
            list: csvq_ast::expr::InList::Subquery(Box::new(SelectQuery {
                with: None,
                body: SelectSet::Entity(Box::new(select_star_from("allowed"))),
                order_by: vec![],
                limit: None,
                offset: None,
                location: loc(),
            })),
            location: loc(),
        })));

        let result = eval_select_entity(&entity, &mut scope, &ctx).unwrap();
        assert_eq!(result.row_count(), 1);
        assert_eq!(result.records[0].value(0), Some(&Primary::Integer(2)));
    }

    #[test]
    fn select_star_with_no_group_by_keeps_one_row_per_record() {
        let f = flags();
        let cancel = CancellationContext::new();
        let mut loader = StaticTableLoader::new();
        loader.register(
            "t",
            values_table(
                vec![
                    vec![Primary::Integer(1)],
                    vec![Primary::Integer(2)],
                    vec![Primary::Integer(3)],
                ],
                &["n"],
            ),
        );
        let ctx = SelectContext {
            flags: &f,
            cancel: &cancel,
            loader: &loader,
        };
        let mut scope = ScopeChain::new();

        let entity = select_star_from("t");
        let result = eval_select_entity(&entity, &mut scope, &ctx).unwrap();
        assert_eq!(result.row_count(), 3);
        assert_eq!(result.records[0].value(0), Some(&Primary::Integer(1)));
        assert_eq!(result.records[1].value(0), Some(&Primary::Integer(2)));
        assert_eq!(result.records[2].value(0), Some(&Primary::Integer(3)));
    }

    fn analytic_item(name: &str, partition_by: Vec<&str>, order_by_col: Option<&str>) -> SelectItem {
        SelectItem {
            expr: csvq_ast::QueryExpression::AnalyticFunction(Box::new(csvq_ast::expr::AnalyticFunction {
                name: identifier(name),
                args: vec![],
                ignore_nulls: false,
                over: csvq_ast::expr::AnalyticClause {
                    partition_by: if partition_by.is_empty() {
                        None
                    } else {
                        Some(csvq_ast::expr::Partition {
                            items: partition_by
                                .into_iter()
                                .map(|c| csvq_ast::QueryExpression::Identifier(identifier(c)))
                                .collect(),
                        })
                    },
                    order_by: order_by_col
                        .map(|c| {
                            vec![SortSpec {
                                expr: csvq_ast::QueryExpression::Identifier(identifier(c)),
                                desc: false,
                                nulls_first: None,
                                location: loc(),
                            }]
                        })
                        .unwrap_or_default(),
                },
                location: loc(),
            })),
            alias: None,
            location: loc(),
        }
    }

    #[test]
    fn row_number_and_rank_partition_and_order_within_group() {
        let f = flags();
        let cancel = CancellationContext::new();
        let mut loader = StaticTableLoader::new();
        loader.register(
            "t",
            values_table(
                vec![
                    vec![Primary::String("a".into()), Primary::Integer(10)],
                    vec![Primary::String("a".into()), Primary::Integer(10)],
                    vec![Primary::String("a".into()), Primary::Integer(20)],
                    vec![Primary::String("b".into()), Primary::Integer(5)],
                ],
                &["g", "v"],
            ),
        );
        let ctx = SelectContext {
            flags: &f,
            cancel: &cancel,
            loader: &loader,
        };
        let mut scope = ScopeChain::new();

        let entity = SelectEntity {
            distinct: false,
            projection: vec![
                SelectItem {
                    expr: csvq_ast::QueryExpression::Identifier(identifier("g")),
                    alias: None,
                    location: loc(),
                },
                SelectItem {
                    expr: csvq_ast::QueryExpression::Identifier(identifier("v")),
                    alias: None,
                    location: loc(),
                },
                analytic_item("ROW_NUMBER", vec!["g"], Some("v")),
                analytic_item("RANK", vec!["g"], Some("v")),
            ],
            from: Some(From {
                references: vec![TableReference {
                    factor: TableFactor::Table(TableName {
                        name: identifier("t"),
                        alias: None,
                        location: loc(),
                    }),
                    joins: vec![],
                }],
            }),
            filter: None,
            group_by: vec![],
            having: None,
            location: loc(),
        };

        let result = eval_select_entity(&entity, &mut scope, &ctx).unwrap();
        assert_eq!(result.row_count(), 4);

        let mut by_group_and_value: Vec<(String, i64, i64, i64)> = result
            .records
            .iter()
            .map(|r| {
                let g = match r.value(0) {
                    Some(Primary::String(s)) => s.clone(),
                    _ => panic!("expected string"),
                };
                let v = match r.value(1) {
                    Some(Primary::Integer(n)) => *n,
                    _ => panic!("expected integer"),
                };
                let row_number = match r.value(2) {
                    Some(Primary::Integer(n)) => *n,
                    _ => panic!("expected integer"),
                };
                let rank = match r.value(3) {
                    Some(Primary::Integer(n)) => *n,
                    _ => panic!("expected integer"),
                };
                (g, v, row_number, rank)
            })
            .collect();
        by_group_and_value.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

        // group "a": two rows tied at v=10 (RANK 1, 1), then v=20 (RANK 3).
        assert_eq!(by_group_and_value[0], ("a".to_string(), 10, 1, 1));
        assert_eq!(by_group_and_value[1], ("a".to_string(), 10, 2, 1));
        assert_eq!(by_group_and_value[2], ("a".to_string(), 20, 3, 3));
        // group "b": a single row, always rank/row_number 1.
        assert_eq!(by_group_and_value[3], ("b".to_string(), 5, 1, 1));
    }

    fn select_one() -> SelectEntity {
        SelectEntity {
            distinct: false,
            projection: vec![SelectItem {
                expr: csvq_ast::QueryExpression::Primitive(PrimitiveType::new(Primary::Integer(1), loc())),
                alias: None,
                location: loc(),
            }],
            from: None,
            filter: None,
            group_by: vec![],
            having: None,
            location: loc(),
        }
    }

    fn recursive_increment_query(limit: i64) -> SelectQuery {
        let recursive_select = SelectEntity {
            distinct: false,
            projection: vec![SelectItem {
                expr: csvq_ast::QueryExpression::Arithmetic(Box::new(csvq_ast::expr::Arithmetic {
                    left: csvq_ast::QueryExpression::Identifier(identifier("n")),
                    op: csvq_ast::expr::ArithmeticOperator::Add,
                    right: csvq_ast::QueryExpression::Primitive(PrimitiveType::new(Primary::Integer(1), loc())),
                    location: loc(),
                })),
                alias: None,
                location: loc(),
            }],
            from: Some(From {
                references: vec![TableReference {
                    factor: TableFactor::Table(TableName {
                        name: identifier("r"),
                        alias: None,
                        location: loc(),
                    }),
                    joins: vec![],
                }],
            }),
            filter: Some(csvq_ast::QueryExpression::Comparison(Box::new(
                csvq_ast::expr::Comparison {
                    left: csvq_ast::QueryExpression::Identifier(identifier("n")),
                    op: csvq_ast::expr::ComparisonOperator::Less,
                    right: csvq_ast::QueryExpression::Primitive(PrimitiveType::new(
                        Primary::Integer(limit),
                        loc(),
                    )),
                    location: loc(),
                },
            ))),
            group_by: vec![],
            having: None,
            location: loc(),
        };
        SelectQuery {
            with: None,
            body: SelectSet::SetOperation(Box::new(SetOperation {
                left: SelectSet::Entity(Box::new(select_one())),
                op: SetOperator::UnionAll,
                right: SelectSet::Entity(Box::new(recursive_select)),
                location: loc(),
            })),
            order_by: vec![],
            limit: None,
            offset: None,
            location: loc(),
        }
    }

    #[test]
    fn recursive_cte_working_table_terminates_on_empty_delta() {
        let f = flags();
        let cancel = CancellationContext::new();
        let loader = StaticTableLoader::new();
        let ctx = SelectContext {
            flags: &f,
            cancel: &cancel,
            loader: &loader,
        };
        let mut scope = ScopeChain::new();

        let view = eval_recursive_cte(
            "r",
            &[identifier("n")],
            &recursive_increment_query(3),
            &mut scope,
            &ctx,
        )
        .unwrap();

        let mut values: Vec<i64> = view
            .records
            .iter()
            .map(|r| match r.value(0) {
                Some(Primary::Integer(n)) => *n,
                _ => panic!("expected integer"),
            })
            .collect();
        values.sort_unstable();
        assert_eq!(values, vec![1, 2, 3]);
        assert_eq!(view.header.resolve("n").unwrap(), 0);
    }

    #[test]
    fn with_column_list_renames_the_cte_header() {
        let f = flags();
        let cancel = CancellationContext::new();
        let loader = StaticTableLoader::new();
        let ctx = SelectContext {
            flags: &f,
            cancel: &cancel,
            loader: &loader,
        };
        let mut scope = ScopeChain::new();

        let inner = SelectQuery {
            with: None,
            body: SelectSet::Entity(Box::new(select_one())),
            order_by: vec![],
            limit: None,
            offset: None,
            location: loc(),
        };

        let query = SelectQuery {
            with: Some(csvq_ast::query::With {
                recursive: false,
                ctes: vec![csvq_ast::query::Cte {
                    name: identifier("r"),
                    columns: vec![identifier("n")],
                    query: Box::new(inner),
                    location: loc(),
                }],
            }),
            body: SelectSet::Entity(Box::new(select_star_from("r"))),
            order_by: vec![],
            limit: None,
            offset: None,
            location: loc(),
        };

        let result = eval_select_query(&query, &mut scope, &ctx).unwrap();
        assert_eq!(result.row_count(), 1);
        assert_eq!(result.header.resolve("n").unwrap(), 0);
        assert_eq!(result.records[0].value(0), Some(&Primary::Integer(1)));
    }

    fn set_op_query(op: SetOperator, left_rows: Vec<i64>, right_rows: Vec<i64>) -> SelectQuery {
        fn values_entity(rows: &[i64]) -> SelectSet {
            // A tiny disjunction of literal rows, mirroring `select_one`'s
            // no-FROM shape: `SELECT 1 UNION ALL SELECT 1 ...` reduced to
            // one row per requested value via a one-item set.
            SelectSet::Entity(Box::new(SelectEntity {
                distinct: false,
                projection: vec![SelectItem {
                    expr: csvq_ast::QueryExpression::Primitive(PrimitiveType::new(
                        Primary::Integer(rows[0]),
                        loc(),
                    )),
                    alias: None,
                    location: loc(),
                }],
                from: None,
                filter: None,
                group_by: vec![],
                having: None,
                location: loc(),
            }))
        }

        fn chain(rows: &[i64]) -> SelectSet {
            rows.iter().skip(1).fold(values_entity(rows), |acc, &n| {
                SelectSet::SetOperation(Box::new(SetOperation {
                    left: acc,
                    op: SetOperator::UnionAll,
                    right: SelectSet::Entity(Box::new(SelectEntity {
                        distinct: false,
                        projection: vec![SelectItem {
                            expr: csvq_ast::QueryExpression::Primitive(PrimitiveType::new(
                                Primary::Integer(n),
                                loc(),
                            )),
                            alias: None,
                            location: loc(),
                        }],
                        from: None,
                        filter: None,
                        group_by: vec![],
                        having: None,
                        location: loc(),
                    })),
                    location: loc(),
                }))
            })
        }

        SelectQuery {
            with: None,
            body: SelectSet::SetOperation(Box::new(SetOperation {
                left: chain(&left_rows),
                op,
                right: chain(&right_rows),
                location: loc(),
            })),
            order_by: vec![],
            limit: None,
            offset: None,
            location: loc(),
        }
    }

    fn row_values(view: &View) -> Vec<i64> {
        let mut values: Vec<i64> = view
            .records
            .iter()
            .map(|r| match r.value(0) {
                Some(Primary::Integer(n)) => *n,
                _ => panic!("expected integer"),
            })
            .collect();
        values.sort_unstable();
        values
    }

    #[test]
    fn intersect_all_preserves_minimum_multiplicity() {
        let f = flags();
        let cancel = CancellationContext::new();
        let loader = StaticTableLoader::new();
        let ctx = SelectContext {
            flags: &f,
            cancel: &cancel,
            loader: &loader,
        };
        let mut scope = ScopeChain::new();

        let query = set_op_query(SetOperator::IntersectAll, vec![1, 1, 1, 2], vec![1, 1, 3]);
        let result = eval_select_query(&query, &mut scope, &ctx).unwrap();
        assert_eq!(row_values(&result), vec![1, 1]);
    }

    #[test]
    fn except_all_subtracts_multiplicity_without_deduping() {
        let f = flags();
        let cancel = CancellationContext::new();
        let loader = StaticTableLoader::new();
        let ctx = SelectContext {
            flags: &f,
            cancel: &cancel,
            loader: &loader,
        };
        let mut scope = ScopeChain::new();

        let query = set_op_query(SetOperator::ExceptAll, vec![1, 1, 1, 2], vec![1]);
        let result = eval_select_query(&query, &mut scope, &ctx).unwrap();
        assert_eq!(row_values(&result), vec![1, 1, 2]);
    }
}
