use csvq_ast::statement::{
    AggregateDeclaration, CaseStmt, CursorClose, CursorDeclaration, CursorDispose, CursorFetch,
    CursorOpen, FlowControl, FunctionDeclaration, If, Statement, TableDeclaration,
    TransactionControl, Trigger, VariableDeclaration, While, WhileInCursor,
};
use csvq_ast::QueryExpression;
use csvq_value::Primary;
use log::info;

use crate::cursor::{Cursor, FetchOutcome, FetchPosition};
use crate::error::{EvalError, EvalResult};
use crate::eval::{eval, EvalEnv, RowContext};
use crate::scope::ScopeChain;
use crate::select::{eval_select_query, SelectContext};
use crate::view::{ColumnIdentity, Header, Record, View};

/// Where a running program sends the results of `SELECT` and `PRINT`
/// statements. Implemented outside the core by whatever embeds it (e.g. a
/// CLI that serializes a `View` back out to CSV); the evaluator only
/// produces values, it does not serialize them.
pub trait Output {
    fn select(&mut self, view: View);
    fn print(&mut self, text: &str);
}

/// An [`Output`] that discards `SELECT` results and routes `PRINT` through
/// the logging facade, used when running a function/aggregate body: its
/// statements execute for their side effects on scope, not to produce a
/// top-level result.
struct SilentOutput;

impl Output for SilentOutput {
    fn select(&mut self, _view: View) {}

    fn print(&mut self, text: &str) {
        info!("{}", text);
    }
}

/// The non-local outcome of running a statement or a block of statements:
/// fell through normally, or unwound toward an enclosing loop (`BREAK`/
/// `CONTINUE`) or function boundary (`EXIT`).
pub enum Flow {
    Normal,
    Break,
    Continue,
    Exit(Option<Primary>),
}

/// Bridges [`eval`]'s subquery/user-function hooks back into this module,
/// the same way [`crate::select`]'s own adapter does, so a `VAR`/`IF`/
/// `WHILE` condition evaluated at the statement level can itself contain a
/// subquery or a call to a user-declared function.
struct StatementEvaluator<'s, 'c> {
    ctx: &'s SelectContext<'c>,
    scope: &'s ScopeChain,
}

impl<'s, 'c> crate::eval::SubqueryRunner for StatementEvaluator<'s, 'c> {
    fn run(&self, query: &csvq_ast::SelectQuery) -> EvalResult<View> {
        let mut forked = self.scope.fork();
        eval_select_query(query, &mut forked, self.ctx)
    }
}

impl<'s, 'c> crate::eval::FunctionRunner for StatementEvaluator<'s, 'c> {
    fn call_function(&self, decl: &FunctionDeclaration, args: &[Primary]) -> EvalResult<Primary> {
        run_function(decl, args, self.scope, self.ctx)
    }

    fn call_aggregate(&self, decl: &AggregateDeclaration, values: &[Primary]) -> EvalResult<Primary> {
        run_aggregate(decl, values, self.scope, self.ctx)
    }
}

/// Evaluates a scalar expression in a procedural-statement context: no
/// source row (the synthetic zero-column `Dual` record), but full access
/// to subqueries and user-declared functions through `scope`/`ctx`.
fn eval_expr(expr: &QueryExpression, scope: &ScopeChain, ctx: &SelectContext<'_>) -> EvalResult<Primary> {
    let adapter = StatementEvaluator { ctx, scope };
    let env = EvalEnv {
        flags: ctx.flags,
        cancel: ctx.cancel,
        scope,
        group: None,
        subqueries: Some(&adapter),
        user_functions: Some(&adapter),
    };
    let header = Header::default();
    let record = Record::new(Vec::new());
    let row = RowContext {
        header: &header,
        record: &record,
    };
    eval(expr, &row, &env)
}

/// Runs a user-declared scalar function body: binds `args` (falling back to
/// declared defaults for trailing omitted parameters) in a fresh frame of a
/// forked scope, executes the body, and takes `EXIT expr` as the return
/// value (`EXIT` with no expression, or falling off the end, returns NULL).
pub(crate) fn run_function(
    decl: &FunctionDeclaration,
    args: &[Primary],
    scope: &ScopeChain,
    ctx: &SelectContext<'_>,
) -> EvalResult<Primary> {
    if args.len() > decl.params.len() {
        return Err(EvalError::semantic(format!(
            "function {} called with too many arguments",
            decl.name.value
        )));
    }
    let mut forked = scope.fork();
    let marker = forked.push();
    let result = (|| {
        for (i, param) in decl.params.iter().enumerate() {
            let value = if i < args.len() {
                args[i].clone()
            } else {
                let default = decl
                    .defaults
                    .iter()
                    .find(|(name, _)| name == param)
                    .map(|(_, expr)| expr)
                    .ok_or_else(|| {
                        EvalError::semantic(format!(
                            "function {} called with too few arguments",
                            decl.name.value
                        ))
                    })?;
                eval_expr(default, &forked, ctx)?
            };
            forked.declare_variable(param, value)?;
        }
        exec_block(&decl.body, &mut forked, ctx, &mut SilentOutput)
    })();
    forked.pop(marker);
    match result? {
        Flow::Exit(value) => Ok(value.unwrap_or(Primary::Null)),
        _ => Ok(Primary::Null),
    }
}

/// Runs a user-declared aggregate body: `values` (the group's already
/// NULL-filtered argument values, the same convention the built-in
/// aggregates use) are exposed as a pseudo-cursor bound to
/// [`AggregateDeclaration::cursor_param`], so the body iterates them with
/// `WHILE ... IN CURSOR` the same way it would iterate any other cursor.
pub(crate) fn run_aggregate(
    decl: &AggregateDeclaration,
    values: &[Primary],
    scope: &ScopeChain,
    ctx: &SelectContext<'_>,
) -> EvalResult<Primary> {
    let mut forked = scope.fork();
    let marker = forked.push();
    let result = (|| {
        forked.declare_cursor(
            &decl.cursor_param,
            Cursor::pseudo(decl.cursor_param.clone(), values.to_vec()),
        )?;
        for param in &decl.params {
            forked.declare_variable(param, Primary::Null)?;
        }
        exec_block(&decl.body, &mut forked, ctx, &mut SilentOutput)
    })();
    forked.pop(marker);
    match result? {
        Flow::Exit(value) => Ok(value.unwrap_or(Primary::Null)),
        _ => Ok(Primary::Null),
    }
}

/// Runs a whole program (a sequence of top-level statements) against
/// `scope`, collecting the error from any statement that fails rather than
/// stopping the program: per the propagation rule, an error bubbles up to
/// its own statement boundary and the loop moves on to the next statement.
/// An un-caught `EXIT` at the top level ends the program early.
pub fn run_program(
    statements: &[Statement],
    scope: &mut ScopeChain,
    ctx: &SelectContext<'_>,
    out: &mut dyn Output,
) -> Vec<EvalError> {
    let mut errors = Vec::new();
    for stmt in statements {
        match exec_statement(stmt, scope, ctx, out) {
            Ok(Flow::Exit(_)) => break,
            Ok(_) => {}
            Err(e) => errors.push(e),
        }
    }
    errors
}

/// Runs a block of statements, short-circuiting on the first `BREAK`/
/// `CONTINUE`/`EXIT` or error; a block that runs every statement without
/// unwinding returns `Flow::Normal`.
fn exec_block(
    statements: &[Statement],
    scope: &mut ScopeChain,
    ctx: &SelectContext<'_>,
    out: &mut dyn Output,
) -> EvalResult<Flow> {
    for stmt in statements {
        ctx.cancel.check()?;
        match exec_statement(stmt, scope, ctx, out)? {
            Flow::Normal => {}
            other => return Ok(other),
        }
    }
    Ok(Flow::Normal)
}

/// Runs `body` in a fresh child frame, so variables it declares do not leak
/// into the enclosing block (each `IF`/`WHILE`/`CASE` arm gets its own).
fn exec_scoped_block(
    statements: &[Statement],
    scope: &mut ScopeChain,
    ctx: &SelectContext<'_>,
    out: &mut dyn Output,
) -> EvalResult<Flow> {
    let marker = scope.push();
    let result = exec_block(statements, scope, ctx, out);
    scope.pop(marker);
    result
}

fn assign_variable(scope: &mut ScopeChain, name: &str, value: Primary) -> EvalResult<()> {
    scope.set_variable(name, value)
}

/// Runs one procedural statement. `SELECT` and `PRINT` are handed to `out`;
/// everything else mutates `scope` or returns a [`Flow`] signal.
fn exec_statement(
    stmt: &Statement,
    scope: &mut ScopeChain,
    ctx: &SelectContext<'_>,
    out: &mut dyn Output,
) -> EvalResult<Flow> {
    match stmt {
        Statement::Select(query) => {
            let view = eval_select_query(query, scope, ctx)?;
            out.select(view);
            Ok(Flow::Normal)
        }

        Statement::VariableDeclaration(VariableDeclaration { assignments, .. }) => {
            for assignment in assignments {
                let value = match &assignment.value {
                    Some(expr) => eval_expr(expr, scope, ctx)?,
                    None => Primary::Null,
                };
                scope.declare_variable(&assignment.name, value)?;
            }
            Ok(Flow::Normal)
        }

        Statement::Substitution(s) => {
            let value = eval_expr(&s.value, scope, ctx)?;
            assign_variable(scope, &s.name, value)?;
            Ok(Flow::Normal)
        }

        Statement::Assignment(a) => {
            let value = eval_expr(&a.value, scope, ctx)?;
            assign_variable(scope, &a.target.value, value)?;
            Ok(Flow::Normal)
        }

        Statement::Print(p) => {
            let value = eval_expr(&p.value, scope, ctx)?;
            out.print(&value.to_string());
            Ok(Flow::Normal)
        }

        Statement::CursorDeclaration(decl) => {
            exec_cursor_declaration(decl, scope)?;
            Ok(Flow::Normal)
        }
        Statement::CursorOpen(open) => {
            exec_cursor_open(open, scope, ctx)?;
            Ok(Flow::Normal)
        }
        Statement::CursorClose(close) => {
            exec_cursor_close(close, scope)?;
            Ok(Flow::Normal)
        }
        Statement::CursorDispose(dispose) => {
            exec_cursor_dispose(dispose, scope)?;
            Ok(Flow::Normal)
        }
        Statement::CursorFetch(fetch) => {
            exec_cursor_fetch(fetch, scope)?;
            Ok(Flow::Normal)
        }

        Statement::FunctionDeclaration(decl) => {
            scope.declare_function(&decl.name.value, (**decl).clone())?;
            Ok(Flow::Normal)
        }
        Statement::AggregateDeclaration(decl) => {
            scope.declare_aggregate(&decl.name.value, (**decl).clone())?;
            Ok(Flow::Normal)
        }

        Statement::If(stmt) => exec_if(stmt, scope, ctx, out),
        Statement::Case(stmt) => exec_case(stmt, scope, ctx, out),
        Statement::While(stmt) => exec_while(stmt, scope, ctx, out),
        Statement::WhileInCursor(stmt) => exec_while_in_cursor(stmt, scope, ctx, out),

        Statement::TableDeclaration(decl) => {
            exec_table_declaration(decl, scope, ctx)?;
            Ok(Flow::Normal)
        }

        Statement::TransactionControl(tc) => {
            // Transaction coordination with the filesystem is an external
            // collaborator's concern; the core only records the boundary.
            info!("{}", tc);
            Ok(Flow::Normal)
        }

        Statement::FlowControl(fc) => match fc {
            FlowControl::Break => Ok(Flow::Break),
            FlowControl::Continue => Ok(Flow::Continue),
            FlowControl::Exit(expr) => {
                let value = match expr {
                    Some(expr) => Some(eval_expr(expr, scope, ctx)?),
                    None => None,
                };
                Ok(Flow::Exit(value))
            }
        },

        Statement::Trigger(Trigger { message, code, .. }) => {
            let message = eval_expr(message, scope, ctx)?;
            Err(EvalError::user_raised(message.to_display_string(), *code))
        }
    }
}

fn exec_cursor_declaration(decl: &CursorDeclaration, scope: &mut ScopeChain) -> EvalResult<()> {
    scope.declare_cursor(&decl.name.value, Cursor::regular(decl.name.value.clone(), decl.query.clone()))
}

fn exec_cursor_open(open: &CursorOpen, scope: &mut ScopeChain, ctx: &SelectContext<'_>) -> EvalResult<()> {
    let query = scope
        .cursor(&open.name.value)?
        .query()
        .ok_or_else(|| EvalError::pseudo_cursor(&open.name.value))?
        .clone();
    let view = eval_select_query(&query, scope, ctx)?;
    scope.cursor(&open.name.value)?.open(view)
}

fn exec_cursor_close(close: &CursorClose, scope: &mut ScopeChain) -> EvalResult<()> {
    scope.cursor(&close.name.value)?.close()
}

fn exec_cursor_dispose(dispose: &CursorDispose, scope: &mut ScopeChain) -> EvalResult<()> {
    if scope.cursor(&dispose.name.value)?.is_pseudo() {
        return Err(EvalError::pseudo_cursor(&dispose.name.value));
    }
    scope.dispose_cursor(&dispose.name.value)
}

fn exec_cursor_fetch(fetch: &CursorFetch, scope: &mut ScopeChain) -> EvalResult<()> {
    let position: FetchPosition = (&fetch.position).into();
    let outcome = scope.cursor(&fetch.name.value)?.fetch(position)?;
    let values: Vec<Primary> = match outcome {
        FetchOutcome::Row(record) => (0..fetch.targets.len())
            .map(|i| record.value(i).cloned().unwrap_or(Primary::Null))
            .collect(),
        FetchOutcome::NoRow => vec![Primary::Null; fetch.targets.len()],
    };
    for (target, value) in fetch.targets.iter().zip(values) {
        assign_variable(scope, target, value)?;
    }
    Ok(())
}

fn exec_if(stmt: &If, scope: &mut ScopeChain, ctx: &SelectContext<'_>, out: &mut dyn Output) -> EvalResult<Flow> {
    if eval_expr(&stmt.condition, scope, ctx)?.to_ternary().is_true() {
        return exec_scoped_block(&stmt.body, scope, ctx, out);
    }
    for else_if in &stmt.else_ifs {
        if eval_expr(&else_if.condition, scope, ctx)?.to_ternary().is_true() {
            return exec_scoped_block(&else_if.body, scope, ctx, out);
        }
    }
    match &stmt.else_body {
        Some(body) => exec_scoped_block(body, scope, ctx, out),
        None => Ok(Flow::Normal),
    }
}

fn exec_case(
    stmt: &CaseStmt,
    scope: &mut ScopeChain,
    ctx: &SelectContext<'_>,
    out: &mut dyn Output,
) -> EvalResult<Flow> {
    let operand = match &stmt.operand {
        Some(expr) => Some(eval_expr(expr, scope, ctx)?),
        None => None,
    };
    for when in &stmt.when {
        let condition_value = eval_expr(&when.condition, scope, ctx)?;
        let matched = match &operand {
            Some(operand) => csvq_value::equal_to(operand, &condition_value).is_true(),
            None => condition_value.to_ternary().is_true(),
        };
        if matched {
            return exec_scoped_block(&when.body, scope, ctx, out);
        }
    }
    match &stmt.else_body {
        Some(body) => exec_scoped_block(body, scope, ctx, out),
        None => Ok(Flow::Normal),
    }
}

fn exec_while(
    stmt: &While,
    scope: &mut ScopeChain,
    ctx: &SelectContext<'_>,
    out: &mut dyn Output,
) -> EvalResult<Flow> {
    while eval_expr(&stmt.condition, scope, ctx)?.to_ternary().is_true() {
        ctx.cancel.check()?;
        match exec_scoped_block(&stmt.body, scope, ctx, out)? {
            Flow::Normal | Flow::Continue => {}
            Flow::Break => break,
            exit @ Flow::Exit(_) => return Ok(exit),
        }
    }
    Ok(Flow::Normal)
}

fn exec_while_in_cursor(
    stmt: &WhileInCursor,
    scope: &mut ScopeChain,
    ctx: &SelectContext<'_>,
    out: &mut dyn Output,
) -> EvalResult<Flow> {
    loop {
        ctx.cancel.check()?;
        let outcome = scope.cursor(&stmt.cursor.value)?.fetch(FetchPosition::Next)?;
        let record = match outcome {
            FetchOutcome::Row(record) => record,
            FetchOutcome::NoRow => break,
        };

        let marker = scope.push();
        let result = (|| {
            for (i, var) in stmt.variables.iter().enumerate() {
                let value = record.value(i).cloned().unwrap_or(Primary::Null);
                scope.declare_variable(var, value)?;
            }
            exec_block(&stmt.body, scope, ctx, out)
        })();
        scope.pop(marker);

        match result? {
            Flow::Normal | Flow::Continue => {}
            Flow::Break => break,
            exit @ Flow::Exit(_) => return Ok(exit),
        }
    }
    Ok(Flow::Normal)
}

fn exec_table_declaration(
    decl: &TableDeclaration,
    scope: &mut ScopeChain,
    ctx: &SelectContext<'_>,
) -> EvalResult<()> {
    let view = eval_select_query(&decl.query, scope, ctx)?;
    let view = if decl.columns.is_empty() {
        view
    } else {
        if decl.columns.len() != view.header.len() {
            return Err(EvalError::semantic(format!(
                "table {} declares {} columns but its query returns {}",
                decl.name.value,
                decl.columns.len(),
                view.header.len()
            )));
        }
        let header = Header::new(
            decl.columns
                .iter()
                .map(|c| ColumnIdentity::new(Some(decl.name.value.clone()), c.value.clone()))
                .collect(),
        );
        View::new(header, view.records)?
    };
    scope.declare_temp_table(&decl.name.value, view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Flags;
    use crate::context::CancellationContext;
    use crate::table::StaticTableLoader;
    use csvq_ast::literal::PrimitiveType;
    use csvq_ast::location::Location;
    use csvq_ast::statement::{FlowControl, Print, Substitution, VarAssignment};

    fn loc() -> Location {
        Location::synthetic()
    }

    fn lit(p: Primary) -> QueryExpression {
        QueryExpression::Primitive(PrimitiveType::new(p, loc()))
    }

    struct RecordingOutput {
        prints: Vec<String>,
        selects: Vec<View>,
    }

    impl Output for RecordingOutput {
        fn select(&mut self, view: View) {
            self.selects.push(view);
        }

        fn print(&mut self, text: &str) {
            self.prints.push(text.to_string());
        }
    }

    fn ctx<'a>(flags: &'a Flags, cancel: &'a CancellationContext, loader: &'a StaticTableLoader) -> SelectContext<'a> {
        SelectContext { flags, cancel, loader }
    }

    #[test]
    fn variable_declaration_then_print_renders_current_value() {
        let flags = Flags::default();
        let cancel = CancellationContext::new();
        let loader = StaticTableLoader::new();
        let c = ctx(&flags, &cancel, &loader);
        let mut scope = ScopeChain::new();
        let mut out = RecordingOutput {
            prints: vec![],
            selects: vec![],
        };

        let decl = Statement::VariableDeclaration(VariableDeclaration {
            assignments: vec![VarAssignment {
                name: "x".to_string(),
                value: Some(lit(Primary::Integer(1))),
            }],
            location: loc(),
        });
        let print = Statement::Print(Box::new(Print {
            value: QueryExpression::Variable(csvq_ast::expr::Variable {
                name: "x".to_string(),
                location: loc(),
            }),
            location: loc(),
        }));

        let errors = run_program(&[decl, print], &mut scope, &c, &mut out);
        assert!(errors.is_empty());
        assert_eq!(out.prints, vec!["1".to_string()]);
    }

    #[test]
    fn substitution_reassigns_a_declared_variable() {
        let flags = Flags::default();
        let cancel = CancellationContext::new();
        let loader = StaticTableLoader::new();
        let c = ctx(&flags, &cancel, &loader);
        let mut scope = ScopeChain::new();
        scope.declare_variable("x", Primary::Integer(1)).unwrap();

        let stmt = Statement::Substitution(Box::new(Substitution {
            name: "x".to_string(),
            value: lit(Primary::Integer(2)),
            location: loc(),
        }));
        exec_statement(&stmt, &mut scope, &c, &mut SilentOutput).unwrap();
        assert_eq!(scope.get_variable("x").unwrap(), Primary::Integer(2));
    }

    #[test]
    fn while_loop_runs_until_condition_is_false() {
        let flags = Flags::default();
        let cancel = CancellationContext::new();
        let loader = StaticTableLoader::new();
        let c = ctx(&flags, &cancel, &loader);
        let mut scope = ScopeChain::new();
        scope.declare_variable("n", Primary::Integer(0)).unwrap();

        let condition = QueryExpression::Comparison(Box::new(csvq_ast::expr::Comparison {
            left: QueryExpression::Variable(csvq_ast::expr::Variable {
                name: "n".to_string(),
                location: loc(),
            }),
            op: csvq_ast::expr::ComparisonOperator::Less,
            right: lit(Primary::Integer(3)),
            location: loc(),
        }));
        let body = vec![Statement::Substitution(Box::new(Substitution {
            name: "n".to_string(),
            value: QueryExpression::Arithmetic(Box::new(csvq_ast::expr::Arithmetic {
                left: QueryExpression::Variable(csvq_ast::expr::Variable {
                    name: "n".to_string(),
                    location: loc(),
                }),
                op: csvq_ast::expr::ArithmeticOperator::Add,
                right: lit(Primary::Integer(1)),
                location: loc(),
            })),
            location: loc(),
        }))];

        let stmt = Statement::While(Box::new(While {
            condition,
            body,
            location: loc(),
        }));
        exec_statement(&stmt, &mut scope, &c, &mut SilentOutput).unwrap();
        assert_eq!(scope.get_variable("n").unwrap(), Primary::Integer(3));
    }

    #[test]
    fn break_exits_the_enclosing_while_loop_early() {
        let flags = Flags::default();
        let cancel = CancellationContext::new();
        let loader = StaticTableLoader::new();
        let c = ctx(&flags, &cancel, &loader);
        let mut scope = ScopeChain::new();
        scope.declare_variable("n", Primary::Integer(0)).unwrap();

        let always_true = lit(Primary::Ternary(csvq_value::Ternary::True));
        let body = vec![
            Statement::Substitution(Box::new(Substitution {
                name: "n".to_string(),
                value: QueryExpression::Arithmetic(Box::new(csvq_ast::expr::Arithmetic {
                    left: QueryExpression::Variable(csvq_ast::expr::Variable {
                        name: "n".to_string(),
                        location: loc(),
                    }),
                    op: csvq_ast::expr::ArithmeticOperator::Add,
                    right: lit(Primary::Integer(1)),
                    location: loc(),
                })),
                location: loc(),
            })),
            Statement::FlowControl(FlowControl::Break),
        ];

        let stmt = Statement::While(Box::new(While {
            condition: always_true,
            body,
            location: loc(),
        }));
        exec_statement(&stmt, &mut scope, &c, &mut SilentOutput).unwrap();
        assert_eq!(scope.get_variable("n").unwrap(), Primary::Integer(1));
    }

    #[test]
    fn trigger_raises_a_user_error_carrying_its_message() {
        let flags = Flags::default();
        let cancel = CancellationContext::new();
        let loader = StaticTableLoader::new();
        let c = ctx(&flags, &cancel, &loader);
        let mut scope = ScopeChain::new();

        let stmt = Statement::Trigger(Trigger {
            message: lit(Primary::String("boom".to_string())),
            code: Some(42),
            location: loc(),
        });
        let err = exec_statement(&stmt, &mut scope, &c, &mut SilentOutput).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::UserRaised);
    }

    fn identifier(name: &str) -> csvq_ast::Identifier {
        csvq_ast::Identifier::new(name, loc())
    }

    #[test]
    fn if_else_if_else_picks_the_matching_branch() {
        let flags = Flags::default();
        let cancel = CancellationContext::new();
        let loader = StaticTableLoader::new();
        let c = ctx(&flags, &cancel, &loader);
        let mut scope = ScopeChain::new();
        scope.declare_variable("taken", Primary::Null).unwrap();

        let stmt = Statement::If(csvq_ast::statement::If {
            condition: lit(Primary::Ternary(csvq_value::Ternary::False)),
            body: vec![Statement::Substitution(Substitution {
                name: "taken".to_string(),
                value: lit(Primary::String("if".to_string())),
                location: loc(),
            })],
            else_ifs: vec![csvq_ast::statement::ElseIf {
                condition: lit(Primary::Ternary(csvq_value::Ternary::True)),
                body: vec![Statement::Substitution(Substitution {
                    name: "taken".to_string(),
                    value: lit(Primary::String("else_if".to_string())),
                    location: loc(),
                })],
            }],
            else_body: Some(vec![Statement::Substitution(Substitution {
                name: "taken".to_string(),
                value: lit(Primary::String("else".to_string())),
                location: loc(),
            })]),
            location: loc(),
        });

        exec_statement(&stmt, &mut scope, &c, &mut SilentOutput).unwrap();
        assert_eq!(scope.get_variable("taken").unwrap(), Primary::String("else_if".to_string()));
    }

    #[test]
    fn case_with_operand_matches_first_equal_when() {
        let flags = Flags::default();
        let cancel = CancellationContext::new();
        let loader = StaticTableLoader::new();
        let c = ctx(&flags, &cancel, &loader);
        let mut scope = ScopeChain::new();
        scope.declare_variable("taken", Primary::Null).unwrap();

        let stmt = Statement::Case(csvq_ast::statement::CaseStmt {
            operand: Some(lit(Primary::Integer(2))),
            when: vec![
                csvq_ast::statement::CaseWhen {
                    condition: lit(Primary::Integer(1)),
                    body: vec![Statement::Substitution(Substitution {
                        name: "taken".to_string(),
                        value: lit(Primary::Integer(1)),
                        location: loc(),
                    })],
                },
                csvq_ast::statement::CaseWhen {
                    condition: lit(Primary::Integer(2)),
                    body: vec![Statement::Substitution(Substitution {
                        name: "taken".to_string(),
                        value: lit(Primary::Integer(2)),
                        location: loc(),
                    })],
                },
            ],
            else_body: None,
            location: loc(),
        });

        exec_statement(&stmt, &mut scope, &c, &mut SilentOutput).unwrap();
        assert_eq!(scope.get_variable("taken").unwrap(), Primary::Integer(2));
    }

    fn select_star_from(table: &str) -> csvq_ast::SelectQuery {
        use csvq_ast::query::{From, SelectEntity, SelectItem, SelectSet, TableFactor, TableName, TableReference};
        csvq_ast::SelectQuery {
            with: None,
            body: SelectSet::Entity(Box::new(SelectEntity {
                distinct: false,
                projection: vec![SelectItem {
                    expr: QueryExpression::AllColumns(csvq_ast::expr::AllColumns {
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
            })),
            order_by: vec![],
            limit: None,
            offset: None,
            location: loc(),
        }
    }

    fn values_table(rows: Vec<Vec<Primary>>, columns: &[&str]) -> View {
        use crate::view::{Cell, ColumnIdentity};
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
    fn cursor_lifecycle_declare_open_fetch_close() {
        let flags = Flags::default();
        let cancel = CancellationContext::new();
        let mut loader = StaticTableLoader::new();
        loader.register("t", values_table(vec![vec![Primary::Integer(1)], vec![Primary::Integer(2)]], &["n"]));
        let c = ctx(&flags, &cancel, &loader);
        let mut scope = ScopeChain::new();
        scope.declare_variable("n", Primary::Null).unwrap();

        exec_statement(
            &Statement::CursorDeclaration(CursorDeclaration {
                name: identifier("cur"),
                query: Box::new(select_star_from("t")),
                location: loc(),
            }),
            &mut scope,
            &c,
            &mut SilentOutput,
        )
        .unwrap();

        exec_statement(
            &Statement::CursorOpen(CursorOpen {
                name: identifier("cur"),
                location: loc(),
            }),
            &mut scope,
            &c,
            &mut SilentOutput,
        )
        .unwrap();

        exec_statement(
            &Statement::CursorFetch(CursorFetch {
                position: csvq_ast::statement::FetchPosition::Next,
                name: identifier("cur"),
                targets: vec!["n".to_string()],
                location: loc(),
            }),
            &mut scope,
            &c,
            &mut SilentOutput,
        )
        .unwrap();
        assert_eq!(scope.get_variable("n").unwrap(), Primary::Integer(1));

        exec_statement(
            &Statement::CursorFetch(CursorFetch {
                position: csvq_ast::statement::FetchPosition::Next,
                name: identifier("cur"),
                targets: vec!["n".to_string()],
                location: loc(),
            }),
            &mut scope,
            &c,
            &mut SilentOutput,
        )
        .unwrap();
        assert_eq!(scope.get_variable("n").unwrap(), Primary::Integer(2));

        exec_statement(
            &Statement::CursorClose(CursorClose {
                name: identifier("cur"),
                location: loc(),
            }),
            &mut scope,
            &c,
            &mut SilentOutput,
        )
        .unwrap();
    }

    #[test]
    fn declared_function_call_returns_its_exit_value() {
        let flags = Flags::default();
        let cancel = CancellationContext::new();
        let loader = StaticTableLoader::new();
        let c = ctx(&flags, &cancel, &loader);
        let mut scope = ScopeChain::new();

        let decl = FunctionDeclaration {
            name: identifier("double"),
            params: vec!["x".to_string()],
            defaults: vec![],
            body: vec![Statement::FlowControl(FlowControl::Exit(Some(QueryExpression::Arithmetic(Box::new(
                csvq_ast::expr::Arithmetic {
                    left: QueryExpression::Variable(csvq_ast::expr::Variable {
                        name: "x".to_string(),
                        location: loc(),
                    }),
                    op: csvq_ast::expr::ArithmeticOperator::Multiply,
                    right: lit(Primary::Integer(2)),
                    location: loc(),
                },
            ))))],
            location: loc(),
        };
        scope.declare_function("double", decl).unwrap();
        scope.declare_variable("result", Primary::Null).unwrap();

        let stmt = Statement::Substitution(Substitution {
            name: "result".to_string(),
            value: QueryExpression::Function(Box::new(csvq_ast::expr::Function {
                name: identifier("double"),
                args: vec![lit(Primary::Integer(21))],
                location: loc(),
            })),
            location: loc(),
        });
        exec_statement(&stmt, &mut scope, &c, &mut SilentOutput).unwrap();
        assert_eq!(scope.get_variable("result").unwrap(), Primary::Integer(42));
    }

    #[test]
    fn declare_table_materializes_the_query_result() {
        let flags = Flags::default();
        let cancel = CancellationContext::new();
        let mut loader = StaticTableLoader::new();
        loader.register("t", values_table(vec![vec![Primary::Integer(1)], vec![Primary::Integer(2)]], &["n"]));
        let c = ctx(&flags, &cancel, &loader);
        let mut scope = ScopeChain::new();

        let stmt = Statement::TableDeclaration(TableDeclaration {
            name: identifier("snap"),
            columns: vec![],
            query: Box::new(select_star_from("t")),
            location: loc(),
        });
        exec_statement(&stmt, &mut scope, &c, &mut SilentOutput).unwrap();

        let view = scope.temp_table("snap").unwrap();
        assert_eq!(view.row_count(), 2);
    }
}
