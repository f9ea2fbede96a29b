//! # csvq-eval
//!
//! The query evaluation engine: scalar values flow in from `csvq-value`,
//! tree shapes flow in from `csvq-ast`, and this crate supplies everything
//! that turns a parsed [`Statement`](csvq_ast::Statement) into rows —
//! views, scope chains, cursors, the SELECT pipeline, and the procedural
//! statement interpreter that drives `VAR`/`IF`/`WHILE`/cursor/function
//! statements around it.
//!
//! This crate defines evaluation only; lexing, parsing, and CSV I/O live
//! elsewhere.

#![deny(unused_imports)]

pub mod config;
pub mod context;
pub mod cursor;
pub mod error;
pub mod eval;
pub mod exec;
pub mod functions;
pub mod groupkey;
pub mod scope;
pub mod select;
pub mod table;
pub mod view;

pub use self::config::{Flags, SessionConfig};
pub use self::context::CancellationContext;
pub use self::cursor::{Cursor, FetchOutcome, FetchPosition};
pub use self::error::{ErrorKind, EvalError, EvalResult};
pub use self::exec::{run_program, Flow, Output};
pub use self::groupkey::GroupKey;
pub use self::scope::ScopeChain;
pub use self::select::{eval_select_query, SelectContext};
pub use self::table::{LineTerminator, StaticTableLoader, TableLoader, TableOrigin, TableWriter, WriteFormat};
pub use self::view::{Cell, ColumnIdentity, Header, Record, RecordSet, View};
