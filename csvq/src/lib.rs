//! # csvq
//!
//! A SQL-over-CSV query engine, assembled from three crates:
//!
//! - [`value`] — the scalar value model (`Primary`, `Ternary`, comparison, `LIKE`).
//! - [`ast`] — the parsed statement and expression tree a frontend hands to the engine.
//! - [`eval`] — views, scopes, cursors, and the evaluator that runs a tree against tables.
//!
//! This crate itself contains no logic; it only re-exports, the same way a
//! CSV-reading or query-planning frontend would depend on it as a single
//! unit instead of pinning each workspace member separately.

#![deny(unused_imports)]

pub use csvq_ast as ast;
pub use csvq_eval as eval;
pub use csvq_value as value;

pub use csvq_ast::{Identifier, Located, Location, PrimitiveType, QueryExpression, SelectQuery, Statement};
pub use csvq_eval::{
    run_program, CancellationContext, Cursor, ErrorKind, EvalError, EvalResult, Flags, Flow,
    GroupKey, Output, ScopeChain, SelectContext, SessionConfig, TableLoader, View,
};
pub use csvq_value::{Primary, Ternary};
