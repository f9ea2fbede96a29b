//! # csvq-value
//!
//! The scalar value model underlying the evaluator: `Primary`, three-valued
//! `Ternary` logic, cross-type comparison, and the `LIKE` pattern matcher.

#![deny(unused_imports)]

mod comparison;
mod like;
mod primary;
mod ternary;

pub use self::{
    comparison::{
        compare, equal_to, equivalent_to, greater_than, greater_than_or_equal, is, less_than,
        less_than_or_equal, not_equal_to, CompareResult,
    },
    like::like,
    primary::{Datetime, Primary},
    ternary::Ternary,
};
