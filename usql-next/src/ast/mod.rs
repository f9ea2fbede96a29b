/// SQL expressions.
pub mod expression;
/// SQL statements.
pub mod statement;

mod data_type;
mod ident;
mod literal;

pub use self::{data_type::*, ident::*, literal::*};
