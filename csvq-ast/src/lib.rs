//! # csvq-ast
//!
//! Abstract syntax tree types for the csvq query language: expressions,
//! queries, and procedural statements. Every node carries a [`Location`]
//! recording where it came from in source text, and every node renders
//! back to valid, semantically equivalent source through its
//! [`core::fmt::Display`] implementation.
//!
//! This crate defines structure only; parsing and evaluation live
//! elsewhere.

#![deny(unused_imports)]

pub mod expr;
pub mod ident;
pub mod literal;
pub mod location;
pub mod query;
pub mod statement;
mod utils;

pub use self::expr::QueryExpression;
pub use self::ident::Identifier;
pub use self::literal::PrimitiveType;
pub use self::location::{Located, Location};
pub use self::query::SelectQuery;
pub use self::statement::Statement;

#[cfg(test)]
mod tests {
    use super::*;
    use csvq_value::Primary;

    fn loc() -> Location {
        Location::new(None, 1, 1)
    }

    #[test]
    fn identifier_display_round_trips() {
        let bare = Identifier::new("col1", loc());
        assert_eq!(bare.to_string(), "col1");

        let quoted = Identifier::quoted("col 1", loc());
        assert_eq!(quoted.to_string(), "`col 1`");
    }

    #[test]
    fn identifier_equality_is_case_insensitive() {
        let a = Identifier::new("Column", loc());
        let b = Identifier::new("COLUMN", loc());
        assert_eq!(a, b);
        assert!(a.eq_ignore_case("column"));
    }

    #[test]
    fn primitive_type_display_delegates_to_value() {
        let lit = PrimitiveType::new(Primary::String("it's ok".to_string()), loc());
        assert_eq!(lit.to_string(), "'it''s ok'");
    }

    #[test]
    fn query_expression_comparison_renders_infix() {
        use crate::expr::{Comparison, ComparisonOperator, QueryExpression};

        let left = QueryExpression::Identifier(Identifier::new("a", loc()));
        let right = QueryExpression::Primitive(PrimitiveType::new(Primary::Integer(1), loc()));
        let cmp = QueryExpression::Comparison(Box::new(Comparison {
            left,
            op: ComparisonOperator::Equal,
            right,
            location: loc(),
        }));
        assert_eq!(cmp.to_string(), "a = 1");
    }

    #[test]
    fn select_query_display_assembles_clauses() {
        use crate::query::{From, SelectEntity, SelectItem, SelectSet, TableFactor, TableName, TableReference};

        let entity = SelectEntity {
            distinct: false,
            projection: vec![SelectItem {
                expr: QueryExpression::AllColumns(crate::expr::AllColumns {
                    table: None,
                    location: loc(),
                }),
                alias: None,
                location: loc(),
            }],
            from: Some(From {
                references: vec![TableReference {
                    factor: TableFactor::Table(TableName {
                        name: Identifier::new("data", loc()),
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
        let query = SelectQuery {
            with: None,
            body: SelectSet::Entity(Box::new(entity)),
            order_by: vec![],
            limit: None,
            offset: None,
            location: loc(),
        };
        assert_eq!(query.to_string(), "SELECT * FROM data");
    }
}
