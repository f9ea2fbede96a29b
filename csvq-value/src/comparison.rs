use crate::primary::Primary;
use crate::ternary::Ternary;

/// The outcome of comparing two [`Primary`] values, before an operator
/// (`=`, `<`, …) narrows it down to a two-valued result.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CompareResult {
    Equal,
    NotEqual,
    Less,
    Greater,
    /// Neither operand could be coerced into a shared comparison domain
    /// (or either operand was NULL).
    Incommensurable,
}

/// Cross-type ordering using the first coercion domain both operands agree
/// on: float, then datetime, then boolean (equality only), then
/// case-insensitive string. Either operand NULL is always Incommensurable.
pub fn compare(a: &Primary, b: &Primary) -> CompareResult {
    if a.is_null() || b.is_null() {
        return CompareResult::Incommensurable;
    }
    if let (Some(x), Some(y)) = (a.try_to_float(), b.try_to_float()) {
        return from_ordering(x.partial_cmp(&y));
    }
    if let (Some(x), Some(y)) = (a.try_to_datetime(), b.try_to_datetime()) {
        return from_ordering(x.partial_cmp(&y));
    }
    if let (Some(x), Some(y)) = (a.try_to_boolean(), b.try_to_boolean()) {
        return if x == y {
            CompareResult::Equal
        } else {
            CompareResult::NotEqual
        };
    }
    if let (Primary::String(x), Primary::String(y)) = (a, b) {
        let (x, y) = (x.to_uppercase(), y.to_uppercase());
        return from_ordering(x.partial_cmp(&y));
    }
    CompareResult::Incommensurable
}

fn from_ordering(ord: Option<core::cmp::Ordering>) -> CompareResult {
    use core::cmp::Ordering::*;
    match ord {
        Some(Equal) => CompareResult::Equal,
        Some(Less) => CompareResult::Less,
        Some(Greater) => CompareResult::Greater,
        None => CompareResult::Incommensurable,
    }
}

/// `=`: TRUE iff Equal.
pub fn equal_to(a: &Primary, b: &Primary) -> Ternary {
    dispatch(a, b, |r| r == CompareResult::Equal)
}

/// `<>` / `!=`: TRUE iff NotEqual.
pub fn not_equal_to(a: &Primary, b: &Primary) -> Ternary {
    dispatch(a, b, |r| r == CompareResult::NotEqual)
}

/// `<`: requires an ordering domain; boolean comparisons are never ordered.
pub fn less_than(a: &Primary, b: &Primary) -> Ternary {
    dispatch(a, b, |r| r == CompareResult::Less)
}

/// `>`
pub fn greater_than(a: &Primary, b: &Primary) -> Ternary {
    dispatch(a, b, |r| r == CompareResult::Greater)
}

/// `<=`
pub fn less_than_or_equal(a: &Primary, b: &Primary) -> Ternary {
    dispatch(a, b, |r| matches!(r, CompareResult::Less | CompareResult::Equal))
}

/// `>=`
pub fn greater_than_or_equal(a: &Primary, b: &Primary) -> Ternary {
    dispatch(a, b, |r| matches!(r, CompareResult::Greater | CompareResult::Equal))
}

fn dispatch(a: &Primary, b: &Primary, matches_result: impl Fn(CompareResult) -> bool) -> Ternary {
    match compare(a, b) {
        CompareResult::Incommensurable => Ternary::Unknown,
        r => Ternary::from_bool(matches_result(r)),
    }
}

/// Null-safe equality: TRUE when both operands are NULL, otherwise delegates
/// to `equal_to`.
pub fn equivalent_to(a: &Primary, b: &Primary) -> Ternary {
    if a.is_null() && b.is_null() {
        return Ternary::True;
    }
    equal_to(a, b)
}

/// Compares the ternary projections of both operands directly, used for
/// `IS TRUE`, `IS UNKNOWN`, `IS NULL`, etc.
pub fn is(a: &Primary, b: &Primary) -> Ternary {
    Ternary::from_bool(a.to_ternary() == b.to_ternary())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_always_incommensurable() {
        assert_eq!(compare(&Primary::Null, &Primary::Integer(1)), CompareResult::Incommensurable);
        assert_eq!(compare(&Primary::Integer(1), &Primary::Null), CompareResult::Incommensurable);
    }

    #[test]
    fn numeric_comparison_is_total_within_type() {
        let pairs = [(1i64, 1i64), (1, 2), (2, 1), (-5, 5)];
        for (x, y) in pairs {
            let r = compare(&Primary::Integer(x), &Primary::Integer(y));
            assert!(matches!(
                r,
                CompareResult::Equal | CompareResult::Less | CompareResult::Greater
            ));
            assert_eq!(r == CompareResult::Equal, x == y);
            assert_eq!(r == CompareResult::Less, x < y);
            assert_eq!(r == CompareResult::Greater, x > y);
        }
    }

    #[test]
    fn booleans_are_unordered() {
        assert_eq!(less_than(&Primary::Boolean(true), &Primary::Boolean(false)), Ternary::Unknown);
        assert_eq!(equal_to(&Primary::Boolean(true), &Primary::Boolean(true)), Ternary::True);
    }

    #[test]
    fn strings_compare_case_insensitively() {
        assert_eq!(
            equal_to(&Primary::String("abc".into()), &Primary::String("ABC".into())),
            Ternary::True
        );
    }

    #[test]
    fn equivalent_to_is_null_safe() {
        assert_eq!(equivalent_to(&Primary::Null, &Primary::Null), Ternary::True);
        assert_eq!(equivalent_to(&Primary::Null, &Primary::Integer(1)), Ternary::Unknown);
    }

    #[test]
    fn is_compares_ternary_projections() {
        assert_eq!(is(&Primary::Null, &Primary::Ternary(Ternary::Unknown)), Ternary::True);
        assert_eq!(is(&Primary::Integer(1), &Primary::Boolean(true)), Ternary::True);
    }
}
