use std::cmp::Ordering;

use csvq_value::Primary;

/// The key a record is partitioned by during `GROUP BY`/`PARTITION BY`.
///
/// Ordinary predicate comparison treats `NULL` as incommensurable with
/// everything, including another `NULL` — but grouping needs every `NULL`
/// in a group-by column to land in the same partition as every other
/// `NULL`. `GroupKey` wraps a row's group-expression values and implements
/// equality/ordering with that grouping-specific rule, kept separate from
/// `csvq_value::compare` so ordinary comparisons are never affected.
#[derive(Clone, Debug)]
pub struct GroupKey(Vec<Primary>);

impl GroupKey {
    pub fn new(values: Vec<Primary>) -> Self {
        GroupKey(values)
    }

    pub fn values(&self) -> &[Primary] {
        &self.0
    }

    fn cmp_component(a: &Primary, b: &Primary) -> Ordering {
        match (a.is_null(), b.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => match csvq_value::compare(a, b) {
                csvq_value::CompareResult::Equal => Ordering::Equal,
                csvq_value::CompareResult::Less => Ordering::Less,
                csvq_value::CompareResult::Greater => Ordering::Greater,
                // Incommensurable values (e.g. a string vs. a boolean) still
                // need a total order so they can share a hash/sort bucket;
                // fall back to their rendered form.
                csvq_value::CompareResult::NotEqual | csvq_value::CompareResult::Incommensurable => {
                    a.to_string().cmp(&b.to_string())
                }
            },
        }
    }
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(other.0.iter())
                .all(|(a, b)| Self::cmp_component(a, b) == Ordering::Equal)
    }
}

impl Eq for GroupKey {}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            match Self::cmp_component(a, b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        self.0.len().cmp(&other.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_equals_null_for_grouping() {
        let a = GroupKey::new(vec![Primary::Null]);
        let b = GroupKey::new(vec![Primary::Null]);
        assert_eq!(a, b);
    }

    #[test]
    fn null_does_not_equal_null_under_ordinary_comparison() {
        use csvq_value::{equal_to, Ternary};
        assert_eq!(equal_to(&Primary::Null, &Primary::Null), Ternary::Unknown);
    }

    #[test]
    fn distinguishes_non_null_groups() {
        let a = GroupKey::new(vec![Primary::Integer(1)]);
        let b = GroupKey::new(vec![Primary::Integer(2)]);
        assert_ne!(a, b);
    }
}
