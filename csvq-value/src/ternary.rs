use core::fmt;

/// Three-valued logical truth: `TRUE`, `FALSE`, or `UNKNOWN`.
///
/// `UNKNOWN` is what SQL predicates evaluate to when a NULL makes the result
/// indeterminate; it is distinct from a missing value (`Primary::Null`)
/// even though the two frequently travel together.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Ternary {
    True,
    False,
    Unknown,
}

impl Ternary {
    /// `parseBool(true) = TRUE`, `parseBool(false) = FALSE`.
    pub fn from_bool(b: bool) -> Self {
        if b {
            Ternary::True
        } else {
            Ternary::False
        }
    }

    /// `TRUE` iff the value is `Ternary::True`; `UNKNOWN` is not truthy.
    pub fn is_true(self) -> bool {
        matches!(self, Ternary::True)
    }

    /// Kleene AND.
    pub fn and(self, other: Ternary) -> Ternary {
        use Ternary::*;
        match (self, other) {
            (False, _) | (_, False) => False,
            (True, True) => True,
            _ => Unknown,
        }
    }

    /// Kleene OR.
    pub fn or(self, other: Ternary) -> Ternary {
        use Ternary::*;
        match (self, other) {
            (True, _) | (_, True) => True,
            (False, False) => False,
            _ => Unknown,
        }
    }

    /// Kleene NOT.
    pub fn not(self) -> Ternary {
        match self {
            Ternary::True => Ternary::False,
            Ternary::False => Ternary::True,
            Ternary::Unknown => Ternary::Unknown,
        }
    }

    /// XOR, defined as UNKNOWN whenever either side is UNKNOWN.
    pub fn xor(self, other: Ternary) -> Ternary {
        use Ternary::*;
        match (self, other) {
            (Unknown, _) | (_, Unknown) => Unknown,
            (a, b) => Ternary::from_bool((a == True) != (b == True)),
        }
    }
}

impl fmt::Display for Ternary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Ternary::True => "TRUE",
            Ternary::False => "FALSE",
            Ternary::Unknown => "UNKNOWN",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Ternary::*;

    const ALL: [Ternary; 3] = [True, False, Unknown];

    #[test]
    fn and_matches_kleene_truth_table() {
        for &p in &ALL {
            for &q in &ALL {
                let expected = match (p, q) {
                    (False, _) | (_, False) => False,
                    (True, True) => True,
                    _ => Unknown,
                };
                assert_eq!(p.and(q), expected, "{:?} AND {:?}", p, q);
            }
        }
    }

    #[test]
    fn or_matches_kleene_truth_table() {
        for &p in &ALL {
            for &q in &ALL {
                let expected = match (p, q) {
                    (True, _) | (_, True) => True,
                    (False, False) => False,
                    _ => Unknown,
                };
                assert_eq!(p.or(q), expected, "{:?} OR {:?}", p, q);
            }
        }
    }

    #[test]
    fn not_matches_kleene_truth_table() {
        assert_eq!(True.not(), False);
        assert_eq!(False.not(), True);
        assert_eq!(Unknown.not(), Unknown);
    }

    #[test]
    fn xor_is_unknown_whenever_either_side_is_unknown() {
        for &p in &ALL {
            assert_eq!(p.xor(Unknown), Unknown);
            assert_eq!(Unknown.xor(p), Unknown);
        }
        assert_eq!(True.xor(True), False);
        assert_eq!(True.xor(False), True);
        assert_eq!(False.xor(False), False);
    }

    #[test]
    fn from_bool_round_trips() {
        assert_eq!(Ternary::from_bool(true), True);
        assert_eq!(Ternary::from_bool(false), False);
    }
}
