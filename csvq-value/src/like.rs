use crate::primary::Primary;
use crate::ternary::Ternary;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Tok {
    Char(char),
    /// `_`: matches exactly one rune.
    Single,
    /// `%`: matches zero or more runes.
    Star,
}

/// Decomposes a LIKE pattern into a token stream, honoring `\` escapes:
/// `\%` and `\_` become literal characters, and any other escape keeps both
/// the backslash and the following rune as two literal characters.
fn tokenize(pattern: &str) -> Vec<Tok> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('%') => tokens.push(Tok::Char('%')),
                Some('_') => tokens.push(Tok::Char('_')),
                Some(other) => {
                    tokens.push(Tok::Char('\\'));
                    tokens.push(Tok::Char(other));
                }
                None => tokens.push(Tok::Char('\\')),
            },
            '%' => tokens.push(Tok::Star),
            '_' => tokens.push(Tok::Single),
            other => tokens.push(Tok::Char(other.to_ascii_uppercase())),
        }
    }
    tokens
}

/// Greedy two-pointer wildcard match (equivalent to decomposing the pattern
/// into alternating min/max-rune wildcard runs and fixed literal segments,
/// each literal located via forward substring search): `_` advances both
/// pointers by exactly one rune, `%` opens a backtrack point that can
/// absorb any number of subject runes, and a plain character must match the
/// uppercased subject rune at the current position.
fn matches(subject: &[char], pattern: &[Tok]) -> bool {
    let (mut si, mut pi) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None; // (pattern_idx_after_star, subject_idx_to_retry)

    while si < subject.len() {
        match pattern.get(pi) {
            Some(Tok::Char(c)) if *c == subject[si] => {
                si += 1;
                pi += 1;
            }
            Some(Tok::Single) => {
                si += 1;
                pi += 1;
            }
            Some(Tok::Star) => {
                star = Some((pi + 1, si));
                pi += 1;
            }
            _ => {
                if let Some((resume_pi, resume_si)) = star {
                    pi = resume_pi;
                    si = resume_si + 1;
                    star = Some((resume_pi, si));
                } else {
                    return false;
                }
            }
        }
    }
    while pattern.get(pi) == Some(&Tok::Star) {
        pi += 1;
    }
    pi == pattern.len()
}

/// `S LIKE P`: both operands must coerce to string; any NULL is UNKNOWN.
/// The match itself is case-insensitive.
pub fn like(subject: &Primary, pattern: &Primary) -> Ternary {
    if subject.is_null() || pattern.is_null() {
        return Ternary::Unknown;
    }
    let subject = match subject {
        Primary::String(s) => s,
        _ => return Ternary::Unknown,
    };
    let pattern = match pattern {
        Primary::String(s) => s,
        _ => return Ternary::Unknown,
    };
    let subject_upper: Vec<char> = subject.to_uppercase().chars().collect();
    let tokens = tokenize(pattern);
    Ternary::from_bool(matches(&subject_upper, &tokens))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Primary {
        Primary::String(v.to_string())
    }

    #[test]
    fn s3_scenarios_from_spec() {
        assert_eq!(like(&s("Hello World"), &s("h_llo%")), Ternary::True);
        assert_eq!(like(&s("100%"), &s("100\\%")), Ternary::True);
        assert_eq!(like(&s("NULL"), &Primary::Null), Ternary::Unknown);
    }

    #[test]
    fn underscore_matches_exactly_one_rune() {
        assert_eq!(like(&s("ab"), &s("a_")), Ternary::True);
        assert_eq!(like(&s("abc"), &s("a_")), Ternary::False);
    }

    #[test]
    fn percent_matches_zero_or_more() {
        assert_eq!(like(&s("abc"), &s("a%c")), Ternary::True);
        assert_eq!(like(&s("ac"), &s("a%c")), Ternary::True);
        assert_eq!(like(&s("abbbbc"), &s("a%c")), Ternary::True);
        assert_eq!(like(&s("abd"), &s("a%c")), Ternary::False);
    }

    #[test]
    fn escape_keeps_unrecognized_escapes_literal() {
        // Pattern `a\\b` (an escaped backslash) keeps *both* the backslash
        // and the escaped rune literal per the spec's escape rule, so it
        // matches a subject containing two literal backslashes.
        assert_eq!(like(&s("a\\\\b"), &s("a\\\\b")), Ternary::True);
    }

    #[test]
    fn non_string_operand_is_unknown() {
        assert_eq!(like(&Primary::Integer(1), &s("1")), Ternary::Unknown);
    }
}
