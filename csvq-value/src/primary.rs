use core::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};

use crate::ternary::Ternary;

/// An instant with nanosecond precision and a UTC offset ("a location" per
/// the data model). Dates without a time component are normalized to
/// midnight; dates without an explicit offset are attached to UTC.
pub type Datetime = DateTime<FixedOffset>;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// A dynamically-typed scalar value: the unit of data the evaluator passes
/// between expressions, cells, and cursor rows.
///
/// A `Primary` is immutable once constructed; there is no variant for "this
/// value has no type yet" other than `Null`, which is a first-class value
/// distinct from "absent".
#[derive(Clone, Debug, PartialEq)]
pub enum Primary {
    /// UTF-8 text.
    String(String),
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit IEEE-754 float.
    Float(f64),
    /// A plain two-valued boolean, as produced by e.g. a native `BOOLEAN` column.
    Boolean(bool),
    /// Three-valued logical truth, as produced by predicate evaluation.
    Ternary(Ternary),
    /// An instant with nanosecond precision and an offset.
    Datetime(Datetime),
    /// SQL NULL.
    Null,
}

impl Primary {
    /// Shorthand for `Primary::Ternary(Ternary::from_bool(b))`, used when a
    /// predicate's result is already known to be two-valued.
    pub fn from_bool(b: bool) -> Self {
        Primary::Ternary(Ternary::from_bool(b))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Primary::Null)
    }

    /// The "to ternary" projection used whenever a value appears in boolean
    /// context (WHERE/HAVING/CASE WHEN/…): strings parse as bool when
    /// possible else UNKNOWN; 0/1 integers and floats map to FALSE/TRUE else
    /// UNKNOWN; datetime is always UNKNOWN; null is UNKNOWN.
    pub fn to_ternary(&self) -> Ternary {
        match self {
            Primary::Null => Ternary::Unknown,
            Primary::Ternary(t) => *t,
            Primary::Boolean(b) => Ternary::from_bool(*b),
            Primary::Integer(0) => Ternary::False,
            Primary::Integer(1) => Ternary::True,
            Primary::Integer(_) => Ternary::Unknown,
            Primary::Float(f) if *f == 0.0 => Ternary::False,
            Primary::Float(f) if *f == 1.0 => Ternary::True,
            Primary::Float(_) => Ternary::Unknown,
            Primary::Datetime(_) => Ternary::Unknown,
            Primary::String(s) => match s.trim().to_ascii_uppercase().as_str() {
                "TRUE" => Ternary::True,
                "FALSE" => Ternary::False,
                _ => Ternary::Unknown,
            },
        }
    }

    /// Coerces to `f64` when the value is numeric or a numeric-looking string.
    pub fn try_to_float(&self) -> Option<f64> {
        match self {
            Primary::Integer(i) => Some(*i as f64),
            Primary::Float(f) => Some(*f),
            Primary::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Coerces to `i64` only when the value is already an exact integer
    /// (used by arithmetic to decide whether `+ - * %` should stay integral).
    pub fn try_to_integer(&self) -> Option<i64> {
        match self {
            Primary::Integer(i) => Some(*i),
            Primary::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    /// Coerces to a two-valued boolean. `Ternary::Unknown` does not coerce:
    /// booleans are a strictly two-valued domain.
    pub fn try_to_boolean(&self) -> Option<bool> {
        match self {
            Primary::Boolean(b) => Some(*b),
            Primary::Ternary(Ternary::True) => Some(true),
            Primary::Ternary(Ternary::False) => Some(false),
            Primary::Ternary(Ternary::Unknown) => None,
            Primary::Integer(0) => Some(false),
            Primary::Integer(1) => Some(true),
            Primary::Float(f) if *f == 0.0 => Some(false),
            Primary::Float(f) if *f == 1.0 => Some(true),
            Primary::String(s) => match s.trim().to_ascii_uppercase().as_str() {
                "TRUE" => Some(true),
                "FALSE" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Coerces to a `Datetime`, accepting an already-typed datetime or a
    /// string in one of a handful of common SQL literal formats.
    pub fn try_to_datetime(&self) -> Option<Datetime> {
        match self {
            Primary::Datetime(dt) => Some(*dt),
            Primary::String(s) => parse_datetime(s.trim()),
            _ => None,
        }
    }

    /// Always-succeeding string coercion, used by `||` (Concat) which
    /// stringifies any non-NULL operand rather than rejecting it.
    pub fn to_display_string(&self) -> String {
        match self {
            Primary::String(s) => s.clone(),
            Primary::Integer(i) => i.to_string(),
            Primary::Float(f) => format_float(*f),
            Primary::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Primary::Ternary(t) => t.to_string(),
            Primary::Datetime(dt) => dt.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
            Primary::Null => String::new(),
        }
    }
}

fn parse_datetime(s: &str) -> Option<Datetime> {
    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return FixedOffset::east_opt(0)?.from_local_datetime(&naive).single();
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let naive = date.and_hms_opt(0, 0, 0)?;
        return FixedOffset::east_opt(0)?.from_local_datetime(&naive).single();
    }
    None
}

fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.is_finite() {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

/// Renders single-quoted literals for String/Datetime, `NULL` for Null,
/// `TRUE`/`FALSE`/`UNKNOWN` for Ternary, and unambiguous numeric literals
/// for Integer/Float, matching §3.1's invariant.
impl fmt::Display for Primary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primary::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Primary::Integer(i) => write!(f, "{}", i),
            Primary::Float(v) => write!(f, "{}", format_float(*v)),
            Primary::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Primary::Ternary(t) => write!(f, "{}", t),
            Primary::Datetime(dt) => write!(f, "'{}'", dt.format("%Y-%m-%d %H:%M:%S%.f")),
            Primary::Null => f.write_str("NULL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_ternary_projection_rules() {
        assert_eq!(Primary::Null.to_ternary(), Ternary::Unknown);
        assert_eq!(Primary::Integer(1).to_ternary(), Ternary::True);
        assert_eq!(Primary::Integer(0).to_ternary(), Ternary::False);
        assert_eq!(Primary::Integer(7).to_ternary(), Ternary::Unknown);
        assert_eq!(Primary::Float(1.0).to_ternary(), Ternary::True);
        assert_eq!(Primary::Datetime(parse_datetime("2020-01-01").unwrap()).to_ternary(), Ternary::Unknown);
        assert_eq!(Primary::String("true".into()).to_ternary(), Ternary::True);
        assert_eq!(Primary::String("nope".into()).to_ternary(), Ternary::Unknown);
    }

    #[test]
    fn display_renders_quoted_literals() {
        assert_eq!(Primary::String("ab'c".into()).to_string(), "'ab''c'");
        assert_eq!(Primary::Null.to_string(), "NULL");
        assert_eq!(Primary::Ternary(Ternary::Unknown).to_string(), "UNKNOWN");
        assert_eq!(Primary::Integer(42).to_string(), "42");
        assert_eq!(Primary::Float(1.0).to_string(), "1.0");
    }

    #[test]
    fn try_to_float_coerces_numeric_strings() {
        assert_eq!(Primary::String(" 3.5 ".into()).try_to_float(), Some(3.5));
        assert_eq!(Primary::String("abc".into()).try_to_float(), None);
        assert_eq!(Primary::Boolean(true).try_to_float(), None);
    }
}
