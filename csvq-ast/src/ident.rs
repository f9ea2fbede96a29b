use core::fmt;

use crate::location::{Located, Location};

/// A column, table, or variable name: either bare or back-tick quoted.
/// Quoting affects only rendering, not equality — `` `Col` `` and `Col`
/// name the same identifier.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Identifier {
    pub value: String,
    pub quoted: bool,
    pub location: Location,
}

impl Identifier {
    pub fn new(value: impl Into<String>, location: Location) -> Self {
        Identifier {
            value: value.into(),
            quoted: false,
            location,
        }
    }

    pub fn quoted(value: impl Into<String>, location: Location) -> Self {
        Identifier {
            value: value.into(),
            quoted: true,
            location,
        }
    }

    /// Case-insensitive identifier equality, as used for column/table/
    /// cursor/function name resolution everywhere in the evaluator.
    pub fn eq_ignore_case(&self, other: &str) -> bool {
        self.value.eq_ignore_ascii_case(other)
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.value.eq_ignore_ascii_case(&other.value)
    }
}
impl Eq for Identifier {}

impl core::hash::Hash for Identifier {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.value.to_ascii_uppercase().hash(state)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quoted {
            write!(f, "`{}`", self.value)
        } else {
            f.write_str(&self.value)
        }
    }
}

impl Located for Identifier {
    fn location(&self) -> &Location {
        &self.location
    }
}
