use core::fmt;

use csvq_value::Primary;

use crate::location::{Located, Location};

/// A literal as it appeared in source, paired with the typed value it
/// denotes (`3.14` parses to `PrimitiveType { value: Primary::Float(3.14), .. }`).
/// Rendering always goes through the typed value so that e.g. `3.0` and
/// `3.` both render canonically, satisfying the round-trip property in §8.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrimitiveType {
    pub value: Primary,
    pub location: Location,
}

impl PrimitiveType {
    pub fn new(value: Primary, location: Location) -> Self {
        PrimitiveType { value, location }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl Located for PrimitiveType {
    fn location(&self) -> &Location {
        &self.location
    }
}
