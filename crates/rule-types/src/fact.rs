use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A single `(attribute, value)` pair — the atomic unit of information in the
/// knowledge base.
///
/// A `Fact` is immutable once built and carries no identity beyond its
/// content: two facts built from equal strings compare, hash, and print
/// identically. This makes `Fact` safe to use as a `HashSet`/`HashMap` key,
/// which the engine relies on throughout the inference loop.
///
/// # Examples
///
/// ```
/// use rule_types::Fact;
///
/// let fact = Fact::new("temperature", "high").unwrap();
/// assert_eq!(fact.attribute(), "temperature");
/// assert_eq!(fact.value(), "high");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fact {
    attribute: String,
    value: String,
}

impl Fact {
    /// Builds a new fact from an attribute name and a value.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::EmptyField`] if either `attribute` or `value` is
    /// an empty string.
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Result<Self, TypeError> {
        let attribute = attribute.into();
        let value = value.into();
        if attribute.is_empty() {
            return Err(TypeError::empty_field("attribute"));
        }
        if value.is_empty() {
            return Err(TypeError::empty_field("value"));
        }
        Ok(Self { attribute, value })
    }

    /// The attribute name.
    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// The attribute's value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl PartialEq for Fact {
    fn eq(&self, other: &Self) -> bool {
        self.attribute == other.attribute && self.value == other.value
    }
}

impl Eq for Fact {}

impl Hash for Fact {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.attribute.hash(state);
        self.value.hash(state);
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fact({}={})", self.attribute, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_attribute() {
        assert_eq!(
            Fact::new("", "x").unwrap_err(),
            TypeError::empty_field("attribute")
        );
    }

    #[test]
    fn rejects_empty_value() {
        assert_eq!(
            Fact::new("a", "").unwrap_err(),
            TypeError::empty_field("value")
        );
    }

    #[test]
    fn equality_is_componentwise() {
        let a = Fact::new("temp", "high").unwrap();
        let b = Fact::new("temp", "high").unwrap();
        let c = Fact::new("temp", "low").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn hashable_in_set() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(Fact::new("a", "1").unwrap());
        set.insert(Fact::new("a", "1").unwrap());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn display_matches_source_repr() {
        let fact = Fact::new("a", "1").unwrap();
        assert_eq!(fact.to_string(), "Fact(a=1)");
    }
}
