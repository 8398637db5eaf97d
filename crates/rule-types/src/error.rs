use thiserror::Error;

/// Errors raised while constructing the core data model.
///
/// Both variants are construction-time failures: a `Fact` or `Rule` that fails
/// to build never exists, so callers see the error immediately rather than
/// discovering an invalid value later during inference.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// A `Fact` was constructed with an empty attribute or value string.
    #[error("fact field cannot be empty: {field}")]
    EmptyField {
        /// Which field was empty (`"attribute"` or `"value"`).
        field: &'static str,
    },

    /// A `Rule` was constructed with a negative id or an empty premise list.
    #[error("invalid rule: {reason}")]
    InvalidRule {
        /// Human-readable explanation of why the rule is invalid.
        reason: String,
    },
}

impl TypeError {
    /// Builds an [`TypeError::EmptyField`] for the given field name.
    #[must_use]
    pub const fn empty_field(field: &'static str) -> Self {
        Self::EmptyField { field }
    }

    /// Builds an [`TypeError::InvalidRule`] with the given reason.
    #[must_use]
    pub fn invalid_rule(reason: impl Into<String>) -> Self {
        Self::InvalidRule { reason: reason.into() }
    }
}
