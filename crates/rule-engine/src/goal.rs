use rule_types::Fact;

/// A forward-chaining stop condition.
///
/// Forward chaining accepts either shape; backward chaining only ever
/// accepts [`Goal::Fact`] (see [`crate::error::EngineError::GoalUnsupported`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Goal {
    /// Stop once this exact fact has been inferred.
    Fact(Fact),
    /// Stop once any fact with this attribute has been inferred.
    Attribute(String),
}

impl Goal {
    /// Returns `true` if `facts` already satisfies this goal.
    #[must_use]
    pub fn is_satisfied_by(&self, facts: &std::collections::HashSet<Fact>) -> bool {
        match self {
            Self::Fact(goal_fact) => facts.contains(goal_fact),
            Self::Attribute(attribute) => facts.iter().any(|f| f.attribute() == attribute),
        }
    }

    /// The concrete fact goal, if this is one.
    #[must_use]
    pub const fn as_fact(&self) -> Option<&Fact> {
        match self {
            Self::Fact(fact) => Some(fact),
            Self::Attribute(_) => None,
        }
    }
}
