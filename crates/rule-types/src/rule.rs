use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::fact::Fact;

/// Reserved id range for synthetic centroid rules produced by the clusterer.
///
/// Centroid rules receive ids `CENTROID_ID_BASE + cluster_index` so they can
/// never collide with data-derived rule ids, which are expected to stay well
/// below this range in practice.
pub const CENTROID_ID_BASE: RuleId = 1_000_000;

/// A rule's identifier.
///
/// Stored as a signed integer (rather than `u32`/`u64`) so that a negative
/// id arriving from deserialized input is representable and can be rejected
/// by [`Rule::new`] with [`TypeError::InvalidRule`], instead of failing
/// earlier and less informatively during JSON parsing.
pub type RuleId = i64;

/// An immutable IF-THEN rule: a non-empty ordered list of premises and a
/// single conclusion fact.
///
/// Premise order is preserved for rendering and tracing, but satisfaction
/// (see [`Rule::is_satisfied_by`]) is set-like: order does not affect whether
/// a rule is applicable.
///
/// # Examples
///
/// ```
/// use rule_types::{Fact, Rule};
///
/// let premises = vec![Fact::new("fever", "yes").unwrap()];
/// let conclusion = Fact::new("diagnosis", "flu").unwrap();
/// let rule = Rule::new(1, premises, conclusion).unwrap();
/// assert_eq!(rule.len(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rule {
    id: RuleId,
    premises: Vec<Fact>,
    conclusion: Fact,
}

impl Rule {
    /// Builds a new rule.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::InvalidRule`] if `id` is negative or `premises`
    /// is empty.
    pub fn new(id: RuleId, premises: Vec<Fact>, conclusion: Fact) -> Result<Self, TypeError> {
        if id < 0 {
            return Err(TypeError::invalid_rule("id must be non-negative"));
        }
        if premises.is_empty() {
            return Err(TypeError::invalid_rule("premises cannot be empty"));
        }
        Ok(Self { id, premises, conclusion })
    }

    /// The rule's id.
    #[must_use]
    pub const fn id(&self) -> RuleId {
        self.id
    }

    /// The rule's premises, in declaration order.
    #[must_use]
    pub fn premises(&self) -> &[Fact] {
        &self.premises
    }

    /// The rule's conclusion.
    #[must_use]
    pub const fn conclusion(&self) -> &Fact {
        &self.conclusion
    }

    /// The number of premises. Used by the `Specificity` strategy.
    #[must_use]
    #[allow(clippy::len_without_is_empty)] // premises are guaranteed non-empty by construction
    pub fn len(&self) -> usize {
        self.premises.len()
    }

    /// Returns `true` iff every premise of this rule is a member of `facts`.
    ///
    /// This is the hot predicate evaluated once per rule, per iteration, by
    /// every inference engine; it is expected `O(|premises|)` given a hashed
    /// fact set.
    #[must_use]
    pub fn is_satisfied_by(&self, facts: &std::collections::HashSet<Fact>) -> bool {
        self.premises.iter().all(|premise| facts.contains(premise))
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let premises_str = self
            .premises
            .iter()
            .map(|p| format!("{}={}", p.attribute(), p.value()))
            .collect::<Vec<_>>()
            .join(" AND ");
        write!(
            f,
            "Rule({}): IF {} THEN {}={}",
            self.id,
            premises_str,
            self.conclusion.attribute(),
            self.conclusion.value()
        )
    }
}
