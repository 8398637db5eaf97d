use std::cell::RefCell;
use std::fmt;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rule_types::Rule;

use crate::clock::LogicalClock;
use crate::error::{EngineError, EngineResult};

/// A pluggable conflict-resolution policy: picks one rule out of a non-empty
/// conflict set.
///
/// Every variant that can yield a multi-rule preference breaks ties by
/// **retaining the first occurrence in conflict-set order** — the conflict
/// set itself is built in knowledge-base insertion order, so this is
/// equivalent to "prefer the rule declared earliest" among equally-preferred
/// candidates.
pub enum Strategy {
    /// Return the first element of the conflict set (FIFO).
    First,
    /// Uniform pick from a seeded, strategy-owned PRNG.
    ///
    /// The generator is seeded once at construction and advanced on every
    /// call, so repeated `select` calls on identical inputs in identical
    /// order reproduce bit-identical selections.
    Random(RefCell<SmallRng>),
    /// Return the rule with the greatest premise count.
    Specificity,
    /// Return the rule whose most-recent premise has the highest logical-clock stamp.
    Recency,
}

impl Strategy {
    /// Builds a `Random` strategy with its own seeded generator.
    #[must_use]
    pub fn random(seed: u64) -> Self {
        Self::Random(RefCell::new(SmallRng::seed_from_u64(seed)))
    }

    /// Selects one rule from `conflict_set`.
    ///
    /// `clock` is consulted only by [`Strategy::Recency`]; other variants
    /// ignore it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EmptyConflictSet`] if `conflict_set` is empty.
    pub fn select<'a>(
        &self,
        conflict_set: &[&'a Rule],
        clock: &LogicalClock,
    ) -> EngineResult<&'a Rule> {
        let Some(&first) = conflict_set.first() else {
            return Err(EngineError::EmptyConflictSet);
        };

        let chosen = match self {
            Self::First => first,
            Self::Random(rng) => {
                let index = rng.borrow_mut().gen_range(0..conflict_set.len());
                conflict_set[index]
            }
            Self::Specificity => first_max_by_key(conflict_set, |rule| rule.len()).unwrap_or(first),
            Self::Recency => {
                first_max_by_key(conflict_set, |rule| clock.max_of(rule.premises())).unwrap_or(first)
            }
        };
        Ok(chosen)
    }
}

/// Like `Iterator::max_by_key`, but keeps the **first** occurrence of the
/// maximum instead of the last — `max_by_key` breaks ties toward the last
/// element, which would violate this module's first-occurrence tie-break rule.
fn first_max_by_key<'a, T: Ord>(conflict_set: &[&'a Rule], key: impl Fn(&Rule) -> T) -> Option<&'a Rule> {
    let mut best: Option<(&'a Rule, T)> = None;
    for &rule in conflict_set {
        let k = key(rule);
        match &best {
            Some((_, best_k)) if k <= *best_k => {}
            _ => best = Some((rule, k)),
        }
    }
    best.map(|(rule, _)| rule)
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => write!(f, "Strategy::First"),
            Self::Random(_) => write!(f, "Strategy::Random(..)"),
            Self::Specificity => write!(f, "Strategy::Specificity"),
            Self::Recency => write!(f, "Strategy::Recency"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rule_types::Fact;

    fn rule(id: i64, n_premises: usize) -> Rule {
        let premises = (0..n_premises)
            .map(|i| Fact::new(format!("p{i}"), "1").unwrap())
            .collect();
        Rule::new(id, premises, Fact::new("c", "1").unwrap()).unwrap()
    }

    #[test]
    fn first_returns_first() {
        let rules = vec![rule(1, 1), rule(2, 1)];
        let refs: Vec<&Rule> = rules.iter().collect();
        let clock = LogicalClock::new();
        let picked = Strategy::First.select(&refs, &clock).unwrap();
        assert_eq!(picked.id(), 1);
    }

    #[test]
    fn specificity_prefers_most_premises() {
        let rules = vec![rule(1, 1), rule(2, 3)];
        let refs: Vec<&Rule> = rules.iter().collect();
        let clock = LogicalClock::new();
        let picked = Strategy::Specificity.select(&refs, &clock).unwrap();
        assert_eq!(picked.id(), 2);
    }

    #[test]
    fn specificity_breaks_ties_toward_first_occurrence() {
        let rules = vec![rule(1, 2), rule(2, 2), rule(3, 1)];
        let refs: Vec<&Rule> = rules.iter().collect();
        let clock = LogicalClock::new();
        let picked = Strategy::Specificity.select(&refs, &clock).unwrap();
        assert_eq!(picked.id(), 1);
    }

    #[test]
    fn recency_breaks_ties_toward_first_occurrence() {
        let rules = vec![rule(1, 1), rule(2, 1)];
        let refs: Vec<&Rule> = rules.iter().collect();
        let mut clock = LogicalClock::new();
        for rule in &rules {
            for premise in rule.premises() {
                clock.record(premise.clone(), 1);
            }
        }
        let picked = Strategy::Recency.select(&refs, &clock).unwrap();
        assert_eq!(picked.id(), 1);
    }

    #[test]
    fn empty_conflict_set_errors() {
        let clock = LogicalClock::new();
        let err = Strategy::First.select(&[], &clock).unwrap_err();
        assert_eq!(err, EngineError::EmptyConflictSet);
    }

    #[test]
    fn random_is_reproducible_with_same_seed() {
        let rules = vec![rule(1, 1), rule(2, 1), rule(3, 1)];
        let refs: Vec<&Rule> = rules.iter().collect();
        let clock = LogicalClock::new();

        let a = Strategy::random(42);
        let b = Strategy::random(42);
        let seq_a: Vec<i64> = (0..5)
            .map(|_| a.select(&refs, &clock).unwrap().id())
            .collect();
        let seq_b: Vec<i64> = (0..5)
            .map(|_| b.select(&refs, &clock).unwrap().id())
            .collect();
        assert_eq!(seq_a, seq_b);
    }
}
