use std::collections::HashSet;

use rule_types::{Fact, Rule};

/// Rules plus the current fact set.
///
/// A `KnowledgeBase` is the engine's read-only input: rules never change
/// during a run, and the fact set the caller provides is snapshotted rather
/// than mutated in place — every engine in this crate clones the incoming
/// fact set into its own working copy before it starts iterating.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    rules: Vec<Rule>,
    facts: HashSet<Fact>,
}

impl KnowledgeBase {
    /// Builds a knowledge base from a rule list and an initial fact set.
    #[must_use]
    pub const fn new(rules: Vec<Rule>, facts: HashSet<Fact>) -> Self {
        Self { rules, facts }
    }

    /// The rules, in the order they were supplied. This is the order
    /// conflict sets are built in and the order every strategy tie-breaks by.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// A snapshot of the current fact set.
    #[must_use]
    pub const fn facts(&self) -> &HashSet<Fact> {
        &self.facts
    }

    /// Adds a fact to the knowledge base in place.
    pub fn add_fact(&mut self, fact: Fact) {
        self.facts.insert(fact);
    }

    /// Returns `true` if `fact` is already known.
    #[must_use]
    pub fn has_fact(&self, fact: &Fact) -> bool {
        self.facts.contains(fact)
    }

    /// Builds the conflict set over this knowledge base's own rules and its
    /// construction-time fact snapshot. See [`conflict_set`] for the filter
    /// and the meaning of `fired`/`rules_evaluated`.
    pub fn applicable_rules(
        &self,
        fired: &HashSet<i64>,
        rules_evaluated: &mut u64,
    ) -> Vec<&Rule> {
        conflict_set(&self.rules, &self.facts, fired, rules_evaluated)
    }
}

/// Builds the conflict set: rules (from `rules`) whose premises are all
/// satisfied by `facts`, whose conclusion is not already in `facts`, and
/// whose id is not in `fired` (refractoriness). Preserves `rules`' order.
///
/// Each candidate rule bumps `rules_evaluated`; callers pass a mutable
/// counter so engines can track this metric without a second pass.
///
/// Shared by every engine that needs a conflict set: [`KnowledgeBase::applicable_rules`]
/// calls it over the whole knowledge base, while forward chaining and
/// clustered forward chaining call it directly over a facts set that grows
/// across iterations (and, for the clustered engine, a single cluster's rule
/// slice rather than the full rule list).
pub(crate) fn conflict_set<'a>(
    rules: &'a [Rule],
    facts: &HashSet<Fact>,
    fired: &HashSet<i64>,
    rules_evaluated: &mut u64,
) -> Vec<&'a Rule> {
    rules
        .iter()
        .filter(|rule| {
            *rules_evaluated += 1;
            !fired.contains(&rule.id()) && rule.is_satisfied_by(facts) && !facts.contains(rule.conclusion())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(a: &str, v: &str) -> Fact {
        Fact::new(a, v).unwrap()
    }

    fn rule(id: i64, premise: Fact, conclusion: Fact) -> Rule {
        Rule::new(id, vec![premise], conclusion).unwrap()
    }

    #[test]
    fn applicable_rules_respects_refractoriness() {
        let kb = KnowledgeBase::new(
            vec![rule(1, fact("a", "1"), fact("b", "2"))],
            HashSet::from([fact("a", "1")]),
        );
        let mut evaluated = 0;
        let fired = HashSet::from([1]);
        assert!(kb.applicable_rules(&fired, &mut evaluated).is_empty());
        assert_eq!(evaluated, 1);
    }

    #[test]
    fn applicable_rules_excludes_known_conclusions() {
        let kb = KnowledgeBase::new(
            vec![rule(1, fact("a", "1"), fact("b", "2"))],
            HashSet::from([fact("a", "1"), fact("b", "2")]),
        );
        let mut evaluated = 0;
        assert!(kb
            .applicable_rules(&HashSet::new(), &mut evaluated)
            .is_empty());
    }
}
