use std::collections::HashSet;
use std::time::Instant;

use rule_types::{Fact, Rule};
use tracing::debug;

use crate::clock::LogicalClock;
use crate::error::{EngineError, EngineResult};
use crate::knowledge_base::KnowledgeBase;
use crate::result::InferenceResult;
use crate::strategies::Strategy;

/// Goal-driven inference: recursively proves the premises of rules whose
/// conclusion is the current goal, backtracking across *competitive rules*
/// (rules sharing that conclusion) and guarding against cycles.
pub struct BackwardChaining {
    strategy: Strategy,
}

impl BackwardChaining {
    /// Builds a backward-chaining engine. The strategy orders competitive
    /// rules at each goal (see [`BackwardChaining::run`]); it never reads the
    /// logical clock unless it is [`Strategy::Recency`], in which case the
    /// clock only ever reflects the initial fact set (backward chaining does
    /// not iterate, so there is no later iteration to stamp).
    #[must_use]
    pub const fn new(strategy: Strategy) -> Self {
        Self { strategy }
    }

    /// Attempts to prove `goal` against `kb`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::GoalUnsupported`] — this engine only accepts a
    /// concrete fact goal; reject attribute-name goals at the call site
    /// ([`EngineError::GoalRequired`] for a missing goal is enforced by the
    /// caller, typically config validation, before `run` is even invoked).
    pub fn run(&self, kb: &KnowledgeBase, goal: &Fact) -> EngineResult<InferenceResult> {
        let start = Instant::now();
        let mut state = ProofState {
            facts: kb.facts().clone(),
            proof_path: HashSet::new(),
            new_facts: Vec::new(),
            fired_rules: Vec::new(),
            rules_evaluated: 0,
            rules_activated: 0,
            max_depth: 0,
            strategy: &self.strategy,
            clock: LogicalClock::new(),
        };

        let success = prove(kb.rules(), goal, 0, &mut state)?;

        Ok(InferenceResult {
            success,
            facts_count: state.facts.len(),
            final_facts: state.facts,
            new_facts: state.new_facts,
            iterations: state.fired_rules.len() as u64,
            fired_rules: state.fired_rules,
            duration: start.elapsed(),
            rules_evaluated: state.rules_evaluated,
            rules_activated: state.rules_activated,
            trace: None,
        })
    }
}

struct ProofState<'a> {
    facts: HashSet<Fact>,
    proof_path: HashSet<Fact>,
    new_facts: Vec<Fact>,
    fired_rules: Vec<Rule>,
    rules_evaluated: u64,
    rules_activated: u64,
    max_depth: usize,
    strategy: &'a Strategy,
    clock: LogicalClock,
}

fn prove(rules: &[Rule], goal: &Fact, depth: usize, state: &mut ProofState<'_>) -> EngineResult<bool> {
    state.max_depth = state.max_depth.max(depth);

    if state.facts.contains(goal) {
        return Ok(true);
    }
    if state.proof_path.contains(goal) {
        debug!(goal = %goal, "cycle detected, backtracking");
        return Ok(false);
    }

    state.proof_path.insert(goal.clone());

    let competitive: Vec<&Rule> = rules
        .iter()
        .inspect(|_| state.rules_evaluated += 1)
        .filter(|rule| rule.conclusion() == goal)
        .collect();
    state.rules_activated += competitive.len() as u64;

    if competitive.is_empty() {
        state.proof_path.remove(goal);
        return Ok(false);
    }

    let ordered = order_by_strategy(competitive, state.strategy, &state.clock)?;

    for rule in ordered {
        let mut all_proved = true;
        for premise in rule.premises() {
            if !prove(rules, premise, depth + 1, state)? {
                all_proved = false;
                break;
            }
        }
        if all_proved {
            state.facts.insert(goal.clone());
            state.new_facts.push(goal.clone());
            state.fired_rules.push(rule.clone());
            state.proof_path.remove(goal);
            return Ok(true);
        }
    }

    state.proof_path.remove(goal);
    Ok(false)
}

/// Repeatedly calls the strategy's `select` on the shrinking remainder of
/// `competitive`, producing a deterministic exploration order.
fn order_by_strategy<'a>(
    mut competitive: Vec<&'a Rule>,
    strategy: &Strategy,
    clock: &LogicalClock,
) -> EngineResult<Vec<&'a Rule>> {
    let mut ordered = Vec::with_capacity(competitive.len());
    while !competitive.is_empty() {
        let selected = strategy.select(&competitive, clock)?;
        let selected_id = selected.id();
        let position = competitive
            .iter()
            .position(|r| r.id() == selected_id)
            .expect("select must return an element of its input");
        ordered.push(competitive.remove(position));
    }
    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet as Set;

    fn fact(a: &str, v: &str) -> Fact {
        Fact::new(a, v).unwrap()
    }

    fn rule(id: i64, premises: Vec<Fact>, conclusion: Fact) -> Rule {
        Rule::new(id, premises, conclusion).unwrap()
    }

    #[test]
    fn cycle_guard_prevents_infinite_recursion() {
        let r1 = rule(1, vec![fact("a", "1")], fact("b", "1"));
        let r2 = rule(2, vec![fact("b", "1")], fact("a", "1"));
        let kb = KnowledgeBase::new(vec![r1, r2], Set::new());

        let engine = BackwardChaining::new(Strategy::First);
        let result = engine.run(&kb, &fact("c", "1")).unwrap();

        assert!(!result.success);
        assert!(result.fired_rules.is_empty());
    }

    #[test]
    fn goal_already_known_succeeds_with_no_firing() {
        let kb = KnowledgeBase::new(vec![], Set::from([fact("a", "1")]));
        let engine = BackwardChaining::new(Strategy::First);
        let result = engine.run(&kb, &fact("a", "1")).unwrap();

        assert!(result.success);
        assert!(result.fired_rules.is_empty());
    }

    #[test]
    fn proves_goal_via_chained_premises() {
        let r1 = rule(1, vec![fact("a", "1")], fact("b", "1"));
        let r2 = rule(2, vec![fact("b", "1")], fact("c", "1"));
        let kb = KnowledgeBase::new(vec![r1, r2], Set::from([fact("a", "1")]));

        let engine = BackwardChaining::new(Strategy::First);
        let result = engine.run(&kb, &fact("c", "1")).unwrap();

        assert!(result.success);
        assert_eq!(result.fired_rules.len(), 2);
    }
}
