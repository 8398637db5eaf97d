use std::collections::HashSet;
use std::time::Instant;

use rule_types::{Fact, Rule};
use tracing::{debug, info};

use crate::clock::LogicalClock;
use crate::error::EngineResult;
use crate::goal::Goal;
use crate::knowledge_base::{conflict_set, KnowledgeBase};
use crate::result::{InferenceResult, TraceEvent};
use crate::strategies::Strategy;

/// Data-driven inference: repeatedly builds a conflict set, asks the
/// strategy to pick one rule, fires it, and checks the goal, until
/// quiescence, the goal is reached, or every rule has fired once.
pub struct ForwardChaining {
    strategy: Strategy,
}

impl ForwardChaining {
    /// Builds a forward-chaining engine using `strategy` for conflict resolution.
    #[must_use]
    pub const fn new(strategy: Strategy) -> Self {
        Self { strategy }
    }

    /// Runs to quiescence or until `goal` is reached.
    ///
    /// `success` is `true` if the goal was reached mid-run, or — at
    /// quiescence — if no goal was set, or if the goal was already present
    /// in the final fact set.
    pub fn run(&self, kb: &KnowledgeBase, goal: Option<&Goal>, trace: bool) -> EngineResult<InferenceResult> {
        let start = Instant::now();
        let mut facts = kb.facts().clone();
        let mut fired_ids: HashSet<i64> = HashSet::new();
        let mut new_facts = Vec::new();
        let mut fired_rules = Vec::new();
        let mut clock = uses_recency(&self.strategy).then(LogicalClock::new);
        let mut rules_evaluated = 0u64;
        let mut rules_activated = 0u64;
        let mut iteration = 0u64;
        let mut trace_events = trace.then(Vec::new);

        if let Some(c) = clock.as_mut() {
            for fact in &facts {
                c.record(fact.clone(), 0);
            }
        }

        let success = loop {
            iteration += 1;
            let candidates = conflict_set(kb.rules(), &facts, &fired_ids, &mut rules_evaluated);
            rules_activated += candidates.len() as u64;

            if candidates.is_empty() {
                info!(iteration, "forward chaining reached quiescence");
                break goal.map_or(true, |g| g.is_satisfied_by(&facts));
            }

            let empty_clock = LogicalClock::new();
            let clock_ref = clock.as_ref().unwrap_or(&empty_clock);
            let selected = self.strategy.select(&candidates, clock_ref)?;

            let mut produced = None;
            if !facts.contains(selected.conclusion()) {
                let conclusion = selected.conclusion().clone();
                facts.insert(conclusion.clone());
                if let Some(c) = clock.as_mut() {
                    c.record(conclusion.clone(), iteration as u32);
                }
                new_facts.push(conclusion.clone());
                fired_rules.push(selected.clone());
                fired_ids.insert(selected.id());
                produced = Some(conclusion);
                debug!(rule_id = selected.id(), iteration, "rule fired");
            }

            let goal_reached = goal.is_some_and(|g| g.is_satisfied_by(&facts));
            if let Some(events) = trace_events.as_mut() {
                events.push(TraceEvent {
                    iteration,
                    conflict_set_size: candidates.len(),
                    selected_rule_id: Some(selected.id()),
                    produced_fact: produced,
                    goal_reached,
                });
            }

            if goal_reached {
                break true;
            }
        };

        Ok(InferenceResult {
            success,
            facts_count: facts.len(),
            final_facts: facts,
            new_facts,
            fired_rules,
            iterations: iteration,
            duration: start.elapsed(),
            rules_evaluated,
            rules_activated,
            trace: trace_events,
        })
    }
}

/// Forward chaining that fires *every* applicable rule per iteration instead
/// of consulting a strategy to pick one.
///
/// Not available with a seeded strategy: greediness and rule-by-rule
/// conflict resolution are mutually exclusive ways of collapsing a conflict
/// set, so this engine takes no `Strategy` at all.
pub struct GreedyForwardChaining;

impl GreedyForwardChaining {
    /// Builds a greedy forward-chaining engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Runs to quiescence or until `goal` is reached.
    pub fn run(&self, kb: &KnowledgeBase, goal: Option<&Goal>, trace: bool) -> InferenceResult {
        let start = Instant::now();
        let mut facts = kb.facts().clone();
        let mut fired_ids: HashSet<i64> = HashSet::new();
        let mut new_facts = Vec::new();
        let mut fired_rules = Vec::new();
        let mut rules_evaluated = 0u64;
        let mut rules_activated = 0u64;
        let mut iteration = 0u64;
        let mut trace_events = trace.then(Vec::new);

        let success = 'outer: loop {
            iteration += 1;
            let candidates = conflict_set(kb.rules(), &facts, &fired_ids, &mut rules_evaluated);
            rules_activated += candidates.len() as u64;

            if candidates.is_empty() {
                info!(iteration, "greedy forward chaining reached quiescence");
                break goal.map_or(true, |g| g.is_satisfied_by(&facts));
            }

            for rule in candidates.iter().copied() {
                if facts.contains(rule.conclusion()) {
                    continue;
                }
                let conclusion = rule.conclusion().clone();
                facts.insert(conclusion.clone());
                new_facts.push(conclusion.clone());
                fired_rules.push(rule.clone());
                fired_ids.insert(rule.id());
                debug!(rule_id = rule.id(), iteration, "rule fired (greedy)");

                let goal_reached = goal.is_some_and(|g| g.is_satisfied_by(&facts));
                if let Some(events) = trace_events.as_mut() {
                    events.push(TraceEvent {
                        iteration,
                        conflict_set_size: candidates.len(),
                        selected_rule_id: Some(rule.id()),
                        produced_fact: Some(conclusion),
                        goal_reached,
                    });
                }
                if goal_reached {
                    break 'outer true;
                }
            }
        };

        InferenceResult {
            success,
            facts_count: facts.len(),
            final_facts: facts,
            new_facts,
            fired_rules,
            iterations: iteration,
            duration: start.elapsed(),
            rules_evaluated,
            rules_activated,
            trace: trace_events,
        }
    }
}

impl Default for GreedyForwardChaining {
    fn default() -> Self {
        Self::new()
    }
}

fn uses_recency(strategy: &Strategy) -> bool {
    matches!(strategy, Strategy::Recency)
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
    fn two_step_forward_chain() {
        let r1 = rule(1, vec![fact("a", "1")], fact("b", "2"));
        let r2 = rule(2, vec![fact("b", "2")], fact("c", "3"));
        let kb = KnowledgeBase::new(vec![r1.clone(), r2.clone()], Set::from([fact("a", "1")]));

        let engine = ForwardChaining::new(Strategy::First);
        let result = engine.run(&kb, None, false).unwrap();

        assert_eq!(
            result.fired_rules.iter().map(Rule::id).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(result.new_facts, vec![fact("b", "2"), fact("c", "3")]);
        assert_eq!(result.iterations, 3);
        assert!(result.success);
    }

    #[test]
    fn recency_prefers_newer_facts() {
        let r1 = rule(1, vec![fact("a", "1")], fact("b", "1"));
        let r2 = rule(2, vec![fact("a", "1")], fact("c", "1"));
        let r3 = rule(3, vec![fact("b", "1")], fact("d", "1"));
        let kb = KnowledgeBase::new(vec![r1, r2, r3], Set::from([fact("a", "1")]));

        let engine = ForwardChaining::new(Strategy::Recency);
        let result = engine.run(&kb, None, false).unwrap();

        assert_eq!(
            result.fired_rules.iter().map(Rule::id).collect::<Vec<_>>(),
            vec![1, 3, 2]
        );
    }

    #[test]
    fn goal_already_satisfied_short_circuits() {
        let r1 = rule(1, vec![fact("a", "1")], fact("b", "2"));
        let kb = KnowledgeBase::new(vec![r1], Set::from([fact("a", "1"), fact("b", "2")]));
        let goal = Goal::Fact(fact("b", "2"));

        let engine = ForwardChaining::new(Strategy::First);
        let result = engine.run(&kb, Some(&goal), false).unwrap();

        assert!(result.success);
        assert!(result.new_facts.is_empty());
    }

    #[test]
    fn greedy_fires_all_applicable_rules_per_iteration() {
        let r1 = rule(1, vec![fact("a", "1")], fact("b", "1"));
        let r2 = rule(2, vec![fact("a", "1")], fact("c", "1"));
        let kb = KnowledgeBase::new(vec![r1, r2], Set::from([fact("a", "1")]));

        let engine = GreedyForwardChaining::new();
        let result = engine.run(&kb, None, false);

        assert_eq!(result.new_facts.len(), 2);
        assert_eq!(result.iterations, 2);
    }

    #[test]
    fn refractoriness_each_rule_fires_once() {
        let r1 = rule(1, vec![fact("a", "1")], fact("b", "2"));
        let r2 = rule(2, vec![fact("b", "2")], fact("c", "3"));
        let kb = KnowledgeBase::new(vec![r1, r2], Set::from([fact("a", "1")]));

        let engine = ForwardChaining::new(Strategy::First);
        let result = engine.run(&kb, None, false).unwrap();

        let mut ids = result.fired_rules.iter().map(Rule::id).collect::<Vec<_>>();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), result.fired_rules.len());
    }
}
