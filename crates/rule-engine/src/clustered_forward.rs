use std::collections::HashSet;
use std::time::Instant;

use rule_types::Fact;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::LogicalClock;
use crate::clustering::RuleCluster;
use crate::error::EngineResult;
use crate::goal::Goal;
use crate::knowledge_base::{conflict_set, KnowledgeBase};
use crate::result::{InferenceResult, TraceEvent};
use crate::strategies::Strategy;

/// Algorithm 2: argmax centroid match. Replaces forward chaining's
/// "scan every rule" step with a two-stage filter over precomputed clusters
/// — each iteration checks only the single cluster whose centroid best
/// matches the current fact set, skipping the rest.
pub struct ClusteredForwardChaining<'a> {
    strategy: Strategy,
    clusters: &'a [RuleCluster],
    centroid_match_threshold: f64,
}

/// Extra metrics specific to clustered chaining, reported alongside the
/// shared [`InferenceResult`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterMetrics {
    /// Iterations where a cluster was actually explored (a winner cleared the threshold).
    pub clusters_checked: u64,
    /// Sum, across iterations, of clusters *not* explored that iteration.
    pub clusters_skipped: u64,
    /// Total number of centroid similarity computations performed.
    pub centroid_evaluations: u64,
}

impl ClusterMetrics {
    /// The fraction of cluster checks avoided relative to the unclustered
    /// baseline, `clusters_skipped / (clusters_checked + clusters_skipped)`.
    /// `0.0` if no clusters were ever skipped or checked.
    #[must_use]
    pub fn savings_ratio(&self) -> f64 {
        let total = self.clusters_checked + self.clusters_skipped;
        if total == 0 {
            0.0
        } else {
            self.clusters_skipped as f64 / total as f64
        }
    }
}

impl<'a> ClusteredForwardChaining<'a> {
    /// Builds a clustered forward-chaining engine over a precomputed cluster
    /// snapshot (see [`crate::clustering::RuleClusterer::fit`]).
    #[must_use]
    pub const fn new(strategy: Strategy, clusters: &'a [RuleCluster], centroid_match_threshold: f64) -> Self {
        Self { strategy, clusters, centroid_match_threshold }
    }

    /// Runs to quiescence or until `goal` is reached, returning the shared
    /// result plus clustering-specific metrics.
    ///
    /// Strategy and goal support are identical to [`crate::forward::ForwardChaining`]:
    /// `Recency` is fully supported (the logical clock is maintained the same
    /// way regardless of clustering) and both concrete-fact and
    /// attribute-name goals are checked after every fact addition.
    pub fn run(
        &self,
        kb: &KnowledgeBase,
        goal: Option<&Goal>,
        trace: bool,
    ) -> EngineResult<(InferenceResult, ClusterMetrics)> {
        let start = Instant::now();
        let mut facts = kb.facts().clone();
        let mut fired_ids: HashSet<i64> = HashSet::new();
        let mut new_facts = Vec::new();
        let mut fired_rules = Vec::new();
        let mut clock = matches!(self.strategy, Strategy::Recency).then(LogicalClock::new);
        let mut rules_evaluated = 0u64;
        let mut rules_activated = 0u64;
        let mut iteration = 0u64;
        let mut trace_events = trace.then(Vec::new);
        let mut metrics = ClusterMetrics::default();

        if let Some(c) = clock.as_mut() {
            for fact in &facts {
                c.record(fact.clone(), 0);
            }
        }

        let success = loop {
            iteration += 1;

            let Some((winner, max_sim)) = best_cluster(self.clusters, &facts, &mut metrics) else {
                info!(iteration, "no clusters available, quiescence");
                break goal.map_or(true, |g| g.is_satisfied_by(&facts));
            };

            if max_sim <= self.centroid_match_threshold {
                metrics.clusters_skipped += self.clusters.len() as u64;
                debug!(iteration, max_sim, "argmax gate: no cluster exceeds threshold");
                break goal.map_or(true, |g| g.is_satisfied_by(&facts));
            }

            metrics.clusters_checked += 1;
            metrics.clusters_skipped += (self.clusters.len() - 1) as u64;

            let candidates = conflict_set(winner.rules(), &facts, &fired_ids, &mut rules_evaluated);
            rules_activated += candidates.len() as u64;

            if candidates.is_empty() {
                info!(iteration, cluster_id = winner.cluster_id(), "chosen cluster has empty conflict set");
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
                debug!(rule_id = selected.id(), cluster_id = winner.cluster_id(), iteration, "rule fired");
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

        let result = InferenceResult {
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
        };
        Ok((result, metrics))
    }
}

/// Computes the similarity of every cluster's centroid against `facts` and
/// returns the argmax (ties by `cluster_id`, i.e. the first one encountered
/// since clusters are stored in `cluster_id` order).
fn best_cluster<'a>(
    clusters: &'a [RuleCluster],
    facts: &HashSet<Fact>,
    metrics: &mut ClusterMetrics,
) -> Option<(&'a RuleCluster, f64)> {
    let mut best: Option<(&'a RuleCluster, f64)> = None;
    for cluster in clusters {
        metrics.centroid_evaluations += 1;
        let sim = similarity(cluster.centroid().premises(), facts);
        match best {
            Some((_, best_sim)) if sim <= best_sim => {}
            _ => best = Some((cluster, sim)),
        }
    }
    best
}

fn similarity(centroid_premises: &[Fact], facts: &HashSet<Fact>) -> f64 {
    if centroid_premises.is_empty() {
        return 1.0;
    }
    let present = centroid_premises.iter().filter(|p| facts.contains(*p)).count();
    present as f64 / centroid_premises.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rule_types::Rule;
    use std::collections::HashSet as Set;

    fn fact(a: &str, v: &str) -> Fact {
        Fact::new(a, v).unwrap()
    }

    fn centroid_cluster(cluster_id: usize, attrs: &[&str]) -> RuleCluster {
        let premises: Vec<Fact> = attrs.iter().map(|a| fact(a, "1")).collect();
        let rule = Rule::new(1 + cluster_id as i64, premises.clone(), fact("z", "1")).unwrap();
        let centroid = Rule::new(1_000_000 + cluster_id as i64, premises, fact("z", "1")).unwrap();
        RuleCluster { cluster_id, rules: vec![rule], centroid }
    }

    #[test]
    fn argmax_selects_best_matching_cluster() {
        let c1 = centroid_cluster(0, &["a0", "a1", "a2", "a3", "a4", "a5", "a6", "a7", "a8", "a9"]);
        let c2 = centroid_cluster(1, &["a0", "a1", "a2", "a3", "a4"]);
        let clusters = vec![c1, c2];

        let facts: Set<Fact> = (0..=6).map(|i| fact(&format!("a{i}"), "1")).collect();
        let mut metrics = ClusterMetrics::default();
        let (winner, sim) = best_cluster(&clusters, &facts, &mut metrics).unwrap();
        assert_eq!(winner.cluster_id(), 1);
        assert!((sim - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn argmax_breaks_ties_toward_first_encountered_cluster() {
        let c1 = centroid_cluster(0, &["a0", "a1"]);
        let c2 = centroid_cluster(1, &["a0", "a1"]);
        let clusters = vec![c1, c2];

        let facts: Set<Fact> = [fact("a0", "1"), fact("a1", "1")].into_iter().collect();
        let mut metrics = ClusterMetrics::default();
        let (winner, _) = best_cluster(&clusters, &facts, &mut metrics).unwrap();
        assert_eq!(winner.cluster_id(), 0);
    }

    #[test]
    fn gate_stops_below_threshold() {
        let premises = vec![fact("x", "9")];
        let rule = Rule::new(1, premises.clone(), fact("y", "1")).unwrap();
        let centroid = Rule::new(1_000_000, premises, fact("y", "1")).unwrap();
        let clusters = vec![RuleCluster { cluster_id: 0, rules: vec![rule], centroid }];

        let kb = KnowledgeBase::new(
            clusters.iter().flat_map(|c| c.rules().to_vec()).collect(),
            Set::from([fact("a", "1"), fact("b", "2")]),
        );

        let engine = ClusteredForwardChaining::new(Strategy::First, &clusters, 0.0);
        let (_, metrics) = engine.run(&kb, None, false).unwrap();

        assert_eq!(metrics.clusters_checked, 0);
        assert_eq!(metrics.clusters_skipped, 1);
        assert_eq!(metrics.centroid_evaluations, 1);
    }
}
