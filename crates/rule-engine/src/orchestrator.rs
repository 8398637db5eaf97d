use std::collections::HashSet;

use rule_types::{Fact, Rule};
use serde::{Deserialize, Serialize};

use crate::clustered_forward::{ClusterMetrics, ClusteredForwardChaining};
use crate::clustering::{RuleCluster, RuleClusterer};
use crate::config::{ExperimentConfig, InferenceMethod};
use crate::error::{EngineError, EngineResult};
use crate::forward::{ForwardChaining, GreedyForwardChaining};
use crate::backward::BackwardChaining;
use crate::goal::Goal;
use crate::knowledge_base::KnowledgeBase;
use crate::result::InferenceResult;

/// The persisted counterpart of an [`InferenceResult`]: the result plus the
/// config that produced it, the run's identifier, and (when clustering was
/// used) the cluster snapshot and its metrics — everything the storage
/// collaborator needs to write `metadata.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentReport {
    /// Caller-supplied run identifier, used to namespace persisted artifacts.
    ///
    /// Generated from a timestamp by convention (e.g. `run_YYYYMMDD_HHMMSS`),
    /// but the orchestrator itself never reads the clock: the CLI derives
    /// this string once per invocation and passes it in, keeping this crate's
    /// only computation pure and reproducible given identical inputs.
    pub run_id: String,
    /// The configuration this run was executed under.
    pub config: ExperimentConfig,
    /// The inference result.
    pub result: InferenceResult,
    /// The cluster snapshot, present iff clustering was enabled and the
    /// inference method was [`InferenceMethod::Forward`].
    pub clusters: Option<Vec<RuleCluster>>,
    /// Clustering-specific counters, present under the same condition as `clusters`.
    pub cluster_metrics: Option<ClusterMetrics>,
}

/// Threads an [`ExperimentConfig`] through rule/fact inputs to a finished
/// [`ExperimentReport`]: builds the knowledge base, optionally clusters the
/// rule base, selects and runs the configured engine, and packages the
/// result for the storage layer.
pub struct Orchestrator;

impl Orchestrator {
    /// Runs one experiment.
    ///
    /// # Errors
    ///
    /// Propagates any [`EngineError`] raised while resolving the goal,
    /// building clusters, or running the selected engine. `config` is
    /// assumed already validated by [`ExperimentConfig::new`]; this does not
    /// re-validate it.
    pub fn run(
        rules: Vec<Rule>,
        facts: HashSet<Fact>,
        config: &ExperimentConfig,
        run_id: impl Into<String>,
        trace: bool,
    ) -> EngineResult<ExperimentReport> {
        let run_id = run_id.into();
        let goal = config.build_goal()?;
        let strategy = config.build_strategy();
        let kb = KnowledgeBase::new(rules, facts);

        let (result, clusters, cluster_metrics) = match config.inference_method {
            InferenceMethod::Backward => {
                let fact_goal = match &goal {
                    Some(Goal::Fact(fact)) => fact,
                    // Validated unreachable: `ExperimentConfig::new` rejects
                    // `Backward` with a missing or attribute-only goal.
                    _ => return Err(EngineError::GoalRequired),
                };
                let engine = BackwardChaining::new(strategy);
                (engine.run(&kb, fact_goal)?, None, None)
            }
            InferenceMethod::Greedy => {
                let engine = GreedyForwardChaining::new();
                let result = engine.run(&kb, goal.as_ref(), trace);
                let clusters = Self::maybe_cluster(config, kb.rules())?;
                (result, clusters, None)
            }
            InferenceMethod::Forward if config.clustering_enabled => {
                let clusters = Self::build_clusters(config, kb.rules())?;
                let engine = ClusteredForwardChaining::new(strategy, &clusters, config.centroid_match_threshold);
                let (result, metrics) = engine.run(&kb, goal.as_ref(), trace)?;
                (result, Some(clusters), Some(metrics))
            }
            InferenceMethod::Forward => {
                let engine = ForwardChaining::new(strategy);
                (engine.run(&kb, goal.as_ref(), trace)?, None, None)
            }
        };

        Ok(ExperimentReport { run_id, config: config.clone(), result, clusters, cluster_metrics })
    }

    fn build_clusters(config: &ExperimentConfig, rules: &[Rule]) -> EngineResult<Vec<RuleCluster>> {
        let clusterer = RuleClusterer::new(
            config.n_clusters,
            config.cluster_method,
            config.centroid_method,
            config.centroid_threshold,
            config.seed,
        )?;
        clusterer.fit(rules)
    }

    /// Builds a cluster snapshot for reporting purposes only (used by engines
    /// that don't consult clusters during inference, e.g. greedy forward
    /// chaining) — `None` if clustering isn't enabled for this run.
    fn maybe_cluster(config: &ExperimentConfig, rules: &[Rule]) -> EngineResult<Option<Vec<RuleCluster>>> {
        if config.clustering_enabled { Self::build_clusters(config, rules).map(Some) } else { Ok(None) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CentroidMethod, ClusterMethod, GoalSpec, StrategyKind};

    fn fact(a: &str, v: &str) -> Fact {
        Fact::new(a, v).unwrap()
    }

    fn rule(id: i64, premises: Vec<Fact>, conclusion: Fact) -> Rule {
        Rule::new(id, premises, conclusion).unwrap()
    }

    #[test]
    fn forward_without_clustering_runs_plain_engine() {
        let rules = vec![rule(1, vec![fact("a", "1")], fact("b", "2"))];
        let facts = HashSet::from([fact("a", "1")]);
        let config = ExperimentConfig::new(
            1,
            StrategyKind::First,
            InferenceMethod::Forward,
            false,
            1,
            ClusterMethod::KMeans,
            CentroidMethod::Specialized,
            0.5,
            0.0,
            None,
        )
        .unwrap();

        let report = Orchestrator::run(rules, facts, &config, "run_test", false).unwrap();
        assert!(report.result.success);
        assert!(report.clusters.is_none());
        assert_eq!(report.run_id, "run_test");
    }

    #[test]
    fn forward_with_clustering_reports_cluster_snapshot() {
        let rules = vec![
            rule(1, vec![fact("a", "1")], fact("z", "1")),
            rule(2, vec![fact("a", "1"), fact("b", "1")], fact("z", "1")),
        ];
        let facts = HashSet::from([fact("a", "1"), fact("b", "1")]);
        let config = ExperimentConfig::new(
            1,
            StrategyKind::First,
            InferenceMethod::Forward,
            true,
            1,
            ClusterMethod::Agglomerative(crate::clustering::Linkage::Average),
            CentroidMethod::Specialized,
            0.5,
            0.0,
            None,
        )
        .unwrap();

        let report = Orchestrator::run(rules, facts, &config, "run_test", false).unwrap();
        assert!(report.clusters.is_some());
        assert!(report.cluster_metrics.is_some());
    }

    #[test]
    fn backward_proves_configured_goal() {
        let rules = vec![rule(1, vec![fact("a", "1")], fact("b", "1"))];
        let facts = HashSet::from([fact("a", "1")]);
        let config = ExperimentConfig::new(
            1,
            StrategyKind::First,
            InferenceMethod::Backward,
            false,
            1,
            ClusterMethod::KMeans,
            CentroidMethod::Specialized,
            0.5,
            0.0,
            Some(GoalSpec::Fact { attribute: "b".to_string(), value: "1".to_string() }),
        )
        .unwrap();

        let report = Orchestrator::run(rules, facts, &config, "run_test", false).unwrap();
        assert!(report.result.success);
    }
}
