use serde::{Deserialize, Serialize};

use rule_types::Fact;

use crate::clustering::{CentroidMethod, ClusterMethod};
use crate::error::{EngineError, EngineResult};
use crate::goal::Goal;
use crate::strategies::Strategy;

/// The conflict-resolution policy a run is configured to use.
///
/// Distinct from [`Strategy`] itself: a `StrategyKind` is a plain,
/// serializable tag suitable for a config file or CLI flag, whereas
/// `Strategy` additionally owns the seeded PRNG state `Random` needs and so
/// cannot round-trip through JSON. [`ExperimentConfig::build_strategy`]
/// bridges the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyKind {
    /// FIFO: first element of the conflict set.
    First,
    /// Uniform pick from the run's seeded generator.
    Random,
    /// Greatest premise count.
    Specificity,
    /// Greatest logical-clock stamp among premises.
    Recency,
}

/// Which inference engine a run exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InferenceMethod {
    /// Iterative conflict-set selection via [`crate::ForwardChaining`].
    Forward,
    /// Goal-driven recursive proof via [`crate::BackwardChaining`].
    Backward,
    /// Fires every applicable rule per iteration via [`crate::GreedyForwardChaining`].
    Greedy,
}

/// A forward/backward goal, as it arrives from config or CLI input before
/// being resolved into a concrete [`Goal`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalSpec {
    /// Stop once this exact `(attribute, value)` pair has been inferred.
    Fact {
        /// The goal fact's attribute.
        attribute: String,
        /// The goal fact's value.
        value: String,
    },
    /// Stop once any fact with this attribute has been inferred. Rejected by
    /// backward chaining at config-validation time.
    Attribute(String),
}

impl GoalSpec {
    fn into_goal(self) -> EngineResult<Goal> {
        match self {
            Self::Fact { attribute, value } => {
                Ok(Goal::Fact(Fact::new(attribute, value).map_err(EngineError::Type)?))
            }
            Self::Attribute(attribute) => Ok(Goal::Attribute(attribute)),
        }
    }
}

/// A validated, immutable record of run parameters.
///
/// Construction performs every check in the external interface contract up
/// front (§6): an `ExperimentConfig` that exists is guaranteed internally
/// consistent, so the orchestrator and engines never have to re-validate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Seed shared by every stochastic component this run touches (the
    /// `Random` strategy, k-means initialization).
    pub seed: u64,
    /// The conflict-resolution policy.
    pub strategy: StrategyKind,
    /// Which engine to run.
    pub inference_method: InferenceMethod,
    /// Whether to cluster the rule base before running forward chaining.
    pub clustering_enabled: bool,
    /// Requested cluster count (clamped to the rule count internally).
    pub n_clusters: usize,
    /// Clustering backend, used only when `clustering_enabled`.
    pub cluster_method: ClusterMethod,
    /// Centroid-construction policy, used only when `clustering_enabled`.
    pub centroid_method: CentroidMethod,
    /// Threshold for [`CentroidMethod::Weighted`], in `[0, 1]`.
    pub centroid_threshold: f64,
    /// Argmax gate for [`crate::ClusteredForwardChaining`], in `[0, 1]`.
    pub centroid_match_threshold: f64,
    /// The run's stop condition, if any.
    pub goal: Option<GoalSpec>,
}

impl ExperimentConfig {
    /// Builds and validates a run configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if `clustering_enabled` and
    /// `n_clusters == 0`, if either threshold falls outside `[0, 1]`, or if
    /// `inference_method` is [`InferenceMethod::Greedy`] with a strategy
    /// other than `First`/`Specificity` (greedy does not consult a strategy,
    /// so requesting `Random`/`Recency` signals a caller mismatch worth
    /// rejecting up front rather than silently ignoring).
    ///
    /// Returns [`EngineError::GoalRequired`] if `inference_method` is
    /// [`InferenceMethod::Backward`] and `goal` is `None`, or
    /// [`EngineError::GoalUnsupported`] if it is `Some(GoalSpec::Attribute(_))`
    /// — backward chaining needs a concrete fact goal (§4.5).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        seed: u64,
        strategy: StrategyKind,
        inference_method: InferenceMethod,
        clustering_enabled: bool,
        n_clusters: usize,
        cluster_method: ClusterMethod,
        centroid_method: CentroidMethod,
        centroid_threshold: f64,
        centroid_match_threshold: f64,
        goal: Option<GoalSpec>,
    ) -> EngineResult<Self> {
        if clustering_enabled && n_clusters == 0 {
            return Err(EngineError::invalid_config("n_clusters must be positive when clustering is enabled"));
        }
        if !(0.0..=1.0).contains(&centroid_threshold) {
            return Err(EngineError::invalid_config("centroid_threshold must be in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&centroid_match_threshold) {
            return Err(EngineError::invalid_config("centroid_match_threshold must be in [0, 1]"));
        }
        if matches!(inference_method, InferenceMethod::Greedy)
            && matches!(strategy, StrategyKind::Random | StrategyKind::Recency)
        {
            return Err(EngineError::invalid_config(
                "greedy forward chaining does not consult a strategy; Random/Recency would be ignored",
            ));
        }
        if matches!(inference_method, InferenceMethod::Backward) {
            match &goal {
                None => return Err(EngineError::GoalRequired),
                Some(GoalSpec::Attribute(attribute)) => {
                    return Err(EngineError::goal_unsupported(attribute.clone()))
                }
                Some(GoalSpec::Fact { .. }) => {}
            }
        }

        Ok(Self {
            seed,
            strategy,
            inference_method,
            clustering_enabled,
            n_clusters,
            cluster_method,
            centroid_method,
            centroid_threshold,
            centroid_match_threshold,
            goal,
        })
    }

    /// Builds the runtime [`Strategy`] this config describes, seeding
    /// `Random` from [`Self::seed`].
    #[must_use]
    pub fn build_strategy(&self) -> Strategy {
        match self.strategy {
            StrategyKind::First => Strategy::First,
            StrategyKind::Random => Strategy::random(self.seed),
            StrategyKind::Specificity => Strategy::Specificity,
            StrategyKind::Recency => Strategy::Recency,
        }
    }

    /// Resolves the configured goal into a concrete [`Goal`], if one is set.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Type`] if a `GoalSpec::Fact` carries an empty
    /// attribute or value.
    pub fn build_goal(&self) -> EngineResult<Option<Goal>> {
        self.goal.clone().map(GoalSpec::into_goal).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_clusters_when_clustering_enabled() {
        let err = ExperimentConfig::new(
            1,
            StrategyKind::First,
            InferenceMethod::Forward,
            true,
            0,
            ClusterMethod::KMeans,
            CentroidMethod::Specialized,
            0.5,
            0.0,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig { .. }));
    }

    #[test]
    fn rejects_threshold_out_of_range() {
        let err = ExperimentConfig::new(
            1,
            StrategyKind::First,
            InferenceMethod::Forward,
            false,
            1,
            ClusterMethod::KMeans,
            CentroidMethod::Specialized,
            1.5,
            0.0,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig { .. }));
    }

    #[test]
    fn rejects_greedy_with_random_strategy() {
        let err = ExperimentConfig::new(
            1,
            StrategyKind::Random,
            InferenceMethod::Greedy,
            false,
            1,
            ClusterMethod::KMeans,
            CentroidMethod::Specialized,
            0.5,
            0.0,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig { .. }));
    }

    #[test]
    fn backward_requires_a_goal() {
        let err = ExperimentConfig::new(
            1,
            StrategyKind::First,
            InferenceMethod::Backward,
            false,
            1,
            ClusterMethod::KMeans,
            CentroidMethod::Specialized,
            0.5,
            0.0,
            None,
        )
        .unwrap_err();
        assert_eq!(err, EngineError::GoalRequired);
    }

    #[test]
    fn backward_rejects_attribute_goal() {
        let err = ExperimentConfig::new(
            1,
            StrategyKind::First,
            InferenceMethod::Backward,
            false,
            1,
            ClusterMethod::KMeans,
            CentroidMethod::Specialized,
            0.5,
            0.0,
            Some(GoalSpec::Attribute("temperature".to_string())),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::GoalUnsupported { .. }));
    }

    #[test]
    fn valid_config_round_trips_through_json() {
        let config = ExperimentConfig::new(
            7,
            StrategyKind::Specificity,
            InferenceMethod::Forward,
            true,
            4,
            ClusterMethod::KMeans,
            CentroidMethod::Weighted,
            0.5,
            0.1,
            Some(GoalSpec::Fact { attribute: "a".to_string(), value: "1".to_string() }),
        )
        .unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let back: ExperimentConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.seed, config.seed);
        assert_eq!(back.n_clusters, config.n_clusters);
        assert_eq!(back.goal, config.goal);
    }
}
