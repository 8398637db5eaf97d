use std::path::PathBuf;

use clap::Parser;
use rule_engine::{CentroidMethod, ClusterMethod, ExperimentConfig, GoalSpec, InferenceMethod, Linkage, StrategyKind};

use crate::error::{CliError, CliResult};

/// Runs a single forward/backward/greedy inference pass over a JSON-encoded
/// knowledge base and persists the result as a run artifact directory.
#[derive(Debug, Parser)]
#[command(name = "rule-cli", version, about)]
pub struct Args {
    /// Path to the JSON file describing the initial facts and rule list.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Seed shared by every stochastic component this run touches.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Conflict-resolution strategy: first, random, specificity, or recency.
    #[arg(long, default_value = "first")]
    pub strategy: String,

    /// Inference method: forward, backward, or greedy.
    #[arg(long, default_value = "forward")]
    pub method: String,

    /// Cluster the rule base before forward chaining (Algorithm 2).
    #[arg(long)]
    pub cluster: bool,

    /// Requested cluster count, clamped to the rule count.
    #[arg(long, default_value_t = 4)]
    pub n_clusters: usize,

    /// Clustering backend: agglomerative or kmeans.
    #[arg(long, default_value = "agglomerative")]
    pub cluster_method: String,

    /// Agglomerative linkage criterion: average, complete, or single.
    #[arg(long, default_value = "average")]
    pub linkage: String,

    /// Centroid-construction policy: general, specialized, or weighted.
    #[arg(long, default_value = "specialized")]
    pub centroid_method: String,

    /// Threshold for the `weighted` centroid policy, in [0, 1].
    #[arg(long, default_value_t = 0.5)]
    pub centroid_threshold: f64,

    /// Argmax gate for clustered forward chaining, in [0, 1].
    #[arg(long, default_value_t = 0.0)]
    pub centroid_match_threshold: f64,

    /// Stop once a fact with this attribute is inferred (pairs with `--goal-value`
    /// for a concrete-fact goal; alone, an attribute-name goal).
    #[arg(long)]
    pub goal_attribute: Option<String>,

    /// The value half of a concrete-fact goal; requires `--goal-attribute`.
    #[arg(long)]
    pub goal_value: Option<String>,

    /// Record a per-iteration structured trace in the persisted artifacts.
    #[arg(long)]
    pub trace: bool,

    /// Directory under which the run's artifact subdirectory is created.
    #[arg(long, default_value = "./runs")]
    pub output_dir: PathBuf,

    /// Dataset label used to namespace the run's artifact directory.
    #[arg(long, default_value = "dataset")]
    pub dataset: String,
}

impl Args {
    /// Builds and validates the [`ExperimentConfig`] this invocation describes.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Engine`] if an enum flag names an unknown tag
    /// (`UnknownClusterMethod`/`UnknownCentroidMethod`) or config validation
    /// otherwise fails (out-of-range threshold, missing/unsupported goal for
    /// backward chaining, greedy combined with a seeded strategy).
    pub fn build_config(&self) -> CliResult<ExperimentConfig> {
        let strategy = parse_strategy(&self.strategy)?;
        let method = parse_method(&self.method)?;
        let linkage = parse_linkage(&self.linkage)?;
        let cluster_method = match self.cluster_method.as_str() {
            "agglomerative" => ClusterMethod::Agglomerative(linkage),
            "kmeans" => ClusterMethod::KMeans,
            other => return Err(CliError::Engine(rule_engine::EngineError::unknown_cluster_method(other))),
        };
        let centroid_method = match self.centroid_method.as_str() {
            "general" => CentroidMethod::General,
            "specialized" => CentroidMethod::Specialized,
            "weighted" => CentroidMethod::Weighted,
            other => return Err(CliError::Engine(rule_engine::EngineError::unknown_centroid_method(other))),
        };
        let goal = self.build_goal();

        Ok(ExperimentConfig::new(
            self.seed,
            strategy,
            method,
            self.cluster,
            self.n_clusters,
            cluster_method,
            centroid_method,
            self.centroid_threshold,
            self.centroid_match_threshold,
            goal,
        )?)
    }

    fn build_goal(&self) -> Option<GoalSpec> {
        match (&self.goal_attribute, &self.goal_value) {
            (Some(attribute), Some(value)) => {
                Some(GoalSpec::Fact { attribute: attribute.clone(), value: value.clone() })
            }
            (Some(attribute), None) => Some(GoalSpec::Attribute(attribute.clone())),
            (None, _) => None,
        }
    }
}

fn parse_strategy(tag: &str) -> CliResult<StrategyKind> {
    match tag {
        "first" => Ok(StrategyKind::First),
        "random" => Ok(StrategyKind::Random),
        "specificity" => Ok(StrategyKind::Specificity),
        "recency" => Ok(StrategyKind::Recency),
        other => Err(CliError::Engine(rule_engine::EngineError::invalid_config(format!(
            "unknown strategy: {other}"
        )))),
    }
}

fn parse_method(tag: &str) -> CliResult<InferenceMethod> {
    match tag {
        "forward" => Ok(InferenceMethod::Forward),
        "backward" => Ok(InferenceMethod::Backward),
        "greedy" => Ok(InferenceMethod::Greedy),
        other => Err(CliError::Engine(rule_engine::EngineError::invalid_config(format!(
            "unknown inference method: {other}"
        )))),
    }
}

fn parse_linkage(tag: &str) -> CliResult<Linkage> {
    match tag {
        "average" => Ok(Linkage::Average),
        "complete" => Ok(Linkage::Complete),
        "single" => Ok(Linkage::Single),
        other => Err(CliError::Engine(rule_engine::EngineError::invalid_config(format!(
            "unknown linkage: {other}"
        )))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(args).expect("args should parse")
    }

    #[test]
    fn defaults_build_a_valid_forward_config() {
        let args = parse(&["rule-cli", "--input", "kb.json"]);
        let config = args.build_config().unwrap();
        assert_eq!(config.seed, 0);
        assert!(!config.clustering_enabled);
    }

    #[test]
    fn goal_attribute_and_value_yield_fact_goal() {
        let args = parse(&["rule-cli", "--input", "kb.json", "--goal-attribute", "a", "--goal-value", "1"]);
        assert_eq!(
            args.build_goal(),
            Some(GoalSpec::Fact { attribute: "a".to_string(), value: "1".to_string() })
        );
    }

    #[test]
    fn goal_attribute_alone_yields_attribute_goal() {
        let args = parse(&["rule-cli", "--input", "kb.json", "--goal-attribute", "a"]);
        assert_eq!(args.build_goal(), Some(GoalSpec::Attribute("a".to_string())));
    }

    #[test]
    fn unknown_strategy_tag_is_rejected() {
        let args = parse(&["rule-cli", "--input", "kb.json", "--strategy", "bogus"]);
        assert!(args.build_config().is_err());
    }
}
