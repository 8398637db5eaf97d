use rule_types::TypeError;
use thiserror::Error;

/// Structured error taxonomy for the inference engine and clusterer.
///
/// Construction-time errors ([`EngineError::Type`], [`EngineError::InvalidConfig`])
/// are surfaced immediately to the caller. The remaining variants are raised
/// only on programmer error (an empty conflict set passed to a strategy, an
/// unknown clustering tag) or on an internal invariant violation
/// ([`EngineError::EmptyCluster`]) — none of them are expected during a
/// normal run over valid inputs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A `Fact` or `Rule` failed to construct.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// A strategy's `select` was called with an empty conflict set.
    #[error("conflict set is empty")]
    EmptyConflictSet,

    /// Backward chaining was invoked without a goal.
    #[error("backward chaining requires a goal")]
    GoalRequired,

    /// Backward chaining was given an attribute-name goal instead of a concrete fact.
    #[error("backward chaining requires a concrete fact goal, not an attribute name: {attribute}")]
    GoalUnsupported {
        /// The bare attribute name that was rejected.
        attribute: String,
    },

    /// An `ExperimentConfig` field was out of its valid range.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Human-readable explanation of the validation failure.
        reason: String,
    },

    /// The clusterer was asked to dispatch on an unrecognized clustering backend name.
    #[error("unknown cluster method: {name}")]
    UnknownClusterMethod {
        /// The unrecognized tag.
        name: String,
    },

    /// The clusterer was asked to dispatch on an unrecognized centroid policy name.
    #[error("unknown centroid method: {name}")]
    UnknownCentroidMethod {
        /// The unrecognized tag.
        name: String,
    },

    /// Centroid construction was attempted on a cluster with zero rules.
    ///
    /// This should never occur: the clusterer only ever produces clusters
    /// with at least one member. Its presence here documents the invariant
    /// rather than a reachable runtime condition.
    #[error("cluster {cluster_id} has no rules")]
    EmptyCluster {
        /// The id of the empty cluster.
        cluster_id: usize,
    },
}

impl EngineError {
    /// Builds a [`EngineError::GoalUnsupported`] for the given attribute name.
    #[must_use]
    pub fn goal_unsupported(attribute: impl Into<String>) -> Self {
        Self::GoalUnsupported { attribute: attribute.into() }
    }

    /// Builds a [`EngineError::InvalidConfig`] with the given reason.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig { reason: reason.into() }
    }

    /// Builds a [`EngineError::UnknownClusterMethod`] for the given tag.
    #[must_use]
    pub fn unknown_cluster_method(name: impl Into<String>) -> Self {
        Self::UnknownClusterMethod { name: name.into() }
    }

    /// Builds a [`EngineError::UnknownCentroidMethod`] for the given tag.
    #[must_use]
    pub fn unknown_centroid_method(name: impl Into<String>) -> Self {
        Self::UnknownCentroidMethod { name: name.into() }
    }
}

/// Convenience alias for results produced by this crate.
pub type EngineResult<T> = Result<T, EngineError>;
