use std::collections::HashSet;
use std::time::Duration;

use rule_types::{Fact, Rule};
use serde::{Deserialize, Serialize};

/// A single recorded step of an inference run, used to build `inference.log`
/// and as the structured backing for per-iteration `tracing` events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceEvent {
    /// The iteration number this event belongs to (1-based).
    pub iteration: u64,
    /// Number of rules in the conflict set at this iteration.
    pub conflict_set_size: usize,
    /// The id of the rule selected this iteration, if any fired.
    pub selected_rule_id: Option<i64>,
    /// The fact produced this iteration, if any.
    pub produced_fact: Option<Fact>,
    /// Whether the goal was satisfied after this iteration.
    pub goal_reached: bool,
}

/// The report produced by a completed inference run.
///
/// Once returned, an `InferenceResult` is never mutated; it is the
/// authoritative record of what happened during the run, independent of
/// whatever becomes of the `KnowledgeBase` it was built from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InferenceResult {
    /// Whether the run succeeded; semantics depend on the engine and goal
    /// (see each engine's module docs).
    pub success: bool,
    /// The final fact set (initial facts plus every fact inferred this run).
    pub final_facts: HashSet<Fact>,
    /// Facts inferred this run, in the order they were added.
    pub new_facts: Vec<Fact>,
    /// Rules that fired this run, in firing order.
    pub fired_rules: Vec<Rule>,
    /// Number of loop iterations (forward/greedy) or proved subgoals (backward).
    pub iterations: u64,
    /// Wall-clock duration of the run.
    pub duration: Duration,
    /// Total number of per-rule satisfaction checks performed.
    pub rules_evaluated: u64,
    /// Sum of conflict-set sizes across all iterations.
    pub rules_activated: u64,
    /// Size of the final fact set.
    pub facts_count: usize,
    /// Per-iteration trace, present only when tracing was requested.
    pub trace: Option<Vec<TraceEvent>>,
}

impl InferenceResult {
    /// A duration expressed as fractional milliseconds, for JSON-flat
    /// serialization in persisted artifacts.
    #[must_use]
    pub fn duration_ms(&self) -> f64 {
        self.duration.as_secs_f64() * 1000.0
    }
}
