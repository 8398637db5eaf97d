use std::fs;
use std::path::{Path, PathBuf};

use rule_engine::ExperimentReport;
use serde::Serialize;

use crate::error::{CliError, CliResult};

/// Everything written into a run's artifact directory.
///
/// Mirrors the source system's per-run layout: `metadata.json` (flat,
/// machine-readable), `rules.txt` (one `Display`ed rule per line), and
/// `inference.log` (a human-readable per-iteration trace). The directory is
/// created if absent; files of the same name are overwritten on a repeat
/// run with the same `run_id`, never appended to.
pub struct Storage {
    run_dir: PathBuf,
}

#[derive(Debug, Serialize)]
struct Metadata<'a> {
    run_id: &'a str,
    timestamp: String,
    seed: u64,
    strategy: &'a str,
    method: &'a str,
    success: bool,
    metrics: Metrics,
    config: &'a rule_engine::ExperimentConfig,
}

#[derive(Debug, Serialize)]
struct Metrics {
    iterations: u64,
    duration_ms: f64,
    rules_evaluated: u64,
    rules_activated: u64,
    facts_count: usize,
    new_facts_count: usize,
    fired_rules_count: usize,
    clusters_checked: Option<u64>,
    clusters_skipped: Option<u64>,
    centroid_evaluations: Option<u64>,
}

impl Storage {
    /// Builds the run directory path `<output_dir>/<run_id>_<dataset>_<method>`
    /// without creating it yet.
    #[must_use]
    pub fn new(output_dir: &Path, run_id: &str, dataset: &str, method_tag: &str) -> Self {
        let dir_name = format!("{run_id}_{dataset}_{method_tag}");
        Self { run_dir: output_dir.join(dir_name) }
    }

    /// The run's artifact directory.
    #[must_use]
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Writes `metadata.json`, `rules.txt`, and `inference.log` for `report`,
    /// creating the run directory if it does not already exist.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Io`] if the directory cannot be created or a file
    /// cannot be written, or [`CliError::Serialization`] if `report` cannot
    /// be serialized to JSON.
    pub fn persist(&self, report: &ExperimentReport, method_tag: &str, timestamp: &str) -> CliResult<()> {
        fs::create_dir_all(&self.run_dir).map_err(|e| CliError::io(&self.run_dir, e))?;

        self.write_metadata(report, method_tag, timestamp)?;
        self.write_rules(report)?;
        self.write_inference_log(report)?;
        Ok(())
    }

    fn write_metadata(&self, report: &ExperimentReport, method_tag: &str, timestamp: &str) -> CliResult<()> {
        let strategy_tag = format!("{:?}", report.config.strategy);
        let metadata = Metadata {
            run_id: &report.run_id,
            timestamp: timestamp.to_string(),
            seed: report.config.seed,
            strategy: &strategy_tag,
            method: method_tag,
            success: report.result.success,
            metrics: Metrics {
                iterations: report.result.iterations,
                duration_ms: report.result.duration_ms(),
                rules_evaluated: report.result.rules_evaluated,
                rules_activated: report.result.rules_activated,
                facts_count: report.result.facts_count,
                new_facts_count: report.result.new_facts.len(),
                fired_rules_count: report.result.fired_rules.len(),
                clusters_checked: report.cluster_metrics.map(|m| m.clusters_checked),
                clusters_skipped: report.cluster_metrics.map(|m| m.clusters_skipped),
                centroid_evaluations: report.cluster_metrics.map(|m| m.centroid_evaluations),
            },
            config: &report.config,
        };

        let path = self.run_dir.join("metadata.json");
        let json = serde_json::to_string_pretty(&metadata)?;
        fs::write(&path, json).map_err(|e| CliError::io(&path, e))
    }

    fn write_rules(&self, report: &ExperimentReport) -> CliResult<()> {
        let path = self.run_dir.join("rules.txt");
        let mut body = String::new();
        for rule in &report.result.fired_rules {
            body.push_str(&rule.to_string());
            body.push('\n');
        }
        fs::write(&path, body).map_err(|e| CliError::io(&path, e))
    }

    fn write_inference_log(&self, report: &ExperimentReport) -> CliResult<()> {
        let path = self.run_dir.join("inference.log");
        let mut body = String::new();
        body.push_str(&format!("run {} — success={}\n", report.run_id, report.result.success));
        if let Some(trace) = &report.result.trace {
            for event in trace {
                body.push_str(&format!(
                    "iteration {}: conflict_set_size={} selected_rule={:?} produced={:?} goal_reached={}\n",
                    event.iteration,
                    event.conflict_set_size,
                    event.selected_rule_id,
                    event.produced_fact.as_ref().map(ToString::to_string),
                    event.goal_reached
                ));
            }
        } else {
            body.push_str("(no structured trace requested for this run)\n");
        }
        fs::write(&path, body).map_err(|e| CliError::io(&path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use rule_engine::{CentroidMethod, ClusterMethod, ExperimentConfig, InferenceMethod, Orchestrator, StrategyKind};
    use rule_types::{Fact, Rule};

    #[test]
    fn persists_all_three_artifacts() {
        let rules = vec![Rule::new(1, vec![Fact::new("a", "1").unwrap()], Fact::new("b", "2").unwrap()).unwrap()];
        let facts = HashSet::from([Fact::new("a", "1").unwrap()]);
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
        let report = Orchestrator::run(rules, facts, &config, "run_test", true).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path(), "run_test", "demo", "forward");
        storage.persist(&report, "forward", "2026-07-26T00:00:00Z").unwrap();

        assert!(storage.run_dir().join("metadata.json").exists());
        assert!(storage.run_dir().join("rules.txt").exists());
        assert!(storage.run_dir().join("inference.log").exists());
    }
}
