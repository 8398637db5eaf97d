//! Command-line driver for the propositional rule inference engine.
//!
//! Loads a JSON-encoded knowledge base, runs the configured inference method,
//! prints a summary, and persists the run as an artifact directory under
//! `--output-dir`.

#![deny(warnings)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod cli;
mod error;
mod input;
mod logging;
mod storage;

use clap::Parser;
use tracing::info;

use cli::Args;
use error::CliResult;
use storage::Storage;

/// Top-level error boundary: every lower layer raises a structured
/// [`error::CliError`]; `anyhow` wraps it here for a single readable exit
/// path, matching the stack this crate's dependencies are drawn from.
fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    run(&args)?;
    Ok(())
}

fn run(args: &Args) -> CliResult<()> {
    let run_id = format!("run_{}", chrono::Utc::now().format("%Y%m%d_%H%M%S"));
    let timestamp = chrono::Utc::now().to_rfc3339();

    let config = args.build_config()?;
    let method_tag = match config.inference_method {
        rule_engine::InferenceMethod::Forward if config.clustering_enabled => "clustered_forward",
        rule_engine::InferenceMethod::Forward => "forward",
        rule_engine::InferenceMethod::Backward => "backward",
        rule_engine::InferenceMethod::Greedy => "greedy",
    };
    let storage = Storage::new(&args.output_dir, &run_id, &args.dataset, method_tag);

    logging::init(storage.run_dir(), &run_id)?;
    info!(run_id = %run_id, input = %args.input.display(), "starting inference run");

    let (rules, facts) = input::load_knowledge_base(&args.input)?;
    info!(rules = rules.len(), facts = facts.len(), "loaded knowledge base");

    let report = rule_engine::Orchestrator::run(rules, facts, &config, run_id.clone(), args.trace)?;
    info!(
        success = report.result.success,
        iterations = report.result.iterations,
        facts_inferred = report.result.new_facts.len(),
        rules_fired = report.result.fired_rules.len(),
        "inference run complete"
    );

    storage.persist(&report, method_tag, &timestamp)?;
    println!(
        "run {} ({}): success={} iterations={} facts_inferred={} rules_fired={} -> {}",
        report.run_id,
        method_tag,
        report.result.success,
        report.result.iterations,
        report.result.new_facts.len(),
        report.result.fired_rules.len(),
        storage.run_dir().display()
    );

    Ok(())
}
