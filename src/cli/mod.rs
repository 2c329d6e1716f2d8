//! CLI argument parsing for muster.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Muster: multi-agent task coordination with learned team formation.
///
/// Agents register with capability tags; tasks move through a fixed
/// match/exchange/execute/score pipeline that feeds outcomes back into
/// agent profiles. All state lives as JSON snapshots in the data directory,
/// with an append-only NDJSON event log alongside.
#[derive(Parser, Debug)]
#[command(name = "muster")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory for snapshots, config, and the event log.
    #[arg(long, global = true, default_value = ".muster")]
    pub data_dir: PathBuf,

    /// Seed for simulated execution, for reproducible runs.
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Available commands for muster.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Register an agent (or replace an existing profile).
    ///
    /// Re-registering an id replaces the whole profile, learned scores
    /// included, but keeps its position in matching tie-breaks.
    Register(RegisterArgs),

    /// Add a pending task.
    ///
    /// Prints the generated task id (e.g., TASK-001).
    Add(AddArgs),

    /// Run a pending task through the whole pipeline.
    ///
    /// Without --executor the execution outcome is simulated from the
    /// team score.
    Run(RunArgs),

    /// List registered agents with their learned scores.
    Agents,

    /// Show details of a specific task.
    Show(ShowArgs),

    /// Show aggregate metrics over completed tasks.
    Stats,

    /// Rank agents for a requirement set.
    Recommend(RecommendArgs),

    /// Plan a team under explicit constraints.
    ///
    /// Does not create or assign anything; prints the plan.
    Optimize(OptimizeArgs),

    /// Predict the success probability of a hypothetical team.
    Predict(PredictArgs),

    /// Compare two candidate teams for the same requirements.
    Compare(CompareArgs),

    /// Recompute agent reliability from completed/failed counters.
    Recompute,
}

/// Arguments for the `register` command.
#[derive(Parser, Debug)]
pub struct RegisterArgs {
    /// Agent id (lowercase alphanumeric with '-' or '_').
    pub id: String,

    /// Human-readable name. Defaults to the id.
    #[arg(short, long)]
    pub name: Option<String>,

    /// Capability tags.
    #[arg(short, long, value_delimiter = ',')]
    pub capabilities: Vec<String>,

    /// Specialization tag.
    #[arg(short, long, default_value = "general")]
    pub specialization: String,
}

/// Arguments for the `add` command.
#[derive(Parser, Debug)]
pub struct AddArgs {
    /// What the task is about.
    pub description: String,

    /// Required capabilities.
    #[arg(short, long, value_delimiter = ',')]
    pub requirements: Vec<String>,
}

/// Arguments for the `run` command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Task id to run (e.g., TASK-001).
    pub task_id: String,

    /// External command to execute the task with. Task context is passed
    /// via MUSTER_TASK_* environment variables.
    #[arg(long)]
    pub executor: Option<String>,

    /// Override the computed performance score, in [0, 1].
    #[arg(long)]
    pub score: Option<f64>,
}

/// Arguments for the `show` command.
#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Task id to show (e.g., TASK-001).
    pub task_id: String,
}

/// Arguments for the `recommend` command.
#[derive(Parser, Debug)]
pub struct RecommendArgs {
    /// Requirements to rank against.
    #[arg(short, long, value_delimiter = ',')]
    pub requirements: Vec<String>,

    /// Maximum number of suggestions.
    #[arg(short, long, default_value_t = 5)]
    pub limit: usize,
}

/// Arguments for the `optimize` command.
#[derive(Parser, Debug)]
pub struct OptimizeArgs {
    /// Requirements to plan for.
    #[arg(short, long, value_delimiter = ',')]
    pub requirements: Vec<String>,

    /// Hard cap on team size.
    #[arg(long, default_value_t = 4)]
    pub max_team_size: usize,

    /// Minimum reliability for optional members.
    #[arg(long, default_value_t = 0.5)]
    pub min_reliability: f64,

    /// Agents that must not appear in the team.
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Agents that must appear in the team.
    #[arg(long, value_delimiter = ',')]
    pub require: Vec<String>,
}

/// Arguments for the `predict` command.
#[derive(Parser, Debug)]
pub struct PredictArgs {
    /// Team to predict for.
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub agents: Vec<String>,
}

/// Arguments for the `compare` command.
#[derive(Parser, Debug)]
pub struct CompareArgs {
    /// First candidate team.
    #[arg(long, value_delimiter = ',', required = true)]
    pub first: Vec<String>,

    /// Second candidate team.
    #[arg(long, value_delimiter = ',', required = true)]
    pub second: Vec<String>,

    /// Requirements to compare against.
    #[arg(short, long, value_delimiter = ',')]
    pub requirements: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_register_with_capabilities() {
        let cli = Cli::parse_from([
            "muster",
            "register",
            "ace",
            "--capabilities",
            "coding,testing",
        ]);
        match cli.command {
            Command::Register(args) => {
                assert_eq!(args.id, "ace");
                assert_eq!(args.capabilities, vec!["coding", "testing"]);
                assert_eq!(args.specialization, "general");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn parses_global_data_dir_and_seed() {
        let cli = Cli::parse_from([
            "muster",
            "run",
            "TASK-001",
            "--data-dir",
            "/tmp/coord",
            "--seed",
            "42",
        ]);
        assert_eq!(cli.data_dir, PathBuf::from("/tmp/coord"));
        assert_eq!(cli.seed, Some(42));
    }

    #[test]
    fn data_dir_defaults_to_dot_muster() {
        let cli = Cli::parse_from(["muster", "agents"]);
        assert_eq!(cli.data_dir, PathBuf::from(".muster"));
        assert!(cli.seed.is_none());
    }

    #[test]
    fn parses_optimize_constraints() {
        let cli = Cli::parse_from([
            "muster",
            "optimize",
            "--requirements",
            "coding",
            "--max-team-size",
            "2",
            "--require",
            "ace",
            "--exclude",
            "bard",
        ]);
        match cli.command {
            Command::Optimize(args) => {
                assert_eq!(args.max_team_size, 2);
                assert_eq!(args.require, vec!["ace"]);
                assert_eq!(args.exclude, vec!["bard"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
