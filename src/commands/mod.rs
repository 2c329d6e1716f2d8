//! Command implementations for muster.
//!
//! The dispatcher builds a [`Coordinator`] from the global options and
//! routes each CLI command to its handler. All handlers print to stdout;
//! errors propagate to main for exit-code mapping.

use crate::agent::AgentProfile;
use crate::analytics::{
    calculate_metrics, collaborative_pairs, predict_success_rate, recommend_agents,
    requirement_set_stats, top_performers,
};
use crate::cli::{
    AddArgs, Cli, Command, CompareArgs, OptimizeArgs, PredictArgs, RecommendArgs, RegisterArgs,
    RunArgs, ShowArgs,
};
use crate::config::CoordinationConfig;
use crate::coordinator::Coordinator;
use crate::error::{MusterError, Result};
use crate::optimizer::{TeamConstraints, Winner, compare_teams, optimize_team};
use crate::phases::{CommandExecutor, TaskExecutor};
use crate::task::validate_task_id;

/// Dispatch a command to its implementation.
pub fn dispatch(cli: Cli) -> Result<()> {
    let config = CoordinationConfig::load(cli.data_dir.join("config.yaml"))?;
    let mut coordinator = Coordinator::open(&cli.data_dir, config)?;
    if let Some(seed) = cli.seed {
        coordinator = coordinator.with_seed(seed);
    }

    match cli.command {
        Command::Register(args) => cmd_register(&mut coordinator, args),
        Command::Add(args) => cmd_add(&mut coordinator, args),
        Command::Run(args) => cmd_run(&mut coordinator, &cli.data_dir, args),
        Command::Agents => cmd_agents(&coordinator),
        Command::Show(args) => cmd_show(&coordinator, args),
        Command::Stats => cmd_stats(&coordinator),
        Command::Recommend(args) => cmd_recommend(&coordinator, args),
        Command::Optimize(args) => cmd_optimize(&coordinator, args),
        Command::Predict(args) => cmd_predict(&coordinator, args),
        Command::Compare(args) => cmd_compare(&coordinator, args),
        Command::Recompute => cmd_recompute(&mut coordinator),
    }
}

fn cmd_register(coordinator: &mut Coordinator, args: RegisterArgs) -> Result<()> {
    let name = args.name.unwrap_or_else(|| args.id.clone());
    let replacing = coordinator.agent(&args.id).is_some();

    coordinator.register_agent(AgentProfile::new(
        args.id.clone(),
        name,
        args.capabilities,
        args.specialization,
    ))?;

    if replacing {
        println!("Replaced agent '{}'.", args.id);
    } else {
        println!("Registered agent '{}'.", args.id);
    }
    Ok(())
}

fn cmd_add(coordinator: &mut Coordinator, args: AddArgs) -> Result<()> {
    let id = coordinator.create_task(args.description, args.requirements)?;
    println!("{}", id);
    Ok(())
}

fn cmd_run(
    coordinator: &mut Coordinator,
    data_dir: &std::path::Path,
    args: RunArgs,
) -> Result<()> {
    validate_task_id(&args.task_id)?;

    let mut executor = match &args.executor {
        Some(command) => Some(
            CommandExecutor::new(command, coordinator.config().executor_timeout_seconds)?
                .with_log_dir(data_dir.join("logs")),
        ),
        None => None,
    };
    let executor_ref: Option<&mut dyn TaskExecutor> =
        executor.as_mut().map(|e| e as &mut dyn TaskExecutor);

    let team = coordinator.match_phase(&args.task_id)?;
    println!(
        "Matched team [{}] (score {:.2})",
        team.agents.join(", "),
        team.formation_score
    );

    coordinator.exchange_phase(&args.task_id)?;

    let outcome = coordinator.execute_phase(&args.task_id, executor_ref)?;
    println!(
        "Execution {} in {:.2}s: {}",
        if outcome.success { "succeeded" } else { "failed" },
        outcome.duration_seconds,
        outcome.message
    );

    let result = coordinator.score_phase(&args.task_id, args.score)?;
    println!("Performance score: {:.2}", result.score);
    Ok(())
}

fn cmd_agents(coordinator: &Coordinator) -> Result<()> {
    let agents = coordinator.agents();
    if agents.is_empty() {
        println!("No agents registered.");
        return Ok(());
    }

    println!("Registered agents ({}):", agents.len());
    println!();
    for agent in agents {
        println!("  {} ({})", agent.id, agent.name);
        println!("    Specialization: {}", agent.specialization);
        println!(
            "    Capabilities:   {}",
            agent
                .capabilities
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        );
        println!(
            "    Performance:    {:.2}  Reliability: {:.2}  Collaboration: {:.2}",
            agent.performance_score, agent.reliability, agent.collaboration_score
        );
        println!(
            "    Tasks:          {} completed, {} failed",
            agent.tasks_completed, agent.tasks_failed
        );
    }
    Ok(())
}

fn cmd_show(coordinator: &Coordinator, args: ShowArgs) -> Result<()> {
    validate_task_id(&args.task_id)?;

    let task = coordinator
        .task(&args.task_id)
        .ok_or_else(|| MusterError::TaskNotFound(args.task_id.clone()))?;

    println!("{}: {}", task.id, task.description);
    println!("  Status:       {}", task.status);
    println!("  Requirements: {}", task.requirements.join(", "));
    if !task.assigned_agents.is_empty() {
        println!(
            "  Team:         [{}] (score {:.2})",
            task.assigned_agents.join(", "),
            task.team_score
        );
    }
    if let Some(result) = &task.result {
        println!(
            "  Result:       {} ({:.2}s): {}",
            if result.success { "success" } else { "failure" },
            task.execution_time,
            result.message
        );
    }
    if !task.history.is_empty() {
        println!("  History:");
        for record in &task.history {
            println!("    {} {}", record.ts.to_rfc3339(), record.phase);
        }
    }
    Ok(())
}

fn cmd_stats(coordinator: &Coordinator) -> Result<()> {
    let metrics = calculate_metrics(coordinator.completed_tasks());

    println!("Completed tasks: {}", metrics.total_tasks);
    println!(
        "  Successful:     {} ({:.0}%)",
        metrics.successful_tasks,
        metrics.success_rate * 100.0
    );
    println!("  Failed:         {}", metrics.failed_tasks);
    println!("  Avg exec time:  {:.2}s", metrics.average_execution_time);
    println!("  Avg team size:  {:.1}", metrics.average_team_size);
    println!("  Pending:        {}", coordinator.pending_tasks().len());

    if !metrics.agent_utilization.is_empty() {
        println!("  Utilization:");
        for (agent, count) in &metrics.agent_utilization {
            println!("    {}: {}", agent, count);
        }
    }

    let performers = top_performers(coordinator.registry(), 5);
    if !performers.is_empty() {
        println!("Top performers:");
        for performer in &performers {
            println!("  {} ({:.2})", performer.agent_id, performer.rating);
        }
    }

    let pairs = collaborative_pairs(coordinator.completed_tasks(), 5);
    if !pairs.is_empty() {
        println!("Collaborative pairs:");
        for pair in &pairs {
            println!(
                "  {} + {} ({} tasks, combined score {:.2})",
                pair.agents.0, pair.agents.1, pair.shared_tasks, pair.combined_score
            );
        }
    }

    let by_requirements = requirement_set_stats(coordinator.completed_tasks());
    if !by_requirements.is_empty() {
        println!("By requirement set:");
        for (requirements, stats) in &by_requirements {
            let label = if requirements.is_empty() {
                "(none)"
            } else {
                requirements.as_str()
            };
            println!(
                "  [{}]: {}/{} succeeded, avg score {:.2}",
                label, stats.successful_tasks, stats.total_tasks, stats.average_score
            );
        }
    }
    Ok(())
}

fn cmd_recommend(coordinator: &Coordinator, args: RecommendArgs) -> Result<()> {
    let recommendations = recommend_agents(
        coordinator.registry(),
        coordinator.completed_tasks(),
        &args.requirements,
        args.limit,
    );

    if recommendations.is_empty() {
        println!("No agents registered.");
        return Ok(());
    }

    for rec in &recommendations {
        println!(
            "{} (confidence {:.2}, covers [{}])",
            rec.agent_id,
            rec.confidence,
            rec.matched_requirements.join(", ")
        );
    }
    Ok(())
}

fn cmd_optimize(coordinator: &Coordinator, args: OptimizeArgs) -> Result<()> {
    let constraints = TeamConstraints {
        max_team_size: args.max_team_size,
        min_reliability: args.min_reliability,
        exclude: args.exclude,
        require: args.require,
    };

    let team = optimize_team(coordinator.registry(), &args.requirements, &constraints)?;

    if team.agents.is_empty() {
        println!("No agents satisfy the constraints.");
    } else {
        println!(
            "Planned team [{}] (score {:.2})",
            team.agents.join(", "),
            team.score
        );
    }
    Ok(())
}

fn cmd_predict(coordinator: &Coordinator, args: PredictArgs) -> Result<()> {
    let p = predict_success_rate(
        coordinator.registry(),
        coordinator.completed_tasks(),
        &args.agents,
    );
    println!(
        "Predicted success rate for [{}]: {:.0}%",
        args.agents.join(", "),
        p * 100.0
    );
    Ok(())
}

fn cmd_compare(coordinator: &Coordinator, args: CompareArgs) -> Result<()> {
    let comparison = compare_teams(
        coordinator.registry(),
        &args.requirements,
        &args.first,
        &args.second,
    )?;

    println!(
        "[{}] scores {:.2}, [{}] scores {:.2}",
        args.first.join(", "),
        comparison.first_score,
        args.second.join(", "),
        comparison.second_score
    );
    match comparison.winner {
        Winner::First => println!("First team wins."),
        Winner::Second => println!("Second team wins."),
        Winner::Tie => println!("The teams are tied."),
    }
    Ok(())
}

fn cmd_recompute(coordinator: &mut Coordinator) -> Result<()> {
    let updated = coordinator.recompute_reliability()?;
    println!("Recomputed reliability for {} agent(s).", updated);
    Ok(())
}
