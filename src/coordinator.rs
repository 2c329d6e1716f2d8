//! The coordination loop.
//!
//! [`Coordinator`] owns the registry, the task sets, and the store, and
//! drives tasks through the phase pipeline. Each phase persists the state it
//! changed before reporting success, so a crash between phases loses at most
//! the phase in flight. Completed tasks are archived out of the pending set
//! and never touched again.
//!
//! Randomness is confined to the simulated execution path and flows from a
//! single seedable generator, so a seeded coordinator replays identically.

use crate::agent::registry::AgentRegistry;
use crate::agent::{AgentProfile, validate_agent_id};
use crate::config::CoordinationConfig;
use crate::error::{MusterError, Result};
use crate::events::{Event, EventAction, EventLog};
use crate::phases::{
    ExchangeReport, ExecutionOutcome, PerformanceScore, TaskExecutor, exchange, execute,
    match_team, score,
};
use crate::store::{AgentsSnapshot, CoordinationStore, JsonStore, TasksSnapshot};
use crate::task::{Task, generate_task_id};
use crate::team::TeamComposition;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::json;
use std::path::Path;

/// Drives tasks through match, exchange, execute, and score.
pub struct Coordinator {
    config: CoordinationConfig,
    registry: AgentRegistry,
    pending: Vec<Task>,
    completed: Vec<Task>,
    next_task_number: u32,
    store: Box<dyn CoordinationStore>,
    log: Option<EventLog>,
    rng: StdRng,
}

impl Coordinator {
    /// Build a coordinator on an arbitrary store, loading any saved state.
    pub fn new(config: CoordinationConfig, store: Box<dyn CoordinationStore>) -> Result<Self> {
        config.validate()?;

        let registry = match store.load_agents()? {
            Some(snapshot) => AgentRegistry::from_agents(snapshot.agents),
            None => AgentRegistry::new(),
        };

        let (next_task_number, pending, completed) = match store.load_tasks()? {
            Some(snapshot) => (snapshot.next_task_number, snapshot.pending, snapshot.completed),
            None => (1, Vec::new(), Vec::new()),
        };

        Ok(Self {
            config,
            registry,
            pending,
            completed,
            next_task_number,
            store,
            log: None,
            rng: StdRng::from_entropy(),
        })
    }

    /// Build a coordinator on a JSON store and event log in `data_dir`.
    pub fn open<P: AsRef<Path>>(data_dir: P, config: CoordinationConfig) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let store = JsonStore::new(data_dir);
        Ok(Self::new(config, Box::new(store))?.with_event_log(EventLog::new(data_dir)))
    }

    /// Seed the simulation generator for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Attach an event log. Without one, no events are written.
    pub fn with_event_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &CoordinationConfig {
        &self.config
    }

    /// All registered agents, in registration order.
    pub fn agents(&self) -> &[AgentProfile] {
        self.registry.as_slice()
    }

    /// The agent registry, for read-only analytics and planning.
    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Look up an agent profile.
    pub fn agent(&self, id: &str) -> Option<&AgentProfile> {
        self.registry.get(id)
    }

    /// Tasks still in the pipeline.
    pub fn pending_tasks(&self) -> &[Task] {
        &self.pending
    }

    /// Archived terminal tasks, oldest first.
    pub fn completed_tasks(&self) -> &[Task] {
        &self.completed
    }

    /// Look up a task by id across the pending and completed sets.
    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.pending
            .iter()
            .chain(self.completed.iter())
            .find(|t| t.id == task_id)
    }

    /// Register an agent, replacing any existing profile with the same id.
    ///
    /// Replacement resets the profile's learned scores along with the rest
    /// of it; registration order (and so matching tie-breaks) is preserved.
    pub fn register_agent(&mut self, agent: AgentProfile) -> Result<()> {
        validate_agent_id(&agent.id)?;

        let id = agent.id.clone();
        self.registry.insert(agent);
        self.save_agents()?;
        self.log_event(
            Event::new(EventAction::RegisterAgent).with_details(json!({ "agent": id })),
        )
    }

    /// Create a pending task and return its generated id.
    pub fn create_task(
        &mut self,
        description: impl Into<String>,
        requirements: Vec<String>,
    ) -> Result<String> {
        let id = generate_task_id(self.next_task_number);
        self.next_task_number += 1;
        self.pending
            .push(Task::new(id.clone(), description, requirements));
        self.save_tasks()?;
        self.log_event(Event::new(EventAction::CreateTask).with_task(id.clone()))?;
        Ok(id)
    }

    /// Run the match phase for a pending task.
    pub fn match_phase(&mut self, task_id: &str) -> Result<TeamComposition> {
        let task = find_pending_mut(&mut self.pending, task_id)?;
        let team = match_team(task, &self.registry, &self.config)?;
        self.save_tasks()?;
        self.log_event(
            Event::new(EventAction::Match)
                .with_task(task_id)
                .with_details(json!({
                    "agents": team.agents,
                    "score": team.formation_score,
                })),
        )?;
        Ok(team)
    }

    /// Run the exchange phase for a matched task.
    pub fn exchange_phase(&mut self, task_id: &str) -> Result<ExchangeReport> {
        let rounds = self.config.exchange_rounds;
        let task = find_pending_mut(&mut self.pending, task_id)?;
        let report = exchange(task, &self.registry, rounds)?;
        self.save_tasks()?;
        self.log_event(
            Event::new(EventAction::Exchange)
                .with_task(task_id)
                .with_details(json!({ "rounds": rounds })),
        )?;
        Ok(report)
    }

    /// Run the execute phase for a task.
    ///
    /// With no executor the outcome is simulated from the team score. The
    /// task ends terminal either way and team counters are updated, so both
    /// the task and agent snapshots are saved.
    pub fn execute_phase(
        &mut self,
        task_id: &str,
        executor: Option<&mut dyn TaskExecutor>,
    ) -> Result<ExecutionOutcome> {
        let task = find_pending_mut(&mut self.pending, task_id)?;
        let outcome = execute(task, &mut self.registry, executor, &mut self.rng)?;
        self.save_tasks()?;
        self.save_agents()?;
        self.log_event(
            Event::new(EventAction::Execute)
                .with_task(task_id)
                .with_details(json!({
                    "success": outcome.success,
                    "execution_time": outcome.duration_seconds,
                })),
        )?;
        Ok(outcome)
    }

    /// Run the score phase for an executed task and archive it.
    pub fn score_phase(
        &mut self,
        task_id: &str,
        manual_score: Option<f64>,
    ) -> Result<PerformanceScore> {
        let pos = self
            .pending
            .iter()
            .position(|t| t.id == task_id)
            .ok_or_else(|| MusterError::TaskNotFound(task_id.to_string()))?;

        let result = score(&mut self.pending[pos], &mut self.registry, manual_score)?;

        let task = self.pending.remove(pos);
        self.completed.push(task);
        self.save_tasks()?;
        self.save_agents()?;
        self.log_event(
            Event::new(EventAction::Score)
                .with_task(task_id)
                .with_details(json!({
                    "performance_score": result.score,
                    "success": result.success,
                })),
        )?;
        Ok(result)
    }

    /// Run all four phases for a pending task.
    pub fn run(
        &mut self,
        task_id: &str,
        executor: Option<&mut dyn TaskExecutor>,
    ) -> Result<PerformanceScore> {
        self.match_phase(task_id)?;
        self.exchange_phase(task_id)?;
        self.execute_phase(task_id, executor)?;
        self.score_phase(task_id, None)
    }

    /// Create a task and drive it through the whole pipeline.
    pub fn run_task(
        &mut self,
        description: impl Into<String>,
        requirements: Vec<String>,
        executor: Option<&mut dyn TaskExecutor>,
    ) -> Result<PerformanceScore> {
        let id = self.create_task(description, requirements)?;
        self.run(&id, executor)
    }

    /// Recompute reliability for every agent with task history.
    ///
    /// Reliability becomes `completed / (completed + failed)`; agents with
    /// no history keep their current value. Returns how many profiles were
    /// updated.
    pub fn recompute_reliability(&mut self) -> Result<usize> {
        let mut updated = 0;
        for agent in self.registry.iter_mut() {
            if agent.has_history() {
                let total = f64::from(agent.tasks_completed + agent.tasks_failed);
                agent.reliability = f64::from(agent.tasks_completed) / total;
                updated += 1;
            }
        }
        self.save_agents()?;
        self.log_event(
            Event::new(EventAction::RecomputeReliability)
                .with_details(json!({ "updated": updated })),
        )?;
        Ok(updated)
    }

    fn save_agents(&self) -> Result<()> {
        self.store
            .save_agents(&AgentsSnapshot::new(self.registry.as_slice().to_vec()))
    }

    fn save_tasks(&self) -> Result<()> {
        self.store.save_tasks(&TasksSnapshot::new(
            self.next_task_number,
            self.pending.clone(),
            self.completed.clone(),
        ))
    }

    fn log_event(&self, event: Event) -> Result<()> {
        if let Some(log) = &self.log {
            log.append(&event)?;
        }
        Ok(())
    }
}

fn find_pending_mut<'a>(pending: &'a mut [Task], task_id: &str) -> Result<&'a mut Task> {
    pending
        .iter_mut()
        .find(|t| t.id == task_id)
        .ok_or_else(|| MusterError::TaskNotFound(task_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::task::TaskStatus;
    use tempfile::TempDir;

    fn coordinator() -> Coordinator {
        Coordinator::new(CoordinationConfig::default(), Box::new(MemoryStore::new()))
            .unwrap()
            .with_seed(42)
    }

    fn agent(id: &str, capabilities: &[&str]) -> AgentProfile {
        AgentProfile::new(
            id,
            id.to_uppercase(),
            capabilities.iter().map(|c| c.to_string()),
            "general",
        )
    }

    fn reqs(items: &[&str]) -> Vec<String> {
        items.iter().map(|r| r.to_string()).collect()
    }

    #[test]
    fn register_validates_agent_id() {
        let mut coord = coordinator();
        assert!(coord.register_agent(agent("Bad Id", &[])).is_err());
        assert!(coord.register_agent(agent("good-id", &[])).is_ok());
        assert_eq!(coord.agents().len(), 1);
    }

    #[test]
    fn create_task_assigns_sequential_ids() {
        let mut coord = coordinator();
        assert_eq!(coord.create_task("First", vec![]).unwrap(), "TASK-001");
        assert_eq!(coord.create_task("Second", vec![]).unwrap(), "TASK-002");
        assert_eq!(coord.pending_tasks().len(), 2);
    }

    #[test]
    fn full_pipeline_with_executor() {
        let mut coord = coordinator();
        coord
            .register_agent(agent("ace", &["coding", "testing"]))
            .unwrap();
        coord.register_agent(agent("bard", &["writing"])).unwrap();

        let id = coord
            .create_task("Ship feature", reqs(&["coding", "testing"]))
            .unwrap();

        let mut exec = |_: &Task| Ok("shipped".to_string());
        let result = coord.run(&id, Some(&mut exec)).unwrap();

        assert!(result.success);
        // bard's fresh profile sits exactly on the threshold and joins
        assert_eq!(result.team, vec!["ace", "bard"]);

        let task = coord.task(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert!((task.team_score - 0.8).abs() < 1e-9);
        assert_eq!(task.history.len(), 4);

        // score 0.5 + 0.3 + 0.8*0.2 = 0.96 for a sub-second run
        assert!((result.score - 0.96).abs() < 1e-9);

        let ace = coord.agent("ace").unwrap();
        assert_eq!(ace.tasks_completed, 1);
        assert!((ace.performance_score - 0.98).abs() < 1e-9);
        assert_eq!(ace.collaboration_score, 1.0);
    }

    #[test]
    fn scored_task_is_archived() {
        let mut coord = coordinator();
        coord.register_agent(agent("ace", &["coding"])).unwrap();
        let id = coord.create_task("Work", reqs(&["coding"])).unwrap();

        let mut exec = |_: &Task| Ok("done".to_string());
        coord.run(&id, Some(&mut exec)).unwrap();

        assert!(coord.pending_tasks().is_empty());
        assert_eq!(coord.completed_tasks().len(), 1);
        assert!(coord.task(&id).is_some());
    }

    #[test]
    fn failed_execution_still_scores_and_archives() {
        let mut coord = coordinator();
        coord.register_agent(agent("ace", &["coding"])).unwrap();
        let id = coord.create_task("Work", reqs(&["coding"])).unwrap();

        let mut exec = |_: &Task| Err("exploded".to_string());
        let result = coord.run(&id, Some(&mut exec)).unwrap();

        assert!(!result.success);
        let task = coord.task(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.result.as_ref().unwrap().message, "exploded");
        assert_eq!(coord.agent("ace").unwrap().tasks_failed, 1);
    }

    #[test]
    fn empty_registry_run_completes_gracefully() {
        let mut coord = coordinator();
        let id = coord.create_task("Nobody home", reqs(&["coding"])).unwrap();

        let result = coord.run(&id, None).unwrap();

        let task = coord.task(&id).unwrap();
        assert!(task.status.is_terminal());
        assert!(task.assigned_agents.is_empty());
        assert!(result.team.is_empty());
    }

    #[test]
    fn simulated_runs_replay_with_the_same_seed() {
        let run_outcomes = |seed: u64| -> Vec<bool> {
            let mut coord =
                Coordinator::new(CoordinationConfig::default(), Box::new(MemoryStore::new()))
                    .unwrap()
                    .with_seed(seed);
            coord.register_agent(agent("ace", &["coding"])).unwrap();

            (0..5)
                .map(|_| {
                    let id = coord.create_task("Sim", reqs(&["coding"])).unwrap();
                    coord.run(&id, None).unwrap().success
                })
                .collect()
        };

        assert_eq!(run_outcomes(7), run_outcomes(7));
        assert_eq!(run_outcomes(1234), run_outcomes(1234));
    }

    #[test]
    fn unknown_task_id_is_task_not_found() {
        let mut coord = coordinator();
        let err = coord.match_phase("TASK-999").unwrap_err();
        assert!(matches!(err, MusterError::TaskNotFound(_)));
        assert_eq!(err.exit_code(), crate::exit_codes::TASK_NOT_FOUND);
    }

    #[test]
    fn scoring_an_archived_task_is_task_not_found() {
        let mut coord = coordinator();
        coord.register_agent(agent("ace", &["coding"])).unwrap();
        let id = coord.create_task("Work", reqs(&["coding"])).unwrap();
        let mut exec = |_: &Task| Ok("done".to_string());
        coord.run(&id, Some(&mut exec)).unwrap();

        assert!(matches!(
            coord.score_phase(&id, None).unwrap_err(),
            MusterError::TaskNotFound(_)
        ));
    }

    #[test]
    fn phases_enforce_pipeline_order() {
        let mut coord = coordinator();
        coord.register_agent(agent("ace", &["coding"])).unwrap();
        let id = coord.create_task("Work", reqs(&["coding"])).unwrap();

        // Scoring before execution is rejected
        assert!(coord.score_phase(&id, None).is_err());

        coord.match_phase(&id).unwrap();
        // Matching twice is rejected
        assert!(coord.match_phase(&id).is_err());
    }

    #[test]
    fn run_task_creates_and_completes_in_one_call() {
        let mut coord = coordinator();
        coord.register_agent(agent("ace", &["coding"])).unwrap();

        let mut exec = |_: &Task| Ok("done".to_string());
        let result = coord
            .run_task("One shot", reqs(&["coding"]), Some(&mut exec))
            .unwrap();

        assert_eq!(result.task_id, "TASK-001");
        assert!(result.success);
        assert_eq!(coord.completed_tasks().len(), 1);
    }

    #[test]
    fn recompute_reliability_uses_counters() {
        let mut coord = coordinator();
        let mut veteran = agent("vet", &["coding"]);
        veteran.tasks_completed = 7;
        veteran.tasks_failed = 3;
        coord.register_agent(veteran).unwrap();
        coord.register_agent(agent("rookie", &["coding"])).unwrap();

        let updated = coord.recompute_reliability().unwrap();

        assert_eq!(updated, 1);
        assert!((coord.agent("vet").unwrap().reliability - 0.7).abs() < 1e-9);
        // No history: reliability untouched
        assert_eq!(coord.agent("rookie").unwrap().reliability, 1.0);
    }

    #[test]
    fn state_survives_reload() {
        let temp = TempDir::new().unwrap();
        let config = CoordinationConfig::default();

        {
            let mut coord = Coordinator::open(temp.path(), config.clone())
                .unwrap()
                .with_seed(1);
            coord.register_agent(agent("ace", &["coding"])).unwrap();
            let id = coord.create_task("Persist me", reqs(&["coding"])).unwrap();
            let mut exec = |_: &Task| Ok("done".to_string());
            coord.run(&id, Some(&mut exec)).unwrap();
        }

        let mut coord = Coordinator::open(temp.path(), config).unwrap().with_seed(1);
        assert_eq!(coord.agents().len(), 1);
        assert_eq!(coord.agent("ace").unwrap().tasks_completed, 1);
        assert_eq!(coord.completed_tasks().len(), 1);
        // Id sequence continues where it left off
        assert_eq!(coord.create_task("Next", vec![]).unwrap(), "TASK-002");
    }

    #[test]
    fn run_appends_events_in_pipeline_order() {
        let temp = TempDir::new().unwrap();
        let mut coord = Coordinator::open(temp.path(), CoordinationConfig::default())
            .unwrap()
            .with_seed(1);
        coord.register_agent(agent("ace", &["coding"])).unwrap();
        let id = coord.create_task("Logged", reqs(&["coding"])).unwrap();
        let mut exec = |_: &Task| Ok("done".to_string());
        coord.run(&id, Some(&mut exec)).unwrap();

        let content =
            std::fs::read_to_string(temp.path().join("events").join("events.ndjson")).unwrap();
        let actions: Vec<String> = content
            .lines()
            .map(|line| {
                let event: Event = serde_json::from_str(line).unwrap();
                event.action.to_string()
            })
            .collect();
        assert_eq!(
            actions,
            vec![
                "register_agent",
                "create_task",
                "match",
                "exchange",
                "execute",
                "score"
            ]
        );
    }

    #[test]
    fn reregistering_resets_profile_but_keeps_order() {
        let mut coord = coordinator();
        coord.register_agent(agent("ace", &["coding"])).unwrap();
        coord.register_agent(agent("bard", &["writing"])).unwrap();

        let id = coord.create_task("Work", reqs(&["coding"])).unwrap();
        let mut exec = |_: &Task| Ok("done".to_string());
        coord.run(&id, Some(&mut exec)).unwrap();
        assert_eq!(coord.agent("ace").unwrap().tasks_completed, 1);

        coord
            .register_agent(agent("ace", &["coding", "review"]))
            .unwrap();
        assert_eq!(coord.agent("ace").unwrap().tasks_completed, 0);
        let ids: Vec<&str> = coord.agents().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["ace", "bard"]);
    }
}
