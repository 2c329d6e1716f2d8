//! Execute phase: run the task, or simulate it.
//!
//! With an executor attached, the task is handed to it and the outcome is
//! whatever the executor reports. Without one, the outcome is sampled from
//! the task's team score: `p = team_score * 0.8 + 0.2`, so even a zero-score
//! team succeeds one time in five and a perfect team still fails
//! occasionally. Either way the task ends in a terminal status here and the
//! assigned agents' completed/failed counters are bumped.

use crate::agent::registry::AgentRegistry;
use crate::error::{MusterError, Result};
use crate::task::{Phase, Task, TaskStatus};
use chrono::Utc;
use rand::Rng;
use rand::rngs::StdRng;
use serde_json::json;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// Baseline success probability for a zero-score team.
const SIMULATION_BASE_RATE: f64 = 0.2;

/// How much of the success probability the team score contributes.
const SIMULATION_SCORE_WEIGHT: f64 = 0.8;

/// Poll interval while waiting on a spawned executor command.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Something that can carry out a task and report how it went.
///
/// `Ok` is a success message, `Err` a failure message; both are recorded on
/// the task verbatim. Infrastructure problems (spawn failures, timeouts) are
/// failures, not panics.
pub trait TaskExecutor {
    fn execute(&mut self, task: &Task) -> std::result::Result<String, String>;
}

impl<F> TaskExecutor for F
where
    F: FnMut(&Task) -> std::result::Result<String, String>,
{
    fn execute(&mut self, task: &Task) -> std::result::Result<String, String> {
        self(task)
    }
}

/// What the execute phase produced for one task.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    /// Whether the task succeeded.
    pub success: bool,

    /// Human-readable outcome message.
    pub message: String,

    /// Wall-clock execution time in seconds.
    pub duration_seconds: f64,
}

/// Run the execute phase for a task.
///
/// The task must not already be terminal. On return the task is in
/// `Completed` or `Failed`, carries a result and execution time, and every
/// assigned agent still present in the registry has its counters and
/// `last_active` updated.
pub fn execute(
    task: &mut Task,
    registry: &mut AgentRegistry,
    executor: Option<&mut dyn TaskExecutor>,
    rng: &mut StdRng,
) -> Result<ExecutionOutcome> {
    task.advance(TaskStatus::Executing)?;
    task.mark_started();
    let started = Instant::now();

    let (success, message) = match executor {
        Some(exec) => match exec.execute(task) {
            Ok(message) => (true, message),
            Err(message) => (false, message),
        },
        None => simulate(task, rng),
    };

    let duration_seconds = started.elapsed().as_secs_f64();
    let now = Utc::now();

    for id in &task.assigned_agents {
        if let Some(agent) = registry.get_mut(id) {
            if success {
                agent.tasks_completed += 1;
            } else {
                agent.tasks_failed += 1;
            }
            agent.last_active = now;
        }
    }

    task.mark_finished(success, message.clone(), duration_seconds);
    task.record_phase(
        Phase::Execute,
        json!({
            "success": success,
            "execution_time": duration_seconds,
        }),
    );

    Ok(ExecutionOutcome {
        success,
        message,
        duration_seconds,
    })
}

fn simulate(task: &Task, rng: &mut StdRng) -> (bool, String) {
    let p = task.team_score * SIMULATION_SCORE_WEIGHT + SIMULATION_BASE_RATE;
    if rng.gen_range(0.0..1.0) < p {
        (
            true,
            format!(
                "task completed by team of {}",
                task.assigned_agents.len()
            ),
        )
    } else {
        (false, "task execution failed".to_string())
    }
}

/// Executor that runs an external command per task.
///
/// The command is parsed with shell-style word splitting up front, so a bad
/// command line fails at construction rather than mid-run. Task context is
/// passed through `MUSTER_TASK_*` environment variables; stdout/stderr are
/// captured to per-task log files under the log directory.
pub struct CommandExecutor {
    args: Vec<String>,
    timeout: Duration,
    log_dir: PathBuf,
}

impl CommandExecutor {
    /// Parse a command line and build an executor with the given timeout.
    pub fn new(command: &str, timeout_seconds: u64) -> Result<Self> {
        let args = shell_words::split(command).map_err(|e| {
            MusterError::ExecutorError(format!("failed to parse executor command: {}", e))
        })?;
        if args.is_empty() {
            return Err(MusterError::ExecutorError(
                "executor command is empty".to_string(),
            ));
        }
        Ok(Self {
            args,
            timeout: Duration::from_secs(timeout_seconds),
            log_dir: std::env::temp_dir(),
        })
    }

    /// Redirect per-task stdout/stderr logs into the given directory.
    pub fn with_log_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.log_dir = dir.as_ref().to_path_buf();
        self
    }

    fn run(&self, task: &Task) -> std::result::Result<String, String> {
        std::fs::create_dir_all(&self.log_dir)
            .map_err(|e| format!("failed to create log directory: {}", e))?;

        let stdout_path = self.log_dir.join(format!("{}-stdout.log", task.id));
        let stderr_path = self.log_dir.join(format!("{}-stderr.log", task.id));
        let stdout_file = File::create(&stdout_path)
            .map_err(|e| format!("failed to create stdout log: {}", e))?;
        let stderr_file = File::create(&stderr_path)
            .map_err(|e| format!("failed to create stderr log: {}", e))?;

        let mut child = Command::new(&self.args[0])
            .args(&self.args[1..])
            .env("MUSTER_TASK_ID", &task.id)
            .env("MUSTER_TASK_DESCRIPTION", &task.description)
            .env("MUSTER_TASK_REQUIREMENTS", task.requirements.join(","))
            .env("MUSTER_TASK_AGENTS", task.assigned_agents.join(","))
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout_file))
            .stderr(Stdio::from(stderr_file))
            .spawn()
            .map_err(|e| format!("failed to spawn executor command: {}", e))?;

        let (status, timed_out) = wait_with_timeout(&mut child, self.timeout)?;

        if timed_out {
            return Err(format!(
                "executor command timed out after {}s",
                self.timeout.as_secs()
            ));
        }

        match status {
            Some(0) => {
                let stdout = std::fs::read_to_string(&stdout_path).unwrap_or_default();
                let trimmed = stdout.trim();
                if trimmed.is_empty() {
                    Ok("executor command completed".to_string())
                } else {
                    Ok(trimmed.to_string())
                }
            }
            code => {
                let stderr = std::fs::read_to_string(&stderr_path).unwrap_or_default();
                let tail = stderr.trim();
                if tail.is_empty() {
                    Err(format!("executor command exited with status {:?}", code))
                } else {
                    Err(format!(
                        "executor command exited with status {:?}: {}",
                        code, tail
                    ))
                }
            }
        }
    }
}

impl TaskExecutor for CommandExecutor {
    fn execute(&mut self, task: &Task) -> std::result::Result<String, String> {
        self.run(task)
    }
}

/// Wait for a child to exit, polling so a timeout can interrupt the wait.
///
/// Returns the exit code (if any) and whether the timeout fired. On timeout
/// the child is killed and reaped before returning.
fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
) -> std::result::Result<(Option<i32>, bool), String> {
    let deadline = Instant::now() + timeout;

    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok((status.code(), false)),
            Ok(None) => {
                if Instant::now() >= deadline {
                    kill_process(child);
                    return Ok((None, true));
                }
                std::thread::sleep(WAIT_POLL_INTERVAL);
            }
            Err(e) => return Err(format!("failed to wait on executor command: {}", e)),
        }
    }
}

fn kill_process(child: &mut Child) {
    // Already-dead children make kill() fail; that's fine.
    let _ = child.kill();
    let _ = child.wait();
}
