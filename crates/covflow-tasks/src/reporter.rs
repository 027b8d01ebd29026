//! Task execution reporting

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::self_coverage::WorkflowStage;

/// Events emitted while a pipeline runs
#[derive(Debug, Clone)]
pub enum TaskEvent {
    /// A task is about to run
    TaskStarted { task: String, output_dir: String },
    /// An external command was spawned
    CommandStarted { task: String, command: String },
    /// A command produced a line on stdout or stderr
    Output { task: String, line: String },
    /// A task succeeded
    Completed { task: String, duration: Duration },
    /// A task failed
    Failed {
        task: String,
        duration: Duration,
        error: String,
    },
    /// A task did not run
    Skipped { task: String, reason: String },
    /// A pass over a task list is starting
    PassStarted { pass: String, task_count: usize },
    /// A pass finished
    PassCompleted {
        pass: String,
        succeeded: usize,
        failed: usize,
        skipped: usize,
        duration: Duration,
    },
    /// The self-coverage workflow moved to another stage
    StageChanged { stage: WorkflowStage },
}

/// Trait for reporting pipeline progress
pub trait TaskReporter: Send + Sync {
    /// Handle an event
    fn report(&self, event: &TaskEvent);
}

/// Reporter that logs to tracing
#[derive(Debug, Default)]
pub struct TracingReporter;

impl TaskReporter for TracingReporter {
    fn report(&self, event: &TaskEvent) {
        match event {
            TaskEvent::TaskStarted { task, output_dir } => {
                tracing::info!(task = %task, output_dir = %output_dir, "task started");
            }
            TaskEvent::CommandStarted { task, command } => {
                tracing::debug!(task = %task, command = %command, "spawning command");
            }
            TaskEvent::Output { task, line } => {
                tracing::trace!("[{}] {}", task, line);
            }
            TaskEvent::Completed { task, duration } => {
                tracing::info!("{} completed in {:.1}s", task, duration.as_secs_f64());
            }
            TaskEvent::Failed {
                task,
                duration,
                error,
            } => {
                tracing::error!(
                    "{} failed after {:.1}s: {}",
                    task,
                    duration.as_secs_f64(),
                    error.lines().last().unwrap_or_default()
                );
            }
            TaskEvent::Skipped { task, reason } => {
                tracing::info!("{} skipped: {}", task, reason);
            }
            TaskEvent::PassStarted { pass, task_count } => {
                tracing::info!("Starting {} pass ({} tasks)", pass, task_count);
            }
            TaskEvent::PassCompleted {
                pass,
                succeeded,
                failed,
                skipped,
                duration,
            } => {
                tracing::info!(
                    "{} pass complete: {} succeeded, {} failed, {} skipped ({:.1}s)",
                    pass,
                    succeeded,
                    failed,
                    skipped,
                    duration.as_secs_f64()
                );
            }
            TaskEvent::StageChanged { stage } => {
                tracing::info!(stage = %stage, "self-coverage stage");
            }
        }
    }
}

/// Reporter that collects events for later inspection
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: Mutex<Vec<TaskEvent>>,
}

impl CollectingReporter {
    /// Get all collected events
    pub fn events(&self) -> Vec<TaskEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Stages observed so far, in order
    pub fn stages(&self) -> Vec<WorkflowStage> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                TaskEvent::StageChanged { stage } => Some(stage),
                _ => None,
            })
            .collect()
    }
}

impl TaskReporter for CollectingReporter {
    fn report(&self, event: &TaskEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Registry of task reporters
pub struct TaskReporterRegistry {
    reporters: Vec<Arc<dyn TaskReporter>>,
}

impl TaskReporterRegistry {
    pub fn new() -> Self {
        Self {
            reporters: vec![Arc::new(TracingReporter)],
        }
    }

    pub fn empty() -> Self {
        Self {
            reporters: Vec::new(),
        }
    }

    pub fn register<R: TaskReporter + 'static>(&mut self, reporter: R) {
        self.reporters.push(Arc::new(reporter));
    }

    /// Register a reporter that is also held elsewhere
    pub fn register_shared(&mut self, reporter: Arc<dyn TaskReporter>) {
        self.reporters.push(reporter);
    }

    pub fn all(&self) -> &[Arc<dyn TaskReporter>] {
        &self.reporters
    }

    /// Broadcast an event to all registered reporters
    pub fn broadcast(&self, event: &TaskEvent) {
        for reporter in &self.reporters {
            reporter.report(event);
        }
    }
}

impl Default for TaskReporterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskReporter for TaskReporterRegistry {
    fn report(&self, event: &TaskEvent) {
        self.broadcast(event);
    }
}
