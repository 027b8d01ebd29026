//! Sequential task executor

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument};

use covflow_core::PipelineError;

use crate::command::CommandBuilder;
use crate::pipeline::PipelineConfig;
use crate::reporter::{TaskEvent, TaskReporter};
use crate::result::{TaskResult, TaskStatus};
use crate::runner::{ProcessRunner, RunOutput};
use crate::task::TaskDefinition;

/// Reason attached to disabled tasks
pub const DISABLED_REASON: &str = "Task was disabled in the pipeline configuration.";

/// Reason attached to tasks in a dry run
pub const DRY_RUN_REASON: &str = "dry run";

/// Reason attached to tasks filtered out by name
pub const NOT_SELECTED_REASON: &str = "not selected";

/// Runs task definitions one after another, producing one result each
#[derive(Clone)]
pub struct TaskExecutor {
    builder: CommandBuilder,
    runner: Arc<dyn ProcessRunner>,
    reporter: Arc<dyn TaskReporter>,
    env: Vec<(String, String)>,
    only: Vec<String>,
    dry_run: bool,
}

impl TaskExecutor {
    /// Create an executor for the given pipeline
    pub fn new(
        config: &PipelineConfig,
        runner: Arc<dyn ProcessRunner>,
        reporter: Arc<dyn TaskReporter>,
    ) -> Self {
        Self {
            builder: CommandBuilder::new(config),
            runner,
            reporter,
            env: Vec::new(),
            only: Vec::new(),
            dry_run: config.dry_run,
        }
    }

    /// Pass an environment variable to every tool invocation
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Restrict execution to the named tasks; empty means all
    pub fn with_only(mut self, names: Vec<String>) -> Self {
        self.only = names;
        self
    }

    /// Execute `tasks` in order. Never stops early: a failure is recorded and
    /// the next task runs.
    #[instrument(skip(self, tasks), fields(task_count = tasks.len()))]
    pub async fn execute(&self, pass: &str, tasks: &[TaskDefinition]) -> Vec<TaskResult> {
        let start = Instant::now();
        self.reporter.report(&TaskEvent::PassStarted {
            pass: pass.to_string(),
            task_count: tasks.len(),
        });

        let mut results = Vec::with_capacity(tasks.len());
        for task in tasks {
            let result = self.execute_task(task).await;
            match &result.status {
                TaskStatus::Success(_) => self.reporter.report(&TaskEvent::Completed {
                    task: result.name.clone(),
                    duration: result.duration,
                }),
                TaskStatus::Failed(details) => self.reporter.report(&TaskEvent::Failed {
                    task: result.name.clone(),
                    duration: result.duration,
                    error: details.clone(),
                }),
                TaskStatus::Skipped(reason) => self.reporter.report(&TaskEvent::Skipped {
                    task: result.name.clone(),
                    reason: reason.clone(),
                }),
            }
            results.push(result);
        }

        let count = |f: fn(&TaskStatus) -> bool| results.iter().filter(|r| f(&r.status)).count();
        self.reporter.report(&TaskEvent::PassCompleted {
            pass: pass.to_string(),
            succeeded: count(TaskStatus::is_success),
            failed: count(TaskStatus::is_failure),
            skipped: count(|s| matches!(s, TaskStatus::Skipped(_))),
            duration: start.elapsed(),
        });

        results
    }

    async fn execute_task(&self, task: &TaskDefinition) -> TaskResult {
        if !task.enabled {
            debug!(task = %task.name, "task disabled");
            return TaskResult::skipped(&task.name, DISABLED_REASON);
        }
        if !self.only.is_empty() && !self.only.iter().any(|n| n == &task.name) {
            return TaskResult::skipped(&task.name, NOT_SELECTED_REASON);
        }

        let start = Instant::now();
        let output_dir = self.builder.output_dir(task);
        self.reporter.report(&TaskEvent::TaskStarted {
            task: task.name.clone(),
            output_dir: output_dir.display().to_string(),
        });

        let mut spec = self.builder.build(task);
        for (key, value) in &self.env {
            spec = spec.env(key, value);
        }

        if self.dry_run {
            self.reporter.report(&TaskEvent::CommandStarted {
                task: task.name.clone(),
                command: spec.to_string(),
            });
            return TaskResult::skipped(&task.name, DRY_RUN_REASON);
        }

        if let Err(e) = std::fs::create_dir_all(&output_dir) {
            return TaskResult::failed(
                &task.name,
                format!(
                    "Failed to create output directory '{}': {}",
                    output_dir.display(),
                    e
                ),
            )
            .with_duration(start.elapsed());
        }

        info!(task = %task.name, command = %spec, "running task");
        let output = self.runner.run(&task.name, &spec).await;

        classify(task, &output_dir, &output).with_duration(start.elapsed())
    }
}

/// Turn a finished invocation into a result, honouring `expect_success`
/// and `expected_outputs`
fn classify(task: &TaskDefinition, output_dir: &Path, output: &RunOutput) -> TaskResult {
    match (task.expect_success, output.success) {
        (true, true) => match missing_output(output_dir, &task.expected_outputs) {
            Some(err) => TaskResult::failed(&task.name, err.to_string()),
            None => TaskResult::success(
                &task.name,
                format!("Reports saved to '{}'", output_dir.display()),
            ),
        },
        (true, false) => {
            let details = if output.output.is_empty() {
                output
                    .error(&task.name)
                    .map(|e| e.to_string())
                    .unwrap_or_default()
            } else {
                output.output.clone()
            };
            TaskResult::failed(&task.name, details)
        }
        (false, false) => TaskResult::success(
            &task.name,
            match output.exit_code {
                Some(code) => format!("Tool failed as expected (exit code {}).", code),
                None => "Tool failed as expected.".to_string(),
            },
        ),
        (false, true) => TaskResult::failed(
            &task.name,
            format!(
                "Expected the tool to fail, but it exited successfully.\n{}",
                output.output
            )
            .trim_end()
            .to_string(),
        ),
    }
}

/// First expected pattern with no match under `output_dir`
fn missing_output(output_dir: &Path, patterns: &[String]) -> Option<PipelineError> {
    patterns.iter().find_map(|pattern| {
        let full = output_dir.join(pattern);
        let found = glob::glob(&full.to_string_lossy())
            .map(|mut paths| paths.any(|p| p.is_ok()))
            .unwrap_or(false);
        (!found).then_some(PipelineError::MissingArtifact { path: full })
    })
}
