//! Task results and run aggregation

use std::time::Duration;

use serde::Serialize;

/// Outcome of one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "details", rename_all = "lowercase")]
pub enum TaskStatus {
    /// Reports were produced; carries the output directory
    Success(String),
    /// The task failed; carries the captured tool output or the reason
    Failed(String),
    /// The task did not run; carries the reason
    Skipped(String),
}

impl TaskStatus {
    /// Check if this status represents success
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Check if this status counts towards the failure verdict
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Free-text details carried by the status
    pub fn details(&self) -> &str {
        match self {
            Self::Success(d) | Self::Failed(d) | Self::Skipped(d) => d,
        }
    }

    /// Label used in the summary
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "SUCCESS",
            Self::Failed(_) => "FAILED",
            Self::Skipped(_) => "SKIPPED",
        }
    }
}

/// Result of a single task execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskResult {
    /// Task name
    pub name: String,
    /// Outcome
    #[serde(flatten)]
    pub status: TaskStatus,
    /// How long the task took
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

impl TaskResult {
    /// Successful task
    pub fn success(name: impl Into<String>, details: impl Into<String>) -> Self {
        Self::with_status(name, TaskStatus::Success(details.into()))
    }

    /// Failed task
    pub fn failed(name: impl Into<String>, details: impl Into<String>) -> Self {
        Self::with_status(name, TaskStatus::Failed(details.into()))
    }

    /// Skipped task
    pub fn skipped(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::with_status(name, TaskStatus::Skipped(reason.into()))
    }

    fn with_status(name: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            name: name.into(),
            status,
            duration: Duration::ZERO,
        }
    }

    /// Attach the elapsed time
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Counts per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounts {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl RunCounts {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }
}

/// Every task result of one invocation, across all passes, in order
#[derive(Debug, Clone, Default)]
pub struct WorkflowRun {
    results: Vec<TaskResult>,
}

impl WorkflowRun {
    /// Create an empty run
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one result
    pub fn push(&mut self, result: TaskResult) {
        self.results.push(result);
    }

    /// Append the results of a pass
    pub fn extend(&mut self, results: impl IntoIterator<Item = TaskResult>) {
        self.results.extend(results);
    }

    /// Results in the order they were produced
    pub fn results(&self) -> &[TaskResult] {
        &self.results
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Counts per status
    pub fn counts(&self) -> RunCounts {
        self.results
            .iter()
            .fold(RunCounts::default(), |mut counts, r| {
                match r.status {
                    TaskStatus::Success(_) => counts.succeeded += 1,
                    TaskStatus::Failed(_) => counts.failed += 1,
                    TaskStatus::Skipped(_) => counts.skipped += 1,
                }
                counts
            })
    }

    /// Overall verdict: failed iff at least one task failed
    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|r| r.status.is_failure())
    }

    /// Human-readable summary of every task
    pub fn render_summary(&self) -> String {
        let rule = "=".repeat(80);
        let mut out = String::new();
        out.push_str(&format!("{rule}\n Final Report Generation Summary\n{rule}\n"));

        for result in &self.results {
            out.push_str(&format!("\nTask  : {}\n", result.name));
            out.push_str(&format!("Status: {}\n", result.status.label()));
            match &result.status {
                TaskStatus::Success(details) => {
                    out.push_str(&format!("Details: {}\n", details));
                }
                TaskStatus::Failed(details) => {
                    out.push_str(&format!("Details:\n{}\n", indent(details, "  ")));
                }
                TaskStatus::Skipped(reason) => {
                    out.push_str(&format!("Reason: {}\n", reason));
                }
            }
        }

        let counts = self.counts();
        out.push_str(&format!("\n{}\n", "-".repeat(80)));
        out.push_str(&format!(
            "Summary: {} succeeded, {} failed, {} skipped.\n",
            counts.succeeded, counts.failed, counts.skipped
        ));
        out.push_str(&rule);
        out
    }

    /// Machine-readable summary
    pub fn to_json(&self) -> serde_json::Value {
        let counts = self.counts();
        serde_json::json!({
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "total": counts.total(),
            "succeeded": counts.succeeded,
            "failed": counts.failed,
            "skipped": counts.skipped,
            "success": !self.has_failures(),
            "tasks": self.results,
        })
    }
}

fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{prefix}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
