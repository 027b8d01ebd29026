//! External process execution with live output capture

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use covflow_core::PipelineError;

use crate::command::CommandSpec;
use crate::reporter::{TaskEvent, TaskReporter};

/// Outcome of one external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    /// Exit status was zero
    pub success: bool,
    /// Exit code, `None` when killed by a signal or never spawned
    pub exit_code: Option<i32>,
    /// Merged stdout and stderr, in arrival order
    pub output: String,
    /// Set when the process never started
    pub spawn_error: Option<SpawnError>,
}

/// Why a process could not be started
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpawnError {
    /// The program is not on PATH or at the given path
    MissingProgram(String),
    /// The working directory does not exist
    MissingWorkingDir(PathBuf),
    /// Any other spawn failure
    Other(String),
}

impl RunOutput {
    /// Successful run with the given output
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            exit_code: Some(0),
            output: output.into(),
            spawn_error: None,
        }
    }

    /// Run that exited with a non-zero code
    pub fn exited(code: i32, output: impl Into<String>) -> Self {
        Self {
            success: code == 0,
            exit_code: Some(code),
            output: output.into(),
            spawn_error: None,
        }
    }

    /// The program could not be located
    pub fn not_found(program: impl Into<String>) -> Self {
        let program = program.into();
        Self::not_started(
            format!("command not found: {}", program),
            SpawnError::MissingProgram(program),
        )
    }

    /// The working directory does not exist
    pub fn missing_cwd(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self::not_started(
            format!("working directory not found: {}", dir.display()),
            SpawnError::MissingWorkingDir(dir),
        )
    }

    fn not_started(output: String, error: SpawnError) -> Self {
        Self {
            success: false,
            exit_code: None,
            output,
            spawn_error: Some(error),
        }
    }

    /// Error describing a failed run, `None` on success
    pub fn error(&self, step: &str) -> Option<PipelineError> {
        if self.success {
            return None;
        }
        Some(match &self.spawn_error {
            Some(SpawnError::MissingProgram(program)) => PipelineError::ExecutableNotFound {
                program: program.clone(),
            },
            Some(SpawnError::MissingWorkingDir(path)) => PipelineError::WorkingDirNotFound {
                step: step.to_string(),
                path: path.clone(),
            },
            Some(SpawnError::Other(reason)) => PipelineError::SpawnFailed {
                step: step.to_string(),
                reason: reason.clone(),
            },
            None => PipelineError::NonZeroExit {
                step: step.to_string(),
                code: self.exit_code,
                output: self.output.clone(),
            },
        })
    }
}

/// Executes external commands
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `spec` to completion. `label` names the task or step the output
    /// belongs to. Never fails: spawn errors are folded into the output.
    async fn run(&self, label: &str, spec: &CommandSpec) -> RunOutput;
}

/// Run a step, turning a failure into [`PipelineError::CriticalStep`] when
/// `critical` is set
pub async fn run_step(
    runner: &dyn ProcessRunner,
    label: &str,
    spec: &CommandSpec,
    critical: bool,
) -> Result<RunOutput, PipelineError> {
    let output = runner.run(label, spec).await;
    if critical {
        if let Some(err) = output.error(label) {
            let reason = if output.output.is_empty() || output.spawn_error.is_some() {
                err.to_string()
            } else {
                format!("{}\n{}", err, output.output)
            };
            return Err(PipelineError::CriticalStep {
                step: label.to_string(),
                reason,
            });
        }
    }
    Ok(output)
}

/// Runner backed by real processes
pub struct SystemRunner {
    reporter: Arc<dyn TaskReporter>,
}

impl SystemRunner {
    /// Create a runner that forwards every output line to `reporter`
    pub fn new(reporter: Arc<dyn TaskReporter>) -> Self {
        Self { reporter }
    }
}

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(&self, label: &str, spec: &CommandSpec) -> RunOutput {
        self.reporter.report(&TaskEvent::CommandStarted {
            task: label.to_string(),
            command: spec.to_string(),
        });

        // A missing cwd also surfaces as NotFound from spawn
        if let Some(ref cwd) = spec.cwd {
            if !cwd.is_dir() {
                warn!(task = %label, cwd = %cwd.display(), "working directory not found");
                return RunOutput::missing_cwd(cwd);
            }
        }

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref cwd) = spec.cwd {
            command.current_dir(cwd);
        }
        for (key, value) in &spec.env {
            command.env(key, value);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(program = %spec.program_name(), "executable not found");
                return RunOutput::not_found(spec.program_name());
            }
            Err(e) => {
                return RunOutput::not_started(
                    format!("failed to spawn {}: {}", spec.program_name(), e),
                    SpawnError::Other(e.to_string()),
                );
            }
        };

        let mut stdout = LineStream::new(child.stdout.take());
        let mut stderr = LineStream::new(child.stderr.take());
        let mut lines = Vec::new();

        loop {
            let line = tokio::select! {
                line = stdout.next_line(), if stdout.open => line,
                line = stderr.next_line(), if stderr.open => line,
                else => break,
            };
            if let Some(line) = line {
                self.reporter.report(&TaskEvent::Output {
                    task: label.to_string(),
                    line: line.clone(),
                });
                lines.push(line);
            }
        }

        let output = lines.join("\n").trim().to_string();
        match child.wait().await {
            Ok(status) => {
                debug!(task = %label, status = %status, "command finished");
                RunOutput {
                    success: status.success(),
                    exit_code: status.code(),
                    output,
                    spawn_error: None,
                }
            }
            Err(e) => RunOutput {
                success: false,
                exit_code: None,
                output: format!("{}\nfailed to wait for {}: {}", output, spec.program_name(), e)
                    .trim()
                    .to_string(),
                spawn_error: None,
            },
        }
    }
}

/// Line reader over one pipe, safe to poll from `select!`: partial reads
/// stay in `buf` until the newline arrives.
struct LineStream<R> {
    reader: Option<BufReader<R>>,
    buf: Vec<u8>,
    open: bool,
}

impl<R: AsyncRead + Unpin> LineStream<R> {
    fn new(reader: Option<R>) -> Self {
        Self {
            open: reader.is_some(),
            reader: reader.map(BufReader::new),
            buf: Vec::new(),
        }
    }

    /// Next complete line, or the trailing partial line at EOF.
    /// Returns `None` and closes the stream at EOF or on a read error.
    async fn next_line(&mut self) -> Option<String> {
        let reader = self.reader.as_mut()?;
        match reader.read_until(b'\n', &mut self.buf).await {
            Ok(0) => {
                self.open = false;
                if self.buf.is_empty() {
                    None
                } else {
                    Some(self.take_line())
                }
            }
            Ok(_) => Some(self.take_line()),
            Err(e) => {
                debug!(error = %e, "closing output stream");
                self.open = false;
                None
            }
        }
    }

    fn take_line(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.buf)
            .trim_end_matches(['\n', '\r'])
            .to_string();
        self.buf.clear();
        line
    }
}

/// Scripted runner for tests of code that spawns processes
#[cfg(any(test, feature = "test-util"))]
pub mod testing {
    use std::collections::VecDeque;
    use std::sync::{Mutex, MutexGuard};

    use super::*;

    /// Fake runner that records every command and replays scripted outcomes
    #[derive(Default)]
    pub struct RecordingRunner {
        calls: Mutex<Vec<(String, CommandSpec)>>,
        outcomes: Mutex<VecDeque<RunOutput>>,
        on_run: Option<Box<dyn Fn(&CommandSpec) + Send + Sync>>,
    }

    impl RecordingRunner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue an outcome; unscripted calls succeed
        pub fn then(self, outcome: RunOutput) -> Self {
            lock(&self.outcomes).push_back(outcome);
            self
        }

        /// Run `f` on every command before answering
        pub fn on_run(mut self, f: impl Fn(&CommandSpec) + Send + Sync + 'static) -> Self {
            self.on_run = Some(Box::new(f));
            self
        }

        pub fn calls(&self) -> Vec<(String, CommandSpec)> {
            lock(&self.calls).clone()
        }

        pub fn labels(&self) -> Vec<String> {
            self.calls().into_iter().map(|(label, _)| label).collect()
        }
    }

    #[async_trait]
    impl ProcessRunner for RecordingRunner {
        async fn run(&self, label: &str, spec: &CommandSpec) -> RunOutput {
            lock(&self.calls).push((label.to_string(), spec.clone()));
            if let Some(ref f) = self.on_run {
                f(spec);
            }
            lock(&self.outcomes)
                .pop_front()
                .unwrap_or_else(|| RunOutput::ok(""))
        }
    }

    // A panicking callback must not hide the calls recorded so far
    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingRunner;
    use super::*;
    use crate::reporter::CollectingReporter;

    #[test]
    fn test_run_output_error() {
        assert!(RunOutput::ok("done").error("step").is_none());

        let err = RunOutput::exited(3, "boom").error("go test").unwrap();
        assert!(matches!(err, PipelineError::NonZeroExit { code: Some(3), .. }));

        let missing = RunOutput::not_found("adlercov");
        assert_eq!(missing.output, "command not found: adlercov");
        assert!(matches!(
            missing.error("x"),
            Some(PipelineError::ExecutableNotFound { .. })
        ));

        let unstarted = RunOutput {
            success: false,
            exit_code: None,
            output: "failed to spawn go: permission denied".to_string(),
            spawn_error: Some(SpawnError::Other("permission denied".to_string())),
        };
        assert!(matches!(
            unstarted.error("x"),
            Some(PipelineError::SpawnFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_run_step_critical_failure() {
        let runner = RecordingRunner::new().then(RunOutput::exited(1, "compile error"));
        let spec = CommandSpec::new("go").arg("build");

        let err = run_step(&runner, "build", &spec, true).await.unwrap_err();
        match err {
            PipelineError::CriticalStep { step, reason } => {
                assert_eq!(step, "build");
                assert!(reason.contains("compile error"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_run_step_non_critical_failure_is_data() {
        let runner = RecordingRunner::new().then(RunOutput::exited(1, "bad"));
        let spec = CommandSpec::new("go");

        let output = run_step(&runner, "convert", &spec, false).await.unwrap();
        assert!(!output.success);
        assert_eq!(output.output, "bad");
    }

    #[tokio::test]
    async fn test_system_runner_missing_program() {
        let reporter = Arc::new(CollectingReporter::default());
        let runner = SystemRunner::new(reporter);
        let spec = CommandSpec::new("covflow-definitely-missing-binary");

        let output = runner.run("missing", &spec).await;
        assert!(!output.success);
        assert_eq!(
            output.output,
            "command not found: covflow-definitely-missing-binary"
        );
    }

    #[tokio::test]
    async fn test_system_runner_missing_working_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        let missing = temp.path().join("not-created");
        let reporter = Arc::new(CollectingReporter::default());
        let runner = SystemRunner::new(reporter);
        let spec = CommandSpec::new("sh").arg("-c").arg("true").current_dir(&missing);

        let output = runner.run("reports", &spec).await;

        assert!(!output.success);
        assert_eq!(output.spawn_error, Some(SpawnError::MissingWorkingDir(missing.clone())));
        assert!(!output.output.contains("command not found"));
        match output.error("reports") {
            Some(PipelineError::WorkingDirNotFound { step, path }) => {
                assert_eq!(step, "reports");
                assert_eq!(path, missing);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_step_critical_missing_working_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        let runner = RecordingRunner::new().then(RunOutput::missing_cwd(temp.path().join("gone")));
        let spec = CommandSpec::new("go").arg("build");

        let err = run_step(&runner, "build reporting tool", &spec, true).await.unwrap_err();
        match err {
            PipelineError::CriticalStep { step, reason } => {
                assert_eq!(step, "build reporting tool");
                assert!(reason.starts_with("Working directory for 'build reporting tool' not found"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_merges_streams() {
        let reporter = Arc::new(CollectingReporter::default());
        let runner = SystemRunner::new(reporter.clone());
        let spec = CommandSpec::new("sh")
            .arg("-c")
            .arg("echo out; echo err >&2; printf tail");

        let output = runner.run("merge", &spec).await;

        assert!(output.success);
        assert_eq!(output.exit_code, Some(0));
        let mut lines: Vec<&str> = output.output.lines().collect();
        lines.sort_unstable();
        assert_eq!(lines, vec!["err", "out", "tail"]);

        let forwarded = reporter
            .events()
            .iter()
            .filter(|e| matches!(e, TaskEvent::Output { .. }))
            .count();
        assert_eq!(forwarded, 3);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_env_and_exit_code() {
        let reporter = Arc::new(CollectingReporter::default());
        let runner = SystemRunner::new(reporter);
        let spec = CommandSpec::new("sh")
            .arg("-c")
            .arg("echo \"$GOCOVERDIR\"; exit 4")
            .env("GOCOVERDIR", "/tmp/raw");

        let output = runner.run("env", &spec).await;

        assert!(!output.success);
        assert_eq!(output.exit_code, Some(4));
        assert_eq!(output.output, "/tmp/raw");
    }
}
