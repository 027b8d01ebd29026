//! Self-coverage workflow
//!
//! Measures the reporting tool while it runs the primary pass: the tool is
//! rebuilt with coverage instrumentation, its unit tests write a profile,
//! the primary pass drives the instrumented binary, and the raw data it
//! leaves behind is merged and fed back to the tool as a secondary pass.
//!
//! The raw data lives in an [`InstrumentationSession`] that is removed on
//! every exit path, including critical aborts propagated with `?`.

mod convert;
mod session;

pub use convert::{ensure_mode_header, has_instrumentation_data};
pub use session::{InstrumentationSession, SESSION_PREFIX};

use std::fmt;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use covflow_core::{PipelineError, Result};

use crate::command::CommandSpec;
use crate::executor::{TaskExecutor, DRY_RUN_REASON};
use crate::pipeline::PipelineConfig;
use crate::reporter::{TaskEvent, TaskReporter};
use crate::result::{TaskResult, WorkflowRun};
use crate::runner::{run_step, ProcessRunner};
use crate::task::TaskDefinition;
use crate::toolchain::{GoToolchain, COVERDIR_ENV};

/// Summary entry standing in for the whole workflow when it cannot proceed
pub const WORKFLOW_ENTRY: &str = "Self-Coverage Workflow";

/// Summary entry for conversion failures
pub const CONVERSION_ENTRY: &str = "self-coverage reports";

/// Reason recorded when the primary pass failed
pub const GATE_REASON: &str = "Skipped due to failures in the primary pass.";

/// Stages of the workflow, in order. `Aborted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStage {
    Idle,
    Instrumenting,
    UnitTesting,
    PrimaryPass,
    Gate,
    Converting,
    SecondaryPass,
    Cleanup,
    Done,
    Aborted,
}

impl WorkflowStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Instrumenting => "instrumenting",
            Self::UnitTesting => "unit-testing",
            Self::PrimaryPass => "primary-pass",
            Self::Gate => "gate",
            Self::Converting => "converting",
            Self::SecondaryPass => "secondary-pass",
            Self::Cleanup => "cleanup",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tasks that report on the tool's own coverage
pub fn secondary_tasks(config: &PipelineConfig) -> Vec<TaskDefinition> {
    let sc = &config.self_coverage;
    let source = config.tool_source_dir.display().to_string();
    let unit = config.unit_profile().display().to_string();
    let integration = config.integration_profile().display().to_string();
    let suffix = |s: &str| format!("{}_{}", sc.dir_suffix, s);

    let mut tasks = vec![
        TaskDefinition::new("Self-Coverage (Unit Tests)", suffix("unit"))
            .with_input(&unit)
            .with_source_dir(&source)
            .with_ignore_patterns(sc.file_filters.clone()),
        TaskDefinition::new("Self-Coverage (Integration)", suffix("integration"))
            .with_input(&integration)
            .with_source_dir(&source)
            .with_ignore_patterns(sc.file_filters.clone()),
        TaskDefinition::new("Self-Coverage (Unit + Integration Merged)", suffix("full"))
            .with_input(&unit)
            .with_input(&integration)
            .with_source_dir(&source)
            .with_source_dir(&source)
            .with_ignore_patterns(sc.file_filters.clone()),
    ];
    if sc.include_config_task {
        tasks.push(
            TaskDefinition::new("Self-Coverage (Tool Config File)", suffix("config"))
                .with_config_file(true),
        );
    }
    tasks
}

/// Drives the instrumented build, both passes and the conversion between them
pub struct SelfCoverageWorkflow {
    config: PipelineConfig,
    toolchain: GoToolchain,
    runner: Arc<dyn ProcessRunner>,
    reporter: Arc<dyn TaskReporter>,
    only: Vec<String>,
}

impl SelfCoverageWorkflow {
    pub fn new(
        config: &PipelineConfig,
        runner: Arc<dyn ProcessRunner>,
        reporter: Arc<dyn TaskReporter>,
    ) -> Self {
        Self {
            config: config.clone(),
            toolchain: GoToolchain::new(config),
            runner,
            reporter,
            only: Vec::new(),
        }
    }

    /// Restrict the primary pass to the named tasks
    pub fn with_only(mut self, names: Vec<String>) -> Self {
        self.only = names;
        self
    }

    /// Run the workflow, appending every result to `run`.
    ///
    /// Returns `Err` only for critical failures (instrumented build, unit
    /// tests, session setup); the instrumentation directory is gone by the
    /// time this returns either way.
    #[instrument(skip_all, fields(primary = primary.len()))]
    pub async fn run(&self, primary: &[TaskDefinition], run: &mut WorkflowRun) -> Result<()> {
        self.stage(WorkflowStage::Idle);
        let session = InstrumentationSession::acquire()?;
        info!(coverdir = %session.path().display(), "self-coverage workflow started");

        let outcome = self.drive(&session, primary, run).await;

        self.stage(WorkflowStage::Cleanup);
        let coverdir = session.path().to_path_buf();
        if let Err(e) = session.close() {
            warn!(coverdir = %coverdir.display(), error = %e, "failed to remove instrumentation directory");
        }

        match outcome {
            Ok(true) => {
                self.stage(WorkflowStage::Done);
                Ok(())
            }
            Ok(false) => {
                self.stage(WorkflowStage::Aborted);
                Ok(())
            }
            Err(e) => {
                self.stage(WorkflowStage::Aborted);
                Err(e)
            }
        }
    }

    /// Returns `Ok(true)` when the secondary pass ran
    async fn drive(
        &self,
        session: &InstrumentationSession,
        primary: &[TaskDefinition],
        run: &mut WorkflowRun,
    ) -> Result<bool> {
        let coverdir = session.path();
        let dry_run = self.config.dry_run;

        self.stage(WorkflowStage::Instrumenting);
        if dry_run {
            self.preview("instrumented build", &self.toolchain.build_command(Some(coverdir)));
        } else {
            self.toolchain
                .build_tool(self.runner.as_ref(), Some(coverdir))
                .await?;
        }

        self.stage(WorkflowStage::UnitTesting);
        let unit_profile = self.config.unit_profile();
        let unit_tests = self.toolchain.unit_test_command(&unit_profile);
        if dry_run {
            self.preview("unit tests", &unit_tests);
        } else {
            let dir = self.config.self_coverage_dir();
            if dir.exists() {
                std::fs::remove_dir_all(&dir)?;
            }
            std::fs::create_dir_all(&dir)?;
            run_step(self.runner.as_ref(), "unit tests", &unit_tests, true).await?;
        }

        self.stage(WorkflowStage::PrimaryPass);
        let executor = TaskExecutor::new(&self.config, self.runner.clone(), self.reporter.clone())
            .with_env(COVERDIR_ENV, coverdir.display().to_string())
            .with_only(self.only.clone());
        let results = executor.execute("primary", primary).await;
        let primary_failed = results.iter().any(|r| r.status.is_failure());
        run.extend(results);

        self.stage(WorkflowStage::Gate);
        if primary_failed {
            warn!("primary pass failed, skipping self-coverage reports");
            run.push(TaskResult::skipped(WORKFLOW_ENTRY, GATE_REASON));
            return Ok(false);
        }

        self.stage(WorkflowStage::Converting);
        let integration = self.config.integration_profile();
        let convert = self.toolchain.convert_command(coverdir, &integration);
        if dry_run {
            self.preview("convert coverage", &convert);
            run.push(TaskResult::skipped(WORKFLOW_ENTRY, DRY_RUN_REASON));
            return Ok(false);
        }
        if let Some(details) = self.convert(session, &convert).await {
            run.push(TaskResult::failed(CONVERSION_ENTRY, details));
            return Ok(false);
        }

        self.stage(WorkflowStage::SecondaryPass);
        let executor = TaskExecutor::new(&self.config, self.runner.clone(), self.reporter.clone());
        run.extend(
            executor
                .execute("self-coverage", &secondary_tasks(&self.config))
                .await,
        );

        Ok(true)
    }

    /// Merge the raw data into a text profile. Returns failure details.
    async fn convert(&self, session: &InstrumentationSession, spec: &CommandSpec) -> Option<String> {
        if !session.has_data() {
            let err = PipelineError::MissingArtifact {
                path: session.path().to_path_buf(),
            };
            return Some(format!("{}: the instrumented binary wrote no coverage data", err));
        }

        let output = self.runner.run("convert coverage", spec).await;
        if let Some(err) = output.error("convert coverage") {
            return Some(if output.output.is_empty() {
                err.to_string()
            } else {
                output.output
            });
        }

        let profile = self.config.integration_profile();
        match ensure_mode_header(&profile, &self.config.self_coverage.mode_header) {
            Ok(true) => {
                info!(profile = %profile.display(), "added mode header to merged profile");
                None
            }
            Ok(false) => None,
            Err(e) => Some(format!(
                "{}: {}",
                PipelineError::MissingArtifact { path: profile },
                e
            )),
        }
    }

    fn stage(&self, stage: WorkflowStage) {
        self.reporter.report(&TaskEvent::StageChanged { stage });
    }

    fn preview(&self, label: &str, spec: &CommandSpec) {
        self.reporter.report(&TaskEvent::CommandStarted {
            task: label.to_string(),
            command: spec.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::*;
    use crate::reporter::CollectingReporter;
    use crate::result::TaskStatus;
    use crate::runner::testing::RecordingRunner;
    use crate::runner::RunOutput;
    use covflow_core::config::Config;
    use covflow_core::CovflowError;
    use tempfile::TempDir;

    fn pipeline(root: &Path) -> PipelineConfig {
        PipelineConfig::from_config(&Config::default(), root, None).unwrap()
    }

    fn primary() -> Vec<TaskDefinition> {
        vec![TaskDefinition::new("C#", "cs").with_input("cs.xml")]
    }

    /// Behaves like the real tools: the instrumented binary writes raw data
    /// into GOCOVERDIR and the converter writes the `-o=` profile
    fn toolchain_like() -> RecordingRunner {
        RecordingRunner::new().on_run(|spec| {
            if spec.args.first().map(String::as_str) == Some("build") {
                return;
            }
            if let Some((_, dir)) = spec.env.iter().find(|(k, _)| k == COVERDIR_ENV) {
                std::fs::write(Path::new(dir).join("covcounters.1"), b"raw").unwrap();
            }
            if let Some(out) = spec.args.iter().find_map(|a| a.strip_prefix("-o=")) {
                std::fs::write(out, "a.go:1.1,2.2 1 1\n").unwrap();
            }
        })
    }

    fn coverdir(runner: &RecordingRunner) -> PathBuf {
        let (_, build) = &runner.calls()[0];
        PathBuf::from(&build.env[0].1)
    }

    #[tokio::test]
    async fn test_full_workflow_cleans_up() {
        let temp = TempDir::new().unwrap();
        let config = pipeline(temp.path());
        let runner = Arc::new(toolchain_like());
        let reporter = Arc::new(CollectingReporter::default());
        let workflow = SelfCoverageWorkflow::new(&config, runner.clone(), reporter.clone());

        let mut run = WorkflowRun::new();
        workflow.run(&primary(), &mut run).await.unwrap();

        assert!(!coverdir(&runner).exists());
        assert_eq!(run.results().len(), 1 + secondary_tasks(&config).len());
        assert!(!run.has_failures());
        assert_eq!(
            runner.labels()[..4],
            ["build reporting tool", "unit tests", "C#", "convert coverage"]
        );
        assert!(std::fs::read_to_string(config.integration_profile())
            .unwrap()
            .starts_with("mode: set\n"));
        assert_eq!(
            reporter.stages(),
            vec![
                WorkflowStage::Idle,
                WorkflowStage::Instrumenting,
                WorkflowStage::UnitTesting,
                WorkflowStage::PrimaryPass,
                WorkflowStage::Gate,
                WorkflowStage::Converting,
                WorkflowStage::SecondaryPass,
                WorkflowStage::Cleanup,
                WorkflowStage::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_primary_pass_receives_coverdir_secondary_does_not() {
        let temp = TempDir::new().unwrap();
        let config = pipeline(temp.path());
        let runner = Arc::new(toolchain_like());
        let workflow = SelfCoverageWorkflow::new(
            &config,
            runner.clone(),
            Arc::new(CollectingReporter::default()),
        );

        let mut run = WorkflowRun::new();
        workflow.run(&primary(), &mut run).await.unwrap();

        let calls = runner.calls();
        let primary_call = calls.iter().find(|(l, _)| l == "C#").unwrap();
        assert_eq!(primary_call.1.env[0].0, COVERDIR_ENV);
        let secondary_call = calls
            .iter()
            .find(|(l, _)| l.starts_with("Self-Coverage"))
            .unwrap();
        assert!(secondary_call.1.env.is_empty());
    }

    #[tokio::test]
    async fn test_unit_test_failure_aborts_and_cleans_up() {
        let temp = TempDir::new().unwrap();
        let config = pipeline(temp.path());
        let runner = Arc::new(
            RecordingRunner::new()
                .then(RunOutput::ok(""))
                .then(RunOutput::exited(1, "FAIL ./...")),
        );
        let reporter = Arc::new(CollectingReporter::default());
        let workflow = SelfCoverageWorkflow::new(&config, runner.clone(), reporter.clone());

        let mut run = WorkflowRun::new();
        let err = workflow.run(&primary(), &mut run).await.unwrap_err();

        assert!(matches!(
            err,
            CovflowError::Pipeline(PipelineError::CriticalStep { .. })
        ));
        assert!(run.is_empty());
        assert_eq!(runner.calls().len(), 2);
        assert!(!coverdir(&runner).exists());
        assert_eq!(reporter.stages().last(), Some(&WorkflowStage::Aborted));
    }

    #[tokio::test]
    async fn test_gate_skips_secondary_pass() {
        let temp = TempDir::new().unwrap();
        let config = pipeline(temp.path());
        let runner = Arc::new(
            RecordingRunner::new()
                .then(RunOutput::ok(""))
                .then(RunOutput::ok(""))
                .then(RunOutput::exited(1, "bad input")),
        );
        let workflow = SelfCoverageWorkflow::new(
            &config,
            runner.clone(),
            Arc::new(CollectingReporter::default()),
        );

        let mut run = WorkflowRun::new();
        workflow.run(&primary(), &mut run).await.unwrap();

        assert_eq!(run.results().len(), 2);
        assert_eq!(run.results()[1].name, WORKFLOW_ENTRY);
        assert_eq!(
            run.results()[1].status,
            TaskStatus::Skipped(GATE_REASON.to_string())
        );
        assert_eq!(runner.calls().len(), 3);
        assert!(!coverdir(&runner).exists());
    }

    #[tokio::test]
    async fn test_conversion_failure() {
        let temp = TempDir::new().unwrap();
        let config = pipeline(temp.path());
        let runner = Arc::new(
            toolchain_like()
                .then(RunOutput::ok(""))
                .then(RunOutput::ok(""))
                .then(RunOutput::ok(""))
                .then(RunOutput::exited(1, "covdata: no meta-data files")),
        );
        let workflow = SelfCoverageWorkflow::new(
            &config,
            runner.clone(),
            Arc::new(CollectingReporter::default()),
        );

        let mut run = WorkflowRun::new();
        workflow.run(&primary(), &mut run).await.unwrap();

        let last = run.results().last().unwrap();
        assert_eq!(last.name, CONVERSION_ENTRY);
        assert_eq!(
            last.status,
            TaskStatus::Failed("covdata: no meta-data files".to_string())
        );
        assert!(run.has_failures());
        assert_eq!(runner.calls().len(), 4);
        assert!(!coverdir(&runner).exists());
    }

    #[tokio::test]
    async fn test_missing_raw_data_fails_conversion() {
        let temp = TempDir::new().unwrap();
        let config = pipeline(temp.path());
        let runner = Arc::new(RecordingRunner::new());
        let workflow = SelfCoverageWorkflow::new(
            &config,
            runner.clone(),
            Arc::new(CollectingReporter::default()),
        );

        let mut run = WorkflowRun::new();
        workflow.run(&primary(), &mut run).await.unwrap();

        let last = run.results().last().unwrap();
        assert_eq!(last.name, CONVERSION_ENTRY);
        assert!(last.status.is_failure());
        assert!(!runner.labels().contains(&"convert coverage".to_string()));
    }

    #[tokio::test]
    async fn test_dry_run_spawns_nothing() {
        let temp = TempDir::new().unwrap();
        let config = pipeline(temp.path()).with_dry_run(true);
        let runner = Arc::new(RecordingRunner::new());
        let workflow = SelfCoverageWorkflow::new(
            &config,
            runner.clone(),
            Arc::new(CollectingReporter::default()),
        );

        let mut run = WorkflowRun::new();
        workflow.run(&primary(), &mut run).await.unwrap();

        assert!(runner.calls().is_empty());
        assert!(!run.has_failures());
        assert_eq!(run.results().last().unwrap().name, WORKFLOW_ENTRY);
    }

    #[test]
    fn test_secondary_tasks() {
        let mut config = pipeline(Path::new("/p"));
        let tasks = secondary_tasks(&config);
        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[2].inputs.len(), 2);
        assert_eq!(tasks[2].output_dir_suffix, "adlercov_self_coverage_full");
        assert!(tasks.iter().all(|t| t.ignore_patterns.len() == 3));

        config.self_coverage.include_config_task = true;
        let tasks = secondary_tasks(&config);
        assert_eq!(tasks.len(), 4);
        assert!(tasks[3].use_config_file);
    }
}
