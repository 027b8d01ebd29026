//! Run command: generate every configured report

use std::path::Path;
use std::sync::Arc;

use clap::Args;
use console::style;
use tracing::{info, warn};

use covflow_core::{ConfigError, CovflowError, PipelineError};
use covflow_tasks::{
    tasks_from_config, GoToolchain, PipelineConfig, ProcessRunner, SelfCoverageWorkflow,
    SystemRunner, TaskDefinition, TaskEvent, TaskExecutor, TaskReporter, TaskReporterRegistry,
    WorkflowRun,
};

use crate::cli::{output, Cli, OutputFormat};

/// Generate coverage reports for every configured task
#[derive(Debug, Args)]
pub struct RunCommand {
    /// Comma-separated report types (overrides the configuration)
    #[arg(long)]
    pub report_types: Option<String>,

    /// Force a rebuild of the reporting binary
    #[arg(long)]
    pub rebuild_binary: bool,

    /// Build with coverage and report on the reporting tool itself
    #[arg(long)]
    pub self_cover: bool,

    /// Remove the built binary when done
    #[arg(long)]
    pub clean: bool,

    /// Remove the reports directory before running
    #[arg(long)]
    pub clean_reports: bool,

    /// Show the commands without running them
    #[arg(long)]
    pub dry_run: bool,

    /// Only run the named tasks (can be repeated)
    #[arg(long)]
    pub only: Vec<String>,
}

impl RunCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(self.execute_async(cli))
    }

    async fn execute_async(&self, cli: &Cli) -> anyhow::Result<()> {
        let cwd = std::env::current_dir()?;
        let (config, root) = cli.load_config(&cwd)?;

        // Everything below may spawn processes; reject bad input first
        let pipeline = PipelineConfig::from_config(&config, &root, self.report_types.as_deref())?
            .with_dry_run(self.dry_run);
        let tasks = tasks_from_config(&config);
        check_selection(&tasks, &self.only)?;

        info!(
            root = %root.display(),
            tasks = tasks.len(),
            report_types = %pipeline.report_types,
            self_cover = self.self_cover,
            "starting report generation"
        );

        let mut registry = TaskReporterRegistry::new();
        if cli.show_progress() {
            registry.register(ConsoleReporter::new(cli.verbose));
        }
        let reporter: Arc<dyn TaskReporter> = Arc::new(registry);
        let runner: Arc<dyn ProcessRunner> = Arc::new(SystemRunner::new(reporter.clone()));

        if cli.show_progress() {
            output::info(&format!(
                "{} task{} with report types {}",
                tasks.len(),
                if tasks.len() == 1 { "" } else { "s" },
                style(&pipeline.report_types).cyan()
            ));
            if self.dry_run {
                println!("{}", style("[DRY RUN - no commands will be executed]").yellow().bold());
            }
        }

        if self.clean_reports && !self.dry_run {
            clean_reports(&pipeline.reports_root)?;
        }

        let (run, outcome) = self
            .orchestrate(&pipeline, &tasks, runner, reporter, cli.show_progress())
            .await;

        match cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&run.to_json())?);
            }
            OutputFormat::Text if !cli.quiet => {
                println!();
                output::print_summary(&run);
            }
            OutputFormat::Text => {}
        }

        finish(&run, outcome)
    }

    /// Generate the reports, then remove the binary if asked to. Results
    /// gathered before a critical failure are returned alongside it.
    async fn orchestrate(
        &self,
        pipeline: &PipelineConfig,
        tasks: &[TaskDefinition],
        runner: Arc<dyn ProcessRunner>,
        reporter: Arc<dyn TaskReporter>,
        show_progress: bool,
    ) -> (WorkflowRun, Result<(), CovflowError>) {
        let mut run = WorkflowRun::new();
        let outcome = self
            .generate(pipeline, tasks, runner, reporter, &mut run)
            .await;

        // Also after failures, so a broken build never leaves a stale binary
        if self.clean && !self.dry_run {
            remove_binary(&pipeline.binary, show_progress);
        }

        (run, outcome)
    }

    async fn generate(
        &self,
        pipeline: &PipelineConfig,
        tasks: &[TaskDefinition],
        runner: Arc<dyn ProcessRunner>,
        reporter: Arc<dyn TaskReporter>,
        run: &mut WorkflowRun,
    ) -> Result<(), CovflowError> {
        let toolchain = GoToolchain::new(pipeline);

        if self.self_cover {
            if !self.dry_run {
                check_toolchain(&pipeline.go)?;
            }
            return SelfCoverageWorkflow::new(pipeline, runner, reporter)
                .with_only(self.only.clone())
                .run(tasks, run)
                .await;
        }

        if self.rebuild_binary || !toolchain.binary().exists() {
            if self.dry_run {
                reporter.report(&TaskEvent::CommandStarted {
                    task: "build reporting tool".to_string(),
                    command: toolchain.build_command(None).to_string(),
                });
            } else {
                check_toolchain(&pipeline.go)?;
                toolchain.build_tool(runner.as_ref(), None).await?;
            }
        } else {
            info!(binary = %toolchain.binary().display(), "using existing binary");
        }

        let executor = TaskExecutor::new(pipeline, runner, reporter).with_only(self.only.clone());
        run.extend(executor.execute("primary", tasks).await);
        Ok(())
    }
}

/// Exit status of a run: critical failures first, then failed tasks
fn finish(run: &WorkflowRun, outcome: Result<(), CovflowError>) -> anyhow::Result<()> {
    outcome?;

    if run.has_failures() {
        let failed = run.counts().failed;
        anyhow::bail!(
            "{} task{} failed",
            failed,
            if failed == 1 { "" } else { "s" }
        );
    }

    Ok(())
}

/// Every `--only` name must match a configured task
fn check_selection(tasks: &[TaskDefinition], only: &[String]) -> Result<(), ConfigError> {
    match only.iter().find(|name| !tasks.iter().any(|t| &t.name == *name)) {
        Some(unknown) => Err(ConfigError::InvalidValue {
            field: "--only".to_string(),
            message: format!("no task named '{}'", unknown),
        }),
        None => Ok(()),
    }
}

/// Fail early with a clear message when the toolchain is not installed
fn check_toolchain(go: &str) -> Result<(), PipelineError> {
    match which::which(go) {
        Ok(path) => {
            tracing::debug!(toolchain = %path.display(), "toolchain found");
            Ok(())
        }
        Err(_) => Err(PipelineError::ExecutableNotFound {
            program: go.to_string(),
        }),
    }
}

fn clean_reports(root: &Path) -> std::io::Result<()> {
    if root.exists() {
        info!(path = %root.display(), "removing previous reports");
        std::fs::remove_dir_all(root)?;
    }
    Ok(())
}

/// Best effort: a leftover binary never fails the run
fn remove_binary(binary: &Path, show_progress: bool) {
    if !binary.exists() {
        return;
    }
    match std::fs::remove_file(binary) {
        Ok(()) => info!(binary = %binary.display(), "removed reporting binary"),
        Err(e) => {
            warn!(binary = %binary.display(), error = %e, "could not remove reporting binary");
            if show_progress {
                output::warning(&format!("Could not remove {}: {}", binary.display(), e));
            }
        }
    }
}

/// Console reporter with live output
struct ConsoleReporter {
    verbose: bool,
}

impl ConsoleReporter {
    fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl TaskReporter for ConsoleReporter {
    fn report(&self, event: &TaskEvent) {
        match event {
            TaskEvent::TaskStarted { task, output_dir } => {
                println!();
                println!(
                    "  {} {} {}",
                    style("▸").dim(),
                    style(task).bold(),
                    style(format!("→ {}", output_dir)).dim()
                );
            }
            TaskEvent::CommandStarted { task, command } => {
                if self.verbose {
                    println!("    {} {}", style(format!("[{}]", task)).dim(), style(command).dim());
                } else {
                    println!("    {} {}", style("$").dim(), command);
                }
            }
            TaskEvent::Output { line, .. } => {
                println!("    {} {}", style("│").dim(), line);
            }
            TaskEvent::Completed { task, duration } => {
                println!(
                    "  {} {} {}",
                    style("✓").green(),
                    style(task).green(),
                    style(format!("{:.1}s", duration.as_secs_f64())).dim()
                );
            }
            TaskEvent::Failed {
                task,
                duration,
                error,
            } => {
                println!(
                    "  {} {} {} {}",
                    style("✗").red(),
                    style(task).red(),
                    style(format!("{:.1}s", duration.as_secs_f64())).dim(),
                    style(error.lines().last().unwrap_or_default()).red().dim()
                );
            }
            TaskEvent::Skipped { task, reason } => {
                println!(
                    "  {} {} {}",
                    style("○").yellow(),
                    style(task).yellow(),
                    style(format!("({})", reason)).dim()
                );
            }
            TaskEvent::PassStarted { pass, task_count } => {
                println!();
                println!(
                    "{} {} pass ({} task{})",
                    style("─").dim(),
                    output::header(pass),
                    task_count,
                    if *task_count == 1 { "" } else { "s" }
                );
            }
            TaskEvent::PassCompleted {
                pass,
                succeeded,
                failed,
                skipped,
                duration,
            } => {
                println!();
                println!(
                    "  {} {}: {} succeeded, {} failed, {} skipped ({:.1}s)",
                    if *failed == 0 {
                        style("✓").green().bold()
                    } else {
                        style("✗").red().bold()
                    },
                    pass,
                    succeeded,
                    failed,
                    skipped,
                    duration.as_secs_f64()
                );
            }
            TaskEvent::StageChanged { stage } => {
                if self.verbose {
                    println!("{} self-coverage: {}", style("─").dim(), style(stage).cyan());
                }
            }
        }
    }
}
