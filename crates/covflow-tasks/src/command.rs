//! Translation of task definitions into tool invocations

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use covflow_core::ReportTypes;

use crate::args::ToolArg;
use crate::pipeline::PipelineConfig;
use crate::task::TaskDefinition;

/// A fully-specified external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to execute
    pub program: PathBuf,
    /// Arguments, one argv entry each
    pub args: Vec<String>,
    /// Working directory (inherits the current one when unset)
    pub cwd: Option<PathBuf>,
    /// Extra environment variables for this process only
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    /// Create a command with no arguments
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
        }
    }

    /// Append an argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Set an environment variable for this process
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Program name as shown in messages
    pub fn program_name(&self) -> String {
        self.program.display().to_string()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Builds reporting-tool invocations for task definitions
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    binary: PathBuf,
    project_root: PathBuf,
    reports_root: PathBuf,
    tool_config: PathBuf,
    report_types: ReportTypes,
}

impl CommandBuilder {
    /// Create a builder from the resolved pipeline configuration
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            project_root: config.project_root.clone(),
            reports_root: config.reports_root.clone(),
            tool_config: config.tool_config.clone(),
            report_types: config.report_types.clone(),
        }
    }

    /// Output directory of a task
    pub fn output_dir(&self, task: &TaskDefinition) -> PathBuf {
        self.reports_root.join(&task.output_dir_suffix)
    }

    /// Whether the task will be delegated to the tool's config file
    pub fn uses_config_file(&self, task: &TaskDefinition) -> bool {
        task.use_config_file && self.tool_config.is_file()
    }

    /// Typed arguments for a task. Never fails: degenerate tasks (no inputs)
    /// are left for the tool to reject at runtime.
    pub fn tool_args(&self, task: &TaskDefinition) -> Vec<ToolArg> {
        if task.use_config_file {
            if self.tool_config.is_file() {
                debug!(task = %task.name, config = %self.tool_config.display(), "delegating to tool config");
                return vec![ToolArg::Config(self.tool_config.clone())];
            }
            warn!(
                task = %task.name,
                config = %self.tool_config.display(),
                "tool config not found, falling back to explicit flags"
            );
        }

        let mut args = vec![
            ToolArg::Report(task.inputs.iter().map(|i| self.resolve(i)).collect()),
            ToolArg::Output(self.output_dir(task)),
            ToolArg::ReportTypes(self.report_types.clone()),
        ];

        if !task.source_dirs.is_empty() {
            args.push(ToolArg::SourceDirs(
                task.source_dirs.iter().map(|d| self.resolve(d)).collect(),
            ));
        }
        if !task.ignore_patterns.is_empty() {
            args.push(ToolArg::exclude_files(&task.ignore_patterns));
        }
        if let Some(ref title) = task.title {
            args.push(ToolArg::Title(title.clone()));
        }
        if let Some(ref verbosity) = task.verbosity {
            args.push(ToolArg::Verbosity(verbosity.clone()));
        }

        args
    }

    /// Full command for a task
    pub fn build(&self, task: &TaskDefinition) -> CommandSpec {
        CommandSpec::new(&self.binary)
            .args(self.tool_args(task).iter().map(ToolArg::render))
            .current_dir(&self.project_root)
    }

    fn resolve(&self, path: &str) -> String {
        if Path::new(path).is_absolute() {
            path.to_string()
        } else {
            self.project_root.join(path).display().to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use covflow_core::config::Config;
    use tempfile::TempDir;

    fn builder(root: &Path) -> CommandBuilder {
        let pipeline = PipelineConfig::from_config(&Config::default(), root, Some("Html,Lcov")).unwrap();
        CommandBuilder::new(&pipeline)
    }

    #[test]
    fn test_build_explicit_flags() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let task = TaskDefinition::new("merged", "merged")
            .with_input("a/cobertura.xml")
            .with_input("gcov/*.gcov")
            .with_source_dir("a")
            .with_source_dir("b");

        let cmd = builder(root).build(&task);

        assert_eq!(cmd.program, root.join("bin").join(covflow_core::config::binary_name()));
        assert_eq!(
            cmd.args,
            vec![
                format!(
                    "--report={};{}",
                    root.join("a/cobertura.xml").display(),
                    root.join("gcov/*.gcov").display()
                ),
                format!("--output={}", root.join("reports").join("merged").display()),
                "--reporttypes=Html,Lcov".to_string(),
                format!("--sourcedirs={};{}", root.join("a").display(), root.join("b").display()),
            ]
        );
        assert_eq!(cmd.cwd.as_deref(), Some(root));
    }

    #[test]
    fn test_build_optional_metadata() {
        let temp = TempDir::new().unwrap();
        let task = TaskDefinition::new("self", "self")
            .with_input("/abs/coverage.out")
            .with_title("Self")
            .with_verbosity("Verbose")
            .with_ignore_patterns(vec!["vendor/**".to_string()]);

        let args = builder(temp.path()).tool_args(&task);

        assert_eq!(args[0], ToolArg::Report(vec!["/abs/coverage.out".to_string()]));
        assert!(args.contains(&ToolArg::FileFilters(vec!["-vendor/**".to_string()])));
        assert!(args.contains(&ToolArg::Title("Self".to_string())));
        assert!(args.contains(&ToolArg::Verbosity("Verbose".to_string())));
        assert!(!args.iter().any(|a| matches!(a, ToolArg::SourceDirs(_))));
    }

    #[test]
    fn test_empty_inputs_still_build() {
        let temp = TempDir::new().unwrap();
        let task = TaskDefinition::new("no inputs", "none");
        let cmd = builder(temp.path()).build(&task);
        assert_eq!(cmd.args[0], "--report=");
    }

    #[test]
    fn test_config_file_mode() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("nanovision.yaml"), "reports: []\n").unwrap();
        let task = TaskDefinition::new("delegated", "delegated")
            .with_input("ignored.xml")
            .with_config_file(true);

        let b = builder(temp.path());
        let cmd = b.build(&task);

        assert!(b.uses_config_file(&task));
        assert_eq!(
            cmd.args,
            vec![format!("--config={}", temp.path().join("nanovision.yaml").display())]
        );
        assert_eq!(b.output_dir(&task), temp.path().join("reports").join("delegated"));
    }

    #[test]
    fn test_config_file_mode_falls_back_without_file() {
        let temp = TempDir::new().unwrap();
        let task = TaskDefinition::new("delegated", "delegated")
            .with_input("in.xml")
            .with_config_file(true);

        let b = builder(temp.path());
        let cmd = b.build(&task);

        assert!(!b.uses_config_file(&task));
        assert!(cmd.args[0].starts_with("--report="));
    }

    #[test]
    fn test_command_spec_display() {
        let cmd = CommandSpec::new("go")
            .args(["test", "./..."])
            .env("GOFLAGS", "-mod=vendor");
        assert_eq!(cmd.to_string(), "go test ./...");
        assert_eq!(cmd.program_name(), "go");
    }
}
