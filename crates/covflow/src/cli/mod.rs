//! CLI definition and command handling

pub mod commands;
pub mod output;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::debug;

use covflow_core::config::{load_config, load_config_or_default, project_root, Config};

use commands::{InitCommand, ListCommand, RunCommand};

/// covflow - Coverage-report pipeline runner
#[derive(Debug, Parser)]
#[command(name = "covflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Working directory
    #[arg(short = 'C', long, global = true)]
    pub directory: Option<PathBuf>,

    /// Configuration file (searched upwards from the working directory by default)
    #[arg(short, long, global = true, env = "COVFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate coverage reports for every configured task
    Run(RunCommand),

    /// Show the configured report tasks
    List(ListCommand),

    /// Write a default covflow configuration
    Init(InitCommand),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> anyhow::Result<()> {
        // Change to specified directory if provided
        if let Some(dir) = &self.directory {
            std::env::set_current_dir(dir)?;
        }

        match self.command {
            Commands::Run(ref cmd) => cmd.execute(&self),
            Commands::List(ref cmd) => cmd.execute(&self),
            Commands::Init(ref cmd) => cmd.execute(&self),
        }
    }

    /// Load the configuration and the directory its relative paths refer to
    pub fn load_config(&self, cwd: &Path) -> anyhow::Result<(Config, PathBuf)> {
        let (config, path) = match &self.config {
            Some(path) => {
                let path = if path.is_absolute() {
                    path.clone()
                } else {
                    cwd.join(path)
                };
                (load_config(&path)?, Some(path))
            }
            None => load_config_or_default(cwd)?,
        };

        let root = project_root(path.as_deref(), cwd);
        debug!(
            config = ?path.as_ref().map(|p| p.display().to_string()),
            root = %root.display(),
            "configuration loaded"
        );
        Ok((config, root))
    }

    /// Whether human-readable progress should be printed
    pub fn show_progress(&self) -> bool {
        !self.quiet && self.format == OutputFormat::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::try_parse_from([
            "covflow",
            "run",
            "--report-types",
            "Html,Lcov",
            "--self-cover",
            "--only",
            "a",
            "--only",
            "b",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Run(cmd) => {
                assert_eq!(cmd.report_types.as_deref(), Some("Html,Lcov"));
                assert!(cmd.self_cover);
                assert!(!cmd.rebuild_binary);
                assert_eq!(cmd.only, vec!["a", "b"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_load_config_defaults_without_file() {
        let temp = TempDir::new().unwrap();
        let cli = Cli::try_parse_from(["covflow", "list"]).unwrap();

        let (config, root) = cli.load_config(temp.path()).unwrap();
        assert_eq!(root, temp.path());
        assert!(!config.tasks.is_empty());
    }

    #[test]
    fn test_load_config_explicit_path() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("ci");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(
            nested.join("cov.yaml"),
            "tasks:\n  - name: only\n    inputs: [a.xml]\n    output_dir_suffix: only\n",
        )
        .unwrap();

        let cli = Cli::try_parse_from(["covflow", "-c", "ci/cov.yaml", "list"]).unwrap();
        let (config, root) = cli.load_config(temp.path()).unwrap();

        assert_eq!(root, nested);
        assert_eq!(config.tasks.len(), 1);
    }

    #[test]
    fn test_load_config_missing_explicit_path() {
        let temp = TempDir::new().unwrap();
        let cli = Cli::try_parse_from(["covflow", "-c", "nope.yaml", "list"]).unwrap();
        assert!(cli.load_config(temp.path()).is_err());
    }
}
