//! Init command

use std::path::PathBuf;

use clap::Args;
use console::style;
use dialoguer::{Confirm, Select};
use tracing::info;

use covflow_core::config::defaults::{DEFAULT_CONFIG_TEMPLATE, DEFAULT_CONFIG_YAML};
use covflow_core::config::Config;

use crate::cli::{output, Cli};

/// Write a default covflow configuration
#[derive(Debug, Args)]
pub struct InitCommand {
    /// Force overwrite existing configuration
    #[arg(short, long)]
    pub force: bool,

    /// Use defaults without prompting
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Write TOML instead of YAML
    #[arg(long)]
    pub toml: bool,

    /// Output file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl InitCommand {
    /// Execute the init command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(force = self.force, yes = self.yes, "executing init command");
        let cwd = std::env::current_dir()?;
        let config_path = self
            .output
            .clone()
            .unwrap_or_else(|| cwd.join(DEFAULT_CONFIG_YAML));

        // Check if config already exists
        if config_path.exists() && !self.force {
            if self.yes {
                anyhow::bail!(
                    "Configuration file already exists at {}. Use --force to overwrite.",
                    config_path.display()
                );
            }

            let overwrite = Confirm::new()
                .with_prompt(format!(
                    "Configuration file already exists at {}. Overwrite?",
                    config_path.display()
                ))
                .default(false)
                .interact()?;

            if !overwrite {
                println!("{}", style("Aborted.").yellow());
                return Ok(());
            }
        }

        let format = if self.toml {
            Format::Toml
        } else if self.yes || self.output.is_some() {
            Format::from_path(&config_path)
        } else {
            let formats = vec!["yaml", "toml"];
            let selection = Select::new()
                .with_prompt("Configuration format")
                .items(&formats)
                .default(0)
                .interact()?;
            if selection == 1 {
                Format::Toml
            } else {
                Format::Yaml
            }
        };

        let config_path = match format {
            Format::Toml if config_path.extension().is_some_and(|e| e != "toml") => {
                config_path.with_extension("toml")
            }
            _ => config_path,
        };

        std::fs::write(&config_path, render(format)?)?;

        if !cli.quiet {
            output::success(&format!(
                "Created configuration at {}",
                output::path_style().apply_to(config_path.display())
            ));
            println!();
            println!("Next steps:");
            println!("  1. Edit {} to point the tasks at your coverage files", config_path.display());
            println!("  2. Run {} to review the tasks", style("covflow list").cyan());
            println!("  3. Run {} to generate the reports", style("covflow run").cyan());
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Yaml,
    Toml,
}

impl Format {
    fn from_path(path: &std::path::Path) -> Self {
        if path.extension().is_some_and(|e| e == "toml") {
            Self::Toml
        } else {
            Self::Yaml
        }
    }
}

fn render(format: Format) -> anyhow::Result<String> {
    Ok(match format {
        Format::Yaml => DEFAULT_CONFIG_TEMPLATE.to_string(),
        Format::Toml => {
            let config: Config = serde_yaml::from_str(DEFAULT_CONFIG_TEMPLATE)?;
            toml::to_string_pretty(&config)?
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_format_from_path() {
        assert_eq!(Format::from_path(Path::new("covflow.toml")), Format::Toml);
        assert_eq!(Format::from_path(Path::new("covflow.yaml")), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("covflow")), Format::Yaml);
    }

    #[test]
    fn test_rendered_configs_parse_back() {
        let yaml: Config = serde_yaml::from_str(&render(Format::Yaml).unwrap()).unwrap();
        let toml: Config = toml::from_str(&render(Format::Toml).unwrap()).unwrap();

        assert_eq!(yaml.tasks, toml.tasks);
        assert_eq!(yaml.reports.types, toml.reports.types);
    }
}
