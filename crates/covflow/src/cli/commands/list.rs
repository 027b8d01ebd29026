//! List command

use clap::Args;
use console::style;

use covflow_tasks::{tasks_from_config, CommandBuilder, PipelineConfig};

use crate::cli::{output, Cli, OutputFormat};

/// Show the configured report tasks
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Also show disabled tasks
    #[arg(short, long)]
    pub all: bool,
}

impl ListCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let cwd = std::env::current_dir()?;
        let (config, root) = cli.load_config(&cwd)?;
        let pipeline = PipelineConfig::from_config(&config, &root, None)?;
        let builder = CommandBuilder::new(&pipeline);

        let tasks: Vec<_> = tasks_from_config(&config)
            .into_iter()
            .filter(|t| self.all || t.enabled)
            .collect();

        if cli.format == OutputFormat::Json {
            let entries: Vec<serde_json::Value> = tasks
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "task": t,
                        "output_dir": builder.output_dir(t),
                        "command": builder.build(t).to_string(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
            return Ok(());
        }

        if cli.quiet {
            for task in &tasks {
                println!("{}", task.name);
            }
            return Ok(());
        }

        println!(
            "{} {}",
            output::header("Report tasks"),
            style(format!("(binary: {})", pipeline.binary.display())).dim()
        );
        if tasks.is_empty() {
            output::info("No tasks configured.");
            return Ok(());
        }

        for task in &tasks {
            println!();
            let marker = if task.enabled {
                style("●").green()
            } else {
                style("○").yellow()
            };
            println!("{} {}", marker, style(&task.name).bold());
            println!("{}", output::key_value("inputs", &task.inputs.join(", ")));
            if !task.source_dirs.is_empty() {
                println!("{}", output::key_value("sources", &task.source_dirs.join(", ")));
            }
            println!(
                "{}",
                output::key_value(
                    "output",
                    &output::path_style()
                        .apply_to(builder.output_dir(task).display())
                        .to_string()
                )
            );
            if builder.uses_config_file(task) {
                println!("{}", output::key_value("mode", "tool config file"));
            }
            if !task.expect_success {
                println!("{}", output::key_value("expects", "failure"));
            }
            if cli.verbose {
                println!("{}", output::key_value("command", &builder.build(task).to_string()));
            }
        }

        Ok(())
    }
}
