//! Configuration validation

use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::types::ReportTypes;

use super::types::Config;

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    debug!("validating configuration");
    validate_tool(config)?;
    validate_reports(config)?;
    validate_tasks(config)?;
    debug!("configuration validation passed");
    Ok(())
}

fn validate_tool(config: &Config) -> Result<()> {
    if config.tool.binary.as_os_str().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "tool.binary".to_string(),
            message: "binary path cannot be empty".to_string(),
        }
        .into());
    }

    if config.tool.go.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "tool.go".to_string(),
            message: "toolchain program cannot be empty".to_string(),
        }
        .into());
    }

    Ok(())
}

fn validate_reports(config: &Config) -> Result<()> {
    ReportTypes::from_names(&config.reports.types)?;
    Ok(())
}

fn validate_tasks(config: &Config) -> Result<()> {
    debug!(count = config.tasks.len(), "validating tasks");
    for (i, task) in config.tasks.iter().enumerate() {
        if task.name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: format!("tasks[{}].name", i),
                message: "task name cannot be empty".to_string(),
            }
            .into());
        }

        if task.output_dir_suffix.trim().is_empty() {
            return Err(ConfigError::MissingField(format!("tasks[{}].output_dir_suffix", i)).into());
        }

        if std::path::Path::new(&task.output_dir_suffix).is_absolute() {
            return Err(ConfigError::InvalidValue {
                field: format!("tasks[{}].output_dir_suffix", i),
                message: "must be relative to the reports root".to_string(),
            }
            .into());
        }
    }

    Ok(())
}
