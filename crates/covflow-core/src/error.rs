//! Error types for covflow

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using CovflowError
pub type Result<T> = std::result::Result<T, CovflowError>;

/// Main error type for covflow operations
#[derive(Debug, Error)]
pub enum CovflowError {
    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Pipeline execution errors
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CovflowError {
    /// Whether the error was raised before any subprocess could run
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found at {0}")]
    NotFound(PathBuf),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// Missing required field
    #[error("Missing required configuration field: {0}")]
    MissingField(String),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while driving external commands
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The program could not be located on PATH or at the given path
    #[error("Command not found: {program}")]
    ExecutableNotFound { program: String },

    /// The process ran but returned a failing status
    #[error("'{step}' exited with {}", .code.map(|c| format!("code {c}")).unwrap_or_else(|| "a signal".to_string()))]
    NonZeroExit {
        step: String,
        code: Option<i32>,
        output: String,
    },

    /// The directory a command should run in does not exist
    #[error("Working directory for '{step}' not found: {}", .path.display())]
    WorkingDirNotFound { step: String, path: PathBuf },

    /// The process could not be started for another reason
    #[error("Failed to start '{step}': {reason}")]
    SpawnFailed { step: String, reason: String },

    /// An expected file or directory was not produced
    #[error("Expected artifact not found at {path}")]
    MissingArtifact { path: PathBuf },

    /// A step whose failure invalidates the rest of the run
    #[error("Critical step '{step}' failed: {reason}")]
    CriticalStep { step: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_zero_exit_message() {
        let err = PipelineError::NonZeroExit {
            step: "go build".to_string(),
            code: Some(2),
            output: String::new(),
        };
        assert_eq!(err.to_string(), "'go build' exited with code 2");

        let err = PipelineError::NonZeroExit {
            step: "go build".to_string(),
            code: None,
            output: String::new(),
        };
        assert_eq!(err.to_string(), "'go build' exited with a signal");
    }

    #[test]
    fn test_working_dir_message_names_directory() {
        let err = PipelineError::WorkingDirNotFound {
            step: "integration".to_string(),
            path: PathBuf::from("/work/missing"),
        };
        assert_eq!(
            err.to_string(),
            "Working directory for 'integration' not found: /work/missing"
        );
    }

    #[test]
    fn test_config_classification() {
        let err: CovflowError = ConfigError::MissingField("reports.types".to_string()).into();
        assert!(err.is_config());

        let err: CovflowError = PipelineError::ExecutableNotFound {
            program: "adlercov".to_string(),
        }
        .into();
        assert!(!err.is_config());
        assert_eq!(err.to_string(), "Command not found: adlercov");
    }

    #[test]
    fn test_io_errors_are_not_config_errors() {
        let err: CovflowError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert!(matches!(err, CovflowError::Io(_)));
        assert!(!err.is_config());
        assert_eq!(err.to_string(), "IO error: denied");
    }
}
