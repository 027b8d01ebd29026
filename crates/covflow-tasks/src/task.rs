//! Task types and definitions

use serde::{Deserialize, Serialize};

use covflow_core::config::ReportTaskConfig;

/// Definition of one report generation task
///
/// Inputs and source directories are opaque strings: they may be glob
/// patterns and are handed to the reporting tool without expansion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    /// Task name, used in the summary
    pub name: String,

    /// Coverage files or glob patterns
    pub inputs: Vec<String>,

    /// Source roots for resolving files referenced by the coverage data
    pub source_dirs: Vec<String>,

    /// Output directory relative to the reports root
    pub output_dir_suffix: String,

    /// Disabled tasks are reported as skipped and never invoke the tool
    pub enabled: bool,

    /// Report title
    pub title: Option<String>,

    /// Tool verbosity level
    pub verbosity: Option<String>,

    /// File patterns excluded from the report
    pub ignore_patterns: Vec<String>,

    /// Delegate inputs, outputs and formats to the tool's config file
    pub use_config_file: bool,

    /// Whether the tool is expected to exit successfully
    pub expect_success: bool,

    /// Globs that must match inside the output directory after a successful run
    pub expected_outputs: Vec<String>,
}

impl TaskDefinition {
    /// Create a new, enabled task definition
    pub fn new(name: impl Into<String>, output_dir_suffix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            source_dirs: Vec::new(),
            output_dir_suffix: output_dir_suffix.into(),
            enabled: true,
            title: None,
            verbosity: None,
            ignore_patterns: Vec::new(),
            use_config_file: false,
            expect_success: true,
            expected_outputs: Vec::new(),
        }
    }

    /// Add a coverage input
    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.inputs.push(input.into());
        self
    }

    /// Add a source directory
    pub fn with_source_dir(mut self, dir: impl Into<String>) -> Self {
        self.source_dirs.push(dir.into());
        self
    }

    /// Set whether the task runs
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the report title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the tool verbosity
    pub fn with_verbosity(mut self, verbosity: impl Into<String>) -> Self {
        self.verbosity = Some(verbosity.into());
        self
    }

    /// Set the excluded file patterns
    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    /// Delegate to the tool's config file
    pub fn with_config_file(mut self, use_config_file: bool) -> Self {
        self.use_config_file = use_config_file;
        self
    }

    /// Set whether the tool should exit successfully
    pub fn with_expect_success(mut self, expect_success: bool) -> Self {
        self.expect_success = expect_success;
        self
    }

    /// Require a file matching `pattern` in the output directory
    pub fn with_expected_output(mut self, pattern: impl Into<String>) -> Self {
        self.expected_outputs.push(pattern.into());
        self
    }
}

impl From<&ReportTaskConfig> for TaskDefinition {
    fn from(config: &ReportTaskConfig) -> Self {
        Self {
            name: config.name.clone(),
            inputs: config.inputs.clone(),
            source_dirs: config.source_dirs.clone(),
            output_dir_suffix: config.output_dir_suffix.clone(),
            enabled: config.enabled,
            title: config.title.clone(),
            verbosity: config.verbosity.clone(),
            ignore_patterns: config.ignore_patterns.clone(),
            use_config_file: config.use_config_file,
            expect_success: config.expect_success,
            expected_outputs: config.expected_outputs.clone(),
        }
    }
}
