//! Configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::defaults;

/// Main configuration for covflow
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project name, shown in the summary header
    pub name: Option<String>,

    /// Reporting tool configuration
    pub tool: ToolConfig,

    /// Report output configuration
    pub reports: ReportsConfig,

    /// Self-coverage workflow configuration
    pub self_coverage: SelfCoverageConfig,

    /// Report generation tasks, executed in order
    pub tasks: Vec<ReportTaskConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: None,
            tool: ToolConfig::default(),
            reports: ReportsConfig::default(),
            self_coverage: SelfCoverageConfig::default(),
            tasks: defaults::default_tasks(),
        }
    }
}

/// Reporting tool location and build settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Path of the reporting binary, relative to the project root
    pub binary: PathBuf,

    /// Directory holding the tool's sources (build and unit-test working dir)
    pub source_dir: PathBuf,

    /// Main package passed to the build command
    pub main_package: String,

    /// Toolchain program used to build, test and merge profiles
    pub go: String,

    /// Well-known config file the tool reads in delegated mode
    pub config_file: PathBuf,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("bin").join(defaults::binary_name()),
            source_dir: PathBuf::from("."),
            main_package: "cmd/main.go".to_string(),
            go: "go".to_string(),
            config_file: PathBuf::from(defaults::TOOL_CONFIG_FILE),
        }
    }
}

/// Report output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportsConfig {
    /// Root directory every task's output directory is created under
    pub root: PathBuf,

    /// Report types requested from the tool
    pub types: Vec<String>,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("reports"),
            types: vec![
                "Html".to_string(),
                "TextSummary".to_string(),
                "Lcov".to_string(),
            ],
        }
    }
}

/// Self-coverage workflow configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfCoverageConfig {
    /// Directory under the reports root holding the merged profiles
    pub dir_suffix: String,

    /// Header line required at the top of the merged profile
    pub mode_header: String,

    /// Exclusion patterns applied to the merged self-coverage report
    pub file_filters: Vec<String>,

    /// Also run a task that delegates to the tool's config file
    pub include_config_task: bool,
}

impl Default for SelfCoverageConfig {
    fn default() -> Self {
        Self {
            dir_suffix: "adlercov_self_coverage".to_string(),
            mode_header: "mode: set".to_string(),
            file_filters: vec![
                "**/*_test.go".to_string(),
                "vendor/**".to_string(),
                "tools/**".to_string(),
            ],
            include_config_task: false,
        }
    }
}

/// One report generation task as written in the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportTaskConfig {
    /// Task name
    pub name: String,

    /// Coverage files or glob patterns, passed through untouched
    pub inputs: Vec<String>,

    /// Source roots used to resolve files referenced by the coverage data
    pub source_dirs: Vec<String>,

    /// Output directory relative to the reports root
    pub output_dir_suffix: String,

    /// Whether the task runs at all
    pub enabled: bool,

    /// Report title
    pub title: Option<String>,

    /// Tool verbosity level
    pub verbosity: Option<String>,

    /// File patterns excluded from the report
    pub ignore_patterns: Vec<String>,

    /// Delegate everything to the tool's config file
    pub use_config_file: bool,

    /// Whether the tool is expected to exit successfully
    pub expect_success: bool,

    /// Glob patterns that must match inside the output directory afterwards
    pub expected_outputs: Vec<String>,
}

impl Default for ReportTaskConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            inputs: Vec::new(),
            source_dirs: Vec::new(),
            output_dir_suffix: String::new(),
            enabled: true,
            title: None,
            verbosity: None,
            ignore_patterns: Vec::new(),
            use_config_file: false,
            expect_success: true,
            expected_outputs: Vec::new(),
        }
    }
}
