//! Resolved pipeline configuration
//!
//! Built once at process start from the loaded [`Config`] and passed by
//! reference to every component; nothing downstream reads ambient state.

use std::path::{Path, PathBuf};

use covflow_core::config::{Config, SelfCoverageConfig};
use covflow_core::{ConfigError, ReportTypes};

use crate::task::TaskDefinition;

/// File name of the unit-test profile inside the self-coverage directory
pub const UNIT_PROFILE: &str = "coverage-unit.out";

/// File name of the merged integration profile inside the self-coverage directory
pub const INTEGRATION_PROFILE: &str = "coverage-integration.out";

/// Everything a run needs, with paths made absolute
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory relative paths are resolved against
    pub project_root: PathBuf,
    /// Root of every task's output directory
    pub reports_root: PathBuf,
    /// Reporting binary
    pub binary: PathBuf,
    /// Config file the tool reads in delegated mode
    pub tool_config: PathBuf,
    /// Tool sources (build and unit-test working directory)
    pub tool_source_dir: PathBuf,
    /// Main package passed to the build command
    pub main_package: String,
    /// Toolchain program
    pub go: String,
    /// Report formats requested from the tool
    pub report_types: ReportTypes,
    /// Self-coverage settings
    pub self_coverage: SelfCoverageConfig,
    /// Render commands without running them
    pub dry_run: bool,
}

impl PipelineConfig {
    /// Resolve a loaded config against `project_root`.
    ///
    /// `report_types` overrides the configured selection; an empty or unknown
    /// selection is rejected here, before anything is spawned.
    pub fn from_config(
        config: &Config,
        project_root: &Path,
        report_types: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let report_types = match report_types {
            Some(list) => ReportTypes::parse(list)?,
            None => ReportTypes::from_names(&config.reports.types)?,
        };

        let project_root = project_root.to_path_buf();
        let resolve = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                project_root.join(p)
            }
        };

        Ok(Self {
            reports_root: resolve(&config.reports.root),
            binary: resolve(&config.tool.binary),
            tool_config: resolve(&config.tool.config_file),
            tool_source_dir: resolve(&config.tool.source_dir),
            main_package: config.tool.main_package.clone(),
            go: config.tool.go.clone(),
            report_types,
            self_coverage: config.self_coverage.clone(),
            dry_run: false,
            project_root,
        })
    }

    /// Set dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Directory holding the self-coverage profiles
    pub fn self_coverage_dir(&self) -> PathBuf {
        self.reports_root.join(&self.self_coverage.dir_suffix)
    }

    /// Profile written by the tool's unit tests
    pub fn unit_profile(&self) -> PathBuf {
        self.self_coverage_dir().join(UNIT_PROFILE)
    }

    /// Profile merged from the instrumented binary's raw data
    pub fn integration_profile(&self) -> PathBuf {
        self.self_coverage_dir().join(INTEGRATION_PROFILE)
    }
}

/// Task definitions of a loaded config, in order
pub fn tasks_from_config(config: &Config) -> Vec<TaskDefinition> {
    config.tasks.iter().map(TaskDefinition::from).collect()
}
