//! Commands issued to the Go toolchain

use std::path::{Path, PathBuf};

use tracing::info;

use covflow_core::CovflowError;

use crate::command::CommandSpec;
use crate::pipeline::PipelineConfig;
use crate::runner::{run_step, ProcessRunner};

/// Environment variable the instrumented binary writes raw coverage to
pub const COVERDIR_ENV: &str = "GOCOVERDIR";

/// Builds, tests and merges coverage for the reporting tool
#[derive(Debug, Clone)]
pub struct GoToolchain {
    go: String,
    source_dir: PathBuf,
    main_package: String,
    binary: PathBuf,
}

impl GoToolchain {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            go: config.go.clone(),
            source_dir: config.tool_source_dir.clone(),
            main_package: config.main_package.clone(),
            binary: config.binary.clone(),
        }
    }

    /// `go build [-cover] -o <binary> <main package>`; instrumented when
    /// `coverdir` is set
    pub fn build_command(&self, coverdir: Option<&Path>) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.go).arg("build");
        if coverdir.is_some() {
            spec = spec.arg("-cover");
        }
        spec = spec
            .arg("-o")
            .arg(self.binary.display().to_string())
            .arg(&self.main_package)
            .current_dir(&self.source_dir);
        if let Some(dir) = coverdir {
            spec = spec.env(COVERDIR_ENV, dir.display().to_string());
        }
        spec
    }

    /// `go test -coverprofile=<profile> ./...`
    pub fn unit_test_command(&self, profile: &Path) -> CommandSpec {
        CommandSpec::new(&self.go)
            .arg("test")
            .arg(format!("-coverprofile={}", profile.display()))
            .arg("./...")
            .current_dir(&self.source_dir)
    }

    /// `go tool covdata textfmt -i=<raw dir> -o=<profile>`
    pub fn convert_command(&self, raw_dir: &Path, profile: &Path) -> CommandSpec {
        CommandSpec::new(&self.go)
            .args(["tool", "covdata", "textfmt"])
            .arg(format!("-i={}", raw_dir.display()))
            .arg(format!("-o={}", profile.display()))
            .current_dir(&self.source_dir)
    }

    /// Path of the built binary
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Build the reporting binary. Critical: any failure aborts the run.
    pub async fn build_tool(
        &self,
        runner: &dyn ProcessRunner,
        coverdir: Option<&Path>,
    ) -> Result<(), CovflowError> {
        if let Some(parent) = self.binary.parent() {
            std::fs::create_dir_all(parent)?;
        }
        info!(binary = %self.binary.display(), instrumented = coverdir.is_some(), "building reporting tool");
        run_step(runner, "build reporting tool", &self.build_command(coverdir), true).await?;
        Ok(())
    }
}
