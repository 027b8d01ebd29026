//! covflow Tasks - Coverage-report pipeline engine
//!
//! This crate turns report task definitions into invocations of the
//! reporting tool, runs them one at a time with live output, aggregates the
//! results, and drives the self-coverage workflow around them.

pub mod args;
pub mod command;
pub mod executor;
pub mod pipeline;
pub mod reporter;
pub mod result;
pub mod runner;
pub mod self_coverage;
pub mod task;
pub mod toolchain;

pub use args::{ToolArg, LIST_SEPARATOR};
pub use command::{CommandBuilder, CommandSpec};
pub use executor::TaskExecutor;
pub use pipeline::{tasks_from_config, PipelineConfig};
pub use reporter::{CollectingReporter, TaskEvent, TaskReporter, TaskReporterRegistry, TracingReporter};
pub use result::{RunCounts, TaskResult, TaskStatus, WorkflowRun};
pub use runner::{run_step, ProcessRunner, RunOutput, SpawnError, SystemRunner};
pub use self_coverage::{InstrumentationSession, SelfCoverageWorkflow, WorkflowStage};
pub use task::TaskDefinition;
pub use toolchain::GoToolchain;
