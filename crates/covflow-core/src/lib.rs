//! covflow Core - Core library for coverage-report pipelines
//!
//! This crate provides the foundational types, error handling and
//! configuration shared by the task engine and the CLI.

pub mod config;
pub mod error;
pub mod types;

pub use error::{ConfigError, CovflowError, PipelineError, Result};
pub use types::{ReportType, ReportTypes};
