//! Exit codes for the CLI

use covflow_core::{ConfigError, CovflowError};

/// Every task succeeded
pub const SUCCESS: i32 = 0;

/// A task failed or a critical step aborted the run
pub const ERROR: i32 = 1;

/// Configuration rejected before anything ran
pub const CONFIG_ERROR: i32 = 2;

/// Map an error returned by a command to the process exit code
pub fn for_error(err: &anyhow::Error) -> i32 {
    let is_config = err.chain().any(|cause| {
        cause.is::<ConfigError>()
            || cause
                .downcast_ref::<CovflowError>()
                .is_some_and(CovflowError::is_config)
    });
    if is_config {
        CONFIG_ERROR
    } else {
        ERROR
    }
}
