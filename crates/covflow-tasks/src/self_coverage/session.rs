//! Temporary directory receiving raw instrumentation data

use std::io;
use std::path::Path;

use tempfile::TempDir;
use tracing::{debug, warn};

/// Prefix of the temporary instrumentation directory
pub const SESSION_PREFIX: &str = "adlercov_raw_";

/// Owns the raw-coverage directory for one workflow run.
///
/// The directory is removed when the session is closed or dropped,
/// whichever happens first.
#[derive(Debug)]
pub struct InstrumentationSession {
    dir: TempDir,
}

impl InstrumentationSession {
    /// Create a fresh directory under the system temp dir
    pub fn acquire() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix(SESSION_PREFIX).tempdir()?;
        debug!(path = %dir.path().display(), "instrumentation session acquired");
        Ok(Self { dir })
    }

    /// Create the directory under `parent` instead of the system temp dir
    #[cfg(test)]
    pub fn acquire_in(parent: &Path) -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(SESSION_PREFIX)
            .tempdir_in(parent)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Whether the instrumented binary left any data behind
    pub fn has_data(&self) -> bool {
        super::convert::has_instrumentation_data(self.path())
    }

    /// Remove the directory, reporting failures that `Drop` would swallow.
    ///
    /// A failed first attempt is retried once before giving up.
    pub fn close(self) -> io::Result<()> {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            warn!(path = %path.display(), error = %e, "retrying instrumentation directory removal");
            remove_leftover(&path)?;
        }
        debug!(path = %path.display(), "instrumentation session released");
        Ok(())
    }
}

/// Remove whatever is left of a session directory. Already gone is success.
fn remove_leftover(path: &Path) -> io::Result<()> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
