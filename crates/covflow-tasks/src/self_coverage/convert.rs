//! Raw instrumentation data helpers

use std::fs;
use std::io;
use std::path::Path;

/// Whether `dir` exists and holds at least one file
pub fn has_instrumentation_data(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .any(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        })
        .unwrap_or(false)
}

/// Prepend `header` to the profile at `path` unless it already starts with a
/// `mode:` line. Returns whether the file was rewritten.
pub fn ensure_mode_header(path: &Path, header: &str) -> io::Result<bool> {
    let contents = fs::read_to_string(path)?;
    if contents.trim_start().starts_with("mode:") {
        return Ok(false);
    }
    fs::write(path, format!("{}\n{}", header.trim_end(), contents))?;
    Ok(true)
}
