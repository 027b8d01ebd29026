//! Typed command-line arguments of the reporting tool
//!
//! Each variant maps to exactly one `--flag=value` argument. List-valued
//! flags are joined with [`LIST_SEPARATOR`] only when rendered; the
//! separator is part of the tool's wire contract and never appears in
//! internal data.

use std::path::PathBuf;

use covflow_core::ReportTypes;

/// Separator between entries of list-valued flags
pub const LIST_SEPARATOR: &str = ";";

/// One argument passed to the reporting tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolArg {
    /// `--report=`: coverage files or glob patterns
    Report(Vec<String>),
    /// `--sourcedirs=`: source roots
    SourceDirs(Vec<String>),
    /// `--output=`: destination directory
    Output(PathBuf),
    /// `--reporttypes=`: comma-joined output formats
    ReportTypes(ReportTypes),
    /// `--filefilters=`: signed include/exclude patterns
    FileFilters(Vec<String>),
    /// `--title=`
    Title(String),
    /// `--verbosity=`
    Verbosity(String),
    /// `--config=`: delegate everything to a config file
    Config(PathBuf),
}

impl ToolArg {
    /// Exclusion filters from plain patterns; already-signed patterns are kept
    pub fn exclude_files<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let filters = patterns
            .into_iter()
            .map(|p| {
                let p = p.as_ref().trim();
                if p.starts_with('-') || p.starts_with('+') {
                    p.to_string()
                } else {
                    format!("-{}", p)
                }
            })
            .filter(|p| p.len() > 1)
            .collect();
        Self::FileFilters(filters)
    }

    /// Flag name without the leading dashes
    pub fn flag(&self) -> &'static str {
        match self {
            Self::Report(_) => "report",
            Self::SourceDirs(_) => "sourcedirs",
            Self::Output(_) => "output",
            Self::ReportTypes(_) => "reporttypes",
            Self::FileFilters(_) => "filefilters",
            Self::Title(_) => "title",
            Self::Verbosity(_) => "verbosity",
            Self::Config(_) => "config",
        }
    }

    /// Flag value as the tool expects it
    pub fn value(&self) -> String {
        match self {
            Self::Report(items) | Self::SourceDirs(items) | Self::FileFilters(items) => {
                items.join(LIST_SEPARATOR)
            }
            Self::Output(path) | Self::Config(path) => path.display().to_string(),
            Self::ReportTypes(types) => types.to_arg(),
            Self::Title(s) | Self::Verbosity(s) => s.clone(),
        }
    }

    /// Render as a single argv entry
    pub fn render(&self) -> String {
        format!("--{}={}", self.flag(), self.value())
    }
}

impl std::fmt::Display for ToolArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}
