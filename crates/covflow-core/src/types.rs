//! Core types for covflow

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Output format produced by the reporting tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportType {
    /// Browsable HTML bundle
    Html,
    /// Plain-text summary
    TextSummary,
    /// LCOV line-coverage export
    Lcov,
    /// Raw structured JSON export
    RawJson,
}

impl ReportType {
    /// Returns the spelling the reporting tool expects
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "Html",
            Self::TextSummary => "TextSummary",
            Self::Lcov => "Lcov",
            Self::RawJson => "RawJson",
        }
    }
}

impl std::fmt::Display for ReportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "html" => Ok(Self::Html),
            "textsummary" => Ok(Self::TextSummary),
            "lcov" => Ok(Self::Lcov),
            "rawjson" => Ok(Self::RawJson),
            _ => Err(format!("Unknown report type: {}", s.trim())),
        }
    }
}

/// Ordered, de-duplicated selection of report types
///
/// Never empty: an empty selection is rejected at construction so that no
/// subprocess is spawned for a run that could not produce anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTypes(Vec<ReportType>);

impl ReportTypes {
    /// Build a selection from parsed types, keeping the first occurrence of each
    pub fn new(types: impl IntoIterator<Item = ReportType>) -> Result<Self, ConfigError> {
        let mut selected = Vec::new();
        for report_type in types {
            if !selected.contains(&report_type) {
                selected.push(report_type);
            }
        }

        if selected.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "reports.types".to_string(),
                message: "at least one report type is required".to_string(),
            });
        }

        Ok(Self(selected))
    }

    /// Parse a comma-separated list such as `Html,TextSummary,Lcov`
    pub fn parse(list: &str) -> Result<Self, ConfigError> {
        Self::from_names(list.split(','))
    }

    /// Parse individual type names, ignoring blank entries
    pub fn from_names<I, S>(names: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut types = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() {
                continue;
            }
            let parsed = name
                .parse::<ReportType>()
                .map_err(|message| ConfigError::InvalidValue {
                    field: "reports.types".to_string(),
                    message,
                })?;
            types.push(parsed);
        }
        Self::new(types)
    }

    /// Selected types in order
    #[cfg(test)]
    fn as_slice(&self) -> &[ReportType] {
        &self.0
    }

    /// Render as the comma-joined value of `--reporttypes=`
    pub fn to_arg(&self) -> String {
        self.0
            .iter()
            .map(ReportType::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl std::fmt::Display for ReportTypes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_arg())
    }
}
