//! Configuration loading

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{ConfigError, Result};

use super::defaults::config_file_names;
use super::types::Config;
use super::validation::validate_config;

/// Load configuration from a file
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()).into());
    }

    let format = if path.extension().is_some_and(|e| e == "toml") {
        "TOML"
    } else {
        "YAML"
    };
    info!(path = %path.display(), format, "loading config");

    let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

    let config: Config = if format == "TOML" {
        toml::from_str(&content).map_err(ConfigError::TomlError)?
    } else {
        serde_yaml::from_str(&content).map_err(ConfigError::YamlError)?
    };

    validate_config(&config)?;
    debug!(path = %path.display(), tasks = config.tasks.len(), "config loaded and validated");
    Ok(config)
}

/// Find configuration file in directory or parent directories.
///
/// The first directory (walking upwards) holding one of
/// [`config_file_names`] wins.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    debug!(start_dir = %start_dir.display(), "searching for config file");
    let mut current = start_dir.to_path_buf();

    loop {
        for name in config_file_names() {
            let config_path = current.join(name);
            if config_path.exists() {
                info!(path = %config_path.display(), "found config file");
                return Some(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    debug!("no config file found");
    None
}

/// Load configuration from directory (searching parent directories)
pub fn load_config_from_dir(dir: &Path) -> Result<(Config, PathBuf)> {
    let config_path = find_config(dir).ok_or_else(|| ConfigError::NotFound(dir.to_path_buf()))?;

    let config = load_config(&config_path)?;
    Ok((config, config_path))
}

/// Load configuration or use defaults.
///
/// Only a missing file falls back to defaults; a file that exists but does
/// not parse or validate is an error.
pub fn load_config_or_default(dir: &Path) -> Result<(Config, Option<PathBuf>)> {
    match find_config(dir) {
        Some(path) => {
            let config = load_config(&path)?;
            Ok((config, Some(path)))
        }
        None => {
            warn!(dir = %dir.display(), "no config found, using defaults");
            Ok((Config::default(), None))
        }
    }
}

/// Directory the paths inside a config file are relative to
pub fn project_root(config_path: Option<&Path>, fallback: &Path) -> PathBuf {
    config_path
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| fallback.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MINIMAL_YAML: &str = "reports:\n  types: [Html]\ntasks:\n  - name: one\n    inputs: [a.xml]\n    output_dir_suffix: one\n";

    #[test]
    fn test_find_config_yaml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("covflow.yaml");
        std::fs::write(&config_path, MINIMAL_YAML).unwrap();

        let found = find_config(temp.path());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_prefers_yaml_over_toml() {
        let temp = TempDir::new().unwrap();
        let yaml_path = temp.path().join("covflow.yaml");
        let toml_path = temp.path().join("covflow.toml");
        std::fs::write(&yaml_path, MINIMAL_YAML).unwrap();
        std::fs::write(&toml_path, "[reports]\ntypes = [\"Html\"]\n").unwrap();

        let found = find_config(temp.path()).unwrap();
        assert_eq!(found, yaml_path);
    }

    #[test]
    fn test_find_config_in_parent_dir() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("covflow.yaml");
        std::fs::write(&config_path, MINIMAL_YAML).unwrap();
        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_config(&nested), Some(config_path));
    }

    #[test]
    fn test_load_config_yaml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("covflow.yaml");
        std::fs::write(&config_path, MINIMAL_YAML).unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.reports.types, vec!["Html"]);
        assert_eq!(config.tasks.len(), 1);
        assert_eq!(config.tasks[0].name, "one");
        assert!(config.tasks[0].enabled);
    }

    #[test]
    fn test_load_config_toml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("covflow.toml");
        std::fs::write(
            &config_path,
            "[reports]\nroot = \"out\"\ntypes = [\"Lcov\"]\n\n[[tasks]]\nname = \"go\"\ninputs = [\"coverage.out\"]\noutput_dir_suffix = \"go\"\nenabled = false\n",
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.reports.root, PathBuf::from("out"));
        assert_eq!(config.tasks.len(), 1);
        assert!(!config.tasks[0].enabled);
    }

    #[test]
    fn test_load_config_rejects_empty_report_types() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("covflow.yaml");
        std::fs::write(&config_path, "reports:\n  types: []\n").unwrap();

        let err = load_config(&config_path).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_load_config_or_default_without_file() {
        let temp = TempDir::new().unwrap();
        let (config, path) = load_config_or_default(temp.path()).unwrap();
        assert!(path.is_none());
        assert!(!config.tasks.is_empty());
    }

    #[test]
    fn test_project_root() {
        let fallback = Path::new("/work");
        assert_eq!(
            project_root(Some(Path::new("/repo/covflow.yaml")), fallback),
            PathBuf::from("/repo")
        );
        assert_eq!(project_root(Some(Path::new("covflow.yaml")), fallback), fallback);
        assert_eq!(project_root(None, fallback), fallback);
    }
}
