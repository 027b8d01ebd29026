//! Default configuration values

use super::types::{Config, ReportTaskConfig};

/// Default configuration file name (YAML)
pub const DEFAULT_CONFIG_YAML: &str = "covflow.yaml";

/// Default configuration file name (TOML)
pub const DEFAULT_CONFIG_TOML: &str = "covflow.toml";

/// Alternative configuration file name
pub const ALT_CONFIG_FILE: &str = ".covflow.yaml";

/// Config file the reporting tool itself reads in delegated mode
pub const TOOL_CONFIG_FILE: &str = "nanovision.yaml";

/// Get list of config file names to search for
pub fn config_file_names() -> Vec<&'static str> {
    vec![
        DEFAULT_CONFIG_YAML,
        DEFAULT_CONFIG_TOML,
        ALT_CONFIG_FILE,
        ".covflow.toml",
    ]
}

/// Platform-specific file name of the reporting binary
pub fn binary_name() -> &'static str {
    if cfg!(windows) {
        "adlercov.exe"
    } else {
        "adlercov"
    }
}

const CSHARP_COBERTURA: &str = "demo_projects/csharp/report/cobertura/cobertura.xml";
const CSHARP_PROJECT: &str = "demo_projects/csharp/project";
const GO_COVERAGE_OUT: &str = "demo_projects/go/report/gocover/coverage.out";
const GO_PROJECT: &str = "demo_projects/go/project";
const CPP_GCOV_PATTERN: &str = "demo_projects/cpp/report/gcov/branch-probabilities/*.gcov";
const CPP_COBERTURA: &str = "demo_projects/cpp/report/cobertura/cobertura.xml";
const CPP_PROJECT: &str = "demo_projects/cpp/project";

fn task(
    name: &str,
    inputs: &[&str],
    source_dirs: &[&str],
    output_dir_suffix: &str,
    enabled: bool,
) -> ReportTaskConfig {
    ReportTaskConfig {
        name: name.to_string(),
        inputs: inputs.iter().map(|s| s.to_string()).collect(),
        source_dirs: source_dirs.iter().map(|s| s.to_string()).collect(),
        output_dir_suffix: output_dir_suffix.to_string(),
        enabled,
        ..Default::default()
    }
}

/// Report tasks over the bundled demo projects
pub fn default_tasks() -> Vec<ReportTaskConfig> {
    vec![
        task(
            "C# Project Only (from Cobertura)",
            &[CSHARP_COBERTURA],
            &[CSHARP_PROJECT],
            "csharp_cobertura_only",
            true,
        ),
        task(
            "Go Project Only (from gocover)",
            &[GO_COVERAGE_OUT],
            &[GO_PROJECT],
            "go_gocover_only",
            false,
        ),
        task(
            "C++ Project Only (from gcov)",
            &[CPP_GCOV_PATTERN],
            &[CPP_PROJECT],
            "cpp_gcov_only",
            false,
        ),
        task(
            "C++ Project Only (from Cobertura)",
            &[CPP_COBERTURA],
            &[CPP_PROJECT],
            "cpp_cobertura_only",
            false,
        ),
        task(
            "Merged - All Cobertura Reports",
            &[CSHARP_COBERTURA, CPP_COBERTURA],
            &[CSHARP_PROJECT, CPP_PROJECT],
            "merged_all_cobertura",
            false,
        ),
        task(
            "Merged - All Projects (Mixed Input Types)",
            &[CSHARP_COBERTURA, GO_COVERAGE_OUT, CPP_GCOV_PATTERN],
            &[CSHARP_PROJECT, GO_PROJECT, CPP_PROJECT],
            "merged_all_projects_mixed",
            true,
        ),
        ReportTaskConfig {
            expect_success: false,
            ..task(
                "Failure - Missing Report Argument",
                &[],
                &["."],
                "failure_missing_report_arg",
                false,
            )
        },
    ]
}

/// Generate default configuration YAML
pub fn default_config_yaml() -> String {
    let config = Config::default();
    serde_yaml::to_string(&config).unwrap_or_else(|_| DEFAULT_CONFIG_TEMPLATE.to_string())
}

/// Default configuration template
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# covflow configuration
# Paths are relative to the directory holding this file.

tool:
  binary: bin/adlercov
  source_dir: .
  main_package: cmd/main.go
  go: go
  config_file: nanovision.yaml

reports:
  root: reports
  types: [Html, TextSummary, Lcov]

self_coverage:
  dir_suffix: adlercov_self_coverage
  mode_header: "mode: set"
  file_filters: ["**/*_test.go", "vendor/**", "tools/**"]
  include_config_task: false

tasks:
  - name: "C# Project Only (from Cobertura)"
    inputs: [demo_projects/csharp/report/cobertura/cobertura.xml]
    source_dirs: [demo_projects/csharp/project]
    output_dir_suffix: csharp_cobertura_only

  - name: "Go Project Only (from gocover)"
    inputs: [demo_projects/go/report/gocover/coverage.out]
    source_dirs: [demo_projects/go/project]
    output_dir_suffix: go_gocover_only
    enabled: false

  - name: "C++ Project Only (from gcov)"
    inputs: ["demo_projects/cpp/report/gcov/branch-probabilities/*.gcov"]
    source_dirs: [demo_projects/cpp/project]
    output_dir_suffix: cpp_gcov_only
    enabled: false

  - name: "C++ Project Only (from Cobertura)"
    inputs: [demo_projects/cpp/report/cobertura/cobertura.xml]
    source_dirs: [demo_projects/cpp/project]
    output_dir_suffix: cpp_cobertura_only
    enabled: false

  - name: "Merged - All Cobertura Reports"
    inputs:
      - demo_projects/csharp/report/cobertura/cobertura.xml
      - demo_projects/cpp/report/cobertura/cobertura.xml
    source_dirs: [demo_projects/csharp/project, demo_projects/cpp/project]
    output_dir_suffix: merged_all_cobertura
    enabled: false

  - name: "Merged - All Projects (Mixed Input Types)"
    inputs:
      - demo_projects/csharp/report/cobertura/cobertura.xml
      - demo_projects/go/report/gocover/coverage.out
      - "demo_projects/cpp/report/gcov/branch-probabilities/*.gcov"
    source_dirs:
      - demo_projects/csharp/project
      - demo_projects/go/project
      - demo_projects/cpp/project
    output_dir_suffix: merged_all_projects_mixed

  # The tool must reject a run without --report.
  - name: "Failure - Missing Report Argument"
    inputs: []
    source_dirs: [.]
    output_dir_suffix: failure_missing_report_arg
    enabled: false
    expect_success: false
"#;
