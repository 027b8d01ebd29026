//! Output formatting utilities

use console::{style, Style};

use covflow_tasks::{TaskStatus, WorkflowRun};

/// Print a success message
pub fn success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}

/// Print a warning message
pub fn warning(message: &str) {
    println!("{} {}", style("!").yellow().bold(), message);
}

/// Print an info message
pub fn info(message: &str) {
    println!("{} {}", style("→").blue(), message);
}

/// Create a styled header
pub fn header(text: &str) -> String {
    style(text).bold().to_string()
}

/// Create a styled key-value line
pub fn key_value(key: &str, value: &str) -> String {
    format!("  {}: {}", style(key).dim(), value)
}

/// Style for paths
pub fn path_style() -> Style {
    Style::new().cyan()
}

/// Style matching a task outcome
pub fn status_style(status: &TaskStatus) -> Style {
    match status {
        TaskStatus::Success(_) => Style::new().green().bold(),
        TaskStatus::Failed(_) => Style::new().red().bold(),
        TaskStatus::Skipped(_) => Style::new().yellow(),
    }
}

/// Print the end-of-run summary with colored status labels
pub fn print_summary(run: &WorkflowRun) {
    for line in run.render_summary().lines() {
        match line.strip_prefix("Status: ") {
            Some(label) => {
                let style = run
                    .results()
                    .iter()
                    .find(|r| r.status.label() == label)
                    .map(|r| status_style(&r.status))
                    .unwrap_or_else(Style::new);
                println!("Status: {}", style.apply_to(label));
            }
            None => println!("{}", line),
        }
    }
}
