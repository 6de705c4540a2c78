//! Output formatting utilities

use bridge_lib::models::SubmitResponse;
use clap::ValueEnum;
use colored::Colorize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Plain,
    /// JSON format
    Json,
}

/// Print a successful submission result
pub fn print_submission(response: &SubmitResponse, format: OutputFormat) {
    match format {
        OutputFormat::Plain => {
            println!(
                "{} pod {} submitted as job {}",
                "✓".green().bold(),
                response.pod_uid,
                response.job_id.bold()
            );
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(response) {
                println!("{}", json);
            }
        }
    }
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}
