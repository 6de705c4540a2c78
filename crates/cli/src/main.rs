//! SLURM submission bridge CLI
//!
//! A command-line tool for submitting pod description files to a running
//! sidecar and printing the resulting batch job id.

mod client;
mod output;

use anyhow::{Context, Result};
use bridge_lib::mem::parse_mem;
use bridge_lib::models::PodSubmission;
use clap::{Parser, Subcommand};

/// SLURM submission bridge CLI
#[derive(Parser)]
#[command(name = "sbridge")]
#[command(author, version, about = "CLI for the SLURM submission bridge", long_about = None)]
pub struct Cli {
    /// Sidecar URL (can also be set via SBRIDGE_API_URL env var)
    #[arg(long, env = "SBRIDGE_API_URL", default_value = "http://localhost:8000")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "plain")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Submit a pod description file as a batch job
    Submit {
        /// Path to a JSON pod submission file
        file: String,

        /// Override every container's memory limit, e.g. 512M or 2G
        #[arg(long)]
        mem_limit: Option<String>,
    },
}

/// Set the declared memory limit of every container in the pod
fn apply_mem_limit(submission: &mut PodSubmission, bytes: i64) {
    let spec = &mut submission.pod.spec;
    for container in spec
        .init_containers
        .iter_mut()
        .chain(spec.containers.iter_mut())
    {
        container.resources.limits.memory = bytes;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let client = client::ApiClient::new(&cli.api_url)?;

    match cli.command {
        Commands::Submit { file, mem_limit } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading pod file {}", file))?;
            let mut submission: PodSubmission =
                serde_json::from_str(&raw).context("parsing pod submission")?;

            if let Some(token) = mem_limit {
                let bytes = parse_mem(&token)
                    .map_err(|e| anyhow::anyhow!("--mem-limit: {}", e))?;
                apply_mem_limit(&mut submission, bytes);
            }

            match client.submit(&submission).await {
                Ok(response) => output::print_submission(&response, cli.format),
                Err(e) => {
                    output::print_error(&e.to_string());
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
