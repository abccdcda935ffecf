//! Command-line entry point: fetches repository metadata (and optionally the
//! latest release) and prints the aggregated result as JSON.

use std::process::ExitCode;

use clap::Parser;
use github_connector::{ClientOptions, GitHubClient, DEFAULT_BASE_URL};
use serde::Serialize;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "github-connector")]
#[command(about = "Fetch GitHub repository metadata with rate-limit aware retries")]
#[command(version)]
struct Cli {
    /// Repository owner (user or organization)
    owner: String,
    /// Repository name
    repo: String,
    /// Also fetch the latest release
    #[arg(short, long)]
    latest_release: bool,
    /// API root, e.g. for GitHub Enterprise
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,
    /// Total HTTP attempts per call
    #[arg(long, default_value_t = ClientOptions::default().max_attempts)]
    max_attempts: u32,
}

#[derive(Serialize)]
struct Report {
    #[serde(rename = "Repo")]
    repo: Value,
    #[serde(rename = "LatestRelease", skip_serializing_if = "Option::is_none")]
    latest_release: Option<Value>,
}

async fn run(cli: Cli) -> anyhow::Result<Report> {
    let github = GitHubClient::from_env()?
        .with_base_url(cli.base_url)
        .with_options(ClientOptions {
            max_attempts: cli.max_attempts,
            ..ClientOptions::default()
        });

    let repo = github.get_repo(&cli.owner, &cli.repo).await?;
    let latest_release = if cli.latest_release {
        Some(github.get_latest_release(&cli.owner, &cli.repo).await?)
    } else {
        None
    };

    Ok(Report {
        repo,
        latest_release,
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let report = match run(cli).await {
        Ok(report) => report,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&report) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
