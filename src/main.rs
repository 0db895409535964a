use std::path::PathBuf;

use actions_metrics::client::GitHubApi;
use actions_metrics::config::Config;
use actions_metrics::usage::{self, UsageQuery, DEFAULT_SINCE_DAYS};
use actions_metrics::server;
use anyhow::Context;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "actions-metrics", version, about = "GitHub Actions job duration metrics")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Receive workflow_job webhooks and export job durations as gauges
    Serve {
        #[arg(short, long, default_value = "config.yml")]
        config: PathBuf,
    },

    /// Sum job run time of a repository over a trailing window
    Usage {
        /// GitHub user the token belongs to
        #[arg(short, long)]
        user: String,

        #[arg(short, long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: String,

        /// Repository name, without the owner
        #[arg(short, long)]
        repository: String,

        /// Number of days to look back
        #[arg(short, long, default_value_t = DEFAULT_SINCE_DAYS)]
        since: u32,

        /// GitHub API base URL, for GitHub Enterprise
        #[arg(long)]
        api_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Commands::Serve { config } => {
            let config = Config::load(&config)?;
            server::serve(&config).await
        }
        Commands::Usage {
            user,
            token,
            repository,
            since,
            api_url,
        } => {
            let query = UsageQuery::new(&user, &repository, since)?;
            let api = GitHubApi::new(&token, api_url.as_deref())?;

            let report = usage::aggregate(&api, &query, chrono::Utc::now(), &mut std::io::stdout())
                .await
                .with_context(|| format!("Cannot compute usage of {}", query.repository))?;
            println!("{report}");
            Ok(())
        }
    }
}
