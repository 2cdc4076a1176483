mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "chronicle-cli")]
#[command(about = "Chronicle activity summary command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one summary pipeline in the foreground and print the outcome
    Run(RunArgs),
    /// Check that an activity query is ordered by activity date ascending
    CheckQuery {
        /// The activity query text
        query: String,
    },
}

#[derive(Debug, clap::Args)]
pub(crate) struct RunArgs {
    /// Parent account record id
    #[arg(long)]
    pub account: String,
    /// Id of the user the run is reported for
    #[arg(long)]
    pub user: String,
    /// URL that receives the completion callback
    #[arg(long)]
    pub callback_url: String,
    /// Bearer token for the completion callback
    #[arg(long, env = "CHRONICLE_CALLBACK_TOKEN")]
    pub callback_token: String,
    /// File holding the monthly prompt (uses `{{YearMonth}}`)
    #[arg(long)]
    pub monthly_prompt: PathBuf,
    /// File holding the quarterly prompt (uses `{{Quarter}}` and `{{Year}}`)
    #[arg(long)]
    pub quarterly_prompt: PathBuf,
    /// Activity query, ordered by activity date ascending
    #[arg(long)]
    pub query: String,
    /// JSON file mapping period keys ("Jan 2024", "Q1 2024") to existing record ids
    #[arg(long)]
    pub existing: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::CheckQuery { query } => {
            init_tracing("info")?;
            chronicle_crm::validate_activity_query(&query)?;
            println!("ok: query is ordered by ActivityDate ascending");
        }
        Commands::Run(args) => {
            let config = chronicle_core::load_app_config()?;
            init_tracing(&config.log_level)?;
            run::run_pipeline(&config, args).await?;
        }
    }

    Ok(())
}

fn init_tracing(fallback: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(fallback))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    Ok(())
}

#[cfg(test)]
mod tests;
