use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "leadsearch")]
#[command(about = "Local-first lead discovery pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Execute a search run from a JSON payload.
    Run {
        /// Path to the payload file; reads stdin when omitted.
        #[arg(long)]
        payload: Option<PathBuf>,
        /// Force LLM extraction on regardless of the payload.
        #[arg(long)]
        use_llm: bool,
        /// Print the planned steps as JSON and exit without fetching.
        #[arg(long)]
        dry_run: bool,
    },
    /// Create the SQLite schema and exit.
    InitDb {
        /// Database path; defaults to ./data/lead_search.db.
        #[arg(long)]
        db: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = leadsearch_core::load_app_config()?;
    init_tracing(&config.log_level);

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            payload,
            use_llm,
            dry_run,
        } => commands::run(&config, payload.as_deref(), use_llm, dry_run).await,
        Commands::InitDb { db } => commands::init_db(db).await,
    }
}

fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
