use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::AppState;

#[derive(Debug, Parser)]
#[command(name = "bankline", version, about = "Import, deduplicate and categorize bank transactions")]
struct Cli {
    /// Config file; defaults to the platform config directory.
    #[arg(long, global = true, env = "BANKLINE_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Import a statement file (csv, tsv, xlsx, xls, xlsm, pdf)
    Import {
        file: PathBuf,
        #[arg(long)]
        account: i64,
    },
    /// Store one bank SMS alert as a transaction
    Sms {
        text: String,
        #[arg(long)]
        account: i64,
    },
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },
    Heads {
        #[command(subcommand)]
        command: HeadCommands,
    },
    Rules {
        #[command(subcommand)]
        command: RuleCommands,
    },
}

#[derive(Debug, Subcommand)]
enum AccountCommands {
    Add {
        #[arg(long)]
        company: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        number: Option<String>,
        #[arg(long)]
        bank: Option<String>,
    },
    List {
        #[arg(long)]
        company: i64,
    },
    /// Most recent transactions first
    Transactions {
        #[arg(long)]
        account: i64,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
}

#[derive(Debug, Subcommand)]
enum HeadCommands {
    Add {
        #[arg(long)]
        company: i64,
        name: String,
        /// Sub-head to create under the head; repeatable
        #[arg(long = "sub")]
        sub_heads: Vec<String>,
    },
    List {
        #[arg(long)]
        company: i64,
    },
}

#[derive(Debug, Subcommand)]
enum RuleCommands {
    /// Save the `[[rules]]` of a TOML file
    Load {
        #[arg(long)]
        company: i64,
        file: PathBuf,
    },
    List {
        #[arg(long)]
        company: i64,
    },
    Stats {
        #[arg(long)]
        company: i64,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let db_path = config.resolved_database_path()?;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let db = bankline_storage::create_db(&db_path)
        .await
        .with_context(|| format!("open database {}", db_path.display()))?;
    tracing::debug!(path = %db_path.display(), "database opened");

    let state = AppState { db, config };

    match cli.command {
        Commands::Import { file, account } => commands::import(&state, &file, account).await,
        Commands::Sms { text, account } => commands::sms(&state, &text, account).await,
        Commands::Account { command } => match command {
            AccountCommands::Add { company, name, number, bank } => {
                commands::add_account(&state, company, &name, number, bank).await
            }
            AccountCommands::List { company } => commands::list_accounts(&state, company).await,
            AccountCommands::Transactions { account, limit } => {
                commands::account_transactions(&state, account, limit).await
            }
        },
        Commands::Heads { command } => match command {
            HeadCommands::Add { company, name, sub_heads } => {
                commands::add_head(&state, company, &name, &sub_heads).await
            }
            HeadCommands::List { company } => commands::list_heads(&state, company).await,
        },
        Commands::Rules { command } => match command {
            RuleCommands::Load { company, file } => commands::load_rules(&state, company, &file).await,
            RuleCommands::List { company } => commands::list_rules(&state, company).await,
            RuleCommands::Stats { company } => commands::rule_stats(&state, company).await,
        },
    }
}
