//! robotape demo CLI
//!
//! Records a scripted agent session onto tapes and inspects what a store
//! holds.
//!
//! Usage:
//!   cargo run -p demo -- --db tapes.db run
//!   cargo run -p demo -- --db tapes.db show <tape-id>
//!   cargo run -p demo -- --db tapes.db history <tape-id>
//!   cargo run -p demo -- --db tapes.db search --author demo --tag research

mod session;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use robotape_config::RobotapeConfig;
use robotape_contracts::{
    error::{RobotapeError, RobotapeResult},
    filter::TapeFilter,
    tape::{Tape, TapeId},
};
use robotape_core::traits::TapeStore;
use robotape_store::{MemoryTapeStore, SqliteTapeStore};

// ── CLI definition ────────────────────────────────────────────────────────────

/// robotape: execution tapes for AI agents.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "robotape demo: record and inspect agent execution tapes",
    long_about = "Records a scripted agent session (retries, validation, branching)\n\
                  and queries stored tapes by id, lineage, or search filters."
)]
struct Cli {
    /// SQLite database file. Overrides `store.path` from the config file;
    /// without either, tapes live in memory for this process only.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record the scripted session and save its tapes.
    Run,
    /// Print a stored tape as JSON.
    Show { id: String },
    /// Print the lineage of a tape, child first.
    History { id: String },
    /// List tapes matching every given filter.
    Search {
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        agent: Option<String>,
        #[arg(long)]
        node: Option<String>,
        /// Repeat to require several tags.
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Set RUST_LOG=debug for per-attempt tool logs.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Demo error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> RobotapeResult<()> {
    let config = match &cli.config {
        Some(path) => RobotapeConfig::from_file(path)?,
        None => RobotapeConfig::default(),
    };
    let store = open_store(cli.db.or(config.store.path.clone()))?;

    match cli.command {
        Command::Run => {
            println!("Recording scripted session");
            let summary = session::run_session(store.as_ref(), &config.tools).await?;
            println!();
            println!("root tape:   {}", summary.root);
            println!("branch tape: {}", summary.branch);
        }
        Command::Show { id } => {
            let tape = store.load_tape(&id.parse::<TapeId>()?).await?;
            println!("{}", render_tape(&tape)?);
        }
        Command::History { id } => {
            let history = store.get_tape_history(&id.parse::<TapeId>()?).await?;
            for (depth, tape_id) in history.iter().enumerate() {
                println!("{:indent$}{tape_id}", "", indent = depth * 2);
            }
        }
        Command::Search {
            author,
            agent,
            node,
            tags,
        } => {
            let filter = TapeFilter {
                author,
                agent,
                node,
                tags: tags.into_iter().collect(),
            };
            for tape in store.search_tapes(&filter).await? {
                let tags: Vec<&str> = tape.metadata.tags.iter().map(String::as_str).collect();
                println!(
                    "{}  author={:<10} steps={:<3} tags=[{}]",
                    tape.id(),
                    tape.metadata.author,
                    tape.len(),
                    tags.join(", ")
                );
            }
        }
    }
    Ok(())
}

fn render_tape(tape: &Tape) -> RobotapeResult<String> {
    serde_json::to_string_pretty(tape)
        .map_err(|e| RobotapeError::storage(format!("failed to render tape '{}': {e}", tape.id())))
}

fn open_store(path: Option<PathBuf>) -> RobotapeResult<Arc<dyn TapeStore>> {
    let store: Arc<dyn TapeStore> = match path {
        Some(path) => Arc::new(SqliteTapeStore::open(&path)?),
        None => {
            tracing::warn!("no database configured, tapes will not outlive this process");
            Arc::new(MemoryTapeStore::new())
        }
    };
    Ok(store)
}
