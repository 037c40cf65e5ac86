//! # doc-churn CLI (`churn`)
//!
//! The `churn` binary registers documents, runs update cycles and prints
//! their churn history.
//!
//! ## Usage
//!
//! ```bash
//! churn --config ./config/churn.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `churn init` | Create the SQLite database and run schema migrations |
//! | `churn add <url>` | Register a URL and take its first reading |
//! | `churn update <id>` | Run one update cycle for a document |
//! | `churn update --all` | Run one update cycle for every document |
//! | `churn list` | List tracked documents and their latest record |
//! | `churn history <id>` | Print a document's change records |
//! | `churn diff <new> [<old>]` | Compare two local files without a database |
//!
//! Log output goes to stderr and is controlled with `RUST_LOG`.

use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use doc_churn::config::{self, Config};
use doc_churn::diff::DiffOptions;
use doc_churn::tracker::UpdateTarget;
use doc_churn::{compare, history, migrate, registry, tracker};

const DEFAULT_LOG_FILTER: &str = "churn=info,doc_churn=info";

/// doc-churn: track word-level churn of remote documents over time.
///
/// All commands except `diff` read a TOML configuration file given by
/// `--config`. See `config/churn.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "churn",
    about = "Track word-level churn of remote documents over time",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/churn.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent; running it on an existing database is safe.
    Init,

    /// Start tracking a URL and record its first observation.
    ///
    /// Supported schemes: `http`, `https`, `file`. Adding a URL that is
    /// already tracked runs an ordinary update cycle for it.
    Add {
        /// URL of the document.
        url: String,
    },

    /// Fetch documents and append a change record for each.
    Update {
        /// Document id (SHA-512 hex of its URL).
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        id: Option<String>,

        /// Update every tracked document.
        #[arg(long)]
        all: bool,
    },

    /// List tracked documents.
    List {
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Print the change records of a document, oldest first.
    History {
        /// Document id.
        id: String,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Compare two local files (plain text or PDF) and print the counts.
    ///
    /// Without `<old>` this reports the word count of `<new>` only.
    Diff {
        /// The newer version.
        new: PathBuf,
        /// The older version.
        old: Option<PathBuf>,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    // `diff` works without a database; the config only tunes the cutoffs.
    // A config that exists must still load cleanly.
    if let Commands::Diff { new, old } = &cli.command {
        let options = if cli.config.exists() {
            config::load_config(&cli.config)?.diff
        } else {
            DiffOptions::default()
        };
        compare::run_compare(new, old.as_deref(), &options)?;
        return Ok(());
    }

    let cfg: Config = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Add { url } => {
            registry::run_add(&cfg, &url).await?;
        }
        Commands::Update { id, all } => {
            let target = match (&id, all) {
                (_, true) => UpdateTarget::All,
                (Some(id), false) => UpdateTarget::One(id),
                (None, false) => anyhow::bail!("either <ID> or --all is required"),
            };
            tracker::run_update(&cfg, target).await?;
        }
        Commands::List { json } => {
            history::run_list(&cfg, json).await?;
        }
        Commands::History { id, json } => {
            history::run_history(&cfg, &id, json).await?;
        }
        Commands::Diff { .. } => unreachable!("handled before config loading"),
    }

    Ok(())
}
