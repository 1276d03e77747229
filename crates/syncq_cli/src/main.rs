//! SyncQ CLI
//!
//! Command-line tools for inspecting and editing a persisted sync queue
//! without starting the engine.
//!
//! # Commands
//!
//! - `stats` - Summarize pending mutations
//! - `list` - List pending mutations in processing order
//! - `enqueue` - Add a mutation to the queue
//! - `remove` - Drop one pending mutation
//! - `clear` - Drop every pending mutation

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use syncq_engine::{MutationKind, Priority, DEFAULT_STORAGE_KEY};
use tracing_subscriber::EnvFilter;

/// SyncQ command-line queue tools.
#[derive(Parser)]
#[command(name = "syncq")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the queue storage directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Storage key the queue snapshot lives under
    #[arg(global = true, short, long, default_value = DEFAULT_STORAGE_KEY)]
    key: String,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize pending mutations
    Stats {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List pending mutations in processing order
    List {
        /// Maximum number of items to list
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Add a mutation to the queue
    Enqueue {
        /// Mutation kind (favorite, unfavorite, review, rating, stat-update)
        #[arg(long)]
        kind: MutationKind,

        /// JSON payload
        #[arg(long)]
        payload: String,

        /// Priority (high, medium, low)
        #[arg(long, default_value = "medium")]
        priority: Priority,

        /// Explicit item id; generated when omitted
        #[arg(long)]
        id: Option<String>,
    },

    /// Drop one pending mutation
    Remove {
        /// Id of the item to drop
        id: String,
    },

    /// Drop every pending mutation
    Clear,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let key = cli.key.as_str();
    match cli.command {
        Commands::Stats { format } => {
            let path = cli.path.ok_or("Queue path required for stats")?;
            commands::stats::run(&path, key, &format)?;
        }
        Commands::List { limit, format } => {
            let path = cli.path.ok_or("Queue path required for list")?;
            commands::list::run(&path, key, limit, &format)?;
        }
        Commands::Enqueue {
            kind,
            payload,
            priority,
            id,
        } => {
            let path = cli.path.ok_or("Queue path required for enqueue")?;
            commands::enqueue::run(&path, key, kind, &payload, priority, id)?;
        }
        Commands::Remove { id } => {
            let path = cli.path.ok_or("Queue path required for remove")?;
            commands::remove::run(&path, key, &id)?;
        }
        Commands::Clear => {
            let path = cli.path.ok_or("Queue path required for clear")?;
            commands::clear::run(&path, key)?;
        }
        Commands::Version => {
            println!("SyncQ CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
