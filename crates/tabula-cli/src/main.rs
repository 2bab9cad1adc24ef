//! # tabula-cli
//!
//! Command-line interface for Tabula.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tabula_core::error::format_error_with_suggestion;
use tabula_core::Config;
use tabula_store::FileSessionStore;

mod commands;
mod picker;

/// Application context containing shared state.
pub struct AppContext {
    pub config: Config,
    pub store: FileSessionStore,
}

/// Tabula - editor session manager
#[derive(Parser)]
#[command(name = "tabula")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Session directory (overrides storage.directory)
    #[arg(long, value_name = "DIR", env = "TABULA_STORE")]
    store: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Session management
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show version information
    Version,
}

#[derive(Subcommand)]
pub enum SessionAction {
    /// List saved sessions, newest first
    List {
        /// Maximum sessions to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Show the groups and documents of a session
    Show {
        /// Session name
        name: String,
    },
    /// Export a session's snapshot as JSON
    Export {
        /// Session name
        name: String,
        /// Write to a file instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Delete a session
    Delete {
        /// Session name
        name: String,
    },
    /// Rename a session
    Rename {
        /// Current name
        from: String,
        /// New name
        to: String,
    },
    /// Dry-run a restore and report documents that would fail to load
    Check {
        /// Session name (defaults to the last loaded session)
        name: Option<String>,
    },
    /// Print the name of the last loaded session
    Last,
    /// Choose a session interactively and show it
    Pick,
    /// Rebuild the metadata index from the snapshot files
    Reindex,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Show where configuration and sessions live
    Path,
    /// Validate the current configuration
    Validate,
}

fn run(cli: Cli) -> anyhow::Result<()> {
    // Load configuration
    let mut config = Config::load_validated().unwrap_or_else(|e| {
        tracing::warn!("{}; using defaults", e);
        Config::default()
    });
    if let Some(dir) = cli.store {
        config.storage.directory = Some(dir);
    }

    let store = FileSessionStore::from_config(&config);
    let ctx = AppContext { config, store };

    match cli.command {
        Commands::Session { action } => commands::session::handle(action, &ctx)?,
        Commands::Config { action } => commands::config::handle(action, &ctx)?,
        Commands::Version => {
            println!("tabula {}", env!("CARGO_PKG_VERSION"));
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(e) = run(cli) {
        match e.downcast_ref::<tabula_core::Error>() {
            Some(err) => eprintln!("Error: {}", format_error_with_suggestion(err)),
            None => eprintln!("Error: {:#}", e),
        }
        std::process::exit(1);
    }
}
