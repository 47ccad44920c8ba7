//! # Quadwright CLI Module
//!
//! This module implements the CLI interface for Quadwright.
//!
//! ## Available Commands
//!
//! - `init` - Initialize a new store
//! - `status` - Show store status
//! - `update` - Run an update sequence read from a JSON file
//! - `load` - LOAD a document into the store
//! - `dump` - Write the store as N-Quads

mod commands;

use clap::{Parser, Subcommand};
use quadwright_core::{SessionConfig, UpdateError};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Quadwright - RDF quad store updates
///
/// Runs ordered update sequences (graph management, literal data, pattern
/// updates and document loads) against a redb or N-Quads file store.
#[derive(Parser, Debug)]
#[command(name = "quadwright")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the store
    #[arg(short = 'D', long, global = true, default_value = "quadwright.redb")]
    pub database: PathBuf,

    /// Storage backend: "file" (N-Quads file) or "redb" (ACID database)
    #[arg(short = 'B', long, global = true, default_value = "redb")]
    pub backend: String,

    /// Session configuration file (TOML); defaults to ./quadwright.toml if present
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show store status
    Status,

    /// Run an update sequence
    Update {
        /// Path to a JSON array of update operations
        #[arg(short, long)]
        file: PathBuf,
    },

    /// LOAD a document (file:// or http(s)://)
    Load {
        /// Document URL
        url: String,

        /// Graph to load into (quads stores only)
        #[arg(short, long)]
        into: Option<String>,

        /// Treat load failures as no-ops
        #[arg(short, long)]
        silent: bool,
    },

    /// Write every statement as N-Quads
    Dump {
        /// Output file path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Initialize a new empty store
    Init {
        /// Force initialization even if the store exists
        #[arg(short, long)]
        force: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), UpdateError> {
    let config = crate::config::resolve_config(cli.config.as_deref())?;
    execute_with(cli, config)
}

/// Execute the CLI with an already resolved configuration.
pub fn execute_with(cli: Cli, config: SessionConfig) -> Result<(), UpdateError> {
    let backend = cli.backend.as_str();
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Status) => cmd_status(&cli.database, backend, config, json_mode),
        Some(Commands::Update { file }) => {
            cmd_update(&cli.database, backend, config, json_mode, &file)
        }
        Some(Commands::Load { url, into, silent }) => cmd_load(
            &cli.database,
            backend,
            config,
            json_mode,
            &url,
            into.as_deref(),
            silent,
        ),
        Some(Commands::Dump { output }) => {
            cmd_dump(&cli.database, backend, config, output.as_deref())
        }
        Some(Commands::Init { force }) => cmd_init(&cli.database, backend, config, force),
        None => {
            // No subcommand - show status by default
            cmd_status(&cli.database, backend, config, json_mode)
        }
    }
}
