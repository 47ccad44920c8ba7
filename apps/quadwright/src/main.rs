//! # Quadwright - RDF quad store updates
//!
//! The main binary for the Quadwright update engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │          apps/quadwright (THE BINARY)        │
//! │                                              │
//! │   ┌─────────────┐      ┌─────────────────┐   │
//! │   │    CLI      │      │  Config (TOML)  │   │
//! │   │   (clap)    │      │                 │   │
//! │   └──────┬──────┘      └────────┬────────┘   │
//! │          └───────────┬──────────┘            │
//! │                      ▼                       │
//! │             ┌─────────────────┐              │
//! │             │ quadwright-core │              │
//! │             │ (UPDATE ENGINE) │              │
//! │             └─────────────────┘              │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! quadwright init
//! quadwright update -f ops.json
//! quadwright load file:///data/people.nt --into http://example.org/people
//! quadwright dump -o store.nq
//! ```

use clap::Parser;
use quadwright::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    // QUADWRIGHT_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("QUADWRIGHT_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let default_filter = if cli.verbose {
        "quadwright=debug,quadwright_core=debug"
    } else {
        "quadwright=info,quadwright_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    // Logs go to stderr so `dump` and --json-mode output stay clean.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    eprintln!(
        r#"
  quadwright v{}
  ordered updates for RDF quad stores
"#,
        env!("CARGO_PKG_VERSION")
    );
}
