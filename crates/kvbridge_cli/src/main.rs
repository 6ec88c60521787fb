//! kvbridge CLI
//!
//! Command-line tools for kvbridge databases.
//!
//! # Commands
//!
//! - `get` / `put` / `delete` - Single-key reads and writes
//! - `scan` - Ordered scan, forward or reverse
//! - `property` - Read a diagnostic property
//! - `inspect` - Display database statistics and options
//! - `destroy` - Remove a database
//! - `repair` - Run the engine's repair pass

mod commands;

use clap::{Parser, Subcommand};
use commands::{CliError, Codec, Format};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// kvbridge command-line database tools.
#[derive(Parser)]
#[command(name = "kvbridge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the database directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Keys and values on the command line are base64
    #[arg(global = true, long)]
    base64: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read one key
    Get {
        /// Key to read
        key: String,
    },

    /// Write one key
    Put {
        /// Key to write
        key: String,
        /// Value to store (may be empty)
        value: String,
        /// Wait for the write to be durable
        #[arg(short, long)]
        sync: bool,
    },

    /// Delete one key
    Delete {
        /// Key to delete
        key: String,
        /// Wait for the delete to be durable
        #[arg(short, long)]
        sync: bool,
    },

    /// Scan entries in key order
    Scan {
        /// Start at the first key at or after this one
        #[arg(short, long)]
        start: Option<String>,

        /// Maximum number of entries
        #[arg(short, long)]
        limit: Option<usize>,

        /// Scan from the last key backwards
        #[arg(short, long)]
        reverse: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: Format,
    },

    /// Read a diagnostic property
    Property {
        /// Property name, e.g. kvbridge.stats
        name: String,
    },

    /// Display database statistics and options
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: Format,
    },

    /// Remove a database
    Destroy {
        /// Confirm removal
        #[arg(long)]
        yes: bool,
    },

    /// Run the engine's repair pass
    Repair,

    /// Show version information
    Version,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let codec = Codec::new(cli.base64);
    let path = |command: &'static str| cli.path.clone().ok_or(CliError::PathRequired(command));

    match cli.command {
        Commands::Get { ref key } => {
            commands::kv::get(&path("get")?, &codec, key)?;
        }
        Commands::Put {
            ref key,
            ref value,
            sync,
        } => {
            commands::kv::put(&path("put")?, &codec, key, value, sync)?;
        }
        Commands::Delete { ref key, sync } => {
            commands::kv::delete(&path("delete")?, &codec, key, sync)?;
        }
        Commands::Scan {
            ref start,
            limit,
            reverse,
            format,
        } => {
            let options = commands::scan::ScanOptions {
                start: start.as_deref().map(|s| codec.decode(s)).transpose()?,
                limit,
                reverse,
            };
            commands::scan::run(&path("scan")?, &codec, &options, format)?;
        }
        Commands::Property { ref name } => {
            commands::inspect::property(&path("property")?, name)?;
        }
        Commands::Inspect { format } => {
            commands::inspect::run(&path("inspect")?, format)?;
        }
        Commands::Destroy { yes } => {
            commands::maintenance::destroy(&path("destroy")?, yes)?;
        }
        Commands::Repair => {
            commands::maintenance::repair(&path("repair")?)?;
        }
        Commands::Version => {
            println!("kvbridge CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
