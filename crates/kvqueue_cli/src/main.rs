//! KVQueue CLI
//!
//! Command-line tools for exercising the async operation pool.
//!
//! # Commands
//!
//! - `run` - Execute a mixed workload and report pool statistics
//! - `flush-demo` - Show the flush barrier draining queued work
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// KVQueue command-line tools.
#[derive(Parser)]
#[command(name = "kvqueue")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a mixed insert/update/remove/search workload
    Run {
        /// Number of worker threads
        #[arg(short, long, default_value = "4")]
        workers: usize,

        /// Number of operations to submit
        #[arg(short, long, default_value = "10000")]
        ops: usize,

        /// Number of distinct keys per table
        #[arg(short, long, default_value = "1000")]
        keys: usize,

        /// Number of tables
        #[arg(short, long, default_value = "2")]
        tables: usize,

        /// Seed for the workload generator
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Submit batches of inserts and flush after each one
    FlushDemo {
        /// Number of worker threads
        #[arg(short, long, default_value = "4")]
        workers: usize,

        /// Number of batches
        #[arg(short, long, default_value = "3")]
        batches: usize,

        /// Operations per batch
        #[arg(short, long, default_value = "100")]
        ops: usize,
    },

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

    match cli.command {
        Commands::Run {
            workers,
            ops,
            keys,
            tables,
            seed,
            format,
        } => {
            let format: commands::OutputFormat = format.parse()?;
            let workload = commands::run::Workload {
                workers,
                operations: ops,
                keys,
                tables,
                seed,
            };
            commands::run::run(&workload, format)?;
        }
        Commands::FlushDemo {
            workers,
            batches,
            ops,
        } => {
            commands::flush_demo::run(workers, batches, ops)?;
        }
        Commands::Version => {
            println!("KVQueue CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("KVQueue Core v{}", kvqueue_core::VERSION);
        }
    }

    Ok(())
}
