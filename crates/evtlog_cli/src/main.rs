//! evtlog CLI
//!
//! Conversion tools between .evt circular logs and CSV event listings.
//!
//! # Commands
//!
//! - `import` - convert a CSV event listing into an .evt log
//! - `export` - convert an .evt log into a CSV event listing
//! - `inspect` - show the header of an .evt log

mod base64;
mod commands;
mod csv;
mod strings;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Tools for the legacy Windows Event Log (.evt) file format.
#[derive(Parser)]
#[command(name = "evtlog")]
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
    /// Convert a CSV event listing into an .evt log
    Import {
        /// CSV input file; `-` or absent reads standard input
        input: Option<PathBuf>,

        /// Log file to write
        output: PathBuf,

        /// Renumber the records to form a sequence
        #[arg(short, long)]
        renumber: bool,

        /// Append to an existing log rather than create a new one.
        /// Implies --renumber, so that the result is not just garbage.
        #[arg(short, long)]
        append: bool,

        /// Forbid overwriting old records when the log fills up
        #[arg(short = 'w', long)]
        no_overwrite: bool,
    },

    /// Convert an .evt log into a CSV event listing
    Export {
        /// Log file to read
        input: PathBuf,

        /// CSV output file; `-` or absent writes standard output
        output: Option<PathBuf>,

        /// Append to the output file rather than create a new one
        #[arg(short, long)]
        append: bool,
    },

    /// Show the header of an .evt log
    Inspect {
        /// Log file to examine
        input: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // diagnostics go to stderr; export may own stdout
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Import {
            input,
            output,
            renumber,
            append,
            no_overwrite,
        } => {
            commands::import::run(input.as_deref(), &output, renumber, append, no_overwrite)?;
        }
        Commands::Export {
            input,
            output,
            append,
        } => {
            commands::export::run(&input, output.as_deref(), append)?;
        }
        Commands::Inspect { input, format } => {
            commands::inspect::run(&input, &format)?;
        }
    }

    Ok(())
}
