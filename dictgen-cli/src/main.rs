//! # dictgen CLI
//!
//! Command-line interface for the dictgen dictionary generator.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dictgen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "dictgen.yml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the paginated dictionary
    Build,

    /// Print the markup of a single entry
    Entry {
        /// Record id of the entry
        id: String,
    },

    /// Check the view against the record schema
    Verify {
        /// Exit with an error when any node fails to resolve
        #[arg(long)]
        strict: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; logs go to stderr so `entry` output stays clean
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Build => commands::build_dictionary(&cli.config),
        Commands::Entry { id } => commands::show_entry(&cli.config, &id),
        Commands::Verify { strict } => commands::verify_view(&cli.config, strict),
    }
}
