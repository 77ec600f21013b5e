//! Main entry point for the pgxrisk application.

// #![deny(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
// #![warn(missing_docs)]

use clap::{Parser, Subcommand};

pub mod analyze;
pub mod common;
pub mod predict;

/// CLI parser based on clap.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "pgxrisk - pharmacogenomic drug risk assessment",
    long_about = "This tool derives diplotypes and metabolizer phenotypes from annotated \
                  VCF files and assesses drug risk following CPIC-style rules"
)]
struct Cli {
    /// Commonly used arguments
    #[command(flatten)]
    common: common::Args,

    /// The sub command to run
    #[command(subcommand)]
    command: Commands,
}

/// Enum supporting the parsing of top-level commands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Assess the risk of a drug for an annotated VCF file.
    Analyze(analyze::Args),
    /// Query the advisory risk model directly.
    Predict(predict::Args),
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Build a tracing subscriber according to the configuration in `cli.common`.
    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_max_level(match cli.common.verbose.log_level() {
            Some(level) => match level {
                log::Level::Error => tracing::Level::ERROR,
                log::Level::Warn => tracing::Level::WARN,
                log::Level::Info => tracing::Level::INFO,
                log::Level::Debug => tracing::Level::DEBUG,
                log::Level::Trace => tracing::Level::TRACE,
            },
            None => tracing::Level::INFO,
        })
        .compact()
        .finish();
    tracing::subscriber::set_global_default(collector)?;

    tracing::info!("Starting pgxrisk...");

    match &cli.command {
        Commands::Analyze(args) => analyze::run(&cli.common, args).await?,
        Commands::Predict(args) => predict::run(&cli.common, args).await?,
    }

    tracing::info!("All done. Have a nice day!");

    Ok(())
}
