//! # polyseal CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use polyseal_cli::compile::{run_compile, CompileArgs};
use polyseal_cli::validate::{run_validate, ValidateArgs};
use polyseal_cli::whitelist::{run_whitelist, WhitelistArgs};
use polyseal_cli::EXIT_ERROR;

/// Polyseal policy toolchain.
///
/// Validates and compiles transaction-authorization policy documents and
/// computes recipient-whitelist Merkle roots and inclusion proofs.
#[derive(Parser, Debug)]
#[command(name = "polyseal", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate policy documents and list every issue.
    Validate(ValidateArgs),

    /// Compile policy documents into ordered rules with a digest.
    Compile(CompileArgs),

    /// Whitelist Merkle roots and inclusion proofs.
    Whitelist(WhitelistArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Validate(args) => run_validate(&args),
        Commands::Compile(args) => run_compile(&args),
        Commands::Whitelist(args) => run_whitelist(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}
