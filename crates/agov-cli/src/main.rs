//! # agov CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use agov_cli::identity::{run_identity, run_nullifier, run_root, NullifierArgs, RootArgs};
use agov_cli::simulate::{run_simulate, SimulateArgs};

/// Anonymous group governance toolkit.
///
/// Generates identities, computes group roots and nullifiers, and simulates
/// anonymous votes end to end.
#[derive(Parser, Debug)]
#[command(name = "agov", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a fresh identity (secret and public commitment).
    Identity,

    /// Compute the Merkle root of a set of commitments.
    Root(RootArgs),

    /// Derive the external nullifier and nullifier hash for a scope.
    Nullifier(NullifierArgs),

    /// Run a YAML vote scenario with the mock proving backend.
    Simulate(SimulateArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG overrides the verbosity flag.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.json {
        builder.json().init();
    } else {
        builder.init();
    }

    let result = match cli.command {
        Commands::Identity => run_identity(),
        Commands::Root(args) => run_root(&args),
        Commands::Nullifier(args) => run_nullifier(&args),
        Commands::Simulate(args) => run_simulate(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
