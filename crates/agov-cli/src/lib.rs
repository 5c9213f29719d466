//! # agov-cli — Command-Line Interface
//!
//! Subcommand handlers for the `agov` binary. Each `run_*` function returns
//! the process exit code on success.
//!
//! - `identity`, `root`, `nullifier` (`identity.rs`): offline derivations.
//! - `simulate` (`simulate.rs`): run a YAML-described vote end to end with
//!   the mock backend and a manual clock.

pub mod identity;
pub mod simulate;
