//! # Identity Subcommands
//!
//! Offline derivations over the hashing primitives. Nothing here touches
//! a store.

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;

use agov_core::Commitment;
use agov_crypto::{external_nullifier, merkle_root, nullifier_hash, Identity};

/// Arguments for `agov root`.
#[derive(Args, Debug)]
pub struct RootArgs {
    /// Member commitments, in any order.
    pub commitments: Vec<String>,
}

/// Arguments for `agov nullifier`.
#[derive(Args, Debug)]
pub struct NullifierArgs {
    /// Identity secret, 64 hex characters.
    #[arg(long)]
    pub secret: String,
    /// Action scope.
    #[arg(long)]
    pub scope: String,
}

/// Print a fresh identity. The secret is printed once and never logged.
pub fn run_identity() -> Result<u8> {
    let identity = Identity::generate();
    let out = json!({
        "secret": identity.secret_hex(),
        "commitment": identity.commitment(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(0)
}

pub fn run_root(args: &RootArgs) -> Result<u8> {
    let commitments: Vec<Commitment> = args.commitments.iter().map(Commitment::new).collect();
    let root = merkle_root(&commitments);
    tracing::debug!(members = commitments.len(), "computed root");
    println!("{root}");
    Ok(0)
}

pub fn run_nullifier(args: &NullifierArgs) -> Result<u8> {
    let identity = Identity::from_secret_hex(&args.secret).context("invalid --secret")?;
    let external = external_nullifier(&args.scope);
    let out = json!({
        "scope": &args.scope,
        "externalNullifier": &external,
        "nullifierHash": nullifier_hash(&identity, &external),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nullifier_rejects_bad_secret() {
        let args = NullifierArgs {
            secret: "not-hex".into(),
            scope: "s".into(),
        };
        assert!(run_nullifier(&args).is_err());
    }

    #[test]
    fn nullifier_accepts_valid_secret() {
        let args = NullifierArgs {
            secret: "11".repeat(32),
            scope: "s".into(),
        };
        assert_eq!(run_nullifier(&args).unwrap(), 0);
    }

    #[test]
    fn root_of_nothing_succeeds() {
        assert_eq!(run_root(&RootArgs { commitments: vec![] }).unwrap(), 0);
    }
}
