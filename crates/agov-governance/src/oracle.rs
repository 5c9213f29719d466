//! # State Oracle
//!
//! Optional external source for group roots, membership and consumed
//! nullifiers. Each read returns `Ok(None)` when the oracle has no opinion.
//! Callers fall back to the local stores on `None` or on error.
//!
//! The oracle can only make a check stricter: a consumed nullifier it
//! reports is rejected even if the local ledger has not seen it. The local
//! atomic check-and-mark still runs for every accepted action.

use agov_core::{Commitment, GroupId, MerkleRoot, NullifierHash};
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("state oracle unavailable: {0}")]
    Unavailable(String),
    #[error("state oracle returned malformed data: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait StateOracle: Send + Sync {
    async fn merkle_root(&self, group_id: &GroupId) -> Result<Option<MerkleRoot>, OracleError>;

    async fn is_member(
        &self,
        group_id: &GroupId,
        commitment: &Commitment,
    ) -> Result<Option<bool>, OracleError>;

    async fn is_nullifier_consumed(
        &self,
        nullifier: &NullifierHash,
    ) -> Result<Option<bool>, OracleError>;
}
