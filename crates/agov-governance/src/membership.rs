//! # Membership Proof Service
//!
//! Produces membership proofs and runs the verification pipeline that every
//! anonymous action passes through.
//!
//! ## Verification Order
//!
//! 1. Nullifier not consumed, per the oracle when configured and then the
//!    local ledger.
//! 2. Root freshness: `proof.merkle_root` equals the group's current root.
//! 3. Signal binding: `proof.signal` equals the submitted message.
//! 4. Scope binding: `proof.external_nullifier` equals the recomputed
//!    external nullifier of the submitted scope.
//! 5. Proof shape, then the backend's cryptographic check.
//! 6. Atomic check-and-mark of the nullifier in the local ledger.
//!
//! Steps 1–5 have no side effects, so a rejection there leaves the
//! nullifier unconsumed. Step 1 is a read: a replay is reported as a replay
//! even when the root has moved or the backend is down. Step 6 is the
//! authority; of two concurrent submissions that both pass step 1, only
//! one gets through it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use agov_core::{Commitment, GovernanceError, GroupId, MerkleRoot, NullifierHash};
use agov_crypto::Identity;
use agov_state::{CommitmentGroupStore, NullifierLedger};
use agov_zkp::{BackendError, Proof, ProofValidator, ProofWitness, ProvingBackend, Signal};

use crate::oracle::StateOracle;

/// Why a well-formed proof was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofRejection {
    UnknownGroup,
    NullifierConsumed,
    StaleRoot,
    SignalMismatch,
    ExternalNullifierMismatch,
    BackendRejected,
}

impl ProofRejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownGroup => "unknown group",
            Self::NullifierConsumed => "nullifier already consumed",
            Self::StaleRoot => "merkle root is not the group's current root",
            Self::SignalMismatch => "proof signal does not match submitted message",
            Self::ExternalNullifierMismatch => "external nullifier does not match scope",
            Self::BackendRejected => "backend rejected proof",
        }
    }
}

impl std::fmt::Display for ProofRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the verification pipeline for a well-formed proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofCheck {
    /// Accepted. The nullifier is now consumed.
    Accepted,
    Rejected(ProofRejection),
}

/// Proof generation and verification over the shared stores.
#[derive(Clone)]
pub struct MembershipProofService {
    groups: CommitmentGroupStore,
    nullifiers: NullifierLedger,
    backend: Option<Arc<dyn ProvingBackend>>,
    oracle: Option<Arc<dyn StateOracle>>,
    backend_timeout: Duration,
}

impl std::fmt::Debug for MembershipProofService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MembershipProofService")
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("oracle", &self.oracle.is_some())
            .field("backend_timeout", &self.backend_timeout)
            .finish()
    }
}

impl MembershipProofService {
    pub fn new(
        groups: CommitmentGroupStore,
        nullifiers: NullifierLedger,
        backend: Option<Arc<dyn ProvingBackend>>,
        backend_timeout: Duration,
    ) -> Self {
        Self {
            groups,
            nullifiers,
            backend,
            oracle: None,
            backend_timeout,
        }
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn StateOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Current root of the group, preferring the oracle's view.
    pub async fn current_root(&self, group_id: &GroupId) -> Result<MerkleRoot, GovernanceError> {
        if let Some(oracle) = &self.oracle {
            match oracle.merkle_root(group_id).await {
                Ok(Some(root)) => return Ok(root),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(group_id = %group_id, error = %e, "oracle root read failed, using local root");
                }
            }
        }
        self.groups.merkle_root(group_id)
    }

    /// Whether `commitment` is in the group. Plaintext set check, no proof.
    pub async fn verify_membership(&self, commitment: &Commitment, group_id: &GroupId) -> bool {
        if let Some(oracle) = &self.oracle {
            match oracle.is_member(group_id, commitment).await {
                Ok(Some(member)) => return member,
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(group_id = %group_id, error = %e, "oracle membership read failed, using local set");
                }
            }
        }
        self.groups.contains(group_id, commitment)
    }

    /// Produce a proof that `identity` is a member of the group and endorses
    /// `signal`. Consumes nothing.
    pub async fn generate_proof(
        &self,
        identity: &Identity,
        signal: &Signal,
        group_id: &GroupId,
    ) -> Result<Proof, GovernanceError> {
        if !self.groups.exists(group_id) {
            return Err(GovernanceError::GroupNotFound {
                group_id: group_id.to_string(),
            });
        }
        if !self.verify_membership(identity.commitment(), group_id).await {
            return Err(GovernanceError::NotGroupMember {
                group_id: group_id.to_string(),
            });
        }
        let backend = self.backend()?;
        let merkle_root = self.current_root(group_id).await?;
        let external_nullifier = ProofValidator::compute_external_nullifier(&signal.scope);
        let nullifier_hash = ProofValidator::compute_nullifier_hash(identity, &external_nullifier);
        let witness = ProofWitness {
            identity,
            signal,
            merkle_root: merkle_root.clone(),
            external_nullifier: external_nullifier.clone(),
            nullifier_hash: nullifier_hash.clone(),
        };
        let elements = self
            .call_backend("prove", backend.prove(&witness))
            .await?;
        tracing::debug!(group_id = %group_id, backend = backend.name(), "membership proof generated");
        Ok(Proof {
            merkle_root,
            nullifier_hash,
            signal: signal.message.clone(),
            external_nullifier,
            proof_bytes: elements.to_vec(),
        })
    }

    /// Run the full pipeline and, on success, consume the nullifier.
    ///
    /// `Err` only for a malformed proof or an unreachable backend; every
    /// semantic mismatch is an `Ok(ProofCheck::Rejected(_))`.
    pub async fn check_and_consume(
        &self,
        proof: &Proof,
        signal: &Signal,
        group_id: &GroupId,
    ) -> Result<ProofCheck, GovernanceError> {
        if let Some(rejection) = self.check_unconsumed(proof, signal, group_id).await? {
            return Ok(ProofCheck::Rejected(rejection));
        }
        if !self.consume(&proof.nullifier_hash) {
            return Ok(ProofCheck::Rejected(ProofRejection::NullifierConsumed));
        }
        Ok(ProofCheck::Accepted)
    }

    /// Steps 1–5 of the pipeline. Mutates nothing; `None` means the proof
    /// is acceptable as of now and only [`consume`](Self::consume) remains.
    pub async fn check_unconsumed(
        &self,
        proof: &Proof,
        signal: &Signal,
        group_id: &GroupId,
    ) -> Result<Option<ProofRejection>, GovernanceError> {
        let mut rejection = self.check_bindings(proof, signal, group_id).await?;
        if rejection.is_none() && !self.verify_backend(proof).await? {
            rejection = Some(ProofRejection::BackendRejected);
        }
        if let Some(reason) = rejection {
            tracing::debug!(group_id = %group_id, reason = %reason, "proof rejected");
        }
        Ok(rejection)
    }

    /// Mark the nullifier consumed. `false` if it already was.
    pub fn consume(&self, nullifier: &NullifierHash) -> bool {
        self.nullifiers.record_if_unused(nullifier)
    }

    /// `true` iff the proof passes every check. A `true` result consumes
    /// the nullifier, so a second call with the same proof returns `false`.
    pub async fn verify_proof(
        &self,
        proof: &Proof,
        signal: &Signal,
        group_id: &GroupId,
    ) -> Result<bool, GovernanceError> {
        Ok(self.check_and_consume(proof, signal, group_id).await? == ProofCheck::Accepted)
    }

    /// Shape check plus the backend's cryptographic check, nothing else.
    pub async fn verify_backend(&self, proof: &Proof) -> Result<bool, GovernanceError> {
        ProofValidator::validate_structure(proof)?;
        let backend = self.backend()?;
        let inputs = proof.public_inputs();
        self.call_backend("verify", backend.verify_bytes(&proof.proof_bytes, &inputs))
            .await
    }

    async fn check_bindings(
        &self,
        proof: &Proof,
        signal: &Signal,
        group_id: &GroupId,
    ) -> Result<Option<ProofRejection>, GovernanceError> {
        if self.oracle_reports_consumed(&proof.nullifier_hash).await
            || self.nullifiers.is_consumed(&proof.nullifier_hash)
        {
            return Ok(Some(ProofRejection::NullifierConsumed));
        }
        let current = match self.current_root(group_id).await {
            Ok(root) => root,
            Err(GovernanceError::GroupNotFound { .. }) => {
                return Ok(Some(ProofRejection::UnknownGroup))
            }
            Err(e) => return Err(e),
        };
        if !proof.merkle_root.ct_matches(&current) {
            return Ok(Some(ProofRejection::StaleRoot));
        }
        if proof.signal != signal.message {
            return Ok(Some(ProofRejection::SignalMismatch));
        }
        let expected = ProofValidator::compute_external_nullifier(&signal.scope);
        if !proof.external_nullifier.ct_matches(&expected) {
            return Ok(Some(ProofRejection::ExternalNullifierMismatch));
        }
        Ok(None)
    }

    async fn oracle_reports_consumed(&self, nullifier: &NullifierHash) -> bool {
        let Some(oracle) = &self.oracle else {
            return false;
        };
        match oracle.is_nullifier_consumed(nullifier).await {
            Ok(Some(consumed)) => consumed,
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(error = %e, "oracle nullifier read failed, using local ledger");
                false
            }
        }
    }

    fn backend(&self) -> Result<&Arc<dyn ProvingBackend>, GovernanceError> {
        self.backend.as_ref().ok_or_else(|| {
            GovernanceError::ProofBackendUnavailable("no proving backend configured".to_string())
        })
    }

    async fn call_backend<T>(
        &self,
        op: &'static str,
        call: impl Future<Output = Result<T, BackendError>>,
    ) -> Result<T, GovernanceError> {
        match tokio::time::timeout(self.backend_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::warn!(op, error = %e, "proving backend call failed");
                Err(GovernanceError::ProofBackendUnavailable(e.to_string()))
            }
            Err(_) => {
                tracing::warn!(op, timeout_ms = self.backend_timeout.as_millis() as u64, "proving backend call timed out");
                Err(GovernanceError::ProofBackendUnavailable(format!(
                    "{op} timed out after {:?}",
                    self.backend_timeout
                )))
            }
        }
    }
}
