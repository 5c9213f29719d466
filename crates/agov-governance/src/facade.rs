//! # Governance Facade
//!
//! Composes the stores and services into the public surface. Every
//! accepted mutation is forwarded to the ledger sink after the in-memory
//! transition has completed; a ledger failure is logged and never undoes
//! or fails the operation.

use std::sync::Arc;

use agov_core::{
    Clock, Commitment, GovernanceError, GroupId, MerkleRoot, ProposalId, SignalId, SystemClock,
};
use agov_crypto::Identity;
use agov_state::{CommitmentGroupStore, NullifierLedger};
use agov_zkp::{Proof, ProvingBackend, Signal};
use serde_json::json;

use crate::config::GovernanceConfig;
use crate::ledger::{LedgerSink, NoopLedger, OperationKind};
use crate::membership::MembershipProofService;
use crate::oracle::StateOracle;
use crate::proposal::{NewProposal, Proposal, ProposalPhase, ProposalRegistry};
use crate::signal::{PrivateSignal, SignalAggregate, SignalBus, SignalSubmission, SignalType};
use crate::tally::VoteResults;
use crate::voting::{VoteReceipt, VoteTally};

/// Collaborators for a [`GovernanceFacade`]. Everything is optional except
/// that proof generation and verification need a backend.
#[derive(Default)]
pub struct GovernanceFacadeBuilder {
    config: GovernanceConfig,
    backend: Option<Arc<dyn ProvingBackend>>,
    ledger: Option<Arc<dyn LedgerSink>>,
    oracle: Option<Arc<dyn StateOracle>>,
    clock: Option<Arc<dyn Clock>>,
}

impl GovernanceFacadeBuilder {
    pub fn config(mut self, config: GovernanceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn backend(mut self, backend: Arc<dyn ProvingBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn ledger(mut self, ledger: Arc<dyn LedgerSink>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn oracle(mut self, oracle: Arc<dyn StateOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> GovernanceFacade {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let groups = CommitmentGroupStore::new();
        let mut membership = MembershipProofService::new(
            groups.clone(),
            NullifierLedger::new(),
            self.backend,
            self.config.backend_timeout,
        );
        if let Some(oracle) = self.oracle {
            membership = membership.with_oracle(oracle);
        }
        let registry = ProposalRegistry::new(groups.clone(), clock.clone());
        let voting = VoteTally::new(registry, membership.clone(), self.config.clone());
        let signals = SignalBus::new(groups.clone(), membership.clone(), clock);
        GovernanceFacade {
            config: self.config,
            groups,
            membership,
            voting,
            signals,
            ledger: self.ledger.unwrap_or_else(|| Arc::new(NoopLedger)),
        }
    }
}

/// The public governance surface.
#[derive(Clone)]
pub struct GovernanceFacade {
    config: GovernanceConfig,
    groups: CommitmentGroupStore,
    membership: MembershipProofService,
    voting: VoteTally,
    signals: SignalBus,
    ledger: Arc<dyn LedgerSink>,
}

impl std::fmt::Debug for GovernanceFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GovernanceFacade")
            .field("config", &self.config)
            .field("membership", &self.membership)
            .finish()
    }
}

impl GovernanceFacade {
    pub fn builder() -> GovernanceFacadeBuilder {
        GovernanceFacadeBuilder::default()
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    // -- groups ---------------------------------------------------------

    /// Create an empty group. Returns `false` if it already existed.
    pub async fn create_group(&self, group_id: &GroupId) -> bool {
        let created = self.groups.create_group(group_id);
        if created {
            self.submit(OperationKind::GroupCreated, json!({ "groupId": group_id }))
                .await;
        }
        created
    }

    /// Add a commitment. Already-present commitments are a no-op.
    pub async fn add_member(
        &self,
        group_id: &GroupId,
        commitment: Commitment,
    ) -> Result<bool, GovernanceError> {
        let payload = json!({ "groupId": group_id, "commitment": &commitment });
        let added = self.groups.add_member(group_id, commitment)?;
        if added {
            self.submit(OperationKind::MemberAdded, payload).await;
        }
        Ok(added)
    }

    pub async fn remove_member(
        &self,
        group_id: &GroupId,
        commitment: &Commitment,
    ) -> Result<(), GovernanceError> {
        self.groups.remove_member(group_id, commitment)?;
        self.submit(
            OperationKind::MemberRemoved,
            json!({ "groupId": group_id, "commitment": commitment }),
        )
        .await;
        Ok(())
    }

    pub async fn get_merkle_root(&self, group_id: &GroupId) -> Result<MerkleRoot, GovernanceError> {
        self.membership.current_root(group_id).await
    }

    pub fn group_size(&self, group_id: &GroupId) -> Option<usize> {
        self.groups.group_size(group_id)
    }

    pub async fn verify_membership(&self, commitment: &Commitment, group_id: &GroupId) -> bool {
        self.membership.verify_membership(commitment, group_id).await
    }

    // -- proofs ---------------------------------------------------------

    pub async fn generate_proof(
        &self,
        identity: &Identity,
        signal: &Signal,
        group_id: &GroupId,
    ) -> Result<Proof, GovernanceError> {
        self.membership.generate_proof(identity, signal, group_id).await
    }

    /// `true` iff the proof is valid; consumes the nullifier on success.
    pub async fn verify_proof(
        &self,
        proof: &Proof,
        signal: &Signal,
        group_id: &GroupId,
    ) -> Result<bool, GovernanceError> {
        self.membership.verify_proof(proof, signal, group_id).await
    }

    // -- proposals ------------------------------------------------------

    pub async fn create_proposal(&self, params: NewProposal) -> Result<Proposal, GovernanceError> {
        let proposal = self.voting.registry().create(params)?;
        self.submit(
            OperationKind::ProposalCreated,
            json!({
                "proposalId": proposal.id,
                "groupId": &proposal.group_id,
                "proposalType": proposal.proposal_type,
                "options": &proposal.options,
                "deadline": proposal.deadline,
            }),
        )
        .await;
        Ok(proposal)
    }

    pub fn get_proposal(&self, id: &ProposalId) -> Option<Proposal> {
        self.voting.registry().get(id)
    }

    pub fn list_proposals(&self, group_id: &GroupId) -> Vec<Proposal> {
        self.voting.registry().list(group_id)
    }

    pub fn proposal_phase(&self, id: &ProposalId) -> Result<ProposalPhase, GovernanceError> {
        self.voting.registry().phase(id)
    }

    /// Cast an anonymous vote. `weight` applies to weighted policies only.
    pub async fn vote(
        &self,
        signal: &Signal,
        proof: &Proof,
        weight: Option<u64>,
    ) -> Result<VoteReceipt, GovernanceError> {
        let receipt = self.voting.vote(signal, proof, weight).await?;
        self.submit(
            OperationKind::VoteRecorded,
            json!({
                "proposalId": receipt.proposal_id,
                "choice": &receipt.choice,
                "weight": receipt.weight,
                "nullifierHash": &receipt.nullifier_hash,
            }),
        )
        .await;
        Ok(receipt)
    }

    /// Finalize a proposal whose deadline has passed. Idempotent; the
    /// ledger sees exactly one `ResultsFinalized` per proposal.
    pub async fn tally_votes(&self, id: &ProposalId) -> Result<VoteResults, GovernanceError> {
        let report = self.voting.registry().tally(id)?;
        if report.newly_finalized {
            self.submit(
                OperationKind::ResultsFinalized,
                json!({ "proposalId": id, "results": &report.results }),
            )
            .await;
        }
        Ok(report.results)
    }

    pub fn get_results(&self, id: &ProposalId) -> Result<VoteResults, GovernanceError> {
        self.voting.registry().results(id)
    }

    // -- signals --------------------------------------------------------

    pub async fn send_signal(
        &self,
        submission: SignalSubmission,
        proof: &Proof,
    ) -> Result<SignalId, GovernanceError> {
        let record = self.signals.send_signal(submission, proof).await?;
        self.submit(
            OperationKind::SignalRecorded,
            json!({
                "signalId": record.id,
                "groupId": &record.group_id,
                "scope": &record.scope,
                "type": record.signal_type(),
                "nullifierHash": &record.nullifier_hash,
            }),
        )
        .await;
        Ok(record.id)
    }

    pub fn aggregate_signals(&self, signal_type: SignalType, scope: &str) -> SignalAggregate {
        self.signals.aggregate(signal_type, scope)
    }

    pub async fn verify_signal(
        &self,
        id: &SignalId,
        proof: &Proof,
    ) -> Result<bool, GovernanceError> {
        self.signals.verify_signal(id, proof).await
    }

    pub fn get_signal(&self, id: &SignalId) -> Option<PrivateSignal> {
        self.signals.get(id)
    }

    pub fn list_signals(&self, scope: &str) -> Vec<PrivateSignal> {
        self.signals.list(scope)
    }

    async fn submit(&self, kind: OperationKind, payload: serde_json::Value) {
        if !self.config.submit_to_ledger {
            return;
        }
        match self.ledger.submit_operation(kind, payload).await {
            Ok(operation_id) => {
                tracing::debug!(%kind, %operation_id, "ledger operation submitted");
            }
            Err(e) => {
                tracing::warn!(%kind, error = %e, "ledger submission failed");
            }
        }
    }
}
