//! # Anonymous Voting
//!
//! A vote is a signal whose message is `"<proposalId>|<choice>"` and whose
//! scope is the proposal's vote scope (`"<proposalId>:vote"`). Binding the
//! scope to the proposal makes the nullifier one-per-member-per-proposal.
//!
//! Validation order: message format, proposal exists, proposal active,
//! choice known, scope, proof checks, then one critical section on the
//! proposal that re-checks phase and choice, consumes the nullifier and
//! adds the weight. A vote refused at any step leaves its nullifier
//! unconsumed, including one whose proof check outlasted the deadline.

use agov_core::{GovernanceError, NullifierHash, ProposalId};
use agov_zkp::{Proof, Signal};
use serde::Serialize;

use crate::config::GovernanceConfig;
use crate::membership::{MembershipProofService, ProofRejection};
use crate::proposal::ProposalRegistry;
use crate::tally::VoteResults;

/// Parse a vote message into proposal id and choice.
///
/// The message must contain exactly one `|` with non-empty text on both
/// sides. An id that is not a proposal id parses but names no proposal.
pub fn parse_vote_message(message: &str) -> Result<(String, String), GovernanceError> {
    let mut parts = message.split('|');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(id), Some(choice), None) if !id.is_empty() && !choice.is_empty() => {
            Ok((id.to_string(), choice.to_string()))
        }
        _ => Err(GovernanceError::InvalidSignalFormat(format!(
            "vote message must be \"<proposalId>|<choice>\", got {message:?}"
        ))),
    }
}

/// Format the vote message for `choice` on `proposal_id`.
pub fn vote_message(proposal_id: &ProposalId, choice: &str) -> String {
    format!("{proposal_id}|{choice}")
}

fn double_action(proof: &Proof) -> GovernanceError {
    GovernanceError::DoubleAction {
        nullifier_hash: proof.nullifier_hash.to_string(),
    }
}

/// An accepted vote.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteReceipt {
    pub proposal_id: ProposalId,
    pub choice: String,
    pub weight: u64,
    pub nullifier_hash: NullifierHash,
    pub results: VoteResults,
}

/// Accepts anonymous votes into the proposal registry.
#[derive(Debug, Clone)]
pub struct VoteTally {
    registry: ProposalRegistry,
    membership: MembershipProofService,
    config: GovernanceConfig,
}

impl VoteTally {
    pub fn new(
        registry: ProposalRegistry,
        membership: MembershipProofService,
        config: GovernanceConfig,
    ) -> Self {
        Self {
            registry,
            membership,
            config,
        }
    }

    pub fn registry(&self) -> &ProposalRegistry {
        &self.registry
    }

    /// Validate and record one anonymous vote.
    ///
    /// `weight` is consulted only by the stake- and rarity-weighted
    /// policies.
    pub async fn vote(
        &self,
        signal: &Signal,
        proof: &Proof,
        weight: Option<u64>,
    ) -> Result<VoteReceipt, GovernanceError> {
        let (raw_id, choice) = parse_vote_message(&signal.message)?;
        let proposal_id =
            ProposalId::parse(&raw_id).ok_or_else(|| GovernanceError::ProposalNotFound {
                proposal_id: raw_id.clone(),
            })?;
        let proposal = self.registry.check_vote(&proposal_id, &choice)?;
        if signal.scope != proposal.vote_scope() {
            return Err(GovernanceError::InvalidSignalFormat(format!(
                "vote scope must be {:?}, got {:?}",
                proposal.vote_scope(),
                signal.scope
            )));
        }

        match self
            .membership
            .check_unconsumed(proof, signal, &proposal.group_id)
            .await?
        {
            None => {}
            Some(ProofRejection::NullifierConsumed) => return Err(double_action(proof)),
            Some(reason) => {
                return Err(GovernanceError::ProofVerificationFailed(reason.to_string()))
            }
        }

        let weight = proposal
            .voting_power
            .effective_weight(weight, &self.config);
        let results = self
            .registry
            .record_vote_with(&proposal_id, &choice, weight, || {
                if self.membership.consume(&proof.nullifier_hash) {
                    Ok(())
                } else {
                    Err(double_action(proof))
                }
            })
            .map_err(|e| {
                tracing::debug!(proposal_id = %proposal_id, kind = e.kind(), "vote refused at tally");
                e
            })?;
        tracing::info!(proposal_id = %proposal_id, weight, "vote recorded");
        Ok(VoteReceipt {
            proposal_id,
            choice,
            weight,
            nullifier_hash: proof.nullifier_hash.clone(),
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use agov_core::{Clock, GroupId, ManualClock, Timestamp};
    use agov_crypto::Identity;
    use agov_state::{CommitmentGroupStore, NullifierLedger};
    use agov_zkp::{MockProvingBackend, ProvingBackend};

    use crate::proposal::{NewProposal, ProposalType, VotingPowerPolicy};

    struct Fixture {
        tally: VoteTally,
        groups: CommitmentGroupStore,
        nullifiers: NullifierLedger,
        clock: ManualClock,
        gid: GroupId,
        members: Vec<Identity>,
    }

    fn fixture(backend: MockProvingBackend) -> Fixture {
        let groups = CommitmentGroupStore::new();
        let gid = GroupId::from("dao");
        groups.create_group(&gid);
        let members: Vec<Identity> = (1..=3u8).map(|i| Identity::from_secret([i; 32])).collect();
        for m in &members {
            groups.add_member(&gid, m.commitment().clone()).unwrap();
        }
        let nullifiers = NullifierLedger::new();
        let membership = MembershipProofService::new(
            groups.clone(),
            nullifiers.clone(),
            Some(Arc::new(backend) as Arc<dyn ProvingBackend>),
            Duration::from_secs(30),
        );
        let clock = ManualClock::new(Timestamp::from_epoch_secs(1_700_000_000).unwrap());
        let registry = ProposalRegistry::new(groups.clone(), Arc::new(clock.clone()));
        Fixture {
            tally: VoteTally::new(registry, membership, GovernanceConfig::default()),
            groups,
            nullifiers,
            clock,
            gid,
            members,
        }
    }

    fn open_proposal(f: &Fixture) -> crate::proposal::Proposal {
        f.tally
            .registry()
            .create(NewProposal {
                group_id: f.gid.clone(),
                title: "t".to_string(),
                description: String::new(),
                options: vec!["Yes".to_string(), "No".to_string()],
                proposal_type: ProposalType::Binary,
                voting_power: VotingPowerPolicy::Equal,
                deadline: f.clock.now().plus_secs(60).unwrap(),
                quorum: 0.0,
            })
            .unwrap()
    }

    async fn ballot(f: &Fixture, member: usize, p: &crate::proposal::Proposal) -> (Signal, Proof) {
        let signal = Signal::new(vote_message(&p.id, "Yes"), p.vote_scope());
        let proof = f
            .tally
            .membership
            .generate_proof(&f.members[member], &signal, &f.gid)
            .await
            .unwrap();
        (signal, proof)
    }

    #[tokio::test]
    async fn replay_after_membership_change_is_double_action() {
        let f = fixture(MockProvingBackend::new());
        let p = open_proposal(&f);
        let (signal, proof) = ballot(&f, 0, &p).await;
        f.tally.vote(&signal, &proof, None).await.unwrap();
        f.groups
            .add_member(&f.gid, Identity::from_secret([9; 32]).commitment().clone())
            .unwrap();
        let err = f.tally.vote(&signal, &proof, None).await.unwrap_err();
        assert!(matches!(err, GovernanceError::DoubleAction { .. }));
        assert_eq!(f.tally.registry().results(&p.id).unwrap().total_votes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn vote_closed_during_proof_check_leaves_nullifier_unconsumed() {
        let f = fixture(MockProvingBackend::with_latency(Duration::from_secs(5)));
        let p = open_proposal(&f);
        let (signal, proof) = ballot(&f, 0, &p).await;

        let (outcome, ()) = tokio::join!(f.tally.vote(&signal, &proof, None), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            f.clock.advance(60);
        });
        assert!(matches!(
            outcome,
            Err(GovernanceError::ProposalNotActive { .. })
        ));
        assert!(!f.nullifiers.is_consumed(&proof.nullifier_hash));
        assert_eq!(f.tally.registry().results(&p.id).unwrap().total_votes, 0);
    }

    #[test]
    fn parses_well_formed_message() {
        let (id, choice) = parse_vote_message("abc|Yes").unwrap();
        assert_eq!(id, "abc");
        assert_eq!(choice, "Yes");
    }

    #[test]
    fn rejects_malformed_messages() {
        for msg in ["", "abc", "abc|", "|Yes", "a|b|c"] {
            let err = parse_vote_message(msg).unwrap_err();
            assert!(
                matches!(err, GovernanceError::InvalidSignalFormat(_)),
                "{msg:?} should be rejected"
            );
        }
    }

    #[test]
    fn message_round_trips() {
        let id = ProposalId::new();
        let (raw, choice) = parse_vote_message(&vote_message(&id, "No")).unwrap();
        assert_eq!(ProposalId::parse(&raw), Some(id));
        assert_eq!(choice, "No");
    }
}
