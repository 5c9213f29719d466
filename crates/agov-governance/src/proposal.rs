//! # Proposal Registry
//!
//! Proposals and their running tallies. A proposal moves through three
//! phases, driven only by the injected clock and by finalization:
//!
//! ```text
//! Active ──(now ≥ deadline)──▶ AwaitingTally ──(tally, now > deadline)──▶ Finalized
//! ```
//!
//! Votes are accepted only while `Active`. Finalization happens at most
//! once; later tally requests return the stored results unchanged.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use agov_core::{Clock, GovernanceError, GroupId, ProposalId, Timestamp};
use agov_state::{CommitmentGroupStore, Store};
use serde::{Deserialize, Serialize};

use crate::config::GovernanceConfig;
use crate::tally::{self, VoteResults};

/// How votes are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalType {
    Binary,
    MultipleChoice,
    Weighted,
    RankedChoice,
    Quadratic,
}

impl ProposalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::MultipleChoice => "multiple_choice",
            Self::Weighted => "weighted",
            Self::RankedChoice => "ranked_choice",
            Self::Quadratic => "quadratic",
        }
    }

    fn accepts_option_count(&self, count: usize) -> bool {
        match self {
            Self::Binary => count == 2,
            Self::RankedChoice => count >= 3,
            _ => count >= 2,
        }
    }
}

impl std::fmt::Display for ProposalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much one vote counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VotingPowerPolicy {
    /// Every vote weighs 1. Any supplied weight is ignored.
    #[default]
    Equal,
    /// Supplied weight clamped to `[1, stake_weight_cap]`.
    StakeWeighted,
    /// Supplied weight clamped to `[1, rarity_weight_cap]`.
    RarityWeighted,
}

impl VotingPowerPolicy {
    /// Effective weight of a vote. A missing weight counts as 1.
    pub fn effective_weight(&self, supplied: Option<u64>, config: &GovernanceConfig) -> u64 {
        let cap = match self {
            Self::Equal => return 1,
            Self::StakeWeighted => config.stake_weight_cap,
            Self::RarityWeighted => config.rarity_weight_cap,
        };
        let requested = supplied.unwrap_or(1);
        let weight = requested.clamp(1, cap.max(1));
        if weight != requested {
            tracing::debug!(policy = ?self, requested, weight, "vote weight clamped");
        }
        weight
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalPhase {
    Active,
    AwaitingTally,
    Finalized,
}

/// Parameters for a new proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProposal {
    pub group_id: GroupId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub options: Vec<String>,
    pub proposal_type: ProposalType,
    #[serde(default)]
    pub voting_power: VotingPowerPolicy,
    pub deadline: Timestamp,
    /// Minimum participation, as a percentage of the group size.
    #[serde(default)]
    pub quorum: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: ProposalId,
    pub group_id: GroupId,
    pub title: String,
    pub description: String,
    pub options: Vec<String>,
    pub proposal_type: ProposalType,
    pub voting_power: VotingPowerPolicy,
    pub deadline: Timestamp,
    pub quorum: f64,
    pub created_at: Timestamp,
}

impl Proposal {
    /// The action scope votes on this proposal are bound to.
    pub fn vote_scope(&self) -> String {
        vote_scope(&self.id)
    }

    pub fn has_option(&self, choice: &str) -> bool {
        self.options.iter().any(|o| o == choice)
    }
}

/// Scope string for voting on `proposal_id`.
pub fn vote_scope(proposal_id: &ProposalId) -> String {
    format!("{proposal_id}:vote")
}

#[derive(Debug, Clone)]
struct ProposalRecord {
    proposal: Proposal,
    results: VoteResults,
    /// Creation order within this registry.
    sequence: u64,
}

impl ProposalRecord {
    fn phase(&self, now: &Timestamp) -> ProposalPhase {
        if self.results.is_finalized {
            ProposalPhase::Finalized
        } else if now < &self.proposal.deadline {
            ProposalPhase::Active
        } else {
            ProposalPhase::AwaitingTally
        }
    }

    fn ensure_active(&self, now: &Timestamp) -> Result<(), GovernanceError> {
        if self.phase(now) == ProposalPhase::Active {
            Ok(())
        } else {
            Err(GovernanceError::ProposalNotActive {
                proposal_id: self.proposal.id.to_string(),
            })
        }
    }

    fn ensure_choice(&self, choice: &str) -> Result<(), GovernanceError> {
        if self.proposal.has_option(choice) {
            Ok(())
        } else {
            Err(GovernanceError::UnknownChoice {
                proposal_id: self.proposal.id.to_string(),
                choice: choice.to_string(),
            })
        }
    }
}

/// Result of a tally request.
#[derive(Debug, Clone, PartialEq)]
pub struct TallyReport {
    pub results: VoteResults,
    /// `true` only for the call that performed finalization.
    pub newly_finalized: bool,
}

/// Owns proposals and their tallies.
#[derive(Clone)]
pub struct ProposalRegistry {
    proposals: Store<ProposalId, ProposalRecord>,
    next_sequence: Arc<AtomicU64>,
    groups: CommitmentGroupStore,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ProposalRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProposalRegistry")
            .field("proposals", &self.proposals.len())
            .finish()
    }
}

impl ProposalRegistry {
    pub fn new(groups: CommitmentGroupStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            proposals: Store::new(),
            next_sequence: Arc::new(AtomicU64::new(0)),
            groups,
            clock,
        }
    }

    /// Register a proposal against a non-empty group.
    pub fn create(&self, params: NewProposal) -> Result<Proposal, GovernanceError> {
        match self.groups.group_size(&params.group_id) {
            Some(size) if size > 0 => {}
            _ => {
                return Err(GovernanceError::GroupNotFound {
                    group_id: params.group_id.to_string(),
                })
            }
        }
        let distinct: BTreeSet<&String> = params.options.iter().collect();
        if distinct.len() != params.options.len()
            || !params.proposal_type.accepts_option_count(params.options.len())
        {
            return Err(GovernanceError::UnsupportedProposalType {
                proposal_type: params.proposal_type.to_string(),
                option_count: params.options.len(),
            });
        }

        let proposal = Proposal {
            id: ProposalId::new(),
            group_id: params.group_id,
            title: params.title,
            description: params.description,
            options: params.options,
            proposal_type: params.proposal_type,
            voting_power: params.voting_power,
            deadline: params.deadline,
            quorum: params.quorum,
            created_at: self.clock.now(),
        };
        let record = ProposalRecord {
            results: VoteResults::new(&proposal.options),
            proposal: proposal.clone(),
            sequence: self.next_sequence.fetch_add(1, Ordering::Relaxed),
        };
        self.proposals.insert(proposal.id, record);
        tracing::info!(
            proposal_id = %proposal.id,
            group_id = %proposal.group_id,
            proposal_type = %proposal.proposal_type,
            "proposal created"
        );
        Ok(proposal)
    }

    pub fn get(&self, id: &ProposalId) -> Option<Proposal> {
        self.proposals.read(id, |r| r.proposal.clone())
    }

    /// Proposals of a group, in creation order.
    pub fn list(&self, group_id: &GroupId) -> Vec<Proposal> {
        let mut records = self
            .proposals
            .filter(|r| &r.proposal.group_id == group_id);
        records.sort_by_key(|r| r.sequence);
        records.into_iter().map(|r| r.proposal).collect()
    }

    pub fn phase(&self, id: &ProposalId) -> Result<ProposalPhase, GovernanceError> {
        let now = self.clock.now();
        self.proposals
            .read(id, |r| r.phase(&now))
            .ok_or_else(|| not_found(id))
    }

    pub fn results(&self, id: &ProposalId) -> Result<VoteResults, GovernanceError> {
        self.proposals
            .read(id, |r| r.results.clone())
            .ok_or_else(|| not_found(id))
    }

    /// Check that a vote for `choice` would currently be accepted, without
    /// recording anything.
    pub fn check_vote(&self, id: &ProposalId, choice: &str) -> Result<Proposal, GovernanceError> {
        let now = self.clock.now();
        self.proposals
            .read(id, |r| {
                r.ensure_active(&now)?;
                r.ensure_choice(choice)?;
                Ok::<_, GovernanceError>(r.proposal.clone())
            })
            .ok_or_else(|| not_found(id))?
    }

    /// Add `weight` to `choice`. Phase and choice are re-checked under the
    /// write lock.
    pub fn record_vote(
        &self,
        id: &ProposalId,
        choice: &str,
        weight: u64,
    ) -> Result<VoteResults, GovernanceError> {
        self.record_vote_with(id, choice, weight, || Ok(()))
    }

    /// As [`record_vote`](Self::record_vote), with `admit` run inside the
    /// same critical section after the phase and choice checks pass. An
    /// `Err` from `admit` aborts the vote; if the phase or choice check
    /// fails, `admit` never runs.
    pub fn record_vote_with(
        &self,
        id: &ProposalId,
        choice: &str,
        weight: u64,
        admit: impl FnOnce() -> Result<(), GovernanceError>,
    ) -> Result<VoteResults, GovernanceError> {
        let now = self.clock.now();
        self.proposals
            .try_update(id, |r| {
                r.ensure_active(&now)?;
                r.ensure_choice(choice)?;
                admit()?;
                if let Some(tally) = r.results.tallies.get_mut(choice) {
                    *tally = tally.saturating_add(weight);
                }
                r.results.total_votes = r.results.total_votes.saturating_add(weight);
                Ok::<_, GovernanceError>(r.results.clone())
            })
            .ok_or_else(|| not_found(id))?
    }

    /// Finalize the proposal if its deadline has strictly passed.
    ///
    /// Before the deadline the running, unfinalized results are returned.
    /// After finalization the stored results are returned unchanged.
    pub fn tally(&self, id: &ProposalId) -> Result<TallyReport, GovernanceError> {
        let now = self.clock.now();
        let group_id = self
            .proposals
            .read(id, |r| r.proposal.group_id.clone())
            .ok_or_else(|| not_found(id))?;
        let group_size = self.groups.group_size(&group_id).unwrap_or(0);

        let report = self
            .proposals
            .try_update(id, |r| {
                if r.results.is_finalized || now <= r.proposal.deadline {
                    return Ok::<_, GovernanceError>(TallyReport {
                        results: r.results.clone(),
                        newly_finalized: false,
                    });
                }
                let outcome = tally::finalize(
                    r.proposal.proposal_type,
                    &r.results,
                    group_size,
                    r.proposal.quorum,
                );
                r.results.outcome = Some(outcome);
                r.results.is_finalized = true;
                Ok(TallyReport {
                    results: r.results.clone(),
                    newly_finalized: true,
                })
            })
            .ok_or_else(|| not_found(id))??;

        if report.newly_finalized {
            tracing::info!(
                proposal_id = %id,
                total_votes = report.results.total_votes,
                winner = report
                    .results
                    .outcome
                    .as_ref()
                    .and_then(|o| o.winner.as_deref())
                    .unwrap_or("none"),
                "proposal finalized"
            );
        }
        Ok(report)
    }
}

fn not_found(id: &ProposalId) -> GovernanceError {
    GovernanceError::ProposalNotFound {
        proposal_id: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agov_core::{Commitment, ManualClock};

    struct Fixture {
        registry: ProposalRegistry,
        clock: ManualClock,
        gid: GroupId,
        start: Timestamp,
    }

    fn fixture(members: usize) -> Fixture {
        let groups = CommitmentGroupStore::new();
        let gid = GroupId::from("dao");
        groups.create_group(&gid);
        for i in 0..members {
            groups.add_member(&gid, Commitment::new(format!("c{i}"))).unwrap();
        }
        let start = Timestamp::from_epoch_secs(1_700_000_000).unwrap();
        let clock = ManualClock::new(start.clone());
        let registry = ProposalRegistry::new(groups, Arc::new(clock.clone()));
        Fixture {
            registry,
            clock,
            gid,
            start,
        }
    }

    fn params(f: &Fixture, proposal_type: ProposalType, options: &[&str]) -> NewProposal {
        NewProposal {
            group_id: f.gid.clone(),
            title: "t".into(),
            description: String::new(),
            options: options.iter().map(|s| s.to_string()).collect(),
            proposal_type,
            voting_power: VotingPowerPolicy::Equal,
            deadline: f.start.plus_secs(3600).unwrap(),
            quorum: 50.0,
        }
    }

    #[test]
    fn binary_requires_two_options() {
        let f = fixture(3);
        let err = f
            .registry
            .create(params(&f, ProposalType::Binary, &["Yes", "No", "Maybe"]))
            .unwrap_err();
        assert!(matches!(
            err,
            GovernanceError::UnsupportedProposalType { option_count: 3, .. }
        ));
        assert!(f
            .registry
            .create(params(&f, ProposalType::MultipleChoice, &["A"]))
            .is_err());
        assert!(f
            .registry
            .create(params(&f, ProposalType::MultipleChoice, &["A", "A"]))
            .is_err());
        assert!(f
            .registry
            .create(params(&f, ProposalType::RankedChoice, &["A", "B"]))
            .is_err());
        assert!(f
            .registry
            .create(params(&f, ProposalType::RankedChoice, &["A", "B", "C"]))
            .is_ok());
    }

    #[test]
    fn empty_or_missing_group_is_rejected() {
        let f = fixture(0);
        let err = f
            .registry
            .create(params(&f, ProposalType::Binary, &["Yes", "No"]))
            .unwrap_err();
        assert!(matches!(err, GovernanceError::GroupNotFound { .. }));
    }

    #[test]
    fn new_proposal_has_zeroed_tallies() {
        let f = fixture(2);
        let p = f
            .registry
            .create(params(&f, ProposalType::MultipleChoice, &["A", "B", "C"]))
            .unwrap();
        let results = f.registry.results(&p.id).unwrap();
        assert_eq!(results.tallies.len(), 3);
        assert!(results.tallies.values().all(|v| *v == 0));
        assert_eq!(f.registry.phase(&p.id).unwrap(), ProposalPhase::Active);
        assert_eq!(p.vote_scope(), format!("{}:vote", p.id));
    }

    #[test]
    fn phases_follow_the_clock() {
        let f = fixture(2);
        let p = f
            .registry
            .create(params(&f, ProposalType::Binary, &["Yes", "No"]))
            .unwrap();
        f.clock.advance(3600);
        assert_eq!(f.registry.phase(&p.id).unwrap(), ProposalPhase::AwaitingTally);
        let err = f.registry.record_vote(&p.id, "Yes", 1).unwrap_err();
        assert!(matches!(err, GovernanceError::ProposalNotActive { .. }));

        // At the deadline exactly, tallying is not yet allowed.
        let report = f.registry.tally(&p.id).unwrap();
        assert!(!report.newly_finalized);
        assert!(!report.results.is_finalized);

        f.clock.advance(1);
        assert!(f.registry.tally(&p.id).unwrap().newly_finalized);
        assert_eq!(f.registry.phase(&p.id).unwrap(), ProposalPhase::Finalized);
    }

    #[test]
    fn finalization_happens_once() {
        let f = fixture(5);
        let p = f
            .registry
            .create(params(&f, ProposalType::Binary, &["Yes", "No"]))
            .unwrap();
        for _ in 0..3 {
            f.registry.record_vote(&p.id, "Yes", 1).unwrap();
        }
        f.registry.record_vote(&p.id, "No", 1).unwrap();
        f.clock.advance(4000);
        let first = f.registry.tally(&p.id).unwrap();
        let second = f.registry.tally(&p.id).unwrap();
        assert!(first.newly_finalized);
        assert!(!second.newly_finalized);
        assert_eq!(first.results, second.results);
        let outcome = first.results.outcome.unwrap();
        assert_eq!(outcome.winner.as_deref(), Some("Yes"));
        assert!((outcome.participation - 80.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_choice_is_rejected() {
        let f = fixture(2);
        let p = f
            .registry
            .create(params(&f, ProposalType::Binary, &["Yes", "No"]))
            .unwrap();
        let err = f.registry.check_vote(&p.id, "Maybe").unwrap_err();
        assert!(matches!(err, GovernanceError::UnknownChoice { .. }));
        assert_eq!(f.registry.results(&p.id).unwrap().total_votes, 0);
    }

    #[test]
    fn missing_proposal_errors() {
        let f = fixture(1);
        let id = ProposalId::new();
        assert!(matches!(
            f.registry.tally(&id),
            Err(GovernanceError::ProposalNotFound { .. })
        ));
        assert!(f.registry.get(&id).is_none());
    }

    #[test]
    fn list_is_scoped_to_group() {
        let f = fixture(2);
        let a = f
            .registry
            .create(params(&f, ProposalType::Binary, &["Yes", "No"]))
            .unwrap();
        f.clock.advance(1);
        let b = f
            .registry
            .create(params(&f, ProposalType::Quadratic, &["A", "B"]))
            .unwrap();
        let listed: Vec<_> = f.registry.list(&f.gid).into_iter().map(|p| p.id).collect();
        assert_eq!(listed, vec![a.id, b.id]);
        assert!(f.registry.list(&GroupId::from("other")).is_empty());
    }

    #[test]
    fn list_keeps_creation_order_within_one_second() {
        let f = fixture(2);
        let created: Vec<ProposalId> = (0..20)
            .map(|_| {
                f.registry
                    .create(params(&f, ProposalType::Binary, &["Yes", "No"]))
                    .unwrap()
                    .id
            })
            .collect();
        let listed: Vec<_> = f.registry.list(&f.gid).into_iter().map(|p| p.id).collect();
        assert_eq!(listed, created);
    }

    #[test]
    fn admit_runs_only_after_phase_and_choice_checks() {
        let f = fixture(2);
        let p = f
            .registry
            .create(params(&f, ProposalType::Binary, &["Yes", "No"]))
            .unwrap();
        let mut admitted = 0;
        let err = f
            .registry
            .record_vote_with(&p.id, "Maybe", 1, || {
                admitted += 1;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, GovernanceError::UnknownChoice { .. }));

        let err = f
            .registry
            .record_vote_with(&p.id, "Yes", 1, || {
                Err(GovernanceError::DoubleAction {
                    nullifier_hash: "n".to_string(),
                })
            })
            .unwrap_err();
        assert!(matches!(err, GovernanceError::DoubleAction { .. }));
        assert_eq!(f.registry.results(&p.id).unwrap().total_votes, 0);

        f.clock.advance(3600);
        let err = f
            .registry
            .record_vote_with(&p.id, "Yes", 1, || {
                admitted += 1;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, GovernanceError::ProposalNotActive { .. }));
        assert_eq!(admitted, 0);
    }

    #[test]
    fn weight_policies() {
        let cfg = GovernanceConfig {
            stake_weight_cap: 100,
            rarity_weight_cap: 5,
            ..GovernanceConfig::default()
        };
        assert_eq!(VotingPowerPolicy::Equal.effective_weight(Some(50), &cfg), 1);
        assert_eq!(VotingPowerPolicy::StakeWeighted.effective_weight(Some(50), &cfg), 50);
        assert_eq!(VotingPowerPolicy::StakeWeighted.effective_weight(Some(500), &cfg), 100);
        assert_eq!(VotingPowerPolicy::StakeWeighted.effective_weight(Some(0), &cfg), 1);
        assert_eq!(VotingPowerPolicy::RarityWeighted.effective_weight(None, &cfg), 1);
        assert_eq!(VotingPowerPolicy::RarityWeighted.effective_weight(Some(9), &cfg), 5);
    }
}
