//! # Simulate Subcommand
//!
//! Runs one proposal end to end from a YAML scenario:
//!
//! ```yaml
//! group: dao-1
//! members: 5
//! proposal:
//!   title: Fund the grants round
//!   type: binary
//!   options: ["Yes", "No"]
//!   votingPower: equal
//!   durationSecs: 3600
//!   quorum: 50
//! votes:
//!   - { member: 0, choice: "Yes" }
//!   - { member: 1, choice: "No", weight: 4 }
//! ```
//!
//! Members are fresh identities. Proofs come from the mock backend and
//! time from a manual clock that is advanced past the deadline before the
//! tally.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};

use agov_core::{Clock, GovernanceError, GroupId, ManualClock, Timestamp};
use agov_crypto::Identity;
use agov_governance::{
    vote_message, GovernanceConfig, GovernanceFacade, NewProposal, ProposalType, RecordingLedger,
    VoteResults, VotingPowerPolicy,
};
use agov_zkp::{MockProvingBackend, Signal};

/// Arguments for `agov simulate`.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Path to the scenario YAML file.
    pub scenario: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Scenario {
    pub group: String,
    pub members: usize,
    pub proposal: ScenarioProposal,
    #[serde(default)]
    pub votes: Vec<ScenarioVote>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScenarioProposal {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub proposal_type: ProposalType,
    pub options: Vec<String>,
    #[serde(default)]
    pub voting_power: VotingPowerPolicy,
    #[serde(default = "default_duration")]
    pub duration_secs: i64,
    #[serde(default)]
    pub quorum: f64,
}

fn default_duration() -> i64 {
    3600
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioVote {
    /// Index into the generated members.
    pub member: usize,
    pub choice: String,
    pub weight: Option<u64>,
}

/// Outcome of one scenario vote.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteLine {
    pub member: usize,
    pub choice: String,
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    pub group: String,
    pub members: usize,
    pub proposal_id: String,
    pub votes: Vec<VoteLine>,
    pub results: VoteResults,
    pub ledger_operations: usize,
}

pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading scenario {}", path.display()))?;
    let scenario: Scenario = serde_yaml::from_str(&raw)
        .with_context(|| format!("parsing scenario {}", path.display()))?;
    if scenario.members == 0 {
        bail!("scenario needs at least one member");
    }
    if let Some(v) = scenario.votes.iter().find(|v| v.member >= scenario.members) {
        bail!(
            "vote references member {} but the group has {}",
            v.member,
            scenario.members
        );
    }
    if scenario.proposal.duration_secs <= 0 {
        bail!("durationSecs must be positive");
    }
    if closing_time(Timestamp::now(), scenario.proposal.duration_secs).is_none() {
        bail!(
            "durationSecs {} is out of range",
            scenario.proposal.duration_secs
        );
    }
    Ok(scenario)
}

/// Deadline and the first instant after it, when both are representable.
fn closing_time(start: Timestamp, duration_secs: i64) -> Option<(Timestamp, Timestamp)> {
    let deadline = start.plus_secs(duration_secs)?;
    Some((deadline, deadline.plus_secs(1)?))
}

pub async fn simulate(scenario: &Scenario, config: GovernanceConfig) -> Result<SimulationReport> {
    let clock = ManualClock::new(Timestamp::now());
    let ledger = Arc::new(RecordingLedger::new());
    let gov = GovernanceFacade::builder()
        .config(config)
        .backend(Arc::new(MockProvingBackend::new()))
        .ledger(ledger.clone())
        .clock(Arc::new(clock.clone()))
        .build();

    let group_id = GroupId::new(scenario.group.clone());
    gov.create_group(&group_id).await;
    let members: Vec<Identity> = (0..scenario.members).map(|_| Identity::generate()).collect();
    for member in &members {
        gov.add_member(&group_id, member.commitment().clone()).await?;
    }

    let draft = &scenario.proposal;
    let Some((deadline, after_deadline)) = closing_time(clock.now(), draft.duration_secs) else {
        bail!("durationSecs {} is out of range", draft.duration_secs);
    };
    let proposal = gov
        .create_proposal(NewProposal {
            group_id: group_id.clone(),
            title: draft.title.clone(),
            description: draft.description.clone(),
            options: draft.options.clone(),
            proposal_type: draft.proposal_type,
            voting_power: draft.voting_power,
            deadline,
            quorum: draft.quorum,
        })
        .await?;

    let mut lines = Vec::with_capacity(scenario.votes.len());
    for v in &scenario.votes {
        let signal = Signal::new(vote_message(&proposal.id, &v.choice), proposal.vote_scope());
        let outcome = async {
            let proof = gov
                .generate_proof(&members[v.member], &signal, &group_id)
                .await?;
            gov.vote(&signal, &proof, v.weight).await?;
            Ok::<(), GovernanceError>(())
        }
        .await;
        if let Err(e) = &outcome {
            tracing::info!(member = v.member, kind = e.kind(), "scenario vote rejected");
        }
        lines.push(VoteLine {
            member: v.member,
            choice: v.choice.clone(),
            accepted: outcome.is_ok(),
            rejection: outcome.err().map(|e| e.to_string()),
        });
    }

    clock.set(after_deadline);
    let results = gov.tally_votes(&proposal.id).await?;

    Ok(SimulationReport {
        group: scenario.group.clone(),
        members: scenario.members,
        proposal_id: proposal.id.to_string(),
        votes: lines,
        results,
        ledger_operations: ledger.entries().len(),
    })
}

pub fn run_simulate(args: &SimulateArgs) -> Result<u8> {
    let scenario = load_scenario(&args.scenario)?;
    let config = GovernanceConfig::from_env().context("loading governance configuration")?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    let report = runtime.block_on(simulate(&scenario, config))?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(0)
}
