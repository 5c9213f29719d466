//! # Signal Bus
//!
//! Anonymous preference signals. Each accepted signal is bound to a proof
//! over the canonical (JCS) encoding of its fields, consumes the member's
//! nullifier for its scope, and is indexed by scope and by type.
//!
//! Aggregation only ever reads anonymized records: payloads, timestamps and
//! nullifier hashes. `participant_count` is the number of distinct
//! nullifier hashes, never a list of who took part.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use agov_core::{
    CanonicalBytes, Clock, GovernanceError, GroupId, NullifierHash, SignalId, Timestamp,
};
use agov_state::{CommitmentGroupStore, Store};
use agov_zkp::{Proof, ProofValidator, Signal};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::membership::{MembershipProofService, ProofCheck, ProofRejection};

/// Signal kinds, each with its own aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    Strategy,
    Timing,
    CollectiveDecision,
    ParameterAdjustment,
    Custom,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strategy => "strategy",
            Self::Timing => "timing",
            Self::CollectiveDecision => "collective_decision",
            Self::ParameterAdjustment => "parameter_adjustment",
            Self::Custom => "custom",
        }
    }
}

impl std::fmt::Display for SignalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific signal content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalPayload {
    /// A named strategy preference.
    Strategy { value: String },
    /// A numeric timing preference.
    Timing { value: f64 },
    /// A choice among alternatives.
    CollectiveDecision { choice: String },
    /// Preferred values for named numeric parameters.
    ParameterAdjustment { parameters: BTreeMap<String, f64> },
    /// Opaque JSON, aggregated by pass-through.
    Custom { data: serde_json::Value },
}

impl SignalPayload {
    pub fn signal_type(&self) -> SignalType {
        match self {
            Self::Strategy { .. } => SignalType::Strategy,
            Self::Timing { .. } => SignalType::Timing,
            Self::CollectiveDecision { .. } => SignalType::CollectiveDecision,
            Self::ParameterAdjustment { .. } => SignalType::ParameterAdjustment,
            Self::Custom { .. } => SignalType::Custom,
        }
    }

    fn validate(&self) -> Result<(), GovernanceError> {
        let finite = match self {
            Self::Timing { value } => value.is_finite(),
            Self::ParameterAdjustment { parameters } => parameters.values().all(|v| v.is_finite()),
            _ => true,
        };
        if finite {
            Ok(())
        } else {
            Err(GovernanceError::InvalidSignalFormat(format!(
                "{} signal carries a non-finite number",
                self.signal_type()
            )))
        }
    }
}

/// A signal as submitted, before it has an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalSubmission {
    pub group_id: GroupId,
    pub scope: String,
    pub payload: SignalPayload,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignalEnvelope<'a> {
    group_id: &'a GroupId,
    scope: &'a str,
    payload: &'a SignalPayload,
}

impl SignalSubmission {
    pub fn new(group_id: GroupId, scope: impl Into<String>, payload: SignalPayload) -> Self {
        Self {
            group_id,
            scope: scope.into(),
            payload,
        }
    }

    /// The message a proof for this submission must endorse.
    pub fn canonical_message(&self) -> Result<String, GovernanceError> {
        canonical_message(&self.group_id, &self.scope, &self.payload)
    }

    /// The (message, scope) pair to prove over.
    pub fn to_signal(&self) -> Result<Signal, GovernanceError> {
        Ok(Signal::new(self.canonical_message()?, self.scope.clone()))
    }
}

fn canonical_message(
    group_id: &GroupId,
    scope: &str,
    payload: &SignalPayload,
) -> Result<String, GovernanceError> {
    let envelope = SignalEnvelope {
        group_id,
        scope,
        payload,
    };
    Ok(CanonicalBytes::new(&envelope)?.into_string())
}

/// An accepted, immutable signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateSignal {
    pub id: SignalId,
    /// Acceptance order on this bus, starting at 0.
    pub sequence: u64,
    pub group_id: GroupId,
    pub scope: String,
    pub payload: SignalPayload,
    pub nullifier_hash: NullifierHash,
    pub timestamp: Timestamp,
}

impl PrivateSignal {
    pub fn signal_type(&self) -> SignalType {
        self.payload.signal_type()
    }

    fn canonical_message(&self) -> Result<String, GovernanceError> {
        canonical_message(&self.group_id, &self.scope, &self.payload)
    }
}

/// Agreement level of a collective decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Consensus {
    /// Leading choice above 66%.
    StrongConsensus,
    /// Leading choice above 50%.
    Majority,
    NoClearConsensus,
}

impl Consensus {
    fn classify(top_share: f64) -> Self {
        if top_share > 66.0 {
            Self::StrongConsensus
        } else if top_share > 50.0 {
            Self::Majority
        } else {
            Self::NoClearConsensus
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

/// Type-specific aggregation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AggregateSummary {
    Strategy {
        counts: BTreeMap<String, u64>,
        /// Percent of matched signals, rounded to two decimals.
        percentages: BTreeMap<String, f64>,
        mode: Option<String>,
    },
    Timing {
        /// `None` when no signals matched.
        stats: Option<NumericSummary>,
    },
    CollectiveDecision {
        counts: BTreeMap<String, u64>,
        percentages: BTreeMap<String, f64>,
        leading: Option<String>,
        consensus: Consensus,
    },
    ParameterAdjustment {
        means: BTreeMap<String, f64>,
    },
    Custom {
        entries: Vec<serde_json::Value>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalAggregate {
    pub signal_type: SignalType,
    pub scope: String,
    pub signal_count: usize,
    pub participant_count: usize,
    pub summary: AggregateSummary,
}

/// Sets hold acceptance sequence numbers; `order[seq]` is the signal id.
#[derive(Debug, Default)]
struct SignalIndex {
    order: Vec<SignalId>,
    by_scope: HashMap<String, BTreeSet<usize>>,
    by_type: HashMap<SignalType, BTreeSet<usize>>,
}

impl SignalIndex {
    fn ids<'a>(&self, sequences: impl Iterator<Item = &'a usize>) -> Vec<SignalId> {
        sequences
            .filter_map(|seq| self.order.get(*seq).copied())
            .collect()
    }
}

/// Accepts, indexes and aggregates anonymous signals.
#[derive(Clone)]
pub struct SignalBus {
    signals: Store<SignalId, PrivateSignal>,
    index: Arc<RwLock<SignalIndex>>,
    groups: CommitmentGroupStore,
    membership: MembershipProofService,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SignalBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalBus")
            .field("signals", &self.signals.len())
            .finish()
    }
}

impl SignalBus {
    pub fn new(
        groups: CommitmentGroupStore,
        membership: MembershipProofService,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            signals: Store::new(),
            index: Arc::new(RwLock::new(SignalIndex::default())),
            groups,
            membership,
            clock,
        }
    }

    /// Verify `proof` over the submission's canonical message, consume the
    /// nullifier, and store the signal.
    pub async fn send_signal(
        &self,
        submission: SignalSubmission,
        proof: &Proof,
    ) -> Result<PrivateSignal, GovernanceError> {
        if !self.groups.exists(&submission.group_id) {
            return Err(GovernanceError::GroupNotFound {
                group_id: submission.group_id.to_string(),
            });
        }
        if submission.scope.is_empty() {
            return Err(GovernanceError::InvalidSignalFormat(
                "signal scope must not be empty".to_string(),
            ));
        }
        submission.payload.validate()?;
        let signal = submission.to_signal()?;

        match self
            .membership
            .check_and_consume(proof, &signal, &submission.group_id)
            .await?
        {
            ProofCheck::Accepted => {}
            ProofCheck::Rejected(ProofRejection::NullifierConsumed) => {
                return Err(GovernanceError::DuplicateSignal {
                    scope: submission.scope,
                })
            }
            ProofCheck::Rejected(reason) => {
                return Err(GovernanceError::ProofVerificationFailed(reason.to_string()))
            }
        }

        let timestamp = self.clock.now();
        let record = {
            let mut index = self.index.write();
            let sequence = index.order.len();
            let record = PrivateSignal {
                id: SignalId::new(),
                sequence: sequence as u64,
                group_id: submission.group_id,
                scope: submission.scope,
                payload: submission.payload,
                nullifier_hash: proof.nullifier_hash.clone(),
                timestamp,
            };
            self.signals.insert(record.id, record.clone());
            index.order.push(record.id);
            index
                .by_scope
                .entry(record.scope.clone())
                .or_default()
                .insert(sequence);
            index
                .by_type
                .entry(record.signal_type())
                .or_default()
                .insert(sequence);
            record
        };
        tracing::info!(
            signal_id = %record.id,
            signal_type = %record.signal_type(),
            scope = %record.scope,
            "signal recorded"
        );
        Ok(record)
    }

    pub fn get(&self, id: &SignalId) -> Option<PrivateSignal> {
        self.signals.get(id)
    }

    /// Signals in a scope, in acceptance order.
    pub fn list(&self, scope: &str) -> Vec<PrivateSignal> {
        let ids = {
            let index = self.index.read();
            index
                .by_scope
                .get(scope)
                .map(|seqs| index.ids(seqs.iter()))
                .unwrap_or_default()
        };
        self.collect(ids)
    }

    /// Aggregate every signal of `signal_type` in `scope`.
    pub fn aggregate(&self, signal_type: SignalType, scope: &str) -> SignalAggregate {
        let ids = {
            let index = self.index.read();
            match (index.by_scope.get(scope), index.by_type.get(&signal_type)) {
                (Some(in_scope), Some(of_type)) => index.ids(in_scope.intersection(of_type)),
                _ => Vec::new(),
            }
        };
        let records = self.collect(ids);
        let participant_count = records
            .iter()
            .map(|r| &r.nullifier_hash)
            .collect::<HashSet<_>>()
            .len();
        let payloads: Vec<&SignalPayload> = records.iter().map(|r| &r.payload).collect();

        SignalAggregate {
            signal_type,
            scope: scope.to_string(),
            signal_count: records.len(),
            participant_count,
            summary: summarize(signal_type, &payloads),
        }
    }

    /// Re-check `proof` against a stored signal. Does not consume anything
    /// and does not require the group root to be unchanged since
    /// acceptance. Unknown ids verify as `false`.
    pub async fn verify_signal(
        &self,
        id: &SignalId,
        proof: &Proof,
    ) -> Result<bool, GovernanceError> {
        let Some(record) = self.signals.get(id) else {
            return Ok(false);
        };
        if !proof.nullifier_hash.ct_matches(&record.nullifier_hash) {
            return Ok(false);
        }
        if proof.signal != record.canonical_message()? {
            return Ok(false);
        }
        let expected = ProofValidator::compute_external_nullifier(&record.scope);
        if !proof.external_nullifier.ct_matches(&expected) {
            return Ok(false);
        }
        self.membership.verify_backend(proof).await
    }

    fn collect(&self, ids: Vec<SignalId>) -> Vec<PrivateSignal> {
        ids.iter().filter_map(|id| self.signals.get(id)).collect()
    }
}

fn summarize(signal_type: SignalType, payloads: &[&SignalPayload]) -> AggregateSummary {
    match signal_type {
        SignalType::Strategy => {
            let values = payloads.iter().filter_map(|p| match p {
                SignalPayload::Strategy { value } => Some(value.as_str()),
                _ => None,
            });
            let freq = Frequency::of(values);
            AggregateSummary::Strategy {
                percentages: freq.percentages(),
                mode: freq.mode(),
                counts: freq.counts,
            }
        }
        SignalType::Timing => {
            let values: Vec<f64> = payloads
                .iter()
                .filter_map(|p| match p {
                    SignalPayload::Timing { value } => Some(*value),
                    _ => None,
                })
                .collect();
            AggregateSummary::Timing {
                stats: numeric_summary(values),
            }
        }
        SignalType::CollectiveDecision => {
            let choices = payloads.iter().filter_map(|p| match p {
                SignalPayload::CollectiveDecision { choice } => Some(choice.as_str()),
                _ => None,
            });
            let freq = Frequency::of(choices);
            let leading = freq.mode();
            let top_share = leading
                .as_ref()
                .and_then(|c| freq.counts.get(c))
                .map(|n| share(*n, freq.total))
                .unwrap_or(0.0);
            AggregateSummary::CollectiveDecision {
                percentages: freq.percentages(),
                consensus: Consensus::classify(top_share),
                leading,
                counts: freq.counts,
            }
        }
        SignalType::ParameterAdjustment => {
            let mut sums: BTreeMap<String, (f64, u64)> = BTreeMap::new();
            for p in payloads {
                if let SignalPayload::ParameterAdjustment { parameters } = p {
                    for (key, value) in parameters {
                        let entry = sums.entry(key.clone()).or_insert((0.0, 0));
                        entry.0 += value;
                        entry.1 += 1;
                    }
                }
            }
            AggregateSummary::ParameterAdjustment {
                means: sums
                    .into_iter()
                    .map(|(k, (sum, n))| (k, sum / n as f64))
                    .collect(),
            }
        }
        SignalType::Custom => AggregateSummary::Custom {
            entries: payloads
                .iter()
                .filter_map(|p| match p {
                    SignalPayload::Custom { data } => Some(data.clone()),
                    _ => None,
                })
                .collect(),
        },
    }
}

/// Value counts in first-seen order.
struct Frequency {
    counts: BTreeMap<String, u64>,
    first_seen: Vec<String>,
    total: u64,
}

impl Frequency {
    fn of<'a>(values: impl Iterator<Item = &'a str>) -> Self {
        let mut counts = BTreeMap::new();
        let mut first_seen = Vec::new();
        let mut total = 0;
        for v in values {
            let n = counts.entry(v.to_string()).or_insert(0u64);
            if *n == 0 {
                first_seen.push(v.to_string());
            }
            *n += 1;
            total += 1;
        }
        Self {
            counts,
            first_seen,
            total,
        }
    }

    fn percentages(&self) -> BTreeMap<String, f64> {
        self.counts
            .iter()
            .map(|(k, n)| (k.clone(), round2(share(*n, self.total))))
            .collect()
    }

    /// Most frequent value; ties go to the value seen first.
    fn mode(&self) -> Option<String> {
        let mut best: Option<(&String, u64)> = None;
        for value in &self.first_seen {
            let n = self.counts.get(value).copied().unwrap_or(0);
            if best.map_or(true, |(_, top)| n > top) {
                best = Some((value, n));
            }
        }
        best.map(|(v, _)| v.clone())
    }
}

fn share(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count as f64 / total as f64 * 100.0
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn numeric_summary(mut values: Vec<f64>) -> Option<NumericSummary> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    let median = if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    };
    Some(NumericSummary {
        mean: values.iter().sum::<f64>() / n as f64,
        median,
        min: values[0],
        max: values[n - 1],
    })
}
