//! # Tally Algorithms
//!
//! Pure functions from accumulated per-option weights to a final outcome.
//! The proposal registry calls [`finalize`] once, when a proposal's
//! deadline has passed.
//!
//! | Type              | Winner                                            |
//! |-------------------|---------------------------------------------------|
//! | `binary`          | larger of the two tallies, with the difference    |
//! | `multiple_choice` | plurality                                         |
//! | `weighted`        | plurality over weighted tallies                   |
//! | `ranked_choice`   | plurality of first preferences, one round         |
//! | `quadratic`       | plurality over `sqrt(tally)`                      |
//!
//! A tie for first place yields no winner. So does a proposal with no
//! votes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::proposal::ProposalType;

/// Running and final results of one proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResults {
    /// Accumulated weight per option. Every option is present from creation.
    pub tallies: BTreeMap<String, u64>,
    /// Sum of all weights recorded.
    pub total_votes: u64,
    pub is_finalized: bool,
    /// Present once finalized.
    pub outcome: Option<TallyOutcome>,
}

impl VoteResults {
    pub fn new<'a>(options: impl IntoIterator<Item = &'a String>) -> Self {
        Self {
            tallies: options.into_iter().map(|o| (o.clone(), 0)).collect(),
            total_votes: 0,
            is_finalized: false,
            outcome: None,
        }
    }
}

/// Result of finalizing a proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TallyOutcome {
    pub winner: Option<String>,
    /// `total_votes / group_size × 100`.
    pub participation: f64,
    pub quorum_met: bool,
    #[serde(flatten)]
    pub method: TallyMethod,
}

/// Type-specific part of an outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum TallyMethod {
    Binary {
        #[serde(rename = "winningMargin")]
        winning_margin: u64,
    },
    Plurality,
    RankedChoice {
        rounds: u32,
    },
    Quadratic {
        #[serde(rename = "quadraticResults")]
        quadratic_results: BTreeMap<String, f64>,
    },
}

/// Compute the outcome for accumulated `results`.
///
/// `quorum` is a percentage of the group size.
pub fn finalize(
    proposal_type: ProposalType,
    results: &VoteResults,
    group_size: usize,
    quorum: f64,
) -> TallyOutcome {
    let participation = participation(results.total_votes, group_size);
    let quorum_met = participation >= quorum;
    let tallies = &results.tallies;

    let (winner, method) = match proposal_type {
        ProposalType::Binary => {
            let mut values = tallies.values().copied();
            let a = values.next().unwrap_or(0);
            let b = values.next().unwrap_or(0);
            (
                unique_max(tallies.iter().map(|(k, v)| (k, *v as f64))),
                TallyMethod::Binary {
                    winning_margin: a.abs_diff(b),
                },
            )
        }
        ProposalType::MultipleChoice | ProposalType::Weighted => (
            unique_max(tallies.iter().map(|(k, v)| (k, *v as f64))),
            TallyMethod::Plurality,
        ),
        ProposalType::RankedChoice => (
            unique_max(tallies.iter().map(|(k, v)| (k, *v as f64))),
            TallyMethod::RankedChoice { rounds: 1 },
        ),
        ProposalType::Quadratic => {
            let quadratic_results: BTreeMap<String, f64> = tallies
                .iter()
                .map(|(k, v)| (k.clone(), (*v as f64).sqrt()))
                .collect();
            (
                unique_max(quadratic_results.iter().map(|(k, v)| (k, *v))),
                TallyMethod::Quadratic { quadratic_results },
            )
        }
    };

    TallyOutcome {
        winner,
        participation,
        quorum_met,
        method,
    }
}

/// Percentage of the group that voted. Zero for an empty group.
pub fn participation(total_votes: u64, group_size: usize) -> f64 {
    if group_size == 0 {
        return 0.0;
    }
    total_votes as f64 / group_size as f64 * 100.0
}

/// The single key with the strictly largest positive value.
fn unique_max<'a>(entries: impl Iterator<Item = (&'a String, f64)>) -> Option<String> {
    let mut best: Option<(&String, f64)> = None;
    let mut tied = false;
    for (key, value) in entries {
        match best {
            Some((_, top)) if value < top => {}
            Some((_, top)) if value == top => tied = true,
            _ => {
                best = Some((key, value));
                tied = false;
            }
        }
    }
    match best {
        Some((key, value)) if !tied && value > 0.0 => Some(key.clone()),
        _ => None,
    }
}
