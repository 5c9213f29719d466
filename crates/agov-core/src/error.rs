//! # Error Types — Protocol Rejection Kinds
//!
//! `GovernanceError` is the error every public "act" operation returns.
//! Its variants are the protocol's rejection vocabulary; callers match on
//! them, so each one carries the identifier it concerns.
//!
//! ## Propagation Policy
//!
//! - Act operations (vote, send signal, create proposal, add member) return
//!   `Err` for every validation failure and leave no partial state.
//! - Verify operations return `Ok(false)` for semantic mismatches. Only
//!   `MalformedProof` and `ProofBackendUnavailable` surface as `Err` there.

use thiserror::Error;

/// Top-level error type for group, proof, proposal, and signal operations.
#[derive(Error, Debug)]
pub enum GovernanceError {
    /// The group does not exist, or has no members where members are required.
    #[error("group not found: {group_id}")]
    GroupNotFound {
        /// The requested group.
        group_id: String,
    },

    /// Removal of a commitment that is not in the group.
    #[error("member not found in group {group_id}")]
    MemberNotFound {
        /// The group that was searched.
        group_id: String,
    },

    /// Strict insertion of a commitment that is already present.
    #[error("commitment already a member of group {group_id}")]
    AlreadyMember {
        /// The group that already holds the commitment.
        group_id: String,
    },

    /// Proof generation requested by an identity outside the group.
    #[error("identity is not a member of group {group_id}")]
    NotGroupMember {
        /// The target group.
        group_id: String,
    },

    /// The proof object does not have the backend's output shape.
    #[error("malformed proof: {0}")]
    MalformedProof(String),

    /// The proof is well-formed but does not verify for this action.
    #[error("proof verification failed: {0}")]
    ProofVerificationFailed(String),

    /// A second vote from the same member on the same scope.
    #[error("nullifier {nullifier_hash} already used in this scope")]
    DoubleAction {
        /// The replayed nullifier hash.
        nullifier_hash: String,
    },

    /// A vote message that is not `"<proposalId>|<choice>"`.
    #[error("invalid signal format: {0}")]
    InvalidSignalFormat(String),

    /// A vote for an option the proposal does not define.
    #[error("unknown choice {choice:?} for proposal {proposal_id}")]
    UnknownChoice {
        /// The proposal voted on.
        proposal_id: String,
        /// The rejected choice.
        choice: String,
    },

    /// Option count does not fit the proposal type.
    #[error("unsupported proposal type {proposal_type} with {option_count} options")]
    UnsupportedProposalType {
        /// The requested proposal type.
        proposal_type: String,
        /// Number of distinct options supplied.
        option_count: usize,
    },

    /// No proposal with this id.
    #[error("proposal not found: {proposal_id}")]
    ProposalNotFound {
        /// The requested proposal.
        proposal_id: String,
    },

    /// The proposal no longer accepts votes.
    #[error("proposal {proposal_id} is not active")]
    ProposalNotActive {
        /// The closed proposal.
        proposal_id: String,
    },

    /// A second signal from the same member in the same scope.
    #[error("duplicate signal in scope {scope:?}")]
    DuplicateSignal {
        /// The scope that already holds a signal for this nullifier.
        scope: String,
    },

    /// The proving backend is missing, unreachable, or timed out.
    #[error("proof backend unavailable: {0}")]
    ProofBackendUnavailable(String),

    /// A payload could not be canonically encoded.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

impl GovernanceError {
    /// Stable snake_case name of the variant, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GroupNotFound { .. } => "group_not_found",
            Self::MemberNotFound { .. } => "member_not_found",
            Self::AlreadyMember { .. } => "already_member",
            Self::NotGroupMember { .. } => "not_group_member",
            Self::MalformedProof(_) => "malformed_proof",
            Self::ProofVerificationFailed(_) => "proof_verification_failed",
            Self::DoubleAction { .. } => "double_action",
            Self::InvalidSignalFormat(_) => "invalid_signal_format",
            Self::UnknownChoice { .. } => "unknown_choice",
            Self::UnsupportedProposalType { .. } => "unsupported_proposal_type",
            Self::ProposalNotFound { .. } => "proposal_not_found",
            Self::ProposalNotActive { .. } => "proposal_not_active",
            Self::DuplicateSignal { .. } => "duplicate_signal",
            Self::ProofBackendUnavailable(_) => "proof_backend_unavailable",
            Self::Canonicalization(_) => "canonicalization",
        }
    }
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// A value that should be a 32-byte hex field element is not one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HexError {
    /// Wrong number of hex digits after any `0x` prefix.
    #[error("expected {expected} hex chars, got {actual}")]
    Length {
        /// Required digit count.
        expected: usize,
        /// Digits supplied.
        actual: usize,
    },

    /// A character outside `[0-9a-fA-F]`.
    #[error("invalid hex digit at position {position}")]
    InvalidDigit {
        /// Offset of the first bad character.
        position: usize,
    },
}
