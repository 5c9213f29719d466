//! # agov-governance — Anonymous Governance Services
//!
//! Everything that acts on the shared stores: proof generation and
//! verification with replay protection, proposals and tallies, anonymous
//! signals, and the facade that ties them to an external ledger.
//!
//! ## Architecture
//!
//! - **Membership** (`membership.rs`): proof generation and the
//!   verification pipeline. The only place nullifiers are consumed.
//! - **Proposals** (`proposal.rs`, `tally.rs`, `voting.rs`): registry,
//!   per-type tally algorithms, and the anonymous vote path.
//! - **Signals** (`signal.rs`): scope/type-indexed signals and their
//!   aggregations.
//! - **Facade** (`facade.rs`): the public surface, plus best-effort ledger
//!   submission after each accepted mutation.
//! - **Seams** (`ledger.rs`, `oracle.rs`): async traits for the external
//!   ledger and state oracle.
//!
//! ## Concurrency
//!
//! All stores use `parking_lot` locks that are never held across an
//! `.await`. External calls (backend, oracle, ledger) are awaited inline
//! by the operation that needs them.

pub mod config;
pub mod facade;
pub mod ledger;
pub mod membership;
pub mod oracle;
pub mod proposal;
pub mod signal;
pub mod tally;
pub mod voting;

pub use config::{ConfigError, GovernanceConfig};
pub use facade::{GovernanceFacade, GovernanceFacadeBuilder};
pub use ledger::{LedgerEntry, LedgerError, LedgerSink, NoopLedger, OperationKind, RecordingLedger};
pub use membership::{MembershipProofService, ProofCheck, ProofRejection};
pub use oracle::{OracleError, StateOracle};
pub use proposal::{
    vote_scope, NewProposal, Proposal, ProposalPhase, ProposalRegistry, ProposalType,
    TallyReport, VotingPowerPolicy,
};
pub use signal::{
    AggregateSummary, Consensus, NumericSummary, PrivateSignal, SignalAggregate, SignalBus,
    SignalPayload, SignalSubmission, SignalType,
};
pub use tally::{TallyMethod, TallyOutcome, VoteResults};
pub use voting::{parse_vote_message, vote_message, VoteReceipt, VoteTally};
