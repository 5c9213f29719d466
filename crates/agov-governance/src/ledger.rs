//! # Ledger Sink
//!
//! Accepted governance mutations are forwarded to an external ledger as
//! operations. The local stores are authoritative for every check; the
//! ledger is an audit trail. A failed submission is logged and does not
//! undo the accepted mutation.

use std::sync::atomic::{AtomicBool, Ordering};

use agov_core::OperationId;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Kind of mutation being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    GroupCreated,
    MemberAdded,
    MemberRemoved,
    ProposalCreated,
    VoteRecorded,
    ResultsFinalized,
    SignalRecorded,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GroupCreated => "group_created",
            Self::MemberAdded => "member_added",
            Self::MemberRemoved => "member_removed",
            Self::ProposalCreated => "proposal_created",
            Self::VoteRecorded => "vote_recorded",
            Self::ResultsFinalized => "results_finalized",
            Self::SignalRecorded => "signal_recorded",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger rejected {kind} operation: {reason}")]
    Rejected { kind: OperationKind, reason: String },
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// External operation log.
#[async_trait]
pub trait LedgerSink: Send + Sync {
    async fn submit_operation(
        &self,
        kind: OperationKind,
        payload: serde_json::Value,
    ) -> Result<OperationId, LedgerError>;
}

/// Discards every operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLedger;

#[async_trait]
impl LedgerSink for NoopLedger {
    async fn submit_operation(
        &self,
        _kind: OperationKind,
        _payload: serde_json::Value,
    ) -> Result<OperationId, LedgerError> {
        Ok(OperationId::new())
    }
}

/// One operation as seen by [`RecordingLedger`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    pub operation_id: OperationId,
    pub kind: OperationKind,
    pub payload: serde_json::Value,
}

/// Keeps every submitted operation in memory. Can be switched to reject
/// submissions to exercise the failure path.
#[derive(Debug, Default)]
pub struct RecordingLedger {
    entries: Mutex<Vec<LedgerEntry>>,
    failing: AtomicBool,
}

impl RecordingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.entries.lock().clone()
    }

    pub fn count(&self, kind: OperationKind) -> usize {
        self.entries.lock().iter().filter(|e| e.kind == kind).count()
    }
}

#[async_trait]
impl LedgerSink for RecordingLedger {
    async fn submit_operation(
        &self,
        kind: OperationKind,
        payload: serde_json::Value,
    ) -> Result<OperationId, LedgerError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("recording ledger set to fail".to_string()));
        }
        let operation_id = OperationId::new();
        self.entries.lock().push(LedgerEntry {
            operation_id,
            kind,
            payload,
        });
        Ok(operation_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_ledger_keeps_entries_in_order() {
        let ledger = RecordingLedger::new();
        let a = ledger
            .submit_operation(OperationKind::GroupCreated, serde_json::json!({"groupId": "g"}))
            .await
            .unwrap();
        let b = ledger
            .submit_operation(OperationKind::MemberAdded, serde_json::json!({}))
            .await
            .unwrap();
        let entries = ledger.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].operation_id, a);
        assert_eq!(entries[1].operation_id, b);
        assert_eq!(ledger.count(OperationKind::MemberAdded), 1);
    }

    #[tokio::test]
    async fn failing_ledger_records_nothing() {
        let ledger = RecordingLedger::new();
        ledger.set_failing(true);
        let err = ledger
            .submit_operation(OperationKind::VoteRecorded, serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unavailable(_)));
        assert!(ledger.entries().is_empty());
    }

    #[test]
    fn kind_names_are_snake_case() {
        assert_eq!(OperationKind::ResultsFinalized.to_string(), "results_finalized");
        assert_eq!(
            serde_json::to_value(OperationKind::SignalRecorded).unwrap(),
            serde_json::json!("signal_recorded")
        );
    }
}
