//! Proposed custody transactions
//!
//! Transactions are append-only: once submitted they are never removed, and
//! only the execution fields change (once).

use crate::core::Address;
use bitflags::bitflags;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

bitflags! {
    /// Which transactions a listing query includes
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct TxFilter: u8 {
        /// Not yet executed
        const PENDING = 0b0000_0001;
        /// Executed (successfully or not)
        const EXECUTED = 0b0000_0010;
    }
}

impl TxFilter {
    /// Build a filter from the `(includePending, includeExecuted)` pair
    pub fn from_flags(include_pending: bool, include_executed: bool) -> Self {
        let mut filter = TxFilter::empty();
        filter.set(TxFilter::PENDING, include_pending);
        filter.set(TxFilter::EXECUTED, include_executed);
        filter
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        (self.contains(TxFilter::PENDING) && !tx.executed)
            || (self.contains(TxFilter::EXECUTED) && tx.executed)
    }
}

/// What happened when a transaction executed
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Succeeded,
    Failed(String),
}

/// A proposed operation held by the custody wallet
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transaction {
    /// Sequential id, starting at 0
    pub id: u64,
    /// Account the value and payload are sent to
    pub target: Address,
    /// Value moved from the wallet to `target`
    pub value: u128,
    /// Opaque operation descriptor
    pub payload: Bytes,
    pub executed: bool,
    /// Recorded when `executed` flips
    pub outcome: Option<ExecutionOutcome>,
    pub submitted_by: Address,
    pub submitted_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    pub fn new(id: u64, target: Address, value: u128, payload: Bytes, submitted_by: Address) -> Self {
        Self {
            id,
            target,
            value,
            payload,
            executed: false,
            outcome: None,
            submitted_by,
            submitted_at: Utc::now(),
            executed_at: None,
        }
    }

    /// Consume the transaction. Returns `false` if it was already executed.
    pub(crate) fn mark_executed(&mut self) -> bool {
        if self.executed {
            return false;
        }
        self.executed = true;
        self.executed_at = Some(Utc::now());
        true
    }

    pub(crate) fn record_outcome(&mut self, outcome: ExecutionOutcome) {
        self.outcome = Some(outcome);
    }

    pub fn is_pending(&self) -> bool {
        !self.executed
    }

    pub fn succeeded(&self) -> bool {
        self.outcome == Some(ExecutionOutcome::Succeeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: u64) -> Transaction {
        Transaction::new(id, "target".into(), 0, Bytes::new(), "acct0".into())
    }

    #[test]
    fn test_mark_executed_once() {
        let mut tx = sample(0);
        assert!(tx.is_pending());

        assert!(tx.mark_executed());
        assert!(!tx.mark_executed());
        assert!(tx.executed);
        assert!(tx.executed_at.is_some());
    }

    #[test]
    fn test_recorded_outcome() {
        let mut ok = sample(0);
        ok.mark_executed();
        ok.record_outcome(ExecutionOutcome::Succeeded);
        assert!(ok.succeeded());

        let mut failed = sample(1);
        failed.mark_executed();
        failed.record_outcome(ExecutionOutcome::Failed("rejected".to_string()));
        assert!(!failed.succeeded());
        assert!(!failed.is_pending());

        assert!(!sample(2).succeeded());
    }

    #[test]
    fn test_filter_matching() {
        let pending = sample(0);
        let mut executed = sample(1);
        executed.mark_executed();

        let only_pending = TxFilter::from_flags(true, false);
        assert!(only_pending.matches(&pending));
        assert!(!only_pending.matches(&executed));

        let all = TxFilter::PENDING | TxFilter::EXECUTED;
        assert!(all.matches(&pending) && all.matches(&executed));

        assert!(!TxFilter::empty().matches(&pending));
    }
}
