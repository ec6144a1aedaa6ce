//! Custody wallet
//!
//! Proposal / approval / execution state machine. A transaction executes the
//! moment its confirmation count first reaches the current threshold, and it
//! executes at most once: the transaction is consumed before its effect is
//! attempted, so a failed effect is recorded as `ExecutionFailure` and can
//! only be retried through a fresh submission.

use crate::core::{Address, ErrorKind, Event, LedgerError, Receipt, ValueLedger};
use crate::crypto::wallet_address;
use crate::multisig::execution::{CallError, ExecutionContext};
use crate::multisig::payload::Call;
use crate::multisig::quorum::QuorumRegistry;
use crate::multisig::transaction::{ExecutionOutcome, Transaction, TxFilter};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Errors related to custody wallet operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MultisigError {
    #[error("Not an owner: {0}")]
    NotAnOwner(Address),
    #[error("Unknown transaction: {0}")]
    UnknownTransaction(u64),
    #[error("Transaction {id} already confirmed by {owner}")]
    AlreadyConfirmed { id: u64, owner: Address },
    #[error("Transaction {0} already executed")]
    AlreadyExecuted(u64),
    #[error("Transaction {id} not confirmed by {owner}")]
    NotConfirmed { id: u64, owner: Address },
    #[error("Transaction {id} lacks quorum: have {have}, need {need}")]
    InsufficientQuorum { id: u64, have: usize, need: u32 },
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Null address")]
    NullAddress,
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl MultisigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MultisigError::NotAnOwner(_) => ErrorKind::Authorization,
            MultisigError::UnknownTransaction(_) | MultisigError::NullAddress => ErrorKind::Input,
            MultisigError::AlreadyConfirmed { .. }
            | MultisigError::AlreadyExecuted(_)
            | MultisigError::NotConfirmed { .. }
            | MultisigError::InsufficientQuorum { .. } => ErrorKind::StateConflict,
            MultisigError::InvalidConfiguration(_) => ErrorKind::Configuration,
            MultisigError::Ledger(e) => e.kind(),
        }
    }
}

/// A quorum-gated custody wallet
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CustodyWallet {
    /// Wallet address, derived from the initial configuration
    address: Address,
    registry: QuorumRegistry,
    /// Append-only transaction log, indexed by id
    transactions: Vec<Transaction>,
    /// Approvals per transaction id
    confirmations: BTreeMap<u64, BTreeSet<Address>>,
    created_at: DateTime<Utc>,
}

impl CustodyWallet {
    /// Create a wallet for `owners` requiring `threshold` approvals
    pub fn new(owners: Vec<Address>, threshold: u32) -> Result<Self, MultisigError> {
        let address = wallet_address(&owners, threshold);
        let registry = QuorumRegistry::new(owners, threshold)?;

        log::info!(
            "Custody wallet {} created ({})",
            address,
            registry.description()
        );

        Ok(Self {
            address,
            registry,
            transactions: Vec::new(),
            confirmations: BTreeMap::new(),
            created_at: Utc::now(),
        })
    }

    // =========================================================================
    // Read operations
    // =========================================================================

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn registry(&self) -> &QuorumRegistry {
        &self.registry
    }

    pub fn owners(&self) -> &[Address] {
        self.registry.owners()
    }

    pub fn threshold(&self) -> u32 {
        self.registry.threshold()
    }

    pub fn is_owner(&self, address: &Address) -> bool {
        self.registry.is_owner(address)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Value currently held by the wallet
    pub fn balance(&self, ledger: &dyn ValueLedger) -> u128 {
        ledger.balance_of(&self.address)
    }

    pub fn transaction(&self, id: u64) -> Option<&Transaction> {
        self.transactions.get(id as usize)
    }

    /// Current owners who approved `id`, in owner order
    pub fn confirmations(&self, id: u64) -> Vec<Address> {
        match self.confirmations.get(&id) {
            Some(approvals) => self
                .registry
                .owners()
                .iter()
                .filter(|owner| approvals.contains(*owner))
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn confirmation_count(&self, id: u64) -> usize {
        match self.confirmations.get(&id) {
            Some(approvals) => self
                .registry
                .owners()
                .iter()
                .filter(|owner| approvals.contains(*owner))
                .count(),
            None => 0,
        }
    }

    /// Whether `id` has reached the current threshold, executed or not
    pub fn is_confirmed(&self, id: u64) -> bool {
        self.confirmation_count(id) >= self.registry.threshold() as usize
    }

    fn has_confirmed(&self, id: u64, owner: &Address) -> bool {
        self.confirmations
            .get(&id)
            .map_or(false, |approvals| approvals.contains(owner))
    }

    pub fn transaction_count(&self, filter: TxFilter) -> usize {
        self.transactions.iter().filter(|tx| filter.matches(tx)).count()
    }

    /// Ids of matching transactions in ascending order, paginated
    pub fn transaction_ids(&self, offset: usize, limit: usize, filter: TxFilter) -> Vec<u64> {
        self.transactions
            .iter()
            .filter(|tx| filter.matches(tx))
            .skip(offset)
            .take(limit)
            .map(|tx| tx.id)
            .collect()
    }

    // =========================================================================
    // Mutating operations
    // =========================================================================

    /// Accept plain value into the wallet
    pub fn deposit(
        &mut self,
        from: &Address,
        amount: u128,
        ledger: &mut dyn ValueLedger,
    ) -> Result<Receipt, MultisigError> {
        let mut receipt = Receipt::new();
        if amount == 0 {
            return Ok(receipt);
        }

        ledger.transfer(from, &self.address, amount)?;
        receipt.push(Event::Deposit {
            sender: from.clone(),
            value: amount,
        });

        log::debug!("Deposit of {} into {} from {}", amount, self.address, from);
        Ok(receipt)
    }

    /// Propose a transaction. The submitter's confirmation is recorded
    /// immediately, which may already satisfy the threshold.
    pub fn submit(
        &mut self,
        sender: &Address,
        target: Address,
        value: u128,
        payload: Bytes,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<Receipt, MultisigError> {
        if !self.is_owner(sender) {
            return Err(MultisigError::NotAnOwner(sender.clone()));
        }
        if target.is_null() {
            return Err(MultisigError::NullAddress);
        }

        let id = self.transactions.len() as u64;
        self.transactions.push(Transaction::new(
            id,
            target.clone(),
            value,
            payload,
            sender.clone(),
        ));

        log::info!(
            "Transaction {} submitted by {} (target {}, value {})",
            id,
            sender,
            target,
            value
        );

        let mut receipt = Receipt::new();
        receipt.push(Event::Submission { transaction_id: id });
        self.record_confirmation(id, sender, ctx, &mut receipt);

        Ok(receipt)
    }

    /// Approve a transaction, executing it if the threshold is reached
    pub fn confirm(
        &mut self,
        id: u64,
        sender: &Address,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<Receipt, MultisigError> {
        if !self.is_owner(sender) {
            return Err(MultisigError::NotAnOwner(sender.clone()));
        }
        let tx = self
            .transaction(id)
            .ok_or(MultisigError::UnknownTransaction(id))?;
        if self.has_confirmed(id, sender) {
            return Err(MultisigError::AlreadyConfirmed {
                id,
                owner: sender.clone(),
            });
        }
        if tx.executed {
            return Err(MultisigError::AlreadyExecuted(id));
        }

        let mut receipt = Receipt::new();
        self.record_confirmation(id, sender, ctx, &mut receipt);
        Ok(receipt)
    }

    /// Withdraw an approval before execution
    pub fn revoke(&mut self, id: u64, sender: &Address) -> Result<Receipt, MultisigError> {
        if !self.is_owner(sender) {
            return Err(MultisigError::NotAnOwner(sender.clone()));
        }
        let tx = self
            .transaction(id)
            .ok_or(MultisigError::UnknownTransaction(id))?;
        if !self.has_confirmed(id, sender) {
            return Err(MultisigError::NotConfirmed {
                id,
                owner: sender.clone(),
            });
        }
        if tx.executed {
            return Err(MultisigError::AlreadyExecuted(id));
        }

        if let Some(approvals) = self.confirmations.get_mut(&id) {
            approvals.remove(sender);
        }

        log::debug!("Transaction {} revoked by {}", id, sender);

        Ok(Receipt::from(vec![Event::Revocation {
            sender: sender.clone(),
            transaction_id: id,
        }]))
    }

    /// Execute a transaction that holds quorum but has not executed, e.g.
    /// after the threshold was lowered. Only an owner who confirmed it may
    /// trigger this.
    pub fn execute(
        &mut self,
        id: u64,
        sender: &Address,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<Receipt, MultisigError> {
        if !self.is_owner(sender) {
            return Err(MultisigError::NotAnOwner(sender.clone()));
        }
        let tx = self
            .transaction(id)
            .ok_or(MultisigError::UnknownTransaction(id))?;
        if tx.executed {
            return Err(MultisigError::AlreadyExecuted(id));
        }
        if !self.has_confirmed(id, sender) {
            return Err(MultisigError::NotConfirmed {
                id,
                owner: sender.clone(),
            });
        }
        if !self.is_confirmed(id) {
            return Err(MultisigError::InsufficientQuorum {
                id,
                have: self.confirmation_count(id),
                need: self.threshold(),
            });
        }

        let mut receipt = Receipt::new();
        self.run(id, ctx, &mut receipt);
        Ok(receipt)
    }

    // =========================================================================
    // Execution
    // =========================================================================

    fn record_confirmation(
        &mut self,
        id: u64,
        sender: &Address,
        ctx: &mut ExecutionContext<'_>,
        receipt: &mut Receipt,
    ) {
        self.confirmations
            .entry(id)
            .or_default()
            .insert(sender.clone());
        receipt.push(Event::Confirmation {
            sender: sender.clone(),
            transaction_id: id,
        });

        log::debug!(
            "Transaction {} confirmed by {} ({}/{})",
            id,
            sender,
            self.confirmation_count(id),
            self.threshold()
        );

        if self.is_confirmed(id) {
            self.run(id, ctx, receipt);
        }
    }

    /// Consume the transaction, then attempt its effect
    fn run(&mut self, id: u64, ctx: &mut ExecutionContext<'_>, receipt: &mut Receipt) {
        let (target, value, payload) = match self.transactions.get_mut(id as usize) {
            Some(tx) => {
                if !tx.mark_executed() {
                    return;
                }
                (tx.target.clone(), tx.value, tx.payload.clone())
            }
            None => return,
        };

        let result = self.apply(&target, value, &payload, ctx);

        let outcome = match result {
            Ok(effects) => {
                receipt.extend(effects);
                receipt.push(Event::Execution { transaction_id: id });
                log::info!("Transaction {} executed", id);
                ExecutionOutcome::Succeeded
            }
            Err(err) => {
                receipt.push(Event::ExecutionFailure { transaction_id: id });
                log::warn!("Transaction {} failed: {}", id, err);
                ExecutionOutcome::Failed(err.to_string())
            }
        };

        if let Some(tx) = self.transactions.get_mut(id as usize) {
            tx.record_outcome(outcome);
        }
    }

    /// Apply a transaction's effect. Each path performs at most one atomic
    /// mutation, so an error means nothing changed.
    fn apply(
        &mut self,
        target: &Address,
        value: u128,
        payload: &[u8],
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<Vec<Event>, CallError> {
        let call = Call::decode(payload)?;

        let have = ctx.ledger.balance_of(&self.address);
        if have < value {
            return Err(CallError::InsufficientBalance { have, need: value });
        }

        if *target == self.address {
            return self.apply_to_self(&call);
        }

        if ctx.has_target(target) {
            return ctx.call(&self.address, target, &call, value);
        }

        match call {
            Call::ValueTransfer => {
                ctx.ledger.transfer(&self.address, target, value)?;
                Ok(Vec::new())
            }
            _ => Err(CallError::UnknownTarget(target.clone())),
        }
    }

    /// Governance calls addressed to the wallet itself. Value sent to self
    /// stays where it is.
    fn apply_to_self(&mut self, call: &Call) -> Result<Vec<Event>, CallError> {
        let events = match call {
            Call::ValueTransfer => Vec::new(),
            Call::AddOwner(owner) => vec![self.registry.add_owner(owner.clone())?],
            Call::RemoveOwner(owner) => vec![self.registry.remove_owner(owner)?],
            Call::ReplaceOwner { old, new } => self.registry.replace_owner(old, new.clone())?,
            Call::ChangeThreshold(required) => vec![self.registry.change_threshold(*required)?],
            Call::Finalize => {
                return Err(CallError::Unsupported {
                    target: self.address.clone(),
                    call: call.to_string(),
                })
            }
        };

        for event in &events {
            log::info!("Wallet {} governance: {:?}", self.address, event);
        }

        Ok(events)
    }
}
