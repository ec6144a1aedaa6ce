//! Value ledger substrate
//!
//! The conserved unit of value lives on an external ledger that provides
//! atomic transfers and a monotonically increasing ordering position. The
//! core only depends on the [`ValueLedger`] trait; [`InMemoryLedger`] is the
//! single-process implementation used by the CLI and the tests.

use crate::core::{Address, ErrorKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Ledger errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient value in {account}: have {have}, need {need}")]
    InsufficientFunds {
        account: Address,
        have: u128,
        need: u128,
    },
    #[error("Transfer to null address")]
    NullRecipient,
    #[error("Balance overflow for {0}")]
    Overflow(Address),
    #[error("Ordering position cannot move backwards: at {current}, requested {requested}")]
    PositionRegression { current: u64, requested: u64 },
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InsufficientFunds { .. } | LedgerError::Overflow(_) => ErrorKind::Ledger,
            LedgerError::NullRecipient => ErrorKind::Input,
            LedgerError::PositionRegression { .. } => ErrorKind::StateConflict,
        }
    }
}

/// Atomic value transfer with a readable ordering counter
pub trait ValueLedger {
    /// Current ordering position (block height analog)
    fn position(&self) -> u64;

    /// Value held by an account
    fn balance_of(&self, account: &Address) -> u128;

    /// Move `amount` from `from` to `to`. Either the whole transfer applies
    /// or nothing does.
    fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), LedgerError>;
}

/// In-process value ledger
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InMemoryLedger {
    balances: BTreeMap<Address, u128>,
    position: u64,
}

impl InMemoryLedger {
    /// Create an empty ledger at position 0
    pub fn new() -> Self {
        Self {
            balances: BTreeMap::new(),
            position: 0,
        }
    }

    /// Create an empty ledger at a given position
    pub fn at_position(position: u64) -> Self {
        Self {
            balances: BTreeMap::new(),
            position,
        }
    }

    /// Credit value to an account out of thin air (genesis allocation)
    pub fn credit(&mut self, account: &Address, amount: u128) -> Result<(), LedgerError> {
        if account.is_null() {
            return Err(LedgerError::NullRecipient);
        }
        let balance = self.balances.entry(account.clone()).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow(account.clone()))?;
        Ok(())
    }

    /// Advance the ordering position by one
    pub fn advance(&mut self) -> u64 {
        self.position += 1;
        self.position
    }

    /// Advance the ordering position to `target`
    pub fn advance_to(&mut self, target: u64) -> Result<u64, LedgerError> {
        if target < self.position {
            return Err(LedgerError::PositionRegression {
                current: self.position,
                requested: target,
            });
        }
        self.position = target;
        Ok(self.position)
    }

    /// Sum of all balances
    pub fn total_value(&self) -> u128 {
        self.balances.values().sum()
    }

    /// Accounts with a non-zero balance, in address order
    pub fn accounts(&self) -> Vec<(&Address, &u128)> {
        self.balances.iter().filter(|(_, &b)| b > 0).collect()
    }
}

impl ValueLedger for InMemoryLedger {
    fn position(&self) -> u64 {
        self.position
    }

    fn balance_of(&self, account: &Address) -> u128 {
        *self.balances.get(account).unwrap_or(&0)
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), LedgerError> {
        if to.is_null() {
            return Err(LedgerError::NullRecipient);
        }

        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err(LedgerError::InsufficientFunds {
                account: from.clone(),
                have: from_balance,
                need: amount,
            });
        }

        if from == to || amount == 0 {
            return Ok(());
        }

        let to_balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow(to.clone()))?;

        self.balances.insert(from.clone(), from_balance - amount);
        self.balances.insert(to.clone(), to_balance);

        Ok(())
    }
}
