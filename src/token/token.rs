//! Issued balance ledger
//!
//! ERC-20 style balances for the issued token. Only the funding campaign
//! mutates it. Every mutation is staged first; the staged balances are summed
//! and the mutation commits only if that sum equals the staged total issuance.

use crate::core::{Address, ErrorKind, Event};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Issued token errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: u128, need: u128 },
    #[error("Insufficient allowance: have {have}, need {need}")]
    InsufficientAllowance { have: u128, need: u128 },
    #[error("Invalid amount: amount must be greater than 0")]
    InvalidAmount,
    #[error("Invalid address: cannot transfer to self")]
    SelfTransfer,
    #[error("Invalid address: null holder")]
    NullAddress,
    #[error("Arithmetic overflow")]
    Overflow,
    #[error("Conservation violated: total issued {expected}, sum of balances {actual}")]
    ConservationViolation { expected: u128, actual: u128 },
}

impl TokenError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TokenError::InsufficientBalance { .. } | TokenError::InsufficientAllowance { .. } => {
                ErrorKind::StateConflict
            }
            TokenError::InvalidAmount | TokenError::SelfTransfer | TokenError::NullAddress => {
                ErrorKind::Input
            }
            TokenError::Overflow | TokenError::ConservationViolation { .. } => {
                ErrorKind::Conservation
            }
        }
    }
}

/// Per-holder issued balances plus the total issuance counter
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssuedBalanceLedger {
    /// Balances: address -> amount
    balances: BTreeMap<Address, u128>,
    /// Allowances: owner -> (spender -> amount)
    allowances: BTreeMap<Address, BTreeMap<Address, u128>>,
    total_issued: u128,
}

impl IssuedBalanceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // View functions
    // =========================================================================

    pub fn total_supply(&self) -> u128 {
        self.total_issued
    }

    pub fn balance_of(&self, address: &Address) -> u128 {
        *self.balances.get(address).unwrap_or(&0)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }

    /// All holders with balances
    pub fn holders(&self) -> Vec<(&Address, &u128)> {
        self.balances.iter().filter(|(_, &b)| b > 0).collect()
    }

    pub fn holder_count(&self) -> usize {
        self.balances.values().filter(|&&b| b > 0).count()
    }

    /// Recompute the sum of balances and compare with total issuance
    pub fn verify(&self) -> Result<(), TokenError> {
        let actual = self
            .balances
            .values()
            .try_fold(0u128, |acc, b| acc.checked_add(*b))
            .ok_or(TokenError::Overflow)?;
        if actual != self.total_issued {
            return Err(TokenError::ConservationViolation {
                expected: self.total_issued,
                actual,
            });
        }
        Ok(())
    }

    // =========================================================================
    // Mutations (campaign only)
    // =========================================================================

    /// Issue `amount` new units to `to`
    pub(crate) fn mint(&mut self, to: &Address, amount: u128) -> Result<Event, TokenError> {
        if to.is_null() {
            return Err(TokenError::NullAddress);
        }
        if amount == 0 {
            return Err(TokenError::InvalidAmount);
        }

        let balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        let total = self
            .total_issued
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;

        self.commit(vec![(to.clone(), balance)], total)?;

        Ok(Event::Issuance {
            to: to.clone(),
            value: amount,
        })
    }

    /// Destroy `amount` units held by `from`
    pub(crate) fn burn(&mut self, from: &Address, amount: u128) -> Result<(), TokenError> {
        let have = self.balance_of(from);
        if have < amount {
            return Err(TokenError::InsufficientBalance { have, need: amount });
        }
        let total = self
            .total_issued
            .checked_sub(amount)
            .ok_or(TokenError::ConservationViolation {
                expected: self.total_issued,
                actual: amount,
            })?;

        self.commit(vec![(from.clone(), have - amount)], total)
    }

    /// Destroy the whole balance of `from`, returning how much was removed
    pub(crate) fn burn_all(&mut self, from: &Address) -> Result<u128, TokenError> {
        let amount = self.balance_of(from);
        if amount > 0 {
            self.burn(from, amount)?;
        }
        Ok(amount)
    }

    pub(crate) fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<Event, TokenError> {
        if amount == 0 {
            return Err(TokenError::InvalidAmount);
        }
        if to.is_null() {
            return Err(TokenError::NullAddress);
        }
        if from == to {
            return Err(TokenError::SelfTransfer);
        }

        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err(TokenError::InsufficientBalance {
                have: from_balance,
                need: amount,
            });
        }
        let to_balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;

        self.commit(
            vec![
                (from.clone(), from_balance - amount),
                (to.clone(), to_balance),
            ],
            self.total_issued,
        )?;

        Ok(Event::Transfer {
            from: from.clone(),
            to: to.clone(),
            value: amount,
        })
    }

    /// Set an allowance (0 revokes it)
    pub(crate) fn approve(&mut self, owner: &Address, spender: &Address, amount: u128) -> Event {
        self.allowances
            .entry(owner.clone())
            .or_default()
            .insert(spender.clone(), amount);

        Event::Approval {
            owner: owner.clone(),
            spender: spender.clone(),
            value: amount,
        }
    }

    /// Transfer on behalf of `from` (requires prior approval)
    pub(crate) fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<Event, TokenError> {
        let current_allowance = self.allowance(from, spender);
        if current_allowance < amount {
            return Err(TokenError::InsufficientAllowance {
                have: current_allowance,
                need: amount,
            });
        }

        let event = self.transfer(from, to, amount)?;

        if let Some(allowance) = self
            .allowances
            .get_mut(from)
            .and_then(|spenders| spenders.get_mut(spender))
        {
            *allowance -= amount;
        }

        Ok(event)
    }

    /// Commit staged balances if they sum to `total`
    fn commit(&mut self, staged: Vec<(Address, u128)>, total: u128) -> Result<(), TokenError> {
        let mut actual: u128 = 0;
        for (holder, balance) in &self.balances {
            let balance = staged
                .iter()
                .find(|(staged_holder, _)| staged_holder == holder)
                .map_or(*balance, |(_, staged_balance)| *staged_balance);
            actual = actual.checked_add(balance).ok_or(TokenError::Overflow)?;
        }
        for (holder, balance) in &staged {
            if !self.balances.contains_key(holder) {
                actual = actual.checked_add(*balance).ok_or(TokenError::Overflow)?;
            }
        }

        if actual != total {
            log::error!(
                "Rejected issuance mutation: total {} but balances sum to {}",
                total,
                actual
            );
            return Err(TokenError::ConservationViolation {
                expected: total,
                actual,
            });
        }

        for (holder, balance) in staged {
            if balance == 0 {
                self.balances.remove(&holder);
            } else {
                self.balances.insert(holder, balance);
            }
        }
        self.total_issued = total;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(id: &str) -> Address {
        Address::from(id)
    }

    fn funded() -> IssuedBalanceLedger {
        let mut ledger = IssuedBalanceLedger::new();
        ledger.mint(&addr("creator"), 1_000_000).unwrap();
        ledger
    }

    #[test]
    fn test_mint_updates_total() {
        let mut ledger = funded();
        let event = ledger.mint(&addr("alice"), 5500).unwrap();

        assert_eq!(
            event,
            Event::Issuance {
                to: addr("alice"),
                value: 5500
            }
        );
        assert_eq!(ledger.total_supply(), 1_005_500);
        assert_eq!(ledger.balance_of(&addr("alice")), 5500);
        assert_eq!(ledger.holder_count(), 2);
        ledger.verify().unwrap();
    }

    #[test]
    fn test_mint_rejects_zero_and_overflow() {
        let mut ledger = funded();
        assert_eq!(ledger.mint(&addr("alice"), 0), Err(TokenError::InvalidAmount));
        assert_eq!(
            ledger.mint(&addr("alice"), u128::MAX),
            Err(TokenError::Overflow)
        );
        assert_eq!(ledger.total_supply(), 1_000_000);
    }

    #[test]
    fn test_burn_all() {
        let mut ledger = funded();
        ledger.mint(&addr("alice"), 2750).unwrap();

        assert_eq!(ledger.burn_all(&addr("alice")).unwrap(), 2750);
        assert_eq!(ledger.balance_of(&addr("alice")), 0);
        assert_eq!(ledger.total_supply(), 1_000_000);
        assert_eq!(ledger.holder_count(), 1);

        // Nothing left to burn
        assert_eq!(ledger.burn_all(&addr("alice")).unwrap(), 0);
        ledger.verify().unwrap();
    }

    #[test]
    fn test_transfer() {
        let mut ledger = funded();

        let event = ledger
            .transfer(&addr("creator"), &addr("recipient"), 1000)
            .unwrap();

        assert_eq!(
            event,
            Event::Transfer {
                from: addr("creator"),
                to: addr("recipient"),
                value: 1000
            }
        );
        assert_eq!(ledger.balance_of(&addr("creator")), 999_000);
        assert_eq!(ledger.balance_of(&addr("recipient")), 1000);
        assert_eq!(ledger.total_supply(), 1_000_000);
    }

    #[test]
    fn test_transfer_validation() {
        let mut ledger = funded();

        assert!(matches!(
            ledger.transfer(&addr("creator"), &addr("recipient"), 2_000_000),
            Err(TokenError::InsufficientBalance { .. })
        ));
        assert_eq!(
            ledger.transfer(&addr("creator"), &addr("recipient"), 0),
            Err(TokenError::InvalidAmount)
        );
        assert_eq!(
            ledger.transfer(&addr("creator"), &addr("creator"), 100),
            Err(TokenError::SelfTransfer)
        );
    }

    #[test]
    fn test_approve_and_transfer_from() {
        let mut ledger = funded();

        ledger.approve(&addr("creator"), &addr("spender"), 5000);
        assert_eq!(ledger.allowance(&addr("creator"), &addr("spender")), 5000);

        ledger
            .transfer_from(&addr("spender"), &addr("creator"), &addr("recipient"), 1000)
            .unwrap();
        assert_eq!(ledger.balance_of(&addr("recipient")), 1000);
        assert_eq!(ledger.allowance(&addr("creator"), &addr("spender")), 4000);

        let result =
            ledger.transfer_from(&addr("spender"), &addr("creator"), &addr("recipient"), 4001);
        assert!(matches!(
            result,
            Err(TokenError::InsufficientAllowance { have: 4000, .. })
        ));
    }

    #[test]
    fn test_conservation_violation_aborts_commit() {
        let mut ledger = funded();
        let before = ledger.clone();

        // Stage a balance change without the matching total
        let result = ledger.commit(vec![(addr("alice"), 10)], ledger.total_supply());
        assert_eq!(
            result,
            Err(TokenError::ConservationViolation {
                expected: 1_000_000,
                actual: 1_000_010
            })
        );
        assert_eq!(ledger, before);
        assert!(TokenError::Overflow.kind().is_fatal());
    }
}
