//! Time-windowed funding campaign
//!
//! Contributors send value while the window is open and receive issued
//! balance at a fixed exchange rate. After the window closes, the custody
//! wallet (the campaign's controller) resolves it exactly once:
//!
//! - raised >= goal: Finalized{Success}, all held value is swept to the
//!   controller in one transfer and refunds are disallowed for good
//! - raised <  goal: Finalized{Failure}, held value stays and contributors
//!   may reclaim their contribution
//!
//! Internal state always flips before any value leaves the campaign, so a
//! reentrant finalize or refund observes the new state.

use crate::config::{CampaignConfig, ConfigError};
use crate::core::{Address, ErrorKind, Event, LedgerError, Receipt, ValueLedger};
use crate::crypto::campaign_address;
use crate::multisig::{Call, CallError, CallTarget};
use crate::token::token::{IssuedBalanceLedger, TokenError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Funding campaign errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CampaignError {
    #[error("Campaign not open at position {position}: window is [{start}, {end})")]
    CampaignNotOpen { position: u64, start: u64, end: u64 },
    #[error("Campaign not closed at position {position}: window ends at {end}")]
    CampaignNotClosed { position: u64, end: u64 },
    #[error("Unauthorized caller: {0}")]
    Unauthorized(Address),
    #[error("Campaign already finalized")]
    AlreadyFinalized,
    #[error("Refund not allowed: {0}")]
    RefundNotAllowed(String),
    #[error("Invalid amount: contribution must be greater than 0")]
    InvalidAmount,
    #[error("Funding cap exceeded: cap {cap}, would raise {attempted}")]
    FundingCapExceeded { cap: u128, attempted: u128 },
    #[error("Issued balances are locked until the campaign succeeds")]
    TransfersLocked,
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Token error: {0}")]
    Token(#[from] TokenError),
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl CampaignError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CampaignError::CampaignNotOpen { .. }
            | CampaignError::CampaignNotClosed { .. }
            | CampaignError::RefundNotAllowed(_)
            | CampaignError::FundingCapExceeded { .. } => ErrorKind::Window,
            CampaignError::Unauthorized(_) => ErrorKind::Authorization,
            CampaignError::AlreadyFinalized | CampaignError::TransfersLocked => {
                ErrorKind::StateConflict
            }
            CampaignError::InvalidAmount => ErrorKind::Input,
            CampaignError::InvalidConfiguration(_) => ErrorKind::Configuration,
            CampaignError::Token(e) => e.kind(),
            CampaignError::Ledger(e) => e.kind(),
        }
    }
}

impl From<ConfigError> for CampaignError {
    fn from(err: ConfigError) -> Self {
        CampaignError::InvalidConfiguration(err.to_string())
    }
}

/// How a finalized campaign resolved
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    Success,
    Failure,
}

/// Lifecycle phase at a given ordering position
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CampaignPhase {
    /// Before the window opens
    Pending,
    /// Accepting contributions
    Open,
    /// Window over, awaiting resolution
    Closed,
    Finalized(Resolution),
}

impl fmt::Display for CampaignPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CampaignPhase::Pending => write!(f, "pending"),
            CampaignPhase::Open => write!(f, "open"),
            CampaignPhase::Closed => write!(f, "closed"),
            CampaignPhase::Finalized(Resolution::Success) => write!(f, "finalized (success)"),
            CampaignPhase::Finalized(Resolution::Failure) => write!(f, "finalized (failure)"),
        }
    }
}

/// A token sale bounded by an ordering window
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FundingCampaign {
    address: Address,
    /// The only account allowed to finalize (the custody wallet)
    controller: Address,
    /// Receives the premint
    beneficiary: Address,
    config: CampaignConfig,
    resolution: Option<Resolution>,
    /// Value contributed per account during the window
    contributions: BTreeMap<Address, u128>,
    /// Value raised during the window
    total_raised: u128,
    issued: IssuedBalanceLedger,
    created_at: DateTime<Utc>,
}

impl FundingCampaign {
    /// Deploy a campaign, issuing the premint to the beneficiary
    pub fn deploy(
        controller: Address,
        beneficiary: Address,
        config: CampaignConfig,
    ) -> Result<(Self, Receipt), CampaignError> {
        config.validate()?;
        if controller.is_null() || beneficiary.is_null() {
            return Err(CampaignError::InvalidConfiguration(
                "controller and beneficiary must be set".to_string(),
            ));
        }

        let address = campaign_address(
            &controller,
            &beneficiary,
            config.start_position,
            config.end_position,
        );

        let mut campaign = Self {
            address,
            controller,
            beneficiary,
            config,
            resolution: None,
            contributions: BTreeMap::new(),
            total_raised: 0,
            issued: IssuedBalanceLedger::new(),
            created_at: Utc::now(),
        };

        let mut receipt = Receipt::new();
        if campaign.config.premint > 0 {
            let beneficiary = campaign.beneficiary.clone();
            receipt.push(campaign.issued.mint(&beneficiary, campaign.config.premint)?);
        }

        log::info!(
            "Campaign {} deployed: window [{}, {}), rate {}, goal {}",
            campaign.address,
            campaign.config.start_position,
            campaign.config.end_position,
            campaign.config.exchange_rate,
            campaign.config.min_funding_goal
        );

        Ok((campaign, receipt))
    }

    // =========================================================================
    // Read operations
    // =========================================================================

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn controller(&self) -> &Address {
        &self.controller
    }

    pub fn beneficiary(&self) -> &Address {
        &self.beneficiary
    }

    pub fn config(&self) -> &CampaignConfig {
        &self.config
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }

    pub fn is_finalized(&self) -> bool {
        self.resolution.is_some()
    }

    pub fn phase(&self, position: u64) -> CampaignPhase {
        if let Some(resolution) = self.resolution {
            return CampaignPhase::Finalized(resolution);
        }
        if position < self.config.start_position {
            CampaignPhase::Pending
        } else if position < self.config.end_position {
            CampaignPhase::Open
        } else {
            CampaignPhase::Closed
        }
    }

    pub fn total_supply(&self) -> u128 {
        self.issued.total_supply()
    }

    pub fn balance_of(&self, account: &Address) -> u128 {
        self.issued.balance_of(account)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.issued.allowance(owner, spender)
    }

    pub fn holders(&self) -> Vec<(&Address, &u128)> {
        self.issued.holders()
    }

    pub fn holder_count(&self) -> usize {
        self.issued.holder_count()
    }

    pub fn contribution_of(&self, account: &Address) -> u128 {
        *self.contributions.get(account).unwrap_or(&0)
    }

    pub fn total_raised(&self) -> u128 {
        self.total_raised
    }

    /// Value currently held in the campaign's account
    pub fn held_value(&self, ledger: &dyn ValueLedger) -> u128 {
        ledger.balance_of(&self.address)
    }

    pub fn issued(&self) -> &IssuedBalanceLedger {
        &self.issued
    }

    // =========================================================================
    // Contribution window
    // =========================================================================

    /// Contribute `amount` of value from `from`, minting
    /// `amount * exchange_rate` issued units to it.
    pub fn contribute(
        &mut self,
        from: &Address,
        amount: u128,
        ledger: &mut dyn ValueLedger,
    ) -> Result<Receipt, CampaignError> {
        let position = ledger.position();
        if self.phase(position) != CampaignPhase::Open {
            return Err(CampaignError::CampaignNotOpen {
                position,
                start: self.config.start_position,
                end: self.config.end_position,
            });
        }
        if amount == 0 {
            return Err(CampaignError::InvalidAmount);
        }

        let raised = self
            .total_raised
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        if let Some(cap) = self.config.funding_cap {
            if raised > cap {
                return Err(CampaignError::FundingCapExceeded {
                    cap,
                    attempted: raised,
                });
            }
        }
        let contribution = self
            .contribution_of(from)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        let minted = amount
            .checked_mul(self.config.exchange_rate)
            .ok_or(TokenError::Overflow)?;

        let event = self.issued.mint(from, minted)?;

        if let Err(err) = ledger.transfer(from, &self.address, amount) {
            self.issued.burn(from, minted)?;
            return Err(err.into());
        }

        self.contributions.insert(from.clone(), contribution);
        self.total_raised = raised;

        log::debug!(
            "Contribution of {} from {} minted {} (raised {})",
            amount,
            from,
            minted,
            raised
        );

        Ok(Receipt::from(vec![event]))
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Resolve the campaign. Only the controller may call this, once, after
    /// the window has closed.
    pub fn finalize(
        &mut self,
        caller: &Address,
        ledger: &mut dyn ValueLedger,
    ) -> Result<(Resolution, Receipt), CampaignError> {
        if *caller != self.controller {
            return Err(CampaignError::Unauthorized(caller.clone()));
        }
        if self.resolution.is_some() {
            return Err(CampaignError::AlreadyFinalized);
        }
        let position = ledger.position();
        if position < self.config.end_position {
            return Err(CampaignError::CampaignNotClosed {
                position,
                end: self.config.end_position,
            });
        }

        let mut receipt = Receipt::new();

        if self.total_raised < self.config.min_funding_goal {
            self.resolution = Some(Resolution::Failure);
            log::info!(
                "Campaign {} failed: raised {} of {}",
                self.address,
                self.total_raised,
                self.config.min_funding_goal
            );
            return Ok((Resolution::Failure, receipt));
        }

        // Flip before the sweep leaves the campaign
        self.resolution = Some(Resolution::Success);

        let sweep = ledger.balance_of(&self.address);
        if sweep > 0 {
            if let Err(err) = ledger.transfer(&self.address, &self.controller, sweep) {
                self.resolution = None;
                return Err(err.into());
            }
            receipt.push(Event::Deposit {
                sender: self.address.clone(),
                value: sweep,
            });
        }

        log::info!(
            "Campaign {} succeeded: swept {} to {}",
            self.address,
            sweep,
            self.controller
        );

        Ok((Resolution::Success, receipt))
    }

    /// Return `from`'s contribution after a failed campaign. The account's
    /// issued balance is revoked in the same step.
    pub fn refund(
        &mut self,
        from: &Address,
        ledger: &mut dyn ValueLedger,
    ) -> Result<Receipt, CampaignError> {
        if self.resolution != Some(Resolution::Failure) {
            return Err(CampaignError::RefundNotAllowed(
                "campaign has not failed".to_string(),
            ));
        }
        let amount = self.contribution_of(from);
        if amount == 0 {
            return Err(CampaignError::RefundNotAllowed(format!(
                "nothing to refund for {}",
                from
            )));
        }

        // Zero the record and revoke the allocation before paying out
        self.contributions.remove(from);
        let revoked = match self.issued.burn_all(from) {
            Ok(revoked) => revoked,
            Err(err) => {
                self.contributions.insert(from.clone(), amount);
                return Err(err.into());
            }
        };

        if let Err(err) = ledger.transfer(&self.address, from, amount) {
            self.contributions.insert(from.clone(), amount);
            if revoked > 0 {
                self.issued.mint(from, revoked)?;
            }
            return Err(err.into());
        }

        log::info!(
            "Refunded {} to {} (revoked {} issued)",
            amount,
            from,
            revoked
        );

        Ok(Receipt::from(vec![Event::LogRefund {
            to: from.clone(),
            value: amount,
        }]))
    }

    // =========================================================================
    // Issued token transfers
    // =========================================================================

    fn ensure_unlocked(&self) -> Result<(), CampaignError> {
        if self.resolution != Some(Resolution::Success) {
            return Err(CampaignError::TransfersLocked);
        }
        Ok(())
    }

    pub fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<Receipt, CampaignError> {
        self.ensure_unlocked()?;
        let event = self.issued.transfer(from, to, amount)?;
        Ok(Receipt::from(vec![event]))
    }

    pub fn approve(&mut self, owner: &Address, spender: &Address, amount: u128) -> Receipt {
        Receipt::from(vec![self.issued.approve(owner, spender, amount)])
    }

    pub fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<Receipt, CampaignError> {
        self.ensure_unlocked()?;
        let event = self.issued.transfer_from(spender, from, to, amount)?;
        Ok(Receipt::from(vec![event]))
    }
}

impl CallTarget for FundingCampaign {
    fn address(&self) -> &Address {
        &self.address
    }

    fn invoke(
        &mut self,
        caller: &Address,
        call: &Call,
        value: u128,
        ledger: &mut dyn ValueLedger,
    ) -> Result<Vec<Event>, CallError> {
        let result = match call {
            Call::Finalize if value == 0 => self.finalize(caller, ledger).map(|(_, r)| r.events),
            Call::ValueTransfer => self.contribute(caller, value, ledger).map(|r| r.events),
            _ => {
                return Err(CallError::Unsupported {
                    target: self.address.clone(),
                    call: call.to_string(),
                })
            }
        };

        result.map_err(|err| CallError::Rejected {
            target: self.address.clone(),
            source: Box::new(err),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{InMemoryLedger, UNIT};

    const RATE: u128 = 5500;

    fn acct(id: &str) -> Address {
        Address::from(id)
    }

    /// Campaign over [1, 11) with the ledger at position 0
    fn setup() -> (FundingCampaign, InMemoryLedger) {
        let (campaign, _) = FundingCampaign::deploy(
            acct("wallet"),
            acct("owner"),
            CampaignConfig::with_window(1, 11),
        )
        .unwrap();

        let mut ledger = InMemoryLedger::new();
        ledger.credit(&acct("acct5"), 10 * UNIT).unwrap();
        ledger.credit(&acct("acct6"), 10 * UNIT).unwrap();
        (campaign, ledger)
    }

    #[test]
    fn test_deploy_issues_premint() {
        let (campaign, receipt) = FundingCampaign::deploy(
            acct("wallet"),
            acct("owner"),
            CampaignConfig::with_window(1, 11),
        )
        .unwrap();

        assert_eq!(receipt.names(), vec!["Issuance"]);
        assert_eq!(campaign.total_supply(), RATE * 5 * UNIT);
        assert_eq!(campaign.balance_of(&acct("owner")), RATE * 5 * UNIT);
        assert_eq!(campaign.balance_of(&acct("acct5")), 0);
        assert!(campaign.address().as_str().starts_with("0x"));
    }

    #[test]
    fn test_deploy_rejects_bad_window() {
        let result = FundingCampaign::deploy(
            acct("wallet"),
            acct("owner"),
            CampaignConfig::with_window(10, 10),
        );
        assert!(matches!(
            result,
            Err(CampaignError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_phases() {
        let (campaign, _) = setup();
        assert_eq!(campaign.phase(0), CampaignPhase::Pending);
        assert_eq!(campaign.phase(1), CampaignPhase::Open);
        assert_eq!(campaign.phase(10), CampaignPhase::Open);
        assert_eq!(campaign.phase(11), CampaignPhase::Closed);
    }

    #[test]
    fn test_contribution_before_window_rejected() {
        let (mut campaign, mut ledger) = setup();

        let result = campaign.contribute(&acct("acct5"), UNIT, &mut ledger);
        assert!(matches!(result, Err(CampaignError::CampaignNotOpen { .. })));
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Window);
        assert_eq!(ledger.balance_of(&acct("acct5")), 10 * UNIT);
    }

    #[test]
    fn test_contribution_mints_at_rate() {
        let (mut campaign, mut ledger) = setup();
        ledger.advance_to(1).unwrap();
        let supply = campaign.total_supply();

        let receipt = campaign.contribute(&acct("acct5"), UNIT, &mut ledger).unwrap();
        assert_eq!(
            receipt.events,
            vec![Event::Issuance {
                to: acct("acct5"),
                value: RATE * UNIT
            }]
        );
        assert_eq!(campaign.balance_of(&acct("acct5")), RATE * UNIT);
        assert_eq!(campaign.total_supply(), supply + RATE * UNIT);
        assert_eq!(campaign.held_value(&ledger), UNIT);

        // Cumulative
        campaign.contribute(&acct("acct5"), UNIT / 2, &mut ledger).unwrap();
        assert_eq!(campaign.contribution_of(&acct("acct5")), UNIT + UNIT / 2);
        assert_eq!(campaign.total_raised(), UNIT + UNIT / 2);
        campaign.issued().verify().unwrap();
    }

    #[test]
    fn test_contribution_without_funds_changes_nothing() {
        let (mut campaign, mut ledger) = setup();
        ledger.advance_to(1).unwrap();
        let supply = campaign.total_supply();

        let result = campaign.contribute(&acct("pauper"), UNIT, &mut ledger);
        assert!(matches!(result, Err(CampaignError::Ledger(_))));
        assert_eq!(campaign.total_supply(), supply);
        assert_eq!(campaign.balance_of(&acct("pauper")), 0);
        assert_eq!(campaign.total_raised(), 0);

        assert_eq!(
            campaign.contribute(&acct("acct5"), 0, &mut ledger),
            Err(CampaignError::InvalidAmount)
        );
    }

    #[test]
    fn test_funding_cap() {
        let mut config = CampaignConfig::with_window(0, 10);
        config.funding_cap = Some(2 * UNIT);
        let (mut campaign, _) = FundingCampaign::deploy(acct("wallet"), acct("owner"), config).unwrap();
        let mut ledger = InMemoryLedger::new();
        ledger.credit(&acct("acct5"), 10 * UNIT).unwrap();

        campaign.contribute(&acct("acct5"), 2 * UNIT, &mut ledger).unwrap();
        assert_eq!(
            campaign.contribute(&acct("acct5"), 1, &mut ledger),
            Err(CampaignError::FundingCapExceeded {
                cap: 2 * UNIT,
                attempted: 2 * UNIT + 1
            })
        );
    }

    #[test]
    fn test_finalize_authorization_and_window() {
        let (mut campaign, mut ledger) = setup();
        ledger.advance_to(1).unwrap();
        campaign.contribute(&acct("acct5"), UNIT, &mut ledger).unwrap();

        assert_eq!(
            campaign.finalize(&acct("acct5"), &mut ledger),
            Err(CampaignError::Unauthorized(acct("acct5")))
        );
        assert!(matches!(
            campaign.finalize(&acct("wallet"), &mut ledger),
            Err(CampaignError::CampaignNotClosed { .. })
        ));
        assert!(!campaign.is_finalized());
    }

    #[test]
    fn test_finalize_success_sweeps_once() {
        let (mut campaign, mut ledger) = setup();
        ledger.advance_to(1).unwrap();
        campaign.contribute(&acct("acct5"), UNIT, &mut ledger).unwrap();
        campaign.contribute(&acct("acct6"), 2 * UNIT, &mut ledger).unwrap();
        ledger.advance_to(12).unwrap();

        let (resolution, receipt) = campaign.finalize(&acct("wallet"), &mut ledger).unwrap();
        assert_eq!(resolution, Resolution::Success);
        assert_eq!(receipt.names(), vec!["Deposit"]);
        assert_eq!(ledger.balance_of(&acct("wallet")), 3 * UNIT);
        assert_eq!(campaign.held_value(&ledger), 0);
        assert_eq!(campaign.total_supply(), RATE * 8 * UNIT);

        assert_eq!(
            campaign.finalize(&acct("wallet"), &mut ledger),
            Err(CampaignError::AlreadyFinalized)
        );
        assert_eq!(ledger.balance_of(&acct("wallet")), 3 * UNIT);

        assert!(matches!(
            campaign.refund(&acct("acct5"), &mut ledger),
            Err(CampaignError::RefundNotAllowed(_))
        ));
    }

    #[test]
    fn test_finalize_failure_and_refund() {
        let (mut campaign, mut ledger) = setup();
        ledger.advance_to(1).unwrap();
        campaign.contribute(&acct("acct5"), UNIT / 2, &mut ledger).unwrap();

        // Refunds are not available before resolution
        assert!(matches!(
            campaign.refund(&acct("acct5"), &mut ledger),
            Err(CampaignError::RefundNotAllowed(_))
        ));

        ledger.advance_to(12).unwrap();
        let (resolution, receipt) = campaign.finalize(&acct("wallet"), &mut ledger).unwrap();
        assert_eq!(resolution, Resolution::Failure);
        assert!(receipt.is_empty());
        assert_eq!(campaign.held_value(&ledger), UNIT / 2);

        let before = ledger.balance_of(&acct("acct5"));
        let receipt = campaign.refund(&acct("acct5"), &mut ledger).unwrap();
        assert_eq!(
            receipt.events,
            vec![Event::LogRefund {
                to: acct("acct5"),
                value: UNIT / 2
            }]
        );
        assert_eq!(ledger.balance_of(&acct("acct5")), before + UNIT / 2);
        assert_eq!(campaign.balance_of(&acct("acct5")), 0);
        assert_eq!(campaign.total_supply(), RATE * 5 * UNIT);
        assert_eq!(campaign.held_value(&ledger), 0);

        // Second refund and non-contributor refund both fail
        assert!(matches!(
            campaign.refund(&acct("acct5"), &mut ledger),
            Err(CampaignError::RefundNotAllowed(_))
        ));
        assert!(matches!(
            campaign.refund(&acct("acct6"), &mut ledger),
            Err(CampaignError::RefundNotAllowed(_))
        ));
        campaign.issued().verify().unwrap();
    }

    #[test]
    fn test_transfers_locked_until_success() {
        let (mut campaign, mut ledger) = setup();
        ledger.advance_to(1).unwrap();
        campaign.contribute(&acct("acct5"), UNIT, &mut ledger).unwrap();

        assert_eq!(
            campaign.transfer(&acct("acct5"), &acct("acct7"), 1),
            Err(CampaignError::TransfersLocked)
        );

        ledger.advance_to(11).unwrap();
        campaign.finalize(&acct("wallet"), &mut ledger).unwrap();

        let receipt = campaign.transfer(&acct("acct5"), &acct("acct7"), 500).unwrap();
        assert_eq!(receipt.names(), vec!["Transfer"]);
        assert_eq!(campaign.balance_of(&acct("acct7")), 500);

        campaign.approve(&acct("acct5"), &acct("acct8"), 100);
        campaign
            .transfer_from(&acct("acct8"), &acct("acct5"), &acct("acct7"), 100)
            .unwrap();
        assert_eq!(campaign.balance_of(&acct("acct7")), 600);
        assert_eq!(campaign.allowance(&acct("acct5"), &acct("acct8")), 0);
    }

    /// Ledger whose outbound transfers from one account always fail
    struct FrozenOutbound {
        inner: InMemoryLedger,
        frozen: Address,
    }

    impl ValueLedger for FrozenOutbound {
        fn position(&self) -> u64 {
            self.inner.position()
        }

        fn balance_of(&self, account: &Address) -> u128 {
            self.inner.balance_of(account)
        }

        fn transfer(
            &mut self,
            from: &Address,
            to: &Address,
            amount: u128,
        ) -> Result<(), LedgerError> {
            if *from == self.frozen {
                return Err(LedgerError::NullRecipient);
            }
            self.inner.transfer(from, to, amount)
        }
    }

    #[test]
    fn test_failed_sweep_restores_state() {
        let (mut campaign, mut ledger) = setup();
        ledger.advance_to(1).unwrap();
        campaign.contribute(&acct("acct5"), UNIT, &mut ledger).unwrap();
        ledger.advance_to(11).unwrap();

        let mut frozen = FrozenOutbound {
            inner: ledger,
            frozen: campaign.address().clone(),
        };
        let result = campaign.finalize(&acct("wallet"), &mut frozen);
        assert!(matches!(result, Err(CampaignError::Ledger(_))));
        assert!(!campaign.is_finalized());
        assert_eq!(campaign.phase(11), CampaignPhase::Closed);

        // Resolution can still run once the ledger cooperates
        let mut ledger = frozen.inner;
        let (resolution, _) = campaign.finalize(&acct("wallet"), &mut ledger).unwrap();
        assert_eq!(resolution, Resolution::Success);
    }

    #[test]
    fn test_failed_refund_payout_restores_state() {
        let (mut campaign, mut ledger) = setup();
        ledger.advance_to(1).unwrap();
        campaign.contribute(&acct("acct5"), UNIT / 2, &mut ledger).unwrap();
        ledger.advance_to(11).unwrap();
        campaign.finalize(&acct("wallet"), &mut ledger).unwrap();

        let mut frozen = FrozenOutbound {
            inner: ledger,
            frozen: campaign.address().clone(),
        };
        assert!(campaign.refund(&acct("acct5"), &mut frozen).is_err());
        assert_eq!(campaign.contribution_of(&acct("acct5")), UNIT / 2);
        assert_eq!(campaign.balance_of(&acct("acct5")), RATE * UNIT / 2);
        campaign.issued().verify().unwrap();
    }

    #[test]
    fn test_invoke_dispatch() {
        let (mut campaign, mut ledger) = setup();
        ledger.advance_to(11).unwrap();

        let result = campaign.invoke(&acct("wallet"), &Call::AddOwner(acct("x")), 0, &mut ledger);
        assert!(matches!(result, Err(CallError::Unsupported { .. })));

        let result = campaign.invoke(&acct("acct5"), &Call::Finalize, 0, &mut ledger);
        assert!(matches!(result, Err(CallError::Rejected { .. })));

        let events = campaign
            .invoke(&acct("wallet"), &Call::Finalize, 0, &mut ledger)
            .unwrap();
        assert!(events.is_empty());
        assert_eq!(campaign.resolution(), Some(Resolution::Failure));
    }
}
