//! Wired deployment: value ledger, custody wallet and funding campaign
//!
//! `CustodySystem` plays the role of the substrate that dispatches calls. It
//! owns the three components and builds an [`ExecutionContext`] for every
//! wallet operation, so the wallet can reach the campaign only through its
//! `CallTarget` entry point.

use crate::config::{ConfigError, SystemConfig};
use crate::core::{Address, ErrorKind, InMemoryLedger, LedgerError, Receipt, ValueLedger};
use crate::multisig::{Call, CustodyWallet, ExecutionContext, MultisigError, PayloadError};
use crate::token::{CampaignError, CampaignPhase, FundingCampaign, Resolution};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by system operations
#[derive(Error, Debug)]
pub enum SystemError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Wallet error: {0}")]
    Wallet(#[from] MultisigError),
    #[error("Campaign error: {0}")]
    Campaign(#[from] CampaignError),
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),
    #[error("Value not conserved: funded {expected}, ledger holds {actual}")]
    ValueNotConserved { expected: u128, actual: u128 },
}

impl SystemError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SystemError::Config(_) => ErrorKind::Configuration,
            SystemError::Wallet(e) => e.kind(),
            SystemError::Campaign(e) => e.kind(),
            SystemError::Ledger(e) => e.kind(),
            SystemError::Payload(e) => e.kind(),
            SystemError::ValueNotConserved { .. } => ErrorKind::Conservation,
        }
    }
}

/// Ledger, wallet and campaign of one deployment
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CustodySystem {
    ledger: InMemoryLedger,
    wallet: CustodyWallet,
    campaign: FundingCampaign,
    /// Value credited onto the ledger from outside
    total_funded: u128,
}

fn context<'a>(
    ledger: &'a mut InMemoryLedger,
    campaign: &'a mut FundingCampaign,
) -> ExecutionContext<'a> {
    ExecutionContext::new(ledger).with_target(campaign)
}

impl CustodySystem {
    /// Deploy the wallet, then the campaign controlled by it. The receipt
    /// carries the premint issuance.
    pub fn new(config: SystemConfig) -> Result<(Self, Receipt), SystemError> {
        config.validate()?;

        let wallet = CustodyWallet::new(config.owners, config.required)?;
        let (campaign, receipt) = FundingCampaign::deploy(
            wallet.address().clone(),
            config.beneficiary,
            config.campaign,
        )?;

        log::info!(
            "Deployed wallet {} controlling campaign {}",
            wallet.address(),
            campaign.address()
        );

        Ok((
            Self {
                ledger: InMemoryLedger::new(),
                wallet,
                campaign,
                total_funded: 0,
            },
            receipt,
        ))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn ledger(&self) -> &InMemoryLedger {
        &self.ledger
    }

    pub fn wallet(&self) -> &CustodyWallet {
        &self.wallet
    }

    pub fn campaign(&self) -> &FundingCampaign {
        &self.campaign
    }

    pub fn position(&self) -> u64 {
        self.ledger.position()
    }

    pub fn phase(&self) -> CampaignPhase {
        self.campaign.phase(self.ledger.position())
    }

    pub fn balance_of(&self, account: &Address) -> u128 {
        self.ledger.balance_of(account)
    }

    pub fn total_funded(&self) -> u128 {
        self.total_funded
    }

    /// Check both conservation properties: issued balances sum to total
    /// issuance, and the ledger holds exactly the value funded into it.
    pub fn verify(&self) -> Result<(), SystemError> {
        self.campaign
            .issued()
            .verify()
            .map_err(CampaignError::from)?;

        let actual = self.ledger.total_value();
        if actual != self.total_funded {
            return Err(SystemError::ValueNotConserved {
                expected: self.total_funded,
                actual,
            });
        }
        Ok(())
    }

    // =========================================================================
    // Substrate
    // =========================================================================

    /// Credit value to an external account
    pub fn fund(&mut self, account: &Address, amount: u128) -> Result<(), SystemError> {
        let total = self
            .total_funded
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow(account.clone()))?;
        self.ledger.credit(account, amount)?;
        self.total_funded = total;
        Ok(())
    }

    pub fn advance(&mut self) -> u64 {
        self.ledger.advance()
    }

    pub fn advance_to(&mut self, position: u64) -> Result<u64, SystemError> {
        Ok(self.ledger.advance_to(position)?)
    }

    // =========================================================================
    // Wallet
    // =========================================================================

    pub fn deposit(&mut self, from: &Address, amount: u128) -> Result<Receipt, SystemError> {
        Ok(self.wallet.deposit(from, amount, &mut self.ledger)?)
    }

    /// Propose `call` against `target` carrying `value`
    pub fn submit(
        &mut self,
        sender: &Address,
        target: Address,
        value: u128,
        call: &Call,
    ) -> Result<Receipt, SystemError> {
        let payload = call.encode()?;
        let mut ctx = context(&mut self.ledger, &mut self.campaign);
        Ok(self.wallet.submit(sender, target, value, payload, &mut ctx)?)
    }

    /// Propose a governance call against the wallet itself
    pub fn submit_governance(&mut self, sender: &Address, call: &Call) -> Result<Receipt, SystemError> {
        let target = self.wallet.address().clone();
        self.submit(sender, target, 0, call)
    }

    /// Propose resolving the campaign
    pub fn submit_finalize(&mut self, sender: &Address) -> Result<Receipt, SystemError> {
        let target = self.campaign.address().clone();
        self.submit(sender, target, 0, &Call::Finalize)
    }

    pub fn confirm(&mut self, id: u64, sender: &Address) -> Result<Receipt, SystemError> {
        let mut ctx = context(&mut self.ledger, &mut self.campaign);
        Ok(self.wallet.confirm(id, sender, &mut ctx)?)
    }

    pub fn revoke(&mut self, id: u64, sender: &Address) -> Result<Receipt, SystemError> {
        Ok(self.wallet.revoke(id, sender)?)
    }

    pub fn execute(&mut self, id: u64, sender: &Address) -> Result<Receipt, SystemError> {
        let mut ctx = context(&mut self.ledger, &mut self.campaign);
        Ok(self.wallet.execute(id, sender, &mut ctx)?)
    }

    // =========================================================================
    // Campaign
    // =========================================================================

    pub fn contribute(&mut self, from: &Address, amount: u128) -> Result<Receipt, SystemError> {
        Ok(self.campaign.contribute(from, amount, &mut self.ledger)?)
    }

    pub fn refund(&mut self, from: &Address) -> Result<Receipt, SystemError> {
        Ok(self.campaign.refund(from, &mut self.ledger)?)
    }

    /// Call finalize directly as `caller`. Only succeeds for the wallet's
    /// address, which external callers do not control.
    pub fn finalize(&mut self, caller: &Address) -> Result<(Resolution, Receipt), SystemError> {
        Ok(self.campaign.finalize(caller, &mut self.ledger)?)
    }

    pub fn transfer_issued(
        &mut self,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<Receipt, SystemError> {
        Ok(self.campaign.transfer(from, to, amount)?)
    }
}
