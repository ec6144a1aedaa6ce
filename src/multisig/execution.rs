//! Execution seam between the custody wallet and the components it calls
//!
//! The wallet never reaches into another component's state. When a
//! transaction executes against a foreign target, the wallet looks the target
//! up in the [`ExecutionContext`] and invokes it through [`CallTarget`], which
//! is the only capability it holds.

use crate::core::{Address, Event, LedgerError, ValueLedger};
use crate::multisig::payload::{Call, PayloadError};
use crate::multisig::wallet::MultisigError;
use thiserror::Error;

/// Why a transaction's effect could not be applied
#[derive(Error, Debug)]
pub enum CallError {
    #[error("Malformed payload: {0}")]
    Payload(#[from] PayloadError),
    #[error("Owner configuration rejected: {0}")]
    Governance(#[from] MultisigError),
    #[error("Value transfer failed: {0}")]
    Ledger(#[from] LedgerError),
    #[error("Wallet balance too low: have {have}, need {need}")]
    InsufficientBalance { have: u128, need: u128 },
    #[error("No callable component at {0}")]
    UnknownTarget(Address),
    #[error("{target} does not support {call}")]
    Unsupported { target: Address, call: String },
    #[error("{target} rejected the call: {source}")]
    Rejected {
        target: Address,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// A component that can be the target of an executed transaction
pub trait CallTarget {
    /// Address the component is reachable at
    fn address(&self) -> &Address;

    /// Apply `call` on behalf of `caller`. `value` is the amount the caller
    /// attaches; the component moves it out of `caller` itself as part of the
    /// same step, or rejects the call. On error the component must leave its
    /// own state and the ledger unchanged.
    fn invoke(
        &mut self,
        caller: &Address,
        call: &Call,
        value: u128,
        ledger: &mut dyn ValueLedger,
    ) -> Result<Vec<Event>, CallError>;
}

/// Host services available while a transaction executes
pub struct ExecutionContext<'a> {
    pub ledger: &'a mut dyn ValueLedger,
    targets: Vec<&'a mut dyn CallTarget>,
}

impl<'a> ExecutionContext<'a> {
    /// Context with no callable components; only value transfers and
    /// governance calls can succeed.
    pub fn new(ledger: &'a mut dyn ValueLedger) -> Self {
        Self {
            ledger,
            targets: Vec::new(),
        }
    }

    /// Register a component the wallet may call
    pub fn with_target(mut self, target: &'a mut dyn CallTarget) -> Self {
        self.targets.push(target);
        self
    }

    pub fn has_target(&self, address: &Address) -> bool {
        self.targets.iter().any(|t| t.address() == address)
    }

    /// Invoke the component registered at `target`
    pub(crate) fn call(
        &mut self,
        caller: &Address,
        target: &Address,
        call: &Call,
        value: u128,
    ) -> Result<Vec<Event>, CallError> {
        let component = self
            .targets
            .iter_mut()
            .find(|t| t.address() == target)
            .ok_or_else(|| CallError::UnknownTarget(target.clone()))?;

        component.invoke(caller, call, value, &mut *self.ledger)
    }
}
