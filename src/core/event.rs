//! Observable events
//!
//! Every state transition emits exactly one event. Operations return the
//! events they produced, in order, as a [`Receipt`].

use crate::core::Address;
use serde::Serialize;

/// An event emitted by the custody wallet or the funding campaign
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event")]
pub enum Event {
    /// A transaction was proposed
    Submission { transaction_id: u64 },
    /// An owner approved a transaction
    Confirmation { sender: Address, transaction_id: u64 },
    /// An owner withdrew an approval
    Revocation { sender: Address, transaction_id: u64 },
    /// A transaction's effect was applied
    Execution { transaction_id: u64 },
    /// A transaction was consumed but its effect failed
    ExecutionFailure { transaction_id: u64 },
    OwnerAddition { owner: Address },
    OwnerRemoval { owner: Address },
    RequirementChange { required: u32 },
    /// Value arrived at the custody wallet
    Deposit { sender: Address, value: u128 },
    /// Issued balance created (premint or contribution)
    Issuance { to: Address, value: u128 },
    /// Issued balance moved between holders
    Transfer { from: Address, to: Address, value: u128 },
    Approval { owner: Address, spender: Address, value: u128 },
    /// Contribution returned after a failed campaign
    LogRefund { to: Address, value: u128 },
}

impl Event {
    /// Short event name, matching the variant
    pub fn name(&self) -> &'static str {
        match self {
            Event::Submission { .. } => "Submission",
            Event::Confirmation { .. } => "Confirmation",
            Event::Revocation { .. } => "Revocation",
            Event::Execution { .. } => "Execution",
            Event::ExecutionFailure { .. } => "ExecutionFailure",
            Event::OwnerAddition { .. } => "OwnerAddition",
            Event::OwnerRemoval { .. } => "OwnerRemoval",
            Event::RequirementChange { .. } => "RequirementChange",
            Event::Deposit { .. } => "Deposit",
            Event::Issuance { .. } => "Issuance",
            Event::Transfer { .. } => "Transfer",
            Event::Approval { .. } => "Approval",
            Event::LogRefund { .. } => "LogRefund",
        }
    }
}

/// Ordered events produced by a single operation
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub events: Vec<Event>,
}

impl Receipt {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = Event>) {
        self.events.extend(events);
    }

    /// Event names in emission order
    pub fn names(&self) -> Vec<&'static str> {
        self.events.iter().map(Event::name).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Transaction id carried by the first `Submission` event, if any
    pub fn submitted_id(&self) -> Option<u64> {
        self.events.iter().find_map(|e| match e {
            Event::Submission { transaction_id } => Some(*transaction_id),
            _ => None,
        })
    }

    /// Whether the receipt reports a successful execution
    pub fn executed(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, Event::Execution { .. }))
    }
}

impl From<Vec<Event>> for Receipt {
    fn from(events: Vec<Event>) -> Self {
        Self { events }
    }
}
