//! Core building blocks shared by every component
//!
//! This module contains:
//! - Account addresses
//! - Events and receipts
//! - The error taxonomy
//! - The value ledger substrate (trait + in-memory implementation)

pub mod address;
pub mod error;
pub mod event;
pub mod ledger;

pub use address::Address;
pub use error::ErrorKind;
pub use event::{Event, Receipt};
pub use ledger::{InMemoryLedger, LedgerError, ValueLedger};

/// Base units per whole unit of value (wei per ether analog)
pub const UNIT: u128 = 1_000_000_000_000_000_000;
