//! Custody-Sale: a quorum-gated custody wallet and time-windowed token sale
//!
//! This crate provides:
//! - A multi-signature custody wallet with self-governed owners and threshold
//! - Fire-once transaction execution with recorded outcomes
//! - A funding campaign issuing an ERC-20 style balance at a fixed rate
//! - Single-shot finalize (sweep to the wallet) or refund resolution
//! - An in-memory value ledger substrate
//! - JSON persistence with backups and a CLI
//!
//! # Example
//!
//! ```rust
//! use custody_sale::config::{CampaignConfig, SystemConfig};
//! use custody_sale::core::{Address, UNIT};
//! use custody_sale::system::CustodySystem;
//!
//! let config = SystemConfig {
//!     owners: vec![Address::from("acct0"), Address::from("acct1")],
//!     required: 2,
//!     beneficiary: Address::from("acct0"),
//!     campaign: CampaignConfig::with_window(1, 11),
//! };
//! let (mut system, _premint) = CustodySystem::new(config).unwrap();
//!
//! // Contribute during the window
//! let investor = Address::from("acct5");
//! system.fund(&investor, 2 * UNIT).unwrap();
//! system.advance_to(1).unwrap();
//! system.contribute(&investor, UNIT).unwrap();
//!
//! // After the window, two owners finalize through the wallet
//! system.advance_to(11).unwrap();
//! let id = system
//!     .submit_finalize(&Address::from("acct0"))
//!     .unwrap()
//!     .submitted_id()
//!     .unwrap();
//! let receipt = system.confirm(id, &Address::from("acct1")).unwrap();
//! assert!(receipt.executed());
//!
//! let wallet = system.wallet().address().clone();
//! assert_eq!(system.balance_of(&wallet), UNIT);
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod crypto;
pub mod multisig;
pub mod storage;
pub mod system;
pub mod token;

// Re-export commonly used types
pub use config::{CampaignConfig, SystemConfig};
pub use core::{Address, ErrorKind, Event, InMemoryLedger, Receipt, ValueLedger, UNIT};
pub use multisig::{Call, CallTarget, CustodyWallet, ExecutionContext, TxFilter};
pub use storage::{Storage, StorageConfig};
pub use system::{CustodySystem, SystemError};
pub use token::{FundingCampaign, IssuedBalanceLedger, Resolution};
