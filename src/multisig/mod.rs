//! Quorum-gated custody wallet
//!
//! Owners propose transactions; a transaction executes once the number of
//! distinct owner approvals reaches the wallet's threshold. The wallet also
//! governs itself: adding or removing owners and changing the threshold are
//! transactions addressed to the wallet.
//!
//! # Example
//!
//! ```ignore
//! use custody_sale::core::InMemoryLedger;
//! use custody_sale::multisig::{Call, CustodyWallet, ExecutionContext};
//!
//! let mut ledger = InMemoryLedger::new();
//! let mut wallet = CustodyWallet::new(owners, 2)?;
//! let this = wallet.address().clone();
//!
//! // Propose adding an owner; the proposer's approval is implied
//! let mut ctx = ExecutionContext::new(&mut ledger);
//! let payload = Call::AddOwner("acct4".into()).encode()?;
//! let receipt = wallet.submit(&owners[0], this, 0, payload, &mut ctx)?;
//!
//! // A second owner reaches quorum and the transaction executes
//! let id = receipt.submitted_id().unwrap();
//! wallet.confirm(id, &owners[1], &mut ctx)?;
//! ```

pub mod execution;
pub mod payload;
pub mod quorum;
pub mod transaction;
pub mod wallet;

pub use execution::{CallError, CallTarget, ExecutionContext};
pub use payload::{Call, PayloadError};
pub use quorum::{QuorumRegistry, MAX_OWNER_COUNT};
pub use transaction::{ExecutionOutcome, Transaction, TxFilter};
pub use wallet::{CustodyWallet, MultisigError};
