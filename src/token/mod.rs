//! Issued token and the funding campaign that issues it
//!
//! The campaign owns an ERC-20 style balance ledger for the issued unit:
//! - Premint to the beneficiary at deployment
//! - Issuance at a fixed exchange rate while the window is open
//! - One-shot resolution by the controlling wallet after the window closes
//! - Refunds that revoke the issued balance after a failed campaign
//!
//! # Example
//!
//! ```ignore
//! use custody_sale::config::CampaignConfig;
//! use custody_sale::token::FundingCampaign;
//!
//! let (mut campaign, _premint) =
//!     FundingCampaign::deploy(controller, beneficiary, CampaignConfig::with_window(10, 50))?;
//!
//! ledger.advance_to(10)?;
//! campaign.contribute(&investor, UNIT, &mut ledger)?;
//! assert_eq!(campaign.balance_of(&investor), 5500 * UNIT);
//! ```

pub mod campaign;
pub mod token;

pub use campaign::{CampaignError, CampaignPhase, FundingCampaign, Resolution};
pub use token::{IssuedBalanceLedger, TokenError};
