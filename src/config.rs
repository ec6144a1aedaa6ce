//! Construction parameters
//!
//! `SystemConfig` describes a complete deployment: the wallet's owners and
//! threshold, the beneficiary of the premint, and the campaign parameters.
//! It can be loaded from a JSON file; omitted fields take their defaults.

use crate::core::{Address, UNIT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Issued units per base unit of contributed value
pub const EXCHANGE_RATE: u128 = 5500;

/// Minimum raised value for a successful campaign
pub const MIN_FUNDING_GOAL: u128 = UNIT;

/// Issued to the beneficiary at construction
pub const PREMINT: u128 = 5 * EXCHANGE_RATE * UNIT;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Funding campaign parameters
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignConfig {
    pub exchange_rate: u128,
    pub min_funding_goal: u128,
    pub premint: u128,
    /// Upper bound on total raised value, if any
    pub funding_cap: Option<u128>,
    /// First position at which contributions are accepted
    pub start_position: u64,
    /// First position at which the window is closed
    pub end_position: u64,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            exchange_rate: EXCHANGE_RATE,
            min_funding_goal: MIN_FUNDING_GOAL,
            premint: PREMINT,
            funding_cap: None,
            start_position: 10,
            end_position: 50,
        }
    }
}

impl CampaignConfig {
    /// Default parameters over a given window
    pub fn with_window(start_position: u64, end_position: u64) -> Self {
        Self {
            start_position,
            end_position,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start_position >= self.end_position {
            return Err(ConfigError::Invalid(format!(
                "start position {} must be before end position {}",
                self.start_position, self.end_position
            )));
        }
        if self.exchange_rate == 0 {
            return Err(ConfigError::Invalid(
                "exchange rate must be greater than 0".to_string(),
            ));
        }
        if let Some(cap) = self.funding_cap {
            if cap < self.min_funding_goal {
                return Err(ConfigError::Invalid(format!(
                    "funding cap {} is below the funding goal {}",
                    cap, self.min_funding_goal
                )));
            }
        }
        Ok(())
    }
}

/// Complete deployment description
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub owners: Vec<Address>,
    pub required: u32,
    pub beneficiary: Address,
    pub campaign: CampaignConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            owners: vec!["acct0".into(), "acct1".into()],
            required: 2,
            beneficiary: "acct0".into(),
            campaign: CampaignConfig::default(),
        }
    }
}

impl SystemConfig {
    /// Load from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)?;
        let config: SystemConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.required == 0 || self.required as usize > self.owners.len() {
            return Err(ConfigError::Invalid(format!(
                "required approvals {} must be within [1, {}]",
                self.required,
                self.owners.len()
            )));
        }
        if self.beneficiary.is_null() {
            return Err(ConfigError::Invalid("beneficiary must be set".to_string()));
        }
        self.campaign.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_observed_constants() {
        let config = CampaignConfig::default();
        assert_eq!(config.exchange_rate, 5500);
        assert_eq!(config.min_funding_goal, UNIT);
        assert_eq!(config.premint, 5 * 5500 * UNIT);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_window_validation() {
        assert!(CampaignConfig::with_window(10, 10).validate().is_err());
        assert!(CampaignConfig::with_window(11, 10).validate().is_err());
        assert!(CampaignConfig::with_window(10, 11).validate().is_ok());

        let mut config = CampaignConfig::default();
        config.exchange_rate = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_system_config_validation() {
        let mut config = SystemConfig::default();
        assert!(config.validate().is_ok());

        config.required = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "owners": ["a", "b", "c"],
                "required": 2,
                "beneficiary": "a",
                "campaign": { "start_position": 1, "end_position": 11 }
            }"#,
        )
        .unwrap();

        let config = SystemConfig::from_file(&path).unwrap();
        assert_eq!(config.owners.len(), 3);
        assert_eq!(config.campaign.end_position, 11);
        assert_eq!(config.campaign.exchange_rate, EXCHANGE_RATE);
    }
}
