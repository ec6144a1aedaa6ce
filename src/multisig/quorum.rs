//! Owner set and approval threshold
//!
//! Every edit is validated against a staged copy and only committed when the
//! resulting configuration is valid, so a rejected edit leaves the registry
//! untouched.

use crate::core::{Address, Event};
use crate::multisig::wallet::MultisigError;
use serde::{Deserialize, Serialize};

/// Maximum number of owners a wallet may have
pub const MAX_OWNER_COUNT: usize = 50;

/// Ordered set of distinct owners plus the number of approvals required
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuorumRegistry {
    owners: Vec<Address>,
    threshold: u32,
}

impl QuorumRegistry {
    /// Create a registry
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if the threshold is outside
    /// `[1, owners.len()]`, an owner is duplicated or null, or there are more
    /// than `MAX_OWNER_COUNT` owners.
    pub fn new(owners: Vec<Address>, threshold: u32) -> Result<Self, MultisigError> {
        Self::validate(&owners, threshold)?;
        Ok(Self { owners, threshold })
    }

    fn validate(owners: &[Address], threshold: u32) -> Result<(), MultisigError> {
        if owners.is_empty() {
            return Err(invalid("owner set must not be empty"));
        }

        if owners.len() > MAX_OWNER_COUNT {
            return Err(invalid(format!(
                "owner count {} exceeds maximum {}",
                owners.len(),
                MAX_OWNER_COUNT
            )));
        }

        if threshold == 0 {
            return Err(invalid("threshold must be at least 1"));
        }

        if threshold as usize > owners.len() {
            return Err(invalid(format!(
                "threshold {} exceeds owner count {}",
                threshold,
                owners.len()
            )));
        }

        if owners.iter().any(Address::is_null) {
            return Err(invalid("owner address must not be null"));
        }

        let mut sorted: Vec<&Address> = owners.iter().collect();
        sorted.sort();
        if sorted.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(invalid("duplicate owner"));
        }

        Ok(())
    }

    /// Validate a staged configuration and commit it
    fn commit(&mut self, owners: Vec<Address>, threshold: u32) -> Result<(), MultisigError> {
        Self::validate(&owners, threshold)?;
        self.owners = owners;
        self.threshold = threshold;
        Ok(())
    }

    pub fn owners(&self) -> &[Address] {
        &self.owners
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn owner_count(&self) -> usize {
        self.owners.len()
    }

    pub fn is_owner(&self, address: &Address) -> bool {
        self.owners.contains(address)
    }

    /// Get description like "2-of-3"
    pub fn description(&self) -> String {
        format!("{}-of-{}", self.threshold, self.owners.len())
    }

    pub fn add_owner(&mut self, owner: Address) -> Result<Event, MultisigError> {
        if self.is_owner(&owner) {
            return Err(invalid(format!("{} is already an owner", owner)));
        }

        let mut owners = self.owners.clone();
        owners.push(owner.clone());
        self.commit(owners, self.threshold)?;

        Ok(Event::OwnerAddition { owner })
    }

    /// Remove an owner. The remaining owner count must still cover the
    /// current threshold.
    pub fn remove_owner(&mut self, owner: &Address) -> Result<Event, MultisigError> {
        if !self.is_owner(owner) {
            return Err(invalid(format!("{} is not an owner", owner)));
        }

        let owners: Vec<Address> = self.owners.iter().filter(|o| *o != owner).cloned().collect();
        self.commit(owners, self.threshold)?;

        Ok(Event::OwnerRemoval {
            owner: owner.clone(),
        })
    }

    /// Swap `old` for `new` in place, keeping the owner's position
    pub fn replace_owner(&mut self, old: &Address, new: Address) -> Result<Vec<Event>, MultisigError> {
        if !self.is_owner(old) {
            return Err(invalid(format!("{} is not an owner", old)));
        }
        if self.is_owner(&new) {
            return Err(invalid(format!("{} is already an owner", new)));
        }

        let owners: Vec<Address> = self
            .owners
            .iter()
            .map(|o| if o == old { new.clone() } else { o.clone() })
            .collect();
        self.commit(owners, self.threshold)?;

        Ok(vec![
            Event::OwnerRemoval { owner: old.clone() },
            Event::OwnerAddition { owner: new },
        ])
    }

    pub fn change_threshold(&mut self, threshold: u32) -> Result<Event, MultisigError> {
        self.commit(self.owners.clone(), threshold)?;
        Ok(Event::RequirementChange {
            required: threshold,
        })
    }
}

fn invalid(reason: impl Into<String>) -> MultisigError {
    MultisigError::InvalidConfiguration(reason.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accounts(n: usize) -> Vec<Address> {
        (0..n).map(|i| Address::new(format!("acct{}", i))).collect()
    }

    #[test]
    fn test_registry_creation() {
        let registry = QuorumRegistry::new(accounts(3), 2).unwrap();

        assert_eq!(registry.threshold(), 2);
        assert_eq!(registry.owner_count(), 3);
        assert_eq!(registry.description(), "2-of-3");
        assert!(registry.is_owner(&"acct1".into()));
        assert!(!registry.is_owner(&"acct3".into()));
    }

    #[test]
    fn test_registry_validation() {
        // Zero threshold
        assert!(QuorumRegistry::new(accounts(3), 0).is_err());

        // Threshold > owners
        assert!(QuorumRegistry::new(accounts(3), 4).is_err());

        // Empty owner set
        assert!(QuorumRegistry::new(vec![], 1).is_err());

        // Duplicate owners
        assert!(QuorumRegistry::new(vec!["same".into(), "same".into()], 1).is_err());

        // Null owner
        assert!(QuorumRegistry::new(vec!["acct0".into(), Address::null()], 1).is_err());

        // Too many owners
        assert!(QuorumRegistry::new(accounts(MAX_OWNER_COUNT + 1), 1).is_err());

        // Single owner, single approval is fine
        assert!(QuorumRegistry::new(accounts(1), 1).is_ok());
    }

    #[test]
    fn test_add_and_remove_owner() {
        let mut registry = QuorumRegistry::new(accounts(4), 1).unwrap();

        let event = registry.add_owner("acct4".into()).unwrap();
        assert_eq!(event, Event::OwnerAddition { owner: "acct4".into() });
        assert_eq!(registry.owners(), accounts(5).as_slice());

        let event = registry.remove_owner(&"acct4".into()).unwrap();
        assert_eq!(event, Event::OwnerRemoval { owner: "acct4".into() });
        assert_eq!(registry.owners(), accounts(4).as_slice());
    }

    #[test]
    fn test_duplicate_add_leaves_state_unchanged() {
        let mut registry = QuorumRegistry::new(accounts(2), 1).unwrap();
        let before = registry.clone();

        let result = registry.add_owner("acct0".into());
        assert!(matches!(result, Err(MultisigError::InvalidConfiguration(_))));
        assert_eq!(registry, before);
    }

    #[test]
    fn test_remove_below_threshold_rejected() {
        let mut registry = QuorumRegistry::new(accounts(2), 2).unwrap();

        let result = registry.remove_owner(&"acct1".into());
        assert!(matches!(result, Err(MultisigError::InvalidConfiguration(_))));
        assert_eq!(registry.owner_count(), 2);
    }

    #[test]
    fn test_replace_owner_keeps_position() {
        let mut registry = QuorumRegistry::new(accounts(3), 2).unwrap();

        let events = registry.replace_owner(&"acct1".into(), "acct9".into()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(
            registry.owners(),
            &[Address::from("acct0"), "acct9".into(), "acct2".into()]
        );

        // New owner must not already be present
        assert!(registry.replace_owner(&"acct0".into(), "acct2".into()).is_err());
    }

    #[test]
    fn test_change_threshold_bounds() {
        let mut registry = QuorumRegistry::new(accounts(4), 2).unwrap();

        assert_eq!(
            registry.change_threshold(3).unwrap(),
            Event::RequirementChange { required: 3 }
        );
        assert!(registry.change_threshold(0).is_err());
        assert!(registry.change_threshold(5).is_err());
        assert_eq!(registry.threshold(), 3);
    }
}
