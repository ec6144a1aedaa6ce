//! Participant account identifiers

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// An account on the value ledger: an owner, a contributor, the custody
/// wallet or the campaign itself.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Create an address from any string-like identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The null address (empty identifier)
    pub fn null() -> Self {
        Self(String::new())
    }

    /// Whether this is the null address
    pub fn is_null(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw bytes of the identifier (used by the payload codec)
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Address {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl FromStr for Address {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s.trim()))
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_address() {
        assert!(Address::null().is_null());
        assert!(Address::new("  ").is_null());
        assert!(!Address::new("acct0").is_null());
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let addr: Address = " acct1 ".parse().unwrap();
        assert_eq!(addr, Address::from("acct1"));
        assert_eq!(addr.to_string(), "acct1");
    }
}
