//! Operation payload codec
//!
//! A payload is a 4-byte selector followed by positional arguments. The wallet
//! stores payloads as opaque bytes and decodes them once, when a transaction
//! executes.
//!
//! Argument encoding:
//! - `address`: u16 big-endian length followed by UTF-8 bytes
//! - `uint256`: u32 big-endian
//!
//! An empty payload is a plain value transfer.

use crate::core::{Address, ErrorKind};
use crate::crypto::{selector, SELECTOR_LEN};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const ADD_OWNER: &str = "addOwner(address)";
pub const REMOVE_OWNER: &str = "removeOwner(address)";
pub const REPLACE_OWNER: &str = "replaceOwner(address,address)";
pub const CHANGE_REQUIREMENT: &str = "changeRequirement(uint256)";
pub const FINALIZE: &str = "finalize()";

/// Payload decoding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Payload too short: expected {expected} more bytes, {remaining} left")]
    Truncated { expected: usize, remaining: usize },
    #[error("Unknown operation selector: 0x{0}")]
    UnknownSelector(String),
    #[error("Trailing bytes after arguments: {0}")]
    TrailingBytes(usize),
    #[error("Address argument is not valid UTF-8")]
    InvalidAddress,
    #[error("Address argument too long: {0} bytes")]
    AddressTooLong(usize),
    #[error("Cannot parse call: {0}")]
    Parse(String),
}

impl PayloadError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Input
    }
}

/// The finite set of operations a transaction can carry
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    /// No payload: the transaction only moves value
    ValueTransfer,
    AddOwner(Address),
    RemoveOwner(Address),
    ReplaceOwner { old: Address, new: Address },
    ChangeThreshold(u32),
    /// Resolve the funding campaign
    Finalize,
}

impl Call {
    /// Canonical function signature, `None` for a plain transfer
    pub fn signature(&self) -> Option<&'static str> {
        match self {
            Call::ValueTransfer => None,
            Call::AddOwner(_) => Some(ADD_OWNER),
            Call::RemoveOwner(_) => Some(REMOVE_OWNER),
            Call::ReplaceOwner { .. } => Some(REPLACE_OWNER),
            Call::ChangeThreshold(_) => Some(CHANGE_REQUIREMENT),
            Call::Finalize => Some(FINALIZE),
        }
    }

    /// Owner-set and threshold edits, which only the wallet itself handles
    pub fn is_governance(&self) -> bool {
        matches!(
            self,
            Call::AddOwner(_)
                | Call::RemoveOwner(_)
                | Call::ReplaceOwner { .. }
                | Call::ChangeThreshold(_)
        )
    }

    /// Encode into an opaque payload
    pub fn encode(&self) -> Result<Bytes, PayloadError> {
        let signature = match self.signature() {
            Some(signature) => signature,
            None => return Ok(Bytes::new()),
        };

        let mut buf = BytesMut::with_capacity(SELECTOR_LEN + 64);
        buf.put_slice(&selector(signature));

        match self {
            Call::AddOwner(owner) | Call::RemoveOwner(owner) => put_address(&mut buf, owner)?,
            Call::ReplaceOwner { old, new } => {
                put_address(&mut buf, old)?;
                put_address(&mut buf, new)?;
            }
            Call::ChangeThreshold(required) => buf.put_u32(*required),
            Call::ValueTransfer | Call::Finalize => {}
        }

        Ok(buf.freeze())
    }

    /// Decode an opaque payload
    pub fn decode(payload: &[u8]) -> Result<Self, PayloadError> {
        if payload.is_empty() {
            return Ok(Call::ValueTransfer);
        }

        let mut buf = payload;
        ensure_remaining(&buf, SELECTOR_LEN)?;
        let mut sel = [0u8; SELECTOR_LEN];
        buf.copy_to_slice(&mut sel);

        let call = if sel == selector(ADD_OWNER) {
            Call::AddOwner(get_address(&mut buf)?)
        } else if sel == selector(REMOVE_OWNER) {
            Call::RemoveOwner(get_address(&mut buf)?)
        } else if sel == selector(REPLACE_OWNER) {
            let old = get_address(&mut buf)?;
            let new = get_address(&mut buf)?;
            Call::ReplaceOwner { old, new }
        } else if sel == selector(CHANGE_REQUIREMENT) {
            ensure_remaining(&buf, 4)?;
            Call::ChangeThreshold(buf.get_u32())
        } else if sel == selector(FINALIZE) {
            Call::Finalize
        } else {
            return Err(PayloadError::UnknownSelector(hex::encode(sel)));
        };

        if buf.has_remaining() {
            return Err(PayloadError::TrailingBytes(buf.remaining()));
        }

        Ok(call)
    }
}

fn ensure_remaining(buf: &&[u8], expected: usize) -> Result<(), PayloadError> {
    if buf.remaining() < expected {
        return Err(PayloadError::Truncated {
            expected,
            remaining: buf.remaining(),
        });
    }
    Ok(())
}

fn put_address(buf: &mut BytesMut, address: &Address) -> Result<(), PayloadError> {
    let bytes = address.as_bytes();
    let len = u16::try_from(bytes.len()).map_err(|_| PayloadError::AddressTooLong(bytes.len()))?;
    buf.put_u16(len);
    buf.put_slice(bytes);
    Ok(())
}

fn get_address(buf: &mut &[u8]) -> Result<Address, PayloadError> {
    ensure_remaining(buf, 2)?;
    let len = buf.get_u16() as usize;
    ensure_remaining(buf, len)?;
    let raw = buf.copy_to_bytes(len);
    let id = std::str::from_utf8(&raw).map_err(|_| PayloadError::InvalidAddress)?;
    Ok(Address::new(id))
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Call::ValueTransfer => write!(f, "transfer"),
            Call::AddOwner(owner) => write!(f, "addOwner({})", owner),
            Call::RemoveOwner(owner) => write!(f, "removeOwner({})", owner),
            Call::ReplaceOwner { old, new } => write!(f, "replaceOwner({},{})", old, new),
            Call::ChangeThreshold(required) => write!(f, "changeRequirement({})", required),
            Call::Finalize => write!(f, "finalize()"),
        }
    }
}

/// Parse the signature form used on the command line, e.g.
/// `addOwner(acct4)`, `changeRequirement(3)`, `finalize()`, or an empty
/// string / `transfer` for a plain value transfer.
impl FromStr for Call {
    type Err = PayloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == "transfer" {
            return Ok(Call::ValueTransfer);
        }

        let open = s
            .find('(')
            .ok_or_else(|| PayloadError::Parse(format!("missing '(' in {}", s)))?;
        let inner = s[open + 1..]
            .strip_suffix(')')
            .ok_or_else(|| PayloadError::Parse(format!("missing ')' in {}", s)))?;
        let name = s[..open].trim();
        let args: Vec<&str> = inner
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .collect();

        let arity = |n: usize| -> Result<(), PayloadError> {
            if args.len() != n {
                return Err(PayloadError::Parse(format!(
                    "{} takes {} argument(s), got {}",
                    name,
                    n,
                    args.len()
                )));
            }
            Ok(())
        };

        match name {
            "addOwner" => {
                arity(1)?;
                Ok(Call::AddOwner(Address::new(args[0])))
            }
            "removeOwner" => {
                arity(1)?;
                Ok(Call::RemoveOwner(Address::new(args[0])))
            }
            "replaceOwner" => {
                arity(2)?;
                Ok(Call::ReplaceOwner {
                    old: Address::new(args[0]),
                    new: Address::new(args[1]),
                })
            }
            "changeRequirement" | "changeThreshold" => {
                arity(1)?;
                let required = args[0]
                    .parse()
                    .map_err(|_| PayloadError::Parse(format!("invalid threshold {}", args[0])))?;
                Ok(Call::ChangeThreshold(required))
            }
            "finalize" => {
                arity(0)?;
                Ok(Call::Finalize)
            }
            other => Err(PayloadError::Parse(format!("unknown operation {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_payload_is_value_transfer() {
        assert_eq!(Call::decode(&[]).unwrap(), Call::ValueTransfer);
        assert!(Call::ValueTransfer.encode().unwrap().is_empty());
    }

    #[test]
    fn test_add_owner_layout() {
        let payload = Call::AddOwner("acct4".into()).encode().unwrap();

        assert_eq!(&payload[..4], &selector(ADD_OWNER));
        assert_eq!(&payload[4..6], &[0, 5]);
        assert_eq!(&payload[6..], b"acct4");
        assert_eq!(
            Call::decode(&payload).unwrap(),
            Call::AddOwner("acct4".into())
        );
    }

    #[test]
    fn test_replace_owner_and_threshold() {
        let replace = Call::ReplaceOwner {
            old: "acct1".into(),
            new: "acct9".into(),
        };
        assert_eq!(Call::decode(&replace.encode().unwrap()).unwrap(), replace);

        let payload = Call::ChangeThreshold(3).encode().unwrap();
        assert_eq!(&payload[4..], &[0, 0, 0, 3]);
    }

    #[test]
    fn test_unknown_selector_rejected() {
        let result = Call::decode(&[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(
            result,
            Err(PayloadError::UnknownSelector("deadbeef".to_string()))
        );
    }

    #[test]
    fn test_truncated_and_trailing_rejected() {
        let mut payload = Call::AddOwner("acct4".into()).encode().unwrap().to_vec();
        payload.pop();
        assert!(matches!(
            Call::decode(&payload),
            Err(PayloadError::Truncated { .. })
        ));

        let mut payload = Call::Finalize.encode().unwrap().to_vec();
        payload.push(0);
        assert_eq!(Call::decode(&payload), Err(PayloadError::TrailingBytes(1)));
    }

    #[test]
    fn test_parse_signature_form() {
        assert_eq!(
            "addOwner(acct4)".parse::<Call>().unwrap(),
            Call::AddOwner("acct4".into())
        );
        assert_eq!(
            "changeRequirement( 3 )".parse::<Call>().unwrap(),
            Call::ChangeThreshold(3)
        );
        assert_eq!("finalize()".parse::<Call>().unwrap(), Call::Finalize);
        assert_eq!("".parse::<Call>().unwrap(), Call::ValueTransfer);
        assert!("finalize(acct0)".parse::<Call>().is_err());
        assert!("selfDestruct()".parse::<Call>().is_err());
    }
}
