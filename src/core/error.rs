//! Error classification shared by every component
//!
//! Each module keeps its own error enum; `ErrorKind` is the common
//! taxonomy callers can branch on without matching individual variants.

use serde::Serialize;
use std::fmt;

/// Broad category of a failed operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Caller lacks the identity the operation requires
    Authorization,
    /// Operation conflicts with the current state (already done, not done)
    StateConflict,
    /// Outside the funding window, or refund not available
    Window,
    /// Quorum or campaign parameters would become invalid
    Configuration,
    /// Internal accounting invariant would be broken
    Conservation,
    /// The value ledger refused a transfer
    Ledger,
    /// Malformed arguments (zero amount, null address, bad payload)
    Input,
}

impl ErrorKind {
    /// Conservation failures are never recoverable by the caller
    pub fn is_fatal(&self) -> bool {
        matches!(self, ErrorKind::Conservation)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Authorization => "authorization",
            ErrorKind::StateConflict => "state conflict",
            ErrorKind::Window => "window",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Conservation => "conservation",
            ErrorKind::Ledger => "ledger",
            ErrorKind::Input => "input",
        };
        f.write_str(name)
    }
}
