//! Identifiers for receivers and operations.
//!
//! Both are positive integers assigned sequentially by the Ledger Store.
//! They serialize as bare numbers and parse strictly from path segments.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::LedgerError;

// ---------------------------------------------------------------------------
// ReceiverId
// ---------------------------------------------------------------------------

/// Unique identifier for a receiver (payee). Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiverId(pub u64);

impl ReceiverId {
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ReceiverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rcv:{}", self.0)
    }
}

impl FromStr for ReceiverId {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_numeric_id(s, "receiver_id").map(Self)
    }
}

// ---------------------------------------------------------------------------
// OperationId
// ---------------------------------------------------------------------------

/// Unique identifier for an advance operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(pub u64);

impl OperationId {
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op:{}", self.0)
    }
}

impl FromStr for OperationId {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_numeric_id(s, "id").map(Self)
    }
}

/// The whole string must be an unsigned integer; `"12abc"` is rejected.
fn parse_numeric_id(s: &str, field: &'static str) -> Result<u64, LedgerError> {
    s.parse::<u64>().map_err(|_| LedgerError::InvalidInput {
        field,
        reason: format!("'{s}' is not a valid numeric id"),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_integers() {
        assert_eq!("42".parse::<ReceiverId>().unwrap(), ReceiverId(42));
        assert_eq!("7".parse::<OperationId>().unwrap(), OperationId(7));
    }

    #[test]
    fn rejects_non_numeric() {
        for bad in ["", "abc", "12abc", "-1", "1.5", " 3"] {
            let err = bad.parse::<OperationId>().unwrap_err();
            assert!(
                matches!(err, LedgerError::InvalidInput { .. }),
                "expected InvalidInput for {bad:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn display_has_prefix() {
        assert_eq!(ReceiverId(3).to_string(), "rcv:3");
        assert_eq!(OperationId(9).to_string(), "op:9");
    }

    #[test]
    fn serializes_as_bare_number() {
        assert_eq!(serde_json::to_string(&ReceiverId(5)).unwrap(), "5");
        let back: OperationId = serde_json::from_str("11").unwrap();
        assert_eq!(back, OperationId(11));
    }

    #[test]
    fn ordering_follows_numeric_value() {
        assert!(OperationId(2) < OperationId(10));
    }
}
