//! Receiver (payee) types.
//!
//! A receiver's balance starts at zero and only grows when one of its
//! operations is confirmed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{LedgerError, Operation, ReceiverId, Result};

/// A payee holding an accruable balance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Receiver {
    pub id: ReceiverId,
    /// Display name, already trimmed and non-empty.
    pub name: String,
    /// Sum of the net values of every confirmed operation.
    pub balance: Decimal,
}

impl Receiver {
    /// A freshly created receiver with zero balance.
    #[must_use]
    pub fn new(id: ReceiverId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            balance: Decimal::ZERO,
        }
    }

    /// Balance after crediting `amount`.
    ///
    /// # Errors
    /// `Internal` if the sum does not fit in a `Decimal`.
    pub fn credited(&self, amount: Decimal) -> Result<Decimal> {
        self.balance.checked_add(amount).ok_or_else(|| {
            LedgerError::Internal(format!("balance overflow crediting {}", self.id))
        })
    }
}

/// A receiver together with its operation history, newest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReceiverStatement {
    #[serde(flatten)]
    pub receiver: Receiver,
    pub operations: Vec<Operation>,
}

impl ReceiverStatement {
    /// Sum of net values over the confirmed operations in this statement.
    #[must_use]
    pub fn confirmed_total(&self) -> Decimal {
        self.operations
            .iter()
            .filter(|op| op.status.is_confirmed())
            .map(|op| op.net_value)
            .sum()
    }
}
