//! Advance operation types.
//!
//! Fee and net value are computed once at creation and frozen on the row;
//! they are never recomputed from the current fee rate.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{LedgerError, OperationId, ReceiverId};

/// Lifecycle status of an operation. The only legal transition is
/// `Pending → Confirmed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Pending,
    Confirmed,
}

impl OperationStatus {
    /// Storage representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
        }
    }

    #[must_use]
    pub fn is_confirmed(self) -> bool {
        self == Self::Confirmed
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            other => Err(LedgerError::InvalidState {
                status: other.to_string(),
            }),
        }
    }
}

/// Fee and net value derived from a gross value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationValues {
    pub fee: Decimal,
    pub net_value: Decimal,
}

impl OperationValues {
    /// The gross value these parts reconstruct.
    #[must_use]
    pub fn gross(&self) -> Decimal {
        self.fee + self.net_value
    }
}

/// A single advance request against a receiver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Operation {
    pub id: OperationId,
    pub receiver_id: ReceiverId,
    pub gross_value: Decimal,
    pub fee: Decimal,
    pub net_value: Decimal,
    pub status: OperationStatus,
    pub created_at: DateTime<Utc>,
}

impl Operation {
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == OperationStatus::Pending
    }

    /// The frozen fee/net split of this operation.
    #[must_use]
    pub fn values(&self) -> OperationValues {
        OperationValues {
            fee: self.fee,
            net_value: self.net_value,
        }
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Operation {
    /// A pending operation with id 1 and a 3% fee already split off.
    pub fn dummy_pending(receiver_id: ReceiverId, gross_value: Decimal) -> Self {
        let fee = gross_value * crate::constants::FEE_RATE;
        Self {
            id: OperationId(1),
            receiver_id,
            gross_value,
            fee,
            net_value: gross_value - fee,
            status: OperationStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

/// Random positive gross value with two decimal places, up to 1,000,000.00.
#[cfg(any(test, feature = "test-helpers"))]
pub fn random_gross_value() -> Decimal {
    use rand::Rng;
    let cents: i64 = rand::thread_rng().gen_range(1..=100_000_000);
    Decimal::new(cents, 2)
}
