//! Balance conservation invariant checker.
//!
//! Mathematical invariant that holds after every confirmation:
//! ```text
//! ∀ receiver: balance == Σ(net_value of its confirmed operations)
//! ```
//!
//! Pending operations contribute nothing. If this ever breaks, a credit was
//! lost or applied twice.

use advance_types::{LedgerError, Operation, Receiver, Result};
use rust_decimal::Decimal;

/// Balance a receiver should hold given its operation history.
#[must_use]
pub fn expected_balance(operations: &[Operation]) -> Decimal {
    operations
        .iter()
        .filter(|op| op.status.is_confirmed())
        .map(|op| op.net_value)
        .sum()
}

/// Verify `receiver.balance` against the confirmed operations in `operations`.
///
/// # Errors
/// Returns [`LedgerError::BalanceInvariantViolation`] if they differ, or if
/// `operations` contains rows belonging to another receiver.
pub fn verify_receiver_balance(receiver: &Receiver, operations: &[Operation]) -> Result<()> {
    if let Some(foreign) = operations.iter().find(|op| op.receiver_id != receiver.id) {
        return Err(LedgerError::BalanceInvariantViolation {
            reason: format!(
                "operation {} belongs to {}, not {}",
                foreign.id, foreign.receiver_id, receiver.id
            ),
        });
    }

    let expected = expected_balance(operations);
    if receiver.balance != expected {
        let confirmed = operations.iter().filter(|op| op.status.is_confirmed()).count();
        return Err(LedgerError::BalanceInvariantViolation {
            reason: format!(
                "Receiver {}: balance {} != expected {expected} \
                 (confirmed operations={confirmed}, total operations={})",
                receiver.id,
                receiver.balance,
                operations.len(),
            ),
        });
    }
    Ok(())
}
