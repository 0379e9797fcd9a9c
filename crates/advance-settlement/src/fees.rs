//! Advance fee computation.
//!
//! ```text
//! fee       = gross * FEE_RATE
//! net_value = gross - fee
//! ```
//!
//! The evaluation order is fixed: fee first, net second. All arithmetic is
//! fixed-point `Decimal` and checked; a split that would not reconstruct the
//! gross value exactly is rejected instead of rounded.
//!
//! Gross values are bounded to `MAX_GROSS_SCALE` fractional digits and
//! `MAX_GROSS_VALUE`, which keeps `gross * FEE_RATE` exact.

use advance_types::constants::{FEE_RATE, MAX_GROSS_SCALE, MAX_GROSS_VALUE};
use advance_types::{LedgerError, OperationValues, Result};
use rust_decimal::Decimal;

/// Fee charged on `gross_value`.
///
/// # Errors
/// `InvalidInput` if `gross_value` is not positive or is out of bounds.
pub fn calculate_fee(gross_value: Decimal) -> Result<Decimal> {
    check_gross_value(gross_value)?;
    gross_value
        .checked_mul(FEE_RATE)
        .ok_or_else(|| invalid_gross("is too large to compute a fee for"))
}

/// Net value left after deducting `fee` from `gross_value`.
///
/// # Errors
/// `InvalidInput` if `gross_value` is not positive or is out of bounds, or
/// if `fee < 0`.
pub fn calculate_net_value(gross_value: Decimal, fee: Decimal) -> Result<Decimal> {
    check_gross_value(gross_value)?;
    if fee < Decimal::ZERO {
        return Err(LedgerError::InvalidInput {
            field: "fee",
            reason: format!("must not be negative, got {fee}"),
        });
    }
    gross_value
        .checked_sub(fee)
        .ok_or_else(|| invalid_gross("cannot be reduced by the fee"))
}

/// Fee and net value for `gross_value`, with the exact-split check.
pub fn calculate_operation_values(gross_value: Decimal) -> Result<OperationValues> {
    let fee = calculate_fee(gross_value)?;
    let net_value = calculate_net_value(gross_value, fee)?;
    let values = OperationValues { fee, net_value };
    if values.gross() != gross_value {
        return Err(invalid_gross("cannot be split into fee and net value exactly"));
    }
    Ok(values)
}

/// Positive, at most `MAX_GROSS_SCALE` significant fractional digits, at
/// most `MAX_GROSS_VALUE`.
pub(crate) fn check_gross_value(gross_value: Decimal) -> Result<()> {
    if gross_value <= Decimal::ZERO {
        return Err(invalid_gross(&format!("must be greater than zero, got {gross_value}")));
    }
    if gross_value.normalize().scale() > MAX_GROSS_SCALE {
        return Err(invalid_gross(&format!(
            "must have at most {MAX_GROSS_SCALE} decimal places"
        )));
    }
    if gross_value > MAX_GROSS_VALUE {
        return Err(invalid_gross(&format!("must not exceed {MAX_GROSS_VALUE}")));
    }
    Ok(())
}

fn invalid_gross(reason: &str) -> LedgerError {
    LedgerError::InvalidInput {
        field: "gross_value",
        reason: reason.to_string(),
    }
}
