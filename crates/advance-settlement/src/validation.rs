//! Input validation and coercion.
//!
//! Callers may send `receiver_id` and `gross_value` either as JSON numbers
//! or as their string representation. Both are parsed here, in one step,
//! into an [`OperationRequest`] before any business logic runs. Anything
//! that does not parse completely (`"12abc"`, `true`, `[1]`) is rejected,
//! and so is anything whose digits a `Decimal` cannot hold exactly.

use advance_types::{
    LedgerError, Operation, OperationId, OperationRequest, OperationStatus, ReceiverId, Result,
};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::Value;

use crate::fees::check_gross_value;

/// Why numeric text did not become a `Decimal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NumberError {
    /// Not a plain or scientific decimal literal.
    Malformed,
    /// Well-formed, but would need rounding to fit.
    Inexact,
}

impl NumberError {
    fn reason(self, malformed: &'static str) -> &'static str {
        match self {
            Self::Malformed => malformed,
            Self::Inexact => "has more digits than can be represented exactly",
        }
    }
}

/// Parse and validate the two fields of a create-operation request.
///
/// # Errors
/// `InvalidInput` when `receiver_id` is missing, empty, or not a positive
/// integer, or when `gross_value` is missing, empty, non-numeric, `<= 0`,
/// or outside the accepted precision bounds.
pub fn validate_operation_input(
    receiver_id: Option<&Value>,
    gross_value: Option<&Value>,
) -> Result<OperationRequest> {
    Ok(OperationRequest {
        receiver_id: parse_receiver_id(receiver_id)?,
        gross_value: parse_gross_value(gross_value)?,
    })
}

/// Coerce a receiver id given as number or numeric string.
pub fn parse_receiver_id(value: Option<&Value>) -> Result<ReceiverId> {
    const FIELD: &str = "receiver_id";
    let text = field_text(FIELD, value)?;
    let parsed =
        parse_decimal(&text).map_err(|e| invalid(FIELD, e.reason("must be a valid number")))?;
    if !parsed.fract().is_zero() {
        return Err(invalid(FIELD, "must be an integer"));
    }
    match parsed.to_u64() {
        Some(id) if id > 0 => Ok(ReceiverId(id)),
        _ => Err(invalid(FIELD, "must be a positive integer")),
    }
}

/// Coerce a gross value given as number or numeric string.
pub fn parse_gross_value(value: Option<&Value>) -> Result<Decimal> {
    const FIELD: &str = "gross_value";
    let text = field_text(FIELD, value)?;
    let gross = parse_decimal(&text)
        .map_err(|e| invalid(FIELD, e.reason("is required and must be a number")))?;
    check_gross_value(gross)?;
    Ok(gross)
}

/// Check that a loaded operation may be confirmed and hand it back.
///
/// Statuses other than `pending` / `confirmed` never reach this point:
/// the store refuses to decode them and reports `InvalidState` itself.
///
/// # Errors
/// - `OperationNotFound` if `operation` is `None`
/// - `AlreadyConfirmed` if it is already confirmed
pub fn validate_operation_for_confirmation(
    id: OperationId,
    operation: Option<&Operation>,
) -> Result<&Operation> {
    let operation = operation.ok_or(LedgerError::OperationNotFound(id))?;
    match operation.status {
        OperationStatus::Pending => Ok(operation),
        OperationStatus::Confirmed => Err(LedgerError::AlreadyConfirmed(operation.id)),
    }
}

/// Trim a receiver name and reject it if nothing is left.
pub fn normalize_receiver_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(invalid("name", "is required"));
    }
    Ok(trimmed.to_string())
}

/// Textual form of a number-or-string field; missing, null and blank
/// strings all count as absent.
fn field_text(field: &'static str, value: Option<&Value>) -> Result<String> {
    match value {
        None | Some(Value::Null) => Err(invalid(field, "is required")),
        Some(Value::String(s)) if s.trim().is_empty() => Err(invalid(field, "is required")),
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(_) => Err(invalid(field, "must be a number or numeric string")),
    }
}

/// Plain (`"12.5"`) or scientific (`"1.25e1"`) notation, never rounded.
fn parse_decimal(text: &str) -> std::result::Result<Decimal, NumberError> {
    let (mantissa, exponent) = match text.split_once(['e', 'E']) {
        Some((mantissa, exponent)) => (mantissa, Some(exponent)),
        None => (text, None),
    };
    if !is_decimal_literal(mantissa) {
        return Err(NumberError::Malformed);
    }
    let mantissa = Decimal::from_str_exact(mantissa).map_err(|_| NumberError::Inexact)?;
    let Some(exponent) = exponent else {
        return Ok(mantissa);
    };
    let exponent: i64 = exponent.parse().map_err(|_| NumberError::Malformed)?;
    shift_exact(mantissa, exponent).ok_or(NumberError::Inexact)
}

/// Optional sign, then digits with at most one decimal point.
fn is_decimal_literal(text: &str) -> bool {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    let mut digits = 0;
    let mut points = 0;
    for c in unsigned.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => points += 1,
            _ => return false,
        }
    }
    digits > 0 && points <= 1
}

/// `mantissa * 10^exponent`, or `None` if that needs rounding or overflows.
fn shift_exact(mantissa: Decimal, exponent: i64) -> Option<Decimal> {
    let scale = i64::from(mantissa.scale()).checked_sub(exponent)?;
    if scale >= 0 {
        let scale = u32::try_from(scale).ok()?;
        return Decimal::try_from_i128_with_scale(mantissa.mantissa(), scale).ok();
    }
    let factor = 10_i128.checked_pow(u32::try_from(-scale).ok()?)?;
    let digits = mantissa.mantissa().checked_mul(factor)?;
    Decimal::try_from_i128_with_scale(digits, 0).ok()
}

fn invalid(field: &'static str, reason: &str) -> LedgerError {
    LedgerError::InvalidInput {
        field,
        reason: reason.to_string(),
    }
}
