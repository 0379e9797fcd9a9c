//! Caller-facing input shapes.
//!
//! Request bodies may carry numbers or their string representation, so the
//! raw fields are kept as JSON values until the Settlement Engine turns them
//! into an [`OperationRequest`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ReceiverId;

/// Raw body of a create-operation request, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateOperationInput {
    #[serde(default)]
    pub receiver_id: Option<Value>,
    #[serde(default)]
    pub gross_value: Option<Value>,
}

impl CreateOperationInput {
    #[must_use]
    pub fn new(receiver_id: impl Into<Value>, gross_value: impl Into<Value>) -> Self {
        Self {
            receiver_id: Some(receiver_id.into()),
            gross_value: Some(gross_value.into()),
        }
    }
}

/// A validated create-operation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationRequest {
    pub receiver_id: ReceiverId,
    pub gross_value: Decimal,
}
