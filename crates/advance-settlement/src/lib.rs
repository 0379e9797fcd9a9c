//! # advance-settlement
//!
//! **Settlement Engine**: fee computation, input validation, and the
//! confirm-operation state transition, expressed against the
//! [`LedgerStore`](advance_store::LedgerStore) interface.
//!
//! ## Architecture
//!
//! A request-handling layer calls the [`SettlementEngine`], which:
//! 1. Parses loosely-typed caller input into typed, validated values
//! 2. Computes fee and net value (fee first, then `net = gross - fee`)
//! 3. Persists through the Ledger Store
//! 4. On confirmation, has the store flip status and credit the receiver as
//!    one unit (a single transaction for SQLite), serialized per receiver
//!
//! ## Invariants
//!
//! - `fee + net_value == gross_value` exactly, for every operation
//! - A receiver's balance equals the sum of `net_value` over its confirmed
//!   operations ([`balance_conservation`])

pub mod balance_conservation;
pub mod engine;
pub mod fees;
pub mod receiver_locks;
pub mod validation;

pub use engine::SettlementEngine;
pub use fees::{calculate_fee, calculate_net_value, calculate_operation_values};
pub use receiver_locks::ReceiverLocks;
pub use validation::{validate_operation_for_confirmation, validate_operation_input};
