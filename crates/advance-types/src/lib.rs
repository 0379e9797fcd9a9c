//! # advance-types
//!
//! Shared types, errors, and configuration for the receivables-advance ledger.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`ReceiverId`], [`OperationId`]
//! - **Receiver model**: [`Receiver`], [`ReceiverStatement`]
//! - **Operation model**: [`Operation`], [`OperationStatus`], [`OperationValues`]
//! - **Caller input**: [`CreateOperationInput`], [`OperationRequest`]
//! - **Configuration**: [`LedgerConfig`], [`StoreConfig`]
//! - **Errors**: [`LedgerError`] with `LG_ERR_` prefix codes
//! - **Constants**: fee rate, precision bounds, and defaults

pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod input;
pub mod operation;
pub mod receiver;

// Re-export all primary types at crate root for ergonomic imports:
//   use advance_types::{Operation, OperationStatus, Receiver, ...};

pub use config::*;
pub use error::*;
pub use ids::*;
pub use input::*;
pub use operation::*;
pub use receiver::*;

// Constants are accessed via `advance_types::constants::FOO`
// (not re-exported to avoid name collisions).
