//! # advance-store
//!
//! **Ledger Store**: persistent state for receivers and operations.
//!
//! ## Architecture
//!
//! The Settlement Engine talks to persistence only through the
//! [`LedgerStore`] trait. Every call on it is atomic on its own; the engine
//! never assumes atomicity across calls unless it serializes them itself.
//!
//! ## Backends
//!
//! - [`MemoryLedgerStore`]: `RwLock`-guarded maps, for tests and embedding
//! - [`SqliteLedgerStore`]: `receivers` and `operations` tables in SQLite
//! - [`AnyLedgerStore`]: whichever of the two [`open_store`] picked from config

pub mod backend;
mod clock;
pub mod memory;
pub mod sqlite;
pub mod traits;

pub use backend::{open_store, AnyLedgerStore};
pub use memory::MemoryLedgerStore;
pub use sqlite::SqliteLedgerStore;
pub use traits::LedgerStore;
