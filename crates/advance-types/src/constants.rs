//! System-wide constants for the receivables-advance ledger.

use rust_decimal::Decimal;

/// Advance fee charged on every operation: 3% of the gross value.
pub const FEE_RATE: Decimal = Decimal::from_parts(3, 0, 0, false, 2);

/// Maximum fractional digits accepted on a gross value.
///
/// With the fee rate at scale 2, fees never exceed scale 10, so
/// `fee + net == gross` holds without any rounding.
pub const MAX_GROSS_SCALE: u32 = 8;

/// Largest gross value accepted for a single operation (10^15).
pub const MAX_GROSS_VALUE: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

/// Default SQLite database file.
pub const DEFAULT_DB_PATH: &str = "ledger.sqlite";

/// Default SQLite busy timeout in milliseconds.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
