//! SQLite-backed Ledger Store.
//!
//! Two tables, `receivers` and `operations`, with `operations.receiver_id`
//! referencing `receivers.id`. Money columns are TEXT holding the decimal's
//! canonical string, so nothing passes through floating point on the way to
//! disk. `created_at` is RFC 3339 with fixed microsecond precision, which
//! makes lexicographic order equal chronological order.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use advance_types::{
    LedgerError, Operation, OperationId, OperationStatus, Receiver, ReceiverId, Result,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use rust_decimal::Decimal;

use crate::clock::CreationClock;
use crate::traits::LedgerStore;

const RECEIVER_COLUMNS: &str = "id, name, balance";
const OPERATION_COLUMNS: &str = "id, receiver_id, gross_value, fee, net_value, status, created_at";

/// Ledger Store persisted in a single SQLite database.
///
/// The connection is owned by this value: it is opened by [`open`] and
/// released by [`close`] (or on drop).
///
/// [`open`]: SqliteLedgerStore::open
/// [`close`]: SqliteLedgerStore::close
pub struct SqliteLedgerStore {
    inner: Mutex<SqliteState>,
}

struct SqliteState {
    db: Connection,
    clock: CreationClock,
}

impl SqliteLedgerStore {
    const SCHEMA: &'static str = r"
        CREATE TABLE IF NOT EXISTS receivers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            balance TEXT NOT NULL DEFAULT '0'
        );

        CREATE TABLE IF NOT EXISTS operations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            receiver_id INTEGER NOT NULL,
            gross_value TEXT NOT NULL,
            fee TEXT NOT NULL,
            net_value TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL,
            FOREIGN KEY (receiver_id) REFERENCES receivers(id)
        );

        CREATE INDEX IF NOT EXISTS idx_operations_receiver_created
        ON operations(receiver_id, created_at);
    ";

    /// Open or create the ledger database at `path`.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let db = Connection::open(path).map_err(|e| {
            store_failure(&format!("failed to open ledger at {}", path.display()), &e)
        })?;
        tracing::info!(path = %path.display(), "opened sqlite ledger store");
        Self::initialize(db, busy_timeout)
    }

    /// Open a private in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory()
            .map_err(|e| store_failure("failed to open in-memory ledger", &e))?;
        let busy_timeout = Duration::from_millis(advance_types::constants::DEFAULT_BUSY_TIMEOUT_MS);
        Self::initialize(db, busy_timeout)
    }

    fn initialize(db: Connection, busy_timeout: Duration) -> Result<Self> {
        db.busy_timeout(busy_timeout)
            .map_err(|e| store_failure("failed to set busy timeout", &e))?;
        db.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=FULL; PRAGMA foreign_keys=ON;",
        )
        .map_err(|e| store_failure("failed to set ledger pragmas", &e))?;
        db.execute_batch(Self::SCHEMA)
            .map_err(|e| store_failure("failed to create ledger schema", &e))?;
        let latest: Option<String> = db
            .query_row("SELECT MAX(created_at) FROM operations", [], |row| row.get(0))
            .map_err(|e| store_failure("failed to read latest creation time", &e))?;
        let latest = latest.as_deref().map(parse_timestamp).transpose()?;
        Ok(Self {
            inner: Mutex::new(SqliteState {
                db,
                clock: CreationClock::resuming_after(latest),
            }),
        })
    }

    /// Release the connection, surfacing any error SQLite reports on close.
    pub fn close(self) -> Result<()> {
        let state = self
            .inner
            .into_inner()
            .map_err(|_| LedgerError::Internal("sqlite store lock poisoned".into()))?;
        state
            .db
            .close()
            .map_err(|(_, e)| store_failure("failed to close ledger", &e))?;
        tracing::info!("closed sqlite ledger store");
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, SqliteState>> {
        self.inner
            .lock()
            .map_err(|_| LedgerError::Internal("sqlite store lock poisoned".into()))
    }
}

impl LedgerStore for SqliteLedgerStore {
    fn create_receiver(&self, name: &str) -> Result<Receiver> {
        let state = self.lock()?;
        let row = state
            .db
            .query_row(
                &format!(
                    "INSERT INTO receivers (name, balance) VALUES (?1, ?2)
                     RETURNING {RECEIVER_COLUMNS}"
                ),
                params![name, Decimal::ZERO.to_string()],
                ReceiverRow::from_row,
            )
            .map_err(|e| store_failure("failed to insert receiver", &e))?;
        let receiver = row.into_receiver()?;
        tracing::debug!(receiver_id = %receiver.id, "sqlite store: receiver inserted");
        Ok(receiver)
    }

    fn get_receiver(&self, id: ReceiverId) -> Result<Option<Receiver>> {
        let Some(key) = sql_id(id.0) else {
            return Ok(None);
        };
        load_receiver(&self.lock()?.db, key)
    }

    fn set_receiver_balance(&self, id: ReceiverId, balance: Decimal) -> Result<()> {
        let key = sql_id(id.0).ok_or(LedgerError::ReceiverNotFound(id))?;
        let state = self.lock()?;
        let changed = state
            .db
            .execute(
                "UPDATE receivers SET balance = ?1 WHERE id = ?2",
                params![balance.to_string(), key],
            )
            .map_err(|e| store_failure("failed to update receiver balance", &e))?;
        if changed == 0 {
            return Err(LedgerError::ReceiverNotFound(id));
        }
        Ok(())
    }

    fn create_operation(
        &self,
        receiver_id: ReceiverId,
        gross_value: Decimal,
        fee: Decimal,
        net_value: Decimal,
    ) -> Result<Operation> {
        let key = sql_id(receiver_id.0).ok_or(LedgerError::ReceiverNotFound(receiver_id))?;
        let mut state = self.lock()?;
        let exists = state
            .db
            .query_row("SELECT 1 FROM receivers WHERE id = ?1", params![key], |_| Ok(()))
            .optional()
            .map_err(|e| store_failure("failed to check receiver", &e))?
            .is_some();
        if !exists {
            return Err(LedgerError::ReceiverNotFound(receiver_id));
        }

        let created_at = state.clock.next();
        let row = state
            .db
            .query_row(
                &format!(
                    "INSERT INTO operations
                        (receiver_id, gross_value, fee, net_value, status, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     RETURNING {OPERATION_COLUMNS}"
                ),
                params![
                    key,
                    gross_value.to_string(),
                    fee.to_string(),
                    net_value.to_string(),
                    OperationStatus::Pending.as_str(),
                    format_timestamp(created_at),
                ],
                OperationRow::from_row,
            )
            .map_err(|e| store_failure("failed to insert operation", &e))?;
        let operation = row.into_operation()?;
        tracing::debug!(
            operation_id = %operation.id,
            receiver_id = %receiver_id,
            "sqlite store: operation inserted"
        );
        Ok(operation)
    }

    fn get_operation(&self, id: OperationId) -> Result<Option<Operation>> {
        let Some(key) = sql_id(id.0) else {
            return Ok(None);
        };
        load_operation(&self.lock()?.db, key)
    }

    fn set_operation_status(&self, id: OperationId, status: OperationStatus) -> Result<()> {
        let key = sql_id(id.0).ok_or(LedgerError::OperationNotFound(id))?;
        let state = self.lock()?;
        let changed = state
            .db
            .execute(
                "UPDATE operations SET status = ?1 WHERE id = ?2",
                params![status.as_str(), key],
            )
            .map_err(|e| store_failure("failed to update operation status", &e))?;
        if changed == 0 {
            return Err(LedgerError::OperationNotFound(id));
        }
        Ok(())
    }

    fn compare_and_set_operation_status(
        &self,
        id: OperationId,
        expected: OperationStatus,
        new: OperationStatus,
    ) -> Result<bool> {
        let key = sql_id(id.0).ok_or(LedgerError::OperationNotFound(id))?;
        let state = self.lock()?;
        let changed = state
            .db
            .execute(
                "UPDATE operations SET status = ?1 WHERE id = ?2 AND status = ?3",
                params![new.as_str(), key, expected.as_str()],
            )
            .map_err(|e| store_failure("failed to swap operation status", &e))?;
        if changed > 0 {
            return Ok(true);
        }
        let exists = state
            .db
            .query_row("SELECT 1 FROM operations WHERE id = ?1", params![key], |_| Ok(()))
            .optional()
            .map_err(|e| store_failure("failed to check operation", &e))?
            .is_some();
        if exists {
            Ok(false)
        } else {
            Err(LedgerError::OperationNotFound(id))
        }
    }

    fn confirm_and_credit(&self, id: OperationId) -> Result<Option<Receiver>> {
        let key = sql_id(id.0).ok_or(LedgerError::OperationNotFound(id))?;
        let mut state = self.lock()?;
        // Dropping `tx` on any early return rolls back.
        let tx = state
            .db
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| store_failure("failed to begin confirmation", &e))?;

        let operation = load_operation(&tx, key)?.ok_or(LedgerError::OperationNotFound(id))?;
        if !operation.is_pending() {
            return Ok(None);
        }
        let receiver_id = operation.receiver_id;
        let receiver_key = sql_id(receiver_id.0).ok_or(LedgerError::ReceiverNotFound(receiver_id))?;
        let mut receiver =
            load_receiver(&tx, receiver_key)?.ok_or(LedgerError::ReceiverNotFound(receiver_id))?;
        receiver.balance = receiver.credited(operation.net_value)?;

        tx.execute(
            "UPDATE operations SET status = ?1 WHERE id = ?2 AND status = ?3",
            params![
                OperationStatus::Confirmed.as_str(),
                key,
                OperationStatus::Pending.as_str()
            ],
        )
        .map_err(|e| store_failure("failed to confirm operation", &e))?;
        tx.execute(
            "UPDATE receivers SET balance = ?1 WHERE id = ?2",
            params![receiver.balance.to_string(), receiver_key],
        )
        .map_err(|e| store_failure("failed to credit receiver", &e))?;
        tx.commit()
            .map_err(|e| store_failure("failed to commit confirmation", &e))?;
        Ok(Some(receiver))
    }

    fn list_operations_by_receiver(&self, id: ReceiverId) -> Result<Vec<Operation>> {
        let Some(key) = sql_id(id.0) else {
            return Ok(Vec::new());
        };
        let state = self.lock()?;
        let mut stmt = state
            .db
            .prepare(&format!(
                "SELECT {OPERATION_COLUMNS}
                 FROM operations
                 WHERE receiver_id = ?1
                 ORDER BY created_at DESC, id DESC"
            ))
            .map_err(|e| store_failure("failed to prepare history query", &e))?;
        let rows = stmt
            .query_map(params![key], OperationRow::from_row)
            .map_err(|e| store_failure("failed to query history", &e))?;

        let mut operations = Vec::new();
        for row in rows {
            let row = row.map_err(|e| store_failure("failed to read history row", &e))?;
            operations.push(row.into_operation()?);
        }
        Ok(operations)
    }
}

// ── Row decoding ────────────────────────────────────────────────────────

struct ReceiverRow {
    id: i64,
    name: String,
    balance: String,
}

impl ReceiverRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            balance: row.get(2)?,
        })
    }

    fn into_receiver(self) -> Result<Receiver> {
        Ok(Receiver {
            id: ReceiverId(decode_id(self.id)?),
            name: self.name,
            balance: decode_decimal("balance", &self.balance)?,
        })
    }
}

struct OperationRow {
    id: i64,
    receiver_id: i64,
    gross_value: String,
    fee: String,
    net_value: String,
    status: String,
    created_at: String,
}

impl OperationRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            receiver_id: row.get(1)?,
            gross_value: row.get(2)?,
            fee: row.get(3)?,
            net_value: row.get(4)?,
            status: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    /// Unknown status text surfaces as `InvalidState`.
    fn into_operation(self) -> Result<Operation> {
        Ok(Operation {
            id: OperationId(decode_id(self.id)?),
            receiver_id: ReceiverId(decode_id(self.receiver_id)?),
            gross_value: decode_decimal("gross_value", &self.gross_value)?,
            fee: decode_decimal("fee", &self.fee)?,
            net_value: decode_decimal("net_value", &self.net_value)?,
            status: OperationStatus::from_str(&self.status)?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

fn load_receiver(db: &Connection, key: i64) -> Result<Option<Receiver>> {
    db.query_row(
        &format!("SELECT {RECEIVER_COLUMNS} FROM receivers WHERE id = ?1"),
        params![key],
        ReceiverRow::from_row,
    )
    .optional()
    .map_err(|e| store_failure("failed to load receiver", &e))?
    .map(ReceiverRow::into_receiver)
    .transpose()
}

fn load_operation(db: &Connection, key: i64) -> Result<Option<Operation>> {
    db.query_row(
        &format!("SELECT {OPERATION_COLUMNS} FROM operations WHERE id = ?1"),
        params![key],
        OperationRow::from_row,
    )
    .optional()
    .map_err(|e| store_failure("failed to load operation", &e))?
    .map(OperationRow::into_operation)
    .transpose()
}

fn sql_id(id: u64) -> Option<i64> {
    i64::try_from(id).ok()
}

fn decode_id(id: i64) -> Result<u64> {
    u64::try_from(id).map_err(|_| LedgerError::StoreFailure(format!("corrupt row id {id}")))
}

fn decode_decimal(column: &str, text: &str) -> Result<Decimal> {
    Decimal::from_str(text)
        .map_err(|e| LedgerError::StoreFailure(format!("corrupt {column} '{text}': {e}")))
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| LedgerError::StoreFailure(format!("corrupt created_at '{text}': {e}")))
}

fn store_failure(context: &str, err: &rusqlite::Error) -> LedgerError {
    LedgerError::StoreFailure(format!("{context}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(units: i64) -> (Decimal, Decimal, Decimal) {
        let gross = Decimal::new(units, 0);
        let fee = gross * advance_types::constants::FEE_RATE;
        (gross, fee, gross - fee)
    }

    #[test]
    fn receiver_roundtrip() {
        let store = SqliteLedgerStore::open_in_memory().unwrap();
        let created = store.create_receiver("Alice").unwrap();
        assert_eq!(created.id, ReceiverId(1));
        assert_eq!(created.balance, Decimal::ZERO);
        assert_eq!(store.get_receiver(created.id).unwrap(), Some(created));
        assert_eq!(store.get_receiver(ReceiverId(2)).unwrap(), None);
    }

    #[test]
    fn decimals_survive_storage_exactly() {
        let store = SqliteLedgerStore::open_in_memory().unwrap();
        let receiver = store.create_receiver("Alice").unwrap();
        let gross = Decimal::new(123_456_789, 8); // 1.23456789
        let fee = gross * advance_types::constants::FEE_RATE;
        let net = gross - fee;

        let op = store.create_operation(receiver.id, gross, fee, net).unwrap();
        let loaded = store.get_operation(op.id).unwrap().unwrap();
        assert_eq!(loaded.gross_value, gross);
        assert_eq!(loaded.fee, fee);
        assert_eq!(loaded.net_value, net);
        assert_eq!(loaded.fee + loaded.net_value, loaded.gross_value);
        assert_eq!(loaded, op);
    }

    #[test]
    fn operation_for_missing_receiver_rejected() {
        let store = SqliteLedgerStore::open_in_memory().unwrap();
        let (g, f, n) = split(100);
        let err = store.create_operation(ReceiverId(5), g, f, n).unwrap_err();
        assert!(matches!(err, LedgerError::ReceiverNotFound(ReceiverId(5))));
    }

    #[test]
    fn compare_and_set_status() {
        let store = SqliteLedgerStore::open_in_memory().unwrap();
        let receiver = store.create_receiver("Alice").unwrap();
        let (g, f, n) = split(1000);
        let op = store.create_operation(receiver.id, g, f, n).unwrap();

        let (pending, confirmed) = (OperationStatus::Pending, OperationStatus::Confirmed);
        assert!(store.compare_and_set_operation_status(op.id, pending, confirmed).unwrap());
        assert!(!store.compare_and_set_operation_status(op.id, pending, confirmed).unwrap());
        let err = store
            .compare_and_set_operation_status(OperationId(77), pending, confirmed)
            .unwrap_err();
        assert!(matches!(err, LedgerError::OperationNotFound(OperationId(77))));
    }

    #[test]
    fn confirm_and_credit_commits_both_rows() {
        let store = SqliteLedgerStore::open_in_memory().unwrap();
        let receiver = store.create_receiver("Alice").unwrap();
        let (g, f, n) = split(1000);
        let op = store.create_operation(receiver.id, g, f, n).unwrap();

        let credited = store.confirm_and_credit(op.id).unwrap().unwrap();
        assert_eq!(credited.balance, Decimal::new(970, 0));
        assert_eq!(store.get_receiver(receiver.id).unwrap(), Some(credited));
        let stored = store.get_operation(op.id).unwrap().unwrap();
        assert_eq!(stored.status, OperationStatus::Confirmed);

        assert_eq!(store.confirm_and_credit(op.id).unwrap(), None);
        assert!(matches!(
            store.confirm_and_credit(OperationId(77)).unwrap_err(),
            LedgerError::OperationNotFound(OperationId(77))
        ));
    }

    #[test]
    fn confirm_and_credit_rolls_back_when_receiver_missing() {
        let store = SqliteLedgerStore::open_in_memory().unwrap();
        let receiver = store.create_receiver("Alice").unwrap();
        let (g, f, n) = split(1000);
        let op = store.create_operation(receiver.id, g, f, n).unwrap();
        {
            let state = store.lock().unwrap();
            state.db.execute_batch("PRAGMA foreign_keys=OFF;").unwrap();
            state
                .db
                .execute("DELETE FROM receivers WHERE id = ?1", params![1])
                .unwrap();
        }

        let err = store.confirm_and_credit(op.id).unwrap_err();
        assert!(matches!(err, LedgerError::ReceiverNotFound(id) if id == receiver.id));
        assert!(store.get_operation(op.id).unwrap().unwrap().is_pending());
    }

    #[test]
    fn unknown_status_is_invalid_state() {
        let store = SqliteLedgerStore::open_in_memory().unwrap();
        let receiver = store.create_receiver("Alice").unwrap();
        let (g, f, n) = split(10);
        let op = store.create_operation(receiver.id, g, f, n).unwrap();
        store
            .lock()
            .unwrap()
            .db
            .execute("UPDATE operations SET status = 'cancelled' WHERE id = ?1", params![1])
            .unwrap();

        let err = store.get_operation(op.id).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState { ref status } if status == "cancelled"));
        let err = store.confirm_and_credit(op.id).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState { .. }));
    }

    #[test]
    fn history_newest_first() {
        let store = SqliteLedgerStore::open_in_memory().unwrap();
        let receiver = store.create_receiver("Alice").unwrap();
        let (g, f, n) = split(10);
        let ids: Vec<OperationId> = (0..5)
            .map(|_| store.create_operation(receiver.id, g, f, n).unwrap().id)
            .collect();

        let history: Vec<OperationId> = store
            .list_operations_by_receiver(receiver.id)
            .unwrap()
            .into_iter()
            .map(|op| op.id)
            .collect();
        let mut expected = ids;
        expected.reverse();
        assert_eq!(history, expected);
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.sqlite");
        let timeout = Duration::from_millis(1000);

        let store = SqliteLedgerStore::open(&path, timeout).unwrap();
        let receiver = store.create_receiver("Alice").unwrap();
        store
            .set_receiver_balance(receiver.id, Decimal::new(97_000, 2))
            .unwrap();
        store.close().unwrap();

        let reopened = SqliteLedgerStore::open(&path, timeout).unwrap();
        let loaded = reopened.get_receiver(receiver.id).unwrap().unwrap();
        assert_eq!(loaded.balance, Decimal::new(970, 0));
        assert_eq!(reopened.create_receiver("Bob").unwrap().id, ReceiverId(2));
    }

    #[test]
    fn reopened_store_keeps_history_order_after_clock_skew() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.sqlite");
        let timeout = Duration::from_millis(1000);
        let future = "2999-01-01T00:00:00.000000Z";

        let store = SqliteLedgerStore::open(&path, timeout).unwrap();
        let receiver = store.create_receiver("Alice").unwrap();
        let (g, f, n) = split(10);
        let old = store.create_operation(receiver.id, g, f, n).unwrap();
        store
            .lock()
            .unwrap()
            .db
            .execute("UPDATE operations SET created_at = ?1", params![future])
            .unwrap();
        store.close().unwrap();

        let reopened = SqliteLedgerStore::open(&path, timeout).unwrap();
        let new = reopened.create_operation(receiver.id, g, f, n).unwrap();
        assert!(new.created_at > parse_timestamp(future).unwrap());

        let history: Vec<OperationId> = reopened
            .list_operations_by_receiver(receiver.id)
            .unwrap()
            .into_iter()
            .map(|op| op.id)
            .collect();
        assert_eq!(history, vec![new.id, old.id]);
    }
}
