//! Backend selection from configuration.

use std::time::Duration;

use advance_types::{
    Operation, OperationId, OperationStatus, Receiver, ReceiverId, Result, StoreConfig,
};
use rust_decimal::Decimal;

use crate::memory::MemoryLedgerStore;
use crate::sqlite::SqliteLedgerStore;
use crate::traits::LedgerStore;

/// A Ledger Store whose backend was chosen at runtime.
pub enum AnyLedgerStore {
    Memory(MemoryLedgerStore),
    Sqlite(SqliteLedgerStore),
}

/// Open the backend described by `config`.
pub fn open_store(config: &StoreConfig) -> Result<AnyLedgerStore> {
    config.validate()?;
    match config {
        StoreConfig::Memory => {
            tracing::info!("using in-memory ledger store");
            Ok(AnyLedgerStore::Memory(MemoryLedgerStore::new()))
        }
        StoreConfig::Sqlite {
            path,
            busy_timeout_ms,
        } => SqliteLedgerStore::open(path, Duration::from_millis(*busy_timeout_ms))
            .map(AnyLedgerStore::Sqlite),
    }
}

impl AnyLedgerStore {
    /// Release the underlying backend.
    pub fn close(self) -> Result<()> {
        match self {
            Self::Memory(_) => Ok(()),
            Self::Sqlite(store) => store.close(),
        }
    }

    fn inner(&self) -> &dyn LedgerStore {
        match self {
            Self::Memory(store) => store,
            Self::Sqlite(store) => store,
        }
    }
}

impl LedgerStore for AnyLedgerStore {
    fn create_receiver(&self, name: &str) -> Result<Receiver> {
        self.inner().create_receiver(name)
    }

    fn get_receiver(&self, id: ReceiverId) -> Result<Option<Receiver>> {
        self.inner().get_receiver(id)
    }

    fn set_receiver_balance(&self, id: ReceiverId, balance: Decimal) -> Result<()> {
        self.inner().set_receiver_balance(id, balance)
    }

    fn create_operation(
        &self,
        receiver_id: ReceiverId,
        gross_value: Decimal,
        fee: Decimal,
        net_value: Decimal,
    ) -> Result<Operation> {
        self.inner()
            .create_operation(receiver_id, gross_value, fee, net_value)
    }

    fn get_operation(&self, id: OperationId) -> Result<Option<Operation>> {
        self.inner().get_operation(id)
    }

    fn set_operation_status(&self, id: OperationId, status: OperationStatus) -> Result<()> {
        self.inner().set_operation_status(id, status)
    }

    fn compare_and_set_operation_status(
        &self,
        id: OperationId,
        expected: OperationStatus,
        new: OperationStatus,
    ) -> Result<bool> {
        self.inner()
            .compare_and_set_operation_status(id, expected, new)
    }

    fn confirm_and_credit(&self, id: OperationId) -> Result<Option<Receiver>> {
        self.inner().confirm_and_credit(id)
    }

    fn list_operations_by_receiver(&self, id: ReceiverId) -> Result<Vec<Operation>> {
        self.inner().list_operations_by_receiver(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use advance_types::LedgerError;

    #[test]
    fn opens_memory_backend() {
        let store = open_store(&StoreConfig::Memory).unwrap();
        assert!(matches!(store, AnyLedgerStore::Memory(_)));
        let receiver = store.create_receiver("Alice").unwrap();
        assert_eq!(store.get_receiver(receiver.id).unwrap(), Some(receiver));
        store.close().unwrap();
    }

    #[test]
    fn opens_sqlite_backend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.sqlite");
        let config = StoreConfig::sqlite(path.to_string_lossy());
        let store = open_store(&config).unwrap();
        assert!(matches!(store, AnyLedgerStore::Sqlite(_)));
        store.create_receiver("Alice").unwrap();
        store.close().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn invalid_config_rejected_before_opening() {
        let config = StoreConfig::Sqlite {
            path: String::new(),
            busy_timeout_ms: 100,
        };
        let err = open_store(&config).err().unwrap();
        assert!(matches!(err, LedgerError::Configuration(_)));
    }
}
