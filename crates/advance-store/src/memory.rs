//! In-memory Ledger Store.
//!
//! All state sits behind one `RwLock`, so each trait call is atomic with
//! respect to every other call on the same store.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use advance_types::{
    LedgerError, Operation, OperationId, OperationStatus, Receiver, ReceiverId, Result,
};
use rust_decimal::Decimal;

use crate::clock::CreationClock;
use crate::traits::LedgerStore;

/// Volatile Ledger Store for tests, local demos, and embedding.
pub struct MemoryLedgerStore {
    inner: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    receivers: BTreeMap<ReceiverId, Receiver>,
    operations: BTreeMap<OperationId, Operation>,
    last_receiver_id: u64,
    last_operation_id: u64,
    clock: CreationClock,
}

impl MemoryLedgerStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryState::default()),
        }
    }

    /// Number of receivers ever created.
    pub fn receiver_count(&self) -> Result<usize> {
        Ok(self.read()?.receivers.len())
    }

    /// Number of operations ever created.
    pub fn operation_count(&self) -> Result<usize> {
        Ok(self.read()?.operations.len())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>> {
        self.inner
            .read()
            .map_err(|_| LedgerError::Internal("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>> {
        self.inner
            .write()
            .map_err(|_| LedgerError::Internal("memory store lock poisoned".into()))
    }
}

impl Default for MemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn create_receiver(&self, name: &str) -> Result<Receiver> {
        let mut state = self.write()?;
        state.last_receiver_id += 1;
        let receiver = Receiver::new(ReceiverId(state.last_receiver_id), name);
        state.receivers.insert(receiver.id, receiver.clone());
        tracing::debug!(receiver_id = %receiver.id, "memory store: receiver inserted");
        Ok(receiver)
    }

    fn get_receiver(&self, id: ReceiverId) -> Result<Option<Receiver>> {
        Ok(self.read()?.receivers.get(&id).cloned())
    }

    fn set_receiver_balance(&self, id: ReceiverId, balance: Decimal) -> Result<()> {
        let mut state = self.write()?;
        let receiver = state
            .receivers
            .get_mut(&id)
            .ok_or(LedgerError::ReceiverNotFound(id))?;
        receiver.balance = balance;
        Ok(())
    }

    fn create_operation(
        &self,
        receiver_id: ReceiverId,
        gross_value: Decimal,
        fee: Decimal,
        net_value: Decimal,
    ) -> Result<Operation> {
        let mut state = self.write()?;
        if !state.receivers.contains_key(&receiver_id) {
            return Err(LedgerError::ReceiverNotFound(receiver_id));
        }
        state.last_operation_id += 1;
        let operation = Operation {
            id: OperationId(state.last_operation_id),
            receiver_id,
            gross_value,
            fee,
            net_value,
            status: OperationStatus::Pending,
            created_at: state.clock.next(),
        };
        state.operations.insert(operation.id, operation.clone());
        tracing::debug!(
            operation_id = %operation.id,
            receiver_id = %receiver_id,
            "memory store: operation inserted"
        );
        Ok(operation)
    }

    fn get_operation(&self, id: OperationId) -> Result<Option<Operation>> {
        Ok(self.read()?.operations.get(&id).cloned())
    }

    fn set_operation_status(&self, id: OperationId, status: OperationStatus) -> Result<()> {
        let mut state = self.write()?;
        let operation = state
            .operations
            .get_mut(&id)
            .ok_or(LedgerError::OperationNotFound(id))?;
        operation.status = status;
        Ok(())
    }

    fn compare_and_set_operation_status(
        &self,
        id: OperationId,
        expected: OperationStatus,
        new: OperationStatus,
    ) -> Result<bool> {
        let mut state = self.write()?;
        let operation = state
            .operations
            .get_mut(&id)
            .ok_or(LedgerError::OperationNotFound(id))?;
        if operation.status != expected {
            return Ok(false);
        }
        operation.status = new;
        Ok(true)
    }

    fn confirm_and_credit(&self, id: OperationId) -> Result<Option<Receiver>> {
        let mut guard = self.write()?;
        let state = &mut *guard;
        let operation = state
            .operations
            .get_mut(&id)
            .ok_or(LedgerError::OperationNotFound(id))?;
        if !operation.is_pending() {
            return Ok(None);
        }
        let receiver = state
            .receivers
            .get_mut(&operation.receiver_id)
            .ok_or(LedgerError::ReceiverNotFound(operation.receiver_id))?;
        receiver.balance = receiver.credited(operation.net_value)?;
        operation.status = OperationStatus::Confirmed;
        Ok(Some(receiver.clone()))
    }

    fn list_operations_by_receiver(&self, id: ReceiverId) -> Result<Vec<Operation>> {
        let state = self.read()?;
        let mut operations: Vec<Operation> = state
            .operations
            .values()
            .filter(|op| op.receiver_id == id)
            .cloned()
            .collect();
        operations.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(operations)
    }
}
