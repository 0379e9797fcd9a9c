//! The Settlement Engine.
//!
//! Owns a Ledger Store handle and runs the operation lifecycle against it:
//! 1. Create receivers and pending operations (fee frozen at creation)
//! 2. Confirm an operation: `pending → confirmed` plus the receiver credit,
//!    applied by the store as one unit
//! 3. Read statements and check balances under the receiver's lock, so a
//!    reader never sees a receiver and its history from different moments

use advance_store::{AnyLedgerStore, LedgerStore, open_store};
use advance_types::{
    CreateOperationInput, LedgerConfig, LedgerError, Operation, OperationId, Receiver, ReceiverId,
    ReceiverStatement, Result,
};
use rust_decimal::Decimal;

use crate::balance_conservation;
use crate::fees::calculate_operation_values;
use crate::receiver_locks::ReceiverLocks;
use crate::validation::{
    normalize_receiver_name, validate_operation_for_confirmation, validate_operation_input,
};

/// Business logic over a [`LedgerStore`].
///
/// `Send + Sync` whenever the store is; share it across threads with `Arc`.
pub struct SettlementEngine<S: LedgerStore> {
    store: S,
    locks: ReceiverLocks,
}

impl<S: LedgerStore> SettlementEngine<S> {
    /// Wrap an already-opened store.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: ReceiverLocks::new(),
        }
    }

    /// Read access to the underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give the store back, ending the engine's ownership of it.
    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }

    // =================================================================
    // Receivers
    // =================================================================

    /// Create a receiver with zero balance. The name is trimmed first.
    pub fn create_receiver(&self, name: &str) -> Result<Receiver> {
        let name = normalize_receiver_name(name)?;
        let receiver = self.store.create_receiver(&name)?;
        tracing::info!(receiver_id = %receiver.id, name = %receiver.name, "receiver created");
        Ok(receiver)
    }

    pub fn get_receiver(&self, id: ReceiverId) -> Result<Receiver> {
        self.store
            .get_receiver(id)?
            .ok_or(LedgerError::ReceiverNotFound(id))
    }

    /// Receiver plus its operation history, newest first, as one snapshot.
    pub fn get_receiver_statement(&self, id: ReceiverId) -> Result<ReceiverStatement> {
        // Unknown ids never get a lock slot.
        self.get_receiver(id)?;
        self.locks.with_lock(id, || {
            let receiver = self.get_receiver(id)?;
            let operations = self.store.list_operations_by_receiver(id)?;
            Ok(ReceiverStatement {
                receiver,
                operations,
            })
        })
    }

    /// Check that the receiver's balance equals the sum of its confirmed
    /// operations' net values.
    pub fn verify_receiver_balance(&self, id: ReceiverId) -> Result<()> {
        let statement = self.get_receiver_statement(id)?;
        balance_conservation::verify_receiver_balance(&statement.receiver, &statement.operations)
            .inspect_err(|err| tracing::error!(receiver_id = %id, %err, "balance invariant broken"))
    }

    // =================================================================
    // Operations
    // =================================================================

    /// Validate raw request fields, then create the operation.
    pub fn submit_operation(&self, input: &CreateOperationInput) -> Result<Operation> {
        let request =
            validate_operation_input(input.receiver_id.as_ref(), input.gross_value.as_ref())?;
        self.create_operation(request.receiver_id, request.gross_value)
    }

    /// Create a pending operation for an existing receiver.
    ///
    /// Returns the row as the store holds it, with its assigned id and
    /// creation timestamp.
    ///
    /// # Errors
    /// - `ReceiverNotFound` if the receiver does not exist
    /// - `InvalidInput` if `gross_value` is not positive or is out of bounds
    pub fn create_operation(
        &self,
        receiver_id: ReceiverId,
        gross_value: Decimal,
    ) -> Result<Operation> {
        if self.store.get_receiver(receiver_id)?.is_none() {
            return Err(LedgerError::ReceiverNotFound(receiver_id));
        }
        let values = calculate_operation_values(gross_value)?;
        let operation = self.store.create_operation(
            receiver_id,
            gross_value,
            values.fee,
            values.net_value,
        )?;
        tracing::info!(
            operation_id = %operation.id,
            receiver_id = %receiver_id,
            gross = %operation.gross_value,
            fee = %operation.fee,
            net = %operation.net_value,
            "operation created"
        );
        Ok(operation)
    }

    pub fn get_operation(&self, id: OperationId) -> Result<Operation> {
        self.store
            .get_operation(id)?
            .ok_or(LedgerError::OperationNotFound(id))
    }

    /// Confirm a pending operation and credit its receiver.
    ///
    /// The status flip and the credit are applied together or not at all.
    /// Concurrent confirmations of the same id produce exactly one success;
    /// the rest fail with `AlreadyConfirmed` and change nothing.
    ///
    /// # Errors
    /// - `OperationNotFound` if no such operation exists
    /// - `AlreadyConfirmed` if it was confirmed before or concurrently
    /// - `InvalidState` if the stored status is unrecognized
    /// - `ReceiverNotFound` if the owning receiver is gone (nothing changes)
    /// - `StoreFailure` if the store could not apply it (nothing changes)
    pub fn confirm_operation(&self, id: OperationId) -> Result<Operation> {
        let loaded = self.store.get_operation(id)?;
        let operation = validate_operation_for_confirmation(id, loaded.as_ref())
            .inspect_err(|err| tracing::warn!(operation_id = %id, %err, "confirmation rejected"))?;

        self.locks
            .with_lock(operation.receiver_id, || self.settle(operation))
    }

    /// Apply the confirmation. Caller holds the receiver lock.
    fn settle(&self, operation: &Operation) -> Result<Operation> {
        let id = operation.id;
        let credited = self.store.confirm_and_credit(id).inspect_err(|err| {
            tracing::warn!(operation_id = %id, %err, "confirmation not applied");
        })?;
        let Some(receiver) = credited else {
            tracing::warn!(operation_id = %id, "lost confirmation race");
            return Err(LedgerError::AlreadyConfirmed(id));
        };

        let confirmed = self.get_operation(id)?;
        tracing::info!(
            operation_id = %id,
            receiver_id = %receiver.id,
            net = %confirmed.net_value,
            balance = %receiver.balance,
            "operation confirmed"
        );
        Ok(confirmed)
    }
}

impl SettlementEngine<AnyLedgerStore> {
    /// Open the configured store and build an engine around it.
    pub fn open(config: &LedgerConfig) -> Result<Self> {
        config.validate()?;
        let store = open_store(&config.store)?;
        tracing::info!(version = advance_types::constants::VERSION, "settlement engine started");
        Ok(Self::new(store))
    }

    /// Stop the engine and release the store.
    pub fn shutdown(self) -> Result<()> {
        tracing::info!("settlement engine shutting down");
        self.store.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use advance_store::MemoryLedgerStore;
    use advance_types::OperationStatus;
    use serde_json::json;

    fn engine() -> SettlementEngine<MemoryLedgerStore> {
        SettlementEngine::new(MemoryLedgerStore::new())
    }

    #[test]
    fn create_receiver_trims_name() {
        let engine = engine();
        let receiver = engine.create_receiver("  Acme  ").unwrap();
        assert_eq!(receiver.name, "Acme");
        assert_eq!(receiver.balance, Decimal::ZERO);
    }

    #[test]
    fn blank_receiver_name_rejected_without_insert() {
        let engine = engine();
        let err = engine.create_receiver("   ").unwrap_err();
        assert_eq!(err.http_status(), 400);
        assert_eq!(engine.store().receiver_count().unwrap(), 0);
    }

    #[test]
    fn create_operation_freezes_fee_and_net() {
        let engine = engine();
        let receiver = engine.create_receiver("Acme").unwrap();
        let op = engine
            .create_operation(receiver.id, Decimal::new(1000, 0))
            .unwrap();
        assert_eq!(op.status, OperationStatus::Pending);
        assert_eq!(op.gross_value, Decimal::new(1000, 0));
        assert_eq!(op.fee, Decimal::new(30, 0));
        assert_eq!(op.net_value, Decimal::new(970, 0));
        assert_eq!(engine.get_operation(op.id).unwrap(), op);
    }

    #[test]
    fn create_operation_for_missing_receiver() {
        let engine = engine();
        let err = engine
            .create_operation(ReceiverId(1), Decimal::new(1000, 0))
            .unwrap_err();
        assert!(matches!(err, LedgerError::ReceiverNotFound(ReceiverId(1))));
        assert_eq!(err.http_status(), 404);
    }

    #[test]
    fn submit_operation_rejects_bad_input_before_any_write() {
        let engine = engine();
        engine.create_receiver("Acme").unwrap();
        for input in [
            CreateOperationInput::new(1, 0),
            CreateOperationInput::new(1, -50),
            CreateOperationInput {
                receiver_id: None,
                gross_value: Some(json!(100)),
            },
        ] {
            let err = engine.submit_operation(&input).unwrap_err();
            assert!(matches!(err, LedgerError::InvalidInput { .. }), "Got: {err:?}");
        }
        assert_eq!(engine.store().operation_count().unwrap(), 0);
    }

    #[test]
    fn create_operation_enforces_gross_bounds() {
        let engine = engine();
        let receiver = engine.create_receiver("Acme").unwrap();
        for gross in [
            Decimal::new(100_000_000_000_000_000, 0),
            Decimal::new(1, 9),
            Decimal::ZERO,
        ] {
            let err = engine.create_operation(receiver.id, gross).unwrap_err();
            assert!(
                matches!(err, LedgerError::InvalidInput { field: "gross_value", .. }),
                "gross={gross}, got {err:?}"
            );
        }
        assert_eq!(engine.store().operation_count().unwrap(), 0);
    }

    #[test]
    fn submit_operation_coerces_strings() {
        let engine = engine();
        let receiver = engine.create_receiver("Acme").unwrap();
        let op = engine
            .submit_operation(&CreateOperationInput::new("1", "500"))
            .unwrap();
        assert_eq!(op.receiver_id, receiver.id);
        assert_eq!(op.fee, Decimal::new(15, 0));
        assert_eq!(op.net_value, Decimal::new(485, 0));
    }

    #[test]
    fn confirm_credits_net_value_once() {
        let engine = engine();
        let receiver = engine.create_receiver("Acme").unwrap();
        let op = engine
            .create_operation(receiver.id, Decimal::new(1000, 0))
            .unwrap();

        let confirmed = engine.confirm_operation(op.id).unwrap();
        assert_eq!(confirmed.status, OperationStatus::Confirmed);
        assert_eq!(
            engine.get_receiver(receiver.id).unwrap().balance,
            Decimal::new(970, 0)
        );

        let err = engine.confirm_operation(op.id).unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyConfirmed(id) if id == op.id));
        assert_eq!(err.http_status(), 400);
        assert_eq!(
            engine.get_receiver(receiver.id).unwrap().balance,
            Decimal::new(970, 0)
        );
        engine.verify_receiver_balance(receiver.id).unwrap();
    }

    #[test]
    fn confirm_missing_operation() {
        let engine = engine();
        let receiver = engine.create_receiver("Acme").unwrap();
        let err = engine.confirm_operation(OperationId(42)).unwrap_err();
        assert!(matches!(err, LedgerError::OperationNotFound(OperationId(42))));
        assert_eq!(engine.get_receiver(receiver.id).unwrap().balance, Decimal::ZERO);
    }

    #[test]
    fn statement_lists_newest_first() {
        let engine = engine();
        let receiver = engine.create_receiver("Acme").unwrap();
        let a = engine.create_operation(receiver.id, Decimal::new(1000, 0)).unwrap();
        let b = engine.create_operation(receiver.id, Decimal::new(500, 0)).unwrap();

        let statement = engine.get_receiver_statement(receiver.id).unwrap();
        let ids: Vec<OperationId> = statement.operations.iter().map(|op| op.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
        assert!(matches!(
            engine.get_receiver_statement(ReceiverId(99)).unwrap_err(),
            LedgerError::ReceiverNotFound(_)
        ));
    }

    #[test]
    fn open_memory_engine_and_shut_down() {
        let config = LedgerConfig::from_json(r#"{"store": {"backend": "memory"}}"#).unwrap();
        let engine = SettlementEngine::open(&config).unwrap();
        let receiver = engine.create_receiver("Acme").unwrap();
        assert_eq!(receiver.id, ReceiverId(1));
        engine.shutdown().unwrap();
    }
}
