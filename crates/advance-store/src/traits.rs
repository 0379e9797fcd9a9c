use advance_types::{Operation, OperationId, OperationStatus, Receiver, ReceiverId, Result};
use rust_decimal::Decimal;

/// Persistence boundary consumed by the Settlement Engine.
///
/// Writes that target a row that does not exist fail with
/// `ReceiverNotFound` / `OperationNotFound`; reads return `None` instead.
pub trait LedgerStore: Send + Sync {
    /// Insert a receiver with zero balance. `name` is stored as given.
    fn create_receiver(&self, name: &str) -> Result<Receiver>;

    fn get_receiver(&self, id: ReceiverId) -> Result<Option<Receiver>>;

    fn set_receiver_balance(&self, id: ReceiverId, balance: Decimal) -> Result<()>;

    /// Insert a pending operation and return the row as stored, including
    /// its assigned id and `created_at`.
    fn create_operation(
        &self,
        receiver_id: ReceiverId,
        gross_value: Decimal,
        fee: Decimal,
        net_value: Decimal,
    ) -> Result<Operation>;

    fn get_operation(&self, id: OperationId) -> Result<Option<Operation>>;

    /// Unconditionally overwrite an operation's status.
    fn set_operation_status(&self, id: OperationId, status: OperationStatus) -> Result<()>;

    /// Set `status = new` only if it currently equals `expected`.
    /// Returns whether the row changed.
    fn compare_and_set_operation_status(
        &self,
        id: OperationId,
        expected: OperationStatus,
        new: OperationStatus,
    ) -> Result<bool>;

    /// Flip a pending operation to confirmed and credit its net value to the
    /// owning receiver, as one unit: either both changes become visible or
    /// neither does.
    ///
    /// Returns the receiver with its new balance, or `None` if the operation
    /// was not pending (nothing is written).
    ///
    /// # Errors
    /// `OperationNotFound` / `ReceiverNotFound` when either row is missing;
    /// nothing is written in that case.
    fn confirm_and_credit(&self, id: OperationId) -> Result<Option<Receiver>>;

    /// Operations of one receiver, `created_at` descending (ties by id
    /// descending). Unknown receivers yield an empty list.
    fn list_operations_by_receiver(&self, id: ReceiverId) -> Result<Vec<Operation>>;
}
