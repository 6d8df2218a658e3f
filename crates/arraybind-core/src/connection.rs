//! Connection, transaction and array-bind traits

use crate::{ArrayBindCommand, QueryResult, Result, StatementResult, Value};
use async_trait::async_trait;

/// A target that can run an array-bind command in a single round trip.
///
/// Implementations must bind the command's arrays positionally, in the order
/// they are stored, and must never resolve parameters by name. The returned
/// `affected_rows` is whatever the back end reports for the whole batch.
#[async_trait]
pub trait ArrayBinder: Send + Sync {
    /// Execute `command` once against all of its parameter rows
    async fn execute_array(&self, command: &ArrayBindCommand) -> Result<StatementResult>;
}

/// A database connection
#[async_trait]
pub trait Connection: ArrayBinder {
    /// Get the driver name (e.g., "sqlite")
    fn driver_name(&self) -> &str;

    /// Execute a statement that modifies data (INSERT/UPDATE/DELETE)
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult>;

    /// Execute a query that returns rows (SELECT)
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Begin a transaction
    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>>;

    /// Close the connection
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;
}

/// A database transaction
#[async_trait]
pub trait Transaction: ArrayBinder {
    /// Commit the transaction
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> Result<()>;

    /// Execute a query within the transaction
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Execute a statement within the transaction
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult>;
}
