//! Database backend abstraction
//!
//! `Connection` is the synchronous row-source primitive the rest of the
//! crate consumes: execute a procedure-or-text command and get rows back,
//! plus transaction control. `Backend` turns a named connection
//! configuration into live connections and is registered per provider name.
//!
//! Two implementations ship with the crate: a scriptable in-memory backend
//! (also the test double) and a PostgreSQL backend over the blocking
//! `postgres` client.

pub mod memory;
pub mod postgres;
mod row;

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use crate::database::{Command, ConnectionConfig};
use crate::error::OrmResult;

pub use memory::MemoryDatabase;
pub use postgres::PostgresBackend;
pub use row::Row;

/// A live, synchronous database connection
pub trait Connection {
    /// Execute a command and return all result rows
    fn execute_query(&mut self, command: &Command) -> OrmResult<Vec<Row>>;

    /// Execute a command that returns no result set; yields rows affected
    fn execute(&mut self, command: &Command) -> OrmResult<u64>;

    /// Execute a command and return the first column of the first row,
    /// `Value::Null` when the result set is empty
    fn execute_scalar(&mut self, command: &Command) -> OrmResult<Value> {
        let rows = self.execute_query(command)?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(Row::into_first_value)
            .unwrap_or(Value::Null))
    }

    /// Begin a transaction on this connection
    fn begin(&mut self) -> OrmResult<()>;

    /// Commit the active transaction
    fn commit(&mut self) -> OrmResult<()>;

    /// Roll back the active transaction
    fn rollback(&mut self) -> OrmResult<()>;
}

/// A connection shared through one synchronous call tree.
///
/// Deliberately `Rc`-based and `!Send`: per-call state must not cross
/// threads. The connection closes when the last holder drops it.
pub type SharedConnection = Rc<RefCell<Box<dyn Connection>>>;

/// Wrap a fresh connection for sharing down a call tree
pub fn share(connection: Box<dyn Connection>) -> SharedConnection {
    Rc::new(RefCell::new(connection))
}

/// Factory for connections of one provider kind
pub trait Backend: Send + Sync {
    /// Open a connection for the given configuration
    fn connect(&self, config: &ConnectionConfig) -> OrmResult<Box<dyn Connection>>;
}
