//! Transaction lifecycle management
//!
//! One manager drives one transaction on one connection. Going out of
//! scope with the transaction still open rolls it back.

use tracing::{debug, warn};

use crate::backends::SharedConnection;
use crate::database::DatabaseProvider;
use crate::error::{OrmError, OrmResult};

pub struct TransactionManager {
    connection: SharedConnection,
    active: bool,
    completed: bool,
}

impl TransactionManager {
    /// Open a connection to a registered configuration
    pub fn new(connection_name: &str) -> OrmResult<Self> {
        let provider = DatabaseProvider::from_name(connection_name)?;
        Ok(Self::from_connection(provider.open()?))
    }

    /// Manage a transaction on an already-open connection
    pub fn from_connection(connection: SharedConnection) -> Self {
        Self {
            connection,
            active: false,
            completed: false,
        }
    }

    pub fn begin(&mut self) -> OrmResult<()> {
        if self.active {
            return Err(OrmError::Transaction("transaction already active".to_string()));
        }
        if self.completed {
            return Err(OrmError::Transaction("transaction already completed".to_string()));
        }
        self.connection.borrow_mut().begin()?;
        self.active = true;
        debug!("transaction started");
        Ok(())
    }

    pub fn commit(&mut self) -> OrmResult<()> {
        if !self.active {
            return Err(OrmError::Transaction("no active transaction to commit".to_string()));
        }
        self.connection.borrow_mut().commit()?;
        self.active = false;
        self.completed = true;
        debug!("transaction committed");
        Ok(())
    }

    pub fn rollback(&mut self) -> OrmResult<()> {
        if !self.active {
            return Err(OrmError::Transaction("no active transaction to roll back".to_string()));
        }
        self.connection.borrow_mut().rollback()?;
        self.active = false;
        self.completed = true;
        debug!("transaction rolled back");
        Ok(())
    }

    /// Connection the transaction runs on, for enlisting statements
    pub fn connection(&self) -> SharedConnection {
        self.connection.clone()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for TransactionManager {
    fn drop(&mut self) {
        if self.active {
            warn!("transaction dropped while active, rolling back");
            match self.connection.try_borrow_mut() {
                Ok(mut connection) => {
                    if let Err(error) = connection.rollback() {
                        warn!(%error, "rollback on drop failed");
                    }
                }
                Err(_) => warn!("connection busy, rollback on drop skipped"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryDatabase;

    #[test]
    fn test_commit_lifecycle() {
        MemoryDatabase::install("transaction-commit-test").unwrap();
        let mut tx = TransactionManager::new("transaction-commit-test").unwrap();
        assert!(!tx.is_active());
        assert!(tx.commit().is_err());

        tx.begin().unwrap();
        assert!(tx.is_active());
        assert!(tx.begin().is_err());

        tx.commit().unwrap();
        assert!(!tx.is_active());
        assert!(tx.begin().is_err());
    }

    #[test]
    fn test_drop_rolls_back_active_transaction() {
        let db = MemoryDatabase::install("transaction-drop-test").unwrap();
        {
            let mut tx = TransactionManager::new("transaction-drop-test").unwrap();
            tx.begin().unwrap();
        }
        assert_eq!(db.rollbacks(), 1);
    }

    #[test]
    fn test_drop_skips_rollback_on_busy_connection() {
        let db = MemoryDatabase::install("transaction-busy-drop-test").unwrap();
        let connection = {
            let mut tx = TransactionManager::new("transaction-busy-drop-test").unwrap();
            tx.begin().unwrap();
            let connection = tx.connection();
            let _guard = connection.borrow_mut();
            drop(tx);
            connection.clone()
        };
        assert_eq!(db.rollbacks(), 0);

        // The transaction is still open on the backend.
        connection.borrow_mut().rollback().unwrap();
        assert_eq!(db.rollbacks(), 1);
    }
}
