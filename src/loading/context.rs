//! Call-scoped load context
//!
//! One context exists per top-level materialization call. It carries the
//! shared connection, the materialization cache, and the recursion depth,
//! and is cloned down the recursive call tree so every loader in the tree
//! observes the same transactional view and cache. Deliberately not `Send`;
//! a call tree stays on one thread.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::backends::SharedConnection;
use crate::loading::MaterializationCache;

#[derive(Clone)]
pub struct LoadContext {
    connection: SharedConnection,
    cache: Rc<RefCell<MaterializationCache>>,
    depth: Rc<Cell<usize>>,
}

impl LoadContext {
    pub fn new(connection: SharedConnection) -> Self {
        Self {
            connection,
            cache: Rc::new(RefCell::new(MaterializationCache::new())),
            depth: Rc::new(Cell::new(0)),
        }
    }

    pub fn connection(&self) -> SharedConnection {
        self.connection.clone()
    }

    pub fn cache(&self) -> &RefCell<MaterializationCache> {
        &self.cache
    }

    /// Current relation recursion depth
    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    pub fn enter(&self) {
        self.depth.set(self.depth.get() + 1);
    }

    pub fn leave(&self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }

    /// Context over a connection that fails every operation. Lets registry
    /// and plan tests run without a database.
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        use crate::backends::{share, Connection, Row};
        use crate::database::Command;
        use crate::error::{OrmError, OrmResult};

        struct Disconnected;

        impl Connection for Disconnected {
            fn execute_query(&mut self, _command: &Command) -> OrmResult<Vec<Row>> {
                Err(OrmError::Database("no connection".to_string()))
            }

            fn execute(&mut self, _command: &Command) -> OrmResult<u64> {
                Err(OrmError::Database("no connection".to_string()))
            }

            fn begin(&mut self) -> OrmResult<()> {
                Err(OrmError::Database("no connection".to_string()))
            }

            fn commit(&mut self) -> OrmResult<()> {
                Err(OrmError::Database("no connection".to_string()))
            }

            fn rollback(&mut self) -> OrmResult<()> {
                Err(OrmError::Database("no connection".to_string()))
            }
        }

        Self::new(share(Box::new(Disconnected)))
    }
}
