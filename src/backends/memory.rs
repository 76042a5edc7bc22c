//! In-memory backend with scripted procedures
//!
//! Each installed database holds a handler per procedure name, call
//! counters, and a transaction journal. Non-query executions are journaled
//! while a transaction is open and only become visible in `committed` after
//! a commit, so tests can assert full-rollback and exactly-once-commit
//! behavior. One transaction can be active per database at a time.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::backends::{Backend, Connection, Row};
use crate::database::{self, Command, ConnectionConfig};
use crate::error::{OrmError, OrmResult};
use crate::parameters::Parameter;

type Handler = Box<dyn Fn(&[Parameter]) -> Vec<Row> + Send>;

#[derive(Default)]
struct MemoryState {
    handlers: HashMap<String, Handler>,
    fail_on: HashMap<String, HashSet<usize>>,
    calls: HashMap<String, usize>,
    committed: Vec<(String, Vec<Parameter>)>,
    journal: Vec<(String, Vec<Parameter>)>,
    in_transaction: bool,
    connections_opened: usize,
    begins: usize,
    commits: usize,
    rollbacks: usize,
}

impl MemoryState {
    fn next_call(&mut self, procedure: &str) -> OrmResult<()> {
        let count = self.calls.entry(procedure.to_string()).or_insert(0);
        *count += 1;
        let ordinal = *count;
        if self
            .fail_on
            .get(procedure)
            .map(|set| set.contains(&ordinal))
            .unwrap_or(false)
        {
            return Err(OrmError::Database(format!(
                "scripted failure for '{}' on call {}",
                procedure, ordinal
            )));
        }
        Ok(())
    }
}

static INSTANCES: Lazy<DashMap<String, Arc<Mutex<MemoryState>>>> = Lazy::new(DashMap::new);

/// Handle to one installed in-memory database
#[derive(Clone)]
pub struct MemoryDatabase {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDatabase {
    /// Install a database under a connection name.
    ///
    /// Registers the `memory` backend and a connection configuration whose
    /// URL routes back to this instance, then returns the scripting handle.
    pub fn install(name: &str) -> OrmResult<MemoryDatabase> {
        let state = Arc::new(Mutex::new(MemoryState::default()));
        INSTANCES.insert(name.to_string(), state.clone());
        database::register_backend("memory", Arc::new(MemoryBackend));
        database::register_connection(name, ConnectionConfig::new("memory", &format!("memory://{}", name)))?;
        Ok(MemoryDatabase { state })
    }

    /// Script a handler for a procedure
    pub fn script<F>(&self, procedure: &str, handler: F)
    where
        F: Fn(&[Parameter]) -> Vec<Row> + Send + 'static,
    {
        self.lock().handlers.insert(procedure.to_string(), Box::new(handler));
    }

    /// Script a fixed result set for a procedure
    pub fn script_rows(&self, procedure: &str, rows: Vec<Row>) {
        self.script(procedure, move |_| rows.clone());
    }

    /// Make the nth call (1-based, per procedure) fail
    pub fn fail_on_call(&self, procedure: &str, call: usize) {
        self.lock()
            .fail_on
            .entry(procedure.to_string())
            .or_default()
            .insert(call);
    }

    /// How many times a procedure has been executed
    pub fn call_count(&self, procedure: &str) -> usize {
        self.lock().calls.get(procedure).copied().unwrap_or(0)
    }

    /// How many non-query executions of a procedure are committed
    pub fn committed_count(&self, procedure: &str) -> usize {
        self.lock()
            .committed
            .iter()
            .filter(|(name, _)| name == procedure)
            .count()
    }

    pub fn connections_opened(&self) -> usize {
        self.lock().connections_opened
    }

    pub fn begins(&self) -> usize {
        self.lock().begins
    }

    pub fn commits(&self) -> usize {
        self.lock().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.lock().rollbacks
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Backend routing `memory://<name>` URLs to installed instances
pub struct MemoryBackend;

impl Backend for MemoryBackend {
    fn connect(&self, config: &ConnectionConfig) -> OrmResult<Box<dyn Connection>> {
        let key = config
            .url
            .strip_prefix("memory://")
            .ok_or_else(|| OrmError::Configuration(format!("invalid memory url '{}'", config.url)))?;
        let state = INSTANCES
            .get(key)
            .map(|entry| entry.clone())
            .ok_or_else(|| {
                OrmError::Configuration(format!("no memory database installed as '{}'", key))
            })?;
        lock(&state).connections_opened += 1;
        Ok(Box::new(MemoryConnection { state }))
    }
}

struct MemoryConnection {
    state: Arc<Mutex<MemoryState>>,
}

fn lock(state: &Arc<Mutex<MemoryState>>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Connection for MemoryConnection {
    fn execute_query(&mut self, command: &Command) -> OrmResult<Vec<Row>> {
        let mut state = lock(&self.state);
        state.next_call(&command.text)?;
        let handler = state.handlers.get(&command.text).ok_or_else(|| {
            OrmError::Database(format!("no scripted result for '{}'", command.text))
        })?;
        Ok(handler(&command.parameters))
    }

    fn execute(&mut self, command: &Command) -> OrmResult<u64> {
        let mut state = lock(&self.state);
        state.next_call(&command.text)?;
        let record = (command.text.clone(), command.parameters.clone());
        if state.in_transaction {
            state.journal.push(record);
        } else {
            state.committed.push(record);
        }
        Ok(1)
    }

    fn begin(&mut self) -> OrmResult<()> {
        let mut state = lock(&self.state);
        if state.in_transaction {
            return Err(OrmError::Transaction("transaction already active".to_string()));
        }
        state.in_transaction = true;
        state.begins += 1;
        Ok(())
    }

    fn commit(&mut self) -> OrmResult<()> {
        let mut state = lock(&self.state);
        if !state.in_transaction {
            return Err(OrmError::Transaction("no active transaction".to_string()));
        }
        let journal = std::mem::take(&mut state.journal);
        state.committed.extend(journal);
        state.in_transaction = false;
        state.commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> OrmResult<()> {
        let mut state = lock(&self.state);
        if !state.in_transaction {
            return Err(OrmError::Transaction("no active transaction".to_string()));
        }
        state.journal.clear();
        state.in_transaction = false;
        state.rollbacks += 1;
        Ok(())
    }
}
