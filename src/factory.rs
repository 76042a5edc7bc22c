//! Entity factories
//!
//! A factory executes stored procedures for one entity type and turns the
//! rows into entities, honoring its active load plan. Top-level factories
//! own the call boundary: they build the [`LoadContext`], and they reset
//! the materialization cache on every exit path. Factories built with
//! [`Factory::scoped`] run inside another call's context and share its
//! connection and cache.

use std::marker::PhantomData;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::backends::SharedConnection;
use crate::database::{Command, DatabaseProvider};
use crate::error::{OrmError, OrmResult};
use crate::hydration;
use crate::loading::{GraphLoader, LoadContext, LoadPlan};
use crate::model::Entity;
use crate::parameters::ParameterSet;
use crate::transaction::TransactionManager;

/// One page of a paged query
#[derive(Debug, Clone, PartialEq)]
pub struct Page<M> {
    pub items: Vec<M>,
    pub total_rows: i64,
    pub total_pages: i64,
}

pub struct Factory<M> {
    provider: Option<DatabaseProvider>,
    attached: Option<SharedConnection>,
    scope: Option<LoadContext>,
    load_plan: Option<LoadPlan>,
    _marker: PhantomData<fn() -> M>,
}

impl<M: Entity + Default> Factory<M> {
    /// Factory opening its own connection per call, from a registered
    /// configuration
    pub fn new(connection_name: &str) -> OrmResult<Self> {
        Ok(Self {
            provider: Some(DatabaseProvider::from_name(connection_name)?),
            attached: None,
            scope: None,
            load_plan: None,
            _marker: PhantomData,
        })
    }

    /// Factory participating in an enclosing call's context. Used by
    /// relation loaders so nested loads share the caller's connection and
    /// cache.
    pub fn scoped(context: LoadContext) -> Self {
        Self {
            provider: None,
            attached: None,
            scope: Some(context),
            load_plan: None,
            _marker: PhantomData,
        }
    }

    /// Run calls over an already-open connection instead of opening one
    pub fn attach(&mut self, connection: SharedConnection) {
        self.attached = Some(connection);
    }

    /// Run calls on a transaction's connection
    pub fn attach_transaction(&mut self, transaction: &TransactionManager) {
        self.attached = Some(transaction.connection());
    }

    pub fn load_plan(&self) -> Option<&LoadPlan> {
        self.load_plan.as_ref()
    }

    /// Set the plan for subsequent load operations. Not safe to change
    /// while a call is in flight.
    pub fn set_load_plan(&mut self, plan: Option<LoadPlan>) {
        self.load_plan = plan;
    }

    /// Map the first row of a procedure's result set
    pub fn map(
        &self,
        procedure: &str,
        parameters: Option<&ParameterSet>,
        timeout: Option<Duration>,
    ) -> OrmResult<Option<M>> {
        require_name(procedure, "procedure name")?;
        let (context, top_level) = self.call_scope()?;
        let result = (|| {
            let rows = self.query(&context, procedure, parameters, timeout)?;
            match rows.first() {
                Some(row) => {
                    let mut entity: M = hydration::hydrate(row)?;
                    self.load_relations(&context, std::slice::from_mut(&mut entity))?;
                    Ok(Some(entity))
                }
                None => Ok(None),
            }
        })();
        self.finish(&context, top_level);
        result
    }

    /// Map every row of a procedure's result set, preserving order
    pub fn map_all(
        &self,
        procedure: &str,
        parameters: Option<&ParameterSet>,
        timeout: Option<Duration>,
    ) -> OrmResult<Vec<M>> {
        require_name(procedure, "procedure name")?;
        let (context, top_level) = self.call_scope()?;
        let result = (|| {
            let rows = self.query(&context, procedure, parameters, timeout)?;
            let mut entities: Vec<M> = hydration::hydrate_all(&rows)?;
            self.load_relations(&context, &mut entities)?;
            Ok(entities)
        })();
        self.finish(&context, top_level);
        result
    }

    /// Single-round-trip paged query.
    ///
    /// Reads the total row count from `count_column` of the first row and
    /// maps all rows as the page items. No rows, or rows without the count
    /// column, mean an empty page with zero totals; a count column that is
    /// present but not numeric fails with a hydration error.
    pub fn paged_query(
        &self,
        procedure: &str,
        count_column: &str,
        parameters: Option<&ParameterSet>,
        page_size: i64,
        timeout: Option<Duration>,
    ) -> OrmResult<Page<M>> {
        require_name(procedure, "procedure name")?;
        require_name(count_column, "count column name")?;
        if page_size <= 0 {
            return Err(OrmError::Argument(format!(
                "page size must be positive, got {}",
                page_size
            )));
        }
        let (context, top_level) = self.call_scope()?;
        let result = (|| {
            let rows = self.query(&context, procedure, parameters, timeout)?;
            let total_rows = match rows.first().and_then(|row| row.get(count_column)) {
                Some(value) => value.as_i64().ok_or_else(|| {
                    OrmError::Hydration(format!(
                        "count column '{}' is not numeric: {}",
                        count_column, value
                    ))
                })?,
                None => 0,
            };
            if total_rows == 0 {
                return Ok(Page {
                    items: Vec::new(),
                    total_rows: 0,
                    total_pages: 0,
                });
            }
            let mut items: Vec<M> = hydration::hydrate_all(&rows)?;
            self.load_relations(&context, &mut items)?;
            Ok(Page {
                items,
                total_rows,
                total_pages: (total_rows + page_size - 1) / page_size,
            })
        })();
        self.finish(&context, top_level);
        result
    }

    /// Execute a non-query procedure, optionally on a transaction's
    /// connection, returning the affected-row count
    pub fn execute(
        &self,
        procedure: &str,
        parameters: Option<&ParameterSet>,
        transaction: Option<&TransactionManager>,
        timeout: Option<Duration>,
    ) -> OrmResult<u64> {
        require_name(procedure, "procedure name")?;
        let command = Command::procedure(procedure)
            .with_parameters(parameters)
            .with_timeout(timeout);
        debug!(procedure, "executing procedure");
        match transaction {
            Some(tx) => {
                let connection = tx.connection();
                let affected = connection.borrow_mut().execute(&command);
                affected
            }
            None => {
                let (context, _) = self.call_scope()?;
                let connection = context.connection();
                let affected = connection.borrow_mut().execute(&command);
                affected
            }
        }
    }

    /// First column of the first row, or `Null` when the result set is
    /// empty
    pub fn execute_scalar(
        &self,
        procedure: &str,
        parameters: Option<&ParameterSet>,
        timeout: Option<Duration>,
    ) -> OrmResult<Value> {
        require_name(procedure, "procedure name")?;
        let command = Command::procedure(procedure)
            .with_parameters(parameters)
            .with_timeout(timeout);
        let (context, _) = self.call_scope()?;
        let connection = context.connection();
        let value = connection.borrow_mut().execute_scalar(&command);
        value
    }

    // Context for one call, and whether this factory owns the call
    // boundary.
    fn call_scope(&self) -> OrmResult<(LoadContext, bool)> {
        if let Some(scope) = &self.scope {
            return Ok((scope.clone(), false));
        }
        if let Some(connection) = &self.attached {
            return Ok((LoadContext::new(connection.clone()), true));
        }
        let provider = self.provider.as_ref().ok_or_else(|| {
            OrmError::Configuration("factory has no connection source".to_string())
        })?;
        Ok((LoadContext::new(provider.open()?), true))
    }

    fn query(
        &self,
        context: &LoadContext,
        procedure: &str,
        parameters: Option<&ParameterSet>,
        timeout: Option<Duration>,
    ) -> OrmResult<Vec<crate::backends::Row>> {
        let command = Command::procedure(procedure)
            .with_parameters(parameters)
            .with_timeout(timeout);
        debug!(procedure, entity = M::entity_type(), "mapping procedure");
        let connection = context.connection();
        let rows = connection.borrow_mut().execute_query(&command);
        rows
    }

    fn load_relations(&self, context: &LoadContext, entities: &mut [M]) -> OrmResult<()> {
        let plan = match &self.load_plan {
            Some(plan) if !plan.is_empty() => plan,
            _ => return Ok(()),
        };
        let loader = GraphLoader::new(context, plan);
        for entity in entities.iter_mut() {
            loader.populate(entity)?;
        }
        Ok(())
    }

    // Cache entries never survive a top-level call.
    fn finish(&self, context: &LoadContext, top_level: bool) {
        if top_level {
            context.cache().borrow_mut().reset();
        }
    }
}

fn require_name(value: &str, what: &str) -> OrmResult<()> {
    if value.is_empty() {
        return Err(OrmError::Argument(format!("{} is empty", what)));
    }
    Ok(())
}
