//! PostgreSQL backend
//!
//! Stored procedures render as `SELECT * FROM name($1, ...)` for result-set
//! calls and `CALL name($1, ...)` for non-query executions. Only input
//! parameters are bound; output parameters are carried on the command for
//! signature purposes but are not sent to the server.

use postgres::types::{ToSql, Type};
use postgres::{Client, NoTls};
use serde_json::Value;

use crate::backends::{Backend, Connection, Row};
use crate::database::{Command, CommandKind, ConnectionConfig};
use crate::error::{OrmError, OrmResult};
use crate::parameters::{Parameter, ParameterDirection};

/// Backend for `postgres://` connection URLs
pub struct PostgresBackend;

impl Backend for PostgresBackend {
    fn connect(&self, config: &ConnectionConfig) -> OrmResult<Box<dyn Connection>> {
        let client = Client::connect(&config.url, NoTls)?;
        Ok(Box::new(PostgresConnection { client }))
    }
}

struct PostgresConnection {
    client: Client,
}

impl PostgresConnection {
    fn run<T>(
        &mut self,
        command: &Command,
        call: impl FnOnce(&mut Client, &str, &[&(dyn ToSql + Sync)]) -> OrmResult<T>,
        is_query: bool,
    ) -> OrmResult<T> {
        let inputs: Vec<&Parameter> = command
            .parameters
            .iter()
            .filter(|p| p.direction == ParameterDirection::Input)
            .collect();
        let sql = render_sql(command, inputs.len(), is_query);
        let values: Vec<Box<dyn ToSql + Sync>> =
            inputs.iter().map(|p| sql_value(&p.value)).collect();
        let refs: Vec<&(dyn ToSql + Sync)> = values.iter().map(|v| v.as_ref()).collect();

        if let Some(timeout) = command.timeout {
            self.client
                .batch_execute(&format!("SET statement_timeout = {}", timeout.as_millis()))?;
            let result = call(&mut self.client, &sql, &refs);
            // Restore the session default even when the statement failed.
            let reset = self.client.batch_execute("SET statement_timeout = DEFAULT");
            let value = result?;
            reset?;
            Ok(value)
        } else {
            call(&mut self.client, &sql, &refs)
        }
    }
}

impl Connection for PostgresConnection {
    fn execute_query(&mut self, command: &Command) -> OrmResult<Vec<Row>> {
        self.run(
            command,
            |client, sql, params| {
                let rows = client.query(sql, params)?;
                rows.iter().map(convert_row).collect()
            },
            true,
        )
    }

    fn execute(&mut self, command: &Command) -> OrmResult<u64> {
        self.run(
            command,
            |client, sql, params| Ok(client.execute(sql, params)?),
            false,
        )
    }

    fn begin(&mut self) -> OrmResult<()> {
        Ok(self.client.batch_execute("BEGIN")?)
    }

    fn commit(&mut self) -> OrmResult<()> {
        Ok(self.client.batch_execute("COMMIT")?)
    }

    fn rollback(&mut self) -> OrmResult<()> {
        Ok(self.client.batch_execute("ROLLBACK")?)
    }
}

fn render_sql(command: &Command, input_count: usize, is_query: bool) -> String {
    match command.kind {
        CommandKind::Text => command.text.clone(),
        CommandKind::Procedure => {
            let placeholders: Vec<String> = (1..=input_count).map(|i| format!("${}", i)).collect();
            let args = placeholders.join(", ");
            if is_query {
                format!("SELECT * FROM {}({})", command.text, args)
            } else {
                format!("CALL {}({})", command.text, args)
            }
        }
    }
}

fn sql_value(value: &Value) -> Box<dyn ToSql + Sync> {
    match value {
        Value::Null => Box::new(None::<String>),
        Value::Bool(flag) => Box::new(*flag),
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                Box::new(int)
            } else {
                Box::new(number.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(text) => Box::new(text.clone()),
        other => Box::new(other.clone()),
    }
}

fn convert_row(row: &postgres::Row) -> OrmResult<Row> {
    let mut converted = Row::new();
    for (index, column) in row.columns().iter().enumerate() {
        let value = convert_cell(row, index, column.type_())?;
        converted.push(column.name(), value);
    }
    Ok(converted)
}

fn convert_cell(row: &postgres::Row, index: usize, ty: &Type) -> OrmResult<Value> {
    fn read<'a, T>(row: &'a postgres::Row, index: usize) -> OrmResult<Option<T>>
    where
        T: postgres::types::FromSql<'a>,
    {
        Ok(row.try_get::<_, Option<T>>(index)?)
    }

    let value = if *ty == Type::BOOL {
        read::<bool>(row, index)?.map(Value::from)
    } else if *ty == Type::INT2 {
        read::<i16>(row, index)?.map(Value::from)
    } else if *ty == Type::INT4 {
        read::<i32>(row, index)?.map(Value::from)
    } else if *ty == Type::INT8 {
        read::<i64>(row, index)?.map(Value::from)
    } else if *ty == Type::FLOAT4 {
        read::<f32>(row, index)?.map(Value::from)
    } else if *ty == Type::FLOAT8 {
        read::<f64>(row, index)?.map(Value::from)
    } else if *ty == Type::TEXT || *ty == Type::VARCHAR || *ty == Type::BPCHAR || *ty == Type::NAME
    {
        read::<String>(row, index)?.map(Value::from)
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        read::<Value>(row, index)?
    } else if *ty == Type::UUID {
        read::<uuid::Uuid>(row, index)?.map(|id| Value::from(id.to_string()))
    } else if *ty == Type::TIMESTAMP {
        read::<chrono::NaiveDateTime>(row, index)?.map(|ts| Value::from(ts.to_string()))
    } else if *ty == Type::TIMESTAMPTZ {
        read::<chrono::DateTime<chrono::Utc>>(row, index)?.map(|ts| Value::from(ts.to_rfc3339()))
    } else if *ty == Type::DATE {
        read::<chrono::NaiveDate>(row, index)?.map(|date| Value::from(date.to_string()))
    } else {
        return Err(OrmError::Database(format!(
            "unsupported column type '{}'",
            ty.name()
        )));
    };
    Ok(value.unwrap_or(Value::Null))
}
