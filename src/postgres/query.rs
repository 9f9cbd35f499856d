use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use futures_util::StreamExt;
use serde_json::Value;
use tokio_postgres::{Row, RowStream, Statement};

use super::params::procedure_placeholders;
use crate::command::Command;
use crate::driver::DriverRows;
use crate::error::DbAdapterError;
use crate::results::ResultSet;
use crate::types::{CommandKind, RowValues};

/// Which execution shape a stored procedure call is issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallShape {
    Rows,
    NonQuery,
}

/// SQL text to prepare for a command.
///
/// Stored procedures run as `CALL name(..)` when only the affected count matters and as
/// `SELECT * FROM name(..)` when rows are wanted.
#[must_use]
pub fn statement_text(command: &Command, shape: CallShape) -> String {
    match command.kind() {
        CommandKind::Text => command.text().to_string(),
        CommandKind::StoredProcedure => {
            let args = procedure_placeholders(command.parameters());
            match shape {
                CallShape::NonQuery => format!("CALL {}({args})", command.text()),
                CallShape::Rows => format!("SELECT * FROM {}({args})", command.text()),
            }
        }
    }
}

/// Extracts a `RowValues` from a `tokio_postgres` Row at the given index.
///
/// # Errors
/// Returns `DbAdapterError` if the column cannot be retrieved.
pub fn postgres_extract_value(row: &Row, idx: usize) -> Result<RowValues, DbAdapterError> {
    let type_info = row.columns()[idx].type_();

    match type_info.name() {
        "int2" => {
            let val: Option<i16> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))))
        }
        "int4" => {
            let val: Option<i32> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))))
        }
        "int8" => {
            let val: Option<i64> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Int))
        }
        "float4" => {
            let val: Option<f32> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| RowValues::Float(f64::from(v))))
        }
        "float8" => {
            let val: Option<f64> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Float))
        }
        "bool" => {
            let val: Option<bool> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Bool))
        }
        "timestamp" => {
            let val: Option<NaiveDateTime> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Timestamp))
        }
        "timestamptz" => {
            let val: Option<chrono::DateTime<chrono::Utc>> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| RowValues::Timestamp(v.naive_utc())))
        }
        "date" => {
            let val: Option<NaiveDate> = row.try_get(idx)?;
            Ok(val
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map_or(RowValues::Null, RowValues::Timestamp))
        }
        "json" | "jsonb" => {
            let val: Option<Value> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::JSON))
        }
        "bytea" => {
            let val: Option<Vec<u8>> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Blob))
        }
        _ => {
            // text, varchar, bpchar, name and anything else that decodes as a string
            let val: Option<String> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Text))
        }
    }
}

fn read_row(row: &Row, values: &mut Vec<RowValues>) -> Result<(), DbAdapterError> {
    values.clear();
    for idx in 0..row.len() {
        values.push(postgres_extract_value(row, idx)?);
    }
    Ok(())
}

pub(crate) fn column_names(stmt: &Statement) -> Vec<String> {
    stmt.columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect()
}

/// Build a result set using statement metadata for column names.
///
/// # Errors
/// Returns errors from row value extraction.
pub fn build_result_set_from_statement(
    stmt: &Statement,
    rows: &[Row],
) -> Result<ResultSet, DbAdapterError> {
    let mut result_set = ResultSet::with_capacity(rows.len());
    result_set.set_column_names(Arc::new(column_names(stmt)));

    for row in rows {
        let mut row_values = Vec::with_capacity(row.len());
        read_row(row, &mut row_values)?;
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}

/// Rows streamed straight from the server as they arrive.
pub struct PgRows {
    columns: Arc<Vec<String>>,
    stream: Option<Pin<Box<RowStream>>>,
}

impl PgRows {
    pub(crate) fn new(columns: Vec<String>, stream: RowStream) -> Self {
        Self {
            columns: Arc::new(columns),
            stream: Some(Box::pin(stream)),
        }
    }
}

#[async_trait]
impl DriverRows for PgRows {
    fn columns(&self) -> Arc<Vec<String>> {
        Arc::clone(&self.columns)
    }

    async fn read_into(&mut self, values: &mut Vec<RowValues>) -> Result<bool, DbAdapterError> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(false);
        };
        match stream.next().await {
            Some(Ok(row)) => {
                read_row(&row, values)?;
                Ok(true)
            }
            Some(Err(err)) => {
                self.stream = None;
                Err(err.into())
            }
            None => {
                self.stream = None;
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Parameter;
    use crate::types::DbType;

    #[test]
    fn stored_procedures_map_to_call_or_select() {
        let cmd = Command::new("app.touch", CommandKind::StoredProcedure).with_parameters(vec![
            Parameter::new("id", DbType::Int32, RowValues::Int(1)),
            Parameter::new("note", DbType::String, RowValues::Text("x".into())),
        ]);
        assert_eq!(statement_text(&cmd, CallShape::NonQuery), "CALL app.touch($1, $2)");
        assert_eq!(
            statement_text(&cmd, CallShape::Rows),
            "SELECT * FROM app.touch($1, $2)"
        );

        let text = Command::new("SELECT 1", CommandKind::Text);
        assert_eq!(statement_text(&text, CallShape::Rows), "SELECT 1");
    }
}
