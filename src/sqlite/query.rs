use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rusqlite::fallible_iterator::FallibleIterator;
use rusqlite::types::Value;
use rusqlite::{Batch, Connection, Statement};

use super::params::{Binding, bind_parameters};
use crate::command::Command;
use crate::error::DbAdapterError;
use crate::results::{DataSet, ResultSet};
use crate::types::{CommandKind, RowValues};

/// Extract a `RowValues` from a `SQLite` row.
///
/// # Errors
///
/// Returns `DbAdapterError` if the value cannot be converted.
pub fn sqlite_extract_value_sync(
    row: &rusqlite::Row,
    idx: usize,
) -> Result<RowValues, DbAdapterError> {
    let value: Value = row.get(idx)?;
    match value {
        Value::Null => Ok(RowValues::Null),
        Value::Integer(i) => Ok(RowValues::Int(i)),
        Value::Real(f) => Ok(RowValues::Float(f)),
        Value::Text(s) => Ok(RowValues::Text(s)),
        Value::Blob(b) => Ok(RowValues::Blob(b)),
    }
}

/// Raised by the connection's canceller; shared with the blocking worker.
pub(crate) type AbortFlag = Arc<AtomicBool>;

/// Refuse to start stepping once the canceller has fired.
pub(crate) fn ensure_not_aborted(aborted: &AtomicBool) -> Result<(), DbAdapterError> {
    if aborted.load(Ordering::SeqCst) {
        return Err(DbAdapterError::ExecutionError(
            "sqlite statement interrupted before it started".into(),
        ));
    }
    Ok(())
}

/// Refill `values` with the current row, reusing its allocation.
pub(crate) fn read_row_into(
    row: &rusqlite::Row,
    width: usize,
    values: &mut Vec<RowValues>,
) -> Result<(), DbAdapterError> {
    values.clear();
    for idx in 0..width {
        values.push(sqlite_extract_value_sync(row, idx)?);
    }
    Ok(())
}

fn read_row(row: &rusqlite::Row, width: usize) -> Result<Vec<RowValues>, DbAdapterError> {
    let mut values = Vec::with_capacity(width);
    read_row_into(row, width, &mut values)?;
    Ok(values)
}

pub(crate) fn column_names(stmt: &Statement<'_>) -> Vec<String> {
    stmt.column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect()
}

/// SQL text to run for a command; `SQLite` has no stored procedures.
fn statement_text(command: &Command) -> Result<&str, DbAdapterError> {
    match command.kind() {
        CommandKind::Text => Ok(command.text()),
        CommandKind::StoredProcedure => Err(DbAdapterError::Unimplemented(format!(
            "sqlite has no stored procedures (command '{}')",
            command.text()
        ))),
    }
}

/// Prepare a single statement and bind the command's parameters to it.
///
/// # Errors
/// Returns `DbAdapterError` if the text cannot be prepared or a parameter cannot be bound.
pub fn prepare_bound<'c>(
    conn: &'c Connection,
    command: &Command,
) -> Result<Statement<'c>, DbAdapterError> {
    let mut stmt = conn.prepare(statement_text(command)?)?;
    bind_parameters(&mut stmt, command.parameters(), Binding::Strict)?;
    Ok(stmt)
}

/// First column of the first row.
///
/// # Errors
/// Returns `DbAdapterError` if preparation, binding or execution fails.
pub fn scalar(
    conn: &Connection,
    command: &Command,
    aborted: &AtomicBool,
) -> Result<Option<RowValues>, DbAdapterError> {
    let mut stmt = prepare_bound(conn, command)?;
    let width = stmt.column_count();
    ensure_not_aborted(aborted)?;
    let mut rows = stmt.raw_query();
    match rows.next()? {
        Some(row) if width > 0 => Ok(Some(sqlite_extract_value_sync(row, 0)?)),
        _ => Ok(None),
    }
}

/// Run a statement to completion and report the rows it changed.
///
/// `changes()` keeps the count of the last row-modifying statement, so a statement that
/// modified nothing (DDL, SELECT) is detected through `total_changes()` and reports zero.
///
/// # Errors
/// Returns `DbAdapterError` if preparation, binding or execution fails.
pub fn non_query(
    conn: &Connection,
    command: &Command,
    aborted: &AtomicBool,
) -> Result<u64, DbAdapterError> {
    let mut stmt = prepare_bound(conn, command)?;
    let before = conn.total_changes();
    ensure_not_aborted(aborted)?;
    if stmt.column_count() == 0 {
        stmt.raw_execute()?;
    } else {
        let mut rows = stmt.raw_query();
        while rows.next()?.is_some() {}
    }
    drop(stmt);
    if conn.total_changes() == before {
        Ok(0)
    } else {
        Ok(conn.changes() as u64)
    }
}

/// Build a table from a prepared statement that returns rows.
///
/// # Errors
/// Returns `DbAdapterError` if stepping or value extraction fails.
pub fn build_result_set(stmt: &mut Statement<'_>) -> Result<ResultSet, DbAdapterError> {
    let column_names = Arc::new(column_names(stmt));
    let width = column_names.len();
    let mut result_set = ResultSet::with_capacity(10);
    result_set.set_column_names(column_names);

    let mut rows = stmt.raw_query();
    while let Some(row) = rows.next()? {
        result_set.add_row_values(read_row(row, width)?);
    }
    Ok(result_set)
}

/// Run every statement of the command text; each row-returning statement becomes a table.
///
/// Parameters are offered to every statement and bound where a placeholder matches.
///
/// # Errors
/// Returns `DbAdapterError` on the first statement that fails.
pub fn fill(
    conn: &Connection,
    command: &Command,
    aborted: &AtomicBool,
) -> Result<DataSet, DbAdapterError> {
    let mut batch = Batch::new(conn, statement_text(command)?);
    let mut data_set = DataSet::new();
    while let Some(mut stmt) = batch.next()? {
        bind_parameters(&mut stmt, command.parameters(), Binding::Lenient)?;
        ensure_not_aborted(aborted)?;
        if stmt.column_count() == 0 {
            stmt.raw_execute()?;
        } else {
            data_set.push_table(build_result_set(&mut stmt)?);
        }
    }
    Ok(data_set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Parameter;
    use crate::types::DbType;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (id INTEGER PRIMARY KEY, x INTEGER);
             INSERT INTO t (id) VALUES (1), (2), (3);",
        )
        .unwrap();
        conn
    }

    fn text(sql: &str) -> Command {
        Command::new(sql, CommandKind::Text)
    }

    #[test]
    fn raised_abort_flag_keeps_a_write_from_starting() {
        let conn = conn();
        let aborted = AtomicBool::new(true);
        let err = non_query(&conn, &text("DELETE FROM t"), &aborted).unwrap_err();
        assert!(matches!(err, DbAdapterError::ExecutionError(_)));

        let clear = AtomicBool::new(false);
        let left = scalar(&conn, &text("SELECT COUNT(*) FROM t"), &clear).unwrap();
        assert_eq!(left, Some(RowValues::Int(3)));
    }

    #[test]
    fn ddl_after_dml_reports_zero_changes() {
        let conn = conn();
        let clear = AtomicBool::new(false);
        assert_eq!(non_query(&conn, &text("UPDATE t SET x = 1"), &clear).unwrap(), 3);
        assert_eq!(non_query(&conn, &text("CREATE TABLE u (a INTEGER)"), &clear).unwrap(), 0);
        assert_eq!(non_query(&conn, &text("DROP TABLE u"), &clear).unwrap(), 0);
        assert_eq!(non_query(&conn, &text("SELECT * FROM t"), &clear).unwrap(), 0);
        let cmd = text("DELETE FROM t WHERE id = :id")
            .with_parameters(vec![Parameter::new("id", DbType::Int32, RowValues::Int(2))]);
        assert_eq!(non_query(&conn, &cmd, &clear).unwrap(), 1);
    }

    #[test]
    fn fill_stops_before_the_next_statement_once_aborted() {
        let conn = conn();
        let aborted = AtomicBool::new(true);
        assert!(fill(&conn, &text("DELETE FROM t; SELECT id FROM t;"), &aborted).is_err());
        let clear = AtomicBool::new(false);
        let data = fill(&conn, &text("SELECT id FROM t ORDER BY id"), &clear).unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data.tables[0].len(), 3);
    }
}
