use rusqlite::Statement;
use rusqlite::types::Value;

use crate::error::DbAdapterError;
use crate::params::Parameter;
use crate::types::RowValues;

const NAMED_PREFIXES: [char; 3] = [':', '@', '$'];

/// How strictly parameters must line up with a statement's placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Every bound parameter must land on a placeholder.
    Strict,
    /// Parameters without a placeholder in this statement are skipped (multi-statement fill).
    Lenient,
}

/// Convert a single `RowValue` to a rusqlite `Value`.
#[must_use]
pub fn row_value_to_sqlite_value(value: &RowValues) -> Value {
    match value {
        RowValues::Int(i) => Value::Integer(*i),
        RowValues::Float(f) => Value::Real(*f),
        RowValues::Text(s) => Value::Text(s.clone()),
        RowValues::Bool(b) => Value::Integer(i64::from(*b)),
        RowValues::Timestamp(dt) => Value::Text(dt.format("%F %T%.f").to_string()),
        RowValues::Null => Value::Null,
        RowValues::JSON(jval) => Value::Text(jval.to_string()),
        RowValues::Blob(bytes) => Value::Blob(bytes.clone()),
    }
}

/// Bind every value-carrying parameter to `stmt`.
///
/// A parameter whose name matches a `:name`, `@name` or `$name` placeholder binds there.
/// Otherwise it takes the next position, which is only allowed when the statement uses
/// anonymous (`?` / `?NNN`) placeholders.
///
/// # Errors
/// Returns `DbAdapterError::ParameterError` for a type mismatch or, in strict mode, a
/// parameter with nowhere to go.
pub fn bind_parameters(
    stmt: &mut Statement<'_>,
    params: &[Parameter],
    binding: Binding,
) -> Result<(), DbAdapterError> {
    let placeholder_count = stmt.parameter_count();
    let positional_only = (1..=placeholder_count).all(|idx| {
        stmt.parameter_name(idx)
            .is_none_or(|name| name.starts_with('?'))
    });
    let mut position = 0usize;

    for param in params {
        param.check_binding()?;
        if !param.direction().binds_value() {
            continue;
        }
        position += 1;

        let index = match named_index(stmt, param.name())? {
            Some(idx) => idx,
            None if positional_only && position <= placeholder_count => position,
            None if binding == Binding::Lenient => continue,
            None => {
                return Err(DbAdapterError::ParameterError(format!(
                    "no placeholder for parameter '{}' (statement has {placeholder_count})",
                    param.name()
                )));
            }
        };
        stmt.raw_bind_parameter(index, row_value_to_sqlite_value(param.value()))?;
    }
    Ok(())
}

fn named_index(stmt: &Statement<'_>, name: &str) -> Result<Option<usize>, DbAdapterError> {
    if name.is_empty() {
        return Ok(None);
    }
    if name.starts_with(NAMED_PREFIXES) {
        return Ok(stmt.parameter_index(name)?);
    }
    for prefix in NAMED_PREFIXES {
        if let Some(idx) = stmt.parameter_index(&format!("{prefix}{name}"))? {
            return Ok(Some(idx));
        }
    }
    Ok(None)
}
