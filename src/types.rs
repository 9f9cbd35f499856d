use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Values that can be bound as parameters or read back from a row.
///
/// The same enum is used by every driver so helper code does not need to branch on driver
/// types:
/// ```rust
/// use db_adapter::prelude::*;
///
/// let values = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = values;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            RowValues::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            RowValues::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_json(&self) -> Option<&JsonValue> {
        if let RowValues::JSON(value) = self {
            Some(value)
        } else {
            None
        }
    }
}

/// The database products a `ConfigAndPool` can be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// `SQLite` database
    #[cfg(feature = "sqlite")]
    Sqlite,
    /// `PostgreSQL` database
    #[cfg(feature = "postgres")]
    Postgres,
}

/// How the command text is interpreted by the driver.
///
/// Defaults to `StoredProcedure`, matching the text-based execution overloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Command text is a SQL statement (or several, for tabular fill).
    Text,
    /// Command text names a stored procedure (optionally schema-qualified).
    #[default]
    StoredProcedure,
}

/// Direction of a parameter relative to the command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterDirection {
    #[default]
    Input,
    Output,
    InputOutput,
    ReturnValue,
}

impl ParameterDirection {
    /// Whether the parameter carries a value into the command.
    #[must_use]
    pub fn binds_value(self) -> bool {
        matches!(self, ParameterDirection::Input | ParameterDirection::InputOutput)
    }
}

/// Physical state of the connection owned by an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Open,
}

/// Driver-neutral parameter type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DbType {
    Boolean,
    Int16,
    Int32,
    Int64,
    Single,
    Double,
    Decimal,
    String,
    AnsiString,
    Binary,
    Date,
    DateTime,
    Json,
    /// Accepts any value; the driver decides how to send it.
    Object,
}

impl DbType {
    /// Bind-time compatibility check between a type tag and a value.
    ///
    /// `Null` is accepted by every tag. Integer tags range-check their value.
    #[must_use]
    pub fn accepts(self, value: &RowValues) -> bool {
        match (self, value) {
            (_, RowValues::Null) | (DbType::Object, _) => true,
            (DbType::Boolean, RowValues::Bool(_)) => true,
            (DbType::Boolean, RowValues::Int(i)) => *i == 0 || *i == 1,
            (DbType::Int16, RowValues::Int(i)) => i16::try_from(*i).is_ok(),
            (DbType::Int32, RowValues::Int(i)) => i32::try_from(*i).is_ok(),
            (DbType::Int64, RowValues::Int(_)) => true,
            (DbType::Single | DbType::Double | DbType::Decimal, RowValues::Float(_) | RowValues::Int(_)) => true,
            (DbType::String | DbType::AnsiString, RowValues::Text(_)) => true,
            (DbType::Binary, RowValues::Blob(_)) => true,
            (DbType::Date | DbType::DateTime, RowValues::Timestamp(_) | RowValues::Text(_)) => true,
            (DbType::Json, RowValues::JSON(_) | RowValues::Text(_)) => true,
            _ => false,
        }
    }
}
