use std::error::Error;

use tokio_postgres::Statement;
use tokio_postgres::types::{IsNull, Kind, ToSql, Type, to_sql_checked};
use tokio_util::bytes;

use crate::error::DbAdapterError;
use crate::params::Parameter;
use crate::types::RowValues;

impl ToSql for RowValues {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            RowValues::Int(i) => match *ty {
                Type::INT2 => i16::try_from(*i)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql(ty, out),
                #[allow(clippy::cast_precision_loss)]
                Type::FLOAT4 => (*i as f32).to_sql(ty, out),
                #[allow(clippy::cast_precision_loss)]
                Type::FLOAT8 => (*i as f64).to_sql(ty, out),
                _ => (*i).to_sql(ty, out),
            },
            RowValues::Float(f) => match *ty {
                #[allow(clippy::cast_possible_truncation)]
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                _ => (*f).to_sql(ty, out),
            },
            RowValues::Text(s) => s.to_sql(ty, out),
            RowValues::Bool(b) => (*b).to_sql(ty, out),
            RowValues::Timestamp(dt) => match *ty {
                Type::DATE => dt.date().to_sql(ty, out),
                _ => dt.to_sql(ty, out),
            },
            RowValues::Null => Ok(IsNull::Yes),
            RowValues::JSON(jsval) => jsval.to_sql(ty, out),
            RowValues::Blob(bytes) => bytes.to_sql(ty, out),
        }
    }

    fn accepts(ty: &Type) -> bool {
        match *ty {
            Type::INT2 | Type::INT4 | Type::INT8 => true,
            Type::FLOAT4 | Type::FLOAT8 => true,
            Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => true,
            Type::BOOL => true,
            Type::TIMESTAMP | Type::TIMESTAMPTZ | Type::DATE => true,
            Type::JSON | Type::JSONB => true,
            Type::BYTEA => true,
            _ => match ty.kind() {
                // Enums travel as their label text; domains as their base type.
                Kind::Enum(_) => true,
                Kind::Domain(inner) => <RowValues as ToSql>::accepts(inner),
                _ => false,
            },
        }
    }

    to_sql_checked!();
}

/// Match value-carrying parameters to the prepared statement's `$n` slots, in order.
///
/// Names are not used: Postgres placeholders are positional. A custom-typed parameter must
/// name the type the server inferred for its slot.
///
/// # Errors
/// Returns `DbAdapterError::ParameterError` for a count mismatch, a type tag that does not
/// accept its value, or a custom type name the server disagrees with.
pub fn bound_values<'p>(
    stmt: &Statement,
    params: &'p [Parameter],
) -> Result<Vec<&'p RowValues>, DbAdapterError> {
    let bound: Vec<&Parameter> = params
        .iter()
        .filter(|p| p.direction().binds_value())
        .collect();
    let slots = stmt.params();
    if bound.len() != slots.len() {
        return Err(DbAdapterError::ParameterError(format!(
            "statement expects {} parameters, {} supplied",
            slots.len(),
            bound.len()
        )));
    }

    let mut values = Vec::with_capacity(bound.len());
    for (param, slot) in bound.into_iter().zip(slots) {
        param.check_binding()?;
        if let Some(type_name) = param.custom_type_name() {
            if !type_matches(type_name, slot) {
                return Err(DbAdapterError::ParameterError(format!(
                    "parameter '{}' declared as {type_name} but the server expects {}.{}",
                    param.name(),
                    slot.schema(),
                    slot.name()
                )));
            }
        }
        values.push(param.value());
    }
    Ok(values)
}

/// Compare a (possibly schema-qualified) type name with a server type.
fn type_matches(type_name: &str, ty: &Type) -> bool {
    match type_name.rsplit_once('.') {
        Some((schema, name)) => schema == ty.schema() && name == ty.name(),
        None => type_name == ty.name(),
    }
}

/// Stored procedure call text with one `$n` placeholder per bound parameter.
#[must_use]
pub fn procedure_placeholders(params: &[Parameter]) -> String {
    let count = params.iter().filter(|p| p.direction().binds_value()).count();
    (1..=count)
        .map(|n| format!("${n}"))
        .collect::<Vec<_>>()
        .join(", ")
}
