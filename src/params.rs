//! Parameter descriptors.
//!
//! A [`Parameter`] is immutable once built. Nothing here validates that the type tag and the
//! value agree: drivers run [`Parameter::check_binding`] when they bind, so a mismatch surfaces
//! as a query failure from the execution call rather than from the builder.

use serde::{Deserialize, Serialize};

use crate::error::DbAdapterError;
use crate::types::{DbType, ParameterDirection, RowValues};

/// Type of a parameter: a driver-neutral tag or a driver-specific type name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterType {
    Native(DbType),
    Custom(String),
}

/// A named, typed value bound to a command.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    value: RowValues,
    direction: ParameterDirection,
    param_type: ParameterType,
}

impl Parameter {
    /// Input parameter with a native type tag.
    pub fn new(name: impl Into<String>, db_type: DbType, value: RowValues) -> Self {
        Self::with_direction(name, db_type, value, ParameterDirection::Input)
    }

    /// Parameter with an explicit direction, honored verbatim.
    pub fn with_direction(
        name: impl Into<String>,
        db_type: DbType,
        value: RowValues,
        direction: ParameterDirection,
    ) -> Self {
        Self {
            name: name.into(),
            value,
            direction,
            param_type: ParameterType::Native(db_type),
        }
    }

    /// Input parameter typed by a driver-specific type name.
    ///
    /// Prefer [`CustomTypeParameterFactory`] so the driver can normalize the name.
    pub fn custom(type_name: impl Into<String>, name: impl Into<String>, value: RowValues) -> Self {
        Self {
            name: name.into(),
            value,
            direction: ParameterDirection::Input,
            param_type: ParameterType::Custom(type_name.into()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> &RowValues {
        &self.value
    }

    #[must_use]
    pub fn direction(&self) -> ParameterDirection {
        self.direction
    }

    #[must_use]
    pub fn param_type(&self) -> &ParameterType {
        &self.param_type
    }

    /// Custom type name, if this parameter carries one.
    #[must_use]
    pub fn custom_type_name(&self) -> Option<&str> {
        match &self.param_type {
            ParameterType::Custom(name) => Some(name),
            ParameterType::Native(_) => None,
        }
    }

    /// Check the value against a native type tag. Custom types are left to the driver.
    ///
    /// # Errors
    /// Returns `DbAdapterError::ParameterError` when the value cannot be sent as the tagged type.
    pub fn check_binding(&self) -> Result<(), DbAdapterError> {
        match &self.param_type {
            ParameterType::Native(db_type) if !db_type.accepts(&self.value) => {
                Err(DbAdapterError::ParameterError(format!(
                    "parameter '{}' declared as {db_type:?} cannot bind {:?}",
                    self.name, self.value
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Plain record form of an input parameter: name, type tag and value.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub db_type: DbType,
    pub value: RowValues,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, db_type: DbType, value: RowValues) -> Self {
        Self {
            name: name.into(),
            db_type,
            value,
        }
    }
}

impl From<ParamSpec> for Parameter {
    fn from(spec: ParamSpec) -> Self {
        Parameter::new(spec.name, spec.db_type, spec.value)
    }
}

/// Build input parameters from records, preserving order.
#[must_use]
pub fn build_parameters(specs: &[ParamSpec]) -> Vec<Parameter> {
    specs.iter().cloned().map(Parameter::from).collect()
}

/// Capability implemented by drivers that know how to type a parameter by name
/// (structured types, domains, table-valued types and so on).
pub trait CustomTypeParameterFactory {
    fn create_custom_parameter(&self, type_name: &str, name: &str, value: RowValues) -> Parameter;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_build_input_parameters_in_order() {
        let params = build_parameters(&[
            ParamSpec::new("id", DbType::Int32, RowValues::Int(7)),
            ParamSpec::new("name", DbType::String, RowValues::Text("bob".into())),
        ]);
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].name(), "id");
        assert_eq!(params[1].name(), "name");
        assert!(params.iter().all(|p| p.direction() == ParameterDirection::Input));
    }

    #[test]
    fn explicit_direction_is_kept() {
        let p = Parameter::with_direction(
            "total",
            DbType::Int64,
            RowValues::Null,
            ParameterDirection::Output,
        );
        assert_eq!(p.direction(), ParameterDirection::Output);
        assert!(!p.direction().binds_value());
    }

    #[test]
    fn binding_check_rejects_mismatched_values() {
        let bad = Parameter::new("id", DbType::Int32, RowValues::Text("seven".into()));
        assert!(matches!(
            bad.check_binding(),
            Err(DbAdapterError::ParameterError(_))
        ));

        let too_wide = Parameter::new("small", DbType::Int16, RowValues::Int(70_000));
        assert!(too_wide.check_binding().is_err());

        let null = Parameter::new("id", DbType::Int32, RowValues::Null);
        assert!(null.check_binding().is_ok());

        let custom = Parameter::custom("my_type", "payload", RowValues::Text("x".into()));
        assert!(custom.check_binding().is_ok());
        assert_eq!(custom.custom_type_name(), Some("my_type"));
        assert_eq!(custom.name(), "payload");
    }
}
