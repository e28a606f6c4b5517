//! Runtime value representation.

use common_error::{VeldError, VeldResult};
use serde::{Deserialize, Serialize};

use super::DataType;

/// Runtime value of a column cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit floating point.
    Float64(f64),
    /// UTF-8 string.
    String(String),
}

impl Value {
    /// Get the data type of this value.
    pub const fn dtype(&self) -> DataType {
        match self {
            Self::Bool(_) => DataType::Bool,
            Self::Int64(_) => DataType::Int64,
            Self::Float64(_) => DataType::Float64,
            Self::String(_) => DataType::String,
        }
    }

    /// Get the type name for error messages.
    pub const fn type_name(&self) -> &'static str {
        self.dtype().display_name()
    }

    /// Try to get as boolean.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i64.
    pub const fn as_int64(&self) -> Option<i64> {
        match self {
            Self::Int64(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as f64. `Int64` widens.
    pub const fn as_float64(&self) -> Option<f64> {
        match self {
            Self::Float64(f) => Some(*f),
            Self::Int64(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get as string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int64(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float64(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

/// Typed extraction from a [`Value`], used to bind user callables to
/// column values. Implementations carry the static column type so the
/// builder can type-check a callable against the schema at registration.
pub trait FromValue: Sized + Send + 'static {
    /// The column type this Rust type reads from.
    const DTYPE: DataType;

    /// Extract the typed value.
    fn from_value(value: Value) -> VeldResult<Self>;
}

/// Typed injection into a [`Value`], used for derived-column producers.
pub trait IntoValue: Send + 'static {
    /// The column type this Rust type produces.
    const DTYPE: DataType;

    /// Wrap into a value.
    fn into_value(self) -> Value;
}

fn extraction_error(expected: DataType, got: &Value) -> VeldError {
    VeldError::type_mismatch(format!(
        "expected {expected}, got {}",
        got.type_name()
    ))
}

impl FromValue for bool {
    const DTYPE: DataType = DataType::Bool;

    fn from_value(value: Value) -> VeldResult<Self> {
        value
            .as_bool()
            .ok_or_else(|| extraction_error(<Self as FromValue>::DTYPE, &value))
    }
}

impl FromValue for i64 {
    const DTYPE: DataType = DataType::Int64;

    fn from_value(value: Value) -> VeldResult<Self> {
        value
            .as_int64()
            .ok_or_else(|| extraction_error(<Self as FromValue>::DTYPE, &value))
    }
}

impl FromValue for f64 {
    const DTYPE: DataType = DataType::Float64;

    fn from_value(value: Value) -> VeldResult<Self> {
        value
            .as_float64()
            .ok_or_else(|| extraction_error(<Self as FromValue>::DTYPE, &value))
    }
}

impl FromValue for String {
    const DTYPE: DataType = DataType::String;

    fn from_value(value: Value) -> VeldResult<Self> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(extraction_error(<Self as FromValue>::DTYPE, &other)),
        }
    }
}

impl IntoValue for bool {
    const DTYPE: DataType = DataType::Bool;

    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl IntoValue for i64 {
    const DTYPE: DataType = DataType::Int64;

    fn into_value(self) -> Value {
        Value::Int64(self)
    }
}

impl IntoValue for f64 {
    const DTYPE: DataType = DataType::Float64;

    fn into_value(self) -> Value {
        Value::Float64(self)
    }
}

impl IntoValue for String {
    const DTYPE: DataType = DataType::String;

    fn into_value(self) -> Value {
        Value::String(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::from(42i64).as_int64(), Some(42));
        assert_eq!(Value::from(2.5f64).as_float64(), Some(2.5));
        assert_eq!(Value::from("hello").as_str(), Some("hello"));
        assert_eq!(Value::from(true).as_bool(), Some(true));
    }

    #[test]
    fn test_int_widens_to_float() {
        assert_eq!(Value::Int64(3).as_float64(), Some(3.0));
        assert_eq!(f64::from_value(Value::Int64(3)).unwrap(), 3.0);
    }

    #[test]
    fn test_from_value_mismatch() {
        let err = i64::from_value(Value::String("x".into())).unwrap_err();
        assert!(err.to_string().contains("expected Int64"));
    }

    #[test]
    fn test_dtype() {
        assert_eq!(Value::Bool(false).dtype(), DataType::Bool);
        assert_eq!(Value::Float64(0.0).dtype(), DataType::Float64);
        assert_eq!(i64::into_value(7).as_int64(), Some(7));
    }
}
