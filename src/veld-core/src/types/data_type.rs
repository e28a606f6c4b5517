//! Data type definitions for Veld columns.

use arrow_schema::DataType as ArrowDataType;
use serde::{Deserialize, Serialize};

/// Data type of a column.
///
/// The engine supports a closed set of primitive types; every column the
/// event loop touches carries one of these, so the per-row hot path never
/// needs dynamic dispatch to read a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Boolean type.
    Bool,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point.
    Float64,
    /// UTF-8 string.
    String,
}

impl DataType {
    /// Check if this type is numeric.
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int64 | Self::Float64)
    }

    /// Get the display name for this type.
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Bool => "Bool",
            Self::Int64 => "Int64",
            Self::Float64 => "Float64",
            Self::String => "String",
        }
    }

    /// Check if a column of this type can be read as `target`.
    ///
    /// The only implicit coercion is the widening `Int64` to `Float64`.
    pub fn can_coerce_to(&self, target: &Self) -> bool {
        self == target || matches!((self, target), (Self::Int64, Self::Float64))
    }

    /// Get the corresponding Arrow data type.
    pub const fn to_arrow(&self) -> ArrowDataType {
        match self {
            Self::Bool => ArrowDataType::Boolean,
            Self::Int64 => ArrowDataType::Int64,
            Self::Float64 => ArrowDataType::Float64,
            Self::String => ArrowDataType::Utf8,
        }
    }

    /// Map an Arrow data type onto the supported set, if possible.
    pub fn from_arrow(arrow: &ArrowDataType) -> Option<Self> {
        match arrow {
            ArrowDataType::Boolean => Some(Self::Bool),
            ArrowDataType::Int64 => Some(Self::Int64),
            ArrowDataType::Float64 => Some(Self::Float64),
            ArrowDataType::Utf8 => Some(Self::String),
            _ => None,
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_coercion() {
        assert!(DataType::Int64.can_coerce_to(&DataType::Float64));
        assert!(DataType::Float64.can_coerce_to(&DataType::Float64));
        assert!(!DataType::Float64.can_coerce_to(&DataType::Int64));
        assert!(!DataType::String.can_coerce_to(&DataType::Int64));
    }

    #[test]
    fn test_arrow_roundtrip() {
        for dtype in [
            DataType::Bool,
            DataType::Int64,
            DataType::Float64,
            DataType::String,
        ] {
            assert_eq!(DataType::from_arrow(&dtype.to_arrow()), Some(dtype));
        }
        assert_eq!(DataType::from_arrow(&ArrowDataType::Date32), None);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(DataType::Int64.to_string(), "Int64");
        assert_eq!(DataType::String.to_string(), "String");
    }
}
