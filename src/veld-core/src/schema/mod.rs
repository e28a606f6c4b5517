//! Column schema metadata.

use common_error::{VeldError, VeldResult};
use serde::{Deserialize, Serialize};

use crate::types::DataType;

/// Name and type of a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,
    /// Column data type.
    pub dtype: DataType,
}

impl ColumnInfo {
    /// Create a new column descriptor.
    pub fn new<S: Into<String>>(name: S, dtype: DataType) -> Self {
        Self {
            name: name.into(),
            dtype,
        }
    }
}

/// Ordered set of columns with unique, non-empty names.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<ColumnInfo>,
}

impl Schema {
    /// Create a schema, validating name uniqueness.
    pub fn new(columns: Vec<ColumnInfo>) -> VeldResult<Self> {
        for (i, col) in columns.iter().enumerate() {
            if col.name.is_empty() {
                return Err(VeldError::invalid_argument("column name may not be empty"));
            }
            if columns[..i].iter().any(|c| c.name == col.name) {
                return Err(VeldError::duplicate_column(&col.name));
            }
        }
        Ok(Self { columns })
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the schema has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up a column's type by name.
    pub fn dtype(&self, name: &str) -> Option<DataType> {
        self.column(name).map(|c| c.dtype)
    }

    /// Whether a column with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Iterate the columns in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &ColumnInfo> {
        self.columns.iter()
    }

    /// The columns in declaration order.
    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_lookup() {
        let schema = Schema::new(vec![
            ColumnInfo::new("x", DataType::Int64),
            ColumnInfo::new("y", DataType::Float64),
        ])
        .unwrap();

        assert_eq!(schema.len(), 2);
        assert_eq!(schema.dtype("x"), Some(DataType::Int64));
        assert_eq!(schema.dtype("y"), Some(DataType::Float64));
        assert!(schema.dtype("z").is_none());
        assert!(schema.contains("x"));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let err = Schema::new(vec![
            ColumnInfo::new("x", DataType::Int64),
            ColumnInfo::new("x", DataType::Float64),
        ])
        .unwrap_err();
        assert!(matches!(err, VeldError::DuplicateColumn(_)));
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(Schema::new(vec![ColumnInfo::new("", DataType::Bool)]).is_err());
    }
}
