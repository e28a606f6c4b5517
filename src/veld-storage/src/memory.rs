//! In-memory Arrow-backed column store.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{Field, Schema as ArrowSchema};
use arrow::record_batch::RecordBatch;

use common_error::{VeldError, VeldResult};
use veld_core::{ColumnInfo, DataType, Schema, Value};

use crate::{ColumnReader, ColumnStore};

/// A column store over an Arrow [`RecordBatch`].
///
/// Readers are bound by downcasting the backing array once; the per-row
/// read is a direct indexed access into the concrete array.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    batch: RecordBatch,
    schema: Schema,
    defaults: Vec<String>,
}

impl MemoryStore {
    /// Wrap a record batch.
    ///
    /// Fails with `TypeMismatch` for column types outside the supported
    /// set and with `InvalidArgument` for columns containing nulls.
    pub fn try_new(batch: RecordBatch) -> VeldResult<Self> {
        let mut columns = Vec::with_capacity(batch.num_columns());
        for (field, array) in batch.schema_ref().fields().iter().zip(batch.columns()) {
            let dtype = DataType::from_arrow(field.data_type()).ok_or_else(|| {
                VeldError::type_mismatch(format!(
                    "column '{}' has unsupported type {}",
                    field.name(),
                    field.data_type()
                ))
            })?;
            if array.null_count() > 0 {
                return Err(VeldError::invalid_argument(format!(
                    "column '{}' contains nulls",
                    field.name()
                )));
            }
            columns.push(ColumnInfo::new(field.name(), dtype));
        }
        Ok(Self {
            batch,
            schema: Schema::new(columns)?,
            defaults: Vec::new(),
        })
    }

    /// Build a store from named arrays of equal length.
    pub fn from_columns<I, S>(columns: I) -> VeldResult<Self>
    where
        I: IntoIterator<Item = (S, ArrayRef)>,
        S: Into<String>,
    {
        let (fields, arrays): (Vec<_>, Vec<_>) = columns
            .into_iter()
            .map(|(name, array)| {
                let field = Field::new(name, array.data_type().clone(), false);
                (field, array)
            })
            .unzip();
        let batch = RecordBatch::try_new(Arc::new(ArrowSchema::new(fields)), arrays)?;
        Self::try_new(batch)
    }

    /// Attach an ordered default column list.
    ///
    /// Builder operations complete short column lists from this list.
    pub fn with_default_columns<S: Into<String>>(
        mut self,
        defaults: impl IntoIterator<Item = S>,
    ) -> VeldResult<Self> {
        let defaults: Vec<String> = defaults.into_iter().map(Into::into).collect();
        for name in &defaults {
            if !self.schema.contains(name) {
                return Err(VeldError::unknown_column(name));
            }
        }
        self.defaults = defaults;
        Ok(self)
    }

    /// The backing record batch.
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }
}

impl ColumnStore for MemoryStore {
    fn row_count(&self) -> u64 {
        self.batch.num_rows() as u64
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn default_columns(&self) -> &[String] {
        &self.defaults
    }

    fn reader(&self, name: &str) -> VeldResult<Box<dyn ColumnReader>> {
        let info = self
            .schema
            .column(name)
            .ok_or_else(|| VeldError::unknown_column(name))?;
        let array = self
            .batch
            .column_by_name(name)
            .ok_or_else(|| VeldError::unknown_column(name))?;
        let reader: Box<dyn ColumnReader> = match info.dtype {
            DataType::Bool => Box::new(BoolReader(downcast::<BooleanArray>(array, name)?)),
            DataType::Int64 => Box::new(Int64Reader(downcast::<Int64Array>(array, name)?)),
            DataType::Float64 => Box::new(Float64Reader(downcast::<Float64Array>(array, name)?)),
            DataType::String => Box::new(StringReader(downcast::<StringArray>(array, name)?)),
        };
        Ok(reader)
    }
}

fn downcast<A: Array + Clone + 'static>(array: &ArrayRef, name: &str) -> VeldResult<A> {
    array
        .as_any()
        .downcast_ref::<A>()
        .cloned()
        .ok_or_else(|| {
            VeldError::internal(format!("column '{name}' backed by unexpected array type"))
        })
}

struct BoolReader(BooleanArray);

impl ColumnReader for BoolReader {
    fn dtype(&self) -> DataType {
        DataType::Bool
    }

    fn read(&self, _slot: usize, row: u64) -> Value {
        Value::Bool(self.0.value(row as usize))
    }
}

struct Int64Reader(Int64Array);

impl ColumnReader for Int64Reader {
    fn dtype(&self) -> DataType {
        DataType::Int64
    }

    fn read(&self, _slot: usize, row: u64) -> Value {
        Value::Int64(self.0.value(row as usize))
    }
}

struct Float64Reader(Float64Array);

impl ColumnReader for Float64Reader {
    fn dtype(&self) -> DataType {
        DataType::Float64
    }

    fn read(&self, _slot: usize, row: u64) -> Value {
        Value::Float64(self.0.value(row as usize))
    }
}

struct StringReader(StringArray);

impl ColumnReader for StringReader {
    fn dtype(&self) -> DataType {
        DataType::String
    }

    fn read(&self, _slot: usize, row: u64) -> Value {
        Value::String(self.0.value(row as usize).to_string())
    }
}
