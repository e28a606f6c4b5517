//! JSONL table files.
//!
//! A table file is a header line naming the table and its column schema,
//! followed by one JSON array per row:
//!
//! ```text
//! {"table":"events","columns":[{"name":"x","dtype":"Int64"}]}
//! [0]
//! [1]
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanBuilder, Float64Builder, Int64Builder, StringBuilder,
};
use serde::{Deserialize, Serialize};

use common_error::{VeldError, VeldResult};
use veld_core::{ColumnInfo, DataType, Value};

use crate::memory::MemoryStore;
use crate::sink::TableSink;

#[derive(Debug, Serialize, Deserialize)]
struct TableHeader {
    table: String,
    columns: Vec<ColumnInfo>,
}

/// A [`TableSink`] that streams rows to a JSONL table file.
pub struct JsonlSink {
    writer: BufWriter<File>,
    columns: Vec<ColumnInfo>,
    rows: u64,
}

impl JsonlSink {
    /// Create the file and write the table header.
    pub fn create<P: AsRef<Path>>(
        table: &str,
        path: P,
        columns: &[ColumnInfo],
    ) -> VeldResult<Self> {
        if table.is_empty() {
            return Err(VeldError::invalid_argument("table name may not be empty"));
        }
        let mut writer = BufWriter::new(File::create(path)?);
        let header = TableHeader {
            table: table.to_string(),
            columns: columns.to_vec(),
        };
        serde_json::to_writer(&mut writer, &header)?;
        writer.write_all(b"\n")?;
        Ok(Self {
            writer,
            columns: columns.to_vec(),
            rows: 0,
        })
    }
}

impl TableSink for JsonlSink {
    fn append_row(&mut self, values: &[Value]) -> VeldResult<()> {
        if values.len() != self.columns.len() {
            return Err(VeldError::internal(format!(
                "sink declared {} columns but received {} values",
                self.columns.len(),
                values.len()
            )));
        }
        let row: Vec<serde_json::Value> = values.iter().map(value_to_json).collect();
        serde_json::to_writer(&mut self.writer, &row)?;
        self.writer.write_all(b"\n")?;
        self.rows += 1;
        Ok(())
    }

    fn finish(&mut self) -> VeldResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn rows_written(&self) -> u64 {
        self.rows
    }
}

/// Load a JSONL table file back into a [`MemoryStore`].
///
/// Returns the table name recorded in the header together with the store.
pub fn read_table<P: AsRef<Path>>(path: P) -> VeldResult<(String, MemoryStore)> {
    let path: PathBuf = path.as_ref().into();
    let mut lines = BufReader::new(File::open(&path)?).lines();
    let header_line = lines
        .next()
        .ok_or_else(|| VeldError::execution(format!("{}: empty table file", path.display())))??;
    let header: TableHeader = serde_json::from_str(&header_line)?;

    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); header.columns.len()];
    for line in lines {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let row: Vec<serde_json::Value> = serde_json::from_str(&line)?;
        if row.len() != header.columns.len() {
            return Err(VeldError::execution(format!(
                "{}: row has {} values, header declares {} columns",
                path.display(),
                row.len(),
                header.columns.len()
            )));
        }
        for ((cell, info), column) in row.iter().zip(&header.columns).zip(&mut columns) {
            column.push(value_from_json(cell, info.dtype)?);
        }
    }

    let arrays = header
        .columns
        .iter()
        .zip(columns)
        .map(|(info, values)| Ok((info.name.clone(), build_column(info.dtype, &values)?)))
        .collect::<VeldResult<Vec<_>>>()?;
    Ok((header.table, MemoryStore::from_columns(arrays)?))
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Bool(b) => serde_json::Value::from(*b),
        Value::Int64(i) => serde_json::Value::from(*i),
        Value::Float64(f) => serde_json::Value::from(*f),
        Value::String(s) => serde_json::Value::from(s.as_str()),
    }
}

fn value_from_json(cell: &serde_json::Value, dtype: DataType) -> VeldResult<Value> {
    let parsed = match dtype {
        DataType::Bool => cell.as_bool().map(Value::Bool),
        DataType::Int64 => cell.as_i64().map(Value::Int64),
        DataType::Float64 => cell.as_f64().map(Value::Float64),
        DataType::String => cell.as_str().map(Value::from),
    };
    parsed.ok_or_else(|| {
        VeldError::type_mismatch(format!("cannot read JSON value {cell} as {dtype}"))
    })
}

fn build_column(dtype: DataType, values: &[Value]) -> VeldResult<ArrayRef> {
    let array: ArrayRef = match dtype {
        DataType::Bool => {
            let mut builder = BooleanBuilder::with_capacity(values.len());
            for value in values {
                builder.append_value(value.as_bool().ok_or_else(|| mixed_column(value, dtype))?);
            }
            Arc::new(builder.finish())
        }
        DataType::Int64 => {
            let mut builder = Int64Builder::with_capacity(values.len());
            for value in values {
                builder.append_value(value.as_int64().ok_or_else(|| mixed_column(value, dtype))?);
            }
            Arc::new(builder.finish())
        }
        DataType::Float64 => {
            let mut builder = Float64Builder::with_capacity(values.len());
            for value in values {
                builder
                    .append_value(value.as_float64().ok_or_else(|| mixed_column(value, dtype))?);
            }
            Arc::new(builder.finish())
        }
        DataType::String => {
            let mut builder = StringBuilder::new();
            for value in values {
                builder.append_value(value.as_str().ok_or_else(|| mixed_column(value, dtype))?);
            }
            Arc::new(builder.finish())
        }
    };
    Ok(array)
}

fn mixed_column(value: &Value, dtype: DataType) -> VeldError {
    VeldError::type_mismatch(format!("{} value in {dtype} column", value.type_name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ColumnStore;
    use tempfile::tempdir;

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let columns = vec![
            ColumnInfo::new("x", DataType::Int64),
            ColumnInfo::new("label", DataType::String),
        ];

        let mut sink = JsonlSink::create("events", &path, &columns).unwrap();
        for i in 0..4i64 {
            sink.append_row(&[Value::Int64(i), Value::String(format!("row{i}"))])
                .unwrap();
        }
        sink.finish().unwrap();
        assert_eq!(sink.rows_written(), 4);

        let (table, store) = read_table(&path).unwrap();
        assert_eq!(table, "events");
        assert_eq!(store.row_count(), 4);
        let reader = store.reader("label").unwrap();
        assert_eq!(reader.read(0, 2), Value::String("row2".to_string()));
    }

    #[test]
    fn test_empty_table_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.jsonl");
        let columns = vec![ColumnInfo::new("x", DataType::Float64)];

        let mut sink = JsonlSink::create("t", &path, &columns).unwrap();
        sink.finish().unwrap();

        let (_, store) = read_table(&path).unwrap();
        assert_eq!(store.row_count(), 0);
        assert_eq!(store.schema().dtype("x"), Some(DataType::Float64));
    }

    #[test]
    fn test_row_width_mismatch_rejected() {
        let columns = vec![ColumnInfo::new("x", DataType::Int64)];
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.jsonl");
        let mut sink = JsonlSink::create("t", &path, &columns).unwrap();
        let err = sink
            .append_row(&[Value::Int64(1), Value::Int64(2)])
            .unwrap_err();
        assert!(err.to_string().contains("declared 1 columns"));
    }

    #[test]
    fn test_type_mismatch_on_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        std::fs::write(
            &path,
            "{\"table\":\"t\",\"columns\":[{\"name\":\"x\",\"dtype\":\"Int64\"}]}\n[\"oops\"]\n",
        )
        .unwrap();
        assert!(matches!(
            read_table(&path).unwrap_err(),
            VeldError::TypeMismatch(_)
        ));
    }
}
