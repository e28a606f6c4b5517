//! Snapshot action: writes the surviving stream to a new table store.

use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use common_error::{VeldError, VeldResult};
use veld_core::{ColumnInfo, Value};
use veld_storage::{read_table, JsonlSink, MemoryStore, TableSink};

use super::{downcast_partial, ActionDef, ActionPartial};
use crate::result::ResultCell;

/// Buffers surviving rows per slot, streams them in slot order into a
/// [`JsonlSink`] at merge time, then loads the written table back as a
/// fresh store. Row order is source order under sequential execution.
pub(crate) struct SnapshotDef {
    table: String,
    path: PathBuf,
    columns: Vec<ColumnInfo>,
    cell: Arc<ResultCell<Arc<MemoryStore>>>,
}

impl SnapshotDef {
    pub(crate) fn new(
        table: String,
        path: PathBuf,
        columns: Vec<ColumnInfo>,
        cell: Arc<ResultCell<Arc<MemoryStore>>>,
    ) -> Self {
        Self {
            table,
            path,
            columns,
            cell,
        }
    }
}

impl ActionDef for SnapshotDef {
    fn make_partial(&self) -> Box<dyn ActionPartial> {
        Box::new(SnapshotPartial { rows: Vec::new() })
    }

    fn finalize(&self, partials: Vec<Box<dyn ActionPartial>>) -> VeldResult<()> {
        let mut sink = JsonlSink::create(&self.table, &self.path, &self.columns)?;
        for partial in partials {
            for row in &downcast_partial::<SnapshotPartial>(partial)?.rows {
                sink.append_row(row)?;
            }
        }
        sink.finish()?;
        debug!(
            table = %self.table,
            path = %self.path.display(),
            rows = sink.rows_written(),
            "snapshot written"
        );

        let (_, store) = read_table(&self.path)?;
        let defaults: Vec<String> = self.columns.iter().map(|c| c.name.clone()).collect();
        let store = store.with_default_columns(defaults).map_err(|err| {
            VeldError::execution(format!("snapshot store rejected its own columns: {err}"))
        })?;
        self.cell.set(Arc::new(store));
        Ok(())
    }
}

struct SnapshotPartial {
    rows: Vec<Vec<Value>>,
}

impl ActionPartial for SnapshotPartial {
    fn exec(&mut self, _slot: usize, _row: u64, values: &[Value]) -> VeldResult<()> {
        self.rows.push(values.to_vec());
        Ok(())
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veld_core::DataType;
    use veld_storage::ColumnStore;

    #[test]
    fn test_snapshot_writes_slots_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.jsonl");
        let cell = Arc::new(ResultCell::new());
        let def = SnapshotDef::new(
            "snap".into(),
            path,
            vec![ColumnInfo::new("x", DataType::Int64)],
            cell.clone(),
        );

        let mut a = def.make_partial();
        let mut b = def.make_partial();
        b.exec(1, 5, &[Value::Int64(5)]).unwrap();
        a.exec(0, 0, &[Value::Int64(0)]).unwrap();
        a.exec(0, 1, &[Value::Int64(1)]).unwrap();
        def.finalize(vec![a, b]).unwrap();

        let store = cell.get_clone().unwrap();
        assert_eq!(store.row_count(), 3);
        assert_eq!(store.default_columns(), &["x"]);
        let reader = store.reader("x").unwrap();
        assert_eq!(reader.read(0, 0), Value::Int64(0));
        assert_eq!(reader.read(0, 2), Value::Int64(5));
    }
}
