//! Columnar storage layer for Veld.
//!
//! The engine consumes storage through two narrow seams:
//! - [`ColumnStore`] / [`ColumnReader`] for random-access typed reads, and
//! - [`TableSink`] for writing a snapshot of a processed stream.
//!
//! This crate ships one implementation of each: the Arrow-backed
//! [`MemoryStore`] and the JSONL-file [`JsonlSink`] (with [`read_table`]
//! loading a written table back into a `MemoryStore`).

pub mod jsonl;
pub mod memory;
pub mod sink;

pub use jsonl::{read_table, JsonlSink};
pub use memory::MemoryStore;
pub use sink::TableSink;

use common_error::VeldResult;
use veld_core::{DataType, Schema, Value};

/// A readable columnar source of `N` rows.
///
/// Implementations must support concurrent `reader` calls and concurrent
/// reads at distinct row indices; the engine binds one reader per column
/// per processing slot.
pub trait ColumnStore: Send + Sync {
    /// Number of rows in the store.
    fn row_count(&self) -> u64;

    /// Column names and types.
    fn schema(&self) -> &Schema;

    /// Ordered default column list, possibly empty.
    fn default_columns(&self) -> &[String];

    /// Bind a reader to the named column. Fails with `UnknownColumn`.
    fn reader(&self, name: &str) -> VeldResult<Box<dyn ColumnReader>>;
}

/// A bound, typed, random-access reader for one column.
pub trait ColumnReader: Send + Sync {
    /// Type of the values this reader yields.
    fn dtype(&self) -> DataType;

    /// Read the value at `row` for the given processing slot.
    fn read(&self, slot: usize, row: u64) -> Value;
}

impl std::fmt::Debug for dyn ColumnReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnReader")
            .field("dtype", &self.dtype())
            .finish()
    }
}
