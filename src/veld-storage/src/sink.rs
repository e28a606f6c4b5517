//! Sink seam for writing a table out of the engine.

use common_error::VeldResult;
use veld_core::Value;

/// A writable columnar sink.
///
/// The engine creates a sink with a fixed column layout, appends one row at
/// a time, and calls `finish` exactly once when the stream ends.
pub trait TableSink: Send {
    /// Append one row. `values` has one entry per declared column.
    fn append_row(&mut self, values: &[Value]) -> VeldResult<()>;

    /// Flush and close the sink.
    fn finish(&mut self) -> VeldResult<()>;

    /// Rows appended so far.
    fn rows_written(&self) -> u64;
}
