//! Lazy, declarative, slot-parallel event processing over columnar data.
//!
//! Users compose a graph of row-wise transformations and terminal
//! actions on a [`DataFrame`]; nothing touches the data until a result is
//! materialized, and then a single pass over the source satisfies every
//! pending action at once.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐     ┌───────────────┐     ┌──────────────────┐
//! │ DataFrame /   │ ──▶ │  Graph        │ ──▶ │  Executor        │
//! │ Frame builder │     │  (nodes +     │     │  (tasks, slots,  │
//! │               │     │   actions)    │     │   merge)         │
//! └───────────────┘     └───────────────┘     └──────────────────┘
//!                                                      │
//!                                                      ▼
//!                                              ResultHandle::get()
//! ```
//!
//! # Key components
//!
//! - [`DataFrame`] / [`Frame`]: the builder surface. `filter`, `define`,
//!   `range` append graph nodes; `count`, `take`, `reduce`, `min`/`max`/
//!   `mean`, the histogram fills and `snapshot` book actions.
//! - [`ResultHandle`]: lazy action result; the first `get()` triggers the
//!   event loop for every pending action.
//! - [`Report`]: pass/total statistics of named filters.
//! - [`ExpressionCompiler`] / [`NativeCompiler`]: string-expression
//!   binding for `filter_expr` and `define_expr`.
//!
//! # Execution model
//!
//! The engine partitions the row range into contiguous tasks and runs one
//! worker per processing slot; each worker owns its slot's caches and
//! action partials outright, so the per-row loop takes no locks. Filter
//! verdicts and derived values are memoized per row, filters
//! short-circuit, and per-slot partial results are merged in ascending
//! slot order when the loop finishes. Range gates force sequential
//! execution and can terminate the loop early.

pub mod expr;
pub mod frame;
pub mod report;
pub mod result;
pub mod row_fn;

mod executor;
mod graph;
mod ops;

// Re-export commonly used types
pub use common_config::{ExecutionConfig, VeldConfig};
pub use common_error::{VeldError, VeldResult};
pub use expr::{CompiledExpression, ExprKind, ExpressionCompiler, NativeCompiler};
pub use frame::{DataFrame, Frame};
pub use report::{FilterStats, Report};
pub use result::ResultHandle;
pub use row_fn::{IntoRowCallback, IntoRowMap, IntoRowPredicate, IntoSlotCallback};
pub use veld_core::{
    Axis, ColumnInfo, DataType, Fillable, FromValue, Hist1D, Hist2D, Hist3D, IntoValue,
    Profile1D, Profile2D, Schema, Value,
};
pub use veld_storage::{ColumnReader, ColumnStore, JsonlSink, MemoryStore, TableSink};
