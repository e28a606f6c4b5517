//! Terminal action operations.
//!
//! Every action splits into a booking-time definition ([`ActionDef`], held
//! by the graph) and per-slot accumulation state ([`ActionPartial`], owned
//! exclusively by one worker). At the end of the event loop the executor
//! hands each definition its partials in ascending slot order to merge
//! into the final result.

mod count;
mod fill;
mod foreach;
mod reduce;
mod snapshot;
mod stats;
mod take;

pub(crate) use count::CountDef;
pub(crate) use fill::FillDef;
pub(crate) use foreach::ForeachDef;
pub(crate) use reduce::ReduceDef;
pub(crate) use snapshot::SnapshotDef;
pub(crate) use stats::{MaxDef, MeanDef, MinDef};
pub(crate) use take::TakeDef;

use std::any::Any;

use common_error::{VeldError, VeldResult};
use veld_core::Value;

/// Booking-time definition of an action.
pub(crate) trait ActionDef: Send + Sync {
    /// Create the accumulation state for one slot.
    fn make_partial(&self) -> Box<dyn ActionPartial>;

    /// Merge the per-slot partials (ascending slot order) and publish the
    /// final result.
    fn finalize(&self, partials: Vec<Box<dyn ActionPartial>>) -> VeldResult<()>;
}

/// Per-slot accumulation state of an action.
pub(crate) trait ActionPartial: Send {
    /// Consume one surviving row. `values` follows the action's declared
    /// column list.
    fn exec(&mut self, slot: usize, row: u64, values: &[Value]) -> VeldResult<()>;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// Recover the concrete partial type during a merge.
pub(crate) fn downcast_partial<T: 'static>(partial: Box<dyn ActionPartial>) -> VeldResult<Box<T>> {
    partial
        .into_any()
        .downcast::<T>()
        .map_err(|_| VeldError::internal("slot partial has unexpected type"))
}
