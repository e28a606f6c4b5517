//! User-callback action.

use std::any::Any;
use std::sync::Arc;

use common_error::VeldResult;
use veld_core::Value;

use super::{ActionDef, ActionPartial};
use crate::row_fn::ErasedCallback;

/// Invokes a user callback once per surviving row. The callback is shared
/// across slots, so it must tolerate concurrent invocation under parallel
/// execution; slot-aware callbacks receive the slot id as their first
/// argument.
pub(crate) struct ForeachDef {
    func: Arc<dyn Fn(usize, &[Value]) -> VeldResult<()> + Send + Sync>,
}

impl ForeachDef {
    pub(crate) fn new(callback: ErasedCallback) -> Self {
        Self {
            func: callback.func,
        }
    }
}

impl ActionDef for ForeachDef {
    fn make_partial(&self) -> Box<dyn ActionPartial> {
        Box::new(ForeachPartial {
            func: Arc::clone(&self.func),
        })
    }

    fn finalize(&self, _partials: Vec<Box<dyn ActionPartial>>) -> VeldResult<()> {
        Ok(())
    }
}

struct ForeachPartial {
    func: Arc<dyn Fn(usize, &[Value]) -> VeldResult<()> + Send + Sync>,
}

impl ActionPartial for ForeachPartial {
    fn exec(&mut self, slot: usize, _row: u64, values: &[Value]) -> VeldResult<()> {
        (self.func.as_ref())(slot, values)
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}
