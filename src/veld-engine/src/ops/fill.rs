//! Aggregator fill action for histograms, profiles and any other
//! [`Fillable`] model.

use std::any::Any;
use std::sync::Arc;

use common_error::{VeldError, VeldResult};
use veld_core::{Fillable, Value};

use super::{downcast_partial, ActionDef, ActionPartial};
use crate::result::ResultCell;

/// Fills per-slot clones of a model aggregator and merges them in slot
/// order; the booked model itself is never touched during execution.
pub(crate) struct FillDef<A> {
    model: A,
    cell: Arc<ResultCell<A>>,
}

impl<A> FillDef<A> {
    pub(crate) fn new(model: A, cell: Arc<ResultCell<A>>) -> Self {
        Self { model, cell }
    }
}

impl<A> ActionDef for FillDef<A>
where
    A: Fillable + Clone + Send + Sync + 'static,
{
    fn make_partial(&self) -> Box<dyn ActionPartial> {
        Box::new(FillPartial {
            agg: self.model.clone(),
            coords: Vec::new(),
        })
    }

    fn finalize(&self, partials: Vec<Box<dyn ActionPartial>>) -> VeldResult<()> {
        let mut merged = self.model.clone();
        for partial in partials {
            merged.merge(&downcast_partial::<FillPartial<A>>(partial)?.agg);
        }
        merged.finalize();
        self.cell.set(merged);
        Ok(())
    }
}

struct FillPartial<A> {
    agg: A,
    coords: Vec<f64>,
}

impl<A> ActionPartial for FillPartial<A>
where
    A: Fillable + Clone + Send + Sync + 'static,
{
    fn exec(&mut self, _slot: usize, _row: u64, values: &[Value]) -> VeldResult<()> {
        self.coords.clear();
        for value in values {
            self.coords.push(value.as_float64().ok_or_else(|| {
                VeldError::type_mismatch(format!(
                    "expected Float64, got {}",
                    value.type_name()
                ))
            })?);
        }
        self.agg.fill(&self.coords);
        Ok(())
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}
