//! Numeric reductions: minimum, maximum, mean.

use std::any::Any;
use std::sync::Arc;

use common_error::{VeldError, VeldResult};
use veld_core::Value;

use super::{downcast_partial, ActionDef, ActionPartial};
use crate::result::ResultCell;

fn numeric(value: &Value) -> VeldResult<f64> {
    value
        .as_float64()
        .ok_or_else(|| VeldError::type_mismatch(format!("expected Float64, got {}", value.type_name())))
}

pub(crate) struct MinDef {
    cell: Arc<ResultCell<f64>>,
}

impl MinDef {
    pub(crate) fn new(cell: Arc<ResultCell<f64>>) -> Self {
        Self { cell }
    }
}

impl ActionDef for MinDef {
    fn make_partial(&self) -> Box<dyn ActionPartial> {
        Box::new(MinPartial { min: f64::INFINITY })
    }

    fn finalize(&self, partials: Vec<Box<dyn ActionPartial>>) -> VeldResult<()> {
        let mut min = f64::INFINITY;
        for partial in partials {
            min = min.min(downcast_partial::<MinPartial>(partial)?.min);
        }
        self.cell.set(min);
        Ok(())
    }
}

struct MinPartial {
    min: f64,
}

impl ActionPartial for MinPartial {
    fn exec(&mut self, _slot: usize, _row: u64, values: &[Value]) -> VeldResult<()> {
        self.min = self.min.min(numeric(&values[0])?);
        Ok(())
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

pub(crate) struct MaxDef {
    cell: Arc<ResultCell<f64>>,
}

impl MaxDef {
    pub(crate) fn new(cell: Arc<ResultCell<f64>>) -> Self {
        Self { cell }
    }
}

impl ActionDef for MaxDef {
    fn make_partial(&self) -> Box<dyn ActionPartial> {
        Box::new(MaxPartial {
            max: f64::NEG_INFINITY,
        })
    }

    fn finalize(&self, partials: Vec<Box<dyn ActionPartial>>) -> VeldResult<()> {
        let mut max = f64::NEG_INFINITY;
        for partial in partials {
            max = max.max(downcast_partial::<MaxPartial>(partial)?.max);
        }
        self.cell.set(max);
        Ok(())
    }
}

struct MaxPartial {
    max: f64,
}

impl ActionPartial for MaxPartial {
    fn exec(&mut self, _slot: usize, _row: u64, values: &[Value]) -> VeldResult<()> {
        self.max = self.max.max(numeric(&values[0])?);
        Ok(())
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

pub(crate) struct MeanDef {
    cell: Arc<ResultCell<f64>>,
}

impl MeanDef {
    pub(crate) fn new(cell: Arc<ResultCell<f64>>) -> Self {
        Self { cell }
    }
}

impl ActionDef for MeanDef {
    fn make_partial(&self) -> Box<dyn ActionPartial> {
        Box::new(MeanPartial { sum: 0.0, count: 0 })
    }

    fn finalize(&self, partials: Vec<Box<dyn ActionPartial>>) -> VeldResult<()> {
        let mut sum = 0.0;
        let mut count = 0u64;
        for partial in partials {
            let partial = downcast_partial::<MeanPartial>(partial)?;
            sum += partial.sum;
            count += partial.count;
        }
        self.cell.set(if count == 0 { 0.0 } else { sum / count as f64 });
        Ok(())
    }
}

struct MeanPartial {
    sum: f64,
    count: u64,
}

impl ActionPartial for MeanPartial {
    fn exec(&mut self, _slot: usize, _row: u64, values: &[Value]) -> VeldResult<()> {
        self.sum += numeric(&values[0])?;
        self.count += 1;
        Ok(())
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_max_merge() {
        let min_cell = Arc::new(ResultCell::new());
        let max_cell = Arc::new(ResultCell::new());
        let min_def = MinDef::new(min_cell.clone());
        let max_def = MaxDef::new(max_cell.clone());

        let mut min_a = min_def.make_partial();
        let mut min_b = min_def.make_partial();
        let mut max_a = max_def.make_partial();
        for v in [3.0, -1.0, 2.0] {
            min_a.exec(0, 0, &[Value::Float64(v)]).unwrap();
            max_a.exec(0, 0, &[Value::Float64(v)]).unwrap();
        }
        min_b.exec(1, 0, &[Value::Int64(-4)]).unwrap();

        min_def.finalize(vec![min_a, min_b]).unwrap();
        max_def.finalize(vec![max_a]).unwrap();
        assert_eq!(min_cell.get_clone(), Some(-4.0));
        assert_eq!(max_cell.get_clone(), Some(3.0));
    }

    #[test]
    fn test_mean() {
        let cell = Arc::new(ResultCell::new());
        let def = MeanDef::new(cell.clone());
        let mut partial = def.make_partial();
        for v in [1.0, 2.0, 6.0] {
            partial.exec(0, 0, &[Value::Float64(v)]).unwrap();
        }
        def.finalize(vec![partial]).unwrap();
        assert_eq!(cell.get_clone(), Some(3.0));
    }

    #[test]
    fn test_empty_inputs() {
        let min_cell = Arc::new(ResultCell::new());
        let mean_cell = Arc::new(ResultCell::new());
        MinDef::new(min_cell.clone())
            .finalize(vec![MinDef::new(min_cell.clone()).make_partial()])
            .unwrap();
        MeanDef::new(mean_cell.clone())
            .finalize(vec![MeanDef::new(mean_cell.clone()).make_partial()])
            .unwrap();
        assert_eq!(min_cell.get_clone(), Some(f64::INFINITY));
        assert_eq!(mean_cell.get_clone(), Some(0.0));
    }
}
