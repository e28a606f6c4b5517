//! Value collection action.

use std::any::Any;
use std::sync::Arc;

use common_error::VeldResult;
use veld_core::{FromValue, Value};

use super::{downcast_partial, ActionDef, ActionPartial};
use crate::result::ResultCell;

pub(crate) struct TakeDef<T> {
    cell: Arc<ResultCell<Vec<T>>>,
}

impl<T> TakeDef<T> {
    pub(crate) fn new(cell: Arc<ResultCell<Vec<T>>>) -> Self {
        Self { cell }
    }
}

impl<T> ActionDef for TakeDef<T>
where
    T: FromValue + Clone + Send + Sync + 'static,
{
    fn make_partial(&self) -> Box<dyn ActionPartial> {
        Box::new(TakePartial::<T> { values: Vec::new() })
    }

    fn finalize(&self, partials: Vec<Box<dyn ActionPartial>>) -> VeldResult<()> {
        let mut merged = Vec::new();
        for partial in partials {
            merged.append(&mut downcast_partial::<TakePartial<T>>(partial)?.values);
        }
        self.cell.set(merged);
        Ok(())
    }
}

struct TakePartial<T> {
    values: Vec<T>,
}

impl<T> ActionPartial for TakePartial<T>
where
    T: FromValue + Send + 'static,
{
    fn exec(&mut self, _slot: usize, _row: u64, values: &[Value]) -> VeldResult<()> {
        self.values.push(T::from_value(values[0].clone())?);
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
    fn test_take_concatenates_in_slot_order() {
        let cell = Arc::new(ResultCell::new());
        let def = TakeDef::<i64>::new(cell.clone());
        let mut a = def.make_partial();
        let mut b = def.make_partial();
        b.exec(1, 10, &[Value::Int64(10)]).unwrap();
        a.exec(0, 1, &[Value::Int64(1)]).unwrap();
        a.exec(0, 2, &[Value::Int64(2)]).unwrap();
        def.finalize(vec![a, b]).unwrap();
        assert_eq!(cell.get_clone(), Some(vec![1, 2, 10]));
    }
}
