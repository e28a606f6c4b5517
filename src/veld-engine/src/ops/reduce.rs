//! User-function reduction action.

use std::any::Any;
use std::sync::Arc;

use common_error::VeldResult;
use veld_core::{FromValue, Value};

use super::{downcast_partial, ActionDef, ActionPartial};
use crate::result::ResultCell;

/// Reduction over a single column with `f: (T, T) -> T`.
///
/// Each slot folds the function over its values starting from the seed;
/// the merge folds the non-empty slot results in ascending slot order
/// without re-applying the seed. Sequential execution therefore computes
/// exactly `fold(f, init, values)`; under parallelism the result matches
/// when `f` is associative and commutative and `init` is its identity.
pub(crate) struct ReduceDef<T, F> {
    func: Arc<F>,
    init: T,
    cell: Arc<ResultCell<T>>,
}

impl<T, F> ReduceDef<T, F> {
    pub(crate) fn new(func: F, init: T, cell: Arc<ResultCell<T>>) -> Self {
        Self {
            func: Arc::new(func),
            init,
            cell,
        }
    }
}

impl<T, F> ActionDef for ReduceDef<T, F>
where
    T: FromValue + Clone + Send + Sync + 'static,
    F: Fn(T, T) -> T + Send + Sync + 'static,
{
    fn make_partial(&self) -> Box<dyn ActionPartial> {
        Box::new(ReducePartial {
            func: Arc::clone(&self.func),
            init: self.init.clone(),
            acc: None,
        })
    }

    fn finalize(&self, partials: Vec<Box<dyn ActionPartial>>) -> VeldResult<()> {
        let mut acc: Option<T> = None;
        for partial in partials {
            let partial = downcast_partial::<ReducePartial<T, F>>(partial)?;
            if let Some(value) = partial.acc {
                acc = Some(match acc {
                    Some(prev) => (self.func)(prev, value),
                    None => value,
                });
            }
        }
        self.cell.set(acc.unwrap_or_else(|| self.init.clone()));
        Ok(())
    }
}

struct ReducePartial<T, F> {
    func: Arc<F>,
    init: T,
    acc: Option<T>,
}

impl<T, F> ActionPartial for ReducePartial<T, F>
where
    T: FromValue + Clone + Send + Sync + 'static,
    F: Fn(T, T) -> T + Send + Sync + 'static,
{
    fn exec(&mut self, _slot: usize, _row: u64, values: &[Value]) -> VeldResult<()> {
        let value = T::from_value(values[0].clone())?;
        self.acc = Some(match self.acc.take() {
            Some(acc) => (self.func)(acc, value),
            None => (self.func)(self.init.clone(), value),
        });
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
    fn test_sequential_fold_with_seed() {
        let cell = Arc::new(ResultCell::new());
        let def = ReduceDef::new(|a: i64, b: i64| a * b, 1i64, cell.clone());
        let mut partial = def.make_partial();
        for v in 1..=4 {
            partial.exec(0, v as u64, &[Value::Int64(v)]).unwrap();
        }
        def.finalize(vec![partial]).unwrap();
        assert_eq!(cell.get_clone(), Some(24));
    }

    #[test]
    fn test_empty_reduction_yields_seed() {
        let cell = Arc::new(ResultCell::new());
        let def = ReduceDef::new(|a: i64, b: i64| a + b, 5i64, cell.clone());
        let partial = def.make_partial();
        def.finalize(vec![partial]).unwrap();
        assert_eq!(cell.get_clone(), Some(5));
    }

    #[test]
    fn test_parallel_merge_in_slot_order() {
        let cell = Arc::new(ResultCell::new());
        let def = ReduceDef::new(|a: i64, b: i64| a + b, 0i64, cell.clone());
        let mut a = def.make_partial();
        let mut b = def.make_partial();
        a.exec(0, 0, &[Value::Int64(1)]).unwrap();
        a.exec(0, 1, &[Value::Int64(2)]).unwrap();
        b.exec(1, 2, &[Value::Int64(10)]).unwrap();
        def.finalize(vec![a, b]).unwrap();
        assert_eq!(cell.get_clone(), Some(13));
    }
}
