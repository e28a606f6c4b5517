//! Row counting action.

use std::any::Any;
use std::sync::Arc;

use common_error::VeldResult;
use veld_core::Value;

use super::{downcast_partial, ActionDef, ActionPartial};
use crate::result::ResultCell;

pub(crate) struct CountDef {
    cell: Arc<ResultCell<u64>>,
}

impl CountDef {
    pub(crate) fn new(cell: Arc<ResultCell<u64>>) -> Self {
        Self { cell }
    }
}

impl ActionDef for CountDef {
    fn make_partial(&self) -> Box<dyn ActionPartial> {
        Box::new(CountPartial { count: 0 })
    }

    fn finalize(&self, partials: Vec<Box<dyn ActionPartial>>) -> VeldResult<()> {
        let mut total = 0u64;
        for partial in partials {
            total += downcast_partial::<CountPartial>(partial)?.count;
        }
        self.cell.set(total);
        Ok(())
    }
}

struct CountPartial {
    count: u64,
}

impl ActionPartial for CountPartial {
    fn exec(&mut self, _slot: usize, _row: u64, _values: &[Value]) -> VeldResult<()> {
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
    fn test_count_merge() {
        let cell = Arc::new(ResultCell::new());
        let def = CountDef::new(cell.clone());
        let mut a = def.make_partial();
        let mut b = def.make_partial();
        for row in 0..3 {
            a.exec(0, row, &[]).unwrap();
        }
        b.exec(1, 7, &[]).unwrap();
        def.finalize(vec![a, b]).unwrap();
        assert_eq!(cell.get_clone(), Some(4));
    }
}
