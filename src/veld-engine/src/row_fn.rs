//! Typed user callables over row values.
//!
//! Builder operations accept plain closures over column value types
//! (`|x: i64| x % 2 == 0`). The conversion traits here recover the arity
//! and argument types of such a closure so the builder can complete the
//! column list from the source defaults and type-check it against the
//! schema at registration, then erase the closure into a uniform
//! slice-of-values calling convention for the event loop.

use std::sync::Arc;

use common_error::VeldResult;
use veld_core::{DataType, FromValue, IntoValue, Value};

/// Type-erased filter predicate.
#[doc(hidden)]
pub struct ErasedPredicate {
    pub arg_types: Vec<DataType>,
    pub func: Box<dyn Fn(&[Value]) -> VeldResult<bool> + Send + Sync>,
}

/// Type-erased derived-column producer.
#[doc(hidden)]
pub struct ErasedProducer {
    pub arg_types: Vec<DataType>,
    pub out_type: DataType,
    pub func: Box<dyn Fn(&[Value]) -> VeldResult<Value> + Send + Sync>,
}

/// Type-erased per-row callback; the first argument is the slot id.
#[doc(hidden)]
pub struct ErasedCallback {
    pub arg_types: Vec<DataType>,
    pub func: Arc<dyn Fn(usize, &[Value]) -> VeldResult<()> + Send + Sync>,
}

/// A closure usable as a filter predicate.
///
/// Implemented for `Fn(T1, .., Tn) -> bool` with `n` in `1..=4` and every
/// `Ti: FromValue`. The `Args` parameter only disambiguates the impls.
pub trait IntoRowPredicate<Args>: Send + Sync + 'static {
    #[doc(hidden)]
    fn into_predicate(self) -> ErasedPredicate;
}

/// A closure usable as a derived-column producer.
pub trait IntoRowMap<Args>: Send + Sync + 'static {
    #[doc(hidden)]
    fn into_producer(self) -> ErasedProducer;
}

/// A closure usable as a `foreach` sink.
pub trait IntoRowCallback<Args>: Send + Sync + 'static {
    #[doc(hidden)]
    fn into_callback(self) -> ErasedCallback;
}

/// A closure usable as a `foreach_slot` sink; its first parameter is the
/// processing slot id.
pub trait IntoSlotCallback<Args>: Send + Sync + 'static {
    #[doc(hidden)]
    fn into_callback(self) -> ErasedCallback;
}

macro_rules! impl_row_fns {
    ($($ty:ident => $idx:tt),+) => {
        impl<F, $($ty,)+> IntoRowPredicate<($($ty,)+)> for F
        where
            F: Fn($($ty),+) -> bool + Send + Sync + 'static,
            $($ty: FromValue,)+
        {
            fn into_predicate(self) -> ErasedPredicate {
                ErasedPredicate {
                    arg_types: vec![$($ty::DTYPE),+],
                    func: Box::new(move |values: &[Value]| {
                        Ok(self($($ty::from_value(values[$idx].clone())?),+))
                    }),
                }
            }
        }

        impl<F, R, $($ty,)+> IntoRowMap<($($ty,)+ R)> for F
        where
            F: Fn($($ty),+) -> R + Send + Sync + 'static,
            R: IntoValue,
            $($ty: FromValue,)+
        {
            fn into_producer(self) -> ErasedProducer {
                ErasedProducer {
                    arg_types: vec![$($ty::DTYPE),+],
                    out_type: R::DTYPE,
                    func: Box::new(move |values: &[Value]| {
                        Ok(self($($ty::from_value(values[$idx].clone())?),+).into_value())
                    }),
                }
            }
        }

        impl<F, $($ty,)+> IntoRowCallback<($($ty,)+)> for F
        where
            F: Fn($($ty),+) + Send + Sync + 'static,
            $($ty: FromValue,)+
        {
            fn into_callback(self) -> ErasedCallback {
                ErasedCallback {
                    arg_types: vec![$($ty::DTYPE),+],
                    func: Arc::new(move |_slot: usize, values: &[Value]| {
                        self($($ty::from_value(values[$idx].clone())?),+);
                        Ok(())
                    }),
                }
            }
        }

        impl<F, $($ty,)+> IntoSlotCallback<($($ty,)+)> for F
        where
            F: Fn(usize, $($ty),+) + Send + Sync + 'static,
            $($ty: FromValue,)+
        {
            fn into_callback(self) -> ErasedCallback {
                ErasedCallback {
                    arg_types: vec![$($ty::DTYPE),+],
                    func: Arc::new(move |slot: usize, values: &[Value]| {
                        self(slot, $($ty::from_value(values[$idx].clone())?),+);
                        Ok(())
                    }),
                }
            }
        }
    };
}

impl_row_fns!(T1 => 0);
impl_row_fns!(T1 => 0, T2 => 1);
impl_row_fns!(T1 => 0, T2 => 1, T3 => 2);
impl_row_fns!(T1 => 0, T2 => 1, T3 => 2, T4 => 3);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicate_erasure() {
        let pred = (|x: i64| x % 2 == 0).into_predicate();
        assert_eq!(pred.arg_types, vec![DataType::Int64]);
        assert!((pred.func)(&[Value::Int64(4)]).unwrap());
        assert!(!(pred.func)(&[Value::Int64(3)]).unwrap());
    }

    #[test]
    fn test_predicate_coerces_int_to_float() {
        let pred = (|x: f64| x > 0.5).into_predicate();
        assert!((pred.func)(&[Value::Int64(1)]).unwrap());
    }

    #[test]
    fn test_producer_erasure() {
        let producer = (|x: i64, y: i64| (x + y) as f64).into_producer();
        assert_eq!(producer.arg_types, vec![DataType::Int64, DataType::Int64]);
        assert_eq!(producer.out_type, DataType::Float64);
        let out = (producer.func)(&[Value::Int64(1), Value::Int64(2)]).unwrap();
        assert_eq!(out, Value::Float64(3.0));
    }

    #[test]
    fn test_predicate_type_error() {
        let pred = (|x: i64| x > 0).into_predicate();
        assert!((pred.func)(&[Value::String("no".into())]).is_err());
    }

    #[test]
    fn test_slot_callback() {
        let cb = IntoSlotCallback::into_callback(|slot: usize, _x: i64| {
            assert_eq!(slot, 7);
        });
        (cb.func.as_ref())(7, &[Value::Int64(0)]).unwrap();
    }
}
