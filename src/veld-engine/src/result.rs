//! Lazy action results.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use common_error::{VeldError, VeldResult};

use crate::executor::Engine;

/// Shared storage for one action's final value.
///
/// The booking site and the returned [`ResultHandle`] hold the same cell;
/// the event loop publishes the merged value into it exactly once per run.
pub(crate) struct ResultCell<T> {
    value: Mutex<Option<T>>,
}

impl<T> ResultCell<T> {
    pub(crate) fn new() -> Self {
        Self {
            value: Mutex::new(None),
        }
    }

    pub(crate) fn set(&self, value: T) {
        *self.value.lock() = Some(value);
    }
}

impl<T: Clone> ResultCell<T> {
    pub(crate) fn get_clone(&self) -> Option<T> {
        self.value.lock().clone()
    }
}

/// Handle to a lazily materialized action result.
///
/// Dereferencing with [`get`](Self::get) returns the stored value if the
/// engine has already run, and otherwise triggers one event loop that
/// materializes **every** lazy action booked so far. Handles are freely
/// clonable; all clones observe the same stored value. Once the owning
/// [`DataFrame`](crate::DataFrame) is dropped, `get` fails with
/// `EngineGone`.
pub struct ResultHandle<T> {
    cell: Arc<ResultCell<T>>,
    engine: Weak<Engine>,
}

impl<T> ResultHandle<T> {
    pub(crate) fn new(cell: Arc<ResultCell<T>>, engine: Weak<Engine>) -> Self {
        Self { cell, engine }
    }
}

impl<T: Clone> ResultHandle<T> {
    /// Materialize and return the action result.
    pub fn get(&self) -> VeldResult<T> {
        let engine = self.engine.upgrade().ok_or(VeldError::EngineGone)?;
        if let Some(value) = self.cell.get_clone() {
            return Ok(value);
        }
        engine.run()?;
        self.cell.get_clone().ok_or_else(|| {
            VeldError::internal("event loop finished without producing this result")
        })
    }

    /// Whether the value has already been computed.
    pub fn is_ready(&self) -> bool {
        self.cell.value.lock().is_some()
    }
}

impl<T> Clone for ResultHandle<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
            engine: Weak::clone(&self.engine),
        }
    }
}

impl<T> std::fmt::Debug for ResultHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultHandle")
            .field("ready", &self.cell.value.lock().is_some())
            .finish_non_exhaustive()
    }
}
