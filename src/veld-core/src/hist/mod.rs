//! Histogram and profile aggregates.
//!
//! These are the concrete models behind the engine's fill actions. The
//! engine clones a model into every processing slot, fills the clones
//! independently, and merges them in slot order when the event loop ends,
//! so `merge` must be commutative and associative.

mod axis;
mod histogram;
mod profile;

pub use axis::Axis;
pub use histogram::{Hist1D, Hist2D, Hist3D};
pub use profile::{Profile1D, Profile2D};

/// An aggregate that can be filled one row at a time.
///
/// `values` carries one coordinate per dimension, optionally followed by a
/// weight. The engine validates the column count against `dimensions()` at
/// registration, so implementations may assume the slice length is
/// `dimensions()` or `dimensions() + 1`.
pub trait Fillable: Send + Sync {
    /// Number of coordinate dimensions.
    fn dimensions(&self) -> usize;

    /// Record one row.
    fn fill(&mut self, values: &[f64]);

    /// Fold another clone of this model into `self`.
    fn merge(&mut self, other: &Self)
    where
        Self: Sized;

    /// Whether every axis has finite, non-degenerate limits.
    fn has_finite_limits(&self) -> bool {
        true
    }

    /// Whether degenerate limits switch this aggregate to auto-extension.
    fn can_extend_axes(&self) -> bool {
        false
    }

    /// Materialize any deferred state once all merges are done.
    fn finalize(&mut self) {}
}
