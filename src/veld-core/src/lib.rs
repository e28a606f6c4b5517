//! Core data model for the Veld event-processing engine.
//!
//! This crate provides the fundamental types shared by the storage and
//! engine layers:
//! - `Value` and `DataType` for the type system
//! - `FromValue` / `IntoValue` for typed user callables
//! - `Schema` and `ColumnInfo` for column metadata
//! - histogram and profile aggregates behind the `Fillable` trait

pub mod hist;
pub mod schema;
pub mod types;

// Re-export commonly used types
pub use hist::{Axis, Fillable, Hist1D, Hist2D, Hist3D, Profile1D, Profile2D};
pub use schema::{ColumnInfo, Schema};
pub use types::{DataType, FromValue, IntoValue, Value};
