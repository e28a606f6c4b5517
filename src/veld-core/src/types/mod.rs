//! Type system: runtime values and column data types.

mod data_type;
mod value;

pub use data_type::DataType;
pub use value::{FromValue, IntoValue, Value};
