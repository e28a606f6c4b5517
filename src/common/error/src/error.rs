//! Core error types for Veld.

use thiserror::Error;

/// Result type alias using `VeldError`.
pub type VeldResult<T> = std::result::Result<T, VeldError>;

/// Generic boxed error for external error sources.
pub type GenericError = Box<dyn std::error::Error + Send + Sync>;

/// Core error type for Veld operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VeldError {
    /// Invalid argument to a graph-building operation.
    #[error("InvalidArgument: {0}")]
    InvalidArgument(String),

    /// Operation not supported in the current engine configuration.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Column not visible at the referencing node.
    #[error("UnknownColumn: {0}")]
    UnknownColumn(String),

    /// Column type does not match the expected type.
    #[error("TypeMismatch: {0}")]
    TypeMismatch(String),

    /// Column list length does not match the declared arity.
    #[error("ArityMismatch: {0}")]
    ArityMismatch(String),

    /// Derived column name collides with a visible column.
    #[error("DuplicateColumn: {0}")]
    DuplicateColumn(String),

    /// Default column list cannot complete the requested column list.
    #[error("MissingColumnSpec: {0}")]
    MissingColumnSpec(String),

    /// Expression compilation failure, with the compiler's diagnostic.
    #[error("ExpressionError: {0}")]
    Expression(String),

    /// Lazy result dereferenced after the engine was released.
    #[error("EngineGone: the engine backing this result has been released")]
    EngineGone,

    /// Aggregator cannot be bound to the given column list.
    #[error("AggregatorBindingError: {0}")]
    AggregatorBinding(String),

    /// Failure raised while the event loop was running.
    #[error("ExecutionError: {0}")]
    Execution(String),

    /// Internal error (bug in Veld).
    #[error("InternalError: {0}")]
    Internal(String),

    /// IO error.
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error.
    #[error("ArrowError: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    /// JSON serialization error.
    #[error("SerdeJsonError: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// External error from third-party libraries.
    #[error("ExternalError: {0}")]
    External(GenericError),
}

impl VeldError {
    /// Create a new `InvalidArgument` error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a new `Unsupported` error.
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Create a new `UnknownColumn` error.
    pub fn unknown_column<S: Into<String>>(name: S) -> Self {
        Self::UnknownColumn(name.into())
    }

    /// Create a new `TypeMismatch` error.
    pub fn type_mismatch<S: Into<String>>(msg: S) -> Self {
        Self::TypeMismatch(msg.into())
    }

    /// Create a new `ArityMismatch` error.
    pub fn arity_mismatch<S: Into<String>>(msg: S) -> Self {
        Self::ArityMismatch(msg.into())
    }

    /// Create a new `DuplicateColumn` error.
    pub fn duplicate_column<S: Into<String>>(name: S) -> Self {
        Self::DuplicateColumn(name.into())
    }

    /// Create a new `MissingColumnSpec` error.
    pub fn missing_column_spec<S: Into<String>>(msg: S) -> Self {
        Self::MissingColumnSpec(msg.into())
    }

    /// Create a new `Expression` error.
    pub fn expression<S: Into<String>>(msg: S) -> Self {
        Self::Expression(msg.into())
    }

    /// Create a new `AggregatorBinding` error.
    pub fn aggregator_binding<S: Into<String>>(msg: S) -> Self {
        Self::AggregatorBinding(msg.into())
    }

    /// Create a new `Execution` error.
    pub fn execution<S: Into<String>>(msg: S) -> Self {
        Self::Execution(msg.into())
    }

    /// Create a new `Internal` error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

/// Ensure a condition holds, returning the given error variant if not.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $msg:expr) => {
        if !$cond {
            return Err($crate::VeldError::InvalidArgument($msg.to_string()));
        }
    };
    ($cond:expr, $variant:ident: $($msg:tt)*) => {
        if !$cond {
            return Err($crate::VeldError::$variant(format!($($msg)*)));
        }
    };
}

/// Return early with a `TypeMismatch` error.
#[macro_export]
macro_rules! type_err {
    ($($arg:tt)*) => {
        return Err($crate::VeldError::TypeMismatch(format!($($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VeldError::type_mismatch("expected Int64, got String");
        assert_eq!(err.to_string(), "TypeMismatch: expected Int64, got String");
    }

    #[test]
    fn test_error_constructors() {
        let _ = VeldError::invalid_argument("stride must be greater than 0");
        let _ = VeldError::unknown_column("pt");
        let _ = VeldError::duplicate_column("x");
        let _ = VeldError::unsupported("ranges are single-threaded");
        let _ = VeldError::internal("unexpected state");
    }

    #[test]
    fn test_engine_gone_display() {
        assert!(VeldError::EngineGone.to_string().contains("released"));
    }
}
