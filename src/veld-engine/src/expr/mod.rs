//! String-expression binding bridge.
//!
//! Builder operations that take a textual expression delegate to an
//! [`ExpressionCompiler`], which identifies the visible columns the
//! expression references and returns a callable bound to them. The
//! default [`NativeCompiler`] parses SQL expression syntax
//! (`x % 2 = 0`, `x < 5 AND y > 1.0`) and evaluates a small typed IR;
//! any compiler implementing the trait can be plugged instead.

mod evaluator;
mod parser;

use std::sync::Arc;

use common_error::{VeldError, VeldResult};
use veld_core::{DataType, Schema, Value};

/// What the compiled expression is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprKind {
    /// A filter predicate; must evaluate to `Bool`.
    Filter,
    /// A derived-column producer; any supported type.
    Define,
}

/// A compiled expression bound to named columns.
pub struct CompiledExpression {
    /// Visible columns the expression references, in first-use order.
    /// `eval` receives their values in exactly this order.
    pub columns: Vec<String>,
    /// Inferred result type.
    pub return_type: DataType,
    /// The evaluator.
    pub eval: Arc<dyn Fn(&[Value]) -> VeldResult<Value> + Send + Sync>,
}

impl std::fmt::Debug for CompiledExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledExpression")
            .field("columns", &self.columns)
            .field("return_type", &self.return_type)
            .finish()
    }
}

/// Compiles textual expressions against a visible-column schema.
pub trait ExpressionCompiler: Send + Sync {
    /// Compile `text` for the given use. Diagnostics surface as
    /// `ExpressionError`.
    fn compile(
        &self,
        text: &str,
        visible: &Schema,
        kind: ExprKind,
    ) -> VeldResult<CompiledExpression>;
}

/// The built-in SQL-syntax expression compiler.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCompiler;

impl ExpressionCompiler for NativeCompiler {
    fn compile(
        &self,
        text: &str,
        visible: &Schema,
        kind: ExprKind,
    ) -> VeldResult<CompiledExpression> {
        let ast = parser::parse(text)?;
        let (ir, columns) = parser::lower(&ast, visible)?;
        let return_type = ir.dtype();
        if kind == ExprKind::Filter && return_type != DataType::Bool {
            return Err(VeldError::expression(format!(
                "filter expression must be Bool, '{text}' is {return_type}"
            )));
        }
        Ok(CompiledExpression {
            columns,
            return_type,
            eval: Arc::new(move |values| ir.eval(values)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veld_core::ColumnInfo;

    fn schema() -> Schema {
        Schema::new(vec![
            ColumnInfo::new("x", DataType::Int64),
            ColumnInfo::new("y", DataType::Float64),
            ColumnInfo::new("tag", DataType::String),
        ])
        .unwrap()
    }

    #[test]
    fn test_compile_filter() {
        let compiled = NativeCompiler
            .compile("x % 2 = 0", &schema(), ExprKind::Filter)
            .unwrap();
        assert_eq!(compiled.columns, vec!["x"]);
        assert_eq!(compiled.return_type, DataType::Bool);
        assert_eq!(
            (compiled.eval.as_ref())(&[Value::Int64(4)]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            (compiled.eval.as_ref())(&[Value::Int64(3)]).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_compile_define_infers_type() {
        let compiled = NativeCompiler
            .compile("x + y", &schema(), ExprKind::Define)
            .unwrap();
        assert_eq!(compiled.columns, vec!["x", "y"]);
        assert_eq!(compiled.return_type, DataType::Float64);
        assert_eq!(
            (compiled.eval.as_ref())(&[Value::Int64(1), Value::Float64(0.5)]).unwrap(),
            Value::Float64(1.5)
        );
    }

    #[test]
    fn test_columns_in_first_use_order() {
        let compiled = NativeCompiler
            .compile("y > 1.0 AND x < 5 AND y < 9.0", &schema(), ExprKind::Filter)
            .unwrap();
        assert_eq!(compiled.columns, vec!["y", "x"]);
    }

    #[test]
    fn test_filter_must_be_bool() {
        let err = NativeCompiler
            .compile("x + 1", &schema(), ExprKind::Filter)
            .unwrap_err();
        assert!(matches!(err, VeldError::Expression(_)));
    }

    #[test]
    fn test_unknown_column_diagnostic() {
        let err = NativeCompiler
            .compile("pt > 2", &schema(), ExprKind::Filter)
            .unwrap_err();
        assert!(err.to_string().contains("pt"));
    }

    #[test]
    fn test_string_equality() {
        let compiled = NativeCompiler
            .compile("tag = 'signal'", &schema(), ExprKind::Filter)
            .unwrap();
        assert_eq!(
            (compiled.eval.as_ref())(&[Value::String("signal".into())]).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_parse_error() {
        assert!(NativeCompiler
            .compile("x ++", &schema(), ExprKind::Filter)
            .is_err());
    }
}
