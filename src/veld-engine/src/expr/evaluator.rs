//! Typed IR and evaluator for compiled expressions.

use common_error::{VeldError, VeldResult};
use veld_core::{DataType, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "AND",
            Self::Or => "OR",
        };
        write!(f, "{symbol}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Neg,
    Not,
}

/// A lowered expression with column slots and inferred types.
#[derive(Debug, Clone)]
pub(crate) enum ScalarExpr {
    Column {
        index: usize,
        dtype: DataType,
    },
    Literal(Value),
    Unary {
        op: UnaryOp,
        dtype: DataType,
        expr: Box<ScalarExpr>,
    },
    Binary {
        op: BinaryOp,
        dtype: DataType,
        left: Box<ScalarExpr>,
        right: Box<ScalarExpr>,
    },
}

impl ScalarExpr {
    pub(crate) fn dtype(&self) -> DataType {
        match self {
            Self::Column { dtype, .. }
            | Self::Unary { dtype, .. }
            | Self::Binary { dtype, .. } => *dtype,
            Self::Literal(value) => value.dtype(),
        }
    }

    /// Evaluate against the referenced column values, in the order the
    /// columns were collected during lowering.
    pub(crate) fn eval(&self, values: &[Value]) -> VeldResult<Value> {
        match self {
            Self::Column { index, .. } => values
                .get(*index)
                .cloned()
                .ok_or_else(|| VeldError::internal("expression column slot out of range")),
            Self::Literal(value) => Ok(value.clone()),
            Self::Unary { op, expr, .. } => {
                let value = expr.eval(values)?;
                match op {
                    UnaryOp::Neg => match value {
                        Value::Int64(i) => Ok(Value::Int64(-i)),
                        Value::Float64(f) => Ok(Value::Float64(-f)),
                        other => Err(type_error("numeric", &other)),
                    },
                    UnaryOp::Not => match value {
                        Value::Bool(b) => Ok(Value::Bool(!b)),
                        other => Err(type_error("Bool", &other)),
                    },
                }
            }
            Self::Binary {
                op,
                dtype,
                left,
                right,
            } => {
                // AND/OR short-circuit: the right side is not evaluated
                // when the left side decides.
                if matches!(op, BinaryOp::And | BinaryOp::Or) {
                    let lhs = as_bool(&left.eval(values)?)?;
                    return match (op, lhs) {
                        (BinaryOp::And, false) => Ok(Value::Bool(false)),
                        (BinaryOp::Or, true) => Ok(Value::Bool(true)),
                        _ => Ok(Value::Bool(as_bool(&right.eval(values)?)?)),
                    };
                }
                let lhs = left.eval(values)?;
                let rhs = right.eval(values)?;
                match op {
                    BinaryOp::Add
                    | BinaryOp::Sub
                    | BinaryOp::Mul
                    | BinaryOp::Div
                    | BinaryOp::Mod => eval_arithmetic(*op, *dtype, &lhs, &rhs),
                    BinaryOp::Eq => Ok(Value::Bool(values_equal(&lhs, &rhs))),
                    BinaryOp::NotEq => Ok(Value::Bool(!values_equal(&lhs, &rhs))),
                    BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
                        eval_ordering(*op, &lhs, &rhs)
                    }
                    BinaryOp::And | BinaryOp::Or => unreachable!(),
                }
            }
        }
    }
}

fn type_error(expected: &str, got: &Value) -> VeldError {
    VeldError::type_mismatch(format!("expected {expected}, got {}", got.type_name()))
}

fn as_bool(value: &Value) -> VeldResult<bool> {
    value.as_bool().ok_or_else(|| type_error("Bool", value))
}

fn as_f64(value: &Value) -> VeldResult<f64> {
    value
        .as_float64()
        .ok_or_else(|| type_error("numeric", value))
}

fn eval_arithmetic(op: BinaryOp, dtype: DataType, lhs: &Value, rhs: &Value) -> VeldResult<Value> {
    if dtype == DataType::Int64 {
        let (a, b) = (
            lhs.as_int64().ok_or_else(|| type_error("Int64", lhs))?,
            rhs.as_int64().ok_or_else(|| type_error("Int64", rhs))?,
        );
        if b == 0 && matches!(op, BinaryOp::Div | BinaryOp::Mod) {
            return Err(VeldError::execution("division by zero"));
        }
        let result = match op {
            BinaryOp::Add => a.wrapping_add(b),
            BinaryOp::Sub => a.wrapping_sub(b),
            BinaryOp::Mul => a.wrapping_mul(b),
            BinaryOp::Div => a / b,
            BinaryOp::Mod => a % b,
            _ => unreachable!(),
        };
        return Ok(Value::Int64(result));
    }
    let (a, b) = (as_f64(lhs)?, as_f64(rhs)?);
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Mod => a % b,
        _ => unreachable!(),
    };
    Ok(Value::Float64(result))
}

fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        _ => match (lhs.as_float64(), rhs.as_float64()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

fn eval_ordering(op: BinaryOp, lhs: &Value, rhs: &Value) -> VeldResult<Value> {
    use std::cmp::Ordering;
    let ordering = match (lhs, rhs) {
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => {
            let (a, b) = (as_f64(lhs)?, as_f64(rhs)?);
            a.partial_cmp(&b)
                .ok_or_else(|| VeldError::execution("NaN is not comparable"))?
        }
    };
    let result = match op {
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::LtEq => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::GtEq => ordering != Ordering::Less,
        _ => unreachable!(),
    };
    Ok(Value::Bool(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(i: i64) -> ScalarExpr {
        ScalarExpr::Literal(Value::Int64(i))
    }

    #[test]
    fn test_integer_division_truncates() {
        let expr = ScalarExpr::Binary {
            op: BinaryOp::Div,
            dtype: DataType::Int64,
            left: Box::new(int(7)),
            right: Box::new(int(2)),
        };
        assert_eq!(expr.eval(&[]).unwrap(), Value::Int64(3));
    }

    #[test]
    fn test_division_by_zero() {
        let expr = ScalarExpr::Binary {
            op: BinaryOp::Mod,
            dtype: DataType::Int64,
            left: Box::new(int(7)),
            right: Box::new(int(0)),
        };
        assert!(matches!(
            expr.eval(&[]).unwrap_err(),
            VeldError::Execution(_)
        ));
    }

    #[test]
    fn test_and_short_circuits() {
        // The right side would read a missing column slot; AND must not
        // evaluate it when the left side is already false.
        let expr = ScalarExpr::Binary {
            op: BinaryOp::And,
            dtype: DataType::Bool,
            left: Box::new(ScalarExpr::Literal(Value::Bool(false))),
            right: Box::new(ScalarExpr::Column {
                index: 9,
                dtype: DataType::Bool,
            }),
        };
        assert_eq!(expr.eval(&[]).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_mixed_numeric_equality() {
        assert!(values_equal(&Value::Int64(2), &Value::Float64(2.0)));
        assert!(!values_equal(&Value::Int64(2), &Value::String("2".into())));
    }
}
