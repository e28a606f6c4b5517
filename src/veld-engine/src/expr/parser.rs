//! Parsing and lowering of textual expressions.
//!
//! Parsing is delegated to `sqlparser`; the resulting AST is lowered into
//! the engine's [`ScalarExpr`] IR with column references resolved against
//! the visible schema.

use sqlparser::ast::{BinaryOperator, Expr, UnaryOperator, Value as SqlValue};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::Token;

use common_error::{VeldError, VeldResult};
use veld_core::{DataType, Schema, Value};

use super::evaluator::{BinaryOp, ScalarExpr, UnaryOp};

/// Parse a standalone expression.
pub(crate) fn parse(text: &str) -> VeldResult<Expr> {
    let dialect = GenericDialect {};
    let mut parser = Parser::new(&dialect)
        .try_with_sql(text)
        .map_err(|err| VeldError::expression(err.to_string()))?;
    let expr = parser
        .parse_expr()
        .map_err(|err| VeldError::expression(err.to_string()))?;
    if parser.peek_token().token != Token::EOF {
        return Err(VeldError::expression(format!(
            "unexpected trailing input in '{text}'"
        )));
    }
    Ok(expr)
}

/// Lower a parsed expression, collecting the referenced columns in
/// first-use order.
pub(crate) fn lower(expr: &Expr, visible: &Schema) -> VeldResult<(ScalarExpr, Vec<String>)> {
    let mut columns = Vec::new();
    let ir = lower_expr(expr, visible, &mut columns)?;
    Ok((ir, columns))
}

fn lower_expr(
    expr: &Expr,
    visible: &Schema,
    columns: &mut Vec<String>,
) -> VeldResult<ScalarExpr> {
    match expr {
        Expr::Identifier(ident) => {
            let name = &ident.value;
            let dtype = visible
                .dtype(name)
                .ok_or_else(|| VeldError::expression(format!("unknown column '{name}'")))?;
            let index = columns.iter().position(|c| c == name).unwrap_or_else(|| {
                columns.push(name.clone());
                columns.len() - 1
            });
            Ok(ScalarExpr::Column { index, dtype })
        }
        Expr::Value(value) => lower_literal(value),
        Expr::Nested(inner) => lower_expr(inner, visible, columns),
        Expr::UnaryOp { op, expr } => {
            let inner = lower_expr(expr, visible, columns)?;
            let (op, dtype) = match op {
                UnaryOperator::Minus => {
                    let dtype = inner.dtype();
                    if !dtype.is_numeric() {
                        return Err(VeldError::expression(format!(
                            "cannot negate a {dtype} operand"
                        )));
                    }
                    (UnaryOp::Neg, dtype)
                }
                UnaryOperator::Plus => return Ok(inner),
                UnaryOperator::Not => {
                    if inner.dtype() != DataType::Bool {
                        return Err(VeldError::expression(format!(
                            "NOT needs a Bool operand, got {}",
                            inner.dtype()
                        )));
                    }
                    (UnaryOp::Not, DataType::Bool)
                }
                other => {
                    return Err(VeldError::expression(format!(
                        "unsupported unary operator {other}"
                    )))
                }
            };
            Ok(ScalarExpr::Unary {
                op,
                dtype,
                expr: Box::new(inner),
            })
        }
        Expr::BinaryOp { left, op, right } => {
            let left = lower_expr(left, visible, columns)?;
            let right = lower_expr(right, visible, columns)?;
            let op = lower_binary_op(op)?;
            let dtype = infer_binary(op, left.dtype(), right.dtype())?;
            Ok(ScalarExpr::Binary {
                op,
                dtype,
                left: Box::new(left),
                right: Box::new(right),
            })
        }
        other => Err(VeldError::expression(format!(
            "unsupported expression: {other}"
        ))),
    }
}

fn lower_literal(value: &SqlValue) -> VeldResult<ScalarExpr> {
    let value = match value {
        SqlValue::Number(text, _) => {
            if let Ok(int) = text.parse::<i64>() {
                Value::Int64(int)
            } else {
                Value::Float64(text.parse::<f64>().map_err(|_| {
                    VeldError::expression(format!("invalid number literal '{text}'"))
                })?)
            }
        }
        SqlValue::SingleQuotedString(text) | SqlValue::DoubleQuotedString(text) => {
            Value::String(text.clone())
        }
        SqlValue::Boolean(b) => Value::Bool(*b),
        other => {
            return Err(VeldError::expression(format!(
                "unsupported literal {other}"
            )))
        }
    };
    Ok(ScalarExpr::Literal(value))
}

fn lower_binary_op(op: &BinaryOperator) -> VeldResult<BinaryOp> {
    Ok(match op {
        BinaryOperator::Plus => BinaryOp::Add,
        BinaryOperator::Minus => BinaryOp::Sub,
        BinaryOperator::Multiply => BinaryOp::Mul,
        BinaryOperator::Divide => BinaryOp::Div,
        BinaryOperator::Modulo => BinaryOp::Mod,
        BinaryOperator::Eq => BinaryOp::Eq,
        BinaryOperator::NotEq => BinaryOp::NotEq,
        BinaryOperator::Lt => BinaryOp::Lt,
        BinaryOperator::LtEq => BinaryOp::LtEq,
        BinaryOperator::Gt => BinaryOp::Gt,
        BinaryOperator::GtEq => BinaryOp::GtEq,
        BinaryOperator::And => BinaryOp::And,
        BinaryOperator::Or => BinaryOp::Or,
        other => {
            return Err(VeldError::expression(format!(
                "unsupported operator {other}"
            )))
        }
    })
}

fn infer_binary(op: BinaryOp, left: DataType, right: DataType) -> VeldResult<DataType> {
    let ok = match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            if left.is_numeric() && right.is_numeric() {
                return Ok(if left == DataType::Int64 && right == DataType::Int64 {
                    DataType::Int64
                } else {
                    DataType::Float64
                });
            }
            false
        }
        BinaryOp::Eq | BinaryOp::NotEq => {
            left == right || (left.is_numeric() && right.is_numeric())
        }
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            (left.is_numeric() && right.is_numeric())
                || (left == DataType::String && right == DataType::String)
        }
        BinaryOp::And | BinaryOp::Or => left == DataType::Bool && right == DataType::Bool,
    };
    if ok {
        Ok(DataType::Bool)
    } else {
        Err(VeldError::expression(format!(
            "operator {op} cannot combine {left} and {right}"
        )))
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
        ])
        .unwrap()
    }

    #[test]
    fn test_trailing_input_rejected() {
        assert!(parse("x > 1 garbage extra").is_err());
    }

    #[test]
    fn test_integer_arithmetic_stays_integer() {
        let ast = parse("x * 2 + 1").unwrap();
        let (ir, columns) = lower(&ast, &schema()).unwrap();
        assert_eq!(ir.dtype(), DataType::Int64);
        assert_eq!(columns, vec!["x"]);
    }

    #[test]
    fn test_mixed_arithmetic_promotes() {
        let ast = parse("x + y").unwrap();
        let (ir, _) = lower(&ast, &schema()).unwrap();
        assert_eq!(ir.dtype(), DataType::Float64);
    }

    #[test]
    fn test_bad_operand_types() {
        let schema = Schema::new(vec![ColumnInfo::new("tag", DataType::String)]).unwrap();
        let ast = parse("tag + 1").unwrap();
        assert!(lower(&ast, &schema).is_err());
    }

    #[test]
    fn test_unary_minus() {
        let ast = parse("-x").unwrap();
        let (ir, _) = lower(&ast, &schema()).unwrap();
        assert_eq!(ir.dtype(), DataType::Int64);
        assert_eq!(
            ir.eval(&[Value::Int64(3)]).unwrap(),
            Value::Int64(-3)
        );
    }

    #[test]
    fn test_not_requires_bool() {
        let ast = parse("NOT x").unwrap();
        assert!(lower(&ast, &schema()).is_err());
    }
}
