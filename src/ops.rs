//! Interval semantics of the loop-body operations.

use log::trace;

use crate::error::BoundsError;
use crate::interp::{OpsHandler, Value};
use crate::interval::Interval;

/// Operation handler mapping each operation name to its interval transfer function.
///
/// Values that the analysis cannot see through (`load`, `reduction`, `store`)
/// and operations it does not know are `unknown`.
#[derive(Debug, Copy, Clone, Default)]
pub struct ValueRangeAnalysis;

impl ValueRangeAnalysis {
    pub fn new() -> Self {
        Self
    }
}

fn range<'v>(op: &str, args: &'v [Value], position: usize) -> Result<&'v Interval, BoundsError> {
    args.get(position)
        .and_then(Value::as_range)
        .ok_or_else(|| BoundsError::InvalidOperand {
            op: op.to_string(),
            position,
        })
}

fn unary(op: &str, args: &[Value], f: impl Fn(&Interval) -> Interval) -> Result<Interval, BoundsError> {
    Ok(f(range(op, args, 0)?))
}

fn binary(op: &str, args: &[Value], f: impl Fn(&Interval, &Interval) -> Interval) -> Result<Interval, BoundsError> {
    Ok(f(range(op, args, 0)?, range(op, args, 1)?))
}

impl OpsHandler for ValueRangeAnalysis {
    fn call(&self, op: &str, args: &[Value]) -> Result<Interval, BoundsError> {
        match op {
            "constant" => match args.first() {
                Some(Value::Int(value)) => Ok(Interval::constant(*value)),
                Some(Value::Range(interval)) => Ok(interval.clone()),
                _ => Err(BoundsError::InvalidOperand {
                    op: op.to_string(),
                    position: 0,
                }),
            },
            "index_expr" | "to_dtype" | "identity" => unary(op, args, Interval::clone),
            "neg" => unary(op, args, Interval::neg),
            "abs" => unary(op, args, Interval::abs),
            "square" => unary(op, args, Interval::square),
            "not" | "logical_not" => unary(op, args, Interval::not),
            "add" => binary(op, args, Interval::add),
            "sub" => binary(op, args, Interval::sub),
            "mul" => binary(op, args, Interval::mul),
            "floordiv" => binary(op, args, Interval::floordiv),
            "mod" => binary(op, args, Interval::modulo),
            "minimum" => binary(op, args, Interval::minimum),
            "maximum" => binary(op, args, Interval::maximum),
            "lt" => binary(op, args, Interval::lt),
            "le" => binary(op, args, Interval::le),
            "gt" => binary(op, args, Interval::gt),
            "ge" => binary(op, args, Interval::ge),
            "eq" => binary(op, args, Interval::eq),
            "ne" => binary(op, args, Interval::ne),
            "and" | "logical_and" => binary(op, args, Interval::and),
            "or" | "logical_or" => binary(op, args, Interval::or),
            "where" => Ok(range(op, args, 0)?.where_(range(op, args, 1)?, range(op, args, 2)?)),
            _ => {
                trace!("no interval semantics for `{}`, assuming unknown", op);
                Ok(Interval::unknown())
            }
        }
    }
}
