//! Comparison operations

use std::cmp::Ordering;

use super::unsupported;
use crate::model::Value;
use crate::registry::function::{FunctionRegistry, FunctionResult, HostOp};

fn ordered(name: &str, args: &[Value], test: fn(Ordering) -> bool) -> FunctionResult<Value> {
    let (left, right) = (&args[0], &args[1]);
    left.compare(right)
        .map(|ord| Value::Boolean(test(ord)))
        .ok_or_else(|| unsupported(name, left, right))
}

fn lt(args: &[Value]) -> FunctionResult<Value> {
    ordered("lt", args, Ordering::is_lt)
}

fn le(args: &[Value]) -> FunctionResult<Value> {
    ordered("le", args, Ordering::is_le)
}

fn gt(args: &[Value]) -> FunctionResult<Value> {
    ordered("gt", args, Ordering::is_gt)
}

fn ge(args: &[Value]) -> FunctionResult<Value> {
    ordered("ge", args, Ordering::is_ge)
}

fn eq(args: &[Value]) -> FunctionResult<Value> {
    Ok(Value::Boolean(args[0].loose_eq(&args[1])))
}

fn ne(args: &[Value]) -> FunctionResult<Value> {
    Ok(Value::Boolean(!args[0].loose_eq(&args[1])))
}

pub(super) fn register_comparison_operations(registry: &mut FunctionRegistry) {
    registry.register_host_op(HostOp::new("lt", 2, "lt(a, b) -- Same as a < b.", lt));
    registry.register_host_op(HostOp::new("le", 2, "le(a, b) -- Same as a <= b.", le));
    registry.register_host_op(HostOp::new("gt", 2, "gt(a, b) -- Same as a > b.", gt));
    registry.register_host_op(HostOp::new("ge", 2, "ge(a, b) -- Same as a >= b.", ge));
    registry.register_host_op(HostOp::new("eq", 2, "eq(a, b) -- Same as a == b.", eq));
    registry.register_host_op(HostOp::new("ne", 2, "ne(a, b) -- Same as a != b.", ne));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::ExecutionError;

    #[test]
    fn test_numeric_comparison_crosses_types() {
        assert_eq!(
            lt(&[Value::Integer(1), Value::Float(1.5)]).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            ge(&[Value::Float(2.0), Value::Integer(2)]).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            eq(&[Value::Float(2.0), Value::Integer(2)]).unwrap(),
            Value::Boolean(true)
        );
    }

    #[test]
    fn test_mismatched_comparison_is_an_error() {
        let err = gt(&[Value::from("a"), Value::Integer(1)]).unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidArgument { .. }));
        assert_eq!(
            ne(&[Value::from("a"), Value::Integer(1)]).unwrap(),
            Value::Boolean(true)
        );
    }
}
