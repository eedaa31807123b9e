//! Logical operations

use super::unsupported;
use crate::model::Value;
use crate::registry::function::{FunctionRegistry, FunctionResult, HostOp};

fn not(args: &[Value]) -> FunctionResult<Value> {
    Ok(Value::Boolean(!args[0].is_truthy()))
}

fn truth(args: &[Value]) -> FunctionResult<Value> {
    Ok(Value::Boolean(args[0].is_truthy()))
}

fn and(args: &[Value]) -> FunctionResult<Value> {
    match (&args[0], &args[1]) {
        (Value::Boolean(l), Value::Boolean(r)) => Ok(Value::Boolean(*l && *r)),
        (Value::Integer(l), Value::Integer(r)) => Ok(Value::Integer(l & r)),
        (l, r) => Err(unsupported("and_", l, r)),
    }
}

fn or(args: &[Value]) -> FunctionResult<Value> {
    match (&args[0], &args[1]) {
        (Value::Boolean(l), Value::Boolean(r)) => Ok(Value::Boolean(*l || *r)),
        (Value::Integer(l), Value::Integer(r)) => Ok(Value::Integer(l | r)),
        (l, r) => Err(unsupported("or_", l, r)),
    }
}

pub(super) fn register_logical_operations(registry: &mut FunctionRegistry) {
    registry.register_host_op(HostOp::new("not", 1, "not(a) -- Same as not a.", not));
    registry.register_host_op(HostOp::new("not_", 1, "not_(a) -- Same as not a.", not));
    registry.register_host_op(HostOp::new(
        "truth",
        1,
        "truth(a) -- Return True if a is true, False otherwise.",
        truth,
    ));
    registry.register_host_op(HostOp::new("and_", 2, "and_(a, b) -- Same as a & b.", and));
    registry.register_host_op(HostOp::new("or_", 2, "or_(a, b) -- Same as a | b.", or));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert_eq!(not(&[Value::from("")]).unwrap(), Value::Boolean(true));
        assert_eq!(truth(&[Value::Integer(3)]).unwrap(), Value::Boolean(true));
        assert_eq!(truth(&[Value::List(vec![])]).unwrap(), Value::Boolean(false));
    }

    #[test]
    fn test_and_or() {
        assert_eq!(
            and(&[Value::Boolean(true), Value::Boolean(false)]).unwrap(),
            Value::Boolean(false)
        );
        assert_eq!(
            or(&[Value::Integer(4), Value::Integer(1)]).unwrap(),
            Value::Integer(5)
        );
        assert!(and(&[Value::Boolean(true), Value::from("x")]).is_err());
    }
}
