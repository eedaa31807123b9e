//! Math library operations

use super::number;
use crate::evaluator::ExecutionError;
use crate::model::Value;
use crate::registry::function::{FunctionRegistry, FunctionResult, HostOp};
use crate::registry::signature::{FunctionSignature, ParameterInfo};

fn domain_error(name: &str) -> ExecutionError {
    ExecutionError::invalid_argument(name, "math domain error")
}

fn to_integer(name: &str, x: f64) -> FunctionResult<Value> {
    if x.is_finite() && x >= i64::MIN as f64 && x <= i64::MAX as f64 {
        Ok(Value::Integer(x as i64))
    } else {
        Err(ExecutionError::invalid_argument(
            name,
            format!("cannot convert {x} to integer"),
        ))
    }
}

fn sqrt(args: &[Value]) -> FunctionResult<Value> {
    let x = number("sqrt", &args[0])?;
    if x < 0.0 {
        return Err(domain_error("sqrt"));
    }
    Ok(Value::Float(x.sqrt()))
}

fn floor(args: &[Value]) -> FunctionResult<Value> {
    match &args[0] {
        Value::Integer(i) => Ok(Value::Integer(*i)),
        other => to_integer("floor", number("floor", other)?.floor()),
    }
}

fn ceil(args: &[Value]) -> FunctionResult<Value> {
    match &args[0] {
        Value::Integer(i) => Ok(Value::Integer(*i)),
        other => to_integer("ceil", number("ceil", other)?.ceil()),
    }
}

fn log(args: &[Value]) -> FunctionResult<Value> {
    let x = number("log", &args[0])?;
    if x <= 0.0 {
        return Err(domain_error("log"));
    }
    match args.get(1) {
        Some(base) if !base.is_null() => {
            let base = number("log", base)?;
            if base <= 0.0 || base == 1.0 {
                return Err(domain_error("log"));
            }
            Ok(Value::Float(x.ln() / base.ln()))
        }
        _ => Ok(Value::Float(x.ln())),
    }
}

fn log10(args: &[Value]) -> FunctionResult<Value> {
    let x = number("log10", &args[0])?;
    if x <= 0.0 {
        return Err(domain_error("log10"));
    }
    Ok(Value::Float(x.log10()))
}

fn exp(args: &[Value]) -> FunctionResult<Value> {
    Ok(Value::Float(number("exp", &args[0])?.exp()))
}

fn fabs(args: &[Value]) -> FunctionResult<Value> {
    Ok(Value::Float(number("fabs", &args[0])?.abs()))
}

pub(super) fn register_math_operations(registry: &mut FunctionRegistry) {
    registry.register_host_op(HostOp::new(
        "sqrt",
        1,
        "sqrt(x) -- Return the square root of x.",
        sqrt,
    ));
    registry.register_host_op(HostOp::new(
        "floor",
        1,
        "floor(x) -- Return the floor of x as an integer.",
        floor,
    ));
    registry.register_host_op(HostOp::new(
        "ceil",
        1,
        "ceil(x) -- Return the ceiling of x as an integer.",
        ceil,
    ));

    let mut log_op = HostOp::new(
        "log",
        2,
        "log(x[, base]) -- Return the logarithm of x to the given base (default e).",
        log,
    );
    log_op.signature = FunctionSignature::new(
        "log",
        vec![
            ParameterInfo::required("x"),
            ParameterInfo::optional("base", "e"),
        ],
    );
    registry.register_host_op(log_op);

    registry.register_host_op(HostOp::new(
        "log10",
        1,
        "log10(x) -- Return the base 10 logarithm of x.",
        log10,
    ));
    registry.register_host_op(HostOp::new("exp", 1, "exp(x) -- Return e raised to x.", exp));
    registry.register_host_op(HostOp::new(
        "fabs",
        1,
        "fabs(x) -- Return the absolute value of the float x.",
        fabs,
    ));
}
