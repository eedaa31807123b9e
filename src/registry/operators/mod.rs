//! Host operations: comparison, arithmetic, logic and math

mod arithmetic;
mod comparison;
mod logical;
mod math;

use crate::evaluator::ExecutionError;
use crate::model::Value;
use crate::registry::function::{FunctionRegistry, FunctionResult};

/// Register all host operations
pub fn register_host_operations(registry: &mut FunctionRegistry) {
    comparison::register_comparison_operations(registry);
    arithmetic::register_arithmetic_operations(registry);
    logical::register_logical_operations(registry);
    math::register_math_operations(registry);
}

fn unsupported(name: &str, left: &Value, right: &Value) -> ExecutionError {
    ExecutionError::invalid_argument(
        name,
        format!(
            "unsupported operand types {} and {}",
            left.type_name(),
            right.type_name()
        ),
    )
}

fn number(name: &str, value: &Value) -> FunctionResult<f64> {
    value.as_f64().ok_or_else(|| {
        ExecutionError::invalid_argument(
            name,
            format!("expected a number, got {} \"{value}\"", value.type_name()),
        )
    })
}
