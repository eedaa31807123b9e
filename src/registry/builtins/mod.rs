//! Interpreter builtins: functions that shape evaluation itself

mod control;
mod store;

pub use control::{
    AllFunction, ExistsFunction, ExitFunction, FAIL_STATUS, FailFunction, IfFunction, IifFunction,
    JOB_LOCATION, NoteFunction,
};
pub use store::{StoreFunction, write_namespace};

use crate::ast::Token;
use crate::evaluator::{EvaluationResult, Evaluator, EvaluatorContext, ExecutionError};
use crate::model::Value;
use crate::registry::function::{FunctionRegistry, Invocation};

/// Register all interpreter builtins
pub fn register_builtins(registry: &mut FunctionRegistry) {
    registry.register_builtin(StoreFunction::single());
    registry.register_builtin(StoreFunction::array());
    registry.register_builtin(IfFunction);
    registry.register_builtin(IifFunction);
    registry.register_builtin(FailFunction);
    registry.register_builtin(ExitFunction);
    registry.register_builtin(ExistsFunction);
    registry.register_builtin(NoteFunction);
    registry.register_builtin(AllFunction);
}

/// The namespace location passed raw at `index`. A nested rule in that
/// position is evaluated and must produce a path string.
pub(crate) fn location_arg(
    invocation: &Invocation,
    index: usize,
    engine: &Evaluator,
    context: &mut EvaluatorContext,
) -> EvaluationResult<String> {
    if let Some(Token::List(rule)) = invocation.terms.get(index) {
        return match engine.evaluate(rule, context)? {
            Value::String(path) => Ok(path),
            other => Err(ExecutionError::invalid_argument(
                &invocation.name,
                format!(
                    "location needs to be a namespace path string of form x/y/z, got {}",
                    other.type_name()
                ),
            )
            .into()),
        };
    }
    match invocation.args.get(index) {
        Some(Value::String(path)) => Ok(path.clone()),
        _ => Err(ExecutionError::invalid_argument(
            &invocation.name,
            "location needs to be a namespace path string of form x/y/z. It may include x/y{namespace_reference}/z substitutions.",
        )
        .into()),
    }
}
