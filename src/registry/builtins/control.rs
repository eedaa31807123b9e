//! Conditionals, run signals and bookkeeping builtins

use std::sync::LazyLock;

use super::location_arg;
use crate::evaluator::{EvaluationError, EvaluationResult, Evaluator, EvaluatorContext, ExecutionError};
use crate::model::Value;
use crate::registry::function::{EngineFunction, Invocation};
use crate::registry::policy::{ArgumentPolicy, ShortCircuit};
use crate::registry::signature::{FunctionSignature, ParameterInfo};

/// Default location `fail()` marks
pub const JOB_LOCATION: &str = "report/job";
/// Status value written by `fail()` and `exit(1)`
pub const FAIL_STATUS: &str = "FAIL";

/// if(conditional, consequent...)
pub struct IfFunction;

impl EngineFunction for IfFunction {
    fn name(&self) -> &str {
        "if"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
            FunctionSignature::variadic(
                "if",
                vec![
                    ParameterInfo::required("conditional"),
                    ParameterInfo::rest("consequent"),
                ],
            )
        });
        &SIG
    }

    fn policy(&self) -> ArgumentPolicy {
        ArgumentPolicy::conditional(ShortCircuit::If)
    }

    fn documentation(&self) -> &str {
        "If conditional evaluates to true, evaluate each consequent in order. Returns the conditional."
    }

    fn call(
        &self,
        invocation: Invocation,
        _engine: &Evaluator,
        _context: &mut EvaluatorContext,
    ) -> EvaluationResult<Value> {
        Ok(invocation.arg(0))
    }
}

/// iif(conditional, true_exp, false_exp)
pub struct IifFunction;

impl EngineFunction for IifFunction {
    fn name(&self) -> &str {
        "iif"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
            FunctionSignature::new(
                "iif",
                vec![
                    ParameterInfo::required("conditional"),
                    ParameterInfo::required("true_exp"),
                    ParameterInfo::required("false_exp"),
                ],
            )
        });
        &SIG
    }

    fn policy(&self) -> ArgumentPolicy {
        ArgumentPolicy::conditional(ShortCircuit::Iif)
    }

    fn documentation(&self) -> &str {
        "If conditional is true, evaluate and return true_exp, else evaluate and return false_exp."
    }

    fn call(
        &self,
        mut invocation: Invocation,
        _engine: &Evaluator,
        _context: &mut EvaluatorContext,
    ) -> EvaluationResult<Value> {
        let branch = if invocation.arg(0).is_truthy() { 1 } else { 2 };
        Ok(invocation.take(branch))
    }
}

/// fail(location=report/job, message='')
pub struct FailFunction;

impl EngineFunction for FailFunction {
    fn name(&self) -> &str {
        "fail"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
            FunctionSignature::new(
                "fail",
                vec![
                    ParameterInfo::optional("location", JOB_LOCATION),
                    ParameterInfo::optional("message", "''"),
                ],
            )
        });
        &SIG
    }

    fn policy(&self) -> ArgumentPolicy {
        ArgumentPolicy::raw_at(&[0])
    }

    fn documentation(&self) -> &str {
        "Sets location/status to FAIL and continues rule processing. An optional message is added to location/message."
    }

    fn call(
        &self,
        invocation: Invocation,
        engine: &Evaluator,
        context: &mut EvaluatorContext,
    ) -> EvaluationResult<Value> {
        let location = if invocation.args.is_empty() {
            JOB_LOCATION.to_string()
        } else {
            location_arg(&invocation, 0, engine, context)?
        };
        let location = context.namespace.interpolate(&location, false);
        let location = location
            .strip_suffix("/status")
            .unwrap_or(&location)
            .to_string();

        context
            .namespace
            .store(&format!("{location}/status"), FAIL_STATUS)?;
        match invocation.arg(1) {
            Value::Null => {}
            Value::String(message) if message.is_empty() => {}
            message => context
                .namespace
                .append(&format!("{location}/message"), vec![message])?,
        }
        Ok(Value::Boolean(true))
    }
}

/// exit(exit_code=0, message='')
pub struct ExitFunction;

impl EngineFunction for ExitFunction {
    fn name(&self) -> &str {
        "exit"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
            FunctionSignature::new(
                "exit",
                vec![
                    ParameterInfo::optional("exit_code", "0"),
                    ParameterInfo::optional("message", "''"),
                ],
            )
        });
        &SIG
    }

    fn documentation(&self) -> &str {
        "Stops processing the ruleset immediately and exits with the given code, after the report files are written."
    }

    fn call(
        &self,
        invocation: Invocation,
        _engine: &Evaluator,
        _context: &mut EvaluatorContext,
    ) -> EvaluationResult<Value> {
        let code = match invocation.arg(0) {
            Value::Null => 0,
            value => value
                .as_i64()
                .and_then(|code| i32::try_from(code).ok())
                .ok_or_else(|| {
                    ExecutionError::invalid_argument(
                        "exit",
                        format!("exit code needs to be an integer, got \"{value}\""),
                    )
                })?,
        };
        let message = match invocation.arg(1) {
            Value::Null => String::new(),
            value => value.to_string(),
        };
        Err(EvaluationError::Exit { code, message })
    }
}

/// exists(location)
pub struct ExistsFunction;

impl EngineFunction for ExistsFunction {
    fn name(&self) -> &str {
        "exists"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
            FunctionSignature::new("exists", vec![ParameterInfo::required("location")])
        });
        &SIG
    }

    fn policy(&self) -> ArgumentPolicy {
        ArgumentPolicy::raw_at(&[0])
    }

    fn documentation(&self) -> &str {
        "True if location is set in the namespace."
    }

    fn call(
        &self,
        invocation: Invocation,
        engine: &Evaluator,
        context: &mut EvaluatorContext,
    ) -> EvaluationResult<Value> {
        let location = location_arg(&invocation, 0, engine, context)?;
        let location = context.namespace.interpolate(&location, false);
        Ok(Value::Boolean(context.namespace.exists(&location)))
    }
}

/// note(text...)
pub struct NoteFunction;

impl EngineFunction for NoteFunction {
    fn name(&self) -> &str {
        "note"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
            FunctionSignature::variadic("note", vec![ParameterInfo::rest("text")])
        });
        &SIG
    }

    fn policy(&self) -> ArgumentPolicy {
        ArgumentPolicy::raw_from(0)
    }

    fn documentation(&self) -> &str {
        "For comments. A statement can be commented out this way too."
    }

    fn call(
        &self,
        _invocation: Invocation,
        _engine: &Evaluator,
        _context: &mut EvaluatorContext,
    ) -> EvaluationResult<Value> {
        Ok(Value::Boolean(true))
    }
}

/// all(statement...)
pub struct AllFunction;

impl EngineFunction for AllFunction {
    fn name(&self) -> &str {
        "all"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
            FunctionSignature::variadic("all", vec![ParameterInfo::rest("statement")])
        });
        &SIG
    }

    fn documentation(&self) -> &str {
        "Executes each given statement unconditionally and returns their results."
    }

    fn call(
        &self,
        invocation: Invocation,
        _engine: &Evaluator,
        _context: &mut EvaluatorContext,
    ) -> EvaluationResult<Value> {
        Ok(Value::List(invocation.args))
    }
}

#[cfg(test)]
mod tests {
    use crate::evaluator::{ConfigurationError, EvaluationError, Evaluator, EvaluatorContext};
    use crate::model::Value;
    use crate::rule;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_if_skips_consequents_when_false() {
        let mut context = EvaluatorContext::default();
        let engine = Evaluator::default();
        engine
            .evaluate(&rule!(["if", ["lt", 2, 1], ["store", 1, "hit"]]), &mut context)
            .unwrap();
        assert!(!context.namespace.exists("hit"));

        engine
            .evaluate(&rule!(["if", ["lt", 1, 2], ["store", 1, "hit"]]), &mut context)
            .unwrap();
        assert_eq!(context.namespace.read_value("hit"), Value::Integer(1));
    }

    #[test]
    fn test_iif_evaluates_one_branch() {
        let mut context = EvaluatorContext::default();
        let engine = Evaluator::default();
        let value = engine
            .evaluate(
                &rule!(["iif", true, ["store", "\"yes\"", "a"], ["store", "\"no\"", "b"]]),
                &mut context,
            )
            .unwrap();
        assert_eq!(value, Value::Boolean(true));
        assert_eq!(context.namespace.read_value("a"), Value::from("yes"));
        assert!(!context.namespace.exists("b"));
    }

    #[test]
    fn test_non_boolean_condition_is_fatal() {
        let mut context = EvaluatorContext::default();
        let err = Evaluator::default()
            .evaluate(&rule!(["if", 1, ["store", 1, "hit"]]), &mut context)
            .unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::Configuration(ConfigurationError::NonBooleanCondition { .. })
        ));
    }

    #[test]
    fn test_fail_marks_status_and_appends_message() {
        let mut context = EvaluatorContext::default();
        Evaluator::default()
            .evaluate(&rule!(["fail", "report/job/status", "\"too few reads\""]), &mut context)
            .unwrap();
        assert_eq!(
            context.namespace.read_value("report/job/status"),
            Value::from("FAIL")
        );
        assert_eq!(
            context.namespace.read_value("report/job/message"),
            Value::List(vec![Value::from("too few reads")])
        );
    }

    #[test]
    fn test_exit_raises_signal() {
        let mut context = EvaluatorContext::default();
        let err = Evaluator::default()
            .evaluate(&rule!(["exit", 2, "\"again\""]), &mut context)
            .unwrap_err();
        match err {
            EvaluationError::Exit { code, message } => {
                assert_eq!(code, 2);
                assert_eq!(message, "again");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_exists_and_note() {
        let mut context = EvaluatorContext::default();
        let engine = Evaluator::default();
        context.namespace.store("a/b", 1).unwrap();
        assert_eq!(
            engine.evaluate(&rule!(["exists", "a/b"]), &mut context).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            engine.evaluate(&rule!(["exists", "a/c"]), &mut context).unwrap(),
            Value::Boolean(false)
        );
        assert_eq!(
            engine
                .evaluate(&rule!(["note", "anything", ["store", 1, "x"]]), &mut context)
                .unwrap(),
            Value::Boolean(true)
        );
        assert!(!context.namespace.exists("x"));
    }
}
