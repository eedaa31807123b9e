//! Prefix-notation tree walker

use std::sync::Arc;

use super::context::EvaluatorContext;
use super::error::{ConfigurationError, EvaluationError, EvaluationResult, ExecutionError};
use crate::ast::{Token, unquote};
use crate::model::Value;
use crate::registry::function::{FunctionDescriptor, FunctionImpl, Invocation};
use crate::registry::policy::ShortCircuit;
use crate::registry::{FunctionRegistry, create_standard_registry};

/// Default maximum nesting depth of function calls
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Evaluates rule trees against an [`EvaluatorContext`]
#[derive(Debug, Clone)]
pub struct Evaluator {
    registry: Arc<FunctionRegistry>,
    max_depth: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(Arc::new(create_standard_registry()))
    }
}

impl Evaluator {
    /// Create an evaluator over the given registry
    pub fn new(registry: Arc<FunctionRegistry>) -> Self {
        Self {
            registry,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Set the maximum nesting depth of function calls
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// The function registry
    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Evaluate one rule tree.
    ///
    /// A tree headed by a known function name is a call. A tree headed by a
    /// nested list groups several expressions and yields all their results.
    /// Anything else is data and comes back as is.
    pub fn evaluate(&self, tree: &[Token], context: &mut EvaluatorContext) -> EvaluationResult<Value> {
        let Some(head) = tree.first() else {
            log::warn!(
                "A function expression is empty in rule #{}",
                context.rule_row
            );
            return Ok(Value::Null);
        };

        match head {
            Token::Text(name) => {
                if let Some(descriptor) = self.registry.lookup(name) {
                    return self.evaluate_call(&descriptor, &tree[1..], context);
                }
            }
            Token::List(_) => {
                let mut results = Vec::with_capacity(tree.len());
                for term in tree {
                    results.push(self.resolve_term(term, context)?);
                }
                return Ok(Value::List(results));
            }
            _ => {}
        }

        log::debug!("Returning (no function): {}", Token::List(tree.to_vec()));
        Ok(Value::List(tree.iter().map(Token::to_value).collect()))
    }

    /// Evaluate each nested rule in `rules`, discarding results.
    /// Non-list terms are ignored.
    pub fn evaluate_rules(&self, rules: &[Token], context: &mut EvaluatorContext) -> EvaluationResult<()> {
        for rule in rules {
            if let Token::List(items) = rule {
                log::debug!("Evaluating auxiliary rule: {rule}");
                self.evaluate(items, context)?;
            }
        }
        Ok(())
    }

    /// Resolve one argument term: nested lists are evaluated, quoted strings
    /// are literals, other strings are interpolated and read from the
    /// namespace.
    pub fn resolve_term(&self, term: &Token, context: &mut EvaluatorContext) -> EvaluationResult<Value> {
        match term {
            Token::List(items) => self.evaluate(items, context),
            Token::Text(text) => match unquote(text) {
                Some(literal) => Ok(Value::String(literal.to_string())),
                None => {
                    let name = context.namespace.interpolate(text, false);
                    Ok(context.namespace.read_value(&name))
                }
            },
            literal => Ok(literal.to_value()),
        }
    }

    /// Call a registered function with values that are already evaluated
    pub fn call_with_values(
        &self,
        name: &str,
        args: Vec<Value>,
        context: &mut EvaluatorContext,
    ) -> EvaluationResult<Value> {
        let descriptor = self.registry.lookup(name).ok_or_else(|| {
            ExecutionError::invalid_argument(name, "not a known function")
        })?;
        self.check_arity(&descriptor, args.len(), context)?;
        let invocation = Invocation {
            name: name.to_string(),
            arg_texts: args.iter().map(Value::to_string).collect(),
            terms: Vec::new(),
            args,
        };
        self.dispatch(&descriptor, invocation, context)
    }

    fn evaluate_call(
        &self,
        descriptor: &FunctionDescriptor,
        terms: &[Token],
        context: &mut EvaluatorContext,
    ) -> EvaluationResult<Value> {
        if context.depth() >= self.max_depth {
            return Err(EvaluationError::Internal(format!(
                "rule #{} nests function calls deeper than {}",
                context.rule_row, self.max_depth
            )));
        }

        context.push_frame(&descriptor.name);
        let result = match self.execute(descriptor, terms, context) {
            Err(EvaluationError::Execution(err)) => {
                report_rule_error(context, &err);
                Ok(Value::Null)
            }
            other => other,
        };
        context.pop_frame();
        result
    }

    fn execute(
        &self,
        descriptor: &FunctionDescriptor,
        terms: &[Token],
        context: &mut EvaluatorContext,
    ) -> EvaluationResult<Value> {
        self.check_arity(descriptor, terms.len(), context)?;

        let policy = descriptor.policy;
        let mut invocation = Invocation {
            name: descriptor.name.clone(),
            args: Vec::with_capacity(terms.len()),
            arg_texts: Vec::with_capacity(terms.len()),
            terms: terms.to_vec(),
        };
        let mut condition = true;

        for (position, term) in terms.iter().enumerate() {
            let value = if policy.skips(position, condition) {
                Value::Null
            } else if policy.is_raw(position) {
                raw_argument(term)
            } else {
                self.resolve_term(term, context)?
            };

            if position == 0 && policy.short_circuit != ShortCircuit::None {
                condition = match value {
                    Value::Boolean(b) => b,
                    ref other => {
                        return Err(ConfigurationError::NonBooleanCondition {
                            function: descriptor.name.clone(),
                            row: context.rule_row,
                            value: format!("{other} ({})", other.type_name()),
                        }
                        .into());
                    }
                };
            }

            let text = term.to_string();
            context.record_arg_text(&text);
            invocation.args.push(value);
            invocation.arg_texts.push(text);
        }

        log::debug!(
            "Executing function: {}({})",
            invocation.name,
            invocation.arg_texts.join(", ")
        );
        self.dispatch(descriptor, invocation, context)
    }

    fn dispatch(
        &self,
        descriptor: &FunctionDescriptor,
        invocation: Invocation,
        context: &mut EvaluatorContext,
    ) -> EvaluationResult<Value> {
        let target = descriptor
            .inplace
            .then(|| inplace_target(&invocation))
            .transpose()?;

        let result = match &descriptor.implementation {
            FunctionImpl::HostOp(op) => (op.func)(&invocation.args)?,
            FunctionImpl::Engine(function) => function.call(invocation, self, context)?,
            FunctionImpl::Free(function) => function.evaluate(invocation.args)?,
            FunctionImpl::Closure { func, .. } => func(invocation.args)?,
        };

        if let Some(target) = target {
            let location = context.namespace.interpolate(&target, false);
            context.namespace.store(&location, result.clone())?;
        }
        Ok(result)
    }

    fn check_arity(
        &self,
        descriptor: &FunctionDescriptor,
        count: usize,
        context: &EvaluatorContext,
    ) -> EvaluationResult<()> {
        if descriptor.signature.accepts(count) {
            return Ok(());
        }
        Err(ExecutionError::Arity {
            row: context.rule_row,
            expected: descriptor.signature.arity_text(),
            actual: count,
            usage: descriptor.signature.to_string(),
        }
        .into())
    }
}

/// A raw argument: text passes without its quotes, literals as themselves,
/// nested rules are deferred and read by the function from its terms.
fn raw_argument(term: &Token) -> Value {
    match term {
        Token::Text(text) => Value::String(unquote(text).unwrap_or(text).to_string()),
        Token::List(_) => Value::Null,
        literal => literal.to_value(),
    }
}

fn inplace_target(invocation: &Invocation) -> EvaluationResult<String> {
    match invocation.terms.first() {
        Some(Token::Text(text)) if unquote(text).is_none() => Ok(text.clone()),
        _ => match invocation.arg_texts.first() {
            Some(text) if invocation.terms.is_empty() => Ok(text.clone()),
            _ => Err(ExecutionError::invalid_argument(
                &invocation.name,
                "an in-place function needs a namespace location as its first argument",
            )
            .into()),
        },
    }
}

/// Log a recoverable rule error with its position and failing call
pub fn report_rule_error(context: &EvaluatorContext, err: &ExecutionError) {
    let (name, args) = match context.current_frame() {
        Some(frame) if !frame.arg_texts.is_empty() => {
            (frame.name.as_str(), format!("\"{}\"", frame.arg_texts.join("\", \"")))
        }
        Some(frame) => (frame.name.as_str(), String::new()),
        None => ("", String::new()),
    };
    log::error!("Rule #{}: {name}({args}) problem: {err}", context.rule_row);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule;
    use pretty_assertions::assert_eq;

    fn run(tree: Vec<Token>, context: &mut EvaluatorContext) -> Value {
        Evaluator::default().evaluate(&tree, context).unwrap()
    }

    #[test]
    fn test_nested_calls() {
        let mut context = EvaluatorContext::default();
        let value = run(rule!(["add", ["mul", 2, 3], 4]), &mut context);
        assert_eq!(value, Value::Integer(10));
    }

    #[test]
    fn test_unknown_head_returns_data() {
        let mut context = EvaluatorContext::default();
        let value = run(rule!(["a", 1, "\"b\""]), &mut context);
        assert_eq!(
            value,
            Value::List(vec![Value::from("a"), Value::Integer(1), Value::from("b")])
        );
    }

    #[test]
    fn test_grouping_evaluates_each_expression() {
        let mut context = EvaluatorContext::default();
        let value = run(rule!([["add", 1, 1], ["sub", 5, 2]]), &mut context);
        assert_eq!(value, Value::List(vec![Value::Integer(2), Value::Integer(3)]));
    }

    #[test]
    fn test_quoted_text_bypasses_namespace() {
        let mut context = EvaluatorContext::default();
        context.namespace.store("x", 5).unwrap();
        assert_eq!(run(rule!(["add", "x", 1]), &mut context), Value::Integer(6));
        assert_eq!(
            run(rule!(["concat", "\"x\"", "\"y\""]), &mut context),
            Value::from("xy")
        );
    }

    #[test]
    fn test_execution_error_yields_null() {
        let mut context = EvaluatorContext::default();
        assert_eq!(run(rule!(["add", 1, "\"x\""]), &mut context), Value::Null);
        assert_eq!(run(rule!(["lt", 1]), &mut context), Value::Null);
        assert_eq!(run(rule!(["lt", 1, 2, 3]), &mut context), Value::Null);
        assert_eq!(context.depth(), 0);
    }

    #[test]
    fn test_inplace_restores_first_argument() {
        let mut context = EvaluatorContext::default();
        context.namespace.store("stats/count", 2).unwrap();
        run(rule!(["iadd", "stats/count", 3]), &mut context);
        assert_eq!(context.namespace.read_value("stats/count"), Value::Integer(5));
    }

    #[test]
    fn test_max_depth_is_fatal() {
        let mut context = EvaluatorContext::default();
        let evaluator = Evaluator::default().with_max_depth(2);
        let err = evaluator
            .evaluate(&rule!(["neg", ["neg", ["neg", 1]]]), &mut context)
            .unwrap_err();
        assert!(matches!(err, EvaluationError::Internal(_)));
    }

    #[test]
    fn test_call_with_values() {
        let mut context = EvaluatorContext::default();
        let value = Evaluator::default()
            .call_with_values("add", vec![Value::Integer(1), Value::Integer(2)], &mut context)
            .unwrap();
        assert_eq!(value, Value::Integer(3));
    }
}
