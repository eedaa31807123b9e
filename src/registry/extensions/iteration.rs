//! iterate(), iterMap(), append() and clear()

use std::sync::LazyLock;

use crate::evaluator::{EvaluationResult, Evaluator, EvaluatorContext, ExecutionError};
use crate::model::{Value, ValueMap};
use crate::registry::builtins::location_arg;
use crate::registry::function::{EngineFunction, Invocation};
use crate::registry::policy::ArgumentPolicy;
use crate::registry::signature::{FunctionSignature, ParameterInfo};

/// iterate(iterator, location, rules...)
pub struct IterateFunction;

impl EngineFunction for IterateFunction {
    fn name(&self) -> &str {
        "iterate"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
            FunctionSignature::variadic(
                "iterate",
                vec![
                    ParameterInfo::required("iterator"),
                    ParameterInfo::required("location"),
                    ParameterInfo::rest("rules"),
                ],
            )
        });
        &SIG
    }

    fn policy(&self) -> ArgumentPolicy {
        ArgumentPolicy::raw_from(1)
    }

    fn documentation(&self) -> &str {
        "Iterate through the iterator's rows, storing each in location and then running each rule. The row is also available in iterator/[depth]."
    }

    fn call(
        &self,
        mut invocation: Invocation,
        engine: &Evaluator,
        context: &mut EvaluatorContext,
    ) -> EvaluationResult<Value> {
        let location = location_arg(&invocation, 1, engine, context)?;
        let location = context.namespace.interpolate(&location, false);
        let rows = invocation.take(0).into_rows("iterate")?;
        let rules = invocation.rules_from(2).to_vec();

        let depth = context.iterator_depth();
        context.namespace.set_iterator_slot(depth, None);

        let mut found = 0usize;
        for row in rows {
            let row = row?;
            found += 1;
            context.namespace.set_iterator_slot(depth, Some(&row));
            context.namespace.store(&location, Value::from(row))?;
            engine.evaluate_rules(&rules, context)?;
        }

        if found == 0 {
            log::info!("Note, no iterations to do.");
            return Ok(Value::Boolean(false));
        }
        log::debug!("iterate() done {found} times.");
        Ok(Value::Boolean(true))
    }
}

/// iterMap(iterator, function)
pub struct IterMapFunction;

impl EngineFunction for IterMapFunction {
    fn name(&self) -> &str {
        "iterMap"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
            FunctionSignature::new(
                "iterMap",
                vec![
                    ParameterInfo::required("iterator"),
                    ParameterInfo::required("function"),
                ],
            )
        });
        &SIG
    }

    fn policy(&self) -> ArgumentPolicy {
        ArgumentPolicy::raw_at(&[1])
    }

    fn documentation(&self) -> &str {
        "Folds the iterator's row values with the given two-argument function and returns the result."
    }

    fn call(
        &self,
        mut invocation: Invocation,
        engine: &Evaluator,
        context: &mut EvaluatorContext,
    ) -> EvaluationResult<Value> {
        let function = invocation.text(1).unwrap_or_default();
        if !engine.registry().contains(&function) {
            return Err(ExecutionError::invalid_argument(
                "iterMap",
                format!("function wasn't given a known function: {function}"),
            )
            .into());
        }

        let mut folded: Option<Value> = None;
        for row in invocation.take(0).into_rows("iterMap")? {
            let value = row?.take_value().ok_or_else(|| ExecutionError::MissingValue {
                function: "iterMap".to_string(),
            })?;
            folded = Some(match folded {
                None => value,
                Some(acc) => engine.call_with_values(&function, vec![acc, value], context)?,
            });
        }
        Ok(folded.unwrap_or_default())
    }
}

/// append(value, location)
pub struct AppendFunction;

impl EngineFunction for AppendFunction {
    fn name(&self) -> &str {
        "append"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
            FunctionSignature::new(
                "append",
                vec![
                    ParameterInfo::required("value"),
                    ParameterInfo::required("location"),
                ],
            )
        });
        &SIG
    }

    fn policy(&self) -> ArgumentPolicy {
        ArgumentPolicy::raw_at(&[1])
    }

    fn documentation(&self) -> &str {
        "Appends value (each row value of an iterable) to the list at location, creating the list if needed. Returns the last value appended."
    }

    fn call(
        &self,
        mut invocation: Invocation,
        engine: &Evaluator,
        context: &mut EvaluatorContext,
    ) -> EvaluationResult<Value> {
        let location = location_arg(&invocation, 1, engine, context)?;
        let location = context.namespace.interpolate(&location, false);

        let values = match invocation.take(0) {
            Value::Rows(rows) => {
                let mut values = Vec::new();
                for row in rows {
                    let mut row = row?;
                    values.push(match row.take_value() {
                        Some(value) => value,
                        None => Value::from(row),
                    });
                }
                values
            }
            Value::List(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Map(mut map) if map.contains_key("value") => {
                        map.shift_remove("value").unwrap_or_default()
                    }
                    other => other,
                })
                .collect(),
            scalar => vec![scalar],
        };

        let last = values.last().cloned().unwrap_or_default();
        context.namespace.append(&location, values)?;
        Ok(last)
    }
}

/// clear(location)
pub struct ClearFunction;

impl EngineFunction for ClearFunction {
    fn name(&self) -> &str {
        "clear"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
            FunctionSignature::new("clear", vec![ParameterInfo::required("location")])
        });
        &SIG
    }

    fn policy(&self) -> ArgumentPolicy {
        ArgumentPolicy::raw_at(&[0])
    }

    fn inplace(&self) -> bool {
        true
    }

    fn documentation(&self) -> &str {
        "Clears location by type: a string becomes '', a number 0, a list [] and a dictionary (or unset location) {}."
    }

    fn call(
        &self,
        invocation: Invocation,
        engine: &Evaluator,
        context: &mut EvaluatorContext,
    ) -> EvaluationResult<Value> {
        let location = location_arg(&invocation, 0, engine, context)?;
        let location = context.namespace.interpolate(&location, false);
        let (container, key) = context.namespace.resolve_path(&location)?;

        Ok(match context.namespace.peek(container, &key) {
            Some(Value::List(_)) => Value::List(Vec::new()),
            Some(Value::Integer(_)) => Value::Integer(0),
            Some(Value::Float(_)) => Value::Float(0.0),
            Some(Value::String(_)) => Value::String(String::new()),
            _ => Value::Map(ValueMap::new()),
        })
    }
}
