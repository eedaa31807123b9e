//! store() and store_array(): write a value or a row stream into the namespace

use std::sync::LazyLock;

use super::location_arg;
use crate::ast::Token;
use crate::evaluator::{EvaluationResult, Evaluator, EvaluatorContext, ExecutionError};
use crate::model::{Row, RowStream, Value};
use crate::namespace::{fill_row_template, has_deferred_marker};
use crate::registry::function::{EngineFunction, Invocation};
use crate::registry::policy::ArgumentPolicy;
use crate::registry::signature::{FunctionSignature, ParameterInfo};

/// store(value, location, rules...) and store_array(value, location, rules...)
pub struct StoreFunction {
    as_array: bool,
}

impl StoreFunction {
    /// `store`: a single row result is unwrapped to a scalar
    pub fn single() -> Self {
        Self { as_array: false }
    }

    /// `store_array`: row results always become a list
    pub fn array() -> Self {
        Self { as_array: true }
    }
}

fn store_signature(name: &str) -> FunctionSignature {
    FunctionSignature::variadic(
        name,
        vec![
            ParameterInfo::required("value"),
            ParameterInfo::required("location"),
            ParameterInfo::rest("rules"),
        ],
    )
}

impl EngineFunction for StoreFunction {
    fn name(&self) -> &str {
        if self.as_array { "store_array" } else { "store" }
    }

    fn signature(&self) -> &FunctionSignature {
        static STORE: LazyLock<FunctionSignature> = LazyLock::new(|| store_signature("store"));
        static STORE_ARRAY: LazyLock<FunctionSignature> =
            LazyLock::new(|| store_signature("store_array"));
        if self.as_array { &STORE_ARRAY } else { &STORE }
    }

    fn policy(&self) -> ArgumentPolicy {
        ArgumentPolicy::raw_from(1)
    }

    fn documentation(&self) -> &str {
        if self.as_array {
            "Like store(), but an iterable's values are always saved as an array."
        } else {
            "Evaluate value and set the namespace location to it. Each remaining rule runs after the write, once per row for iterables."
        }
    }

    fn call(
        &self,
        mut invocation: Invocation,
        engine: &Evaluator,
        context: &mut EvaluatorContext,
    ) -> EvaluationResult<Value> {
        let location = location_arg(&invocation, 1, engine, context)?;
        let value = invocation.take(0);
        let auxiliaries = invocation.rules_from(2).to_vec();
        let stored = write_namespace(
            engine,
            context,
            self.name(),
            value,
            &location,
            self.as_array,
            &auxiliaries,
        )?;
        Ok(Value::Boolean(stored))
    }
}

/// Write `value` at `location`, running `auxiliaries` after each write.
///
/// Scalars, plain mappings and non-empty lists without mappings are stored
/// as they are. Row streams and lists of mappings, the empty list included,
/// are consumed row by row: with a `%(field)s` template in the location every
/// row goes to its own location, otherwise the row values are collected into
/// one entry. Returns false, leaving null behind, when there were no rows.
pub fn write_namespace(
    engine: &Evaluator,
    context: &mut EvaluatorContext,
    function: &str,
    value: Value,
    location: &str,
    as_array: bool,
    auxiliaries: &[Token],
) -> EvaluationResult<bool> {
    let depth = context.iterator_depth();
    context.namespace.set_iterator_slot(depth, None);

    let value = match value {
        Value::String(text) => Value::String(context.namespace.interpolate(&text, false)),
        other => other,
    };
    let location = context.namespace.interpolate(location, true);

    let rows = match value {
        Value::Rows(rows) => rows,
        Value::List(items) if items.iter().all(|v| matches!(v, Value::Map(_))) => {
            RowStream::from_rows(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::Map(map) => Some(Row::from(map)),
                        _ => None,
                    })
                    .collect(),
            )
        }
        Value::List(items) if items.iter().any(|v| matches!(v, Value::Map(_))) => {
            return Err(ExecutionError::invalid_argument(
                function,
                "a list mixing dictionaries and other values can't be stored",
            )
            .into());
        }
        data => {
            log::debug!("{function}(..., {location}) = {data}");
            context.namespace.store(&location, data)?;
            engine.evaluate_rules(auxiliaries, context)?;
            return Ok(true);
        }
    };

    if has_deferred_marker(&location) {
        return fan_out(engine, context, function, rows, &location, auxiliaries);
    }

    let mut values = Vec::new();
    for row in rows {
        let row = row?;
        context.namespace.set_iterator_slot(depth, Some(&row));
        engine.evaluate_rules(auxiliaries, context)?;
        match row.value() {
            Some(value) => values.push(value.clone()),
            None => {
                return Err(ExecutionError::MissingValue {
                    function: function.to_string(),
                }
                .into());
            }
        }
    }

    let stored = match values.len() {
        0 => {
            context.namespace.store(&location, Value::Null)?;
            log::warn!("No results, can't set ({location})");
            return Ok(false);
        }
        1 if !as_array => values.remove(0),
        _ => Value::List(values),
    };
    log::debug!("Set single entry ({location})");
    context.namespace.store(&location, stored)?;
    Ok(true)
}

fn fan_out(
    engine: &Evaluator,
    context: &mut EvaluatorContext,
    function: &str,
    rows: RowStream,
    template: &str,
    auxiliaries: &[Token],
) -> EvaluationResult<bool> {
    let depth = context.iterator_depth();
    let mut found = false;

    for row in rows {
        let row = row?;
        found = true;
        let location = fill_row_template(template, &row)?;
        let value = row.value().cloned().ok_or_else(|| ExecutionError::MissingValue {
            function: function.to_string(),
        })?;
        log::debug!("Set separate row ({template}) {location} = {value}");
        context.namespace.store(&location, value)?;
        context.namespace.set_iterator_slot(depth, Some(&row));
        engine.evaluate_rules(auxiliaries, context)?;
    }

    if !found {
        context.namespace.store(template, Value::Null)?;
        log::warn!("No results, can't set ({template})");
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::EvaluationError;
    use crate::rule;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn rows(values: &[i64]) -> Value {
        Value::Rows(RowStream::from_rows(
            values.iter().map(|v| Row::with_value(*v)).collect(),
        ))
    }

    #[test]
    fn test_single_row_unwraps_unless_array() {
        let mut context = EvaluatorContext::default();
        let engine = Evaluator::default();
        let digits = json!(["regexp", "\"a=1\"", "\"=(?P<value>\\d)\""]);
        engine
            .evaluate(&rule!(["store", digits.clone(), "one"]), &mut context)
            .unwrap();
        engine
            .evaluate(&rule!(["store_array", digits, "many"]), &mut context)
            .unwrap();
        assert_eq!(context.namespace.read_value("one"), Value::Integer(1));
        assert_eq!(
            context.namespace.read_value("many"),
            Value::List(vec![Value::Integer(1)])
        );
    }

    #[test]
    fn test_zero_rows_store_null_and_report_false() {
        let mut context = EvaluatorContext::default();
        let engine = Evaluator::default();
        context
            .namespace
            .store("empty", Value::from(json!([])))
            .unwrap();

        for location in ["tgt/none", "tgt/empty"] {
            let source = if location == "tgt/none" {
                json!(["regexp", "\"abc\"", "\"(?P<value>\\d)\""])
            } else {
                json!("empty")
            };
            let stored = engine
                .evaluate(&rule!(["store", source, location]), &mut context)
                .unwrap();
            assert_eq!(stored, Value::Boolean(false), "{location}");
            assert_eq!(context.namespace.read_value(location), Value::Null);
        }
    }

    #[test]
    fn test_fan_out_without_rows_stores_null_at_template() {
        let mut context = EvaluatorContext::default();
        let stored = write_namespace(
            &Evaluator::default(),
            &mut context,
            "store",
            Value::from(json!([])),
            "tgt/{field}",
            false,
            &[],
        )
        .unwrap();
        assert!(!stored);
        assert_eq!(context.namespace.read_value("tgt/%(field)s"), Value::Null);
    }

    #[test]
    fn test_fan_out_writes_each_row() {
        let mut context = EvaluatorContext::default();
        let value = Value::Rows(RowStream::from_rows(vec![
            Row::with_value(10).field("lane", "L1"),
            Row::with_value(20).field("lane", "L2"),
        ]));
        let stored = write_namespace(
            &Evaluator::default(),
            &mut context,
            "store",
            value,
            "lanes/{lane}/reads",
            false,
            &[],
        )
        .unwrap();
        assert!(stored);
        assert_eq!(
            context.namespace.section_json("lanes"),
            json!({"L1": {"reads": 10}, "L2": {"reads": 20}})
        );
    }

    #[test]
    fn test_missing_template_field_is_key_mismatch() {
        let mut context = EvaluatorContext::default();
        let err = write_namespace(
            &Evaluator::default(),
            &mut context,
            "store",
            rows(&[1]),
            "tgt/{lane}",
            false,
            &[],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::Execution(ExecutionError::KeyMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_value_is_a_rule_error() {
        let mut context = EvaluatorContext::default();
        let err = write_namespace(
            &Evaluator::default(),
            &mut context,
            "store",
            Value::Rows(RowStream::from_rows(vec![Row::new().field("name", "x")])),
            "tgt",
            false,
            &[],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::Execution(ExecutionError::MissingValue { .. })
        ));
        assert!(!context.namespace.exists("tgt"));
    }

    #[test]
    fn test_auxiliaries_run_per_row_with_iterator_slot() {
        let mut context = EvaluatorContext::default();
        Evaluator::default()
            .evaluate(
                &rule!([
                    "store",
                    ["regexp", "\"1 2 3\"", "\"(?P<value>\\d)\""],
                    "vals",
                    ["append", "iterator/0/value", "seen"]
                ]),
                &mut context,
            )
            .unwrap();
        let expected = Value::from(json!([1, 2, 3]));
        assert_eq!(context.namespace.read_value("vals"), expected);
        assert_eq!(context.namespace.read_value("seen"), expected);
    }

    #[test]
    fn test_mixed_list_is_invalid() {
        let mut context = EvaluatorContext::default();
        let err = write_namespace(
            &Evaluator::default(),
            &mut context,
            "store",
            Value::from(json!([{"value": 1}, 2])),
            "tgt",
            false,
            &[],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::Execution(ExecutionError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_scalar_lists_are_stored_as_data() {
        let mut context = EvaluatorContext::default();
        let stored = write_namespace(
            &Evaluator::default(),
            &mut context,
            "store",
            Value::from(json!([1, "a"])),
            "tgt",
            false,
            &[],
        )
        .unwrap();
        assert!(stored);
        assert_eq!(context.namespace.read_value("tgt"), Value::from(json!([1, "a"])));
    }
}
