//! Row stream helpers

use crate::evaluator::{ExecutionError, ExecutionResult};
use crate::model::{Row, Value};
use crate::registry::function::{FunctionRegistry, FunctionResult};
use crate::registry::signature::{FunctionSignature, ParameterInfo};

fn missing_value(function: &str) -> ExecutionError {
    ExecutionError::MissingValue {
        function: function.to_string(),
    }
}

fn length_of(function: &str, value: &Value) -> ExecutionResult<usize> {
    match value {
        Value::String(text) => Ok(text.chars().count()),
        Value::List(items) => Ok(items.len()),
        Value::Map(map) => Ok(map.len()),
        other => Err(ExecutionError::invalid_argument(
            function,
            format!("{} has no length", other.type_name()),
        )),
    }
}

fn iter_value(mut args: Vec<Value>) -> FunctionResult<Value> {
    let mut rows = args.swap_remove(0).into_rows("iterValue")?;
    match rows.next() {
        Some(row) => row?.take_value().ok_or_else(|| missing_value("iterValue")),
        None => Ok(Value::Null),
    }
}

fn iter_value_array(mut args: Vec<Value>) -> FunctionResult<Value> {
    let mut values = Vec::new();
    for row in args.swap_remove(0).into_rows("iterValueArray")? {
        values.push(row?.take_value().ok_or_else(|| missing_value("iterValueArray"))?);
    }
    Ok(Value::List(values))
}

fn iter_length(mut args: Vec<Value>) -> FunctionResult<Value> {
    let rows = args.swap_remove(0).into_rows("iterLength")?;
    Ok(Value::Rows(rows.map_rows(|row: Row| {
        let length = match row.value() {
            Some(value) => length_of("iterLength", value)?,
            None => return Err(missing_value("iterLength")),
        };
        Ok(row.field("length", length))
    })))
}

fn length(args: Vec<Value>) -> FunctionResult<Value> {
    if matches!(args[0], Value::Rows(_)) {
        return iter_length(args);
    }
    Ok(Value::from(length_of("length", &args[0])?))
}

pub(super) fn register_row_functions(registry: &mut FunctionRegistry) {
    registry.register_closure(
        FunctionSignature::new("iterValue", vec![ParameterInfo::required("iterator")]),
        "The value of the iterator's first row.",
        iter_value,
    );
    registry.register_closure(
        FunctionSignature::new("iterValueArray", vec![ParameterInfo::required("iterator")]),
        "The values of all the iterator's rows as a list.",
        iter_value_array,
    );
    registry.register_closure(
        FunctionSignature::new("length", vec![ParameterInfo::required("expression")]),
        "Length of a string or list. For an iterator each row gets its own length field.",
        length,
    );
    registry.register_closure(
        FunctionSignature::new("iterLength", vec![ParameterInfo::required("iterator")]),
        "Adds a length field holding the length of each row's value.",
        iter_length,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RowStream;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn rows(values: serde_json::Value) -> Value {
        Value::Rows(Value::from(values).into_rows("test").unwrap())
    }

    #[test]
    fn test_iter_value_takes_first_row() {
        let value = iter_value(vec![rows(json!([{"value": "a"}, {"value": "b"}]))]).unwrap();
        assert_eq!(value, Value::from("a"));
        let empty = iter_value(vec![Value::Rows(RowStream::from_rows(vec![]))]).unwrap();
        assert_eq!(empty, Value::Null);
    }

    #[test]
    fn test_iter_value_array_requires_value() {
        let values = iter_value_array(vec![rows(json!([{"value": 1}, {"value": 2}]))]).unwrap();
        assert_eq!(values, Value::from(json!([1, 2])));
        let err = iter_value_array(vec![rows(json!([{"other": 1}]))]).unwrap_err();
        assert!(matches!(err, ExecutionError::MissingValue { .. }));
    }

    #[test]
    fn test_length_of_text_list_and_rows() {
        assert_eq!(length(vec![Value::from("héllo")]).unwrap(), Value::from(5));
        assert_eq!(length(vec![Value::from(json!([1, 2]))]).unwrap(), Value::from(2));

        let Value::Rows(stream) = length(vec![rows(json!([{"value": "abc"}]))]).unwrap() else {
            panic!("expected rows");
        };
        let row = stream.into_iter().next().unwrap().unwrap();
        assert_eq!(row.get("length"), Some(&Value::from(3)));
    }
}
