//! Small text, number and list helpers

use std::cmp::Ordering;

use super::{DEFAULT_LABEL, name_camel_case, name_under_score, number_arg, parse_data_type, string_arg};
use crate::evaluator::ExecutionError;
use crate::model::{RowStream, Value};
use crate::registry::function::{FunctionRegistry, FunctionResult};
use crate::registry::signature::{FunctionSignature, ParameterInfo};

fn basename(args: Vec<Value>) -> FunctionResult<Value> {
    let path = string_arg("basename", &args, 0)?;
    let name = path.rsplit('/').next().unwrap_or_default();
    Ok(Value::from(name))
}

fn between(args: Vec<Value>) -> FunctionResult<Value> {
    let (compare, lower, upper) = (&args[0], &args[1], &args[2]);
    let order = |bound: &Value| {
        compare.compare(bound).ok_or_else(|| {
            ExecutionError::invalid_argument(
                "between",
                format!(
                    "can't compare {} with {}",
                    compare.type_name(),
                    bound.type_name()
                ),
            )
        })
    };
    let above = order(lower)? != Ordering::Less;
    let below = order(upper)? == Ordering::Less;
    Ok(Value::Boolean(above && below))
}

fn join(args: Vec<Value>) -> FunctionResult<Value> {
    let delimiter = string_arg("join", &args, 0)?;
    let items: Vec<String> = args[1..].iter().map(Value::to_string).collect();
    Ok(Value::String(items.join(&delimiter)))
}

fn label_default(args: &[Value]) -> String {
    match args.get(1) {
        Some(Value::String(default)) => default.clone(),
        _ => DEFAULT_LABEL.to_string(),
    }
}

fn round(args: Vec<Value>) -> FunctionResult<Value> {
    let value = number_arg("round", &args[0])?;
    let precision = super::int_arg("round", &args, 1, 0)?;
    let scale = 10f64.powi(i32::try_from(precision).unwrap_or(0));
    Ok(Value::Float((value * scale).round() / scale))
}

fn parse_int(args: Vec<Value>) -> FunctionResult<Value> {
    match &args[0] {
        Value::Integer(i) => Ok(Value::Integer(*i)),
        other => {
            let rounded = number_arg("parseInt", other)?.round();
            if rounded.is_finite() && rounded.abs() < i64::MAX as f64 {
                Ok(Value::Integer(rounded as i64))
            } else {
                Err(ExecutionError::invalid_argument(
                    "parseInt",
                    format!("cannot convert {rounded} to integer"),
                ))
            }
        }
    }
}

fn sorted(args: Vec<Value>) -> FunctionResult<Value> {
    let mut items = match args.into_iter().next() {
        Some(Value::List(items)) => items,
        Some(other) => {
            return Err(ExecutionError::invalid_argument(
                "sorted",
                format!("needs a list, got {}", other.type_name()),
            ));
        }
        None => Vec::new(),
    };
    let mut incomparable = false;
    items.sort_by(|a, b| {
        a.compare(b).unwrap_or_else(|| {
            incomparable = true;
            Ordering::Equal
        })
    });
    if incomparable {
        return Err(ExecutionError::invalid_argument(
            "sorted",
            "list items can't be compared with each other",
        ));
    }
    Ok(Value::Rows(RowStream::from_values(items)))
}

/// Every piece of `text` between a `start` phrase and the next `end`
/// phrase after it
fn sections(text: &str, start: &str, end: &str) -> Vec<Value> {
    let mut found = Vec::new();
    let mut cursor = 0;
    while let Some(offset) = text[cursor..].find(start) {
        let body = cursor + offset + start.len();
        let Some(length) = text[body..].find(end) else {
            break;
        };
        found.push(Value::from(&text[body..body + length]));
        cursor = body + length + end.len();
        if start.is_empty() && end.is_empty() {
            break;
        }
    }
    found
}

fn section(args: Vec<Value>) -> FunctionResult<Value> {
    let text = string_arg("section", &args, 0)?;
    let start = string_arg("section", &args, 1)?;
    let end = string_arg("section", &args, 2)?;
    Ok(Value::Rows(RowStream::from_values(sections(&text, &start, &end))))
}

pub(super) fn register_text_functions(registry: &mut FunctionRegistry) {
    registry.register_closure(
        FunctionSignature::new("basename", vec![ParameterInfo::required("path")]),
        "Return the file name and suffix of a file path.",
        basename,
    );
    registry.register_closure(
        FunctionSignature::new(
            "between",
            vec![
                ParameterInfo::required("compare"),
                ParameterInfo::required("lower_bound"),
                ParameterInfo::required("upper_bound"),
            ],
        ),
        "True if lower_bound <= compare < upper_bound. Works for both strings and numbers.",
        between,
    );
    registry.register_closure(
        FunctionSignature::variadic(
            "join",
            vec![
                ParameterInfo::required("delimiter"),
                ParameterInfo::rest("items"),
            ],
        ),
        "Return all items joined by delimiter.",
        join,
    );
    registry.register_closure(
        FunctionSignature::new(
            "nameCamelCase",
            vec![
                ParameterInfo::required("text"),
                ParameterInfo::optional("default", DEFAULT_LABEL),
            ],
        ),
        "Camel case version of text, keeping only letters and digits.",
        |args| {
            let text = string_arg("nameCamelCase", &args, 0)?;
            Ok(Value::String(name_camel_case(&text, &label_default(&args))))
        },
    );
    registry.register_closure(
        FunctionSignature::new(
            "nameUnderScore",
            vec![
                ParameterInfo::required("text"),
                ParameterInfo::optional("default", DEFAULT_LABEL),
            ],
        ),
        "Lowercase version of text with spaces replaced by underscores.",
        |args| {
            let text = string_arg("nameUnderScore", &args, 0)?;
            Ok(Value::String(name_under_score(&text, &label_default(&args))))
        },
    );
    registry.register_closure(
        FunctionSignature::new("parseDataType", vec![ParameterInfo::required("text")]),
        "Recognize booleans, integers and floats in text.",
        |mut args| Ok(parse_data_type(args.swap_remove(0))),
    );
    registry.register_closure(
        FunctionSignature::new("parseInt", vec![ParameterInfo::required("number")]),
        "Convert number, rounded, into an integer.",
        parse_int,
    );
    registry.register_closure(
        FunctionSignature::new(
            "round",
            vec![
                ParameterInfo::required("number"),
                ParameterInfo::optional("precision", "0"),
            ],
        ),
        "Round number to the given number of decimals.",
        round,
    );
    registry.register_closure(
        FunctionSignature::new("first", vec![ParameterInfo::required("list")]),
        "First element of a list, or None.",
        |args| match &args[0] {
            Value::List(items) => Ok(items.first().cloned().unwrap_or_default()),
            _ => Ok(Value::Null),
        },
    );
    registry.register_closure(
        FunctionSignature::new("last", vec![ParameterInfo::required("list")]),
        "Last element of a list, or None.",
        |args| match &args[0] {
            Value::List(items) => Ok(items.last().cloned().unwrap_or_default()),
            _ => Ok(Value::Null),
        },
    );
    registry.register_closure(
        FunctionSignature::new("sorted", vec![ParameterInfo::required("list")]),
        "Rows holding the list's items in sorted order.",
        sorted,
    );
    registry.register_closure(
        FunctionSignature::new(
            "section",
            vec![
                ParameterInfo::required("text"),
                ParameterInfo::required("start_phrase"),
                ParameterInfo::required("end_phrase"),
            ],
        ),
        "Rows holding each part of text between start_phrase and the following end_phrase.",
        section,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("/data/run/sample.fastq", "sample.fastq")]
    #[case("sample.fastq", "sample.fastq")]
    #[case("/data/run/", "")]
    fn test_basename(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(basename(vec![Value::from(path)]).unwrap(), Value::from(expected));
    }

    #[test]
    fn test_between_is_half_open() {
        let check = |c: i64| {
            between(vec![Value::from(c), Value::from(10), Value::from(20)]).unwrap()
        };
        assert_eq!(check(10), Value::Boolean(true));
        assert_eq!(check(19), Value::Boolean(true));
        assert_eq!(check(20), Value::Boolean(false));
        assert!(between(vec![Value::from("a"), Value::from(1), Value::from(2)]).is_err());
    }

    #[test]
    fn test_join_renders_items() {
        let joined = join(vec![Value::from("-"), Value::from("a"), Value::from(2)]).unwrap();
        assert_eq!(joined, Value::from("a-2"));
    }

    #[test]
    fn test_round_and_parse_int() {
        assert_eq!(
            round(vec![Value::Float(3.14159), Value::from(2)]).unwrap(),
            Value::Float(3.14)
        );
        assert_eq!(round(vec![Value::from(7)]).unwrap(), Value::Float(7.0));
        assert_eq!(parse_int(vec![Value::Float(2.5)]).unwrap(), Value::Integer(3));
        assert!(parse_int(vec![Value::from("x")]).is_err());
    }

    #[test]
    fn test_sorted_yields_rows() {
        let rows = sorted(vec![Value::from(serde_json::json!([3, 1, 2]))]).unwrap();
        let values: Vec<Value> = rows
            .into_rows("test")
            .unwrap()
            .map(|row| row.unwrap().value().cloned().unwrap())
            .collect();
        assert_eq!(values, vec![Value::from(1), Value::from(2), Value::from(3)]);
    }

    #[test]
    fn test_sections_between_phrases() {
        let text = "<a>one</a> skip <a>two</a> <a>open";
        assert_eq!(
            sections(text, "<a>", "</a>"),
            vec![Value::from("one"), Value::from("two")]
        );
        assert!(sections(text, "<b>", "</b>").is_empty());
    }
}
