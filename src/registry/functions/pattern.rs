//! regexp(): named-group regular expression matching into rows

use regex::Regex;
use std::sync::LazyLock;

use super::{DEFAULT_LABEL, NameCleaning, parse_data_type};
use crate::evaluator::{ExecutionError, ExecutionResult};
use crate::model::{NAME_KEY, ROW_KEY, Row, RowStream, VALUE_KEY, Value};
use crate::registry::function::{FunctionResult, RuleFunction};
use crate::registry::signature::{FunctionSignature, ParameterInfo};

/// regexp(subjects, regex, clean_name=False)
pub struct RegexpFunction;

/// Rows for every match of `regex` in `subject`: one field per named group,
/// `ROW` holding the match index and `value` typed by content.
fn match_rows(regex: &Regex, subject: &str, cleaning: NameCleaning) -> Vec<ExecutionResult<Row>> {
    log::debug!(
        "Applying regex \"{}\" to \"{} ...\"",
        regex.as_str(),
        subject.chars().take(50).collect::<String>().replace('\n', "\\n")
    );

    regex
        .captures_iter(subject)
        .enumerate()
        .map(|(ptr, caps)| {
            let mut row = Row::new();
            for name in regex.capture_names().flatten() {
                let value = caps
                    .name(name)
                    .map_or(Value::Null, |m| Value::from(m.as_str()));
                row.insert(name, value);
            }
            row.insert(ROW_KEY, ptr);

            if cleaning != NameCleaning::None {
                if let Some(Value::String(name)) = row.get(NAME_KEY) {
                    let cleaned = cleaning.apply(name, DEFAULT_LABEL);
                    row.insert(NAME_KEY, cleaned);
                }
            }
            let value = match row.value() {
                Some(value) => parse_data_type(value.clone()),
                None => Value::from(""),
            };
            row.insert(VALUE_KEY, value);
            Ok(row)
        })
        .collect()
}

fn subject_text(subject: Value) -> ExecutionResult<String> {
    let subject = match subject {
        Value::Map(mut map) if map.contains_key(VALUE_KEY) => {
            map.shift_remove(VALUE_KEY).unwrap_or_default()
        }
        other => other,
    };
    match subject {
        Value::String(text) => Ok(text),
        other => Err(ExecutionError::invalid_argument(
            "regexp",
            format!("didn't receive a string to search, got {}", other.type_name()),
        )),
    }
}

impl RuleFunction for RegexpFunction {
    fn name(&self) -> &str {
        "regexp"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
            FunctionSignature::new(
                "regexp",
                vec![
                    ParameterInfo::required("subjects"),
                    ParameterInfo::required("regex"),
                    ParameterInfo::optional("clean_name", "False"),
                ],
            )
        });
        &SIG
    }

    fn documentation(&self) -> &str {
        "Apply a regular expression to text, a list of texts or each row's value. Named groups such as (?P<value>...) become row fields. clean_name=camelCase turns a \"name\" group \"A BC\" into \"aBc\", any other true value into \"a_bc\"."
    }

    fn evaluate(&self, args: Vec<Value>) -> FunctionResult<Value> {
        let mut args = args.into_iter();
        let subjects = args.next().unwrap_or_default();
        let pattern = match args.next() {
            Some(Value::String(pattern)) => pattern,
            other => {
                return Err(ExecutionError::invalid_argument(
                    "regexp",
                    format!(
                        "regex needs to be a string, got {}",
                        other.unwrap_or_default().type_name()
                    ),
                ));
            }
        };
        let cleaning = NameCleaning::from_arg(args.next().as_ref());

        let regex = Regex::new(&pattern).map_err(|err| {
            ExecutionError::invalid_argument(
                "regexp",
                format!("couldn't compile the regular expression: {err}"),
            )
        })?;

        let subjects: Box<dyn Iterator<Item = ExecutionResult<Value>>> = match subjects {
            Value::Rows(rows) => Box::new(rows.map(|row| row.map(Value::from))),
            Value::List(items) => Box::new(items.into_iter().map(Ok)),
            single => Box::new(std::iter::once(Ok(single))),
        };

        let matches = subjects.flat_map(move |subject| {
            match subject.and_then(subject_text) {
                Ok(text) => match_rows(&regex, &text, cleaning),
                Err(err) => vec![Err(err)],
            }
        });
        Ok(Value::Rows(RowStream::new(matches)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn collect(value: Value) -> Vec<Row> {
        value
            .into_rows("test")
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_regexp_named_groups_become_typed_fields() {
        let text = "Total Reads: 1,500\nMapped Reads: 1,200\n";
        let rows = collect(
            RegexpFunction
                .evaluate(vec![
                    Value::from(text),
                    Value::from(r"(?P<name>[A-Za-z ]+): (?P<value>[\d,]+)"),
                    Value::from("camelCase"),
                ])
                .unwrap(),
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("name"), Some(&Value::from("totalReads")));
        assert_eq!(rows[0].value(), Some(&Value::Integer(1500)));
        assert_eq!(rows[1].get(ROW_KEY), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_regexp_without_value_group() {
        let rows = collect(
            RegexpFunction
                .evaluate(vec![Value::from("a1 b2"), Value::from(r"(?P<letter>[a-z])\d")])
                .unwrap(),
        );
        assert_eq!(rows[1].get("letter"), Some(&Value::from("b")));
        assert_eq!(rows[1].value(), Some(&Value::from("")));
    }

    #[test]
    fn test_regexp_over_row_values() {
        let lines = Value::from(json!([{"value": "x=1"}, {"value": "y=2"}]))
            .into_rows("test")
            .unwrap();
        let rows = collect(
            RegexpFunction
                .evaluate(vec![Value::Rows(lines), Value::from(r"=(?P<value>\d)")])
                .unwrap(),
        );
        let values: Vec<_> = rows.iter().map(|row| row.value().cloned()).collect();
        assert_eq!(values, vec![Some(Value::from(1)), Some(Value::from(2))]);
    }

    #[test]
    fn test_regexp_rejects_bad_pattern() {
        let err = RegexpFunction
            .evaluate(vec![Value::from("x"), Value::from("(?P<open")])
            .unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidArgument { .. }));
    }
}
