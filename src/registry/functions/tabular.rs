//! Tab separated text in and out

use std::sync::LazyLock;

use super::{NameCleaning, int_arg, parse_data_type};
use crate::evaluator::{ExecutionError, ExecutionResult};
use crate::model::{ROW_KEY, Row, RowStream, Value};
use crate::registry::function::{FunctionResult, RuleFunction};
use crate::registry::signature::{FunctionSignature, ParameterInfo};

/// importTabular(content, clean_name=False, skip_rows=0, header=None)
pub struct ImportTabularFunction;

fn content_lines(content: Value) -> ExecutionResult<Vec<String>> {
    match content {
        Value::String(text) => Ok(text.split('\n').map(str::to_string).collect()),
        Value::List(items) => Ok(items
            .into_iter()
            .map(|item| match item {
                Value::String(line) => line,
                other => other.to_string(),
            })
            .collect()),
        Value::Rows(rows) => rows
            .map(|row| {
                let mut row = row?;
                Ok(match row.take_value() {
                    Some(Value::String(line)) => line,
                    Some(other) => other.to_string(),
                    None => String::new(),
                })
            })
            .collect(),
        other => Err(ExecutionError::invalid_argument(
            "importTabular",
            format!("didn't receive text for input, got {}", other.type_name()),
        )),
    }
}

fn given_header(value: Option<&Value>) -> ExecutionResult<Option<Vec<String>>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(names)) => Ok(Some(
            names.split(',').map(|name| name.trim().to_string()).collect(),
        )),
        Some(Value::List(names)) => Ok(Some(names.iter().map(Value::to_string).collect())),
        Some(other) => Err(ExecutionError::invalid_argument(
            "importTabular",
            format!("header needs to be a list of column names, got {}", other.type_name()),
        )),
    }
}

impl RuleFunction for ImportTabularFunction {
    fn name(&self) -> &str {
        "importTabular"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
            FunctionSignature::new(
                "importTabular",
                vec![
                    ParameterInfo::required("content"),
                    ParameterInfo::optional("clean_name", "False"),
                    ParameterInfo::optional("skip_rows", "0"),
                    ParameterInfo::optional("header", "None"),
                ],
            )
        });
        &SIG
    }

    fn documentation(&self) -> &str {
        "Convert tab separated lines of text into rows keyed by column name. The first line read is the header unless one is given. clean_name=camelCase or underScore tidies the column names."
    }

    fn evaluate(&self, args: Vec<Value>) -> FunctionResult<Value> {
        let cleaning = NameCleaning::from_arg(args.get(1));
        let skip_rows = usize::try_from(int_arg("importTabular", &args, 2, 0)?).unwrap_or(0);
        let mut header = given_header(args.get(3))?;
        let lines = content_lines(args.into_iter().next().unwrap_or_default())?;
        log::debug!(
            "importTabular: skipping {skip_rows} rows, header given: {}",
            header.is_some()
        );

        let mut rows = Vec::new();
        for (row, line) in lines.iter().enumerate().skip(skip_rows) {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }

            if header.is_none() {
                header = Some(
                    line.trim()
                        .split('\t')
                        .enumerate()
                        .map(|(ptr, name)| {
                            if cleaning == NameCleaning::None {
                                name.to_string()
                            } else {
                                cleaning.apply(name, &format!("col{ptr}"))
                            }
                        })
                        .collect(),
                );
                continue;
            }

            let columns = header.as_deref().unwrap_or_default();
            let cells: Vec<&str> = line.split('\t').collect();
            if cells.len() < columns.len() {
                rows.push(Err(ExecutionError::invalid_argument(
                    "importTabular",
                    format!(
                        "line {} has {} columns but the header has {}",
                        row + 1,
                        cells.len(),
                        columns.len()
                    ),
                )));
                continue;
            }

            let mut record = Row::new().field(ROW_KEY, row as i64 - 1 - skip_rows as i64);
            for (column, cell) in columns.iter().zip(cells) {
                record.insert(column.as_str(), parse_data_type(Value::from(cell)));
            }
            rows.push(Ok(record));
        }
        Ok(Value::Rows(RowStream::new(rows.into_iter())))
    }
}

/// exportTabular(content, label='', depth=0)
pub struct ExportTabularFunction;

fn is_container(value: &Value) -> bool {
    matches!(value, Value::List(_) | Value::Map(_) | Value::Rows(_))
}

/// Indented, tab separated rendering of a nested value. Mapping entries
/// are listed scalars first; first-level labels are upper-cased.
pub fn export_tabular(content: &Value, label: &str, depth: usize) -> String {
    let tabs = "\t".repeat(depth);
    let heading = |out: &mut String| {
        if !label.is_empty() {
            let label = if depth == 1 { label.to_uppercase() } else { label.to_string() };
            out.push_str(&format!("{tabs}{label}\n"));
        }
    };

    let mut out = String::new();
    match content {
        Value::Map(map) => {
            heading(&mut out);
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by_key(|(_, value)| is_container(value));
            for (key, value) in entries {
                out.push_str(&export_tabular(value, key, depth + 1));
            }
        }
        Value::List(items) => {
            heading(&mut out);
            for (ptr, item) in items.iter().enumerate() {
                out.push_str(&export_tabular(item, &ptr.to_string(), depth + 1));
            }
        }
        scalar => out.push_str(&format!("{tabs}{label}\t{scalar}\n")),
    }
    out
}

impl RuleFunction for ExportTabularFunction {
    fn name(&self) -> &str {
        "exportTabular"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
            FunctionSignature::new(
                "exportTabular",
                vec![
                    ParameterInfo::required("content"),
                    ParameterInfo::optional("label", "''"),
                    ParameterInfo::optional("depth", "0"),
                ],
            )
        });
        &SIG
    }

    fn documentation(&self) -> &str {
        "Export a namespace branch as indented tab separated text, one line per entry."
    }

    fn evaluate(&self, args: Vec<Value>) -> FunctionResult<Value> {
        let label = match args.get(1) {
            None | Some(Value::Null) => String::new(),
            Some(label) => label.to_string(),
        };
        let depth = usize::try_from(int_arg("exportTabular", &args, 2, 0)?).unwrap_or(0);
        let content = match args.into_iter().next().unwrap_or_default() {
            Value::Rows(rows) => Value::List(
                rows.map(|row| row.map(|row| match row.value() {
                    Some(value) => value.clone(),
                    None => Value::from(row),
                }))
                .collect::<ExecutionResult<Vec<_>>>()?,
            ),
            other => other,
        };
        Ok(Value::String(export_tabular(&content, &label, depth)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn import(args: Vec<Value>) -> Vec<Row> {
        ImportTabularFunction
            .evaluate(args)
            .unwrap()
            .into_rows("test")
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_import_tabular_reads_header_and_types() {
        let rows = import(vec![
            Value::from("Sample Name\tRead Count\nA\t1,000\nB\t2.5\n"),
            Value::from("underScore"),
        ]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get(ROW_KEY), Some(&Value::Integer(0)));
        assert_eq!(rows[0].get("sample_name"), Some(&Value::from("A")));
        assert_eq!(rows[0].get("read_count"), Some(&Value::Integer(1000)));
        assert_eq!(rows[1].get("read_count"), Some(&Value::Float(2.5)));
    }

    #[test]
    fn test_import_tabular_skips_rows_and_accepts_header() {
        let rows = import(vec![
            Value::from("# comment\nx\t1\ny\t2"),
            Value::Boolean(false),
            Value::from(1),
            Value::from("key,count"),
        ]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("key"), Some(&Value::from("x")));
        assert_eq!(rows[1].get("count"), Some(&Value::Integer(2)));
    }

    #[test]
    fn test_import_tabular_short_line_is_an_error() {
        let result: Result<Vec<Row>, _> = ImportTabularFunction
            .evaluate(vec![Value::from("a\tb\n1")])
            .unwrap()
            .into_rows("test")
            .unwrap()
            .collect();
        assert!(result.is_err());
    }

    #[test]
    fn test_export_tabular_puts_scalars_first() {
        let content = Value::from(json!({
            "stats": {"reads": 10, "files": ["a", "b"], "status": "ok"}
        }));
        let text = export_tabular(&content, "", 0);
        assert_eq!(
            text,
            "\tSTATS\n\t\treads\t10\n\t\tstatus\tok\n\t\tfiles\n\t\t\t0\ta\n\t\t\t1\tb\n"
        );
    }
}
