//! format(): printf-style `%` templates filled from rows

use regex::Regex;
use std::sync::LazyLock;

use crate::evaluator::{ExecutionError, ExecutionResult};
use crate::model::{Row, RowStream, VALUE_KEY, Value};
use crate::registry::function::{FunctionResult, RuleFunction};
use crate::registry::signature::{FunctionSignature, ParameterInfo};

static SPECIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%(?:\(([^()]*)\))?([-+ 0#]*)(\d+)?(?:\.(\d+))?([sdifFeExXr%])")
        .expect("format specifier pattern is valid")
});

/// What a template's specifiers are filled from
#[derive(Debug, Clone, Copy)]
pub enum FormatArgs<'a> {
    /// `%(field)s` specifiers read row fields; a bare `%s` renders the row
    Row(&'a Row),
    /// A single value for one bare specifier
    Single(&'a Value),
}

struct Spec<'t> {
    flags: &'t str,
    width: Option<usize>,
    precision: Option<usize>,
    conversion: char,
}

fn format_error(message: impl Into<String>) -> ExecutionError {
    ExecutionError::invalid_argument("format", message)
}

/// Fill a `%` template the way printf-style string formatting does:
/// `%(name)s`, `%d`, `%5.2f`, `%-8s`, `%e`, `%x` and `%%` are understood.
pub fn percent_format(template: &str, args: FormatArgs<'_>) -> ExecutionResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    let mut positional_used = false;

    for caps in SPECIFIER.captures_iter(template) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&template[last..whole.start()]);
        last = whole.end();

        let spec = Spec {
            flags: caps.get(2).map_or("", |m| m.as_str()),
            width: caps.get(3).and_then(|m| m.as_str().parse().ok()),
            precision: caps.get(4).and_then(|m| m.as_str().parse().ok()),
            conversion: caps[5].chars().next().unwrap_or('s'),
        };
        if spec.conversion == '%' {
            out.push('%');
            continue;
        }

        let rendered;
        let value = match (caps.get(1), args) {
            (Some(key), FormatArgs::Row(row)) => row.get(key.as_str()).ok_or_else(|| {
                ExecutionError::KeyMismatch {
                    location: template.to_string(),
                    row: format!("{row} (no field \"{}\")", key.as_str()),
                }
            })?,
            (Some(key), FormatArgs::Single(Value::Map(map))) => {
                map.get(key.as_str()).ok_or_else(|| ExecutionError::KeyMismatch {
                    location: template.to_string(),
                    row: format!("no field \"{}\"", key.as_str()),
                })?
            }
            (Some(_), FormatArgs::Single(_)) => {
                return Err(format_error("format requires a mapping"));
            }
            (None, _) if positional_used => {
                return Err(format_error("not enough arguments for format string"));
            }
            (None, FormatArgs::Row(row)) => {
                positional_used = true;
                rendered = Value::from(row.clone());
                &rendered
            }
            (None, FormatArgs::Single(value)) => {
                positional_used = true;
                value
            }
        };
        out.push_str(&render(&spec, value)?);
    }

    out.push_str(&template[last..]);
    Ok(out)
}

fn number(spec: &Spec<'_>, value: &Value) -> ExecutionResult<f64> {
    value.as_f64().ok_or_else(|| {
        format_error(format!(
            "%{} format: a number is required, not {}",
            spec.conversion,
            value.type_name()
        ))
    })
}

fn exponent(x: f64, precision: usize, upper: bool) -> String {
    let text = format!("{x:.precision$e}");
    let (mantissa, exp) = text.split_once('e').unwrap_or((&text, "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let sign = if exp < 0 { '-' } else { '+' };
    let formatted = format!("{mantissa}e{sign}{:02}", exp.abs());
    if upper { formatted.to_uppercase() } else { formatted }
}

fn render(spec: &Spec<'_>, value: &Value) -> ExecutionResult<String> {
    let numeric = !matches!(spec.conversion, 's' | 'r');
    let mut body = match spec.conversion {
        's' => {
            let text = value.to_string();
            match spec.precision {
                Some(p) => text.chars().take(p).collect(),
                None => text,
            }
        }
        'r' => match value {
            Value::String(text) => format!("'{text}'"),
            other => other.to_string(),
        },
        'd' | 'i' => match value {
            Value::Integer(i) => i.to_string(),
            other => (number(spec, other)?.trunc() as i64).to_string(),
        },
        'f' | 'F' => format!("{:.*}", spec.precision.unwrap_or(6), number(spec, value)?),
        'e' | 'E' => exponent(
            number(spec, value)?,
            spec.precision.unwrap_or(6),
            spec.conversion == 'E',
        ),
        'x' | 'X' => {
            let i = match value {
                Value::Integer(i) => *i,
                other => number(spec, other)?.trunc() as i64,
            };
            let digits = format!("{:x}", i.unsigned_abs());
            let digits = if spec.conversion == 'X' { digits.to_uppercase() } else { digits };
            if i < 0 { format!("-{digits}") } else { digits }
        }
        other => return Err(format_error(format!("unsupported format character '{other}'"))),
    };

    if numeric && !body.starts_with('-') {
        if spec.flags.contains('+') {
            body.insert(0, '+');
        } else if spec.flags.contains(' ') {
            body.insert(0, ' ');
        }
    }

    let len = body.chars().count();
    let Some(width) = spec.width.filter(|w| *w > len) else {
        return Ok(body);
    };
    let fill = width - len;
    Ok(if spec.flags.contains('-') {
        format!("{body}{}", " ".repeat(fill))
    } else if spec.flags.contains('0') && numeric {
        let sign_len = usize::from(body.starts_with(['-', '+', ' ']));
        let (sign, digits) = body.split_at(sign_len);
        format!("{sign}{}{digits}", "0".repeat(fill))
    } else {
        format!("{}{body}", " ".repeat(fill))
    })
}

/// format(format_string, rows)
pub struct FormatFunction;

impl RuleFunction for FormatFunction {
    fn name(&self) -> &str {
        "format"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
            FunctionSignature::new(
                "format",
                vec![
                    ParameterInfo::required("format_string"),
                    ParameterInfo::required("rows"),
                ],
            )
        });
        &SIG
    }

    fn documentation(&self) -> &str {
        "Rewrites each row's value by filling format_string from the row's fields, e.g. \"%(name)s: %(value).2f\". A single value is formatted into one row."
    }

    fn evaluate(&self, mut args: Vec<Value>) -> FunctionResult<Value> {
        let template = match args.swap_remove(0) {
            Value::String(template) => template,
            other => {
                return Err(format_error(format!(
                    "format_string needs to be a string, got {}",
                    other.type_name()
                )));
            }
        };

        match args.swap_remove(0) {
            source @ (Value::Rows(_) | Value::List(_) | Value::Map(_)) => {
                let rows = source.into_rows("format")?;
                Ok(Value::Rows(rows.map_rows(move |row| {
                    let text = percent_format(&template, FormatArgs::Row(&row))?;
                    Ok(row.field(VALUE_KEY, text))
                })))
            }
            single => {
                let text = percent_format(&template, FormatArgs::Single(&single))?;
                Ok(Value::Rows(RowStream::from_rows(vec![Row::with_value(text)])))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("%(name)s=%(value)d", "reads=1234")]
    #[case("%(ratio).2f%%", "0.33%")]
    #[case("[%(name)-6s]", "[reads ]")]
    #[case("[%(value)08d]", "[00001234]")]
    #[case("%(ratio).1e", "3.3e-01")]
    fn test_percent_format_row(#[case] template: &str, #[case] expected: &str) {
        let row = Row::with_value(1234)
            .field("name", "reads")
            .field("ratio", 1.0 / 3.0);
        assert_eq!(percent_format(template, FormatArgs::Row(&row)).unwrap(), expected);
    }

    #[test]
    fn test_percent_format_missing_field() {
        let row = Row::with_value(1);
        let err = percent_format("%(name)s", FormatArgs::Row(&row)).unwrap_err();
        assert!(matches!(err, ExecutionError::KeyMismatch { .. }));
    }

    #[test]
    fn test_percent_format_single() {
        let value = Value::from(42);
        assert_eq!(
            percent_format("total: %5d", FormatArgs::Single(&value)).unwrap(),
            "total:    42"
        );
        assert!(percent_format("%s %s", FormatArgs::Single(&value)).is_err());
    }

    #[test]
    fn test_format_rewrites_row_values() {
        let rows = Value::from(serde_json::json!([
            {"value": 5, "name": "a"},
            {"value": 7, "name": "b"}
        ]));
        let result = FormatFunction
            .evaluate(vec![Value::from("%(name)s:%(value)s"), rows])
            .unwrap();
        let values: Vec<Value> = result
            .into_rows("test")
            .unwrap()
            .map(|row| row.unwrap().value().cloned().unwrap())
            .collect();
        assert_eq!(values, vec![Value::from("a:5"), Value::from("b:7")]);
    }
}
