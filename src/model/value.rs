//! Core value type for rule expressions

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::{Number, Value as JsonValue};
use std::cmp::Ordering;
use std::fmt;

use super::row::{Row, RowStream};
use crate::evaluator::{ExecutionError, ExecutionResult};

/// Placeholder written wherever a row stream reaches a serializer
pub const UNPRINTABLE_ITERABLE: &str = "[unprintable iterable]";

/// Insertion ordered mapping used for namespace dictionaries and rows
pub type ValueMap = IndexMap<String, Value>;

/// A dynamically typed value produced or consumed by rules.
///
/// Everything that lives in the namespace is one of the data variants. The
/// `Rows` variant only ever flows between functions: storing it materializes
/// the rows first.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// Absence of a value (JSON `null`)
    #[default]
    Null,

    /// Boolean value
    Boolean(bool),

    /// Integer value (64-bit signed)
    Integer(i64),

    /// Floating point value
    Float(f64),

    /// String value
    String(String),

    /// Sequence of values
    List(Vec<Value>),

    /// Mapping from key to value, insertion ordered
    Map(ValueMap),

    /// Lazy stream of row records
    Rows(RowStream),
}

impl Value {
    /// Name of the variant, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "dictionary",
            Value::Rows(_) => "iterable",
        }
    }

    /// True for null, booleans, numbers and strings
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Value::List(_) | Value::Map(_) | Value::Rows(_))
    }

    /// Check for null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the string content, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean content, if this is a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric content widened to f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Integer content; floats with no fractional part also qualify
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Check if the value is an integer or a float
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    /// Truthiness: null, false, zero and empty containers are false
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Integer(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
            Value::Rows(_) => true,
        }
    }

    /// Equality with integer/float coercion, used by `eq` and `ne`
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
                self.as_f64() == other.as_f64()
            }
            (Value::List(l), Value::List(r)) => {
                l.len() == r.len() && l.iter().zip(r).all(|(a, b)| a.loose_eq(b))
            }
            (Value::Map(l), Value::Map(r)) => {
                l.len() == r.len()
                    && l.iter()
                        .all(|(k, v)| r.get(k).is_some_and(|other| v.loose_eq(other)))
            }
            _ => self == other,
        }
    }

    /// Ordering between comparable values. Numbers compare across integer and
    /// float, strings lexicographically, lists element-wise.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Integer(l), Value::Integer(r)) => Some(l.cmp(r)),
            (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
                self.as_f64()?.partial_cmp(&other.as_f64()?)
            }
            (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
            (Value::Boolean(l), Value::Boolean(r)) => Some(l.cmp(r)),
            (Value::List(l), Value::List(r)) => {
                for (a, b) in l.iter().zip(r) {
                    match a.compare(b)? {
                        Ordering::Equal => continue,
                        ord => return Some(ord),
                    }
                }
                Some(l.len().cmp(&r.len()))
            }
            _ => None,
        }
    }

    /// Turn this value into a stream of rows for a row-consuming function.
    ///
    /// Row streams pass through, a mapping is a single row, a list must hold
    /// only mappings.
    pub fn into_rows(self, function: &str) -> ExecutionResult<RowStream> {
        match self {
            Value::Rows(rows) => Ok(rows),
            Value::Map(map) => Ok(RowStream::from_rows(vec![Row::from(map)])),
            Value::List(items) => {
                let mut rows = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Map(map) => rows.push(Row::from(map)),
                        other => {
                            return Err(ExecutionError::invalid_argument(
                                function,
                                format!(
                                    "expected a list of dictionaries but found a {} item",
                                    other.type_name()
                                ),
                            ));
                        }
                    }
                }
                Ok(RowStream::from_rows(rows))
            }
            other => Err(ExecutionError::invalid_argument(
                function,
                format!("didn't receive an iterator for input, got {}", other.type_name()),
            )),
        }
    }

    /// Convert to JSON. Row streams become a placeholder string and
    /// non-finite floats become null.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Boolean(b) => JsonValue::Bool(*b),
            Value::Integer(i) => JsonValue::Number((*i).into()),
            Value::Float(f) => Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::List(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) => JsonValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Rows(_) => JsonValue::String(UNPRINTABLE_ITERABLE.to_string()),
        }
    }

    /// Pretty printed JSON with sorted keys and four space indentation
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        pretty_json(&self.to_json())
    }
}

/// Render JSON with four space indentation, the layout of saved reports
/// and rule files
pub fn pretty_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Render a float so that integral values keep their `.0`
pub fn float_repr(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "None"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => f.write_str(&float_repr(*x)),
            Value::String(s) => write!(f, "{s}"),
            Value::Rows(_) => write!(f, "{UNPRINTABLE_ITERABLE}"),
            Value::List(_) | Value::Map(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Boolean(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            JsonValue::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<ValueMap> for Value {
    fn from(map: ValueMap) -> Self {
        Value::Map(map)
    }
}

impl From<Row> for Value {
    fn from(row: Row) -> Self {
        Value::Map(row.into_map())
    }
}

impl From<RowStream> for Value {
    fn from(rows: RowStream) -> Self {
        Value::Rows(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_conversion_keeps_integers_and_order() {
        let value = Value::from(json!({"b": 1, "a": [1.5, "x", null, true]}));
        match &value {
            Value::Map(map) => {
                assert_eq!(map.get("b"), Some(&Value::Integer(1)));
                assert_eq!(map.keys().collect::<Vec<_>>(), vec!["b", "a"]);
            }
            other => panic!("expected a map, got {other:?}"),
        }
        assert_eq!(value.to_json(), json!({"b": 1, "a": [1.5, "x", null, true]}));
    }

    #[test]
    fn test_floats_display_with_fraction() {
        assert_eq!(Value::Float(3.0).to_string(), "3.0");
        assert_eq!(Value::Float(-0.5).to_string(), "-0.5");
        assert_eq!(Value::Float(2.25).to_string(), "2.25");
        assert_eq!(Value::Integer(3).to_string(), "3");
        assert_eq!(float_repr(f64::INFINITY), "inf");
    }

    #[test]
    fn test_loose_eq_and_compare_cross_numeric() {
        assert!(Value::Integer(3).loose_eq(&Value::Float(3.0)));
        assert!(!Value::Integer(3).loose_eq(&Value::from("3")));
        assert_eq!(
            Value::Integer(2).compare(&Value::Float(2.5)),
            Some(Ordering::Less)
        );
        assert_eq!(Value::from("b").compare(&Value::from("a")), Some(Ordering::Greater));
        assert_eq!(Value::from("b").compare(&Value::Integer(1)), None);
    }

    #[test]
    fn test_into_rows_rejects_scalar_lists() {
        let err = Value::List(vec![Value::Integer(1)])
            .into_rows("iterate")
            .unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidArgument { .. }));

        let rows: Vec<_> = Value::List(vec![Value::from(json!({"value": 1}))])
            .into_rows("iterate")
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value(), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_rows_serialize_as_placeholder() {
        let rows = Value::Rows(RowStream::from_rows(vec![]));
        assert_eq!(rows.to_json(), json!(UNPRINTABLE_ITERABLE));
    }
}
