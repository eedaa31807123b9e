//! Context-free rule functions
//!
//! These only see their evaluated arguments. Text helpers, row stream
//! helpers, regular expression matching, tabular conversion, assembly
//! statistics and HTML rendering live here.

mod format;
mod html;
mod pattern;
mod rows;
mod stats;
mod tabular;
mod text;

pub use format::{FormatFunction, percent_format};
pub use html::{GetHtmlFunction, PageHtmlFunction, render_html, render_page};
pub use pattern::RegexpFunction;
pub use stats::StatisticNFunction;
pub use tabular::{ExportTabularFunction, ImportTabularFunction};

use crate::evaluator::ExecutionError;
use crate::model::Value;
use crate::registry::function::{FunctionRegistry, FunctionResult};

/// Register all context-free functions
pub fn register_functions(registry: &mut FunctionRegistry) {
    text::register_text_functions(registry);
    rows::register_row_functions(registry);
    registry.register(FormatFunction);
    registry.register(RegexpFunction);
    registry.register(ImportTabularFunction);
    registry.register(ExportTabularFunction);
    registry.register(StatisticNFunction);
    registry.register(GetHtmlFunction);
    registry.register(PageHtmlFunction);
}

/// Label used when a name cleans down to nothing
pub const DEFAULT_LABEL: &str = "no_label";

/// Recognize booleans, integers and floats in text. Thousands separators
/// are ignored; anything else stays as it is.
pub fn parse_data_type(value: Value) -> Value {
    let Value::String(text) = value else {
        return value;
    };
    match text.to_lowercase().as_str() {
        "true" => return Value::Boolean(true),
        "false" => return Value::Boolean(false),
        _ => {}
    }
    let digits = text.replace(',', "");
    let digits = digits.trim();
    if let Ok(i) = digits.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(f) = digits.parse::<f64>() {
        return Value::Float(f);
    }
    Value::String(text)
}

fn spell_symbols(text: &str) -> String {
    text.replace('#', "_count_")
        .replace('+', "_plus_")
        .replace('%', "_percent_")
}

/// Title-case each run of letters
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

/// `Reads Mapped (#)` becomes `readsMappedCount`
pub fn name_camel_case(text: &str, default: &str) -> String {
    let spelled = spell_symbols(text);
    let joined: String = title_case(spelled.trim())
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect();

    let mut chars = joined.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None if !spelled.is_empty() => {
            log::warn!("Unable to convert \"{spelled}\" to camelCase.");
            spelled
        }
        None => default.to_string(),
    }
}

/// `Reads Mapped (#)` becomes `reads_mapped__count_`
pub fn name_under_score(text: &str, default: &str) -> String {
    let cleaned: String = spell_symbols(&text.to_lowercase())
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '_')
        .map(|c| if c == ' ' { '_' } else { c })
        .collect();
    if cleaned.is_empty() {
        default.to_string()
    } else {
        cleaned
    }
}

pub(crate) fn string_arg(function: &str, args: &[Value], index: usize) -> FunctionResult<String> {
    match args.get(index) {
        Some(Value::String(text)) => Ok(text.clone()),
        Some(other) => Err(ExecutionError::invalid_argument(
            function,
            format!(
                "argument {} needs to be a string, got {}",
                index + 1,
                other.type_name()
            ),
        )),
        None => Err(ExecutionError::invalid_argument(
            function,
            format!("argument {} is missing", index + 1),
        )),
    }
}

pub(crate) fn number_arg(function: &str, value: &Value) -> FunctionResult<f64> {
    value.as_f64().ok_or_else(|| {
        ExecutionError::invalid_argument(
            function,
            format!("expected a number, got {} \"{value}\"", value.type_name()),
        )
    })
}

/// Optional integer argument; null or absent gives `default`
pub(crate) fn int_arg(
    function: &str,
    args: &[Value],
    index: usize,
    default: i64,
) -> FunctionResult<i64> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Integer(i)) => Ok(*i),
        Some(Value::Float(f)) if f.fract() == 0.0 => Ok(*f as i64),
        Some(other) => Err(ExecutionError::invalid_argument(
            function,
            format!(
                "argument {} needs to be an integer, got {}",
                index + 1,
                other.type_name()
            ),
        )),
    }
}

/// The `clean_name` option shared by regexp() and importTabular()
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NameCleaning {
    None,
    CamelCase,
    UnderScore,
}

impl NameCleaning {
    pub(crate) fn from_arg(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) | Some(Value::Boolean(false)) => Self::None,
            Some(Value::String(mode)) if mode == "camelCase" => Self::CamelCase,
            Some(Value::String(mode)) if mode.is_empty() => Self::None,
            Some(_) => Self::UnderScore,
        }
    }

    pub(crate) fn apply(self, name: &str, default: &str) -> String {
        match self {
            Self::None => name.to_string(),
            Self::CamelCase => name_camel_case(name, default),
            Self::UnderScore => name_under_score(name, default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("True", Value::Boolean(true))]
    #[case("false", Value::Boolean(false))]
    #[case("1,234,567", Value::Integer(1234567))]
    #[case("-12", Value::Integer(-12))]
    #[case("98.5", Value::Float(98.5))]
    #[case("1e3", Value::Float(1000.0))]
    #[case("12 reads", Value::from("12 reads"))]
    fn test_parse_data_type(#[case] input: &str, #[case] expected: Value) {
        assert_eq!(parse_data_type(Value::from(input)), expected);
    }

    #[test]
    fn test_parse_data_type_leaves_non_text() {
        assert_eq!(parse_data_type(Value::Integer(3)), Value::Integer(3));
    }

    #[rstest]
    #[case("Reads Mapped", "readsMapped")]
    #[case("GC %", "gcPercent")]
    #[case("# contigs", "countContigs")]
    #[case("", DEFAULT_LABEL)]
    fn test_name_camel_case(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(name_camel_case(input, DEFAULT_LABEL), expected);
    }

    #[rstest]
    #[case("Reads Mapped", "reads_mapped")]
    #[case("# contigs (>= 0 bp)", "_count__contigs__0_bp")]
    #[case("()", DEFAULT_LABEL)]
    fn test_name_under_score(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(name_under_score(input, DEFAULT_LABEL), expected);
    }
}
