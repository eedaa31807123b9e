//! `{name}` placeholder substitution and per-row `%(field)s` templates

use regex::{Captures, Regex};
use std::sync::LazyLock;

use super::Namespace;
use crate::evaluator::{ExecutionError, ExecutionResult};
use crate::model::{Row, Value, float_repr};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}]+)\}").expect("placeholder pattern is valid"));

static ROW_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%\(([^()]+)\)s").expect("row field pattern is valid"));

/// Whether a location still carries a per-row `%(field)s` template
pub fn has_deferred_marker(text: &str) -> bool {
    text.contains("%(")
}

/// Fill every `%(field)s` in `template` from the given row
pub fn fill_row_template(template: &str, row: &Row) -> ExecutionResult<String> {
    let mut missing = None;
    let filled = ROW_FIELD.replace_all(template, |caps: &Captures<'_>| {
        let field = &caps[1];
        match row.get(field) {
            Some(value) => value.to_string(),
            None => {
                missing.get_or_insert_with(|| field.to_string());
                String::new()
            }
        }
    });
    match missing {
        Some(field) => Err(ExecutionError::KeyMismatch {
            location: template.to_string(),
            row: format!("{row} (no field \"{field}\")"),
        }),
        None => Ok(filled.into_owned()),
    }
}

impl Namespace {
    /// Replace each `{name}` in `text` with the value `name` resolves to.
    ///
    /// Numbers are rendered, strings are spliced in, and names that do not
    /// resolve stay untouched. With `deferred` set, unresolved placeholders
    /// become `%(name)s` so they can be filled from each row later.
    pub fn interpolate(&mut self, text: &str, deferred: bool) -> String {
        if !text.contains('{') {
            return text.to_string();
        }
        PLACEHOLDER
            .replace_all(text, |caps: &Captures<'_>| {
                let name = &caps[1];
                match self.read_value(name) {
                    Value::String(s) if s != name => s,
                    Value::Integer(i) => i.to_string(),
                    Value::Float(f) => float_repr(f),
                    Value::String(_) if deferred => format!("%({name})s"),
                    _ => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}
