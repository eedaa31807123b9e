//! Declared function signatures used for arity checks and usage text

use serde::{Deserialize, Serialize};
use std::fmt;

/// Function signature for arity checking
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionSignature {
    /// Function name
    pub name: String,
    /// Parameters in call order
    pub parameters: Vec<ParameterInfo>,
    /// Minimum number of arguments
    pub min_arity: usize,
    /// Maximum number of arguments (None for variadic)
    pub max_arity: Option<usize>,
}

/// Parameter information for functions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterInfo {
    /// Parameter name
    pub name: String,
    /// Default shown in usage text, if the parameter may be omitted
    pub default: Option<String>,
    /// Whether this parameter is optional
    pub optional: bool,
}

impl FunctionSignature {
    /// Create a new function signature
    pub fn new(name: impl Into<String>, parameters: Vec<ParameterInfo>) -> Self {
        let required_params = parameters.iter().filter(|p| !p.optional).count();
        let max_arity = Some(parameters.len());

        Self {
            name: name.into(),
            parameters,
            min_arity: required_params,
            max_arity,
        }
    }

    /// Create a variadic function signature; the last parameter repeats
    pub fn variadic(name: impl Into<String>, parameters: Vec<ParameterInfo>) -> Self {
        let required_params = parameters.iter().filter(|p| !p.optional).count();

        Self {
            name: name.into(),
            parameters,
            min_arity: required_params,
            max_arity: None,
        }
    }

    /// Signature with `n` required parameters named `a`, `b`, ...
    pub fn positional(name: impl Into<String>, n: usize) -> Self {
        let parameters = (0..n)
            .map(|i| {
                let label = char::from(b'a' + (i % 26) as u8).to_string();
                ParameterInfo::required(label)
            })
            .collect();
        Self::new(name, parameters)
    }

    /// Whether a call with `count` arguments is acceptable
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_arity && self.max_arity.is_none_or(|max| count <= max)
    }

    /// Human readable arity, e.g. `2`, `1-3` or `at least 2`
    pub fn arity_text(&self) -> String {
        match self.max_arity {
            Some(max) if max == self.min_arity => max.to_string(),
            Some(max) => format!("{}-{}", self.min_arity, max),
            None => format!("at least {}", self.min_arity),
        }
    }
}

impl ParameterInfo {
    /// Create a required parameter
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
            optional: false,
        }
    }

    /// Create an optional parameter with the default shown in usage text
    pub fn optional(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: Some(default.into()),
            optional: true,
        }
    }

    /// Create an optional repeating parameter, only meaningful last
    pub fn rest(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
            optional: true,
        }
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, param) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param.name)?;
            if let Some(default) = &param.default {
                write!(f, "={default}")?;
            }
        }
        if self.max_arity.is_none() {
            write!(f, "...")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_usage_text() {
        let sig = FunctionSignature::variadic(
            "store",
            vec![
                ParameterInfo::required("value"),
                ParameterInfo::required("location"),
                ParameterInfo::rest("rules"),
            ],
        );
        assert_eq!(sig.to_string(), "store(value, location, rules...)");
        assert_eq!(sig.arity_text(), "at least 2");

        let sig = FunctionSignature::new(
            "fail",
            vec![
                ParameterInfo::optional("location", "report/job"),
                ParameterInfo::optional("message", "''"),
            ],
        );
        assert_eq!(sig.to_string(), "fail(location=report/job, message='')");
        assert_eq!(sig.arity_text(), "0-2");
    }

    #[test]
    fn test_accepts() {
        let sig = FunctionSignature::positional("add", 2);
        assert!(sig.accepts(2));
        assert!(!sig.accepts(1));
        assert!(!sig.accepts(3));
        assert_eq!(sig.to_string(), "add(a, b)");
    }
}
