//! Rule syntax tree
//!
//! Rules arrive as JSON arrays and are kept in that shape: a rule is a list
//! of tokens whose head names a function, followed by literals, namespace
//! paths and nested rules.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::Value;

/// One prefix-notation expression: head token plus arguments
pub type Rule = Vec<Token>;

/// A single token of a rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Token {
    /// JSON null
    Null,
    /// Boolean literal
    Boolean(bool),
    /// Integer literal
    Integer(i64),
    /// Floating point literal
    Float(f64),
    /// Function name, namespace path, operator or quoted literal
    Text(String),
    /// Nested expression (or literal array)
    List(Vec<Token>),
}

impl Token {
    /// Shorthand for a text token
    pub fn text(s: impl Into<String>) -> Self {
        Token::Text(s.into())
    }

    /// Borrow the text of a text token
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Token::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the children of a list token
    pub fn as_list(&self) -> Option<&[Token]> {
        match self {
            Token::List(items) => Some(items),
            _ => None,
        }
    }

    /// Content of a double-quoted text token, without its quotes
    pub fn unquoted(&self) -> Option<&str> {
        self.as_text().and_then(unquote)
    }

    /// The token read as plain data, with no namespace lookup
    pub fn to_value(&self) -> Value {
        match self {
            Token::Null => Value::Null,
            Token::Boolean(b) => Value::Boolean(*b),
            Token::Integer(i) => Value::Integer(*i),
            Token::Float(f) => Value::Float(*f),
            Token::Text(s) => Value::String(unquote(s).unwrap_or(s).to_string()),
            Token::List(items) => Value::List(items.iter().map(Token::to_value).collect()),
        }
    }
}

/// Strip surrounding double quotes, if both are present
pub fn unquote(text: &str) -> Option<&str> {
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        Some(&text[1..text.len() - 1])
    } else {
        None
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Null => write!(f, "None"),
            Token::Boolean(b) => write!(f, "{b}"),
            Token::Integer(i) => write!(f, "{i}"),
            Token::Float(x) => write!(f, "{x}"),
            Token::Text(s) => write!(f, "{s}"),
            Token::List(items) => match items.split_first() {
                Some((Token::Text(head), rest)) => {
                    write!(f, "{head}(")?;
                    write_joined(f, rest)?;
                    write!(f, ")")
                }
                _ => {
                    write!(f, "[")?;
                    write_joined(f, items)?;
                    write!(f, "]")
                }
            },
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Token]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Token::Text(s.to_string())
    }
}

impl From<i64> for Token {
    fn from(i: i64) -> Self {
        Token::Integer(i)
    }
}

impl From<bool> for Token {
    fn from(b: bool) -> Self {
        Token::Boolean(b)
    }
}

impl From<Vec<Token>> for Token {
    fn from(items: Vec<Token>) -> Self {
        Token::List(items)
    }
}

/// Build a rule from JSON-like literal syntax, mostly for tests and benches
#[macro_export]
macro_rules! rule {
    ($($json:tt)+) => {
        ::serde_json::from_value::<$crate::ast::Rule>(::serde_json::json!($($json)+))
            .expect("rule literal must be a JSON array")
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rule_deserializes_from_json() {
        let rule: Rule =
            serde_json::from_str(r#"["store", ["lt", 1, 2.5], "a/b", true, null, "\"x\""]"#)
                .unwrap();
        assert_eq!(
            rule,
            vec![
                Token::text("store"),
                Token::List(vec![Token::text("lt"), Token::Integer(1), Token::Float(2.5)]),
                Token::text("a/b"),
                Token::Boolean(true),
                Token::Null,
                Token::text("\"x\""),
            ]
        );
    }

    #[test]
    fn test_display_renders_calls() {
        let token = Token::List(vec![
            Token::text("lt"),
            Token::text("count"),
            Token::List(vec![Token::text("add"), Token::Integer(1), Token::Integer(2)]),
        ]);
        assert_eq!(token.to_string(), "lt(count, add(1, 2))");
    }

    #[test]
    fn test_unquote() {
        assert_eq!(Token::text("\"a b\"").unquoted(), Some("a b"));
        assert_eq!(Token::text("\"").unquoted(), None);
        assert_eq!(Token::text("plain").unquoted(), None);
        assert_eq!(Token::text("\"q\"").to_value(), Value::from("q"));
    }
}
