//! Infix to prefix rewriting, applied once to every rule at load time

use crate::ast::{Rule, Token, unquote};

/// Canonical prefix function name for an infix operator token
pub fn canonical_operator(symbol: &str) -> Option<&'static str> {
    let name = match symbol {
        "<" | "lt" => "lt",
        ">" | "gt" => "gt",
        ">=" | "ge" => "ge",
        "==" => "eq",
        "<=" | "le" => "le",
        "!=" | "<>" | "ne" => "ne",
        "*" => "mul",
        "**" => "pow",
        "/" | "//" => "truediv",
        "-" => "sub",
        "+" => "add",
        "%" => "mod",
        _ => return None,
    };
    Some(name)
}

fn operator_at(tokens: &[Token], index: usize) -> Option<&'static str> {
    match tokens.get(index)? {
        Token::Text(text) if unquote(text).is_none() => canonical_operator(text),
        _ => None,
    }
}

/// Replace `tokens[start..start + 3]`, an `a op b` window, with one call
fn fold_window(tokens: &mut Vec<Token>, start: usize, name: &str) {
    let mut window: Vec<Token> = tokens.drain(start..start + 3).collect();
    let right = window.pop().unwrap_or(Token::Null);
    window.pop();
    let left = window.pop().unwrap_or(Token::Null);
    tokens.insert(start, Token::List(vec![Token::text(name), left, right]));
}

fn rewrite(mut tokens: Vec<Token>) -> Vec<Token> {
    // Left to right, no precedence: `1 + 2 * 3` is `mul(add(1, 2), 3)`
    loop {
        if tokens.len() >= 3 {
            if let Some(name) = operator_at(&tokens, 1) {
                fold_window(&mut tokens, 0, name);
                continue;
            }
        }
        if tokens.len() >= 4 {
            if let Some(name) = operator_at(&tokens, 2) {
                fold_window(&mut tokens, 1, name);
                continue;
            }
        }
        break;
    }

    let tokens: Vec<Token> = tokens
        .into_iter()
        .map(|token| match token {
            Token::List(items) => Token::List(rewrite(items)),
            other => other,
        })
        .collect();
    collapse(tokens)
}

/// `[[x]]` is `[x]`, however deeply wrapped
fn collapse(mut tokens: Vec<Token>) -> Vec<Token> {
    while tokens.len() == 1 && matches!(tokens[0], Token::List(_)) {
        match tokens.pop() {
            Some(Token::List(inner)) => tokens = inner,
            _ => break,
        }
    }
    tokens
}

/// Normalize a rule into pure prefix form.
///
/// Infix windows `[a, op, b, ...]` and `[f, a, op, b, ...]` are folded into
/// calls to the operator's canonical function, nested rules are normalized
/// in turn and redundant single element wrappers are removed. A rule that
/// is already in prefix form comes back unchanged.
pub fn normalize(rule: Rule) -> Rule {
    rewrite(rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(rule!(["lt", 1, 2]), rule!(["lt", 1, 2]))]
    #[case(rule!([1, "<", 2]), rule!(["lt", 1, 2]))]
    #[case(rule!([[1, "+", 2], "*", 3]), rule!(["mul", ["add", 1, 2], 3]))]
    #[case(rule!([1, "+", 2, "*", 3]), rule!(["mul", ["add", 1, 2], 3]))]
    #[case(rule!(["if", "reads", ">=", 100, ["note", "\"ok\""]]), rule!(["if", ["ge", "reads", 100], ["note", "\"ok\""]]))]
    #[case(rule!([["store", 1, "a"]]), rule!(["store", 1, "a"]))]
    #[case(rule!(["store", [["add", 1, 2]], "a"]), rule!(["store", ["add", 1, 2], "a"]))]
    #[case(rule!(["note", "\"<\"", "x"]), rule!(["note", "\"<\"", "x"]))]
    fn test_normalize(#[case] input: Rule, #[case] expected: Rule) {
        assert_eq!(normalize(input), expected);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize(rule!(["store", [["a", "<>", 2], "%", 3], "b"]));
        assert_eq!(once, rule!(["store", ["mod", ["ne", "a", 2], 3], "b"]));
        assert_eq!(normalize(once.clone()), once);
    }

    #[test]
    fn test_operator_spellings() {
        assert_eq!(canonical_operator("<>"), Some("ne"));
        assert_eq!(canonical_operator("//"), Some("truediv"));
        assert_eq!(canonical_operator("**"), Some("pow"));
        assert_eq!(canonical_operator("add"), None);
    }
}
