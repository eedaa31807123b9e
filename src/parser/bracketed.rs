//! Bracketed rule syntax used by custom rule overlays
//!
//! Overlays are written by hand, so they use a lighter notation than the
//! JSON rule file: `store(count(reads) "total reads")` is a call, atoms are
//! separated by whitespace and double quoted atoms may contain spaces.
//! The text `f1 (a f2 (c d))` parses to `[f1, a, [f2, c, d]]`.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, multispace0},
    combinator::{all_consuming, map, recognize},
    multi::many0,
    sequence::{delimited, preceded, terminated},
};
use thiserror::Error;

use super::span::{Position, Span};
use crate::ast::{Rule, Token};
use crate::model::Value;
use crate::registry::functions::parse_data_type;

/// Bracketed text that could not be parsed
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message} at {position}")]
pub struct BracketError {
    /// What went wrong
    pub message: String,
    /// Where it went wrong
    pub position: Position,
}

/// A parsed item before calls are assembled
#[derive(Debug)]
enum Term<'a> {
    Atom(Span<'a>),
    Quoted(Span<'a>),
    Group(Vec<Term<'a>>),
}

fn is_atom_char(c: char) -> bool {
    !c.is_whitespace() && c != '(' && c != ')' && c != '"'
}

fn quoted(input: Span<'_>) -> IResult<Span<'_>, Term<'_>> {
    map(
        recognize(delimited(char('"'), take_while(|c: char| c != '"'), char('"'))),
        Term::Quoted,
    )
    .parse(input)
}

fn atom(input: Span<'_>) -> IResult<Span<'_>, Term<'_>> {
    map(take_while1(is_atom_char), Term::Atom).parse(input)
}

fn group(input: Span<'_>) -> IResult<Span<'_>, Term<'_>> {
    map(
        delimited(
            char('('),
            many0(preceded(multispace0, term)),
            preceded(multispace0, char(')')),
        ),
        Term::Group,
    )
    .parse(input)
}

fn term(input: Span<'_>) -> IResult<Span<'_>, Term<'_>> {
    alt((group, quoted, atom)).parse(input)
}

fn terms(input: Span<'_>) -> IResult<Span<'_>, Vec<Term<'_>>> {
    all_consuming(terminated(many0(preceded(multispace0, term)), multispace0)).parse(input)
}

fn atom_token(text: &str) -> Token {
    match parse_data_type(Value::from(text)) {
        Value::Boolean(b) => Token::Boolean(b),
        Value::Integer(i) => Token::Integer(i),
        Value::Float(f) => Token::Float(f),
        _ => Token::text(text),
    }
}

/// Turn a word followed by a group into a call, recursively
fn assemble(terms: Vec<Term<'_>>) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(terms.len());
    let mut terms = terms.into_iter().peekable();
    while let Some(term) = terms.next() {
        let token = match term {
            Term::Atom(name) => match terms.next_if(|next| matches!(next, Term::Group(_))) {
                Some(Term::Group(args)) => {
                    let mut call = vec![Token::text(*name.fragment())];
                    call.extend(assemble(args));
                    Token::List(call)
                }
                _ => atom_token(name.fragment()),
            },
            // Quotes are kept so the evaluator reads the atom as a literal
            Term::Quoted(text) => Token::text(*text.fragment()),
            Term::Group(items) => Token::List(assemble(items)),
        };
        tokens.push(token);
    }
    tokens
}

/// Parse bracketed rule text into rules, one per top level term.
/// A bare top level atom becomes a call without arguments.
pub fn parse_bracketed(text: &str) -> Result<Vec<Rule>, BracketError> {
    let input = Span::new(text);
    let parsed = match terms(input) {
        Ok((_, parsed)) => parsed,
        Err(nom::Err::Error(err) | nom::Err::Failure(err)) => {
            let message = if err.input.fragment().starts_with(')') {
                "unbalanced closing bracket"
            } else if err.input.fragment().starts_with('"') {
                "unterminated quoted text"
            } else {
                "missing closing bracket"
            };
            return Err(BracketError {
                message: message.to_string(),
                position: Position::of(&err.input),
            });
        }
        Err(nom::Err::Incomplete(_)) => {
            return Err(BracketError {
                message: "incomplete rule text".to_string(),
                position: Position::of(&input),
            });
        }
    };

    log::debug!("Parsed {} bracketed term(s)", parsed.len());
    Ok(assemble(parsed)
        .into_iter()
        .map(|token| match token {
            Token::List(items) => items,
            other => vec![other],
        })
        .collect())
}
