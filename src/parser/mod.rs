//! Rule text processing
//!
//! Rules loaded from JSON are normalized into prefix form by [`normalize`].
//! Custom rule overlays are written in a bracketed notation read by
//! [`parse_bracketed`].

mod bracketed;
mod rewrite;
pub mod span;

pub use bracketed::{BracketError, parse_bracketed};
pub use rewrite::{canonical_operator, normalize};
pub use span::{Position, Span};
