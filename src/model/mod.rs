//! Value model for rule evaluation

pub mod row;
pub mod value;

pub use row::{NAME_KEY, ROW_KEY, Row, RowStream, VALUE_KEY};
pub use value::{UNPRINTABLE_ITERABLE, Value, ValueMap, float_repr, pretty_json};
