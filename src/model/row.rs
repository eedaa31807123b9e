//! Row records and lazy row streams
//!
//! Every iterable-producing function (regex matches, file lines, tabular
//! import) yields rows. A row is an ordered mapping that should carry the
//! payload under `value`, plus open metadata such as the `ROW` index or the
//! source `name`.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::value::{Value, ValueMap};
use crate::evaluator::ExecutionResult;

/// Key holding a row's payload
pub const VALUE_KEY: &str = "value";
/// Key holding a row's offset since the start of its stream
pub const ROW_KEY: &str = "ROW";
/// Key holding the name of the source a row came from
pub const NAME_KEY: &str = "name";

/// A single row record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(ValueMap);

impl Row {
    /// Create an empty row
    pub fn new() -> Self {
        Self(ValueMap::new())
    }

    /// Create a row holding only a payload
    pub fn with_value(value: impl Into<Value>) -> Self {
        let mut row = Self::new();
        row.insert(VALUE_KEY, value);
        row
    }

    /// Builder-style insertion
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a field
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Look up a field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The payload, if present
    pub fn value(&self) -> Option<&Value> {
        self.0.get(VALUE_KEY)
    }

    /// Remove and return the payload
    pub fn take_value(&mut self) -> Option<Value> {
        self.0.shift_remove(VALUE_KEY)
    }

    /// Check for a field
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Iterate over fields in insertion order
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.0.iter()
    }

    /// Borrow the underlying mapping
    pub fn as_map(&self) -> &ValueMap {
        &self.0
    }

    /// Take ownership of the underlying mapping
    pub fn into_map(self) -> ValueMap {
        self.0
    }
}

impl From<ValueMap> for Row {
    fn from(map: ValueMap) -> Self {
        Self(map)
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Map(self.0.clone()))
    }
}

type RowIter = Box<dyn Iterator<Item = ExecutionResult<Row>>>;

/// A lazy, finite, non-restartable stream of rows.
///
/// Clones share the same underlying iterator, so a row consumed through one
/// handle is gone for all of them. Resources held by the iterator (open
/// files) are released when the last handle is dropped.
#[derive(Clone)]
pub struct RowStream {
    inner: Rc<RefCell<RowIter>>,
}

impl RowStream {
    /// Wrap an iterator of fallible rows
    pub fn new<I>(iter: I) -> Self
    where
        I: Iterator<Item = ExecutionResult<Row>> + 'static,
    {
        Self {
            inner: Rc::new(RefCell::new(Box::new(iter))),
        }
    }

    /// Stream over rows that are already in memory
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self::new(rows.into_iter().map(Ok))
    }

    /// Stream that numbers each payload with a `ROW` index
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: 'static,
    {
        Self::new(
            values
                .into_iter()
                .enumerate()
                .map(|(ptr, value)| Ok(Row::with_value(value).field(ROW_KEY, ptr))),
        )
    }

    /// Lazily transform each row
    pub fn map_rows<F>(self, mut f: F) -> Self
    where
        F: FnMut(Row) -> ExecutionResult<Row> + 'static,
    {
        Self::new(self.map(move |row| row.and_then(&mut f)))
    }
}

impl Iterator for RowStream {
    type Item = ExecutionResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.borrow_mut().next()
    }
}

impl PartialEq for RowStream {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for RowStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowStream").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_position() {
        let mut first = RowStream::from_values(vec![Value::from(1), Value::from(2)]);
        let mut second = first.clone();

        let row = first.next().unwrap().unwrap();
        assert_eq!(row.value(), Some(&Value::Integer(1)));
        assert_eq!(row.get(ROW_KEY), Some(&Value::Integer(0)));

        let row = second.next().unwrap().unwrap();
        assert_eq!(row.value(), Some(&Value::Integer(2)));
        assert!(first.next().is_none());
    }

    #[test]
    fn test_map_rows_is_lazy() {
        use std::cell::Cell;
        let seen = Rc::new(Cell::new(0));
        let counter = seen.clone();
        let mut stream = RowStream::from_values(vec![Value::from("a"), Value::from("b")])
            .map_rows(move |row| {
                counter.set(counter.get() + 1);
                Ok(row.field("seen", true))
            });
        assert_eq!(seen.get(), 0);
        stream.next();
        assert_eq!(seen.get(), 1);
    }
}
