//! Path-addressed namespace store
//!
//! The namespace is one tree of mappings, sequences and scalars, kept in an
//! arena of nodes. Containers are addressed by [`NodeRef`], an index plus a
//! generation, so a handle to a node that has since been overwritten is
//! detected instead of silently reading whatever reused the slot.
//!
//! Besides full `a/b/c` paths, a leaf can be reached by its bare name through
//! the nickname index, which remembers the parent mapping that most recently
//! owned that leaf. Writes only follow a nickname in the explicit `/leaf`
//! form; a bare name is written at the root.

mod interpolate;

pub use interpolate::{fill_row_template, has_deferred_marker};

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::evaluator::{ExecutionError, ExecutionResult};
use crate::model::{Row, UNPRINTABLE_ITERABLE, Value, ValueMap};

/// Path segment delimiter
pub const PATH_DELIMITER: char = '/';

/// Root entry holding the per-depth iterator slots
pub const ITERATOR_ROOT: &str = "iterator";

/// Stable handle to a node in the namespace arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef {
    index: usize,
    generation: u32,
}

#[derive(Debug, Clone)]
enum Node {
    Map(IndexMap<String, NodeRef>),
    List(Vec<NodeRef>),
    Scalar(Value),
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// The hierarchical variable store
#[derive(Debug, Clone)]
pub struct Namespace {
    slots: Vec<Slot>,
    free: Vec<usize>,
    root: NodeRef,
    nicknames: FxHashMap<String, NodeRef>,
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}

impl Namespace {
    /// Create an empty namespace
    pub fn new() -> Self {
        let mut namespace = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeRef {
                index: 0,
                generation: 0,
            },
            nicknames: FxHashMap::default(),
        };
        namespace.root = namespace.insert_node(Node::Map(IndexMap::new()));
        namespace
    }

    /// Create a namespace whose root holds the given mapping
    pub fn from_map(map: ValueMap) -> Self {
        let mut namespace = Self::new();
        for (key, value) in map {
            let child = namespace.alloc(value);
            if let Some(Node::Map(root)) = namespace.node_mut(namespace.root) {
                root.insert(key, child);
            }
        }
        namespace
    }

    /// Handle of the root mapping
    pub fn root(&self) -> NodeRef {
        self.root
    }

    /// Walk `path` for writing and return the owning mapping and final key.
    ///
    /// Missing intermediate segments become empty mappings. Every traversed
    /// segment below the root's immediate children registers its nickname.
    /// The final key is not dereferenced.
    pub fn resolve_path(&mut self, path: &str) -> ExecutionResult<(NodeRef, String)> {
        if let Some(rest) = path.strip_prefix(PATH_DELIMITER) {
            if rest.is_empty() {
                return Err(ExecutionError::invalid_argument(
                    "store",
                    "given location is just an empty path '/'",
                ));
            }
            if !rest.contains(PATH_DELIMITER) {
                return match self.nickname_parent(rest) {
                    Some(parent) => Ok((parent, rest.to_string())),
                    None => Ok((self.root, rest.to_string())),
                };
            }
            return self.resolve_path(rest);
        }

        let segments: Vec<&str> = path.split(PATH_DELIMITER).collect();
        let mut focus = self.root;
        for (ptr, part) in segments.iter().enumerate() {
            if ptr > 0 {
                self.register_nickname(part, focus);
            }
            if ptr == segments.len() - 1 {
                return Ok((focus, (*part).to_string()));
            }

            let existing = match self.node(focus) {
                Some(Node::Map(map)) => map.get(*part).copied(),
                _ => None,
            };
            focus = match existing {
                Some(child) if matches!(self.node(child), Some(Node::Map(_))) => child,
                Some(_) => {
                    return Err(ExecutionError::TypeMismatch {
                        path: segments[..=ptr].join("/"),
                    });
                }
                None => {
                    let child = self.insert_node(Node::Map(IndexMap::new()));
                    if let Some(Node::Map(map)) = self.node_mut(focus) {
                        map.insert((*part).to_string(), child);
                    }
                    child
                }
            };
        }
        unreachable!("split always yields at least one segment")
    }

    /// Read the value at `name`, or `name` itself as a string literal when
    /// any segment is missing.
    pub fn read_value(&mut self, name: &str) -> Value {
        match self.lookup(name) {
            Some(node) => self.materialize(node),
            None => Value::String(name.to_string()),
        }
    }

    /// Whether `name` resolves to a namespace entry
    pub fn exists(&mut self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Read the value under `key` of a resolved container, if present
    pub fn peek(&self, container: NodeRef, key: &str) -> Option<Value> {
        match self.node(container) {
            Some(Node::Map(map)) => map.get(key).map(|child| self.materialize(*child)),
            _ => None,
        }
    }

    /// Assign `value` under `key` of a resolved container, releasing any
    /// previous subtree there.
    pub fn assign(&mut self, container: NodeRef, key: &str, value: Value) -> ExecutionResult<()> {
        if matches!(value, Value::Rows(_)) {
            return Err(ExecutionError::invalid_argument(
                "store",
                "an iterable must be consumed before it can be stored",
            ));
        }
        if !matches!(self.node(container), Some(Node::Map(_))) {
            return Err(ExecutionError::TypeMismatch {
                path: key.to_string(),
            });
        }
        let child = self.alloc(value);
        let previous = match self.node_mut(container) {
            Some(Node::Map(map)) => map.insert(key.to_string(), child),
            _ => None,
        };
        if let Some(previous) = previous {
            self.release(previous);
        }
        Ok(())
    }

    /// Resolve `path` and assign `value` there
    pub fn store(&mut self, path: &str, value: impl Into<Value>) -> ExecutionResult<()> {
        let (container, key) = self.resolve_path(path)?;
        self.assign(container, &key, value.into())
    }

    /// Append values to the list at `path`, creating the list if the location
    /// is unset or null.
    pub fn append(&mut self, path: &str, values: Vec<Value>) -> ExecutionResult<()> {
        let (container, key) = self.resolve_path(path)?;
        let existing = match self.node(container) {
            Some(Node::Map(map)) => map.get(&key).copied(),
            _ => None,
        };
        let list = match existing {
            Some(node) if matches!(self.node(node), Some(Node::List(_))) => node,
            Some(node) if matches!(self.node(node), Some(Node::Scalar(Value::Null))) => {
                self.assign(container, &key, Value::List(Vec::new()))?;
                self.child(container, &key).ok_or_else(|| {
                    ExecutionError::invalid_argument("append", "list vanished after creation")
                })?
            }
            Some(_) => {
                return Err(ExecutionError::invalid_argument(
                    "append",
                    format!("location \"{path}\" is not a list"),
                ));
            }
            None => {
                log::debug!("append() setting up array for /{key}");
                self.assign(container, &key, Value::List(Vec::new()))?;
                self.child(container, &key).ok_or_else(|| {
                    ExecutionError::invalid_argument("append", "list vanished after creation")
                })?
            }
        };
        let children: Vec<NodeRef> = values.into_iter().map(|v| self.alloc(v)).collect();
        if let Some(Node::List(items)) = self.node_mut(list) {
            items.extend(children);
        }
        Ok(())
    }

    /// Set or clear the row visible at `iterator/<depth>`
    pub fn set_iterator_slot(&mut self, depth: usize, row: Option<&Row>) {
        let slots = match self.child(self.root, ITERATOR_ROOT) {
            Some(node) if matches!(self.node(node), Some(Node::Map(_))) => node,
            _ => {
                let node = self.insert_node(Node::Map(IndexMap::new()));
                let previous = match self.node_mut(self.root) {
                    Some(Node::Map(root)) => root.insert(ITERATOR_ROOT.to_string(), node),
                    _ => None,
                };
                if let Some(previous) = previous {
                    self.release(previous);
                }
                node
            }
        };
        let value = row
            .map(|row| Value::Map(row.as_map().clone()))
            .unwrap_or(Value::Null);
        // slots is a live mapping, assignment cannot fail
        let _ = self.assign(slots, &depth.to_string(), value);
    }

    /// Materialize the whole tree below the root
    pub fn snapshot(&self) -> Value {
        self.materialize(self.root)
    }

    /// Materialize one root entry as JSON, keys sorted
    pub fn section_json(&self, section: &str) -> serde_json::Value {
        self.child(self.root, section)
            .map(|node| self.materialize(node).to_json())
            .unwrap_or(serde_json::Value::Null)
    }

    fn lookup(&mut self, name: &str) -> Option<NodeRef> {
        if name.is_empty() {
            return None;
        }

        if let Some(rest) = name.strip_prefix(PATH_DELIMITER) {
            if rest.is_empty() {
                return None;
            }
            if !rest.contains(PATH_DELIMITER) {
                return self.nickname(rest);
            }
            return self.lookup(rest);
        }

        if !name.contains(PATH_DELIMITER) {
            if let Some(node) = self.child(self.root, name) {
                return Some(node);
            }
            return self.nickname(name);
        }

        let mut focus = self.root;
        for part in name.split(PATH_DELIMITER) {
            focus = match self.node(focus)? {
                Node::Map(map) => *map.get(part)?,
                Node::List(items) => *items.get(part.parse::<usize>().ok()?)?,
                Node::Scalar(_) => return None,
            };
        }
        Some(focus)
    }

    /// Value node for a bare leaf name, evicting stale entries
    fn nickname(&mut self, leaf: &str) -> Option<NodeRef> {
        let parent = self.nickname_parent(leaf)?;
        self.child(parent, leaf)
    }

    fn nickname_parent(&mut self, leaf: &str) -> Option<NodeRef> {
        let parent = *self.nicknames.get(leaf)?;
        if self.map_contains(parent, leaf) {
            Some(parent)
        } else {
            log::debug!("Dropping stale nickname /{leaf}");
            self.nicknames.remove(leaf);
            None
        }
    }

    fn register_nickname(&mut self, leaf: &str, parent: NodeRef) {
        // Array indexes and per-row templates make poor abbreviations
        if leaf.is_empty()
            || leaf.chars().all(|c| c.is_ascii_digit())
            || has_deferred_marker(leaf)
        {
            return;
        }
        if let Some(previous) = self.nicknames.insert(leaf.to_string(), parent) {
            if previous != parent {
                log::debug!("Overwriting nickname /{leaf}");
            }
        }
    }

    fn child(&self, container: NodeRef, key: &str) -> Option<NodeRef> {
        match self.node(container)? {
            Node::Map(map) => map.get(key).copied(),
            _ => None,
        }
    }

    fn map_contains(&self, container: NodeRef, key: &str) -> bool {
        self.child(container, key).is_some()
    }

    fn node(&self, node: NodeRef) -> Option<&Node> {
        let slot = self.slots.get(node.index)?;
        if slot.generation == node.generation {
            slot.node.as_ref()
        } else {
            None
        }
    }

    fn node_mut(&mut self, node: NodeRef) -> Option<&mut Node> {
        let slot = self.slots.get_mut(node.index)?;
        if slot.generation == node.generation {
            slot.node.as_mut()
        } else {
            None
        }
    }

    fn insert_node(&mut self, node: Node) -> NodeRef {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.node = Some(node);
                NodeRef {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeRef {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        }
    }

    fn alloc(&mut self, value: Value) -> NodeRef {
        let node = match value {
            Value::Map(map) => Node::Map(
                map.into_iter()
                    .map(|(key, value)| (key, self.alloc(value)))
                    .collect(),
            ),
            Value::List(items) => Node::List(items.into_iter().map(|v| self.alloc(v)).collect()),
            Value::Rows(_) => Node::Scalar(Value::String(UNPRINTABLE_ITERABLE.to_string())),
            scalar => Node::Scalar(scalar),
        };
        self.insert_node(node)
    }

    fn release(&mut self, node: NodeRef) {
        let Some(slot) = self.slots.get_mut(node.index) else {
            return;
        };
        if slot.generation != node.generation {
            return;
        }
        let released = slot.node.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(node.index);

        match released {
            Some(Node::Map(map)) => map.into_values().for_each(|child| self.release(child)),
            Some(Node::List(items)) => items.into_iter().for_each(|child| self.release(child)),
            _ => {}
        }
    }

    fn materialize(&self, node: NodeRef) -> Value {
        match self.node(node) {
            Some(Node::Map(map)) => Value::Map(
                map.iter()
                    .map(|(key, child)| (key.clone(), self.materialize(*child)))
                    .collect(),
            ),
            Some(Node::List(items)) => {
                Value::List(items.iter().map(|child| self.materialize(*child)).collect())
            }
            Some(Node::Scalar(value)) => value.clone(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_write_then_read_round_trip() {
        let mut ns = Namespace::new();
        ns.store("a/b/c", 42).unwrap();
        assert_eq!(ns.read_value("a/b/c"), Value::Integer(42));
        assert!(matches!(ns.read_value("a/b"), Value::Map(_)));
        assert!(matches!(ns.read_value("a"), Value::Map(_)));
    }

    #[test]
    fn test_intermediate_scalar_is_type_mismatch() {
        let mut ns = Namespace::new();
        ns.store("a/b", 1).unwrap();
        let err = ns.resolve_path("a/b/c").unwrap_err();
        assert_eq!(
            err,
            ExecutionError::TypeMismatch {
                path: "a/b".to_string()
            }
        );
        assert_eq!(ns.read_value("a/b"), Value::Integer(1));
    }

    #[test]
    fn test_unresolved_names_pass_through() {
        let mut ns = Namespace::new();
        assert_eq!(ns.read_value("never_set"), Value::from("never_set"));
        assert_eq!(ns.read_value("x/y"), Value::from("x/y"));
        assert_eq!(ns.read_value(""), Value::from(""));
        assert!(!ns.exists("never_set"));
    }

    #[test]
    fn test_nickname_last_write_wins() {
        let mut ns = Namespace::new();
        ns.store("x/y/leaf", 5).unwrap();
        assert_eq!(ns.read_value("leaf"), Value::Integer(5));
        ns.store("p/q/leaf", 6).unwrap();
        assert_eq!(ns.read_value("leaf"), Value::Integer(6));
        assert_eq!(ns.read_value("/leaf"), Value::Integer(6));
        assert_eq!(ns.read_value("x/y/leaf"), Value::Integer(5));
    }

    #[test]
    fn test_intermediate_segments_get_nicknames() {
        let mut ns = Namespace::new();
        ns.store("report/stats/reads", 10).unwrap();
        assert!(matches!(ns.read_value("stats"), Value::Map(_)));
        // immediate children of the root are reached directly, not by nickname
        assert!(matches!(ns.read_value("report"), Value::Map(_)));
    }

    #[test]
    fn test_stale_nickname_is_evicted() {
        let mut ns = Namespace::new();
        ns.store("x/y/leaf", 5).unwrap();
        ns.store("x/y", "flat").unwrap();
        assert_eq!(ns.read_value("leaf"), Value::from("leaf"));
        assert!(!ns.nicknames.contains_key("leaf"));
    }

    #[test]
    fn test_replaced_subtree_is_not_reachable_by_nickname() {
        let mut ns = Namespace::new();
        ns.store("x/y/leaf", 5).unwrap();
        ns.store("x/y", Value::Map(ValueMap::new())).unwrap();
        // the old parent was released; reusing its slot must not revive the alias
        ns.store("z/other", Value::from(json!({"leaf": 9}))).unwrap();
        assert_eq!(ns.read_value("leaf"), Value::from("leaf"));
    }

    #[test]
    fn test_bare_name_write_lands_at_root() {
        let mut ns = Namespace::new();
        ns.store("report/counts/total", 1).unwrap();
        ns.store("total", 2).unwrap();
        assert_eq!(ns.read_value("report/counts/total"), Value::Integer(1));
        assert_eq!(ns.read_value("total"), Value::Integer(2));
        assert_eq!(
            ns.section_json("report"),
            json!({"counts": {"total": 1}})
        );
    }

    #[test]
    fn test_slash_name_write_follows_nickname() {
        let mut ns = Namespace::new();
        ns.store("report/counts/total", 1).unwrap();
        ns.store("/total", 2).unwrap();
        assert_eq!(ns.read_value("report/counts/total"), Value::Integer(2));
        assert!(!ns.exists("/total/x"));
    }

    #[test]
    fn test_numeric_segments_index_lists() {
        let mut ns = Namespace::new();
        ns.store("data/items", Value::from(json!(["a", "b"]))).unwrap();
        assert_eq!(ns.read_value("data/items/1"), Value::from("b"));
        assert_eq!(ns.read_value("data/items/2"), Value::from("data/items/2"));
        assert_eq!(ns.read_value("data/items/x"), Value::from("data/items/x"));
    }

    #[test]
    fn test_append_creates_and_extends_list() {
        let mut ns = Namespace::new();
        ns.append("report/job/message", vec![Value::from("one")]).unwrap();
        ns.append("report/job/message", vec![Value::from("two")]).unwrap();
        assert_eq!(
            ns.read_value("report/job/message"),
            Value::from(json!(["one", "two"]))
        );

        ns.store("report/job/status", "ok").unwrap();
        assert!(ns.append("report/job/status", vec![Value::Null]).is_err());
    }

    #[test]
    fn test_iterator_slot() {
        let mut ns = Namespace::new();
        let row = Row::with_value(3).field("name", "reads");
        ns.set_iterator_slot(1, Some(&row));
        assert_eq!(ns.read_value("iterator/1/name"), Value::from("reads"));
        ns.set_iterator_slot(1, None);
        assert_eq!(ns.read_value("iterator/1"), Value::Null);
    }

    #[test]
    fn test_empty_root_path_is_rejected() {
        let mut ns = Namespace::new();
        assert!(ns.resolve_path("/").is_err());
    }

    #[test]
    fn test_section_json_sorts_keys() {
        let mut ns = Namespace::new();
        ns.store("report/zeta", 1).unwrap();
        ns.store("report/alpha", 2).unwrap();
        let text = serde_json::to_string(&ns.section_json("report")).unwrap();
        assert_eq!(text, r#"{"alpha":2,"zeta":1}"#);
    }
}
