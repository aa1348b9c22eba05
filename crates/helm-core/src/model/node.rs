//! Dynamically typed management value tree.

use indexmap::IndexMap;
use std::fmt;

static UNDEFINED: ModelNode = ModelNode::Undefined;

/// Type tag of a [`ModelNode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelType {
    /// No value
    Undefined,
    /// `true` / `false`
    Boolean,
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Long,
    /// 64-bit float
    Double,
    /// UTF-8 string
    String,
    /// Raw bytes
    Bytes,
    /// Ordered list of nodes
    List,
    /// Ordered string-keyed map of nodes
    Object,
}

/// Recursive value used for operation parameters, results and metadata.
///
/// Object keys keep insertion order and are unique. Reads of absent keys yield
/// an undefined node rather than failing, so callers can write
/// `op.get("recursive").as_bool_or(false)` without checking presence first.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ModelNode {
    /// No value
    #[default]
    Undefined,
    /// Boolean scalar
    Boolean(bool),
    /// Integer scalar
    Int(i32),
    /// Long scalar
    Long(i64),
    /// Double scalar
    Double(f64),
    /// String scalar
    String(String),
    /// Bytes scalar
    Bytes(Vec<u8>),
    /// Ordered list
    List(Vec<ModelNode>),
    /// Ordered object
    Object(IndexMap<String, ModelNode>),
}

impl ModelNode {
    /// An empty object node
    pub fn object() -> Self {
        Self::Object(IndexMap::new())
    }

    /// An empty list node
    pub fn list() -> Self {
        Self::List(Vec::new())
    }

    /// Type tag of this node
    pub fn model_type(&self) -> ModelType {
        match self {
            Self::Undefined => ModelType::Undefined,
            Self::Boolean(_) => ModelType::Boolean,
            Self::Int(_) => ModelType::Int,
            Self::Long(_) => ModelType::Long,
            Self::Double(_) => ModelType::Double,
            Self::String(_) => ModelType::String,
            Self::Bytes(_) => ModelType::Bytes,
            Self::List(_) => ModelType::List,
            Self::Object(_) => ModelType::Object,
        }
    }

    /// Whether this node holds a value
    pub fn is_defined(&self) -> bool {
        !matches!(self, Self::Undefined)
    }

    /// Child under `key`, or an undefined node when absent or not an object
    pub fn get(&self, key: &str) -> &ModelNode {
        match self {
            Self::Object(map) => map.get(key).unwrap_or(&UNDEFINED),
            _ => &UNDEFINED,
        }
    }

    /// Walk a path of object keys
    pub fn get_path(&self, path: &[&str]) -> &ModelNode {
        path.iter().fold(self, |node, key| node.get(key))
    }

    /// Whether the key is present at all, defined or not
    pub fn has(&self, key: &str) -> bool {
        matches!(self, Self::Object(map) if map.contains_key(key))
    }

    /// Whether the key is present and holds a defined value
    pub fn has_defined(&self, key: &str) -> bool {
        self.get(key).is_defined()
    }

    /// Mutable child under `key`, creating it as undefined if absent.
    ///
    /// A node that is not already an object is replaced by an empty object.
    pub fn get_mut(&mut self, key: &str) -> &mut ModelNode {
        let map = self.ensure_object();
        map.entry(key.to_string()).or_default()
    }

    /// Set `key` to `value`, converting this node into an object if needed
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ModelNode>) -> &mut Self {
        self.ensure_object().insert(key.into(), value.into());
        self
    }

    /// Builder form of [`ModelNode::set`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ModelNode>) -> Self {
        self.set(key, value);
        self
    }

    /// Remove `key`, keeping the order of the remaining keys
    pub fn remove(&mut self, key: &str) -> Option<ModelNode> {
        match self {
            Self::Object(map) => map.shift_remove(key),
            _ => None,
        }
    }

    /// Rename `from` to `to` in place, keeping its position
    pub fn rename_key(&mut self, from: &str, to: &str) -> bool {
        let Self::Object(map) = self else {
            return false;
        };
        let Some(index) = map.get_index_of(from) else {
            return false;
        };
        let Some((_, value)) = map.shift_remove_index(index) else {
            return false;
        };
        map.shift_insert(index, to.to_string(), value);
        true
    }

    /// Append to a list, converting an undefined node into a list first
    pub fn push(&mut self, value: impl Into<ModelNode>) -> &mut Self {
        if !matches!(self, Self::List(_)) {
            *self = Self::list();
        }
        if let Self::List(items) = self {
            items.push(value.into());
        }
        self
    }

    /// Object keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        let map = match self {
            Self::Object(map) => Some(map),
            _ => None,
        };
        map.into_iter().flat_map(|m| m.keys().map(String::as_str))
    }

    /// Object entries in insertion order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &ModelNode)> {
        let map = match self {
            Self::Object(map) => Some(map),
            _ => None,
        };
        map.into_iter()
            .flat_map(|m| m.iter().map(|(k, v)| (k.as_str(), v)))
    }

    /// Underlying map when this is an object
    pub fn as_object(&self) -> Option<&IndexMap<String, ModelNode>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// List items, empty for anything that is not a list
    pub fn as_list(&self) -> &[ModelNode] {
        match self {
            Self::List(items) => items,
            _ => &[],
        }
    }

    /// Borrowed string contents when this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Lossy string rendering of any scalar; composites render as JSON
    pub fn as_string(&self) -> String {
        match self {
            Self::Undefined => "undefined".to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Long(l) => l.to_string(),
            Self::Double(d) => d.to_string(),
            Self::String(s) => s.clone(),
            other => other.to_json_string(),
        }
    }

    /// Boolean value, accepting `"true"`/`"false"` strings
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            Self::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
            Self::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }

    /// Boolean value, or `default` when undefined or not convertible
    pub fn as_bool_or(&self, default: bool) -> bool {
        self.as_bool().unwrap_or(default)
    }

    /// Integral value widened to `i64`
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(i64::from(*i)),
            Self::Long(l) => Some(*l),
            Self::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Whether a string value carries an unresolved `${...}` expression
    pub fn is_expression(&self) -> bool {
        match self {
            Self::String(s) => s
                .find("${")
                .is_some_and(|start| s[start..].contains('}')),
            _ => false,
        }
    }

    /// Whether any node in this tree carries an expression
    pub fn contains_expression(&self) -> bool {
        match self {
            Self::List(items) => items.iter().any(Self::contains_expression),
            Self::Object(map) => map.values().any(Self::contains_expression),
            other => other.is_expression(),
        }
    }

    fn ensure_object(&mut self) -> &mut IndexMap<String, ModelNode> {
        if !matches!(self, Self::Object(_)) {
            *self = Self::object();
        }
        match self {
            Self::Object(map) => map,
            _ => unreachable!("node was just converted into an object"),
        }
    }
}

impl fmt::Display for ModelNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json_string())
    }
}

impl From<bool> for ModelNode {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i32> for ModelNode {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<i64> for ModelNode {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<f64> for ModelNode {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for ModelNode {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ModelNode {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<u8>> for ModelNode {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<Vec<ModelNode>> for ModelNode {
    fn from(value: Vec<ModelNode>) -> Self {
        Self::List(value)
    }
}

impl<T: Into<ModelNode>> From<Option<T>> for ModelNode {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Undefined, Into::into)
    }
}

impl FromIterator<(String, ModelNode)> for ModelNode {
    fn from_iter<I: IntoIterator<Item = (String, ModelNode)>>(iter: I) -> Self {
        Self::Object(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_keys_read_as_undefined() {
        let node = ModelNode::object().with("a", 1);
        assert!(!node.get("missing").is_defined());
        assert!(!node.get_path(&["a", "b", "c"]).is_defined());
        assert!(node.get("recursive").as_bool_or(true));
        assert!(!ModelNode::Int(3).has("a"));
    }

    #[test]
    fn has_versus_has_defined() {
        let node = ModelNode::object()
            .with("set", "x")
            .with("empty", ModelNode::Undefined);
        assert!(node.has("empty"));
        assert!(!node.has_defined("empty"));
        assert!(node.has_defined("set"));
    }

    #[test]
    fn insertion_order_and_unique_keys() {
        let mut node = ModelNode::object();
        node.set("b", 1).set("a", 2).set("b", 3);
        assert_eq!(node.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(node.get("b"), &ModelNode::Int(3));
    }

    #[test]
    fn rename_keeps_position() {
        let mut node = ModelNode::object().with("a", 1).with("b", 2).with("c", 3);
        assert!(node.rename_key("b", "beta"));
        assert_eq!(node.keys().collect::<Vec<_>>(), vec!["a", "beta", "c"]);
        assert!(!node.rename_key("zzz", "y"));
    }

    #[test]
    fn deep_copy_is_independent() {
        let original = ModelNode::object().with("nested", ModelNode::object().with("x", 1));
        let mut copy = original.clone();
        copy.get_mut("nested").set("x", 2);
        assert_eq!(original.get_path(&["nested", "x"]), &ModelNode::Int(1));
        assert_eq!(copy.get_path(&["nested", "x"]), &ModelNode::Int(2));
    }

    #[test]
    fn expressions_are_detected() {
        assert!(ModelNode::from("${jboss.bind.address:127.0.0.1}").is_expression());
        assert!(!ModelNode::from("plain").is_expression());
        assert!(!ModelNode::from("${unterminated").is_expression());
        let tree = ModelNode::object().with("list", vec![ModelNode::from("${x}")]);
        assert!(tree.contains_expression());
    }
}
