use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A single node of an object's type tree.
///
/// The variant set is closed: mappings, ordered sequences, fixed-arity tuples,
/// sets and three scalar kinds. Nodes are totally ordered so they can be stored
/// inside [`Node::Set`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Node {
    /// Field name to value. Key order carries no meaning.
    Map(BTreeMap<String, Node>),
    /// Ordered, growable sequence (`vector`/`Array` fields).
    Seq(Vec<Node>),
    /// Fixed-arity tuple (`pair` fields). The arity never changes after construction.
    Tuple(Box<[Node]>),
    /// Unordered set of distinct nodes.
    Set(BTreeSet<Node>),
    Str(String),
    Int(i64),
    Bytes(Vec<u8>),
}

impl Node {
    /// An empty mapping node.
    pub fn map() -> Self {
        Node::Map(BTreeMap::new())
    }

    /// Short name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Map(_) => "map",
            Node::Seq(_) => "sequence",
            Node::Tuple(_) => "tuple",
            Node::Set(_) => "set",
            Node::Str(_) => "string",
            Node::Int(_) => "integer",
            Node::Bytes(_) => "bytes",
        }
    }

    /// Look up a field of a mapping node.
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Map(map) => map.get(key),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        match self {
            Node::Map(map) => map.get_mut(key),
            _ => None,
        }
    }

    /// Follow a chain of mapping fields, e.g. `["m_StreamData", "path"]`.
    pub fn get_path(&self, path: &[&str]) -> Option<&Node> {
        path.iter().try_fold(self, |node, key| node.get(key))
    }

    pub fn get_path_mut(&mut self, path: &[&str]) -> Option<&mut Node> {
        path.iter().try_fold(self, |node, key| node.get_mut(key))
    }

    /// Insert or overwrite a field of a mapping node.
    ///
    /// Returns `false` (and leaves the node untouched) when `self` is not a mapping.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Node>) -> bool {
        match self {
            Node::Map(map) => {
                map.insert(key.into(), value.into());
                true
            }
            _ => false,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Node>> {
        match self {
            Node::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Node]> {
        match self {
            Node::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Node::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Node::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Whether any string leaf or mapping key anywhere below this node contains `needle`.
    pub fn contains_str(&self, needle: &str) -> bool {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                Node::Str(s) if s.contains(needle) => return true,
                Node::Map(map) => {
                    if map.keys().any(|k| k.contains(needle)) {
                        return true;
                    }
                    stack.extend(map.values());
                }
                Node::Seq(items) => stack.extend(items.iter()),
                Node::Tuple(items) => stack.extend(items.iter()),
                Node::Set(items) => stack.extend(items.iter()),
                _ => {}
            }
        }
        false
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::Str(value.to_string())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::Str(value)
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Node::Int(value)
    }
}

impl From<i32> for Node {
    fn from(value: i32) -> Self {
        Node::Int(value.into())
    }
}

impl From<u32> for Node {
    fn from(value: u32) -> Self {
        Node::Int(value.into())
    }
}

impl From<Vec<u8>> for Node {
    fn from(value: Vec<u8>) -> Self {
        Node::Bytes(value)
    }
}

impl From<Vec<Node>> for Node {
    fn from(value: Vec<Node>) -> Self {
        Node::Seq(value)
    }
}

impl<K: Into<String>> FromIterator<(K, Node)> for Node {
    fn from_iter<I: IntoIterator<Item = (K, Node)>>(iter: I) -> Self {
        Node::Map(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texture_tree() -> Node {
        [
            ("m_Name", Node::from("ui_jacket_001686")),
            ("m_Width", Node::from(512)),
            (
                "m_StreamData",
                [
                    ("offset", Node::from(0)),
                    ("size", Node::from(1024)),
                    ("path", Node::from("archive:/CAB-aa/CAB-aa.resS")),
                ]
                .into_iter()
                .collect(),
            ),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_get_path() {
        let tree = texture_tree();
        assert_eq!(
            tree.get_path(&["m_StreamData", "path"]).and_then(Node::as_str),
            Some("archive:/CAB-aa/CAB-aa.resS")
        );
        assert!(tree.get_path(&["m_StreamData", "missing"]).is_none());
        assert!(tree.get_path(&["m_Width", "nested"]).is_none());
    }

    #[test]
    fn test_set_only_on_maps() {
        let mut tree = texture_tree();
        assert!(tree.set("m_Height", 256));
        assert_eq!(tree.get("m_Height").and_then(Node::as_int), Some(256));

        let mut scalar = Node::from(3);
        assert!(!scalar.set("x", 1));
        assert_eq!(scalar, Node::Int(3));
    }

    #[test]
    fn test_contains_str_looks_at_keys_and_nested_values() {
        let tree = texture_tree();
        assert!(tree.contains_str("001686"));
        assert!(tree.contains_str("StreamData"));
        assert!(tree.contains_str("CAB-aa"));
        assert!(!tree.contains_str("002001"));

        let set = Node::Set([Node::from("abc"), Node::from(1)].into_iter().collect());
        assert!(set.contains_str("bc"));
    }

    #[test]
    fn test_bytes_are_not_strings() {
        let node = Node::from(b"_001686".to_vec());
        assert!(!node.contains_str("_001686"));
        assert_eq!(node.kind(), "bytes");
    }

    #[test]
    fn test_msgpack_roundtrip() {
        let tree = Node::Seq(vec![
            texture_tree(),
            Node::Tuple(vec![Node::from(1), Node::from("a")].into_boxed_slice()),
            Node::Set([Node::from("x")].into_iter().collect()),
        ]);
        let encoded = rmp_serde::to_vec_named(&tree).unwrap();
        let decoded: Node = rmp_serde::from_slice(&encoded).unwrap();
        assert_eq!(decoded, tree);
    }
}
