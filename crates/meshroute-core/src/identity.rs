//! Node identity and links
//!
//! Nodes are named by opaque string tokens (`"0"`, `"12"`, `"A"`...). Links
//! are undirected: [`Link`] stores its endpoints in canonical order so that
//! `(a, b)` and `(b, a)` compare, hash and display identically.

use std::borrow::Borrow;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Unique identifier for a node in the mesh
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a node id from any string-like value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// An undirected link between two adjacent nodes
///
/// The smaller id is always stored first, so a link can be used as a set
/// member without caring which side observed it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Link {
    low: NodeId,
    high: NodeId,
}

impl Link {
    /// Create the canonical link between `a` and `b`
    pub fn new(a: NodeId, b: NodeId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    /// Build a link from two borrowed ids
    pub fn between(a: &NodeId, b: &NodeId) -> Self {
        Self::new(a.clone(), b.clone())
    }

    /// Both endpoints, canonical order
    pub fn endpoints(&self) -> (&NodeId, &NodeId) {
        (&self.low, &self.high)
    }

    /// Check if `node` is one of the endpoints
    pub fn touches(&self, node: &NodeId) -> bool {
        &self.low == node || &self.high == node
    }

    /// The endpoint opposite `node`, if `node` is on this link
    pub fn other(&self, node: &NodeId) -> Option<&NodeId> {
        if &self.low == node {
            Some(&self.high)
        } else if &self.high == node {
            Some(&self.low)
        } else {
            None
        }
    }
}

impl Display for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.low, self.high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_is_symmetric() {
        let ab = Link::new(NodeId::from("A"), NodeId::from("B"));
        let ba = Link::new(NodeId::from("B"), NodeId::from("A"));
        assert_eq!(ab, ba);
        assert_eq!(ab.to_string(), "(A, B)");
    }

    #[test]
    fn test_link_other_endpoint() {
        let link = Link::new(NodeId::from("3"), NodeId::from("1"));
        assert_eq!(link.other(&NodeId::from("1")), Some(&NodeId::from("3")));
        assert_eq!(link.other(&NodeId::from("3")), Some(&NodeId::from("1")));
        assert_eq!(link.other(&NodeId::from("2")), None);
        assert!(link.touches(&NodeId::from("1")));
    }

    #[test]
    fn test_node_id_ordering_is_lexical() {
        let mut ids = vec![NodeId::from("10"), NodeId::from("2"), NodeId::from("1")];
        ids.sort();
        let names: Vec<&str> = ids.iter().map(NodeId::as_str).collect();
        assert_eq!(names, vec!["1", "10", "2"]);
    }
}
