//! Mesh descriptions
//!
//! A description maps every node id to the ordered list of its neighbours,
//! the same shape as the JSON tables the presets ship with:
//!
//! ```json
//! { "0": ["1", "3"], "1": ["0", "2"], "2": ["1"], "3": ["0"] }
//! ```
//!
//! Neighbour order matters: it is the order topologies are enumerated in,
//! and so the tie-break between equally short routes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::MeshResult;
use crate::identity::NodeId;

/// Node id -> ordered neighbour ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeshDescription {
    pub nodes: BTreeMap<NodeId, Vec<NodeId>>,
}

impl MeshDescription {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON adjacency table
    pub fn from_json(json: &str) -> MeshResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build a description from an undirected edge list
    ///
    /// Neighbours are listed in the order their edges appear.
    pub fn from_edges(edges: &[(&str, &str)]) -> Self {
        let mut description = Self::new();
        for (a, b) in edges {
            description.connect(NodeId::from(*a), NodeId::from(*b));
        }
        description
    }

    /// Add a node with no neighbours
    pub fn add_node(&mut self, id: NodeId) {
        self.nodes.entry(id).or_default();
    }

    /// Add `b` to `a`'s neighbours and `a` to `b`'s
    pub fn connect(&mut self, a: NodeId, b: NodeId) {
        let a_links = self.nodes.entry(a.clone()).or_default();
        if !a_links.contains(&b) {
            a_links.push(b.clone());
        }
        let b_links = self.nodes.entry(b).or_default();
        if !b_links.contains(&a) {
            b_links.push(a);
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_keeps_neighbour_order() {
        let description = MeshDescription::from_json(r#"{"0": ["3", "1"], "1": ["0"], "3": ["0"]}"#)
            .unwrap();
        assert_eq!(description.len(), 3);
        assert_eq!(
            description.nodes[&NodeId::from("0")],
            vec![NodeId::from("3"), NodeId::from("1")]
        );
    }

    #[test]
    fn test_from_edges_is_symmetric() {
        let description = MeshDescription::from_edges(&[("A", "B"), ("A", "D"), ("B", "C")]);
        assert_eq!(
            description.nodes[&NodeId::from("A")],
            vec![NodeId::from("B"), NodeId::from("D")]
        );
        assert_eq!(
            description.nodes[&NodeId::from("B")],
            vec![NodeId::from("A"), NodeId::from("C")]
        );
        assert_eq!(description.nodes[&NodeId::from("D")], vec![NodeId::from("A")]);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(MeshDescription::from_json("[1, 2]").is_err());
    }
}
