//! Static adjacency of a mesh
//!
//! Built once from a [`MeshDescription`] and validated: every neighbour must
//! name a node of the description, self-links are rejected, and a missing
//! reverse entry is filled in so adjacency is symmetric.

use std::collections::{BTreeMap, BTreeSet};

use meshroute_core::{Link, MeshDescription, MeshError, MeshResult, NodeId};

/// Node id -> ordered neighbour ids, symmetric
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Adjacency {
    neighbors: BTreeMap<NodeId, Vec<NodeId>>,
}

impl Adjacency {
    /// Validate a description and build its adjacency
    pub fn from_description(description: &MeshDescription) -> MeshResult<Self> {
        let mut neighbors = description.nodes.clone();

        for (node, links) in &description.nodes {
            let mut seen = BTreeSet::new();
            for link in links {
                if link == node {
                    return Err(MeshError::InvalidDescription(format!(
                        "node {} lists itself as a neighbour",
                        node
                    )));
                }
                if !description.nodes.contains_key(link) {
                    return Err(MeshError::UnknownNode(link.clone()));
                }
                if !seen.insert(link) {
                    return Err(MeshError::InvalidDescription(format!(
                        "node {} lists neighbour {} twice",
                        node, link
                    )));
                }
            }
        }

        // Fill in one-sided entries
        for (node, links) in &description.nodes {
            for link in links {
                if let Some(back) = neighbors.get_mut(link)
                    && !back.contains(node)
                {
                    back.push(node.clone());
                }
            }
        }

        Ok(Self { neighbors })
    }

    /// All node ids, sorted
    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.neighbors.keys()
    }

    pub fn contains(&self, node: &NodeId) -> bool {
        self.neighbors.contains_key(node)
    }

    /// Ordered neighbours of `node` (empty for unknown nodes)
    pub fn neighbors(&self, node: &NodeId) -> &[NodeId] {
        self.neighbors.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn are_adjacent(&self, a: &NodeId, b: &NodeId) -> bool {
        self.neighbors(a).contains(b)
    }

    /// Every link once, canonical orientation, sorted
    pub fn links(&self) -> Vec<Link> {
        let unique: BTreeSet<Link> = self
            .neighbors
            .iter()
            .flat_map(|(node, links)| links.iter().map(move |link| Link::between(node, link)))
            .collect();
        unique.into_iter().collect()
    }

    /// Links touching `node`
    pub fn links_of(&self, node: &NodeId) -> Vec<Link> {
        self.neighbors(node)
            .iter()
            .map(|other| Link::between(node, other))
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.neighbors.len()
    }

    pub fn link_count(&self) -> usize {
        self.links().len()
    }

    /// Simple ASCII listing of the adjacency
    pub fn visualize(&self) -> String {
        let mut output = String::new();
        output.push_str("Mesh Topology:\n");
        output.push_str(&format!("  Nodes: {}\n", self.node_count()));
        output.push_str(&format!("  Links: {}\n\n", self.link_count()));

        for (node, links) in &self.neighbors {
            let names: Vec<&str> = links.iter().map(NodeId::as_str).collect();
            output.push_str(&format!("  {} -> [{}]\n", node, names.join(", ")));
        }
        output
    }
}
