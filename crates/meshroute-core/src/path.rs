//! Paths through the mesh
//!
//! A [`Path`] is an ordered, loop-free sequence of node ids in which every
//! consecutive pair is a static link. Paths are used both as routes (where a
//! packet is going) and as traversal records (where it has been).

use std::collections::BTreeSet;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::identity::{Link, NodeId};

/// Ordered sequence of node ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<NodeId>);

impl Path {
    pub fn new(nodes: Vec<NodeId>) -> Self {
        Self(nodes)
    }

    /// A path that starts and ends at `node`
    pub fn single(node: NodeId) -> Self {
        Self(vec![node])
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of links crossed when following the path
    pub fn hops(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    pub fn origin(&self) -> Option<&NodeId> {
        self.0.first()
    }

    pub fn destination(&self) -> Option<&NodeId> {
        self.0.last()
    }

    pub fn contains(&self, node: &NodeId) -> bool {
        self.0.contains(node)
    }

    /// The node following `node` on this path
    pub fn next_hop_after(&self, node: &NodeId) -> Option<&NodeId> {
        let index = self.0.iter().position(|n| n == node)?;
        self.0.get(index + 1)
    }

    /// Links between consecutive nodes, in path order
    pub fn links(&self) -> impl Iterator<Item = Link> + '_ {
        self.0.windows(2).map(|pair| Link::between(&pair[0], &pair[1]))
    }

    /// True if any link of the path is in `failed`
    pub fn crosses_any(&self, failed: &BTreeSet<Link>) -> bool {
        !failed.is_empty() && self.links().any(|link| failed.contains(&link))
    }

    /// True if no node appears twice
    pub fn is_simple(&self) -> bool {
        let mut seen = BTreeSet::new();
        self.0.iter().all(|n| seen.insert(n))
    }

    /// The same nodes, last to first
    pub fn reversed(&self) -> Self {
        Self(self.0.iter().rev().cloned().collect())
    }

    /// Append `node`, erasing any cycle it closes
    ///
    /// If `node` is already on the path everything after its first
    /// occurrence is cut, so the path stays loop-free and always describes
    /// the forward route that actually worked.
    pub fn visit(&mut self, node: NodeId) {
        match self.0.iter().position(|n| n == &node) {
            Some(index) => self.0.truncate(index + 1),
            None => self.0.push(node),
        }
    }
}

impl From<Vec<NodeId>> for Path {
    fn from(nodes: Vec<NodeId>) -> Self {
        Self(nodes)
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.0.iter().map(NodeId::as_str).collect();
        write!(f, "[{}]", names.join(" -> "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(ids: &[&str]) -> Path {
        Path::new(ids.iter().map(|id| NodeId::from(*id)).collect())
    }

    #[test]
    fn test_next_hop_after() {
        let route = path(&["0", "1", "2", "3"]);
        assert_eq!(route.next_hop_after(&NodeId::from("1")), Some(&NodeId::from("2")));
        assert_eq!(route.next_hop_after(&NodeId::from("3")), None);
        assert_eq!(route.next_hop_after(&NodeId::from("9")), None);
        assert_eq!(route.hops(), 3);
    }

    #[test]
    fn test_visit_erases_cycles() {
        let mut walked = path(&["A", "B"]);
        walked.visit(NodeId::from("A"));
        assert_eq!(walked, path(&["A"]));

        walked.visit(NodeId::from("D"));
        walked.visit(NodeId::from("C"));
        assert_eq!(walked, path(&["A", "D", "C"]));
        assert!(walked.is_simple());
    }

    #[test]
    fn test_crosses_any_is_direction_agnostic() {
        let route = path(&["A", "B", "C"]);
        let mut failed = BTreeSet::new();
        assert!(!route.crosses_any(&failed));

        failed.insert(Link::new(NodeId::from("C"), NodeId::from("B")));
        assert!(route.crosses_any(&failed));
        assert!(route.reversed().crosses_any(&failed));
    }

    #[test]
    fn test_display() {
        assert_eq!(path(&["0", "1", "4"]).to_string(), "[0 -> 1 -> 4]");
    }
}
