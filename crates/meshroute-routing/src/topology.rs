//! Per-node topology: every simple path from one node
//!
//! The topology is computed once from static adjacency and never reflects
//! dynamic failures; those are filtered when a route is selected. The
//! catalog grows exponentially with mesh density, which is acceptable for
//! the mesh sizes simulated here.

use std::collections::{BTreeMap, HashSet};

use meshroute_core::{NodeId, Path};
use tracing::trace;

use crate::adjacency::Adjacency;

/// Catalog of all loop-free paths from `origin`, in depth-first order
#[derive(Debug, Clone, Default)]
pub struct Topology {
    origin: Option<NodeId>,
    paths: Vec<Path>,
    /// Destination -> indices into `paths`, in enumeration order
    by_destination: BTreeMap<NodeId, Vec<usize>>,
}

impl Topology {
    /// Enumerate every simple path starting at `origin`
    ///
    /// Depth-first over the ordered neighbour lists, recording each
    /// extension as soon as it is made. An explicit stack of neighbour
    /// cursors replaces recursion and a single path buffer is reused for
    /// every branch. The resulting order is identical to the recursive
    /// preorder walk.
    pub fn enumerate(origin: &NodeId, adjacency: &Adjacency) -> Self {
        let mut topology = Self {
            origin: Some(origin.clone()),
            ..Self::default()
        };

        let mut current: Vec<NodeId> = vec![origin.clone()];
        let mut on_path: HashSet<NodeId> = HashSet::from([origin.clone()]);
        let mut cursors: Vec<usize> = vec![0];

        while let Some(&cursor) = cursors.last() {
            let Some(tip) = current.last() else { break };
            let neighbors = adjacency.neighbors(tip);

            if cursor >= neighbors.len() {
                cursors.pop();
                if let Some(done) = current.pop() {
                    on_path.remove(&done);
                }
                continue;
            }

            if let Some(top) = cursors.last_mut() {
                *top += 1;
            }

            let next = &neighbors[cursor];
            if on_path.contains(next) {
                continue;
            }

            current.push(next.clone());
            on_path.insert(next.clone());
            topology.push(Path::new(current.clone()));
            cursors.push(0);
        }

        trace!(origin = %origin, paths = topology.len(), "Topology enumerated");
        topology
    }

    fn push(&mut self, path: Path) {
        if let Some(destination) = path.destination() {
            self.by_destination
                .entry(destination.clone())
                .or_default()
                .push(self.paths.len());
        }
        self.paths.push(path);
    }

    pub fn origin(&self) -> Option<&NodeId> {
        self.origin.as_ref()
    }

    /// Every path, enumeration order
    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    /// Paths ending at `destination`, enumeration order
    pub fn paths_to<'a>(&'a self, destination: &NodeId) -> impl Iterator<Item = &'a Path> + 'a {
        self.by_destination
            .get(destination)
            .into_iter()
            .flatten()
            .map(|&index| &self.paths[index])
    }

    /// Nodes reachable from the origin over static links
    pub fn reachable(&self) -> impl Iterator<Item = &NodeId> {
        self.by_destination.keys()
    }

    pub fn reaches(&self, destination: &NodeId) -> bool {
        self.by_destination.contains_key(destination)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
