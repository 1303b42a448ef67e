//! Route selection over a precomputed topology
//!
//! ## Routing Algorithm
//!
//! 1. **SELF**: a packet addressed to the origin routes as `[origin]`
//! 2. **FRESH**: the fewest-hop path that crosses no failed link and does
//!    not revisit a node the packet already traversed
//! 3. **BACKTRACK**: otherwise the fewest-hop path that crosses no failed
//!    link, even if it leads back through traversed nodes
//! 4. **NONE**: every candidate crosses at least one failed link
//!
//! Ties are broken by topology enumeration order, so a given mesh and
//! failure history always yields the same route.

use std::collections::BTreeSet;

use meshroute_core::{Link, NodeId, Path};
use tracing::trace;

use crate::topology::Topology;

/// Inputs of one route search
#[derive(Debug, Clone, Copy)]
pub struct RouteQuery<'a> {
    pub destination: &'a NodeId,
    /// Links known bad for the current delivery attempt
    pub failed: &'a BTreeSet<Link>,
    /// Nodes the packet has already passed through
    pub traversed: &'a [NodeId],
}

impl<'a> RouteQuery<'a> {
    /// Query for a fresh packet: nothing failed, nothing traversed
    pub fn fresh(destination: &'a NodeId, failed: &'a BTreeSet<Link>) -> Self {
        Self {
            destination,
            failed,
            traversed: &[],
        }
    }
}

impl Topology {
    /// Select the shortest viable path for `query`
    pub fn find_route(&self, query: RouteQuery<'_>) -> Option<Path> {
        let origin = self.origin()?;
        if query.destination == origin {
            return Some(Path::single(origin.clone()));
        }

        let mut fresh: Option<&Path> = None;
        let mut backtrack: Option<&Path> = None;

        for path in self.paths_to(query.destination) {
            if path.crosses_any(query.failed) {
                continue;
            }
            if backtrack.is_none_or(|best| path.hops() < best.hops()) {
                backtrack = Some(path);
            }
            let revisits = path.nodes()[1..]
                .iter()
                .any(|node| query.traversed.contains(node));
            if !revisits && fresh.is_none_or(|best| path.hops() < best.hops()) {
                fresh = Some(path);
            }
        }

        let chosen = fresh.or(backtrack).cloned();
        trace!(
            origin = %origin,
            destination = %query.destination,
            route = ?chosen.as_ref().map(Path::to_string),
            "Route search"
        );
        chosen
    }
}
