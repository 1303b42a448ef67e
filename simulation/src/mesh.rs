//! The mesh: nodes, static adjacency and the dead-link set
//!
//! Implements the discrete-time driver:
//! - Ownership of every [`Node`], stepped in ascending id order
//! - The authoritative view of link and node liveness
//! - Random fault injection driven by a seedable RNG
//! - Mesh-wide metrics aggregated from the nodes

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use meshroute_core::{
    Emitter, EventSink, Link, Medium, MeshDescription, MeshError, MeshEvent, MeshResult, NodeId,
    Packet, PacketId, PacketKind,
};
use meshroute_routing::Adjacency;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::config::{FailureKind, MeshConfig};
use crate::node::Node;
use crate::stats::MeshStats;

/// What the node taking its step sees of everyone else
///
/// The stepping node is detached from `nodes` for the duration of its step.
struct Fabric<'a> {
    nodes: &'a mut BTreeMap<NodeId, Node>,
    dead_links: &'a BTreeSet<Link>,
}

impl Medium for Fabric<'_> {
    fn link_up(&self, from: &NodeId, to: &NodeId) -> bool {
        !self.dead_links.contains(&Link::between(from, to))
    }

    fn deliver(&mut self, to: &NodeId, packet: Packet) -> Result<(), Packet> {
        match self.nodes.get_mut(to) {
            Some(node) => node.receive_packet(packet),
            None => Err(packet),
        }
    }
}

/// A simulated mesh network
#[derive(Debug)]
pub struct Mesh {
    nodes: BTreeMap<NodeId, Node>,
    adjacency: Adjacency,
    dead_links: BTreeSet<Link>,
    tick: u64,
    config: MeshConfig,
    rng: StdRng,
    congestion: Vec<f64>,
    emitter: Emitter,
}

impl Mesh {
    /// Build a mesh from a description
    ///
    /// Fails on self-links, duplicate neighbours or neighbours that name a
    /// node the description does not define.
    pub fn from_description(
        description: &MeshDescription,
        config: MeshConfig,
        sink: Arc<dyn EventSink>,
    ) -> MeshResult<Self> {
        let adjacency = Adjacency::from_description(description)?;
        let emitter = Emitter::new(sink, config.verbose);

        let nodes = adjacency
            .nodes()
            .map(|id| {
                let links = adjacency.neighbors(id).to_vec();
                (id.clone(), Node::new(id.clone(), links, emitter.clone()))
            })
            .collect();

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        info!(
            nodes = adjacency.node_count(),
            links = adjacency.link_count(),
            "Mesh built"
        );

        Ok(Self {
            nodes,
            adjacency,
            dead_links: BTreeSet::new(),
            tick: 0,
            config,
            rng,
            congestion: Vec::new(),
            emitter,
        })
    }

    /// Build a mesh from a JSON object of `id -> [neighbour, ...]`
    pub fn from_json(json: &str, config: MeshConfig, sink: Arc<dyn EventSink>) -> MeshResult<Self> {
        let description = MeshDescription::from_json(json)?;
        Self::from_description(&description, config, sink)
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn config(&self) -> &MeshConfig {
        &self.config
    }

    pub fn adjacency(&self) -> &Adjacency {
        &self.adjacency
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.config.verbose = verbose;
        self.emitter.set_verbose(verbose);
    }

    /// Node ids in step order
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn require(&self, id: &NodeId) -> MeshResult<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| MeshError::UnknownNode(id.clone()))
    }

    fn require_mut(&mut self, id: &NodeId) -> MeshResult<&mut Node> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| MeshError::UnknownNode(id.clone()))
    }

    /// Flip the link between `a` and `b` between dead and alive
    ///
    /// Returns whether the link is alive afterwards.
    pub fn toggle_link(&mut self, a: &NodeId, b: &NodeId) -> MeshResult<bool> {
        self.require(a)?;
        self.require(b)?;
        if !self.adjacency.are_adjacent(a, b) {
            return Err(MeshError::UnknownLink(a.clone(), b.clone()));
        }

        let link = Link::between(a, b);
        let alive = !self.dead_links.insert(link.clone());
        if alive {
            self.dead_links.remove(&link);
        }
        self.emitter.emit(MeshEvent::LinkToggled {
            link,
            alive,
            tick: self.tick,
        });
        Ok(alive)
    }

    /// Flip a node between dead and alive, returning the new state
    pub fn toggle_node(&mut self, id: &NodeId) -> MeshResult<bool> {
        let alive = !self.require(id)?.is_alive();
        self.set_node_alive(id, alive)?;
        Ok(alive)
    }

    pub fn set_node_alive(&mut self, id: &NodeId, alive: bool) -> MeshResult<()> {
        let tick = self.tick;
        let node = self.require_mut(id)?;
        if node.is_alive() == alive {
            return Ok(());
        }
        node.set_alive(alive);
        self.emitter.emit(MeshEvent::NodeToggled {
            node: id.clone(),
            alive,
            tick,
        });
        Ok(())
    }

    /// Whether the link is not administratively dead
    pub fn link_status(&self, a: &NodeId, b: &NodeId) -> bool {
        !self.dead_links.contains(&Link::between(a, b))
    }

    /// Whether a packet could cross from `a` to `b` right now
    pub fn link_usable(&self, a: &NodeId, b: &NodeId) -> bool {
        let alive = |id: &NodeId| self.nodes.get(id).is_some_and(Node::is_alive);
        self.adjacency.are_adjacent(a, b) && self.link_status(a, b) && alive(a) && alive(b)
    }

    pub fn dead_links(&self) -> impl Iterator<Item = &Link> {
        self.dead_links.iter()
    }

    /// Every static link once, canonical and sorted
    pub fn get_links(&self) -> Vec<Link> {
        self.adjacency.links()
    }

    /// Enumerate every node's topology; required before routing
    pub fn generate_topology(&mut self) {
        debug!(tick = self.tick, "Generating mesh topology");
        for node in self.nodes.values_mut() {
            node.generate_topology(&self.adjacency);
        }
    }

    /// Create a packet at `source`
    ///
    /// A destination that is down, or whose every link is down, is refused
    /// up front: nothing is queued anywhere.
    pub fn generate_packet(
        &mut self,
        source: &NodeId,
        kind: PacketKind,
        destination: &NodeId,
        data: Option<String>,
    ) -> MeshResult<PacketId> {
        self.require(source)?;
        let target = self.require(destination)?;

        if source != destination {
            let cut_off = self
                .adjacency
                .links_of(destination)
                .iter()
                .all(|link| self.dead_links.contains(link));
            if !target.is_alive() || cut_off {
                return Err(MeshError::UnreachableDestination {
                    from: source.clone(),
                    to: destination.clone(),
                });
            }
        }

        self.require_mut(source)?
            .generate_packet(kind, destination.clone(), data)
    }

    /// Advance the mesh by one tick
    ///
    /// Rolls random failures, steps every node once in id order, samples
    /// congestion and resets the per-tick flags. A packet delivered during
    /// this tick is first processed on the next one.
    pub fn run(&mut self) {
        self.tick += 1;
        let tick = self.tick;
        for node in self.nodes.values_mut() {
            node.begin_tick(tick);
        }

        for kind in [FailureKind::Node, FailureKind::Link] {
            let chance = self.config.fail_chance(kind);
            if chance > 0 {
                self.rand_fail(kind, chance);
            }
        }

        let ids: Vec<NodeId> = self.nodes.keys().cloned().collect();
        for id in ids {
            let Some(mut node) = self.nodes.remove(&id) else {
                continue;
            };
            let mut fabric = Fabric {
                nodes: &mut self.nodes,
                dead_links: &self.dead_links,
            };
            node.run(&mut fabric);
            self.nodes.insert(id, node);
        }

        if let Some(average) = self.average_buffer() {
            self.congestion.push(average);
        }
        for node in self.nodes.values_mut() {
            node.end_tick();
        }
    }

    /// Bring every link and node back up
    pub fn restore(&mut self) {
        self.dead_links.clear();
        for node in self.nodes.values_mut() {
            node.set_alive(true);
        }
        self.emitter.emit(MeshEvent::Restored { tick: self.tick });
    }

    /// With `chance` percent probability, toggle a random node or one of its
    /// links
    ///
    /// Nodes listed in the config's `never_fail` are never touched, neither
    /// directly nor through one of their links. Returns whether anything
    /// was toggled.
    pub fn rand_fail(&mut self, kind: FailureKind, chance: u8) -> bool {
        let roll: u8 = self.rng.random_range(1..=100);
        if roll > chance || self.nodes.is_empty() {
            return false;
        }

        let index = self.rng.random_range(0..self.nodes.len());
        let Some(picked) = self.nodes.keys().nth(index).cloned() else {
            return false;
        };
        if self.config.never_fail.contains(&picked) {
            return false;
        }

        match kind {
            FailureKind::Node => self.toggle_node(&picked).is_ok(),
            FailureKind::Link => {
                let neighbors = self.adjacency.neighbors(&picked);
                if neighbors.is_empty() {
                    return false;
                }
                let other = neighbors[self.rng.random_range(0..neighbors.len())].clone();
                if self.config.never_fail.contains(&other) {
                    return false;
                }
                self.toggle_link(&picked, &other).is_ok()
            }
        }
    }

    pub fn set_fail_chance(&mut self, kind: FailureKind, chance: u8) {
        self.config.set_fail_chance(kind, chance);
    }

    pub fn set_never_fail(&mut self, nodes: BTreeSet<NodeId>) {
        self.config.never_fail = nodes;
    }

    /// Average size of the non-empty buffers, `None` when all are empty
    pub fn average_buffer(&self) -> Option<f64> {
        let sizes: Vec<usize> = self
            .nodes
            .values()
            .map(Node::buffer_len)
            .filter(|size| *size > 0)
            .collect();
        if sizes.is_empty() {
            return None;
        }
        Some(sizes.iter().sum::<usize>() as f64 / sizes.len() as f64)
    }

    /// Average number of topology entries per node
    pub fn average_topology_size(&self) -> f64 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        let total: usize = self.nodes.values().map(|n| n.topology().len()).sum();
        total as f64 / self.nodes.len() as f64
    }

    /// True when every buffer is empty
    pub fn is_idle(&self) -> bool {
        self.nodes.values().all(|n| n.buffer_len() == 0)
    }

    pub fn stats(&self) -> MeshStats {
        let mut stats = MeshStats {
            ticks: self.tick,
            congestion: self.congestion.clone(),
            ..Default::default()
        };
        for node in self.nodes.values() {
            stats.absorb(node.stats());
        }
        stats
    }

    /// Down nodes, down links and pending buffers
    pub fn status_report(&self) -> String {
        let mut output = format!("Network status at tick {}:\n", self.tick);
        for node in self.nodes.values().filter(|n| !n.is_alive()) {
            output.push_str(&format!("    Node {} down\n", node.id()));
        }
        for link in &self.dead_links {
            output.push_str(&format!("    Link {} down\n", link));
        }
        for node in self.nodes.values().filter(|n| n.buffer_len() > 0) {
            output.push_str(&format!(
                "    Node {} has {} packets pending\n",
                node.id(),
                node.buffer_len()
            ));
        }
        output.push_str("--------------");
        output
    }
}
