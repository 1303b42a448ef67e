//! Routing actor
//!
//! A [`Node`] owns its buffer, its precomputed topology and its failure
//! memory. Once per tick the mesh lends it a [`Medium`] and calls
//! [`Node::run`], which takes at most one packet off the head of the buffer
//! and makes exactly one transmission attempt with it.
//!
//! ## Packet lifecycle
//!
//! ```text
//! CREATED -> ROUTING -> IN_TRANSIT -> DELIVERED
//!                            |
//!                            +-> REROUTING -> IN_TRANSIT
//!                            +-> UNREACHABLE
//! ```
//!
//! A failed attempt records the link in the flow's failure memory and in
//! the packet itself, then looks for a new route. With one, the packet stays
//! at the head of the buffer and is retried next tick; without one it is
//! dropped and counted unreached.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use meshroute_core::{
    DropReason, Emitter, Link, Medium, MeshError, MeshEvent, MeshResult, NodeId, Packet, PacketId,
    PacketKind, Path,
};
use meshroute_routing::{Adjacency, RouteQuery, Topology};
use tracing::{trace, warn};

use crate::stats::NodeStats;

/// What became of the packet a node just processed
#[derive(Debug)]
pub(crate) enum Outcome {
    /// Delivered here or handed to the next hop
    Done,
    /// Send failed but a new route exists; keep it at the head
    Retry(Packet),
    /// No route left
    Dropped,
}

/// A routing node
#[derive(Debug)]
pub struct Node {
    id: NodeId,
    alive: bool,
    /// Statically adjacent nodes, in description order
    links: Vec<NodeId>,
    topology: Topology,
    buffer: VecDeque<Packet>,
    /// Links known bad, per flow
    failed: BTreeMap<PacketId, BTreeSet<Link>>,
    received_this_tick: bool,
    stepped_this_tick: bool,
    next_sequence: u64,
    tick: u64,
    stats: NodeStats,
    emitter: Emitter,
}

impl Node {
    pub fn new(id: NodeId, links: Vec<NodeId>, emitter: Emitter) -> Self {
        Self {
            id,
            alive: true,
            links,
            topology: Topology::default(),
            buffer: VecDeque::new(),
            failed: BTreeMap::new(),
            received_this_tick: false,
            stepped_this_tick: false,
            next_sequence: 0,
            tick: 0,
            stats: NodeStats::default(),
            emitter,
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn set_alive(&mut self, alive: bool) {
        self.alive = alive;
    }

    pub fn links(&self) -> &[NodeId] {
        &self.links
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn buffer(&self) -> &VecDeque<Packet> {
        &self.buffer
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn stats(&self) -> &NodeStats {
        &self.stats
    }

    /// Links this node knows to be bad for `flow`
    pub fn failed_links_for(&self, flow: &PacketId) -> Option<&BTreeSet<Link>> {
        self.failed.get(flow)
    }

    /// Number of flows this node still holds failure memory for
    pub fn remembered_flows(&self) -> usize {
        self.failed.len()
    }

    pub fn received_this_tick(&self) -> bool {
        self.received_this_tick
    }

    /// Enumerate every simple path from this node
    pub fn generate_topology(&mut self, adjacency: &Adjacency) {
        self.topology = Topology::enumerate(&self.id, adjacency);
        self.emitter.emit(MeshEvent::TopologyGenerated {
            node: self.id.clone(),
            paths: self.topology.len(),
            tick: self.tick,
        });
    }

    /// Shortest topology path to `destination` avoiding `failed`
    pub fn find_route(&self, destination: &NodeId, failed: &BTreeSet<Link>) -> Option<Path> {
        self.topology.find_route(RouteQuery::fresh(destination, failed))
    }

    /// Route for a packet this node holds, avoiding its flow's failed links
    /// and preferring nodes it has not traversed yet
    pub fn find_route_for(&self, packet: &Packet) -> Option<Path> {
        let none = BTreeSet::new();
        let failed = self.failed.get(packet.id()).unwrap_or(&none);
        self.topology.find_route(RouteQuery {
            destination: packet.destination(),
            failed,
            traversed: packet.path.nodes(),
        })
    }

    /// Create a packet with this node as source and queue it locally
    pub fn generate_packet(
        &mut self,
        kind: PacketKind,
        destination: NodeId,
        data: Option<String>,
    ) -> MeshResult<PacketId> {
        if !self.alive {
            return Err(MeshError::NodeDown(self.id.clone()));
        }
        let routing = self
            .find_route(&destination, &BTreeSet::new())
            .ok_or_else(|| MeshError::UnreachableDestination {
                from: self.id.clone(),
                to: destination.clone(),
            })?;

        let id = self.next_packet_id();
        let packet = Packet::new(id.clone(), kind, destination, data, routing);
        self.enqueue_created(packet);
        // Eligible on this very tick
        self.received_this_tick = false;
        Ok(id)
    }

    /// Accept a packet from a peer (or from self)
    ///
    /// A dead node hands the packet back.
    pub fn receive_packet(&mut self, mut packet: Packet) -> Result<(), Packet> {
        if !self.alive {
            trace!(node = %self.id, packet = %packet.id(), "Receive refused, node down");
            return Err(packet);
        }
        packet.record_hop(self.id.clone());
        self.buffer.push_back(packet);
        self.received_this_tick = true;
        Ok(())
    }

    /// Try to send the buffer head to `target`
    ///
    /// On failure the packet goes back to the head of the buffer.
    pub fn transmit_packet(&mut self, target: &NodeId, medium: &mut dyn Medium) -> bool {
        let Some(packet) = self.buffer.pop_front() else {
            return false;
        };
        match self.transmit(target, packet, medium) {
            Ok(()) => true,
            Err(packet) => {
                self.buffer.push_front(packet);
                false
            }
        }
    }

    /// Try to hand `packet` to `target` over the medium
    ///
    /// Dead link, dead peer and rejected delivery all look the same from
    /// here: the packet comes back.
    pub fn transmit(
        &mut self,
        target: &NodeId,
        packet: Packet,
        medium: &mut dyn Medium,
    ) -> Result<(), Packet> {
        if target == &self.id {
            return self.receive_packet(packet);
        }

        if !self.links.contains(target) {
            warn!(node = %self.id, target = %target, "Routing names a node that is not a neighbour");
            self.stats.errors += 1;
            return Err(packet);
        }

        let packet_id = packet.id().clone();
        let sent = if medium.link_up(&self.id, target) {
            medium.deliver(target, packet)
        } else {
            Err(packet)
        };

        match sent {
            Ok(()) => {
                self.emitter.emit(MeshEvent::PacketTransmitted {
                    packet_id,
                    from: self.id.clone(),
                    to: target.clone(),
                    tick: self.tick,
                });
                Ok(())
            }
            Err(packet) => {
                self.stats.errors += 1;
                Err(packet)
            }
        }
    }

    /// Take one step
    ///
    /// Returns `false` only for a dead node holding packets. A node that is
    /// empty, already received this tick or already stepped this tick does
    /// nothing and reports idle.
    pub fn run(&mut self, medium: &mut dyn Medium) -> bool {
        if self.buffer.is_empty() {
            return true;
        }
        if !self.alive {
            return false;
        }
        if self.received_this_tick || self.stepped_this_tick {
            return true;
        }
        self.stepped_this_tick = true;

        let Some(packet) = self.buffer.pop_front() else {
            return true;
        };
        if !packet.failed_links.is_empty() {
            self.failed
                .entry(packet.id().clone())
                .or_default()
                .extend(packet.failed_links.iter().cloned());
        }

        match self.process_packet(packet, medium) {
            Outcome::Retry(packet) => self.buffer.push_front(packet),
            Outcome::Done | Outcome::Dropped => {}
        }
        true
    }

    pub(crate) fn process_packet(&mut self, packet: Packet, medium: &mut dyn Medium) -> Outcome {
        if packet.destination() != &self.id {
            return self.send_packet(packet, medium);
        }

        match packet.kind() {
            PacketKind::Data => {
                self.stats.hops.push(packet.hops());
                self.emitter.emit(MeshEvent::PacketDelivered {
                    packet_id: packet.id().clone(),
                    at: self.id.clone(),
                    hops: packet.hops(),
                    tick: self.tick,
                });
                self.forget(packet.id());

                let id = self.next_packet_id();
                self.enqueue_created(Packet::ack_for(id, &packet));
            }
            PacketKind::Ack => {
                self.stats.round_trips += 1;
                self.emitter.emit(MeshEvent::AckReceived {
                    packet_id: packet.id().clone(),
                    at: self.id.clone(),
                    tick: self.tick,
                });
                if let Some(acknowledged) = packet.acknowledges() {
                    self.forget(acknowledged);
                }
                self.forget(packet.id());
            }
        }
        Outcome::Done
    }

    pub(crate) fn send_packet(&mut self, mut packet: Packet, medium: &mut dyn Medium) -> Outcome {
        let next_hop = match packet.routing.next_hop_after(&self.id).cloned() {
            Some(next) => next,
            None => match self.reroute(&mut packet) {
                Some(next) => next,
                None => return self.drop_packet(packet),
            },
        };

        let flow = packet.id().clone();
        let acknowledged = packet.acknowledges().cloned();

        match self.transmit(&next_hop, packet, medium) {
            Ok(()) => {
                // Known failures travel on with the packet
                self.forget(&flow);
                if let Some(acknowledged) = acknowledged {
                    self.forget(&acknowledged);
                }
                Outcome::Done
            }
            Err(mut packet) => {
                let link = Link::between(&self.id, &next_hop);
                self.failed.entry(flow.clone()).or_default().insert(link.clone());
                packet.failed_links.insert(link.clone());
                self.emitter.emit(MeshEvent::LinkFailed {
                    packet_id: flow,
                    link,
                    tick: self.tick,
                });

                match self.reroute(&mut packet) {
                    Some(_) => Outcome::Retry(packet),
                    None => self.drop_packet(packet),
                }
            }
        }
    }

    /// Replace the packet's routing, returning the new next hop
    fn reroute(&mut self, packet: &mut Packet) -> Option<NodeId> {
        let route = self.find_route_for(packet)?;
        let next = route.next_hop_after(&self.id).cloned()?;
        self.emitter.emit(MeshEvent::RouteFound {
            packet_id: packet.id().clone(),
            at: self.id.clone(),
            route: route.clone(),
            tick: self.tick,
        });
        packet.routing = route;
        Some(next)
    }

    fn drop_packet(&mut self, packet: Packet) -> Outcome {
        self.stats.unreached += 1;
        self.emitter.emit(MeshEvent::PacketDropped {
            packet_id: packet.id().clone(),
            at: self.id.clone(),
            reason: DropReason::NoRoute,
            tick: self.tick,
        });
        self.forget(packet.id());
        Outcome::Dropped
    }

    fn enqueue_created(&mut self, mut packet: Packet) {
        packet.record_hop(self.id.clone());
        self.stats.packets_created += 1;
        self.emitter.emit(MeshEvent::PacketCreated {
            packet_id: packet.id().clone(),
            kind: packet.kind(),
            destination: packet.destination().clone(),
            route: packet.routing.clone(),
            tick: self.tick,
        });
        self.buffer.push_back(packet);
    }

    fn forget(&mut self, flow: &PacketId) {
        self.failed.remove(flow);
    }

    fn next_packet_id(&mut self) -> PacketId {
        let id = PacketId::new(self.id.clone(), self.next_sequence);
        self.next_sequence += 1;
        id
    }

    pub(crate) fn begin_tick(&mut self, tick: u64) {
        self.tick = tick;
    }

    pub(crate) fn end_tick(&mut self) {
        self.received_this_tick = false;
        self.stepped_this_tick = false;
    }

    pub fn describe_buffer(&self) -> String {
        if self.buffer.is_empty() {
            return format!("Node {}: buffer empty", self.id);
        }
        let mut output = format!("Node {} buffer:", self.id);
        for (index, packet) in self.buffer.iter().enumerate() {
            output.push_str(&format!("\n    {}-{}", index, packet));
        }
        output
    }

    pub fn describe_links(&self) -> String {
        if self.links.is_empty() {
            return format!("Node {}: links empty", self.id);
        }
        let mut output = format!("Node {} links:", self.id);
        for link in &self.links {
            output.push_str(&format!("\n    {}", link));
        }
        output
    }

    pub fn describe_topology(&self) -> String {
        if self.topology.is_empty() {
            return format!("Node {}: topology empty", self.id);
        }
        let mut output = format!("Node {} topology:", self.id);
        for path in self.topology.paths() {
            output.push_str(&format!("\n    {}", path));
        }
        output.push_str(&format!("\nTotal: {}", self.topology.len()));
        output
    }
}
