//! Packet types for hop-by-hop delivery

use std::collections::BTreeSet;
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MeshError;
use crate::identity::{Link, NodeId};
use crate::path::Path;

/// Unique identifier for a packet
///
/// Also names the delivery attempt ("flow") the packet belongs to: failure
/// memory at each node is keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PacketId {
    /// Node that created the packet
    pub source: NodeId,
    /// Sequence number from the source
    pub sequence: u64,
}

impl PacketId {
    pub fn new(source: NodeId, sequence: u64) -> Self {
        Self { source, sequence }
    }
}

impl Display for PacketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.source, self.sequence)
    }
}

/// Packet type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacketKind {
    /// Application payload travelling to `destination`
    Data,
    /// Acknowledgement travelling back to the DATA packet's source
    Ack,
}

impl Display for PacketKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PacketKind::Data => write!(f, "data"),
            PacketKind::Ack => write!(f, "ACK"),
        }
    }
}

impl FromStr for PacketKind {
    type Err = MeshError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "data" => Ok(PacketKind::Data),
            "ack" => Ok(PacketKind::Ack),
            other => Err(MeshError::InvalidDescription(format!(
                "unknown packet kind '{}', expected data or ack",
                other
            ))),
        }
    }
}

/// A packet in flight
///
/// Identity fields are fixed at creation. `routing`, `path` and
/// `failed_links` belong to whichever node currently holds the packet in its
/// buffer and are rewritten only by that node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    id: PacketId,
    kind: PacketKind,
    source: NodeId,
    destination: NodeId,
    data: Option<String>,
    /// DATA packet this ACK confirms
    acknowledges: Option<PacketId>,
    /// Full route chosen for the current attempt
    pub routing: Path,
    /// Nodes already traversed, loop-free
    pub path: Path,
    /// Links found dead while carrying this packet
    pub failed_links: BTreeSet<Link>,
}

impl Packet {
    /// Create a DATA packet
    pub fn data(id: PacketId, destination: NodeId, data: Option<String>, routing: Path) -> Self {
        Self {
            source: id.source.clone(),
            id,
            kind: PacketKind::Data,
            destination,
            data,
            acknowledges: None,
            routing,
            path: Path::default(),
            failed_links: BTreeSet::new(),
        }
    }

    /// Create an ACK for `original`, routed back along its traversed path
    pub fn ack_for(id: PacketId, original: &Packet) -> Self {
        Self {
            source: id.source.clone(),
            id,
            kind: PacketKind::Ack,
            destination: original.source.clone(),
            data: None,
            acknowledges: Some(original.id.clone()),
            routing: original.path.reversed(),
            path: Path::default(),
            failed_links: BTreeSet::new(),
        }
    }

    /// Create a packet of either kind with an explicit route
    pub fn new(
        id: PacketId,
        kind: PacketKind,
        destination: NodeId,
        data: Option<String>,
        routing: Path,
    ) -> Self {
        let mut packet = Self::data(id, destination, data, routing);
        packet.kind = kind;
        packet
    }

    pub fn id(&self) -> &PacketId {
        &self.id
    }

    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    pub fn source(&self) -> &NodeId {
        &self.source
    }

    pub fn destination(&self) -> &NodeId {
        &self.destination
    }

    pub fn payload(&self) -> Option<&str> {
        self.data.as_deref()
    }

    pub fn acknowledges(&self) -> Option<&PacketId> {
        self.acknowledges.as_ref()
    }

    pub fn is_ack(&self) -> bool {
        self.kind == PacketKind::Ack
    }

    /// Record that `node` now holds the packet
    pub fn record_hop(&mut self, node: NodeId) {
        self.path.visit(node);
    }

    /// Number of links crossed on the successful forward path so far
    pub fn hops(&self) -> usize {
        self.path.hops()
    }
}

impl Display for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}: {} -> {}, data: {}, routing: {}, path: {}",
            self.kind,
            self.id,
            self.source,
            self.destination,
            self.data.as_deref().unwrap_or("None"),
            self.routing,
            self.path
        )
    }
}
