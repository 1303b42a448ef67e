//! Mesh events and event sinks
//!
//! Everything observable that happens in the mesh is emitted as a tagged
//! [`MeshEvent`]. Events are narrated through `tracing` by an [`Emitter`]
//! and then recorded by the [`EventSink`] injected when the mesh is built.
//! Narration never feeds back into the simulation.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::identity::{Link, NodeId};
use crate::packet::{PacketId, PacketKind};
use crate::path::Path;

/// Events that occur in the mesh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MeshEvent {
    /// A node created a packet and resolved its first route
    PacketCreated {
        packet_id: PacketId,
        kind: PacketKind,
        destination: NodeId,
        route: Path,
        tick: u64,
    },
    /// A node computed a replacement route for a packet it holds
    RouteFound {
        packet_id: PacketId,
        at: NodeId,
        route: Path,
        tick: u64,
    },
    /// A packet crossed a link into the peer's buffer
    PacketTransmitted {
        packet_id: PacketId,
        from: NodeId,
        to: NodeId,
        tick: u64,
    },
    /// A send attempt over `link` timed out
    LinkFailed {
        packet_id: PacketId,
        link: Link,
        tick: u64,
    },
    /// A packet ran out of routes and was discarded
    PacketDropped {
        packet_id: PacketId,
        at: NodeId,
        reason: DropReason,
        tick: u64,
    },
    /// A DATA packet reached its destination
    PacketDelivered {
        packet_id: PacketId,
        at: NodeId,
        hops: usize,
        tick: u64,
    },
    /// An acknowledgement returned to the DATA packet's source
    AckReceived {
        packet_id: PacketId,
        at: NodeId,
        tick: u64,
    },
    LinkToggled {
        link: Link,
        alive: bool,
        tick: u64,
    },
    NodeToggled {
        node: NodeId,
        alive: bool,
        tick: u64,
    },
    TopologyGenerated {
        node: NodeId,
        paths: usize,
        tick: u64,
    },
    /// Every link and node was brought back up
    Restored {
        tick: u64,
    },
}

impl MeshEvent {
    /// Short upper-case tag for the event kind
    pub fn tag(&self) -> &'static str {
        match self {
            MeshEvent::PacketCreated { .. } => "PACKET_CREATED",
            MeshEvent::RouteFound { .. } => "ROUTE_FOUND",
            MeshEvent::PacketTransmitted { .. } => "PACKET_TRANSMITTED",
            MeshEvent::LinkFailed { .. } => "LINK_FAILED",
            MeshEvent::PacketDropped { .. } => "PACKET_DROPPED",
            MeshEvent::PacketDelivered { .. } => "PACKET_DELIVERED",
            MeshEvent::AckReceived { .. } => "ACK_RECEIVED",
            MeshEvent::LinkToggled { .. } => "LINK_TOGGLED",
            MeshEvent::NodeToggled { .. } => "NODE_TOGGLED",
            MeshEvent::TopologyGenerated { .. } => "TOPOLOGY_GENERATED",
            MeshEvent::Restored { .. } => "RESTORED",
        }
    }

    /// Tick the event happened on
    pub fn tick(&self) -> u64 {
        match self {
            MeshEvent::PacketCreated { tick, .. }
            | MeshEvent::RouteFound { tick, .. }
            | MeshEvent::PacketTransmitted { tick, .. }
            | MeshEvent::LinkFailed { tick, .. }
            | MeshEvent::PacketDropped { tick, .. }
            | MeshEvent::PacketDelivered { tick, .. }
            | MeshEvent::AckReceived { tick, .. }
            | MeshEvent::LinkToggled { tick, .. }
            | MeshEvent::NodeToggled { tick, .. }
            | MeshEvent::TopologyGenerated { tick, .. }
            | MeshEvent::Restored { tick } => *tick,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropReason {
    /// Every known route crosses a failed link
    NoRoute,
}

/// Destination for mesh events
pub trait EventSink: Send + Sync + Debug {
    fn record(&self, event: &MeshEvent);
}

/// Sink that keeps nothing; events are only narrated
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&self, _event: &MeshEvent) {}
}

/// Append-only in-memory event log
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<MeshEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every recorded event
    pub fn events(&self) -> Vec<MeshEvent> {
        self.events.lock().clone()
    }

    /// Events recorded on `tick`
    pub fn events_at(&self, tick: u64) -> Vec<MeshEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.tick() == tick)
            .cloned()
            .collect()
    }

    /// Remove and return every recorded event
    pub fn drain(&self) -> Vec<MeshEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Count events carrying `tag`
    pub fn count(&self, tag: &str) -> usize {
        self.events.lock().iter().filter(|e| e.tag() == tag).count()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for EventLog {
    fn record(&self, event: &MeshEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Narrates events and forwards them to the injected sink
///
/// Cheap to clone; every node of a mesh holds one. The verbosity flag is
/// shared, so flipping it on the mesh affects all clones.
#[derive(Debug, Clone)]
pub struct Emitter {
    sink: Arc<dyn EventSink>,
    verbose: Arc<AtomicBool>,
}

impl Emitter {
    pub fn new(sink: Arc<dyn EventSink>, verbose: bool) -> Self {
        Self {
            sink,
            verbose: Arc::new(AtomicBool::new(verbose)),
        }
    }

    pub fn set_verbose(&self, verbose: bool) {
        self.verbose.store(verbose, Ordering::Relaxed);
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose.load(Ordering::Relaxed)
    }

    pub fn emit(&self, event: MeshEvent) {
        if self.is_verbose() {
            info!(tag = event.tag(), tick = event.tick(), "{:?}", event);
        } else {
            debug!(tag = event.tag(), tick = event.tick(), "{:?}", event);
        }
        self.sink.record(&event);
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new(Arc::new(NullSink), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn restored(tick: u64) -> MeshEvent {
        MeshEvent::Restored { tick }
    }

    #[test]
    fn test_event_log_records_through_emitter() {
        let log = Arc::new(EventLog::new());
        let emitter = Emitter::new(log.clone(), false);

        emitter.emit(restored(1));
        emitter.emit(restored(2));
        emitter.emit(restored(2));

        assert_eq!(log.len(), 3);
        assert_eq!(log.events_at(2).len(), 2);
        assert_eq!(log.count("RESTORED"), 3);
    }

    #[test]
    fn test_drain_empties_log() {
        let log = EventLog::new();
        log.record(&restored(0));
        assert_eq!(log.drain().len(), 1);
        assert!(log.is_empty());
    }

    #[test]
    fn test_verbosity_is_shared_between_clones() {
        let emitter = Emitter::default();
        let clone = emitter.clone();
        emitter.set_verbose(true);
        assert!(clone.is_verbose());
    }

    #[test]
    fn test_tags() {
        let event = MeshEvent::LinkFailed {
            packet_id: PacketId::new(NodeId::from("A"), 0),
            link: Link::new(NodeId::from("B"), NodeId::from("C")),
            tick: 4,
        };
        assert_eq!(event.tag(), "LINK_FAILED");
        assert_eq!(event.tick(), 4);
    }
}
