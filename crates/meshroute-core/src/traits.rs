//! Core traits for meshroute
//!
//! ## Key Traits
//!
//! - [`Medium`]: what a node sees of the rest of the mesh while it steps

use crate::identity::NodeId;
use crate::packet::Packet;

/// The shared medium a node transmits over
///
/// A node owns nothing but itself; while it takes its step the mesh lends
/// it a `Medium` that answers link liveness and performs the handoff into a
/// peer's buffer. Both operations resolve immediately: there is no timer,
/// an unreachable peer is simply a failed handoff.
pub trait Medium {
    /// Whether the link between `from` and `to` is administratively up
    fn link_up(&self, from: &NodeId, to: &NodeId) -> bool;

    /// Hand `packet` to node `to`
    ///
    /// Returns the packet back if the peer is unknown or down.
    fn deliver(&mut self, to: &NodeId, packet: Packet) -> Result<(), Packet>;
}
