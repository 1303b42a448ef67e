//! # meshroute core
//!
//! Core types, events, and errors shared by the meshroute routing simulator.
//!
//! The simulator models a mesh of unreliable nodes exchanging packets one
//! tick at a time. This crate holds the vocabulary every other crate speaks:
//!
//! - [`NodeId`] and [`Link`]: node identity and canonical undirected links
//! - [`Path`]: loop-free node sequences used as routes and traversal records
//! - [`Packet`]: DATA / ACK envelopes with their route and traversed path
//! - [`MeshEvent`]: tagged structured events, recorded through an [`EventSink`]
//! - [`Medium`]: the seam a node uses to hand packets to its peers
//! - [`MeshError`]: the error taxonomy of the simulator
//! - [`MeshDescription`]: the adjacency description a mesh is built from

pub mod description;
pub mod error;
pub mod event;
pub mod identity;
pub mod packet;
pub mod path;
pub mod traits;

// Re-export main types
pub use description::*;
pub use error::*;
pub use event::*;
pub use identity::*;
pub use packet::*;
pub use path::*;
pub use traits::*;
