//! # meshroute routing
//!
//! Topology enumeration and route selection for the meshroute simulator.
//!
//! ## Core Components
//!
//! - [`Adjacency`]: validated, symmetric static adjacency of a mesh
//! - [`Topology`]: every simple path from one node, enumerated once
//! - [`RouteQuery`]: inputs to [`Topology::find_route`]
//!
//! ## Route Discovery
//!
//! Each node enumerates its topology up front from static adjacency. At
//! send time it picks the fewest-hop path that avoids every link known to
//! have failed during the current delivery attempt. Link liveness is never
//! consulted here: the node learns about dead links only by failing to send
//! over them.
//!
//! ## Example
//!
//! ```rust
//! use std::collections::BTreeSet;
//!
//! use meshroute_core::{MeshDescription, NodeId};
//! use meshroute_routing::{Adjacency, RouteQuery, Topology};
//!
//! let description = MeshDescription::from_edges(&[("A", "B"), ("B", "C")]);
//! let adjacency = Adjacency::from_description(&description).unwrap();
//! let topology = Topology::enumerate(&NodeId::from("A"), &adjacency);
//!
//! let failed = BTreeSet::new();
//! let route = topology
//!     .find_route(RouteQuery::fresh(&NodeId::from("C"), &failed))
//!     .unwrap();
//! assert_eq!(route.to_string(), "[A -> B -> C]");
//! ```

pub mod adjacency;
pub mod router;
pub mod topology;

// Re-export main types
pub use adjacency::Adjacency;
pub use router::RouteQuery;
pub use topology::Topology;
