//! # meshroute simulation
//!
//! A tick-driven simulator of packet routing over a mesh of unreliable nodes
//! and links.
//!
//! ## Overview
//!
//! Every node precomputes all simple paths to every other node. At send time
//! it picks the shortest one that avoids the links it has seen fail for the
//! packet at hand. A failed send is a timeout: the node records the link,
//! reroutes and tries again next tick. Delivered DATA packets are answered
//! with an ACK that retraces the forward path.
//!
//! ## Architecture
//!
//! - **Node** (`node.rs`): buffer, topology, failure memory, one step per tick
//! - **Mesh** (`mesh.rs`): owns the nodes and link liveness, drives ticks
//! - **Config** (`config.rs`): verbosity, failure chances, RNG seed
//! - **Stats** (`stats.rs`): in-memory delivery metrics
//! - **Presets** (`presets.rs`): the three built-in meshes
//! - **Scenarios** (`scenarios.rs`): throughput simulation
//!
//! ## Example: rerouting around a dead link
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use meshroute_core::{MeshDescription, NodeId, NullSink, PacketKind};
//! use meshroute_simulation::{Mesh, MeshConfig};
//!
//! // A - B - C and A - D - C
//! let description = MeshDescription::from_edges(&[("A", "B"), ("A", "D"), ("B", "C"), ("D", "C")]);
//! let mut mesh = Mesh::from_description(&description, MeshConfig::quiet(), Arc::new(NullSink)).unwrap();
//! mesh.generate_topology();
//!
//! let (a, b, c) = (NodeId::from("A"), NodeId::from("B"), NodeId::from("C"));
//! mesh.toggle_link(&b, &c).unwrap();
//! mesh.generate_packet(&a, PacketKind::Data, &c, None).unwrap();
//!
//! for _ in 0..20 {
//!     mesh.run();
//! }
//!
//! let stats = mesh.stats();
//! assert_eq!(stats.deliveries(), 1);
//! assert_eq!(stats.round_trips, 1);
//! ```

pub mod config;
pub mod mesh;
pub mod node;
pub mod presets;
pub mod scenarios;
pub mod stats;

// Re-export main types
pub use config::{FailureKind, MeshConfig};
pub use mesh::Mesh;
pub use node::Node;
pub use presets::MeshPreset;
pub use scenarios::{DEFAULT_MAX_TICKS, SimulationPlan, SimulationReport, simulate};
pub use stats::{MeshStats, NodeStats};
