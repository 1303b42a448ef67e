//! Throughput simulation
//!
//! Floods a mesh from its first two nodes toward a single target and runs it
//! until every buffer drains or the tick limit is hit.

use std::collections::BTreeSet;
use std::fmt::Display;

use meshroute_core::{NodeId, PacketKind};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::FailureKind;
use crate::mesh::Mesh;
use crate::presets::MeshPreset;
use crate::stats::MeshStats;

/// Ticks after which a simulation gives up waiting for buffers to drain
pub const DEFAULT_MAX_TICKS: u64 = 5000;

/// Parameters of one throughput run
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    /// Destination of every generated packet
    pub target: NodeId,
    /// Packets generated at each source, one per tick
    pub packets: usize,
    /// Percent chance per tick of a random node toggle
    pub node_fail: u8,
    /// Percent chance per tick of a random link toggle
    pub link_fail: u8,
    /// Keep the sources and the target out of random failures
    pub protect_endpoints: bool,
    pub max_ticks: u64,
}

impl SimulationPlan {
    pub fn new(target: NodeId, packets: usize) -> Self {
        Self {
            target,
            packets,
            node_fail: 0,
            link_fail: 0,
            protect_endpoints: true,
            max_ticks: DEFAULT_MAX_TICKS,
        }
    }

    /// Plan aimed at the preset's default target
    pub fn for_preset(preset: MeshPreset, packets: usize) -> Self {
        Self::new(preset.target(), packets)
    }

    pub fn with_failures(mut self, node_fail: u8, link_fail: u8) -> Self {
        self.node_fail = node_fail;
        self.link_fail = link_fail;
        self
    }

    pub fn with_protected_endpoints(mut self, protect: bool) -> Self {
        self.protect_endpoints = protect;
        self
    }
}

/// Outcome of a throughput run
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub sources: Vec<NodeId>,
    pub target: NodeId,
    /// Nodes spared from random failures
    pub protected: Vec<NodeId>,
    /// Packets the sources managed to create
    pub generated: u64,
    /// Packets refused at creation because the target was unreachable
    pub refused: u64,
    pub timed_out: bool,
    pub stats: MeshStats,
}

impl Display for SimulationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sources: Vec<&str> = self.sources.iter().map(NodeId::as_str).collect();
        writeln!(f, "Simulation {} -> {}", sources.join(", "), self.target)?;
        if self.protected.is_empty() {
            writeln!(f, "Protected from failures: none")?;
        } else {
            let protected: Vec<&str> = self.protected.iter().map(NodeId::as_str).collect();
            writeln!(f, "Protected from failures: {}", protected.join(", "))?;
        }
        writeln!(f, "Packets generated: {}", self.generated)?;
        writeln!(f, "Packets refused: {}", self.refused)?;
        if self.timed_out {
            writeln!(f, "TIMEOUT!")?;
        }
        write!(f, "{}", self.stats)
    }
}

/// Run a throughput simulation on `mesh`
///
/// Restores the mesh first, then applies the plan's failure chances. Unless
/// the plan says otherwise, the two sources and the target are never failed
/// at random. Each tick, while the quota lasts, both sources create one DATA
/// packet for the target.
pub fn simulate(mesh: &mut Mesh, plan: &SimulationPlan) -> SimulationReport {
    mesh.restore();
    mesh.set_fail_chance(FailureKind::Node, plan.node_fail);
    mesh.set_fail_chance(FailureKind::Link, plan.link_fail);

    let sources: Vec<NodeId> = mesh.node_ids().take(2).cloned().collect();
    let mut protected = BTreeSet::new();
    if plan.protect_endpoints {
        protected.extend(sources.iter().cloned());
        protected.insert(plan.target.clone());
    }
    mesh.set_never_fail(protected.clone());

    info!(
        sources = ?sources,
        target = %plan.target,
        packets = plan.packets,
        node_fail = plan.node_fail,
        link_fail = plan.link_fail,
        protect_endpoints = plan.protect_endpoints,
        "Starting simulation"
    );

    let start = mesh.tick();
    let mut generated = 0;
    let mut refused = 0;
    let mut round = 0;
    let timed_out = loop {
        if round < plan.packets {
            for source in &sources {
                match mesh.generate_packet(source, PacketKind::Data, &plan.target, None) {
                    Ok(_) => generated += 1,
                    Err(e) => {
                        warn!(source = %source, error = %e, "Packet refused");
                        refused += 1;
                    }
                }
            }
            round += 1;
        } else if mesh.is_idle() {
            break false;
        }

        if mesh.tick() - start >= plan.max_ticks {
            break true;
        }
        mesh.run();
    };

    if timed_out {
        warn!(ticks = plan.max_ticks, "Simulation timed out");
    }

    SimulationReport {
        sources,
        target: plan.target.clone(),
        protected: protected.into_iter().collect(),
        generated,
        refused,
        timed_out,
        stats: mesh.stats(),
    }
}
