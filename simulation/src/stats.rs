//! Delivery statistics
//!
//! Counters live in memory for the lifetime of a mesh; nothing is persisted.

use std::fmt::Display;

use serde::Serialize;

/// Per-node counters, aggregated into [`MeshStats`] by the mesh
#[derive(Debug, Clone, Default, Serialize)]
pub struct NodeStats {
    /// Hop counts of DATA packets delivered here
    pub hops: Vec<usize>,
    /// Failed transmission attempts
    pub errors: u64,
    /// Packets dropped here for lack of a route
    pub unreached: u64,
    /// Acknowledgements that returned here
    pub round_trips: u64,
    /// Packets created here, ACKs included
    pub packets_created: u64,
}

/// Mesh-wide statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct MeshStats {
    pub ticks: u64,
    pub hops: Vec<usize>,
    /// Average non-empty buffer size, one sample per busy tick
    pub congestion: Vec<f64>,
    pub errors: u64,
    pub unreached: u64,
    pub round_trips: u64,
    pub packets_created: u64,
}

impl MeshStats {
    pub(crate) fn absorb(&mut self, node: &NodeStats) {
        self.hops.extend_from_slice(&node.hops);
        self.errors += node.errors;
        self.unreached += node.unreached;
        self.round_trips += node.round_trips;
        self.packets_created += node.packets_created;
    }

    pub fn deliveries(&self) -> usize {
        self.hops.len()
    }

    pub fn average_hops(&self) -> Option<f64> {
        if self.hops.is_empty() {
            return None;
        }
        Some(self.hops.iter().sum::<usize>() as f64 / self.hops.len() as f64)
    }

    pub fn average_congestion(&self) -> Option<f64> {
        if self.congestion.is_empty() {
            return None;
        }
        Some(self.congestion.iter().sum::<f64>() / self.congestion.len() as f64)
    }
}

impl Display for MeshStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Metrics")?;
        writeln!(f, "-------")?;
        writeln!(f, "Total ticks: {}", self.ticks)?;
        writeln!(f, "Deliveries: {}", self.deliveries())?;
        match self.average_hops() {
            Some(avg) => writeln!(f, "Average hops: {:.2}", avg)?,
            None => writeln!(f, "Average hops: n/a")?,
        }
        match self.average_congestion() {
            Some(avg) => writeln!(f, "Average congestion: {:.2}", avg)?,
            None => writeln!(f, "Average congestion: n/a")?,
        }
        writeln!(f, "Total errors: {}", self.errors)?;
        writeln!(f, "Total packets unable to reach destination: {}", self.unreached)?;
        writeln!(f, "Total received acknowledgements: {}", self.round_trips)?;
        write!(f, "-------")
    }
}
