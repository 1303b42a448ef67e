//! Built-in mesh descriptions

use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

use meshroute_core::{EventSink, MeshDescription, MeshError, MeshResult, NodeId};

use crate::config::MeshConfig;
use crate::mesh::Mesh;

const ASSIGNMENT: &str = r#"{
    "0": ["1", "3"],
    "1": ["0", "2", "4"],
    "2": ["1"],
    "3": ["0", "4", "6"],
    "4": ["1", "3", "5", "7"],
    "5": ["4", "8", "9"],
    "6": ["3"],
    "7": ["4", "8"],
    "8": ["5", "7"],
    "9": ["5", "10"],
    "10": ["9", "11", "13"],
    "11": ["10", "12", "13", "14", "15"],
    "12": ["11", "15"],
    "13": ["10", "11", "14"],
    "14": ["11", "13", "15"],
    "15": ["11", "12", "14"]
}"#;

/// The assignment mesh cut off at node 9
const ABRIDGED: &str = r#"{
    "0": ["1", "3"],
    "1": ["0", "2", "4"],
    "2": ["1"],
    "3": ["0", "4", "6"],
    "4": ["1", "3", "5", "7"],
    "5": ["4", "8"],
    "6": ["3"],
    "7": ["4", "8"],
    "8": ["5", "7"]
}"#;

/// Traffic runs from 0 and 1 to 11 and back
const THROUGHPUT: &str = r#"{
    "0": ["2", "3"],
    "1": ["3", "4"],
    "2": ["0", "3", "5"],
    "3": ["0", "1", "2", "4", "6"],
    "4": ["1", "3", "7"],
    "5": ["2", "6", "8"],
    "6": ["3", "5", "7", "9"],
    "7": ["4", "6", "10"],
    "8": ["5", "9", "11"],
    "9": ["6", "8", "10"],
    "10": ["7", "9", "11"],
    "11": ["8", "9", "10"]
}"#;

/// One of the three built-in meshes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshPreset {
    Assignment,
    Abridged,
    Throughput,
}

impl MeshPreset {
    pub const ALL: [MeshPreset; 3] = [
        MeshPreset::Assignment,
        MeshPreset::Abridged,
        MeshPreset::Throughput,
    ];

    /// Preset by its menu number, 1 to 3
    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(MeshPreset::Assignment),
            2 => Some(MeshPreset::Abridged),
            3 => Some(MeshPreset::Throughput),
            _ => None,
        }
    }

    pub fn json(&self) -> &'static str {
        match self {
            MeshPreset::Assignment => ASSIGNMENT,
            MeshPreset::Abridged => ABRIDGED,
            MeshPreset::Throughput => THROUGHPUT,
        }
    }

    /// Default destination for throughput simulations
    pub fn target(&self) -> NodeId {
        match self {
            MeshPreset::Assignment => NodeId::from("12"),
            MeshPreset::Abridged => NodeId::from("8"),
            MeshPreset::Throughput => NodeId::from("11"),
        }
    }

    pub fn description(&self) -> MeshResult<MeshDescription> {
        MeshDescription::from_json(self.json())
    }

    /// Build the preset mesh with its topology already generated
    pub fn build(&self, config: MeshConfig, sink: Arc<dyn EventSink>) -> MeshResult<Mesh> {
        let mut mesh = Mesh::from_json(self.json(), config, sink)?;
        mesh.generate_topology();
        Ok(mesh)
    }
}

impl Display for MeshPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeshPreset::Assignment => write!(f, "Project Assignment Mesh"),
            MeshPreset::Abridged => write!(f, "Abridged Project Assignment Mesh"),
            MeshPreset::Throughput => write!(f, "Throughput Test Mesh"),
        }
    }
}

impl FromStr for MeshPreset {
    type Err = MeshError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "1" | "assignment" => Ok(MeshPreset::Assignment),
            "2" | "abridged" => Ok(MeshPreset::Abridged),
            "3" | "throughput" => Ok(MeshPreset::Throughput),
            other => Err(MeshError::InvalidDescription(format!(
                "unknown preset '{}', expected 1-3",
                other
            ))),
        }
    }
}
