//! Simulation configuration

use std::collections::BTreeSet;
use std::fmt::Display;
use std::str::FromStr;

use meshroute_core::{MeshError, NodeId};

/// What a random failure hits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Node,
    Link,
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Node => write!(f, "node"),
            FailureKind::Link => write!(f, "link"),
        }
    }
}

impl FromStr for FailureKind {
    type Err = MeshError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "node" => Ok(FailureKind::Node),
            "link" => Ok(FailureKind::Link),
            other => Err(MeshError::InvalidDescription(format!(
                "unknown failure kind '{}', expected node or link",
                other
            ))),
        }
    }
}

/// Configuration for a mesh
#[derive(Debug, Clone, Default)]
pub struct MeshConfig {
    /// Narrate mesh events at info level instead of debug
    pub verbose: bool,
    /// Percent chance per tick that a random node toggles
    pub node_fail_chance: u8,
    /// Percent chance per tick that a random link toggles
    pub link_fail_chance: u8,
    /// RNG seed for random failures (None = from entropy)
    pub seed: Option<u64>,
    /// Nodes random failures never touch
    pub never_fail: BTreeSet<NodeId>,
}

impl MeshConfig {
    /// Quiet, failure-free configuration
    pub fn quiet() -> Self {
        Self::default()
    }

    /// Configuration that narrates every event
    pub fn verbose() -> Self {
        Self {
            verbose: true,
            ..Self::default()
        }
    }

    pub fn fail_chance(&self, kind: FailureKind) -> u8 {
        match kind {
            FailureKind::Node => self.node_fail_chance,
            FailureKind::Link => self.link_fail_chance,
        }
    }

    /// Set a failure chance, clamped to 0..=100
    pub fn set_fail_chance(&mut self, kind: FailureKind, chance: u8) {
        let chance = chance.min(100);
        match kind {
            FailureKind::Node => self.node_fail_chance = chance,
            FailureKind::Link => self.link_fail_chance = chance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_chance_is_clamped() {
        let mut config = MeshConfig::quiet();
        config.set_fail_chance(FailureKind::Link, 250);
        assert_eq!(config.fail_chance(FailureKind::Link), 100);
        assert_eq!(config.fail_chance(FailureKind::Node), 0);
    }

    #[test]
    fn test_failure_kind_parse() {
        assert_eq!("NODE".parse::<FailureKind>().unwrap(), FailureKind::Node);
        assert_eq!("link".parse::<FailureKind>().unwrap(), FailureKind::Link);
        assert!("both".parse::<FailureKind>().is_err());
    }
}
