//! Error types for meshroute
//!
//! Transient transmission failures (dead link, dead peer, rejected
//! delivery) are not errors: they are the `false` a node gets back from a
//! send attempt and they drive rerouting. What remains here is either
//! reported to the operator (an unreachable destination) or, for a malformed
//! description, aborts building the mesh.

use thiserror::Error;

use crate::identity::NodeId;

/// Top-level error type for meshroute
#[derive(Debug, Error)]
pub enum MeshError {
    /// No viable route exists from `from` to `to`
    #[error("No route from node {from} to node {to}")]
    UnreachableDestination { from: NodeId, to: NodeId },

    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// The two nodes are not statically adjacent
    #[error("No link between node {0} and node {1}")]
    UnknownLink(NodeId, NodeId),

    /// Operation requires a live node
    #[error("Node {0} is down")]
    NodeDown(NodeId),

    /// The topology description cannot form a usable mesh
    #[error("Invalid mesh description: {0}")]
    InvalidDescription(String),

    #[error("Mesh description is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for mesh operations
pub type MeshResult<T> = Result<T, MeshError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_display() {
        let e = MeshError::UnreachableDestination {
            from: NodeId::from("0"),
            to: NodeId::from("9"),
        };
        assert_eq!(e.to_string(), "No route from node 0 to node 9");
    }

    #[test]
    fn test_json_error_converts() {
        let parsed: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let e: MeshError = parsed.unwrap_err().into();
        assert!(matches!(e, MeshError::Json(_)));
    }
}
