//! Cluster member descriptors.

use serde::{Deserialize, Serialize};

/// Role of a cluster node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRole {
    /// Serves recommendation requests.
    Server,
    /// Runs offline recommendation jobs.
    Worker,
}

impl std::fmt::Display for NodeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Server => write!(f, "server"),
            Self::Worker => write!(f, "worker"),
        }
    }
}

/// A cluster member, created on its first heartbeat and evicted when its
/// TTL elapses without a refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub role: NodeRole,
    pub address: String,
}

impl Node {
    pub fn new(name: impl Into<String>, role: NodeRole, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role,
            address: address.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_display() {
        assert_eq!(NodeRole::Server.to_string(), "server");
        assert_eq!(NodeRole::Worker.to_string(), "worker");
    }

    #[test]
    fn node_round_trip() {
        let node = Node::new("worker-1", NodeRole::Worker, "10.0.0.3:8089");
        let json = serde_json::to_string(&node).unwrap();
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(node, back);
    }
}
