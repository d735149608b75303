//! Pool statistics types

use serde::Serialize;

/// Point-in-time view of a [`ShardPool`](super::ShardPool).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Connections ever created, all nodes combined
    pub created: usize,
    /// Creation cap
    pub max_connections: usize,
    /// Per-node collection sizes, in node order
    pub nodes: Vec<NodeStats>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeStats {
    pub name: String,
    /// Idle connections ready for reuse
    pub available: usize,
    /// Connections checked out to callers
    pub in_use: usize,
}

impl PoolStats {
    pub fn node(&self, name: &str) -> Option<&NodeStats> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn total_available(&self) -> usize {
        self.nodes.iter().map(|n| n.available).sum()
    }

    pub fn total_in_use(&self) -> usize {
        self.nodes.iter().map(|n| n.in_use).sum()
    }
}
