//! Backend node table entries

use crate::common::NodeConfig;
use serde::Serialize;

/// One configured backend, fixed for the lifetime of its pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    /// `host:port`, the key of the node's connection collections
    pub name: String,
    /// Address handed to the connection factory
    pub address: NodeConfig,
}

impl Node {
    pub fn new(address: NodeConfig) -> Self {
        Self {
            name: address.name(),
            address,
        }
    }
}
