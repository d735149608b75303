//! Key routing for shardis
//!
//! Keys map to nodes through a CRC-32 checksum folded to 15 bits, which keeps
//! the distribution bit-for-bit compatible with existing deployments of the
//! same scheme. Adding or removing a node reshuffles most keys; there is no
//! consistent hashing here.

/// Calculate CRC32 checksum
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Compute the node index for a key.
///
/// Deterministic for a given `(key, node_count)` and always in
/// `[0, node_count)`. The empty key is valid and routes to node 0.
///
/// # Panics
///
/// Panics if `node_count` is 0. Pools refuse to build with an empty node
/// list, so this is only reachable by calling the router directly.
pub fn node_index(key: &[u8], node_count: usize) -> usize {
    assert!(node_count > 0, "node_index called with zero nodes");
    let folded = (crc32(key) >> 16) & 0x7fff;
    folded as usize % node_count
}
