//! Sharded connection pool
//!
//! The pool owns the node table and, per node, a stack of idle connections
//! and a set of checked-out ones:
//!
//! ```text
//!   acquire("SET", ["user:42", ...])
//!        │
//!        ▼  node_index(crc32("user:42"))
//!   ┌──────────┬──────────┬──────────┐
//!   │ node 0   │ node 1   │ node 2   │
//!   │ idle: [] │ idle: [c]│ idle: [] │ ◄── pop most recent idle,
//!   │ busy: {} │ busy: {} │ busy: {} │     else open a new one
//!   └──────────┴──────────┴──────────┘     (bounded by max_connections)
//! ```

mod connection;
mod node;
mod shard_pool;
mod stats;

pub use connection::{Connection, ConnectionFactory, ConnectionId, PooledConnection};
pub use node::Node;
pub use shard_pool::ShardPool;
pub use stats::{NodeStats, PoolStats};
