//! # shardis
//!
//! Client-side sharding for Redis:
//! - Keys routed to one of N independent nodes by CRC-32
//! - Per-node pools of reusable connections, lazily grown
//! - One global cap on connections ever created
//! - Transparent single retry when a pooled connection turns out dead
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              ShardClient                │
//! │  execute(cmd) → acquire → send/parse    │
//! │            → (retry once) → release     │
//! └───────────┬─────────────────────────────┘
//!             │ routed by first key
//!   ┌─────────┴──────────┬──────────────┐
//!   │                    │              │
//! ┌─▼──────────┐   ┌─────▼──────┐   ┌──▼───────────┐
//! │ node 0     │   │ node 1     │   │ node 2       │
//! │ host:6379  │   │ host:6380  │   │ other:6379   │
//! │ idle/busy  │   │ idle/busy  │   │ idle/busy    │
//! └────────────┘   └────────────┘   └──────────────┘
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use shardis::{NodeConfig, RedisShardClient, ShardConfig};
//!
//! # fn main() -> shardis::Result<()> {
//! let config = ShardConfig::from_nodes(vec![
//!     NodeConfig::new("localhost", 6379),
//!     NodeConfig::new("localhost", 6380),
//! ]);
//! let client = RedisShardClient::connect(&config)?;
//!
//! client.set("whatever", "foobar")?;
//! assert_eq!(client.get("whatever")?, Some(b"foobar".to_vec()));
//! # Ok(())
//! # }
//! ```
//!
//! Changing the node list remaps keys; there is no rebalancing.

pub mod client;
pub mod common;
pub mod pool;

// Re-export commonly used types
pub use client::{Command, RedisShardClient, ShardClient};
pub use common::{Error, NodeConfig, Result, ShardConfig};
pub use pool::ShardPool;

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
