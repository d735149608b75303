//! Common utilities and types shared across shardis

pub mod config;
pub mod error;
pub mod hash;
pub mod metrics;

pub use config::{node_name, NodeConfig, PoolConfig, ShardConfig, DEFAULT_MAX_CONNECTIONS};
pub use error::{Error, Result};
pub use hash::{crc32, node_index};
pub use metrics::{ClientMetrics, Counter, MetricsSnapshot};
