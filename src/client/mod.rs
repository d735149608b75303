//! Command execution on top of the shard pool
//!
//! [`ShardClient`] routes each [`Command`] by its first key, runs it on a
//! pooled connection and hands the connection back. [`RedisConnection`] is
//! the stock single-node transport.

mod command;
mod executor;
mod redis_conn;

pub use command::Command;
pub use executor::ShardClient;
pub use redis_conn::{RedisConnection, RedisConnectionFactory};

/// Client over real Redis nodes
pub type RedisShardClient = ShardClient<RedisConnectionFactory>;
