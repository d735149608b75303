//! Command execution over a shard pool

use std::sync::Arc;

use redis::{FromRedisValue, Value};

use super::command::Command;
use super::redis_conn::RedisConnectionFactory;
use crate::common::{node_name, ClientMetrics, Result, ShardConfig};
use crate::pool::{Connection, ConnectionFactory, PooledConnection, ShardPool};

/// Runs commands against the node owning their key.
///
/// Each command checks a connection out of the pool, and a dead connection
/// gets exactly one reconnect-and-resend on the same connection. The
/// connection always goes back to the pool, whatever the outcome.
pub struct ShardClient<F: ConnectionFactory> {
    pool: Arc<ShardPool<F>>,
    metrics: ClientMetrics,
}

impl<F: ConnectionFactory> ShardClient<F> {
    pub fn new(pool: Arc<ShardPool<F>>) -> Self {
        Self {
            pool,
            metrics: ClientMetrics::new(),
        }
    }

    pub fn pool(&self) -> &Arc<ShardPool<F>> {
        &self.pool
    }

    pub fn metrics(&self) -> &ClientMetrics {
        &self.metrics
    }

    pub fn execute(&self, command: &Command) -> Result<<F::Connection as Connection>::Reply> {
        self.metrics.commands.inc();
        let checkout = Checkout {
            pool: &self.pool,
            conn: self.acquire(command)?,
        };
        let result = self.run(checkout.conn(), command);
        if let Err(e) = &result {
            self.metrics.failures.inc();
            tracing::debug!(command = %command, error = %e, "command failed");
        }
        result
    }

    fn acquire(&self, command: &Command) -> Result<PooledConnection<F::Connection>> {
        self.pool
            .acquire(command.name(), command.args())
            .inspect_err(|_| self.metrics.failures.inc())
    }

    fn run(
        &self,
        pooled: &PooledConnection<F::Connection>,
        command: &Command,
    ) -> Result<<F::Connection as Connection>::Reply> {
        let mut conn = pooled.lock();
        match round_trip(&mut *conn, command) {
            Err(e) if e.is_connection_error() => {
                tracing::warn!(
                    conn = %pooled.id(),
                    node = %node_name(conn.host(), conn.port()),
                    command = command.name(),
                    error = %e,
                    "connection lost, reconnecting once"
                );
                self.metrics.retries.inc();
                if let Err(e) = conn.disconnect() {
                    tracing::debug!(conn = %pooled.id(), error = %e, "error closing dead connection");
                }
                round_trip(&mut *conn, command)
            }
            other => other,
        }
    }
}

fn round_trip<C: Connection>(conn: &mut C, command: &Command) -> Result<C::Reply> {
    conn.send_command(command)?;
    conn.read_response()
}

/// Releases its connection on drop, including while unwinding.
struct Checkout<'a, F: ConnectionFactory> {
    pool: &'a ShardPool<F>,
    conn: PooledConnection<F::Connection>,
}

impl<F: ConnectionFactory> Checkout<'_, F> {
    fn conn(&self) -> &PooledConnection<F::Connection> {
        &self.conn
    }
}

impl<F: ConnectionFactory> Drop for Checkout<'_, F> {
    fn drop(&mut self) {
        if let Err(e) = self.pool.checkin(&self.conn) {
            tracing::error!(conn = %self.conn.id(), error = %e, "failed to release connection");
        }
    }
}

/// Typed helpers for nodes speaking RESP.
impl<F> ShardClient<F>
where
    F: ConnectionFactory,
    F::Connection: Connection<Reply = Value>,
{
    pub fn query<T: FromRedisValue>(&self, command: &Command) -> Result<T> {
        let reply = self.execute(command)?;
        Ok(redis::from_redis_value(&reply)?)
    }

    pub fn get(&self, key: impl AsRef<[u8]>) -> Result<Option<Vec<u8>>> {
        self.query(&Command::new("GET").arg(key))
    }

    pub fn set(&self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<()> {
        self.query(&Command::new("SET").arg(key).arg(value))
    }

    /// Returns whether the key existed.
    pub fn del(&self, key: impl AsRef<[u8]>) -> Result<bool> {
        let removed: i64 = self.query(&Command::new("DEL").arg(key))?;
        Ok(removed > 0)
    }

    pub fn exists(&self, key: impl AsRef<[u8]>) -> Result<bool> {
        self.query(&Command::new("EXISTS").arg(key))
    }
}

impl ShardClient<RedisConnectionFactory> {
    /// Client over real Redis nodes, as described by `config`.
    pub fn connect(config: &ShardConfig) -> Result<Self> {
        let pool = ShardPool::from_config(config, RedisConnectionFactory)?;
        Ok(Self::new(Arc::new(pool)))
    }
}

impl<F: ConnectionFactory> std::fmt::Debug for ShardClient<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardClient")
            .field("pool", &self.pool)
            .field("metrics", &self.metrics.snapshot())
            .finish()
    }
}
