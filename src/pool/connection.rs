//! Connection capabilities consumed by the pool

use crate::client::Command;
use crate::common::{node_name, NodeConfig, Result};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// A transport to exactly one node.
///
/// `send_command` on a disconnected connection must reconnect first; the
/// executor relies on this to retry a command after [`disconnect`].
///
/// [`disconnect`]: Connection::disconnect
pub trait Connection: Send + 'static {
    /// Parsed reply type
    type Reply;

    fn host(&self) -> &str;

    fn port(&self) -> u16;

    /// Write one command to the wire.
    fn send_command(&mut self, command: &Command) -> Result<()>;

    /// Read and parse the reply to the last command sent.
    fn read_response(&mut self) -> Result<Self::Reply>;

    /// Close the transport. The connection may be reopened by a later send.
    fn disconnect(&mut self) -> Result<()>;
}

/// Opens connections to a node. Performs the transport handshake and owns
/// every timeout.
pub trait ConnectionFactory: Send + Sync {
    type Connection: Connection;

    fn create(&self, address: &NodeConfig) -> Result<Self::Connection>;
}

impl<T: ConnectionFactory> ConnectionFactory for Arc<T> {
    type Connection = T::Connection;

    fn create(&self, address: &NodeConfig) -> Result<Self::Connection> {
        (**self).create(address)
    }
}

/// Pool-assigned identity of a connection, unique within one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub(crate) u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

pub(crate) type SharedConnection<C> = Arc<Mutex<C>>;

/// A connection checked out of a [`ShardPool`](super::ShardPool).
///
/// Hand it back with [`ShardPool::release`](super::ShardPool::release); the
/// pool keeps its own reference so a pool-wide disconnect reaches it even
/// while it is checked out.
pub struct PooledConnection<C> {
    id: ConnectionId,
    conn: SharedConnection<C>,
}

impl<C: Connection> PooledConnection<C> {
    pub(crate) fn new(id: ConnectionId, conn: SharedConnection<C>) -> Self {
        Self { id, conn }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Lock the underlying connection for a command round-trip.
    pub fn lock(&self) -> MutexGuard<'_, C> {
        self.conn.lock()
    }

    /// Name of the owning node, recovered from the connection's own address.
    pub fn node_name(&self) -> String {
        let conn = self.conn.lock();
        node_name(conn.host(), conn.port())
    }

    pub(crate) fn shared(&self) -> &SharedConnection<C> {
        &self.conn
    }
}

impl<C> std::fmt::Debug for PooledConnection<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection").field("id", &self.id).finish()
    }
}
