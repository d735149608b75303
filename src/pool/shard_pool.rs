//! Sharded connection pool implementation

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::connection::{
    Connection, ConnectionFactory, ConnectionId, PooledConnection, SharedConnection,
};
use super::node::Node;
use super::stats::{NodeStats, PoolStats};
use crate::common::{node_index, Error, NodeConfig, Result, ShardConfig};

/// Connections of one node
struct NodeSlots<C> {
    /// Idle connections, most recently released last
    available: Vec<(ConnectionId, SharedConnection<C>)>,
    /// Checked-out connections
    in_use: HashMap<ConnectionId, SharedConnection<C>>,
}

impl<C> NodeSlots<C> {
    fn new() -> Self {
        Self {
            available: Vec::new(),
            in_use: HashMap::new(),
        }
    }
}

struct PoolState<C> {
    slots: HashMap<String, NodeSlots<C>>,
    created: usize,
    next_id: u64,
}

impl<C> PoolState<C> {
    fn node_slots(&mut self, name: &str) -> Result<&mut NodeSlots<C>> {
        self.slots
            .get_mut(name)
            .ok_or_else(|| Error::RoutingInconsistency(format!("unknown node {}", name)))
    }

    /// Claim a creation slot under the cap.
    fn reserve(&mut self, max_connections: usize) -> Result<ConnectionId> {
        if self.created >= max_connections {
            return Err(Error::CapacityExceeded {
                max: max_connections,
            });
        }
        self.created += 1;
        let id = ConnectionId(self.next_id);
        self.next_id += 1;
        Ok(id)
    }
}

/// A connection pool spread over a fixed, ordered set of nodes.
///
/// Every command is routed by its first key to exactly one node. Each node
/// keeps a LIFO stack of idle connections and a set of checked-out ones;
/// one cap bounds the connections ever created across all nodes.
///
/// All state transitions happen under a single lock, which is never held
/// across network I/O.
pub struct ShardPool<F: ConnectionFactory> {
    nodes: Vec<Node>,
    factory: F,
    max_connections: usize,
    max_idle_per_node: Option<usize>,
    state: Mutex<PoolState<F::Connection>>,
}

impl<F: ConnectionFactory> ShardPool<F> {
    /// Build a pool over `nodes`, in routing order.
    ///
    /// `max_connections` defaults to [`DEFAULT_MAX_CONNECTIONS`].
    ///
    /// [`DEFAULT_MAX_CONNECTIONS`]: crate::common::DEFAULT_MAX_CONNECTIONS
    pub fn new(nodes: Vec<NodeConfig>, factory: F, max_connections: Option<usize>) -> Result<Self> {
        let mut config = ShardConfig::from_nodes(nodes);
        if let Some(max) = max_connections {
            config.pool.max_connections = max;
        }
        Self::from_config(&config, factory)
    }

    pub fn from_config(config: &ShardConfig, factory: F) -> Result<Self> {
        config.validate()?;

        let nodes: Vec<Node> = config.nodes.iter().cloned().map(Node::new).collect();
        let slots = nodes
            .iter()
            .map(|node| (node.name.clone(), NodeSlots::new()))
            .collect();

        tracing::info!(
            nodes = nodes.len(),
            max_connections = config.pool.max_connections,
            "shard pool ready"
        );

        Ok(Self {
            nodes,
            factory,
            max_connections: config.pool.max_connections,
            max_idle_per_node: config.pool.max_idle_per_node,
            state: Mutex::new(PoolState {
                slots,
                created: 0,
                next_id: 1,
            }),
        })
    }

    /// Nodes in routing order
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// The node a key is routed to. No I/O.
    pub fn node_for_key(&self, key: &[u8]) -> &Node {
        &self.nodes[node_index(key, self.nodes.len())]
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    pub fn max_idle_per_node(&self) -> Option<usize> {
        self.max_idle_per_node
    }

    /// Connections ever created, all nodes combined
    pub fn created_connections(&self) -> usize {
        self.state.lock().created
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Check out a connection to the node owning `keys[0]`.
    ///
    /// Reuses the most recently released idle connection of that node, or
    /// opens a new one if none is idle and the creation cap allows it. Only
    /// the first key routes; `command_name` is used for logging alone.
    pub fn acquire<K: AsRef<[u8]>>(
        &self,
        command_name: &str,
        keys: &[K],
    ) -> Result<PooledConnection<F::Connection>> {
        let key = keys
            .first()
            .ok_or_else(|| Error::MissingKey(command_name.to_string()))?;
        let node = self.node_for_key(key.as_ref());
        tracing::trace!(command = command_name, node = %node.name, "routed command");

        let id = {
            let mut state = self.state.lock();
            let slots = state.node_slots(&node.name)?;
            if let Some((id, conn)) = slots.available.pop() {
                slots.in_use.insert(id, Arc::clone(&conn));
                tracing::debug!(conn = %id, node = %node.name, "reused idle connection");
                return Ok(PooledConnection::new(id, conn));
            }
            match state.reserve(self.max_connections) {
                Ok(id) => id,
                Err(e) => {
                    tracing::warn!(node = %node.name, max = self.max_connections, "connection cap reached");
                    return Err(e);
                }
            }
        };

        // Handshake outside the lock; give the slot back if it fails.
        let conn = match self.factory.create(&node.address) {
            Ok(conn) => Arc::new(Mutex::new(conn)),
            Err(e) => {
                self.state.lock().created -= 1;
                tracing::warn!(node = %node.name, error = %e, "failed to open connection");
                return Err(e);
            }
        };

        let mut state = self.state.lock();
        state
            .node_slots(&node.name)?
            .in_use
            .insert(id, Arc::clone(&conn));
        tracing::debug!(
            conn = %id,
            node = %node.name,
            created = state.created,
            "opened new connection"
        );
        Ok(PooledConnection::new(id, conn))
    }

    /// Return a checked-out connection to its node's idle stack.
    ///
    /// The node is recovered from the connection's host and port. A
    /// connection this pool does not track is reported as
    /// [`Error::RoutingInconsistency`] and leaves the pool untouched.
    ///
    /// Must not be called while the connection is locked.
    pub fn release(&self, connection: PooledConnection<F::Connection>) -> Result<()> {
        self.checkin(&connection)
    }

    /// [`release`](Self::release) through a borrowed handle; the caller
    /// must not use the handle afterwards.
    pub(crate) fn checkin(&self, connection: &PooledConnection<F::Connection>) -> Result<()> {
        let id = connection.id();
        let name = connection.node_name();

        let surplus = {
            let mut state = self.state.lock();
            let slots = match state.slots.get_mut(&name) {
                Some(slots) => slots,
                None => {
                    tracing::warn!(conn = %id, node = %name, "released connection of unknown node");
                    return Err(Error::RoutingInconsistency(format!(
                        "{} belongs to unknown node {}",
                        id, name
                    )));
                }
            };

            let tracked = slots
                .in_use
                .get(&id)
                .is_some_and(|conn| Arc::ptr_eq(conn, connection.shared()));
            if !tracked {
                tracing::warn!(conn = %id, node = %name, "released connection that is not in use");
                return Err(Error::RoutingInconsistency(format!(
                    "{} is not in use on {}",
                    id, name
                )));
            }

            slots.in_use.remove(&id);
            let conn = Arc::clone(connection.shared());
            match self.max_idle_per_node {
                Some(cap) if slots.available.len() >= cap => Some(conn),
                _ => {
                    slots.available.push((id, conn));
                    None
                }
            }
        };

        if let Some(conn) = surplus {
            tracing::debug!(conn = %id, node = %name, "closing surplus idle connection");
            if let Err(e) = conn.lock().disconnect() {
                tracing::debug!(conn = %id, error = %e, "error closing surplus connection");
            }
        }
        Ok(())
    }

    /// Close every connection of every node, idle or checked out.
    ///
    /// The collections keep their (now closed) entries: this is for
    /// shutdown, and the pool should be dropped afterwards. All connections
    /// are attempted; the first failure is returned.
    pub fn disconnect(&self) -> Result<()> {
        let conns: Vec<(ConnectionId, SharedConnection<F::Connection>)> = {
            let state = self.state.lock();
            state
                .slots
                .values()
                .flat_map(|slots| {
                    slots
                        .available
                        .iter()
                        .map(|(id, conn)| (*id, Arc::clone(conn)))
                        .chain(slots.in_use.iter().map(|(id, conn)| (*id, Arc::clone(conn))))
                })
                .collect()
        };

        let mut first_error = None;
        for (id, conn) in &conns {
            if let Err(e) = conn.lock().disconnect() {
                tracing::warn!(conn = %id, error = %e, "failed to close connection");
                first_error.get_or_insert(e);
            }
        }
        tracing::info!(closed = conns.len(), "shard pool disconnected");

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        let nodes = self
            .nodes
            .iter()
            .map(|node| {
                let slots = state.slots.get(&node.name);
                NodeStats {
                    name: node.name.clone(),
                    available: slots.map_or(0, |s| s.available.len()),
                    in_use: slots.map_or(0, |s| s.in_use.len()),
                }
            })
            .collect();
        PoolStats {
            created: state.created,
            max_connections: self.max_connections,
            nodes,
        }
    }
}

impl<F: ConnectionFactory> std::fmt::Debug for ShardPool<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardPool")
            .field("nodes", &self.nodes)
            .field("max_connections", &self.max_connections)
            .field("max_idle_per_node", &self.max_idle_per_node)
            .finish_non_exhaustive()
    }
}
