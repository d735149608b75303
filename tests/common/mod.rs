//! In-memory stand-in for a set of Redis nodes

#![allow(dead_code)]

use parking_lot::Mutex;
use redis::Value;
use shardis::common::node_name;
use shardis::pool::{Connection, ConnectionFactory};
use shardis::{Command, Error, NodeConfig, Result};
use std::collections::HashMap;
use std::sync::{Arc, Weak};

type Store = HashMap<Vec<u8>, Vec<u8>>;

/// Commands a node executed, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executed {
    pub node: String,
    pub command: String,
    pub key: Vec<u8>,
}

#[derive(Default)]
pub struct Cluster {
    /// Handle to ourselves, lent to every connection
    me: Weak<Cluster>,
    stores: Mutex<HashMap<String, Arc<Mutex<Store>>>>,
    /// Addresses handed to the factory
    pub connects: Mutex<Vec<NodeConfig>>,
    pub log: Mutex<Vec<Executed>>,
    /// Sends to fail, per node, before they start succeeding again
    failing_sends: Mutex<HashMap<String, usize>>,
    pub reconnects: Mutex<usize>,
    pub closes: Mutex<usize>,
}

impl Cluster {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            ..Self::default()
        })
    }

    pub fn fail_sends(&self, node: &str, count: usize) {
        self.failing_sends.lock().insert(node.to_string(), count);
    }

    /// Raw value stored on a node, bypassing routing
    pub fn stored(&self, node: &str, key: &[u8]) -> Option<Vec<u8>> {
        let stores = self.stores.lock();
        let store = stores.get(node)?;
        let value = store.lock().get(key).cloned();
        value
    }

    pub fn executed_on(&self, key: &[u8]) -> Vec<String> {
        self.log
            .lock()
            .iter()
            .filter(|e| e.key == key)
            .map(|e| e.node.clone())
            .collect()
    }

    fn store(&self, node: &str) -> Arc<Mutex<Store>> {
        Arc::clone(self.stores.lock().entry(node.to_string()).or_default())
    }

    fn take_failure(&self, node: &str) -> bool {
        let mut failing = self.failing_sends.lock();
        match failing.get_mut(node) {
            Some(left) if *left > 0 => {
                *left -= 1;
                true
            }
            _ => false,
        }
    }
}

pub struct MemoryConnection {
    host: String,
    port: u16,
    cluster: Arc<Cluster>,
    store: Arc<Mutex<Store>>,
    connected: bool,
    pending: Option<Result<Value>>,
}

impl MemoryConnection {
    fn name(&self) -> String {
        node_name(&self.host, self.port)
    }

    fn apply(&self, command: &Command) -> Result<Value> {
        let key = command.key().map(<[u8]>::to_vec).unwrap_or_default();
        let mut store = self.store.lock();
        let reply = match command.name().to_ascii_uppercase().as_str() {
            "GET" => match store.get(&key) {
                Some(value) => Value::BulkString(value.clone()),
                None => Value::Nil,
            },
            "SET" => {
                let value = command
                    .args()
                    .get(1)
                    .cloned()
                    .ok_or_else(|| Error::Protocol("SET needs a value".into()))?;
                store.insert(key.clone(), value);
                Value::Okay
            }
            "DEL" => Value::Int(store.remove(&key).map_or(0, |_| 1)),
            "EXISTS" => Value::Int(store.contains_key(&key) as i64),
            other => return Err(Error::Protocol(format!("unknown command {}", other))),
        };
        self.cluster.log.lock().push(Executed {
            node: self.name(),
            command: command.name().to_string(),
            key,
        });
        Ok(reply)
    }
}

impl Connection for MemoryConnection {
    type Reply = Value;

    fn host(&self) -> &str {
        &self.host
    }

    fn port(&self) -> u16 {
        self.port
    }

    fn send_command(&mut self, command: &Command) -> Result<()> {
        if !self.connected {
            self.connected = true;
            *self.cluster.reconnects.lock() += 1;
        }
        if self.cluster.take_failure(&self.name()) {
            self.connected = false;
            return Err(Error::Transport("connection reset by peer".into()));
        }
        self.pending = Some(self.apply(command));
        Ok(())
    }

    fn read_response(&mut self) -> Result<Value> {
        self.pending
            .take()
            .unwrap_or_else(|| Err(Error::Protocol("no reply pending".into())))
    }

    fn disconnect(&mut self) -> Result<()> {
        self.connected = false;
        self.pending = None;
        *self.cluster.closes.lock() += 1;
        Ok(())
    }
}

impl ConnectionFactory for Cluster {
    type Connection = MemoryConnection;

    fn create(&self, address: &NodeConfig) -> Result<MemoryConnection> {
        let cluster = self
            .me
            .upgrade()
            .ok_or_else(|| Error::Transport("cluster is gone".into()))?;
        self.connects.lock().push(address.clone());
        let name = address.name();
        Ok(MemoryConnection {
            host: address.host.clone(),
            port: address.port,
            cluster,
            store: self.store(&name),
            connected: true,
            pending: None,
        })
    }
}
