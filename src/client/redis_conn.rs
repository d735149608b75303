//! Redis nodes, spoken to through the `redis` crate

use super::command::Command;
use crate::common::{Error, NodeConfig, Result};
use crate::pool::{Connection, ConnectionFactory};

/// A connection to one Redis node.
///
/// The socket is opened eagerly by [`RedisConnection::open`] and reopened
/// lazily by the next send after a [`disconnect`](Connection::disconnect).
pub struct RedisConnection {
    address: NodeConfig,
    inner: Option<redis::Connection>,
}

impl RedisConnection {
    pub fn open(address: &NodeConfig) -> Result<Self> {
        let mut conn = Self {
            address: address.clone(),
            inner: None,
        };
        conn.connection()?;
        Ok(conn)
    }

    pub fn address(&self) -> &NodeConfig {
        &self.address
    }

    pub fn is_connected(&self) -> bool {
        self.inner.is_some()
    }

    fn connection(&mut self) -> Result<&mut redis::Connection> {
        if self.inner.is_none() {
            self.inner = Some(connect(&self.address)?);
        }
        self.inner
            .as_mut()
            .ok_or_else(|| Error::Transport(format!("{} is not connected", self.address.name())))
    }

    /// Drop the socket if the error left it in an unknown state.
    fn check<T>(&mut self, result: redis::RedisResult<T>) -> Result<T> {
        result.map_err(|e| {
            let err = Error::from(e);
            if err.is_connection_error() {
                self.inner = None;
            }
            err
        })
    }
}

fn connect(address: &NodeConfig) -> Result<redis::Connection> {
    let client = redis::Client::open(connection_info(address))?;
    let conn = match address.connect_timeout() {
        Some(timeout) => client.get_connection_with_timeout(timeout)?,
        None => client.get_connection()?,
    };
    conn.set_read_timeout(address.read_timeout())?;
    conn.set_write_timeout(address.write_timeout())?;
    tracing::debug!(node = %address.name(), db = address.db, "connected to redis node");
    Ok(conn)
}

fn connection_info(address: &NodeConfig) -> redis::ConnectionInfo {
    redis::ConnectionInfo {
        addr: redis::ConnectionAddr::Tcp(address.host.clone(), address.port),
        redis: redis::RedisConnectionInfo {
            db: address.db,
            username: address.username.clone(),
            password: address.password.clone(),
            ..Default::default()
        },
    }
}

impl Connection for RedisConnection {
    type Reply = redis::Value;

    fn host(&self) -> &str {
        &self.address.host
    }

    fn port(&self) -> u16 {
        self.address.port
    }

    fn send_command(&mut self, command: &Command) -> Result<()> {
        let packed = command.packed();
        let result = self.connection()?.send_packed_command(&packed);
        self.check(result)
    }

    fn read_response(&mut self) -> Result<redis::Value> {
        let Some(conn) = self.inner.as_mut() else {
            return Err(Error::Transport(format!(
                "{} is not connected",
                self.address.name()
            )));
        };
        let result = conn.recv_response();
        match self.check(result)? {
            redis::Value::ServerError(err) => Err(Error::server(err.code(), err.details())),
            value => Ok(value),
        }
    }

    fn disconnect(&mut self) -> Result<()> {
        if self.inner.take().is_some() {
            tracing::debug!(node = %self.address.name(), "disconnected from redis node");
        }
        Ok(())
    }
}

/// Opens [`RedisConnection`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisConnectionFactory;

impl ConnectionFactory for RedisConnectionFactory {
    type Connection = RedisConnection;

    fn create(&self, address: &NodeConfig) -> Result<RedisConnection> {
        RedisConnection::open(address)
    }
}
