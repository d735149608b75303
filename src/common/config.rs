//! Configuration for shardis
//!
//! A deployment is described by an ordered node list plus pool limits. Node
//! order is significant: it defines the shard each key lands on, so
//! reordering or resizing the list remaps keys.

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Default creation cap, effectively unbounded.
pub const DEFAULT_MAX_CONNECTIONS: usize = 1 << 31;

/// Environment prefix for overrides, e.g. `SHARDIS_POOL__MAX_CONNECTIONS=64`.
pub const ENV_PREFIX: &str = "SHARDIS";

/// Global configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShardConfig {
    /// Backend nodes, in routing order
    pub nodes: Vec<NodeConfig>,

    /// Pool limits
    #[serde(default)]
    pub pool: PoolConfig,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ShardConfig {
    pub fn from_nodes(nodes: Vec<NodeConfig>) -> Self {
        Self {
            nodes,
            pool: PoolConfig::default(),
            log_level: default_log_level(),
        }
    }

    /// Load a TOML file, apply `SHARDIS_*` environment overrides and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: ShardConfig = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        tracing::debug!(
            path = %path.display(),
            nodes = config.nodes.len(),
            "loaded shard configuration"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(Error::Configuration("at least one node is required".into()));
        }
        let mut seen = std::collections::HashSet::new();
        for node in &self.nodes {
            if node.host.is_empty() {
                return Err(Error::Configuration("node host cannot be empty".into()));
            }
            if !seen.insert(node.name()) {
                return Err(Error::Configuration(format!(
                    "duplicate node {}",
                    node.name()
                )));
            }
        }
        self.pool.validate()
    }
}

/// Pool limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    /// Cap on connections ever created, all nodes combined
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Idle connections kept per node; surplus ones are closed on release
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_idle_per_node: Option<usize>,
}

fn default_max_connections() -> usize {
    DEFAULT_MAX_CONNECTIONS
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_idle_per_node: None,
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(Error::Configuration(
                "max_connections must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Address and connection parameters of one backend node.
///
/// Only the fields below are recognized; anything else in a config file is
/// rejected rather than silently dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    pub host: String,

    pub port: u16,

    /// Logical database index selected after connecting
    #[serde(default)]
    pub db: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_timeout_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_timeout_ms: Option<u64>,
}

impl NodeConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            db: 0,
            username: None,
            password: None,
            connect_timeout_ms: None,
            read_timeout_ms: None,
            write_timeout_ms: None,
        }
    }

    pub fn with_db(mut self, db: i64) -> Self {
        self.db = db;
        self
    }

    pub fn with_credentials(mut self, username: Option<String>, password: String) -> Self {
        self.username = username;
        self.password = Some(password);
        self
    }

    pub fn with_timeouts(mut self, connect_ms: u64, io_ms: u64) -> Self {
        self.connect_timeout_ms = Some(connect_ms);
        self.read_timeout_ms = Some(io_ms);
        self.write_timeout_ms = Some(io_ms);
        self
    }

    /// Pool-internal node name, `host:port`
    pub fn name(&self) -> String {
        node_name(&self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout_ms.map(Duration::from_millis)
    }
}

/// Node names are `host:port`, so one host may carry several shards on
/// different ports.
pub fn node_name(host: &str, port: u16) -> String {
    format!("{}:{}", host, port)
}

/// Parses `host:port` or `host:port/db`.
impl FromStr for NodeConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (addr, db) = match s.split_once('/') {
            Some((addr, db)) => {
                let db = db
                    .parse()
                    .map_err(|_| Error::Configuration(format!("invalid db index in {}", s)))?;
                (addr, db)
            }
            None => (s, 0),
        };
        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| Error::Configuration(format!("expected host:port, got {}", s)))?;
        if host.is_empty() {
            return Err(Error::Configuration(format!("missing host in {}", s)));
        }
        let port = port
            .parse()
            .map_err(|_| Error::Configuration(format!("invalid port in {}", s)))?;
        Ok(NodeConfig::new(host, port).with_db(db))
    }
}
