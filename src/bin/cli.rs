//! CLI for a sharded set of Redis nodes

use clap::{Parser, Subcommand};
use shardis::{NodeConfig, RedisShardClient, ShardConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "shardis")]
#[command(about = "Sharded Redis client")]
#[command(version)]
struct Cli {
    /// TOML config file
    #[arg(long, conflicts_with = "nodes")]
    config: Option<PathBuf>,

    /// Node as host:port[/db], in routing order (repeatable)
    #[arg(long = "node", value_name = "HOST:PORT[/DB]")]
    nodes: Vec<NodeConfig>,

    /// Cap on connections ever opened
    #[arg(long)]
    max_connections: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get a value
    Get {
        /// Key
        key: String,
    },

    /// Set a value
    Set {
        /// Key
        key: String,

        /// Value
        value: String,
    },

    /// Delete a key
    Del {
        /// Key
        key: String,
    },

    /// Show which node owns a key, without connecting
    Locate {
        /// Key
        key: String,
    },
}

impl Cli {
    fn shard_config(&self) -> anyhow::Result<ShardConfig> {
        let mut config = match &self.config {
            Some(path) => ShardConfig::load(path)?,
            None => ShardConfig::from_nodes(self.nodes.clone()),
        };
        if let Some(max) = self.max_connections {
            config.pool.max_connections = max;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.shard_config()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let client = RedisShardClient::connect(&config)?;

    match cli.command {
        Commands::Get { key } => match client.get(&key)? {
            Some(value) => println!("{}", String::from_utf8_lossy(&value)),
            None => println!("(nil)"),
        },

        Commands::Set { key, value } => {
            client.set(&key, &value)?;
            println!("OK");
        }

        Commands::Del { key } => {
            let removed = client.del(&key)?;
            println!("{}", if removed { 1 } else { 0 });
        }

        Commands::Locate { key } => {
            let pool = client.pool();
            let node = pool.node_for_key(key.as_bytes());
            let index = shardis::common::node_index(key.as_bytes(), pool.nodes().len());
            let report = serde_json::json!({
                "key": key,
                "index": index,
                "node": node.name,
                "db": node.address.db,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    client.pool().disconnect()?;
    Ok(())
}
