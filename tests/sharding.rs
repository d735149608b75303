//! End-to-end routing and pooling against in-memory nodes

mod common;

use common::{Cluster, MemoryConnection};
use shardis::common::node_index;
use shardis::pool::PooledConnection;
use shardis::{Command, Error, NodeConfig, ShardClient, ShardPool};
use std::sync::Arc;

const NODE_0: &str = "localhost:6379";
const NODE_1: &str = "localhost:6380";

fn nodes() -> Vec<NodeConfig> {
    vec![
        NodeConfig::new("localhost", 6379),
        NodeConfig::new("localhost", 6380),
    ]
}

fn client_with(cluster: &Arc<Cluster>, max_connections: Option<usize>) -> ShardClient<Arc<Cluster>> {
    let pool = ShardPool::new(nodes(), Arc::clone(cluster), max_connections).unwrap();
    ShardClient::new(Arc::new(pool))
}

#[test]
fn test_keys_land_on_their_node() {
    let cluster = Cluster::new();
    let client = client_with(&cluster, None);

    client.set("whatever", "foobar").unwrap();
    client.set("blah", "foobar2").unwrap();
    client.set("1234asdfzxv", "blah").unwrap();

    assert_eq!(client.get("whatever").unwrap(), Some(b"foobar".to_vec()));
    assert_eq!(client.get("blah").unwrap(), Some(b"foobar2".to_vec()));
    assert_eq!(client.get("1234asdfzxv").unwrap(), Some(b"blah".to_vec()));

    // Values live only on the owning node
    assert_eq!(cluster.stored(NODE_1, b"whatever"), Some(b"foobar".to_vec()));
    assert_eq!(cluster.stored(NODE_0, b"whatever"), None);
    assert_eq!(cluster.stored(NODE_0, b"1234asdfzxv"), Some(b"blah".to_vec()));
    assert_eq!(cluster.stored(NODE_1, b"1234asdfzxv"), None);

    // One connection per touched node, reused for every later command
    let stats = client.pool().stats();
    assert_eq!(stats.created, 2);
    assert_eq!(stats.total_in_use(), 0);
    assert_eq!(stats.node(NODE_0).unwrap().available, 1);
    assert_eq!(stats.node(NODE_1).unwrap().available, 1);
}

#[test]
fn test_routing_matches_node_index() {
    let cluster = Cluster::new();
    let client = client_with(&cluster, None);

    for i in 0..50 {
        let key = format!("key_{}", i);
        client.set(&key, "v").unwrap();

        let expected = &client.pool().nodes()[node_index(key.as_bytes(), 2)].name;
        let executed = cluster.executed_on(key.as_bytes());
        assert_eq!(executed, vec![expected.clone()]);
    }
}

#[test]
fn test_same_key_same_node() {
    let cluster = Cluster::new();
    let client = client_with(&cluster, None);

    client.set("foo", "1").unwrap();
    assert!(client.exists("foo").unwrap());
    assert!(client.del("foo").unwrap());
    assert!(!client.del("foo").unwrap());
    assert_eq!(client.get("foo").unwrap(), None);

    let executed = cluster.executed_on(b"foo");
    assert_eq!(executed.len(), 5);
    assert!(executed.iter().all(|node| node == &executed[0]));
}

#[test]
fn test_only_first_key_routes() {
    let cluster = Cluster::new();
    let client = client_with(&cluster, None);

    // "k0" routes to node 1, "k1" to node 0
    let command = Command::new("SET").arg("k0").arg("k1");
    client.execute(&command).unwrap();

    assert_eq!(cluster.stored(NODE_1, b"k0"), Some(b"k1".to_vec()));
    assert_eq!(cluster.connects.lock().len(), 1);
    assert_eq!(cluster.connects.lock()[0].name(), NODE_1);
}

#[test]
fn test_dead_connection_retried_once() {
    let cluster = Cluster::new();
    let client = client_with(&cluster, None);

    client.set("whatever", "before").unwrap();
    cluster.fail_sends(NODE_1, 1);
    client.set("whatever", "after").unwrap();

    assert_eq!(cluster.stored(NODE_1, b"whatever"), Some(b"after".to_vec()));
    assert_eq!(*cluster.closes.lock(), 1);
    assert_eq!(*cluster.reconnects.lock(), 1);

    // Still the same pooled connection
    assert_eq!(client.pool().created_connections(), 1);
    assert_eq!(client.metrics().snapshot().retries, 1);
    assert_eq!(client.metrics().snapshot().failures, 0);
}

#[test]
fn test_second_failure_surfaces_and_releases() {
    let cluster = Cluster::new();
    let client = client_with(&cluster, None);

    cluster.fail_sends(NODE_1, 2);
    let result = client.set("whatever", "x");
    assert!(matches!(result, Err(Error::Transport(_))));
    assert_eq!(cluster.stored(NODE_1, b"whatever"), None);

    let stats = client.pool().stats();
    assert_eq!(stats.total_in_use(), 0);
    assert_eq!(stats.node(NODE_1).unwrap().available, 1);

    // The connection recovers on the next command
    client.set("whatever", "y").unwrap();
    assert_eq!(cluster.stored(NODE_1, b"whatever"), Some(b"y".to_vec()));
    assert_eq!(client.pool().created_connections(), 1);
}

#[test]
fn test_capacity_exceeded() {
    let cluster = Cluster::new();
    let client = client_with(&cluster, Some(1));

    let held: PooledConnection<MemoryConnection> =
        client.pool().acquire("GET", &["whatever"]).unwrap();

    // Cap counts connections on every node
    let result = client.get("1234asdfzxv");
    assert!(matches!(result, Err(Error::CapacityExceeded { max: 1 })));
    assert!(cluster.executed_on(b"1234asdfzxv").is_empty());

    client.pool().release(held).unwrap();
    client.set("blah", "ok").unwrap();
    assert_eq!(client.pool().created_connections(), 1);
}

#[test]
fn test_missing_key() {
    let cluster = Cluster::new();
    let client = client_with(&cluster, None);

    let result = client.execute(&Command::new("PING"));
    assert!(matches!(result, Err(Error::MissingKey(name)) if name == "PING"));
    assert!(cluster.connects.lock().is_empty());
}

#[test]
fn test_release_into_other_pool() {
    let cluster = Cluster::new();
    let first = client_with(&cluster, None);
    let second = client_with(&cluster, None);

    let conn = first.pool().acquire("GET", &["whatever"]).unwrap();
    let result = second.pool().release(conn);
    assert!(matches!(result, Err(Error::RoutingInconsistency(_))));

    assert_eq!(second.pool().stats().total_available(), 0);
    assert_eq!(first.pool().stats().total_in_use(), 1);
}

#[test]
fn test_disconnect_closes_everything() {
    let cluster = Cluster::new();
    let client = client_with(&cluster, None);

    // Held first, so "whatever" needs a second connection on the same node
    let held = client.pool().acquire("GET", &["blah"]).unwrap();
    client.set("whatever", "1").unwrap();
    client.set("1234asdfzxv", "2").unwrap();

    let stats = client.pool().stats();
    assert_eq!(stats.created, 3);
    assert_eq!(stats.node(NODE_0).unwrap().available, 1);
    assert_eq!(stats.node(NODE_1).unwrap().available, 1);
    assert_eq!(stats.node(NODE_1).unwrap().in_use, 1);

    // Idle and checked-out alike
    client.pool().disconnect().unwrap();
    assert_eq!(*cluster.closes.lock(), 3);

    drop(held);
}

#[test]
fn test_pool_from_config() {
    let cluster = Cluster::new();
    let mut config = shardis::ShardConfig::from_nodes(nodes());
    config.pool.max_idle_per_node = Some(0);

    let pool = ShardPool::from_config(&config, Arc::clone(&cluster)).unwrap();
    let client = ShardClient::new(Arc::new(pool));

    client.set("whatever", "v").unwrap();
    client.set("whatever", "w").unwrap();

    // No idle connections kept, so each command opens a fresh one
    let stats = client.pool().stats();
    assert_eq!(stats.total_available(), 0);
    assert_eq!(stats.created, 2);
    assert_eq!(*cluster.closes.lock(), 2);
}
