//! TTL-based cluster membership.
//!
//! Workers and servers announce themselves with periodic heartbeats; entries
//! that miss their deadline are evicted by a background sweep. Join and
//! leave callbacks fire exactly once per membership transition.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, info};

use rf_types::Node;

/// Grace added on top of the heartbeat timeout before a node is evicted.
const EVICTION_GRACE: Duration = Duration::from_secs(10);

pub type NodeCallback = Box<dyn Fn(&Node) + Send + Sync>;

struct NodeEntry {
    node: Node,
    deadline: Instant,
}

/// Live view of the cluster, keyed by node name.
///
/// `heartbeat` and `sweep` are safe to call concurrently; callbacks run
/// outside the map's shard locks.
pub struct NodeTable {
    ttl: Duration,
    entries: DashMap<String, NodeEntry>,
    on_up: Option<NodeCallback>,
    on_down: Option<NodeCallback>,
}

impl NodeTable {
    /// A table whose entries live for `heartbeat_timeout` plus a fixed grace.
    pub fn new(heartbeat_timeout: Duration) -> Self {
        Self::with_ttl(heartbeat_timeout + EVICTION_GRACE)
    }

    /// A table with an exact entry lifetime.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
            on_up: None,
            on_down: None,
        }
    }

    /// Callback invoked once when a node first joins.
    pub fn on_up(mut self, callback: NodeCallback) -> Self {
        self.on_up = Some(callback);
        self
    }

    /// Callback invoked once when a node is evicted.
    pub fn on_down(mut self, callback: NodeCallback) -> Self {
        self.on_down = Some(callback);
        self
    }

    /// Record a heartbeat, extending the node's deadline. The first
    /// heartbeat for a name registers the node and fires the up callback.
    pub fn heartbeat(&self, node: Node) {
        let deadline = Instant::now() + self.ttl;
        let mut joined = None;
        match self.entries.entry(node.name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.node = node;
                entry.deadline = deadline;
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                joined = Some(node.clone());
                vacant.insert(NodeEntry { node, deadline });
            }
        }
        if let Some(node) = joined {
            info!(name = %node.name, role = %node.role, address = %node.address, "node joined");
            if let Some(callback) = &self.on_up {
                callback(&node);
            }
        }
    }

    /// Evict every entry past its deadline, firing the down callback for
    /// each. Returns the number of evictions.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut evicted = Vec::new();
        self.entries.retain(|_, entry| {
            if entry.deadline <= now {
                evicted.push(entry.node.clone());
                false
            } else {
                true
            }
        });
        for node in &evicted {
            info!(name = %node.name, role = %node.role, "node expired");
            if let Some(callback) = &self.on_down {
                callback(node);
            }
        }
        evicted.len()
    }

    /// All live nodes, ordered by name.
    pub fn nodes(&self) -> Vec<Node> {
        let mut nodes: Vec<Node> = self.entries.iter().map(|e| e.node.clone()).collect();
        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        nodes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Spawn a background task that sweeps the table on a fixed interval.
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let evicted = self.sweep();
                if evicted > 0 {
                    debug!(evicted, live = self.len(), "sweep complete");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{unbounded, Receiver, Sender};
    use rf_types::NodeRole;

    fn worker(name: &str) -> Node {
        Node {
            name: name.to_string(),
            role: NodeRole::Worker,
            address: format!("{name}.local:9000"),
        }
    }

    fn channel_callback(sender: Sender<String>) -> NodeCallback {
        Box::new(move |node: &Node| {
            sender.send(node.name.clone()).unwrap();
        })
    }

    fn table_with_channels(ttl: Duration) -> (NodeTable, Receiver<String>, Receiver<String>) {
        let (up_tx, up_rx) = unbounded();
        let (down_tx, down_rx) = unbounded();
        let table = NodeTable::with_ttl(ttl)
            .on_up(channel_callback(up_tx))
            .on_down(channel_callback(down_tx));
        (table, up_rx, down_rx)
    }

    #[test]
    fn up_fires_once_per_node() {
        let (table, up_rx, _down_rx) = table_with_channels(Duration::from_secs(60));

        table.heartbeat(worker("w1"));
        table.heartbeat(worker("w1"));
        table.heartbeat(worker("w2"));

        let mut ups: Vec<String> = up_rx.try_iter().collect();
        ups.sort();
        assert_eq!(ups, vec!["w1".to_string(), "w2".to_string()]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn heartbeat_refreshes_the_deadline() {
        let (table, _up_rx, down_rx) = table_with_channels(Duration::from_millis(80));

        table.heartbeat(worker("w1"));
        std::thread::sleep(Duration::from_millis(50));
        table.heartbeat(worker("w1"));
        std::thread::sleep(Duration::from_millis(50));

        // The first deadline has passed, but the refresh moved it.
        assert_eq!(table.sweep(), 0);
        assert!(down_rx.try_recv().is_err());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn sweep_evicts_expired_nodes_once() {
        let (table, _up_rx, down_rx) = table_with_channels(Duration::from_millis(20));

        table.heartbeat(worker("w1"));
        std::thread::sleep(Duration::from_millis(40));

        assert_eq!(table.sweep(), 1);
        assert_eq!(table.sweep(), 0);
        let downs: Vec<String> = down_rx.try_iter().collect();
        assert_eq!(downs, vec!["w1".to_string()]);
        assert!(table.is_empty());
    }

    #[test]
    fn rejoin_after_eviction_fires_up_again() {
        let (table, up_rx, _down_rx) = table_with_channels(Duration::from_millis(20));

        table.heartbeat(worker("w1"));
        std::thread::sleep(Duration::from_millis(40));
        table.sweep();
        table.heartbeat(worker("w1"));

        assert_eq!(up_rx.try_iter().count(), 2);
    }

    #[test]
    fn nodes_are_sorted_by_name() {
        let table = NodeTable::with_ttl(Duration::from_secs(60));
        table.heartbeat(worker("zeta"));
        table.heartbeat(worker("alpha"));

        let names: Vec<String> = table.nodes().into_iter().map(|n| n.name).collect();
        assert_eq!(names, vec!["alpha".to_string(), "zeta".to_string()]);
    }

    #[tokio::test]
    async fn background_sweeper_evicts_stale_nodes() {
        let (table, _up_rx, down_rx) = table_with_channels(Duration::from_millis(30));
        let table = Arc::new(table);
        let handle = Arc::clone(&table).spawn_sweeper(Duration::from_millis(10));

        table.heartbeat(worker("w1"));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(table.is_empty());
        assert_eq!(down_rx.try_iter().count(), 1);
        handle.abort();
    }
}
