//! Node Identity
//!
//! A broker node is addressed in cluster metadata by a colon-joined string:
//!
//! ```text
//! <ip>:<rpcPort>:<tcpPort>:<extra>
//! ```
//!
//! The RPC address (`ip:rpcPort`) is the prefix up to the second colon.
//! Ports stay as strings end to end; they are never parsed, only formatted
//! back into dial addresses.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub ip: String,
    pub rpc_port: String,
    pub tcp_port: String,
}

impl NodeInfo {
    /// Build the node's cluster identity string.
    pub fn node_id(&self, extra: &str) -> String {
        format!("{}:{}:{}:{}", self.ip, self.rpc_port, self.tcp_port, extra)
    }

    pub fn rpc_addr(&self) -> String {
        format!("{}:{}", self.ip, self.rpc_port)
    }
}

/// Extract `ip:rpcPort` from a node identity string: everything up to, not
/// including, the second colon. `None` when the id has fewer than two
/// colons.
pub fn extract_rpc_addr(node_id: &str) -> Option<&str> {
    let first = node_id.find(':')?;
    let second = node_id[first + 1..].find(':')?;
    Some(&node_id[..first + 1 + second])
}

/// Position of `wanted` in `list`.
pub fn find_slice(list: &[String], wanted: &str) -> Option<usize> {
    list.iter().position(|v| v == wanted)
}

/// Order-preserving union of two node lists.
pub fn merge_lists(left: &[String], right: &[String]) -> Vec<String> {
    let mut merged = Vec::with_capacity(left.len() + right.len());
    for v in left.iter().chain(right) {
        if !merged.contains(v) {
            merged.push(v.clone());
        }
    }
    merged
}

/// `list` with every member of `filter` removed, order preserved.
pub fn filter_list(list: &[String], filter: &[String]) -> Vec<String> {
    list.iter()
        .filter(|v| !filter.contains(v))
        .cloned()
        .collect()
}
