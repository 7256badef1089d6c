use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

use crate::routing::types::NodeId;

/// Node configuration, parsed from the command line.
#[derive(Parser, Debug, Clone)]
#[command(version, about = "Distributed in-memory cache node")]
pub struct Config {
    /// host:port the node serves clients on; doubles as this node's identity
    /// in the cluster, so peers must be configured with exactly this string.
    #[arg(long)]
    pub address: String,

    /// Side endpoint for heartbeat probes. Defaults to the service port
    /// shifted by the fixed side-channel offset.
    #[arg(long)]
    pub heartbeat_address: Option<SocketAddr>,

    /// Identity (host:port) of an initial peer. Repeat for multiple peers.
    #[arg(long = "peer")]
    pub peers: Vec<String>,

    /// Number of independently locked shards in the local store.
    #[arg(long, default_value_t = 256)]
    pub shards: usize,

    /// Heartbeat probe period in milliseconds.
    #[arg(long, default_value_t = 1000)]
    pub heartbeat_interval_ms: u64,

    /// Virtual tokens per node on the hash ring.
    #[arg(long, default_value_t = crate::routing::ring::DEFAULT_REPLICAS)]
    pub replicas: usize,
}

impl Config {
    pub fn local_id(&self) -> NodeId {
        NodeId(self.address.clone())
    }

    pub fn peer_ids(&self) -> Vec<NodeId> {
        self.peers.iter().cloned().map(NodeId).collect()
    }

    pub fn heartbeat_addr(&self) -> Result<SocketAddr> {
        match self.heartbeat_address {
            Some(addr) => Ok(addr),
            None => self.local_id().heartbeat_addr().with_context(|| {
                format!("cannot derive a heartbeat address from --address {}", self.address)
            }),
        }
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms.max(1))
    }
}
