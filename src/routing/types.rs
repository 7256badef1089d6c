use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;

/// Port offset between a node's service endpoint and its heartbeat endpoint.
///
/// Peers are probed on their identity's host with the port shifted by this
/// amount, so every node in a cluster must keep the default side-channel
/// layout for liveness detection to work.
pub const HEARTBEAT_PORT_OFFSET: u16 = 1000;

/// Identity of a cluster member: its dialable service address (host:port).
///
/// The same string is the membership key, the hash-ring token source and the
/// address the forwarder dials, so it must be written identically everywhere
/// it is configured.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The heartbeat side-channel endpoint derived from this identity.
    ///
    /// `None` if the identity is not a parseable socket address or the port
    /// offset would overflow.
    pub fn heartbeat_addr(&self) -> Option<SocketAddr> {
        let addr: SocketAddr = self.0.parse().ok()?;
        let port = addr.port().checked_add(HEARTBEAT_PORT_OFFSET)?;
        Some(SocketAddr::new(addr.ip(), port))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Liveness of a remote peer as seen by the local failure detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerStatus {
    /// The peer answered the most recent probe.
    Up,
    /// The peer has not been reached yet, or the most recent probe failed.
    Down,
}

impl PeerStatus {
    pub fn is_up(self) -> bool {
        self == PeerStatus::Up
    }
}

impl fmt::Display for PeerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerStatus::Up => f.write_str("Up"),
            PeerStatus::Down => f.write_str("Down"),
        }
    }
}
