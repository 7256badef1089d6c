use serde::{Deserialize, Serialize};

use crate::routing::types::NodeId;

/// Wire message sent over the heartbeat side channel.
///
/// Carries the sender's identity so the receiver can mark it Up, or insert it
/// if a JOIN broadcast never arrived.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Probe {
    pub from: NodeId,
}
