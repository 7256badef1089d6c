use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

use super::ring::Ring;
use super::types::{NodeId, PeerStatus};

/// The cluster view: every known remote peer with its liveness, plus the hash
/// ring that routes keys.
///
/// Both live behind one lock so `owner_of` can never disagree with the peer
/// set. The local node is always on the ring and never in the peer map.
pub struct RouteTable {
    local: NodeId,
    inner: RwLock<RouteState>,
}

struct RouteState {
    ring: Ring,
    peers: HashMap<NodeId, PeerStatus>,
}

impl RouteTable {
    pub fn new(local: NodeId, peers: Vec<NodeId>, replicas: usize) -> Self {
        let mut ring = Ring::new(replicas);
        ring.add_node(&local);

        let mut map = HashMap::new();
        for peer in peers {
            if peer == local {
                continue;
            }
            ring.add_node(&peer);
            map.insert(peer, PeerStatus::Down);
        }

        Self {
            local,
            inner: RwLock::new(RouteState { ring, peers: map }),
        }
    }

    pub fn local(&self) -> &NodeId {
        &self.local
    }

    /// The node that owns `key` under the current membership.
    pub async fn owner_of(&self, key: &str) -> NodeId {
        let state = self.inner.read().await;
        state
            .ring
            .owner_of(key)
            .cloned()
            // The ring always carries the local node, so this only covers a
            // cleared ring between REMOVE-self and process exit.
            .unwrap_or_else(|| self.local.clone())
    }

    /// Runs `f` over the peer map under the shared lock, so a multi-entry
    /// read (INFO, the JOIN reply) cannot observe a torn view.
    pub async fn with_peers<T>(&self, f: impl FnOnce(&HashMap<NodeId, PeerStatus>) -> T) -> T {
        let state = self.inner.read().await;
        f(&state.peers)
    }

    pub async fn snapshot(&self) -> Vec<(NodeId, PeerStatus)> {
        let state = self.inner.read().await;
        state
            .peers
            .iter()
            .map(|(id, status)| (id.clone(), *status))
            .collect()
    }

    pub async fn peer_ids(&self) -> Vec<NodeId> {
        let state = self.inner.read().await;
        state.peers.keys().cloned().collect()
    }

    /// Inserts a new peer with liveness Down and places it on the ring.
    /// Returns false if the peer was already known or is the local node.
    pub async fn add_peer(&self, id: NodeId) -> bool {
        if id == self.local {
            return false;
        }
        let mut state = self.inner.write().await;
        if state.peers.contains_key(&id) {
            return false;
        }
        state.ring.add_node(&id);
        state.peers.insert(id, PeerStatus::Down);
        true
    }

    /// Deletes a peer and its ring tokens. Returns false if unknown.
    pub async fn remove_peer(&self, id: &NodeId) -> bool {
        let mut state = self.inner.write().await;
        if state.peers.remove(id).is_none() {
            return false;
        }
        state.ring.remove_node(id);
        true
    }

    /// Empties the peer map and resets the ring to the local node only.
    /// Returns the peers that were removed.
    pub async fn clear_peers(&self) -> Vec<NodeId> {
        let mut state = self.inner.write().await;
        let removed: Vec<NodeId> = state.peers.drain().map(|(id, _)| id).collect();
        for id in &removed {
            state.ring.remove_node(id);
        }
        removed
    }

    /// Flips the liveness of a known peer. Unknown peers are ignored; the
    /// prober may race a REMOVE and must not resurrect a deleted entry.
    pub async fn mark(&self, id: &NodeId, status: PeerStatus) {
        let mut state = self.inner.write().await;
        if let Some(entry) = state.peers.get_mut(id) {
            *entry = status;
        }
    }

    /// Records a peer that sent us a heartbeat as Up, inserting it if it was
    /// unknown. This is how a node that missed a JOIN broadcast learns the
    /// sender exists.
    pub async fn observe_up(&self, id: NodeId) {
        if id == self.local {
            return;
        }
        let mut state = self.inner.write().await;
        match state.peers.get_mut(&id) {
            Some(status) => *status = PeerStatus::Up,
            None => {
                info!("Discovered node {} via heartbeat", id);
                state.ring.add_node(&id);
                state.peers.insert(id, PeerStatus::Up);
            }
        }
    }

    /// True when every known peer is Up. Vacuously true with no peers.
    pub async fn all_up(&self) -> bool {
        let state = self.inner.read().await;
        state.peers.values().all(|status| status.is_up())
    }
}
