//! Consistent-hash ring over node identities.
//!
//! Each identity contributes a configurable number of virtual tokens so the
//! keyspace splits evenly even with a handful of nodes. Lookup hashes the key
//! and walks to the first token with an equal or greater hash, wrapping
//! around the ring.
//!
//! The same CRC-32 is used for ring placement and for shard selection in the
//! local store, so a key is hashed once per concern with one stable function
//! that every node computes identically.

use super::types::NodeId;

/// Virtual tokens each identity contributes to the ring.
pub const DEFAULT_REPLICAS: usize = 20;

/// Stable 32-bit hash shared by ring lookup and shard selection.
pub fn hash_key(key: &str) -> u32 {
    crc32fast::hash(key.as_bytes())
}

#[derive(Debug, Clone)]
pub struct Ring {
    replicas: usize,
    /// Sorted by (hash, identity); the identity tie-break keeps lookup
    /// deterministic across nodes when two tokens collide on a hash.
    tokens: Vec<(u32, NodeId)>,
}

impl Ring {
    pub fn new(replicas: usize) -> Self {
        Self {
            replicas: replicas.max(1),
            tokens: Vec::new(),
        }
    }

    /// Adds every virtual token for `id`. Idempotent.
    pub fn add_node(&mut self, id: &NodeId) {
        if self.contains(id) {
            return;
        }
        for replica in 0..self.replicas {
            let hash = hash_key(&format!("{}#{}", id.0, replica));
            self.tokens.push((hash, id.clone()));
        }
        self.tokens
            .sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    }

    /// Removes every token belonging to `id`. Idempotent.
    pub fn remove_node(&mut self, id: &NodeId) {
        self.tokens.retain(|(_, node)| node != id);
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.tokens.iter().any(|(_, node)| node == id)
    }

    /// The node owning `key`, or `None` for an empty ring.
    pub fn owner_of(&self, key: &str) -> Option<&NodeId> {
        if self.tokens.is_empty() {
            return None;
        }
        let hash = hash_key(key);
        let idx = self.tokens.partition_point(|(token, _)| *token < hash);
        let (_, owner) = &self.tokens[idx % self.tokens.len()];
        Some(owner)
    }
}
