use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::routing::ring::hash_key;

/// In-memory store partitioned into independently locked shards.
///
/// The shard for a key is `hash(key) mod shard_count`, with the same CRC-32
/// the ring uses for ownership, so one stable function covers both concerns.
/// The shard count is fixed for the lifetime of the process.
pub struct ShardedStore {
    shards: Vec<RwLock<HashMap<String, String>>>,
}

impl ShardedStore {
    pub fn new(shard_count: usize) -> Self {
        let count = shard_count.max(1);
        Self {
            shards: (0..count).map(|_| RwLock::new(HashMap::new())).collect(),
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn shard_index(&self, key: &str) -> usize {
        hash_key(key) as usize % self.shards.len()
    }

    /// Writes under the shard's exclusive lock. A write to one shard never
    /// waits on traffic against any other shard.
    pub async fn set(&self, key: String, value: String) {
        let shard = &self.shards[self.shard_index(&key)];
        shard.write().await.insert(key, value);
    }

    /// Reads under the shard's shared lock.
    pub async fn get(&self, key: &str) -> Option<String> {
        let shard = &self.shards[self.shard_index(key)];
        shard.read().await.get(key).cloned()
    }
}
