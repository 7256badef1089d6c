//! Local Storage
//!
//! The node-local slice of the keyspace: a fixed array of shards, each an
//! independently locked string map. One global lock would serialize all
//! traffic and per-key locking has excessive overhead for small values, so a
//! fixed shard count amortizes the cost.

pub mod memory;
