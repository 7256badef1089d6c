use std::sync::Arc;
use tracing::{info, warn};

use crate::cluster::forward;
use crate::protocol::frame;
use crate::routing::table::RouteTable;
use crate::routing::types::NodeId;
use crate::storage::memory::ShardedStore;

/// What the connection handler must do with a dispatched command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The reply is authoritative; send it as-is.
    Finished(String),
    /// GET miss.
    NotFound,
    /// Verb unrecognized or arity wrong.
    Unsupported,
    /// The key is owned by another node; forward the raw request there.
    Redirect(NodeId),
}

pub struct Dispatcher {
    store: Arc<ShardedStore>,
    table: Arc<RouteTable>,
}

impl Dispatcher {
    pub fn new(store: Arc<ShardedStore>, table: Arc<RouteTable>) -> Self {
        Self { store, table }
    }

    /// Runs one command. The verb is case-insensitive; a known verb with the
    /// wrong number of arguments falls through to `Unsupported`.
    pub async fn dispatch(&self, args: &[String]) -> Outcome {
        let verb = match args.first() {
            Some(verb) => verb.to_ascii_uppercase(),
            None => return Outcome::Unsupported,
        };

        match verb.as_str() {
            "PING" if args.len() == 1 => Outcome::Finished(frame::simple_string("PONG")),
            "SET" if args.len() == 3 => self.handle_set(&args[1], &args[2]).await,
            "GET" if args.len() == 2 => self.handle_get(&args[1]).await,
            "INFO" if args.len() == 1 => self.handle_info().await,
            "JOIN" if args.len() == 2 => self.handle_join(&args[1]).await,
            "REMOVE" if args.len() == 2 => self.handle_remove(&args[1]).await,
            _ => Outcome::Unsupported,
        }
    }

    /// `Some(owner)` when `key` belongs to another node.
    async fn owned_elsewhere(&self, key: &str) -> Option<NodeId> {
        let owner = self.table.owner_of(key).await;
        (owner != *self.table.local()).then_some(owner)
    }

    async fn handle_set(&self, key: &str, value: &str) -> Outcome {
        if let Some(owner) = self.owned_elsewhere(key).await {
            return Outcome::Redirect(owner);
        }
        self.store.set(key.to_string(), value.to_string()).await;
        Outcome::Finished(frame::simple_string("OK"))
    }

    async fn handle_get(&self, key: &str) -> Outcome {
        if let Some(owner) = self.owned_elsewhere(key).await {
            return Outcome::Redirect(owner);
        }
        match self.store.get(key).await {
            Some(value) => Outcome::Finished(frame::bulk_string(&value)),
            None => Outcome::NotFound,
        }
    }

    /// Array of |peers|+1 entries: a header bulk string, then one line per
    /// peer. Encoded in one locked pass so the view cannot tear.
    async fn handle_info(&self) -> Outcome {
        let reply = self
            .table
            .with_peers(|peers| {
                let mut reply = frame::array_header(peers.len() + 1);
                reply.push_str(&frame::bulk_string("Connect status:"));
                for (peer, status) in peers {
                    reply.push_str(&frame::bulk_string(&format!("{}: {}", peer, status)));
                }
                reply
            })
            .await;
        Outcome::Finished(reply)
    }

    /// Adds a node to the cluster and gossips the addition to every peer
    /// that predates it. The reply tells the joining node the full peer set
    /// it is missing.
    async fn handle_join(&self, addr: &str) -> Outcome {
        // Snapshot and encode in one critical section; the broadcast below
        // dials with the lock released.
        let (reply, peers) = self
            .table
            .with_peers(|peers| {
                let mut reply = frame::array_header(peers.len() + 1);
                reply.push_str(&frame::bulk_string("OK"));
                for peer in peers.keys() {
                    reply.push_str(&frame::bulk_string(peer.as_str()));
                }
                let ids: Vec<NodeId> = peers.keys().cloned().collect();
                (reply, ids)
            })
            .await;

        let request = frame::command(&["JOIN", addr]);
        for peer in &peers {
            if let Err(e) = forward::send_discard(peer, request.as_bytes()).await {
                warn!("JOIN broadcast to {} failed: {}", peer, e);
            }
        }

        let joining = NodeId(addr.to_string());
        if self.table.add_peer(joining.clone()).await {
            info!("Add {} to route table", joining);
        }

        Outcome::Finished(reply)
    }

    /// Removes a node cluster-wide. Receiving our own address means the
    /// cluster is dropping us: forget every peer and keep serving only what
    /// the local ring still covers.
    async fn handle_remove(&self, addr: &str) -> Outcome {
        let target = NodeId(addr.to_string());
        let peers = self.table.peer_ids().await;

        let request = frame::command(&["REMOVE", addr]);
        for peer in &peers {
            if let Err(e) = forward::send_discard(peer, request.as_bytes()).await {
                warn!("REMOVE broadcast to {} failed: {}", peer, e);
            }
        }

        if target == *self.table.local() {
            for peer in self.table.clear_peers().await {
                info!("Remove {} from route table", peer);
            }
        } else if self.table.remove_peer(&target).await {
            info!("Remove {} from route table", target);
        }

        Outcome::Finished(frame::simple_string("OK"))
    }
}
