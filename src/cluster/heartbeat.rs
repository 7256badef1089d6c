use anyhow::{Context, Result, anyhow};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::types::Probe;
use crate::routing::table::RouteTable;
use crate::routing::types::{NodeId, PeerStatus};

const PROBE_TIMEOUT: Duration = Duration::from_secs(1);
const MAX_PROBE_BYTES: u64 = 1024;

/// Liveness detector: probes every peer at a fixed interval and listens for
/// inbound probes on the side endpoint.
pub struct HeartbeatService {
    table: Arc<RouteTable>,
    interval: Duration,
}

impl HeartbeatService {
    pub fn new(table: Arc<RouteTable>, interval: Duration) -> Arc<Self> {
        Arc::new(Self { table, interval })
    }

    /// Binds the probe listener and spawns its accept loop. The periodic
    /// prober is started separately, once the startup barrier has passed,
    /// so the barrier's own probing is the only probing running before then.
    pub async fn start_listener(self: Arc<Self>, listen_addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(listen_addr)
            .await
            .with_context(|| format!("failed to bind heartbeat listener on {}", listen_addr))?;
        info!("Heartbeat listener on {}", listener.local_addr()?);

        tokio::spawn(async move {
            self.listen_loop(listener).await;
        });

        Ok(())
    }

    /// Spawns the periodic prober.
    pub fn start_prober(self: Arc<Self>) {
        tokio::spawn(async move {
            self.probe_loop().await;
        });
    }

    async fn listen_loop(self: Arc<Self>, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, src)) => {
                    let table = self.table.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_probe(stream, &table).await {
                            debug!("Discarding bad probe from {}: {}", src, e);
                        }
                    });
                }
                Err(e) => {
                    warn!("Heartbeat accept failed: {}", e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }

    async fn probe_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            self.probe_cycle().await;
        }
    }

    /// Probes every peer once. Each probe is bounded, so a slow peer cannot
    /// pile up work across cycles.
    pub async fn probe_cycle(&self) {
        // Snapshot first; no lock is held while dialing.
        for peer in self.table.peer_ids().await {
            let status = match probe_peer(self.table.local(), &peer).await {
                Ok(()) => PeerStatus::Up,
                Err(e) => {
                    debug!("Probe to {} failed: {}", peer, e);
                    PeerStatus::Down
                }
            };
            self.table.mark(&peer, status).await;
        }
    }

    /// Startup barrier: probes until every currently known peer has been
    /// observed Up. Returns immediately when there are no peers.
    pub async fn wait_cluster_connected(&self) {
        loop {
            self.probe_cycle().await;
            if self.table.all_up().await {
                return;
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}

async fn probe_peer(local: &NodeId, peer: &NodeId) -> Result<()> {
    let addr = peer
        .heartbeat_addr()
        .ok_or_else(|| anyhow!("no heartbeat address derivable from {}", peer))?;
    let encoded = bincode::serialize(&Probe {
        from: local.clone(),
    })?;

    timeout(PROBE_TIMEOUT, async {
        let mut stream = TcpStream::connect(addr).await?;
        stream.write_all(&encoded).await?;
        stream.shutdown().await?;
        Ok::<_, anyhow::Error>(())
    })
    .await?
}

pub(crate) async fn handle_probe(stream: TcpStream, table: &RouteTable) -> Result<()> {
    let mut encoded = Vec::new();
    timeout(
        PROBE_TIMEOUT,
        stream.take(MAX_PROBE_BYTES).read_to_end(&mut encoded),
    )
    .await??;

    let probe: Probe = bincode::deserialize(&encoded)?;
    table.observe_up(probe.from).await;
    Ok(())
}
