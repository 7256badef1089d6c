use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use distributed_cache::cluster::heartbeat::HeartbeatService;
use distributed_cache::command::dispatcher::Dispatcher;
use distributed_cache::config::Config;
use distributed_cache::routing::table::RouteTable;
use distributed_cache::server;
use distributed_cache::storage::memory::ShardedStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = Config::parse();
    info!("Starting node on {}", config.address);

    let table = Arc::new(RouteTable::new(
        config.local_id(),
        config.peer_ids(),
        config.replicas,
    ));
    let store = Arc::new(ShardedStore::new(config.shards));
    let dispatcher = Arc::new(Dispatcher::new(store, table.clone()));

    let heartbeat = HeartbeatService::new(table.clone(), config.heartbeat_interval());
    heartbeat.clone().start_listener(config.heartbeat_addr()?).await?;
    info!("Heartbeat monitor start...");

    // Routing decisions made before the peer set is reachable would redirect
    // clients to unreachable nodes, so hold the door until everyone answers.
    info!("Wait for all nodes connected");
    heartbeat.wait_cluster_connected().await;
    for (peer, status) in table.snapshot().await {
        if status.is_up() {
            info!("Connecting to node {} OK", peer);
        }
    }
    info!("Create cluster success...");

    // Hand probing over to the periodic sender now that the barrier is done.
    heartbeat.clone().start_prober();

    let listener = TcpListener::bind(&config.address).await?;
    info!("Start service...");
    server::run(listener, dispatcher).await
}
