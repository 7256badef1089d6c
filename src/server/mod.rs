//! Client Service
//!
//! The TCP front door: accepts client connections and runs one session task
//! per connection. Sessions share the dispatcher (and through it the store
//! and the route table); a failed accept is logged and the loop keeps going.

pub mod connection;

use anyhow::Result;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::command::dispatcher::Dispatcher;


/// Accept loop. Runs until the listener itself fails fatally (it does not:
/// per-connection errors are contained in their session task).
pub async fn run(listener: TcpListener, dispatcher: Arc<Dispatcher>) -> Result<()> {
    info!("Start service on {}", listener.local_addr()?);

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    if let Err(e) = connection::handle(stream, dispatcher).await {
                        warn!("Session with {} ended: {}", peer, e);
                    }
                });
            }
            Err(e) => {
                warn!("Accept failed: {}", e);
            }
        }
    }
}
