use anyhow::Result;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::error;

use crate::protocol::frame;
use crate::routing::types::NodeId;

/// Bound on dialing plus the full request/reply exchange with a peer, so a
/// slow owner cannot strand the client handler that is waiting on the relay.
pub const FORWARD_TIMEOUT: Duration = Duration::from_secs(3);

/// Relays the raw request bytes to the owning node and returns its reply
/// unchanged. Any failure yields the synthetic unreachable-node error reply;
/// there are no retries.
pub async fn relay(owner: &NodeId, raw: &[u8]) -> Vec<u8> {
    match timeout(FORWARD_TIMEOUT, exchange(owner, raw)).await {
        Ok(Ok(reply)) => reply,
        Ok(Err(e)) => {
            error!("Forward to {} failed: {}", owner, e);
            frame::ERR_UNREACHABLE.as_bytes().to_vec()
        }
        Err(_) => {
            error!("Forward to {} timed out", owner);
            frame::ERR_UNREACHABLE.as_bytes().to_vec()
        }
    }
}

async fn exchange(owner: &NodeId, raw: &[u8]) -> Result<Vec<u8>> {
    let stream = TcpStream::connect(owner.as_str()).await?;
    let (read_half, mut write_half) = stream.into_split();
    write_half.write_all(raw).await?;

    let mut reader = BufReader::new(read_half);
    let mut reply = Vec::new();
    frame::read_reply(&mut reader, &mut reply).await?;
    Ok(reply)
}

/// Best-effort one-way send used by the JOIN/REMOVE broadcast. The peer's
/// reply is deliberately discarded.
pub async fn send_discard(peer: &NodeId, raw: &[u8]) -> Result<()> {
    timeout(FORWARD_TIMEOUT, async {
        let mut stream = TcpStream::connect(peer.as_str()).await?;
        stream.write_all(raw).await?;
        Ok::<_, anyhow::Error>(())
    })
    .await?
}
