use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::cluster::forward;
use crate::command::dispatcher::{Dispatcher, Outcome};
use crate::protocol::frame;

/// One client session: read a framed request, dispatch, write the reply,
/// repeat until EOF. The stream is dropped (and so closed) on every exit
/// path.
pub async fn handle(stream: TcpStream, dispatcher: Arc<Dispatcher>) -> Result<()> {
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    loop {
        let request = match frame::read_request(&mut reader).await {
            Ok(Some(request)) => request,
            Ok(None) => return Ok(()),
            Err(e) => {
                // After a framing error the stream position is unknown, so
                // answer once and end the session.
                let _ = writer.write_all(frame::ERR_UNSUPPORTED.as_bytes()).await;
                return Err(e);
            }
        };

        match dispatcher.dispatch(&request.args).await {
            Outcome::Finished(reply) => writer.write_all(reply.as_bytes()).await?,
            Outcome::NotFound => writer.write_all(frame::ERR_NOT_FOUND.as_bytes()).await?,
            Outcome::Unsupported => writer.write_all(frame::ERR_UNSUPPORTED.as_bytes()).await?,
            Outcome::Redirect(owner) => {
                let reply = forward::relay(&owner, &request.raw).await;
                writer.write_all(&reply).await?;
            }
        }
    }
}
