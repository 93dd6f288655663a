//! Connection - one task per connected control client.
//!
//! The read half frames `\r\n`-delimited lines and feeds them to the
//! Protocol Strategy; a writer task drains the client's outbound queue
//! so slow sockets never block command execution. The connection's
//! [`Client`] handle is registered process-wide for its lifetime, and
//! dropping it on teardown releases everything bound to the connection
//! (channel locks included).

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing::{debug, instrument, warn};

use crate::network::client::{Client, ClientId, ClientRegistry, Outbound};
use crate::protocol::{BatchState, ProtocolStrategy};

/// Longest accepted command line; DATA STORE payloads can be sizeable.
const MAX_LINE_LENGTH: usize = 64 * 1024;

/// A client connection handler.
pub struct Connection {
    id: ClientId,
    addr: SocketAddr,
    stream: TcpStream,
    strategy: Arc<ProtocolStrategy>,
    clients: Arc<ClientRegistry>,
}

impl Connection {
    pub fn new(
        id: ClientId,
        stream: TcpStream,
        addr: SocketAddr,
        strategy: Arc<ProtocolStrategy>,
        clients: Arc<ClientRegistry>,
    ) -> Self {
        Self { id, addr, stream, strategy, clients }
    }

    /// Run the connection until the peer hangs up or a disconnect is
    /// requested.
    #[instrument(skip(self), fields(client = self.id, addr = %self.addr), name = "connection")]
    pub async fn run(self) -> anyhow::Result<()> {
        let (client, outbound) = Client::new(self.id, self.addr);
        self.clients.insert(Arc::clone(&client));

        let (read_half, write_half) = self.stream.into_split();
        let writer = tokio::spawn(write_loop(write_half, outbound));

        let mut lines = FramedRead::new(
            read_half,
            LinesCodec::new_with_max_length(MAX_LINE_LENGTH),
        );
        let mut batch = BatchState::new();

        loop {
            tokio::select! {
                line = lines.next() => match line {
                    Some(Ok(line)) => {
                        self.strategy.parse(&client, &line, &mut batch);
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Dropping connection on framing error");
                        break;
                    }
                    None => {
                        debug!("Peer closed the connection");
                        break;
                    }
                },
                _ = client.closed() => {
                    debug!("Disconnect requested");
                    break;
                }
            }
        }

        self.clients.remove(self.id);
        // Last handle: dropping it releases held channel locks and ends
        // the writer once queued replies are flushed.
        client.disconnect();
        drop(client);
        let _ = writer.await;
        Ok(())
    }
}

/// Drain the outbound queue onto the socket, flushing each reply.
async fn write_loop(mut socket: OwnedWriteHalf, mut outbound: mpsc::UnboundedReceiver<Outbound>) {
    while let Some(message) = outbound.recv().await {
        match message {
            Outbound::Line(line) => {
                if socket.write_all(line.as_bytes()).await.is_err() {
                    break;
                }
                if socket.flush().await.is_err() {
                    break;
                }
            }
            Outbound::Close => break,
        }
    }
    let _ = socket.shutdown().await;
}
