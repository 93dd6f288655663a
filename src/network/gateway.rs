//! Gateway - TCP listener that accepts incoming control connections.
//!
//! The Gateway binds the configured address and spawns a Connection
//! task for each client.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info, instrument};

use crate::network::Connection;
use crate::network::client::ClientRegistry;
use crate::protocol::ProtocolStrategy;

/// The Gateway accepts incoming TCP connections and spawns handlers.
pub struct Gateway {
    listener: TcpListener,
    strategy: Arc<ProtocolStrategy>,
    clients: Arc<ClientRegistry>,
}

impl Gateway {
    /// Bind the gateway to the specified address.
    pub async fn bind(
        addr: SocketAddr,
        strategy: Arc<ProtocolStrategy>,
        clients: Arc<ClientRegistry>,
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "Listener bound");
        Ok(Self { listener, strategy, clients })
    }

    /// Run the gateway, accepting connections forever.
    #[instrument(skip(self), name = "gateway")]
    pub async fn run(self) -> anyhow::Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    info!(%addr, "Connection accepted");

                    let strategy = Arc::clone(&self.strategy);
                    let clients = Arc::clone(&self.clients);
                    let id = clients.next_id();

                    tokio::spawn(async move {
                        let connection = Connection::new(id, stream, addr, strategy, clients);
                        if let Err(e) = connection.run().await {
                            error!(client = id, %addr, error = %e, "Connection error");
                        }
                        info!(client = id, %addr, "Connection closed");
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}
