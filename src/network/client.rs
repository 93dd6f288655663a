//! Client connection handles.
//!
//! A [`Client`] is the opaque per-connection handle the command
//! subsystem sees: it can send reply text, request a disconnect, and
//! carry lifecycle-bound objects (the lock release guards) that are
//! dropped with the connection.

use std::any::Any;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::{Notify, mpsc};
use tracing::trace;

/// Unique id of one client connection.
pub type ClientId = u64;

/// Outbound traffic to one connection's writer task.
pub enum Outbound {
    /// A complete reply line (already `\r\n`-terminated).
    Line(String),
    /// Close the connection after flushing.
    Close,
}

/// Handle to one connected control client.
///
/// Dropping the last `Arc<Client>` drops every lifecycle-bound object,
/// which is how channel locks release on disconnect.
pub struct Client {
    id: ClientId,
    addr: SocketAddr,
    tx: mpsc::UnboundedSender<Outbound>,
    closed: AtomicBool,
    close_signal: Notify,
    lifecycle: Mutex<HashMap<String, Box<dyn Any + Send>>>,
}

impl Client {
    /// Create a client handle plus the receiver its writer task drains.
    pub fn new(id: ClientId, addr: SocketAddr) -> (Arc<Self>, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = Arc::new(Self {
            id,
            addr,
            tx,
            closed: AtomicBool::new(false),
            close_signal: Notify::new(),
            lifecycle: Mutex::new(HashMap::new()),
        });
        (client, rx)
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Remote address, for log output.
    pub fn address(&self) -> SocketAddr {
        self.addr
    }

    /// Queue reply text for this connection. Sends to a disconnected
    /// client are silently dropped; scheduled commands may outlive
    /// their submitter.
    pub fn send(&self, text: String) {
        trace!(client = self.id, reply = %text.trim_end(), "Sending reply");
        let _ = self.tx.send(Outbound::Line(text));
    }

    /// Ask the connection to close after flushing queued replies.
    pub fn disconnect(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            let _ = self.tx.send(Outbound::Close);
            self.close_signal.notify_waiters();
        }
    }

    /// Whether a disconnect was requested.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Wait for a disconnect request.
    pub async fn closed(&self) {
        if self.is_closed() {
            return;
        }
        self.close_signal.notified().await;
    }

    /// Attach an object whose lifetime is bound to this connection.
    /// Replaces any object already attached under `key`.
    pub fn attach_lifecycle(&self, key: &str, object: Box<dyn Any + Send>) {
        self.lifecycle.lock().insert(key.to_owned(), object);
    }

    /// Drop the object attached under `key`, if any.
    pub fn detach_lifecycle(&self, key: &str) {
        // Drop outside the map lock: the object's destructor may call
        // back into code that takes other locks.
        let removed = self.lifecycle.lock().remove(key);
        drop(removed);
    }
}

/// Process-wide table of connected clients.
#[derive(Default)]
pub struct ClientRegistry {
    clients: DashMap<ClientId, Arc<Client>>,
    next_id: AtomicU64,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next connection id.
    pub fn next_id(&self) -> ClientId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn insert(&self, client: Arc<Client>) {
        self.clients.insert(client.id(), client);
    }

    /// Remove a client; the returned handle (and its lifecycle-bound
    /// objects) drops with the caller's last reference.
    pub fn remove(&self, id: ClientId) -> Option<Arc<Client>> {
        self.clients.remove(&id).map(|(_, c)| c)
    }

    /// Request disconnect of every connected client (server shutdown).
    pub fn disconnect_all(&self) {
        for entry in self.clients.iter() {
            entry.value().disconnect();
        }
    }
}
