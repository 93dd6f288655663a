//! Per-channel lock containers.
//!
//! A lock container grants or denies command execution on its resource.
//! Once a client acquires the lock with a phrase, only connections that
//! supplied the same phrase hold it; everyone else is denied until the
//! last holder disconnects or releases. Holder membership is tied to the
//! connection through an RAII guard attached under the container's
//! lifecycle key, so a dropped connection always releases its hold.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::debug;

use crate::network::client::{Client, ClientId};

struct LockState {
    phrase: Option<String>,
    holders: HashMap<ClientId, Weak<Client>>,
}

/// Lock container for one lockable resource (one per channel).
///
/// Invariant: `phrase` is `Some` exactly when `holders` is non-empty;
/// both are cleared together under the same exclusive section.
pub struct LockContainer {
    lifecycle_key: String,
    state: Mutex<LockState>,
}

/// RAII guard attached to a holding connection; dropping it removes the
/// connection from the holder set.
struct ReleaseGuard {
    container: Arc<LockContainer>,
    id: ClientId,
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.container.release(self.id);
    }
}

impl LockContainer {
    pub fn new(lifecycle_key: String) -> Self {
        Self {
            lifecycle_key,
            state: Mutex::new(LockState { phrase: None, holders: HashMap::new() }),
        }
    }

    /// True when no lock is set or `client` is among the holders.
    pub fn check_access(&self, client: &Client) -> bool {
        let state = self.state.lock();
        state.phrase.is_none() || state.holders.contains_key(&client.id())
    }

    /// Acquire or join the lock. Succeeds when no phrase is set yet or
    /// the supplied phrase matches; registration is idempotent. An empty
    /// phrase never locks anything.
    pub fn try_lock(self: &Arc<Self>, phrase: &str, client: &Arc<Client>) -> bool {
        if phrase.is_empty() {
            return true;
        }

        let newly_registered = {
            let mut state = self.state.lock();
            if let Some(current) = &state.phrase {
                if current != phrase {
                    return false;
                }
            } else {
                state.phrase = Some(phrase.to_owned());
            }
            state
                .holders
                .insert(client.id(), Arc::downgrade(client))
                .is_none()
        };

        if newly_registered {
            debug!(key = %self.lifecycle_key, client = client.id(), "Lock acquired");
            client.attach_lifecycle(
                &self.lifecycle_key,
                Box::new(ReleaseGuard { container: Arc::clone(self), id: client.id() }),
            );
        }

        true
    }

    /// Explicit release by the holding connection.
    pub fn release_lock(&self, client: &Client) {
        // Dropping the guard performs the actual removal.
        client.detach_lifecycle(&self.lifecycle_key);
    }

    /// Clear the lock entirely: phrase and holder set go together, then
    /// surviving connections are told to drop their guards outside the
    /// exclusive section (the guard's cleanup re-enters `release`).
    pub fn clear_locks(&self) {
        let holders: Vec<Weak<Client>> = {
            let mut state = self.state.lock();
            state.phrase = None;
            state.holders.drain().map(|(_, weak)| weak).collect()
        };

        for weak in holders {
            if let Some(client) = weak.upgrade() {
                client.detach_lifecycle(&self.lifecycle_key);
            }
        }
        debug!(key = %self.lifecycle_key, "Locks cleared");
    }

    fn release(&self, id: ClientId) {
        let mut state = self.state.lock();
        if state.holders.remove(&id).is_some() && state.holders.is_empty() {
            state.phrase = None;
            debug!(key = %self.lifecycle_key, "Last holder gone, lock released");
        }
    }

    #[cfg(test)]
    fn holder_count(&self) -> usize {
        self.state.lock().holders.len()
    }
}
