//! Session manager for tracking all connected dashboard clients

use super::connection::ClientHandle;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::info;

/// Manages all active dashboard client sessions
pub struct SessionManager {
    /// Map of client_id -> handle
    clients: RwLock<HashMap<u64, ClientHandle>>,
    next_id: AtomicU64,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Allocate the next client id
    pub fn next_client_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Register a new client session
    pub async fn register(&self, handle: ClientHandle) {
        let mut clients = self.clients.write().await;
        clients.insert(handle.client_id, handle);
    }

    /// Unregister a client session. A disconnect is not an error; the
    /// broadcaster simply stops seeing this client.
    pub async fn unregister(&self, client_id: u64) {
        let mut clients = self.clients.write().await;
        if clients.remove(&client_id).is_some() {
            info!(client = client_id, "client session removed");
        }
    }

    /// Push a frame to every connected client, skipping any whose queue
    /// is full. Never blocks; no agent lock is held here.
    pub async fn broadcast(&self, frame: Bytes) -> usize {
        let clients = self.clients.read().await;
        clients
            .values()
            .filter(|handle| handle.push(frame.clone()))
            .count()
    }

    /// Get the number of connected clients
    pub async fn count(&self) -> usize {
        self.clients.read().await.len()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
