//! A single named topic and its subscriber registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use tracing::trace;

/// A subscriber callback. Invoked on the dispatcher thread for every
/// message published to the topic.
pub type Subscriber<M> = Box<dyn Fn(&M) + Send + Sync>;

/// A named topic holding the callbacks subscribed to it.
pub struct Topic<M> {
    name: String,
    clients: RwLock<HashMap<String, Subscriber<M>>>,
    delivered: AtomicU64,
    closed: AtomicBool,
}

impl<M> Topic<M> {
    /// Create an empty topic.
    pub fn new(name: &str) -> Topic<M> {
        Topic {
            name: name.to_string(),
            clients: RwLock::new(HashMap::new()),
            delivered: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    // === Public Methods ===

    /// The topic name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a callback under `client_id`, replacing any callback already
    /// registered under the same id.
    pub fn add_client(&self, client_id: &str, callback: Subscriber<M>) {
        let mut clients = self.clients.write().unwrap_or_else(PoisonError::into_inner);
        clients.insert(client_id.to_string(), callback);
    }

    /// Drop the callback registered under `client_id` and return how many
    /// clients remain.
    pub fn remove_client(&self, client_id: &str) -> usize {
        let mut clients = self.clients.write().unwrap_or_else(PoisonError::into_inner);
        clients.remove(client_id);
        clients.len()
    }

    /// Number of registered clients.
    pub fn client_count(&self) -> usize {
        self.clients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Deliver a message to every registered client. Returns `false` without
    /// delivering if the topic is closed.
    pub fn notify(&self, message: &M) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            return false;
        }

        let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
        for callback in clients.values() {
            callback(message);
        }
        self.delivered.fetch_add(1, Ordering::SeqCst);

        trace!(topic = self.name.as_str(), clients = clients.len(), "delivered message");

        true
    }

    /// Messages delivered to this topic so far.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::SeqCst)
    }

    /// Mark the topic closed; later [Topic::notify] calls become no-ops.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl<M> std::fmt::Debug for Topic<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Topic")
            .field("name", &self.name)
            .field("clients", &self.client_count())
            .field("delivered", &self.delivered())
            .finish()
    }
}
