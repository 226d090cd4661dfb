//! In-memory publish/subscribe fan-out.
//!
//! Messages are queued on a bounded channel and delivered by a dedicated
//! dispatcher thread, so [Pubsub::publish] returns without waiting for
//! subscribers (it only blocks when the queue itself is full). Topics are
//! created on first subscribe and dropped when their last client leaves.

mod topic;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, trace};

use crate::waitgroup::WaitGroup;

pub use topic::{Subscriber, Topic};

/// Default capacity of the publish queue.
pub const DEFAULT_QUEUE_DEPTH: usize = 1000;

type TopicMap<M> = Arc<RwLock<HashMap<String, Arc<Topic<M>>>>>;

enum Dispatch<M> {
    Publish(String, M),
    Shutdown,
}

/// A single-process subscription service.
///
/// Callbacks run on the dispatcher thread. A callback must not call
/// [Pubsub::unsubscribe] for its own topic synchronously; doing so blocks
/// the dispatcher on the topic's own client registry. Hand that work to
/// another thread instead.
pub struct Pubsub<M> {
    topics: TopicMap<M>,
    sender: flume::Sender<Dispatch<M>>,
    wg: WaitGroup,
    published: AtomicU64,
    closed: AtomicBool,
}

impl<M: Send + Sync + 'static> Pubsub<M> {
    /// Create a pubsub with the default queue depth.
    pub fn new() -> Pubsub<M> {
        Pubsub::with_queue_depth(DEFAULT_QUEUE_DEPTH)
    }

    /// Create a pubsub whose publish queue holds up to `depth` messages.
    pub fn with_queue_depth(depth: usize) -> Pubsub<M> {
        let (sender, receiver) = flume::bounded(depth);
        let topics: TopicMap<M> = Arc::new(RwLock::new(HashMap::new()));
        let wg = WaitGroup::new();

        let dispatch_topics = topics.clone();
        wg.wrap(move || dispatch(receiver, dispatch_topics));

        Pubsub {
            topics,
            sender,
            wg,
            published: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    // === Public Methods ===

    /// Subscribe `callback` to `topic` under `client_id`, creating the topic
    /// if it does not exist.
    ///
    /// Client ids must be unique per topic: re-subscribing with an id that is
    /// already registered replaces the earlier callback.
    pub fn subscribe<F>(&self, topic: &str, client_id: &str, callback: F)
    where
        F: Fn(&M) + Send + Sync + 'static,
    {
        let mut topics = self.topics.write().unwrap_or_else(PoisonError::into_inner);

        let topic = topics
            .entry(topic.to_string())
            .or_insert_with_key(|name| {
                debug!(topic = name.as_str(), "creating topic");
                Arc::new(Topic::new(name))
            });
        topic.add_client(client_id, Box::new(callback));
    }

    /// Remove `client_id` from `topic`. When the last client leaves, the
    /// topic is closed and dropped.
    pub fn unsubscribe(&self, topic: &str, client_id: &str) {
        let mut topics = self.topics.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = topics.get(topic) {
            if existing.remove_client(client_id) == 0 {
                existing.close();
                topics.remove(topic);
                debug!(topic, "dropped topic after last unsubscribe");
            }
        }
    }

    /// Queue a message for asynchronous delivery to `topic`'s subscribers.
    ///
    /// Returns `false` if the pubsub is closed (the message is dropped).
    /// Messages for topics nobody subscribed to are discarded silently.
    pub fn publish(&self, topic: &str, message: M) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            return false;
        }

        if self
            .sender
            .send(Dispatch::Publish(topic.to_string(), message))
            .is_err()
        {
            return false;
        }

        self.published.fetch_add(1, Ordering::SeqCst);
        true
    }

    /// Names of all live topics.
    pub fn topics(&self) -> Vec<String> {
        self.topics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Total messages accepted by [Pubsub::publish] so far.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::SeqCst)
    }

    /// Returns `true` once [Pubsub::close] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Shut down: stop accepting publishes, drain the queue, join the
    /// dispatcher, then close and drop every topic. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        // Queued messages ahead of the shutdown marker still get delivered.
        let _ = self.sender.send(Dispatch::Shutdown);
        self.wg.wait();

        let mut topics = self.topics.write().unwrap_or_else(PoisonError::into_inner);
        for topic in topics.values() {
            topic.close();
        }
        topics.clear();

        debug!("pubsub closed");
    }
}

impl<M: Send + Sync + 'static> Default for Pubsub<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> std::fmt::Debug for Pubsub<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pubsub")
            .field("published", &self.published.load(Ordering::SeqCst))
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}

fn dispatch<M: Send + Sync + 'static>(receiver: flume::Receiver<Dispatch<M>>, topics: TopicMap<M>) {
    for message in receiver.iter() {
        match message {
            Dispatch::Publish(name, body) => {
                let topic = topics
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .get(&name)
                    .cloned();

                match topic {
                    Some(topic) => {
                        topic.notify(&body);
                    }
                    None => trace!(topic = name.as_str(), "no subscribers, message dropped"),
                }
            }
            Dispatch::Shutdown => break,
        }
    }
}
