//! Duplicate function call suppression.
//!
//! A [Group] makes sure only one execution is in flight for a given key at a
//! time. Callers that arrive while the leader is still running block until
//! it finishes and receive a clone of its value instead of executing
//! themselves. Typical use: collapsing a thundering herd of identical cache
//! fills into one backend hit.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, PoisonError};

#[derive(Debug, Default)]
struct Call<T> {
    value: Mutex<Option<T>>,
    done: Condvar,
}

/// A namespace of suppressible work, keyed by string.
///
/// The value type must be `Clone` so every waiter can take a copy; wrap
/// expensive payloads in `Arc`, and use a `Result` value type to share
/// failures with waiters too.
#[derive(Debug, Default)]
pub struct Group<T> {
    calls: Mutex<HashMap<String, Arc<Call<T>>>>,
}

impl<T: Clone> Group<T> {
    /// Create an empty group.
    pub fn new() -> Group<T> {
        Group {
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Execute `f`, unless another call with the same key is already in
    /// flight, in which case block until it completes and return a clone of
    /// its value.
    ///
    /// The key is forgotten once the leader finishes, so a later call with
    /// the same key executes again.
    pub fn run<F>(&self, key: &str, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        let call = {
            let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);

            if let Some(existing) = calls.get(key) {
                let existing = existing.clone();
                drop(calls);
                return Self::wait(&existing);
            }

            let call = Arc::new(Call {
                value: Mutex::new(None),
                done: Condvar::new(),
            });
            calls.insert(key.to_string(), call.clone());
            call
        };

        let value = f();

        {
            let mut slot = call.value.lock().unwrap_or_else(PoisonError::into_inner);
            *slot = Some(value.clone());
        }
        call.done.notify_all();

        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);

        value
    }

    fn wait(call: &Call<T>) -> T {
        let mut slot = call.value.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(value) = slot.as_ref() {
                return value.clone();
            }
            slot = call
                .done
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}
