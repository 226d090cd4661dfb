//! Closure-wrapping thread completion barrier.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;

#[derive(Debug, Default)]
struct Inner {
    count: Mutex<usize>,
    all_done: Condvar,
}

/// Tracks a set of spawned closures and blocks until all of them return.
///
/// Clones share the same underlying count, so one handle can spawn work
/// while another waits for it.
#[derive(Debug, Clone, Default)]
pub struct WaitGroup {
    inner: Arc<Inner>,
}

impl WaitGroup {
    /// Create an empty wait group.
    pub fn new() -> WaitGroup {
        WaitGroup::default()
    }

    /// Spawn `f` on a new thread and track it until it returns.
    pub fn wrap<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.add(1);

        let inner = self.inner.clone();
        thread::spawn(move || {
            f();
            inner.done();
        });
    }

    /// Block until every wrapped closure has returned.
    ///
    /// Returns immediately if nothing is in flight.
    pub fn wait(&self) {
        let mut count = self
            .inner
            .count
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while *count > 0 {
            count = self
                .inner
                .all_done
                .wait(count)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn add(&self, n: usize) {
        let mut count = self
            .inner
            .count
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *count += n;
    }
}

impl Inner {
    fn done(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        *count -= 1;
        if *count == 0 {
            self.all_done.notify_all();
        }
    }
}
