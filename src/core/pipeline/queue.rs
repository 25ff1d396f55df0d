//! Bounded single-producer / single-consumer pipeline queues.
//!
//! A blocked `put` on a full queue is the pipeline's backpressure mechanism;
//! `drain` is its cancellation primitive. Queues are never closed during a
//! session — workers loop on `get` for the session's lifetime and are torn
//! down by their own cancellation tokens, not by queue closure.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;

/// Bounded FIFO queue connecting two pipeline stages.
///
/// The lock is only ever held for queue mutation, never across an await;
/// blocking `put`/`get` park on a [`Notify`] between attempts. With a single
/// producer and a single consumer the stored-permit semantics of `Notify`
/// make the wake-ups lossless.
pub struct PipelineQueue<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
    not_empty: Notify,
    not_full: Notify,
}

impl<T> PipelineQueue<T> {
    /// Create a queue holding at most `capacity` items.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be positive");
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            not_empty: Notify::new(),
            not_full: Notify::new(),
        }
    }

    /// Enqueue, waiting while the queue is full.
    pub async fn put(&self, item: T) {
        let mut item = Some(item);
        loop {
            {
                let mut items = self.items.lock();
                if items.len() < self.capacity {
                    if let Some(item) = item.take() {
                        items.push_back(item);
                    }
                    self.not_empty.notify_one();
                    return;
                }
            }
            self.not_full.notified().await;
        }
    }

    /// Enqueue without waiting; returns the item back when the queue is full.
    pub fn try_put(&self, item: T) -> Result<(), T> {
        let mut items = self.items.lock();
        if items.len() < self.capacity {
            items.push_back(item);
            self.not_empty.notify_one();
            Ok(())
        } else {
            Err(item)
        }
    }

    /// Dequeue, waiting while the queue is empty.
    pub async fn get(&self) -> T {
        loop {
            {
                let mut items = self.items.lock();
                if let Some(item) = items.pop_front() {
                    self.not_full.notify_one();
                    return item;
                }
            }
            self.not_empty.notified().await;
        }
    }

    /// Dequeue without waiting.
    pub fn try_get(&self) -> Option<T> {
        let mut items = self.items.lock();
        let item = items.pop_front();
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Remove and discard all pending items, returning how many were dropped.
    ///
    /// Space freed here wakes a producer blocked in [`put`](Self::put) the
    /// same way a normal `get` would; nothing else is signalled.
    pub fn drain(&self) -> usize {
        let mut items = self.items.lock();
        let dropped = items.len();
        items.clear();
        if dropped > 0 {
            self.not_full.notify_one();
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
