// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Bounded event queue between producers and the delivery worker.
//!
//! Producers on any thread push without blocking; the single consumer awaits
//! entries and can be cancelled while waiting. When full, the oldest entry is
//! evicted to make room, so recent lines win over old ones.
//!
//! Every queue is also recorded, weakly, in a process-wide registry that only
//! serves [`are_all_queues_empty`].

use crate::constants::FLUSH_POLL_INTERVAL;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub struct EventQueue {
    entries: Mutex<VecDeque<String>>,
    capacity: usize,
    available: Notify,
}

impl EventQueue {
    /// Creates a queue holding at most `capacity` entries (at least one) and
    /// registers it in the process-wide registry.
    #[must_use]
    pub fn new(capacity: usize) -> Arc<Self> {
        let capacity = capacity.max(1);
        let queue = Arc::new(Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1_024))),
            capacity,
            available: Notify::new(),
        });
        lock(registry()).push(Arc::downgrade(&queue));
        queue
    }

    /// Appends `entry` unless the queue is full, in which case it is handed back.
    pub fn try_enqueue(&self, entry: String) -> Result<(), String> {
        {
            let mut entries = lock(&self.entries);
            if entries.len() >= self.capacity {
                return Err(entry);
            }
            entries.push_back(entry);
        }
        self.available.notify_one();
        Ok(())
    }

    /// Appends `entry`, evicting the oldest entry first if the queue is full.
    ///
    /// Returns the evicted entry, if any.
    pub fn enqueue_or_evict(&self, entry: String) -> Option<String> {
        let evicted = {
            let mut entries = lock(&self.entries);
            let evicted = if entries.len() >= self.capacity {
                entries.pop_front()
            } else {
                None
            };
            entries.push_back(entry);
            evicted
        };
        self.available.notify_one();
        evicted
    }

    /// Removes the oldest entry without waiting.
    pub fn try_dequeue(&self) -> Option<String> {
        lock(&self.entries).pop_front()
    }

    /// Waits for the oldest entry.
    ///
    /// Returns `None` once `cancel` is triggered.
    pub async fn dequeue(&self, cancel: &CancellationToken) -> Option<String> {
        loop {
            // Registered before the check so a push in between is not missed.
            let notified = self.available.notified();
            if let Some(entry) = self.try_dequeue() {
                return Some(entry);
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                _ = notified => {}
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// Append-only: entries are never removed, dropped queues just stop upgrading.
fn registry() -> &'static Mutex<Vec<Weak<EventQueue>>> {
    static REGISTRY: OnceLock<Mutex<Vec<Weak<EventQueue>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(Vec::new()))
}

fn all_empty(queues: &[Weak<EventQueue>]) -> bool {
    queues
        .iter()
        .filter_map(Weak::upgrade)
        .all(|queue| queue.is_empty())
}

/// Waits up to `wait` for every queue in the process to be empty.
///
/// Polls every 100ms. Returns whether all queues were empty at the last check.
/// An empty queue only means its entries were taken by a worker, not that
/// they were written.
#[must_use]
pub fn are_all_queues_empty(wait: Duration) -> bool {
    let deadline = Instant::now() + wait;
    loop {
        let snapshot: Vec<Weak<EventQueue>> = lock(registry()).clone();
        if all_empty(&snapshot) {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        std::thread::sleep(FLUSH_POLL_INTERVAL.min(deadline - now));
    }
}
