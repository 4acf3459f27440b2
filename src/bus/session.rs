//! Per-session bounded mailbox with latest-wins drop-on-full semantics
//! (spec section 4.6/9). Generalizes the teacher's `Channel<T>` wrapper
//! (`gameroom/channel.rs`) from a plain unbounded mpsc pair into a bounded
//! ring that a slow consumer can never grow without bound.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};

use crate::race::RaceSnapshot;

/// One entry in a session's outbound queue: either a race snapshot, or a
/// terminal fatal notice (spec section 7) that preempts everything queued
/// behind it.
#[derive(Debug, Clone)]
pub enum Delivery {
    Snapshot(Arc<RaceSnapshot>),
    Fatal(String),
}

/// A session's outbound queue. `push_snapshot` never blocks the
/// broadcaster: once full, the oldest queued snapshot is dropped in favor
/// of the newest. `push_fatal` drops everything queued and delivers only
/// the fatal notice, since nothing queued behind it still matters.
pub struct Mailbox {
    queue: Mutex<VecDeque<Delivery>>,
    capacity: usize,
    notify: Notify,
}

impl Mailbox {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
            notify: Notify::new(),
        }
    }

    /// Never blocks; drops the oldest entry rather than the newest.
    pub async fn push_snapshot(&self, snapshot: Arc<RaceSnapshot>) {
        let mut queue = self.queue.lock().await;
        if queue.len() >= self.capacity {
            queue.pop_front();
        }
        queue.push_back(Delivery::Snapshot(snapshot));
        drop(queue);
        self.notify.notify_one();
    }

    /// Clears anything queued and delivers only the fatal notice next.
    pub async fn push_fatal(&self, message: String) {
        let mut queue = self.queue.lock().await;
        queue.clear();
        queue.push_back(Delivery::Fatal(message));
        drop(queue);
        self.notify.notify_one();
    }

    /// Waits for and removes the oldest queued delivery, preserving
    /// increasing-`tick` delivery order within this session.
    pub async fn pop(&self) -> Delivery {
        loop {
            if let Some(delivery) = self.queue.lock().await.pop_front() {
                return delivery;
            }
            self.notify.notified().await;
        }
    }
}
