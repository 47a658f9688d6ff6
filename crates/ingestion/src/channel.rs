//! Bounded hand-off buffer between ingestion and processing
//!
//! `push` is wait-free and evicts the oldest entry at capacity, so a stalled
//! consumer costs stale records, never a stalled serial reader.

use std::time::Duration;

use async_channel::{Receiver, Sender};

/// Default hand-off capacity
pub const DEFAULT_CHANNEL_CAPACITY: usize = 10;

/// Result of a push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Queued without eviction
    Queued,
    /// Queued after evicting the oldest entry
    EvictedOldest,
    /// Channel closed, item dropped
    Closed,
}

/// Result of a bounded wait
#[derive(Debug, PartialEq, Eq)]
pub enum Popped<T> {
    Item(T),
    /// Nothing arrived before the timeout
    Empty,
    /// Closed and fully drained
    Closed,
}

/// Fixed-capacity MPMC FIFO with drop-oldest backpressure
///
/// Cloning yields another handle to the same queue.
#[derive(Debug)]
pub struct BoundedChannel<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> Clone for BoundedChannel<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
        }
    }
}

impl<T> BoundedChannel<T> {
    /// Create a channel; a capacity of 0 is raised to 1
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = async_channel::bounded(capacity.max(1));
        Self { tx, rx }
    }

    /// Insert, evicting the oldest entry when full. Never waits.
    pub fn push(&self, item: T) -> PushOutcome {
        match self.tx.force_send(item) {
            Ok(None) => PushOutcome::Queued,
            Ok(Some(_evicted)) => PushOutcome::EvictedOldest,
            Err(_) => PushOutcome::Closed,
        }
    }

    /// Wait for the next item; `None` once closed and drained
    pub async fn pop(&self) -> Option<T> {
        self.rx.recv().await.ok()
    }

    /// Wait at most `timeout` for the next item
    pub async fn pop_timeout(&self, timeout: Duration) -> Popped<T> {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Ok(item)) => Popped::Item(item),
            Ok(Err(_)) => Popped::Closed,
            Err(_) => Popped::Empty,
        }
    }

    /// Take an item if one is queued
    pub fn try_pop(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Stop accepting items and wake all waiters. Queued items stay poppable.
    ///
    /// Returns `true` if this call closed the channel.
    pub fn close(&self) -> bool {
        self.tx.close()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.tx.capacity().unwrap_or(usize::MAX)
    }
}
