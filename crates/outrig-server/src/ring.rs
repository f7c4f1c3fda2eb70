// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use tokio::sync::RwLock;

/// Fixed-capacity circular buffer of typed items, indexed by absolute
/// position since the ring's creation.
///
/// Generalizes the byte-oriented ring buffer this codebase uses for raw
/// PTY output to arbitrary cloneable items. Consumers address entries by absolute index
/// rather than a relative offset so a `SearchManager`'s filtered window
/// can keep pointing at the same logical entries across appends.
#[derive(Debug)]
pub struct RingBuffer<T> {
    inner: RwLock<Inner<T>>,
}

#[derive(Debug)]
struct Inner<T> {
    buf: Vec<Option<T>>,
    capacity: usize,
    /// Absolute index of the next slot that will be written.
    head: u64,
}

impl<T: Clone> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be positive");
        Self {
            inner: RwLock::new(Inner { buf: vec![None; capacity], capacity, head: 0 }),
        }
    }

    /// Append one item, returning its absolute index.
    pub async fn append(&self, item: T) -> u64 {
        let mut inner = self.inner.write().await;
        let idx = inner.head;
        let slot = (idx as usize) % inner.capacity;
        inner.buf[slot] = Some(item);
        inner.head += 1;
        idx
    }

    /// Total items ever appended, and the oldest absolute index still
    /// retained (`total_written - capacity`, floored at 0).
    pub async fn total_and_oldest(&self) -> (u64, u64) {
        let inner = self.inner.read().await;
        let oldest = inner.head.saturating_sub(inner.capacity as u64);
        (inner.head, oldest)
    }

    /// Every item still retained, oldest first.
    pub async fn get_all(&self) -> Vec<T> {
        let inner = self.inner.read().await;
        let oldest = inner.head.saturating_sub(inner.capacity as u64);
        (oldest..inner.head)
            .filter_map(|idx| inner.buf[(idx as usize) % inner.capacity].clone())
            .collect()
    }

    /// Items in `[start, end)` by absolute index. Indices outside the
    /// retained window are silently skipped rather than erroring, since a
    /// search window recomputed after eviction may reference indices that
    /// have since aged out.
    pub async fn get_range(&self, start: u64, end: u64) -> Vec<T> {
        let inner = self.inner.read().await;
        let oldest = inner.head.saturating_sub(inner.capacity as u64);
        let start = start.max(oldest);
        let end = end.min(inner.head);
        if start >= end {
            return Vec::new();
        }
        (start..end).filter_map(|idx| inner.buf[(idx as usize) % inner.capacity].clone()).collect()
    }

    pub async fn size(&self) -> usize {
        let inner = self.inner.read().await;
        inner.head.min(inner.capacity as u64) as usize
    }

    pub async fn is_empty(&self) -> bool {
        self.size().await == 0
    }
}

#[cfg(test)]
#[path = "ring_tests.rs"]
mod tests;
