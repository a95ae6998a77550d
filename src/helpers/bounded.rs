//! Bounded deque used as the event history ring buffer
//!
//! Fixed capacity, oldest entry evicted first.

use std::collections::VecDeque;

/// A bounded deque with FIFO eviction policy
///
/// When the deque reaches its capacity, the oldest item is removed
/// (and handed back) when a new item is pushed.
#[derive(Clone, Debug)]
pub struct BoundedDeque<T> {
    cap: usize,
    buf: VecDeque<T>,
}

impl<T> BoundedDeque<T> {
    /// Create a new bounded deque with the specified capacity
    ///
    /// # Arguments
    /// * `cap` - Maximum number of items to store. If 0, push operations are no-ops.
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            buf: VecDeque::with_capacity(cap.min(1024)),
        }
    }

    /// Push a new value, returning the evicted oldest value when at capacity
    pub fn push(&mut self, value: T) -> Option<T> {
        if self.cap == 0 {
            return None;
        }
        let evicted = if self.buf.len() == self.cap {
            self.buf.pop_front()
        } else {
            None
        };
        self.buf.push_back(value);
        evicted
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.buf.iter()
    }

    /// The `n` most recent items, oldest first
    pub fn tail(&self, n: usize) -> impl Iterator<Item = &T> {
        self.buf.iter().skip(self.buf.len().saturating_sub(n))
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Convert to a Vec (clones all items)
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.buf.iter().cloned().collect()
    }
}

impl<T> Default for BoundedDeque<T> {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_HISTORY_CAPACITY)
    }
}
