use std::collections::VecDeque;

/// Bounded FIFO between the host and a receiver. Pushing into a full FIFO is
/// refused rather than overwriting the oldest byte.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RxFifo {
    items: VecDeque<u8>,
    capacity: usize,
    dropped: u64,
}

impl RxFifo {
    /// `capacity` is clamped to at least one slot.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    /// Bytes refused because the FIFO was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn push(&mut self, byte: u8) -> bool {
        if self.is_full() {
            self.dropped += 1;
            return false;
        }
        self.items.push_back(byte);
        true
    }

    pub fn peek(&self) -> Option<u8> {
        self.items.front().copied()
    }

    pub fn pop(&mut self) -> Option<u8> {
        self.items.pop_front()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
