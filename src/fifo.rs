//! Single-producer/single-consumer byte FIFO for the serial link.
//!
//! `tail` is only stored by the producer and `head` only by the consumer, each with one atomic
//! store, so an interrupt handler and the foreground loop can share a FIFO without locking. One
//! slot always stays empty to tell a full FIFO from an empty one.

// SPDX-License-Identifier: Apache-2.0

use core::fmt;
use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

/// Reasons a FIFO operation did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FifoError {
    /// `put` found no free slot
    Full,
    /// `get` found nothing to read
    Empty,
}

impl fmt::Display for FifoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FifoError::Full => write!(f, "FIFO is full"),
            FifoError::Empty => write!(f, "FIFO is empty"),
        }
    }
}

/// Byte FIFO with `N` slots, holding at most `N - 1` bytes
pub struct ByteFifo<const N: usize> {
    /// FIFO storage array
    slots: [AtomicU8; N],
    /// Index of the first item in the FIFO
    head: AtomicUsize,
    /// Index one step past the last item
    tail: AtomicUsize,
}

impl<const N: usize> ByteFifo<N> {
    /// Empty FIFO
    pub const fn new() -> Self {
        const { assert!(N >= 2, "FIFO needs at least 2 slots") };
        Self {
            slots: [const { AtomicU8::new(0) }; N],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    /// Maximum number of queued bytes
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Append a byte. Producer side only.
    pub fn put(&self, data: u8) -> Result<(), FifoError> {
        let tail = self.tail.load(Ordering::Relaxed);
        let next = (tail + 1) % N;
        if next == self.head.load(Ordering::Acquire) {
            return Err(FifoError::Full);
        }

        self.slots[tail].store(data, Ordering::Relaxed);
        self.tail.store(next, Ordering::Release);
        Ok(())
    }

    /// Remove the oldest byte. Consumer side only.
    pub fn get(&self) -> Result<u8, FifoError> {
        let head = self.head.load(Ordering::Relaxed);
        if head == self.tail.load(Ordering::Acquire) {
            return Err(FifoError::Empty);
        }

        let data = self.slots[head].load(Ordering::Relaxed);
        self.head.store((head + 1) % N, Ordering::Release);
        Ok(data)
    }

    /// Number of queued bytes, as seen from either side at this instant
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        (tail + N - head) % N
    }

    /// Nothing queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// No free slot
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }
}

impl<const N: usize> Default for ByteFifo<N> {
    fn default() -> Self {
        Self::new()
    }
}
