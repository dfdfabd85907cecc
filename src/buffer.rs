//! Sample storage: the ADC ring buffer written by the sampling interrupt, the waveform window
//! copied out of it for consumers, and the trigger detector that picks where the window goes.

// SPDX-License-Identifier: Apache-2.0

use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicI16, AtomicU32, Ordering};

use crate::config::{ADC_OFFSET, TRIGGER_BUFFER_SIZE};

const _: () = assert!(TRIGGER_BUFFER_SIZE == 3);

/// Monotonic counter of samples written to an [`AdcBuffer`].
///
/// The counter wraps at [`u32::MAX`]. Since every buffer capacity is a power of two, the slot of a
/// sample is always `counter & (capacity - 1)`, wrap or not.
#[derive(Default, Debug, Eq, PartialEq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SampleCounter(u32);

impl SampleCounter {
    /// Counter at an absolute value
    pub const fn new(counter: u32) -> Self {
        Self(counter)
    }

    /// Get current counter value
    pub const fn get_counter(&self) -> u32 {
        self.0
    }

    /// Advance by one sample
    pub fn increment(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }

    /// Counter `rhs` samples later
    pub const fn wrapping_counter_add(&self, rhs: u32) -> SampleCounter {
        SampleCounter(self.0.wrapping_add(rhs))
    }

    /// Counter `rhs` samples earlier
    pub const fn wrapping_counter_sub(&self, rhs: u32) -> SampleCounter {
        SampleCounter(self.0.wrapping_sub(rhs))
    }

    /// Samples between `earlier` and this counter
    pub const fn distance_from(&self, earlier: SampleCounter) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }
}

impl fmt::Display for SampleCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed-capacity ring of signed ADC samples.
///
/// Only one context (the sampling interrupt) may call [`push`](Self::push). Any other context
/// may read concurrently: slots are atomics, and the write counter is published after the slot
/// it covers. A reader owns a coherent copy only if the writer stayed strictly less than `N`
/// samples ahead of the oldest slot it read, see [`is_intact`](Self::is_intact).
pub struct AdcBuffer<const N: usize> {
    /// Ring storage, indexed by the wrapped counter
    samples: [AtomicI16; N],
    /// Counter of the next sample to write
    written: AtomicU32,
    /// Every slot has been written at least once
    filled: AtomicBool,
}

impl<const N: usize> AdcBuffer<N> {
    /// Index wrapping mask. Fails to compile if `N` is not a power of two.
    const MASK: u32 = {
        assert!(N.is_power_of_two(), "AdcBuffer capacity must be a power of 2");
        assert!(N <= 1 << 16, "AdcBuffer capacity is too large");
        (N - 1) as u32
    };

    /// Zeroed buffer
    pub const fn new() -> Self {
        let _ = Self::MASK;
        Self {
            samples: [const { AtomicI16::new(0) }; N],
            written: AtomicU32::new(0),
            filled: AtomicBool::new(false),
        }
    }

    /// Number of slots
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Slot holding the sample at `index`
    pub const fn wrap(index: SampleCounter) -> usize {
        (index.0 & Self::MASK) as usize
    }

    /// Store a sample at the write index and advance it. Returns the new write index.
    ///
    /// Single writer only. Uses plain loads and stores, no read-modify-write atomics.
    pub fn push(&self, sample: i16) -> SampleCounter {
        let index = SampleCounter(self.written.load(Ordering::Relaxed));
        self.samples[Self::wrap(index)].store(sample, Ordering::Relaxed);

        let next = index.wrapping_counter_add(1);
        self.written.store(next.0, Ordering::Release);
        if next.0 == N as u32 {
            self.filled.store(true, Ordering::Release);
        }
        next
    }

    /// Counter of the next sample to be written
    pub fn write_index(&self) -> SampleCounter {
        SampleCounter(self.written.load(Ordering::Acquire))
    }

    /// True once `N` samples have been written
    pub fn is_filled(&self) -> bool {
        self.filled.load(Ordering::Acquire)
    }

    /// Sample at an absolute counter. Meaningful only while it has not been overwritten.
    pub fn get(&self, index: SampleCounter) -> i16 {
        self.samples[Self::wrap(index)].load(Ordering::Relaxed)
    }

    /// Sample `offset` writes back from the write index, `1` being the most recent
    pub fn recent(&self, offset: u32) -> i16 {
        self.get(self.write_index().wrapping_counter_sub(offset))
    }

    /// Copy `out.len()` consecutive samples starting at `start`
    pub fn copy_from(&self, start: SampleCounter, out: &mut [i16]) {
        let mut index = start;
        for slot in out.iter_mut() {
            *slot = self.get(index);
            index.increment();
        }
    }

    /// Samples gathered around `index`, for the trigger detector
    pub fn trigger_buffer_at(&self, index: SampleCounter) -> TriggerBuffer {
        TriggerBuffer([
            self.get(index.wrapping_counter_sub(1)),
            self.get(index),
            self.get(index.wrapping_counter_add(1)),
        ])
    }

    /// Walk backwards from `from` over at most `depth` candidates and return the first one
    /// where the trigger condition holds.
    pub fn search_trigger(
        &self,
        from: SampleCounter,
        depth: u32,
        trigger: &TriggerConfig,
    ) -> Option<SampleCounter> {
        (0..depth)
            .map(|back| from.wrapping_counter_sub(back))
            .find(|index| self.trigger_buffer_at(*index).qualifies(trigger))
    }

    /// Check that nothing read since the oldest slot `oldest` can have been overwritten.
    ///
    /// Call after the reads, with the write index loaded after them.
    pub fn is_intact(&self, oldest: SampleCounter, write_index: SampleCounter) -> bool {
        (write_index.distance_from(oldest) as usize) < N
    }
}

impl<const N: usize> Default for AdcBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// A copy of `W` consecutive samples, oldest first, detached from the live ring buffer
#[derive(Debug, Clone)]
pub struct WaveformBuffer<const W: usize> {
    /// Copied samples, oldest first
    samples: [i16; W],
    /// Counter of `samples[0]`
    start: SampleCounter,
}

impl<const W: usize> WaveformBuffer<W> {
    /// Zeroed window
    pub const fn new() -> Self {
        Self {
            samples: [0; W],
            start: SampleCounter(0),
        }
    }

    /// Copied samples, oldest first
    pub fn samples(&self) -> &[i16; W] {
        &self.samples
    }

    /// Absolute counter of the first sample
    pub fn start(&self) -> SampleCounter {
        self.start
    }

    /// Refill from a ring buffer, starting at `start`
    pub(crate) fn fill_from<const N: usize>(&mut self, source: &AdcBuffer<N>, start: SampleCounter) {
        source.copy_from(start, &mut self.samples);
        self.start = start;
    }
}

impl<const W: usize> Default for WaveformBuffer<W> {
    fn default() -> Self {
        Self::new()
    }
}

/// Direction of the signal through the trigger level
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TriggerSlope {
    /// Crossing upwards
    #[default]
    Rising,
    /// Crossing downwards
    Falling,
}

/// Trigger condition searched in the sample stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TriggerConfig {
    /// Level in ADC counts
    pub level: i16,
    /// Crossing direction
    pub slope: TriggerSlope,
}

impl Default for TriggerConfig {
    /// Rising edge through 0 V
    fn default() -> Self {
        Self {
            level: ADC_OFFSET,
            slope: TriggerSlope::Rising,
        }
    }
}

/// The sample before a trigger candidate, the candidate, and the sample after it
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TriggerBuffer(pub [i16; TRIGGER_BUFFER_SIZE]);

impl TriggerBuffer {
    /// The candidate crosses the level and the following sample stays past it
    pub fn qualifies(&self, trigger: &TriggerConfig) -> bool {
        let [before, at, after] = self.0;
        match trigger.slope {
            TriggerSlope::Rising => {
                before < trigger.level && at >= trigger.level && after >= trigger.level
            }
            TriggerSlope::Falling => {
                before > trigger.level && at <= trigger.level && after <= trigger.level
            }
        }
    }
}

/// Offset of the first sample in `samples` where the trigger condition holds
pub fn find_trigger(samples: &[i16], trigger: &TriggerConfig) -> Option<usize> {
    samples
        .windows(TRIGGER_BUFFER_SIZE)
        .position(|window| TriggerBuffer([window[0], window[1], window[2]]).qualifies(trigger))
        .map(|offset| offset + 1)
}
