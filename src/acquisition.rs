//! The ADC acquisition pipeline.
//!
//! [`Acquisition::service`] runs in the sampling interrupt: one conversion per call, written into
//! the ring buffer, with lost conversions counted instead of reported. After an overrun the front
//! end is realigned and that interval stores nothing, so a lost conversion never shifts which
//! channel later samples are taken from. Consumers call
//! [`Acquisition::capture`] from the foreground to get a stable [`WaveformBuffer`] aligned on a
//! trigger.
//!
//! Captures never mask the sampling interrupt. The copy is optimistic: the write index is loaded
//! once before reading and once after, and the copy is discarded if the writer could have reached
//! any slot that was read (it must stay strictly less than one buffer length ahead of the oldest
//! slot). The caller retries on [`CaptureError::Overwritten`].

// SPDX-License-Identifier: Apache-2.0

use core::fmt;
use core::sync::atomic::{fence, AtomicU32, Ordering};

use crate::buffer::{AdcBuffer, SampleCounter, TriggerConfig, WaveformBuffer};
use crate::components::AdcFrontEnd;

/// Reasons a capture produced no waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CaptureError {
    /// The ring buffer has not been filled once since start-up
    NotReady,
    /// The sampling interrupt caught up with the copy while it was in progress
    Overwritten,
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::NotReady => write!(f, "ADC buffer has not been filled yet"),
            CaptureError::Overwritten => {
                write!(f, "ADC buffer was overwritten while copying the waveform")
            }
        }
    }
}

/// Where a captured waveform sits in the sample stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Capture {
    /// Counter of the first copied sample
    pub start: SampleCounter,
    /// Counter of the sample at the middle of the window
    pub trigger: SampleCounter,
    /// `false` if no trigger was found and the window holds the latest samples instead
    pub triggered: bool,
}

/// Ring buffer plus deadline accounting, shared between the sampling interrupt and its consumers
pub struct Acquisition<const N: usize> {
    /// Written by the sampling interrupt only
    buffer: AdcBuffer<N>,
    /// Number of missed ADC deadlines
    missed_deadlines: AtomicU32,
}

impl<const N: usize> Acquisition<N> {
    /// Empty pipeline
    pub const fn new() -> Self {
        Self {
            buffer: AdcBuffer::new(),
            missed_deadlines: AtomicU32::new(0),
        }
    }

    /// Sampling interrupt entry point. Must only be called from that one context.
    ///
    /// Returns `false` when the interval was lost to an overrun: the miss is counted once, the
    /// front end is resynchronised and no sample is stored.
    pub fn service<A: AdcFrontEnd>(&self, adc: &mut A) -> bool {
        if adc.take_overrun() {
            // Single writer, so a load/store pair is enough
            let missed = self.missed_deadlines.load(Ordering::Relaxed).wrapping_add(1);
            self.missed_deadlines.store(missed, Ordering::Relaxed);
            #[cfg(feature = "trace_samples")]
            warn!("ADC deadline missed ({} total)", missed);
            adc.resync();
            return false;
        }

        let _index = self.buffer.push(adc.read_sample());
        #[cfg(feature = "trace_samples")]
        trace!("sample {}: {}", _index.get_counter(), self.buffer.recent(1));
        true
    }

    /// Sampling intervals whose conversion was not collected in time
    pub fn missed_deadlines(&self) -> u32 {
        self.missed_deadlines.load(Ordering::Relaxed)
    }

    /// Live ring buffer
    pub fn buffer(&self) -> &AdcBuffer<N> {
        &self.buffer
    }

    /// Copy the `W` samples centred on the most recent trigger into `out`.
    ///
    /// The window holds `W / 2` samples before the trigger and `W - W / 2` from it onwards. The
    /// search starts `W - W / 2` samples behind the write index, so the second part of the window
    /// already exists, and walks back at most `N / 2` samples. Without a trigger the latest `W`
    /// samples are copied and [`Capture::triggered`] is `false`.
    pub fn capture<const W: usize>(
        &self,
        trigger: &TriggerConfig,
        out: &mut WaveformBuffer<W>,
    ) -> Result<Capture, CaptureError> {
        // At least 2 samples from the trigger on, for the sample after it
        const { assert!(W >= 3 && W <= N / 2, "window must fit in half the ADC buffer") };
        if !self.buffer.is_filled() {
            return Err(CaptureError::NotReady);
        }

        let half = (W / 2) as u32;
        let depth = (N / 2) as u32;
        // Newest sample read, by the search or the copy, is write_index - 1
        let from = self.buffer.write_index().wrapping_counter_sub(W as u32 - half);

        let (center, triggered, oldest_read) =
            match self.buffer.search_trigger(from, depth, trigger) {
                Some(found) => (found, true, found.wrapping_counter_sub(half)),
                None => (from, false, from.wrapping_counter_sub(depth)),
            };

        let start = center.wrapping_counter_sub(half);
        out.fill_from(&self.buffer, start);
        self.check_intact(oldest_read)?;

        #[cfg(feature = "trace_samples")]
        trace!(
            "captured {} samples from {}, triggered: {}",
            W,
            start.get_counter(),
            triggered
        );
        Ok(Capture {
            start,
            trigger: center,
            triggered,
        })
    }

    /// Copy the latest `W` samples into `out`, without looking for a trigger
    pub fn copy_latest<const W: usize>(
        &self,
        out: &mut WaveformBuffer<W>,
    ) -> Result<SampleCounter, CaptureError> {
        const { assert!(W <= N, "window larger than the ADC buffer") };
        if !self.buffer.is_filled() {
            return Err(CaptureError::NotReady);
        }

        let start = self.buffer.write_index().wrapping_counter_sub(W as u32);
        out.fill_from(&self.buffer, start);
        self.check_intact(start)?;
        Ok(start)
    }

    /// Validate every read made since (and including) `oldest` against the current write index
    fn check_intact(&self, oldest: SampleCounter) -> Result<(), CaptureError> {
        fence(Ordering::Acquire);
        let write_index = self.buffer.write_index();
        if self.buffer.is_intact(oldest, write_index) {
            Ok(())
        } else {
            debug!(
                "waveform copy from {} overrun by writer at {}",
                oldest.get_counter(),
                write_index.get_counter()
            );
            Err(CaptureError::Overwritten)
        }
    }
}

impl<const N: usize> Default for Acquisition<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{find_trigger, TriggerSlope};

    /// Replays a list of conversions, flagging an overrun where requested
    struct FakeAdc<'a> {
        samples: core::slice::Iter<'a, i16>,
        overrun: bool,
        resyncs: u32,
    }

    impl<'a> FakeAdc<'a> {
        fn new(samples: &'a [i16]) -> Self {
            Self {
                samples: samples.iter(),
                overrun: false,
                resyncs: 0,
            }
        }
    }

    impl AdcFrontEnd for FakeAdc<'_> {
        fn take_overrun(&mut self) -> bool {
            core::mem::take(&mut self.overrun)
        }

        fn read_sample(&mut self) -> i16 {
            self.samples.next().copied().unwrap_or(0)
        }

        fn resync(&mut self) {
            self.resyncs += 1;
        }
    }

    /// Scope input on channel 0 and two joystick channels reading -1, converted in turn
    struct RoundRobin {
        channel: usize,
        next_scope: i16,
        lose_next: bool,
    }

    impl AdcFrontEnd for RoundRobin {
        fn take_overrun(&mut self) -> bool {
            if !core::mem::take(&mut self.lose_next) {
                return false;
            }
            // One conversion dropped by a full FIFO
            self.channel = (self.channel + 1) % 3;
            true
        }

        fn read_sample(&mut self) -> i16 {
            let value = if self.channel == 0 {
                self.next_scope += 1;
                self.next_scope - 1
            } else {
                -1
            };
            self.channel = (self.channel + 1) % 3;
            value
        }

        fn resync(&mut self) {
            self.channel = 0;
        }
    }

    fn fill<const N: usize>(acquisition: &Acquisition<N>, samples: &[i16]) {
        let mut adc = FakeAdc::new(samples);
        for _ in samples {
            acquisition.service(&mut adc);
        }
    }

    /// Square wave, `period` samples per cycle, low half first
    fn square(len: usize, period: usize) -> Vec<i16> {
        (0..len)
            .map(|i| if i % period < period / 2 { 0 } else { 1000 })
            .collect()
    }

    const RISING_500: TriggerConfig = TriggerConfig {
        level: 500,
        slope: TriggerSlope::Rising,
    };

    #[test]
    fn service_writes_at_wrapped_index() {
        let acquisition = Acquisition::<8>::new();
        let samples: Vec<i16> = (0..11).collect();
        fill(&acquisition, &samples);
        assert_eq!(acquisition.buffer().write_index().get_counter(), 11);
        assert_eq!(acquisition.buffer().recent(1), 10);
        assert_eq!(acquisition.buffer().get(SampleCounter::new(0)), 8);
        assert_eq!(acquisition.missed_deadlines(), 0);
    }

    #[test]
    fn missed_deadline_counts_once_per_interrupt() {
        let acquisition = Acquisition::<8>::new();
        let samples = [1, 2, 3, 4, 5];
        let mut adc = FakeAdc::new(&samples);

        assert!(acquisition.service(&mut adc));
        assert_eq!(acquisition.missed_deadlines(), 0);

        adc.overrun = true;
        assert!(!acquisition.service(&mut adc));
        assert_eq!(acquisition.missed_deadlines(), 1);
        assert_eq!(adc.resyncs, 1);

        assert!(acquisition.service(&mut adc));
        assert_eq!(acquisition.missed_deadlines(), 1);

        adc.overrun = true;
        acquisition.service(&mut adc);
        adc.overrun = true;
        acquisition.service(&mut adc);
        assert_eq!(acquisition.missed_deadlines(), 3);
        assert_eq!(adc.resyncs, 3);

        // Lost intervals store nothing
        assert_eq!(acquisition.buffer().write_index().get_counter(), 2);
        assert_eq!(acquisition.buffer().recent(1), 2);
    }

    #[test]
    fn overrun_keeps_scope_channel_aligned() {
        let acquisition = Acquisition::<16>::new();
        let mut adc = RoundRobin {
            channel: 0,
            next_scope: 0,
            lose_next: false,
        };
        // Interrupt handler: scope sample, then both joystick readings
        let interrupt = |adc: &mut RoundRobin| {
            if acquisition.service(adc) {
                adc.read_sample();
                adc.read_sample();
            }
        };

        for _ in 0..5 {
            interrupt(&mut adc);
        }
        adc.lose_next = true;
        interrupt(&mut adc);
        for _ in 0..15 {
            interrupt(&mut adc);
        }

        assert_eq!(acquisition.missed_deadlines(), 1);
        assert_eq!(acquisition.buffer().write_index().get_counter(), 20);
        let stored: Vec<i16> = (1..=16).rev().map(|age| acquisition.buffer().recent(age)).collect();
        let expected: Vec<i16> = (4..20).collect();
        assert_eq!(stored, expected);
    }

    #[test]
    fn capture_before_buffer_filled() {
        let acquisition = Acquisition::<64>::new();
        fill(&acquisition, &[0; 63]);
        let mut window = WaveformBuffer::<16>::new();
        assert_eq!(
            acquisition.capture(&TriggerConfig::default(), &mut window),
            Err(CaptureError::NotReady)
        );
        assert_eq!(acquisition.copy_latest(&mut window), Err(CaptureError::NotReady));
    }

    #[test]
    fn capture_centres_on_latest_trigger() {
        let acquisition = Acquisition::<64>::new();
        let samples = square(100, 20);
        fill(&acquisition, &samples);

        let mut window = WaveformBuffer::<16>::new();
        let capture = acquisition.capture(&RISING_500, &mut window).unwrap();
        assert!(capture.triggered);
        // Rising edges at 10, 30, 50, 70, 90; search starts at 100 - 8 = 92
        assert_eq!(capture.trigger.get_counter(), 90);
        assert_eq!(capture.start.get_counter(), 82);
        assert_eq!(window.start(), capture.start);
        assert_eq!(window.samples()[8], 1000);
        assert_eq!(window.samples()[7], 0);
        assert_eq!(find_trigger(window.samples(), &RISING_500), Some(8));
    }

    #[test]
    fn trigger_needs_full_second_half() {
        let acquisition = Acquisition::<64>::new();
        // Last rising edge at 90 is too recent for a 32 sample window
        let samples = square(96, 20);
        fill(&acquisition, &samples);

        let mut window = WaveformBuffer::<32>::new();
        let capture = acquisition.capture(&RISING_500, &mut window).unwrap();
        assert_eq!(capture.trigger.get_counter(), 70);
        assert_eq!(window.samples()[16], 1000);
    }

    #[test]
    fn capture_without_trigger_copies_latest() {
        let acquisition = Acquisition::<64>::new();
        let samples: Vec<i16> = (0..80).collect();
        fill(&acquisition, &samples);

        let mut window = WaveformBuffer::<16>::new();
        let capture = acquisition.capture(&RISING_500, &mut window).unwrap();
        assert!(!capture.triggered);
        assert_eq!(capture.start.get_counter(), 64);
        let expected: Vec<i16> = (64..80).collect();
        assert_eq!(&window.samples()[..], &expected[..]);
    }

    #[test]
    fn odd_window_stops_at_newest_sample() {
        let acquisition = Acquisition::<16>::new();
        let samples: Vec<i16> = (0..20).collect();
        fill(&acquisition, &samples);

        let mut window = WaveformBuffer::<5>::new();
        let capture = acquisition.capture(&RISING_500, &mut window).unwrap();
        assert!(!capture.triggered);
        assert_eq!(capture.start.get_counter(), 15);
        assert_eq!(window.samples(), &[15, 16, 17, 18, 19]);
    }

    #[test]
    fn odd_window_trigger_at_newest_position() {
        let acquisition = Acquisition::<16>::new();
        // Rising edge at 17 leaves exactly 3 samples from the trigger on
        let mut samples = vec![0; 17];
        samples.extend([1000, 1000, 1000]);
        fill(&acquisition, &samples);

        let mut window = WaveformBuffer::<5>::new();
        let capture = acquisition.capture(&RISING_500, &mut window).unwrap();
        assert!(capture.triggered);
        assert_eq!(capture.trigger.get_counter(), 17);
        assert_eq!(window.samples(), &[0, 0, 1000, 1000, 1000]);
    }

    #[test]
    fn copy_latest_returns_newest_samples() {
        let acquisition = Acquisition::<32>::new();
        let samples: Vec<i16> = (0..40).collect();
        fill(&acquisition, &samples);

        let mut window = WaveformBuffer::<4>::new();
        let start = acquisition.copy_latest(&mut window).unwrap();
        assert_eq!(start.get_counter(), 36);
        assert_eq!(window.samples(), &[36, 37, 38, 39]);
    }

    #[test]
    fn writer_overrunning_copy_is_detected() {
        let acquisition = Acquisition::<16>::new();
        fill(&acquisition, &[0; 16]);
        let oldest = acquisition.buffer().write_index().wrapping_counter_sub(4);
        assert_eq!(acquisition.check_intact(oldest), Ok(()));

        // Writer advances while the copy is in progress
        fill(&acquisition, &[0; 11]);
        assert_eq!(acquisition.check_intact(oldest), Ok(()));
        fill(&acquisition, &[0; 1]);
        assert_eq!(
            acquisition.check_intact(oldest),
            Err(CaptureError::Overwritten)
        );
    }

    #[test]
    fn capture_error_messages() {
        assert_eq!(
            CaptureError::NotReady.to_string(),
            "ADC buffer has not been filled yet"
        );
    }
}
