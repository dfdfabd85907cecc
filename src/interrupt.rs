//! Process-wide state, plus the entry points called by the interrupt handlers and by the
//! foreground loop.
//!
//! Ownership follows the interrupt that writes each item:
//!
//! - the scan timer interrupt is the only user of [`SCANNER`] and the only writer of the
//!   debounced state and pending presses,
//! - the sampling interrupt is the only writer of [`ACQUISITION`],
//! - each [`ByteFifo`] has one producer and one consumer.

// SPDX-License-Identifier: Apache-2.0

use core::cell::{Cell, RefCell};
use core::sync::atomic::{AtomicU32, Ordering};

use critical_section::Mutex;

use crate::{
    acquisition::{Acquisition, Capture, CaptureError},
    buffer::{TriggerConfig, WaveformBuffer},
    buttons::{ButtonScanner, ButtonState},
    components::AdcFrontEnd,
    config::{ADC_BUFFER_SIZE, BUFFER_COPY_SIZE, FIFO_SIZE},
    fifo::ByteFifo,
    joystick::JoystickSample,
};

/// Button scanner for access in the scan interrupt
pub static SCANNER: Mutex<RefCell<Option<ButtonScanner>>> = Mutex::new(RefCell::new(None));
/// Debounced button state, published after every scan tick
static BUTTONS: AtomicU32 = AtomicU32::new(0);
/// Presses (edges and autorepeats) not yet collected by the foreground
static PRESSES: Mutex<Cell<u32>> = Mutex::new(Cell::new(0));

/// ADC ring buffer and deadline counter
pub static ACQUISITION: Acquisition<ADC_BUFFER_SIZE> = Acquisition::new();

/// Bytes queued for the host
pub static TX_FIFO: ByteFifo<FIFO_SIZE> = ByteFifo::new();
/// Bytes received from the host
pub static RX_FIFO: ByteFifo<FIFO_SIZE> = ByteFifo::new();

/// Window copied out of [`ACQUISITION`] for display
pub type Waveform = WaveformBuffer<BUFFER_COPY_SIZE>;

/// Install the button scanner. Call once during bring-up, before enabling the scan interrupt.
pub fn init_scanner() {
    critical_section::with(|cs| {
        if SCANNER.borrow_ref(cs).is_some() {
            warn!("Button scanner has already been initiated");
            return;
        }
        debug!("critical_section: init button scanner");
        SCANNER.replace(cs, Some(ButtonScanner::new()));
    });
}

/// Scan interrupt entry point: run one tick on the raw button bitmap and joystick sample, then
/// publish the debounced state.
pub fn button_scan(raw: u32, joystick: JoystickSample) -> ButtonState {
    critical_section::with(|cs| {
        let mut scanner = SCANNER.borrow_ref_mut(cs);
        let Some(scanner) = scanner.as_mut() else {
            warn!("Button scan before the scanner was initiated");
            return ButtonState::default();
        };

        let report = scanner.scan(raw, joystick);
        BUTTONS.store(report.state.bits(), Ordering::Release);
        if !report.presses.is_empty() {
            let pending = PRESSES.borrow(cs);
            pending.set(pending.get() | report.presses.bits());
        }
        report.state
    })
}

/// Debounced button state after the last scan tick
pub fn buttons() -> ButtonState {
    ButtonState::from_bits(BUTTONS.load(Ordering::Acquire))
}

/// Collect every press recorded since the previous call, autorepeats included
pub fn take_presses() -> ButtonState {
    critical_section::with(|cs| ButtonState::from_bits(PRESSES.borrow(cs).replace(0)))
}

/// Sampling interrupt entry point. `false` when the interval was lost and `adc` resynchronised.
pub fn adc_sample<A: AdcFrontEnd>(adc: &mut A) -> bool {
    ACQUISITION.service(adc)
}

/// Number of missed ADC deadlines since start-up
pub fn adc_errors() -> u32 {
    ACQUISITION.missed_deadlines()
}

/// Copy a trigger-aligned waveform out of [`ACQUISITION`], retrying up to `attempts` times when
/// the sampling interrupt overruns the copy.
pub fn capture_waveform(
    trigger: &TriggerConfig,
    out: &mut Waveform,
    attempts: usize,
) -> Result<Capture, CaptureError> {
    let mut result = Err(CaptureError::Overwritten);
    for _ in 0..attempts {
        result = ACQUISITION.capture(trigger, out);
        if result != Err(CaptureError::Overwritten) {
            break;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buttons::Button;
    use crate::config::{BUTTON_AUTOREPEAT_INITIAL, BUTTON_AUTOREPEAT_NEXT};

    const CENTER: JoystickSample = [2048, 2048];

    // The statics are shared by every test, so the scan path is checked in a single test
    #[test]
    fn scan_publishes_state_and_presses() {
        assert_eq!(button_scan(Button::S2.mask(), CENTER), ButtonState::default());
        init_scanner();
        init_scanner();

        button_scan(Button::S2.mask(), CENTER);
        assert!(buttons().is_empty());
        button_scan(Button::S2.mask(), CENTER);
        assert!(buttons().is_pressed(Button::S2));
        assert_eq!(take_presses().bits(), Button::S2.mask());
        assert!(take_presses().is_empty());

        // Hold through the initial delay and one repeat, collecting late
        let ticks = BUTTON_AUTOREPEAT_INITIAL as u32 + BUTTON_AUTOREPEAT_NEXT as u32 - 1;
        for _ in 0..ticks {
            button_scan(Button::S2.mask(), CENTER);
        }
        assert_eq!(take_presses().bits(), Button::S2.mask());

        for _ in 0..5 {
            button_scan(0, CENTER);
        }
        assert!(buttons().is_empty());
        assert!(take_presses().is_empty());
    }

    struct Ramp {
        next: i16,
        overrun_every: i16,
    }

    impl AdcFrontEnd for Ramp {
        fn take_overrun(&mut self) -> bool {
            self.next % self.overrun_every == self.overrun_every - 1
        }

        fn read_sample(&mut self) -> i16 {
            self.next += 1;
            self.next - 1
        }

        fn resync(&mut self) {
            // The overrun conversion is gone
            self.next += 1;
        }
    }

    #[test]
    fn sampling_fills_global_buffer() {
        let mut waveform = Waveform::new();
        assert_eq!(
            capture_waveform(&TriggerConfig::default(), &mut waveform, 3),
            Err(CaptureError::NotReady)
        );

        let mut adc = Ramp {
            next: 0,
            overrun_every: 100,
        };
        for _ in 0..ADC_BUFFER_SIZE + 100 {
            adc_sample(&mut adc);
        }
        assert_eq!(adc_errors(), (ADC_BUFFER_SIZE as u32 + 100) / 100);

        // Every 100th ramp value (99, 199, ...) was lost instead of stored
        let lost = adc_errors();
        assert_eq!(
            ACQUISITION.buffer().write_index().get_counter(),
            ADC_BUFFER_SIZE as u32 + 100 - lost
        );

        // The ramp crosses the default level once, with 12 values lost before it
        let trigger = TriggerConfig::default();
        let capture = capture_waveform(&trigger, &mut waveform, 3).unwrap();
        assert!(capture.triggered);
        assert_eq!(capture.trigger.get_counter(), trigger.level as u32 - 12);
        assert_eq!(waveform.samples()[BUFFER_COPY_SIZE / 2], trigger.level);
        // Counter 736 holds ramp value 743, after 7 lost values
        assert_eq!(waveform.samples()[0], 743);
    }

    #[test]
    fn fifos_are_independent() {
        TX_FIFO.put(7).unwrap();
        assert_eq!(RX_FIFO.get(), Err(crate::fifo::FifoError::Empty));
        assert_eq!(TX_FIFO.get(), Ok(7));
    }
}
