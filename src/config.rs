//! Compile-time configuration for one hardware revision of the instrument.
//!
//! Nothing here is tunable at runtime. Timing constants assume the button scan interrupt fires at
//! exactly [`BUTTON_SCAN_RATE`].

// SPDX-License-Identifier: Apache-2.0

/// Number of physical push buttons (bits 0..=4 of the raw bitmap)
pub const BUTTON_COUNT: usize = 5;
/// Number of inputs including the four joystick directions (bits 5..=8)
pub const BUTTON_AND_JOYSTICK_COUNT: usize = 9;
/// Mask of every valid bit in a raw or debounced button bitmap
pub const BUTTON_MASK: u32 = (1 << BUTTON_AND_JOYSTICK_COUNT) - 1;

/// Consecutive pressed samples before a button is considered pressed
pub const BUTTON_SAMPLES_PRESSED: u8 = 2;
/// Consecutive released samples before a button is considered released
pub const BUTTON_SAMPLES_RELEASED: u8 = 5;
/// Counter value indicating the pressed state
pub const BUTTON_PRESSED_STATE: u8 = BUTTON_SAMPLES_RELEASED * BUTTON_SAMPLES_PRESSED;
/// Counter step applied for every pressed sample
pub const BUTTON_STATE_INCREMENT: u8 = BUTTON_PRESSED_STATE / BUTTON_SAMPLES_PRESSED;
/// Counter step applied for every released sample
pub const BUTTON_STATE_DECREMENT: u8 = BUTTON_PRESSED_STATE / BUTTON_SAMPLES_RELEASED;

/// \[Hz\] button scanning interrupt rate
pub const BUTTON_SCAN_RATE: u32 = 200;
/// \[us\] period of the button scanning interrupt
pub const BUTTON_SCAN_PERIOD_US: u32 = 1_000_000 / BUTTON_SCAN_RATE;

/// Scan ticks a button must read pressed before autorepeat starts (500 ms at 200 Hz)
pub const BUTTON_AUTOREPEAT_INITIAL: u8 = 100;
/// Scan ticks between two autorepeat presses (50 ms at 200 Hz)
pub const BUTTON_AUTOREPEAT_NEXT: u8 = 10;

/// Above this ADC value, the high direction of an axis is pressed
pub const JOYSTICK_UPPER_PRESS_THRESHOLD: u16 = 3595;
/// Below this ADC value, the high direction of an axis is released
pub const JOYSTICK_UPPER_RELEASE_THRESHOLD: u16 = 3095;
/// Below this ADC value, the low direction of an axis is pressed
pub const JOYSTICK_LOWER_PRESS_THRESHOLD: u16 = 500;
/// Above this ADC value, the low direction of an axis is released
pub const JOYSTICK_LOWER_RELEASE_THRESHOLD: u16 = 1000;

/// Scan timer interrupt priority (RP2040 only uses the top 2 bits, lower is more urgent)
pub const BUTTON_INT_PRIORITY: u8 = 0x80;
/// Sampling interrupt priority, preempts the button scan
pub const ADC_INT_PRIORITY: u8 = 0x00;

/// \[Hz\] ADC clock
pub const ADC_CLOCK_FREQ: u32 = 48_000_000;
/// Channels converted in turn: scope input, joystick X, joystick Y
pub const ADC_ROUND_ROBIN_CHANNELS: u32 = 3;
/// \[samples/s\] sampling rate of the scope input
pub const ADC_SAMPLING_RATE: u32 = 160_000;
/// Integer part of the ADC clock divider: one conversion every `ADC_CLOCK_DIVIDER + 1` cycles
pub const ADC_CLOCK_DIVIDER: u16 =
    (ADC_CLOCK_FREQ / (ADC_SAMPLING_RATE * ADC_ROUND_ROBIN_CHANNELS) - 1) as u16;
/// \[samples/s\] rate the scope input actually gets once [`ADC_CLOCK_DIVIDER`] is rounded down
/// to an integer divider. Use this, not [`ADC_SAMPLING_RATE`], to convert sample counts to time.
pub const ADC_ACHIEVED_SAMPLING_RATE: u32 =
    ADC_CLOCK_FREQ / ((ADC_CLOCK_DIVIDER as u32 + 1) * ADC_ROUND_ROBIN_CHANNELS);
/// Size of the ADC ring buffer. Must be a power of 2
pub const ADC_BUFFER_SIZE: usize = 2048;
/// Number of samples copied out of the ring buffer for each waveform
pub const BUFFER_COPY_SIZE: usize = 1024;
/// Samples examined at once by the trigger detector
pub const TRIGGER_BUFFER_SIZE: usize = 3;

/// ADC reading of the 0 V input level, used as the default trigger level
pub const ADC_OFFSET: i16 = 1260;

/// Byte FIFO storage. Capacity is 1 item fewer
pub const FIFO_SIZE: usize = 11;

const _: () = assert!(ADC_BUFFER_SIZE.is_power_of_two());
// 96 ADC clock cycles per conversion at least
const _: () = assert!(ADC_CLOCK_DIVIDER >= 95);
const _: () = assert!(ADC_ACHIEVED_SAMPLING_RATE >= ADC_SAMPLING_RATE);
const _: () = assert!(BUFFER_COPY_SIZE <= ADC_BUFFER_SIZE / 2);
const _: () = assert!(BUTTON_AUTOREPEAT_NEXT <= BUTTON_AUTOREPEAT_INITIAL);
const _: () = assert!(JOYSTICK_UPPER_RELEASE_THRESHOLD < JOYSTICK_UPPER_PRESS_THRESHOLD);
const _: () = assert!(JOYSTICK_LOWER_PRESS_THRESHOLD < JOYSTICK_LOWER_RELEASE_THRESHOLD);
