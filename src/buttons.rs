//! Button debouncing and the per-tick input scan.
//!
//! Every input line owns an integrating counter. A pressed sample adds
//! [`BUTTON_STATE_INCREMENT`], a released sample subtracts [`BUTTON_STATE_DECREMENT`], and the
//! counter saturates in `[0, BUTTON_PRESSED_STATE]`. A line becomes pressed when its counter
//! reaches [`BUTTON_PRESSED_STATE`] and released when it drops to zero; in between it keeps its
//! previous state. From rest, [`BUTTON_SAMPLES_PRESSED`] consecutive pressed reads press a line,
//! and from the pressed state [`BUTTON_SAMPLES_RELEASED`] consecutive released reads release it.
//!
//! [`BUTTON_SAMPLES_PRESSED`]: crate::config::BUTTON_SAMPLES_PRESSED
//! [`BUTTON_SAMPLES_RELEASED`]: crate::config::BUTTON_SAMPLES_RELEASED

// SPDX-License-Identifier: Apache-2.0

use core::fmt;
use core::ops::BitOr;

use crate::autorepeat::AutoRepeat;
use crate::config::{
    BUTTON_AND_JOYSTICK_COUNT, BUTTON_MASK, BUTTON_PRESSED_STATE, BUTTON_STATE_DECREMENT,
    BUTTON_STATE_INCREMENT,
};
use crate::joystick::{JoystickMapper, JoystickSample, JOYSTICK_MASK};

/// Input lines, numbered by their bit in a button bitmap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Button {
    /// User switch 1 on the main board
    Usr1 = 0,
    /// User switch 2 on the main board
    Usr2 = 1,
    /// Booster pack switch 1
    S1 = 2,
    /// Booster pack switch 2
    S2 = 3,
    /// Joystick push
    Select = 4,
    /// Joystick X high
    Right = 5,
    /// Joystick X low
    Left = 6,
    /// Joystick Y high
    Up = 7,
    /// Joystick Y low
    Down = 8,
}

impl Button {
    /// All lines in bit order
    pub const ALL: [Button; BUTTON_AND_JOYSTICK_COUNT] = [
        Button::Usr1,
        Button::Usr2,
        Button::S1,
        Button::S2,
        Button::Select,
        Button::Right,
        Button::Left,
        Button::Up,
        Button::Down,
    ];

    /// Single-bit mask of this line
    pub const fn mask(self) -> u32 {
        1 << self as u8
    }
}

/// Bitmap with one bit per input line. Bits outside [`BUTTON_MASK`] are always clear.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonState(u32);

impl ButtonState {
    /// Build from a raw bitmap, dropping bits that do not map to an input line
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits & BUTTON_MASK)
    }

    /// Raw bitmap
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// No line set
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Check a line by bit number
    pub const fn is_set(self, line: usize) -> bool {
        line < BUTTON_AND_JOYSTICK_COUNT && self.0 & (1 << line) != 0
    }

    /// Check a named line
    pub const fn is_pressed(self, button: Button) -> bool {
        self.0 & button.mask() != 0
    }

    /// Lines set now that were clear in `previous`
    pub const fn newly_pressed(self, previous: ButtonState) -> ButtonState {
        ButtonState(self.0 & !previous.0)
    }

    /// Iterate over the set lines in bit order
    pub fn iter(self) -> impl Iterator<Item = Button> {
        Button::ALL
            .into_iter()
            .filter(move |button| self.is_pressed(*button))
    }
}

impl BitOr for ButtonState {
    type Output = ButtonState;

    fn bitor(self, rhs: Self) -> Self::Output {
        ButtonState(self.0 | rhs.0)
    }
}

impl fmt::Display for ButtonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#011b}", self.0)
    }
}

/// Integrating debouncer for every input line
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Debouncer {
    /// Integrating counter per line
    counters: [u8; BUTTON_AND_JOYSTICK_COUNT],
    /// Debounced output
    state: ButtonState,
}

impl Debouncer {
    /// Every line released
    pub const fn new() -> Self {
        Self {
            counters: [0; BUTTON_AND_JOYSTICK_COUNT],
            state: ButtonState(0),
        }
    }

    /// Feed one raw sample (bit set = reads pressed) and return the updated debounced state.
    ///
    /// A line turns on when its counter reaches [`BUTTON_PRESSED_STATE`] and turns off only when
    /// the counter drops back to 0. In between it keeps its previous output, so a pressed button
    /// stays pressed through short release bounces.
    pub fn debounce(&mut self, raw: u32) -> ButtonState {
        let mut state = self.state.0;
        for (line, counter) in self.counters.iter_mut().enumerate() {
            let mask = 1 << line;
            if raw & mask != 0 {
                *counter = counter
                    .saturating_add(BUTTON_STATE_INCREMENT)
                    .min(BUTTON_PRESSED_STATE);
                if *counter == BUTTON_PRESSED_STATE {
                    state |= mask;
                }
            } else {
                *counter = counter.saturating_sub(BUTTON_STATE_DECREMENT);
                if *counter == 0 {
                    state &= !mask;
                }
            }
        }
        self.state = ButtonState(state);
        self.state
    }

    /// Debounced state after the last sample
    pub fn state(&self) -> ButtonState {
        self.state
    }

    /// Counter value of `line`, always within `[0, BUTTON_PRESSED_STATE]`
    pub fn counter(&self, line: usize) -> u8 {
        self.counters.get(line).copied().unwrap_or(0)
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one scan tick
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanReport {
    /// Debounced state after this tick
    pub state: ButtonState,
    /// Buttons to treat as freshly pressed on this tick: new presses plus autorepeats
    pub presses: ButtonState,
}

/// Everything owned by the scan interrupt: joystick mapping, debouncing and autorepeat, run in
/// that order on every tick.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonScanner {
    /// Virtual joystick buttons
    joystick: JoystickMapper,
    /// Debounced state of every line
    debouncer: Debouncer,
    /// Hold counters fed by the debounced state
    autorepeat: AutoRepeat,
}

impl ButtonScanner {
    /// Scanner with every line released
    pub const fn new() -> Self {
        Self {
            joystick: JoystickMapper::new(),
            debouncer: Debouncer::new(),
            autorepeat: AutoRepeat::new(),
        }
    }

    /// Run one scan tick.
    ///
    /// `raw` holds the physical buttons (bit set = pressed); any joystick bits in it are replaced
    /// by the ones derived from `joystick`.
    pub fn scan(&mut self, raw: u32, joystick: JoystickSample) -> ScanReport {
        let raw = (raw & !JOYSTICK_MASK) | self.joystick.read_joystick(joystick);

        let previous = self.debouncer.state();
        let state = self.debouncer.debounce(raw);
        let repeats = self.autorepeat.tick(state);

        #[cfg(feature = "trace_buttons")]
        if state != previous {
            trace!("buttons {} -> {}", previous.bits(), state.bits());
        }

        ScanReport {
            state,
            presses: state.newly_pressed(previous) | repeats,
        }
    }

    /// Debounced state after the last tick
    pub fn state(&self) -> ButtonState {
        self.debouncer.state()
    }

    /// Joystick mapper, for its last raw coordinates
    pub fn joystick(&self) -> &JoystickMapper {
        &self.joystick
    }

    /// Debouncer, for its counters
    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }
}
