//! Maps the two analog joystick axes onto four virtual buttons.
//!
//! Each direction is a Schmitt trigger: it presses when the axis passes the press threshold and
//! only releases once the axis comes back past the (less extreme) release threshold. The resulting
//! bits are merged into the raw button bitmap, so joystick directions are debounced like any
//! physical button.

// SPDX-License-Identifier: Apache-2.0

use crate::buttons::Button;
use crate::config::{
    JOYSTICK_LOWER_PRESS_THRESHOLD, JOYSTICK_LOWER_RELEASE_THRESHOLD,
    JOYSTICK_UPPER_PRESS_THRESHOLD, JOYSTICK_UPPER_RELEASE_THRESHOLD,
};

/// Raw ADC readings of the joystick, `[x, y]`
pub type JoystickSample = [u16; 2];

/// Mask of the four joystick bits in a button bitmap
pub const JOYSTICK_MASK: u32 = Button::Right.mask()
    | Button::Left.mask()
    | Button::Up.mask()
    | Button::Down.mask();

/// Press/release thresholds of one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisThresholds {
    /// Above this value the high direction is pressed
    pub upper_press: u16,
    /// Below this value the high direction is released
    pub upper_release: u16,
    /// Below this value the low direction is pressed
    pub lower_press: u16,
    /// Above this value the low direction is released
    pub lower_release: u16,
}

impl AxisThresholds {
    /// Thresholds of the board's joystick
    pub const DEFAULT: Self = Self {
        upper_press: JOYSTICK_UPPER_PRESS_THRESHOLD,
        upper_release: JOYSTICK_UPPER_RELEASE_THRESHOLD,
        lower_press: JOYSTICK_LOWER_PRESS_THRESHOLD,
        lower_release: JOYSTICK_LOWER_RELEASE_THRESHOLD,
    };
}

impl Default for AxisThresholds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// One axis with its two directions
#[derive(Debug, Clone, Copy)]
struct Axis {
    /// Bit reported for the high direction
    high: Button,
    /// Bit reported for the low direction
    low: Button,
}

/// Joystick X then Y
const AXES: [Axis; 2] = [
    Axis {
        high: Button::Right,
        low: Button::Left,
    },
    Axis {
        high: Button::Up,
        low: Button::Down,
    },
];

/// Converts joystick samples into virtual button bits with hysteresis
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct JoystickMapper {
    /// Press/release levels, shared by both axes
    thresholds: AxisThresholds,
    /// Virtual button bits produced by the last sample
    bits: u32,
    /// Last raw coordinates
    position: JoystickSample,
}

impl JoystickMapper {
    /// Mapper using the board thresholds, all directions released
    pub const fn new() -> Self {
        Self::with_thresholds(AxisThresholds::DEFAULT)
    }

    /// Mapper with custom thresholds
    pub const fn with_thresholds(thresholds: AxisThresholds) -> Self {
        Self {
            thresholds,
            bits: 0,
            position: [0; 2],
        }
    }

    /// Convert a new sample and return the joystick bits, already placed at their
    /// [`Button`] positions.
    pub fn read_joystick(&mut self, sample: JoystickSample) -> u32 {
        let t = &self.thresholds;
        let mut bits = self.bits;

        for (axis, &value) in AXES.iter().zip(sample.iter()) {
            let high = axis.high.mask();
            if value > t.upper_press {
                bits |= high;
            } else if value < t.upper_release {
                bits &= !high;
            }

            let low = axis.low.mask();
            if value < t.lower_press {
                bits |= low;
            } else if value > t.lower_release {
                bits &= !low;
            }
        }

        self.bits = bits;
        self.position = sample;
        bits
    }

    /// Joystick bits from the last call to [`read_joystick`](Self::read_joystick)
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Last raw coordinates, `[x, y]`
    pub fn position(&self) -> JoystickSample {
        self.position
    }
}

impl Default for JoystickMapper {
    fn default() -> Self {
        Self::new()
    }
}
