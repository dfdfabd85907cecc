//! Synthetic repeated presses for held buttons.
//!
//! Timing is counted in scan ticks only, so the cadence is exact as long as the scan interrupt
//! runs at [`BUTTON_SCAN_RATE`](crate::config::BUTTON_SCAN_RATE).

// SPDX-License-Identifier: Apache-2.0

use crate::buttons::ButtonState;
use crate::config::{BUTTON_AND_JOYSTICK_COUNT, BUTTON_AUTOREPEAT_INITIAL, BUTTON_AUTOREPEAT_NEXT};

/// Per-button hold counters
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AutoRepeat {
    /// Ticks held since the last report, per line
    hold: [u8; BUTTON_AND_JOYSTICK_COUNT],
}

impl AutoRepeat {
    /// All counters released
    pub const fn new() -> Self {
        Self {
            hold: [0; BUTTON_AND_JOYSTICK_COUNT],
        }
    }

    /// Advance every hold counter by one scan tick and return the buttons that repeat on this
    /// tick.
    ///
    /// A button held continuously repeats on tick [`BUTTON_AUTOREPEAT_INITIAL`], then every
    /// [`BUTTON_AUTOREPEAT_NEXT`] ticks.
    pub fn tick(&mut self, state: ButtonState) -> ButtonState {
        let mut repeats = 0;
        for (line, hold) in self.hold.iter_mut().enumerate() {
            if !state.is_set(line) {
                *hold = 0;
                continue;
            }

            *hold += 1;
            if *hold >= BUTTON_AUTOREPEAT_INITIAL {
                repeats |= 1 << line;
                *hold = BUTTON_AUTOREPEAT_INITIAL - BUTTON_AUTOREPEAT_NEXT;
            }
        }
        ButtonState::from_bits(repeats)
    }

    /// Ticks counted towards the next repeat of `line`
    pub fn hold_count(&self, line: usize) -> u8 {
        self.hold.get(line).copied().unwrap_or(0)
    }
}

impl Default for AutoRepeat {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buttons::Button;

    fn hold(autorepeat: &mut AutoRepeat, state: ButtonState, ticks: u32) -> u32 {
        (0..ticks)
            .filter(|_| !autorepeat.tick(state).is_empty())
            .count() as u32
    }

    #[test]
    fn short_hold_does_not_repeat() {
        let mut autorepeat = AutoRepeat::new();
        let select = ButtonState::from_bits(Button::Select.mask());
        assert_eq!(hold(&mut autorepeat, select, BUTTON_AUTOREPEAT_INITIAL as u32 - 1), 0);
        assert_eq!(autorepeat.hold_count(Button::Select as usize), BUTTON_AUTOREPEAT_INITIAL - 1);
    }

    #[test]
    fn initial_delay_emits_one_repeat() {
        let mut autorepeat = AutoRepeat::new();
        let select = ButtonState::from_bits(Button::Select.mask());
        assert_eq!(hold(&mut autorepeat, select, BUTTON_AUTOREPEAT_INITIAL as u32), 1);
    }

    #[test]
    fn steady_repeat_after_initial_delay() {
        let mut autorepeat = AutoRepeat::new();
        let up = ButtonState::from_bits(Button::Up.mask());
        let ticks = BUTTON_AUTOREPEAT_INITIAL as u32 + 2 * BUTTON_AUTOREPEAT_NEXT as u32;
        assert_eq!(hold(&mut autorepeat, up, ticks), 3);
        // One tick short of the fourth
        assert_eq!(hold(&mut autorepeat, up, BUTTON_AUTOREPEAT_NEXT as u32 - 1), 0);
        assert_eq!(hold(&mut autorepeat, up, 1), 1);
    }

    #[test]
    fn repeat_reports_only_held_button() {
        let mut autorepeat = AutoRepeat::new();
        let state = ButtonState::from_bits(Button::Left.mask());
        for _ in 1..BUTTON_AUTOREPEAT_INITIAL {
            autorepeat.tick(state);
        }
        assert_eq!(autorepeat.tick(state), state);
    }

    #[test]
    fn release_resets_counter() {
        let mut autorepeat = AutoRepeat::new();
        let select = ButtonState::from_bits(Button::Select.mask());
        hold(&mut autorepeat, select, BUTTON_AUTOREPEAT_INITIAL as u32 - 1);
        autorepeat.tick(ButtonState::default());
        assert_eq!(autorepeat.hold_count(Button::Select as usize), 0);
        assert_eq!(hold(&mut autorepeat, select, BUTTON_AUTOREPEAT_INITIAL as u32 - 1), 0);
    }
}
