//! Hardware seams: the physical buttons and the analog front end, as seen by the interrupt
//! handlers.

// SPDX-License-Identifier: Apache-2.0

use embedded_hal::digital::InputPin;

/// Electrical level of a pressed button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActiveLevel {
    /// Button pulls the line low (pull-up input)
    Low,
    /// Button pulls the line high (pull-down input)
    High,
}

/// A pin plus the level it reads when its button is pressed
pub struct ButtonPin<P> {
    /// Configured input
    pin: P,
    /// Level read while pressed
    active: ActiveLevel,
}

impl<P: InputPin> ButtonPin<P> {
    /// Wrap a configured input pin
    pub fn new(pin: P, active: ActiveLevel) -> Self {
        Self { pin, active }
    }

    /// Button currently reads pressed (no debouncing)
    pub fn is_pressed(&mut self) -> Result<bool, P::Error> {
        match self.active {
            ActiveLevel::Low => self.pin.is_low(),
            ActiveLevel::High => self.pin.is_high(),
        }
    }
}

/// The physical buttons, sampled together into a raw bitmap. Pin `i` maps to bit `i`.
pub struct ButtonPins<P, const N: usize> {
    /// Pin `i` drives bit `i`
    pins: [ButtonPin<P>; N],
}

impl<P: InputPin, const N: usize> ButtonPins<P, N> {
    /// Buttons in bit order
    pub fn new(pins: [ButtonPin<P>; N]) -> Self {
        const { assert!(N <= 32, "raw bitmap holds at most 32 buttons") };
        Self { pins }
    }

    /// Sample every pin once and return the raw bitmap (bit set = reads pressed)
    pub fn read_raw(&mut self) -> Result<u32, P::Error> {
        let mut raw = 0;
        for (line, pin) in self.pins.iter_mut().enumerate() {
            if pin.is_pressed()? {
                raw |= 1 << line;
            }
        }
        Ok(raw)
    }
}

/// Analog front end of the sampling channel, serviced once per sampling interrupt
pub trait AdcFrontEnd {
    /// Report, and clear, whether a conversion finished before the previous one was collected
    fn take_overrun(&mut self) -> bool;

    /// Collect the pending conversion
    fn read_sample(&mut self) -> i16;

    /// Drop whatever was left pending by an overrun and restart conversions on the sampling
    /// channel, so the next [`read_sample`](AdcFrontEnd::read_sample) is a fresh sample of it.
    ///
    /// Front ends that convert a single channel have nothing to realign.
    fn resync(&mut self) {}
}
