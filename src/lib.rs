//! Real-time input and acquisition core of a small [RP2040](https://docs.rs/rp2040-hal)
//! oscilloscope.
//!
//! Two interrupts drive everything:
//!
//! - the **scan timer** (200 Hz) maps the joystick onto four virtual buttons
//!   ([`joystick`]), debounces all nine inputs ([`buttons`]) and generates autorepeat presses
//!   ([`autorepeat`]),
//! - the **sampling interrupt** stores every ADC conversion in a power-of-two ring buffer and
//!   counts the ones it missed ([`acquisition`], [`buffer`]).
//!
//! The foreground loop reads the debounced state, collects presses, copies trigger-aligned
//! waveforms out of the ring buffer and moves bytes through the host [`fifo`]s. Process-wide
//! state and the entry points for the handlers live in [`interrupt`].
//!
//! ## Crate features
//!
//! - `rp2040`: Builds the firmware binary for the board (implies `defmt`).
//! - `defmt`: Logs through [defmt](https://docs.rs/defmt) instead of the [`log`] facade, and
//!   derives `defmt::Format` on public types.
//! - `trace_samples`: Logs every ADC sample, missed deadline and waveform capture. Very noisy!
//! - `trace_buttons`: Logs every change of the debounced button state.
//!
//! ## Demo
//!
//! ```
//! use scope_frontend::{buttons::Button, fifo::ByteFifo, interrupt};
//!
//! interrupt::init_scanner();
//! // Two scan ticks with the joystick pushed right
//! interrupt::button_scan(0, [4000, 2048]);
//! interrupt::button_scan(0, [4000, 2048]);
//! assert!(interrupt::buttons().is_pressed(Button::Right));
//! assert!(interrupt::take_presses().is_pressed(Button::Right));
//!
//! let fifo = ByteFifo::<4>::new();
//! fifo.put(b'a').unwrap();
//! assert_eq!(fifo.get(), Ok(b'a'));
//! ```

// Copyright 2024 Cameron Rodriguez
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg), feature(doc_auto_cfg), feature(doc_cfg_hide))]

mod fmt;

pub mod acquisition;
pub mod autorepeat;
pub mod buffer;
pub mod buttons;
pub mod components;
pub mod config;
pub mod fifo;
pub mod interrupt;
pub mod joystick;
