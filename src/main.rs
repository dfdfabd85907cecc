//! Oscilloscope input and acquisition firmware for the RP2040.
//!
//! All real-time work happens in two interrupts: `TIMER_IRQ_0` scans the buttons at
//! [`BUTTON_SCAN_RATE`], and `ADC_IRQ_FIFO` drains the free-running ADC. The main loop only
//! collects presses and waveforms.
#![no_std]
#![no_main]
#![doc(html_playground_url = "https://play.rust-lang.org/")]
#![warn(missing_docs)]

// SPDX-License-Identifier: Apache-2.0

use core::cell::RefCell;
use core::sync::atomic::{AtomicU16, Ordering};

use cortex_m::singleton;
use critical_section::Mutex;
use defmt::{debug, info, warn};
#[allow(unused_imports)]
use defmt_rtt as _;
#[allow(unused_imports)]
use panic_probe as _;
use rp2040_hal::{
    adc::{Adc, AdcFifo, AdcPin},
    clocks::init_clocks_and_plls,
    entry,
    fugit::MicrosDurationU32,
    gpio::{DynPinId, FunctionSioInput, Pin, Pins, PullUp},
    pac::{self, interrupt},
    timer::{Alarm, Alarm0, Timer},
    Sio, Watchdog,
};
use scope_frontend::{
    buffer::TriggerConfig,
    components::{ActiveLevel, AdcFrontEnd, ButtonPin, ButtonPins},
    config::{
        ADC_ACHIEVED_SAMPLING_RATE, ADC_CLOCK_DIVIDER, ADC_INT_PRIORITY, ADC_ROUND_ROBIN_CHANNELS,
        BUTTON_COUNT, BUTTON_INT_PRIORITY, BUTTON_SCAN_PERIOD_US, BUTTON_SCAN_RATE,
    },
    interrupt::{
        adc_errors, adc_sample, button_scan, capture_waveform, init_scanner, take_presses,
        Waveform, TX_FIFO,
    },
};

/// Second-stage bootloader, from [rp2040-boot2](https://docs.rs/rp2040-boot2)
#[link_section = ".boot2"]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_W25Q080;
/// External high-speed crystal on the pico board is 12Mhz
pub const XOSC_FREQ_HZ: u32 = 12_000_000;
/// Attempts at copying a waveform before giving up on this frame
const CAPTURE_ATTEMPTS: usize = 3;
/// ADC input of the scope pin (GPIO26), first in the round robin
const SCOPE_ADC_CHANNEL: u8 = 0;

/// Button input pin, type-erased so all buttons fit in one array
type ButtonInput = Pin<DynPinId, FunctionSioInput, PullUp>;

/// Everything the scan timer interrupt needs
struct ScanHardware {
    /// Schedules the next scan tick
    alarm: Alarm0,
    /// Physical buttons, active low
    buttons: ButtonPins<ButtonInput, BUTTON_COUNT>,
}

/// Scan timer hardware for access in the interrupt
static SCAN_HARDWARE: Mutex<RefCell<Option<ScanHardware>>> = Mutex::new(RefCell::new(None));
/// Free-running ADC FIFO for access in the interrupt
static READINGS_FIFO: Mutex<RefCell<Option<AdcFifo<'static, u16>>>> =
    Mutex::new(RefCell::new(None));
/// Latest joystick readings, `[x, y]`, written by the sampling interrupt
static JOYSTICK: [AtomicU16; 2] = [AtomicU16::new(2048), AtomicU16::new(2048)];

/// Scope channel of the ADC FIFO, one conversion per call. The caller reads the joystick
/// conversions that follow it.
struct ScopeChannel<'f> {
    /// FIFO positioned on a scope sample
    fifo: &'f mut AdcFifo<'static, u16>,
}

impl AdcFrontEnd for ScopeChannel<'_> {
    fn take_overrun(&mut self) -> bool {
        let overrun = self.fifo.is_over();
        if overrun {
            self.fifo.clear_over();
        }
        overrun
    }

    fn read_sample(&mut self) -> i16 {
        self.fifo.read() as i16
    }

    fn resync(&mut self) {
        // A full FIFO dropped an unknown number of conversions, so the round robin phase of the
        // queued readings is lost. Stop, empty the FIFO and restart on the scope channel.
        self.fifo.pause();
        // SAFETY: conversions are paused and only AINSEL is written, which the FIFO never touches
        let adc = unsafe { &*pac::ADC::ptr() };
        while adc.cs().read().ready().bit_is_clear() {}
        while self.fifo.len() > 0 {
            self.fifo.read();
        }
        self.fifo.clear_over();
        adc.cs().modify(|_, w| unsafe { w.ainsel().bits(SCOPE_ADC_CHANNEL) });
        self.fifo.resume();
    }
}

/// Main operation loop
#[entry]
fn main() -> ! {
    info!("Scope front end startup");
    let mut pac = pac::Peripherals::take().unwrap();
    let mut core = pac::CorePeripherals::take().unwrap();
    let mut watchdog = Watchdog::new(pac.WATCHDOG);
    let sio = Sio::new(pac.SIO);

    let clocks = init_clocks_and_plls(
        XOSC_FREQ_HZ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .ok()
    .unwrap();
    let pins = Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    // Buttons, in bit order
    let button_pin = |pin: ButtonInput| ButtonPin::new(pin, ActiveLevel::Low);
    let buttons = ButtonPins::new([
        button_pin(pins.gpio2.into_pull_up_input().into_dyn_pin()),
        button_pin(pins.gpio3.into_pull_up_input().into_dyn_pin()),
        button_pin(pins.gpio4.into_pull_up_input().into_dyn_pin()),
        button_pin(pins.gpio5.into_pull_up_input().into_dyn_pin()),
        button_pin(pins.gpio6.into_pull_up_input().into_dyn_pin()),
    ]);
    init_scanner();

    // Scan timer, first tick one period from now
    let mut timer = Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);
    let mut alarm = timer.alarm_0().unwrap();
    alarm
        .schedule(MicrosDurationU32::micros(BUTTON_SCAN_PERIOD_US))
        .unwrap();
    alarm.enable_interrupt();
    debug!("critical_section: transfer scan hardware to mutex");
    critical_section::with(|cs| SCAN_HARDWARE.replace(cs, Some(ScanHardware { alarm, buttons })));

    // Free-running ADC: scope input, joystick X, joystick Y in turn
    let adc = singleton!(: Adc = Adc::new(pac.ADC, &mut pac.RESETS)).unwrap();
    let mut scope_pin = AdcPin::new(pins.gpio26.into_floating_input()).unwrap();
    let joystick_x = AdcPin::new(pins.gpio27.into_floating_input()).unwrap();
    let joystick_y = AdcPin::new(pins.gpio28.into_floating_input()).unwrap();
    let readings_fifo = adc
        .build_fifo()
        // Ex. 48 MHz ADC clock, 3 channels at 160 ksamples/s each -> convert every 100 clk cycles
        .clock_divider(ADC_CLOCK_DIVIDER, 0)
        .set_channel(&mut scope_pin)
        .round_robin((&scope_pin, &joystick_x, &joystick_y))
        .enable_interrupt(ADC_ROUND_ROBIN_CHANNELS as u8)
        .start();
    debug!("critical_section: transfer readings FIFO to mutex");
    critical_section::with(|cs| READINGS_FIFO.replace(cs, Some(readings_fifo)));

    unsafe {
        core.NVIC.set_priority(pac::Interrupt::ADC_IRQ_FIFO, ADC_INT_PRIORITY);
        core.NVIC.set_priority(pac::Interrupt::TIMER_IRQ_0, BUTTON_INT_PRIORITY);
        pac::NVIC::unmask(pac::Interrupt::ADC_IRQ_FIFO);
        pac::NVIC::unmask(pac::Interrupt::TIMER_IRQ_0);
    }
    info!(
        "Scanning buttons at {=u32} Hz, sampling at {=u32} samples/s",
        BUTTON_SCAN_RATE, ADC_ACHIEVED_SAMPLING_RATE
    );

    let trigger = TriggerConfig::default();
    let waveform = singleton!(: Waveform = Waveform::new()).unwrap();
    let mut reported_errors = 0;
    loop {
        let presses = take_presses();
        for button in presses.iter() {
            if TX_FIFO.put(button as u8).is_err() {
                warn!("Host FIFO full, dropping press of {}", button);
            }
        }

        match capture_waveform(&trigger, waveform, CAPTURE_ATTEMPTS) {
            Ok(capture) if !capture.triggered => debug!("No trigger found"),
            Ok(_) => {}
            Err(err) => debug!("Waveform capture failed: {}", err),
        }

        let errors = adc_errors();
        if errors != reported_errors {
            warn!("{=u32} missed ADC deadlines", errors);
            reported_errors = errors;
        }

        cortex_m::asm::wfi();
    }
}

/// Button scan tick
#[interrupt]
fn TIMER_IRQ_0() {
    critical_section::with(|cs| {
        let mut hardware = SCAN_HARDWARE.borrow_ref_mut(cs);
        let Some(hardware) = hardware.as_mut() else {
            return;
        };

        hardware.alarm.clear_interrupt();
        if hardware
            .alarm
            .schedule(MicrosDurationU32::micros(BUTTON_SCAN_PERIOD_US))
            .is_err()
        {
            warn!("Unable to schedule the next button scan");
        }

        let raw = match hardware.buttons.read_raw() {
            Ok(raw) => raw,
            Err(never) => match never {},
        };
        let joystick = [
            JOYSTICK[0].load(Ordering::Relaxed),
            JOYSTICK[1].load(Ordering::Relaxed),
        ];
        button_scan(raw, joystick);
    });
}

/// ADC FIFO reached one round of conversions
#[interrupt]
fn ADC_IRQ_FIFO() {
    critical_section::with(|cs| {
        let mut fifo = READINGS_FIFO.borrow_ref_mut(cs);
        let Some(fifo) = fifo.as_mut() else {
            return;
        };

        while fifo.len() >= ADC_ROUND_ROBIN_CHANNELS as u8 {
            if !adc_sample(&mut ScopeChannel { fifo: &mut *fifo }) {
                // Resynchronised, the FIFO restarts empty
                break;
            }
            JOYSTICK[0].store(fifo.read(), Ordering::Relaxed);
            JOYSTICK[1].store(fifo.read(), Ordering::Relaxed);
        }
    });
}
