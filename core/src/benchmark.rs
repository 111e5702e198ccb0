//! GPIO toggle benchmark
//!
//! Flips a digital output as fast as the loop allows so the edge rate can be
//! measured externally with a scope, and reports how long the toggling took
//! according to the platform clock.

use core::convert::Infallible;

use embedded_hal::digital::OutputPin;

use crate::driver::{Clock, Duration};

pub const DEFAULT_REPORT_EVERY: u32 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleReport {
    pub toggles: u32,
    pub elapsed: Duration,
    pub cycles: u32,
}

impl ToggleReport {
    pub fn cycles_per_toggle(&self) -> u32 {
        self.cycles.checked_div(self.toggles).unwrap_or(0)
    }
}

pub struct ToggleBenchmark<O, C> {
    pin: O,
    clock: C,
    high: bool,
    report_every: u32,
}

impl<O: OutputPin, C: Clock> ToggleBenchmark<O, C> {
    pub fn new(pin: O, clock: C, report_every: u32) -> Self {
        Self {
            pin,
            clock,
            high: false,
            report_every: report_every.max(1),
        }
    }

    /// Toggle the pin `toggles` times
    pub fn run_for(&mut self, toggles: u32) -> Result<ToggleReport, O::Error> {
        let start = self.clock.now();
        let start_cycles = self.clock.cycles();

        for _ in 0..toggles {
            self.high = !self.high;
            if self.high {
                self.pin.set_high()?;
            } else {
                self.pin.set_low()?;
            }
        }

        Ok(ToggleReport {
            toggles,
            elapsed: self.clock.now() - start,
            cycles: self.clock.cycles().wrapping_sub(start_cycles),
        })
    }

    /// Toggle forever, logging a report every `report_every` toggles
    ///
    /// Only returns if the pin fails.
    pub fn run(mut self) -> Result<Infallible, O::Error> {
        loop {
            let report = self.run_for(self.report_every)?;
            log::info!(
                "{} toggles in {} us, {} cycles per toggle",
                report.toggles,
                report.elapsed.to_micros(),
                report.cycles_per_toggle()
            );
        }
    }

    pub fn into_pin(self) -> O {
        self.pin
    }
}
