//! Scheduler, clock and GPIO on top of the host OS

use std::{convert::Infallible, thread, time};

use adc_dma_core::driver::{Clock, Instant, Scheduler};
use embedded_hal::digital::{ErrorType, OutputPin};
use fugit::HertzU32;

/// Tick rate of the scheduler being simulated
pub const DEFAULT_TICK_RATE: HertzU32 = HertzU32::Hz(100);
/// Clock of the simulated CPU's cycle counter
pub const DEFAULT_CPU_CLOCK: HertzU32 = HertzU32::MHz(160);

pub struct StdPlatform {
    epoch: time::Instant,
    tick_rate: HertzU32,
    cpu_clock: HertzU32,
}

impl Default for StdPlatform {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_RATE)
    }
}

impl StdPlatform {
    pub fn new(tick_rate: HertzU32) -> Self {
        Self {
            epoch: time::Instant::now(),
            tick_rate,
            cpu_clock: DEFAULT_CPU_CLOCK,
        }
    }
}

impl Scheduler for StdPlatform {
    fn delay_ticks(&mut self, ticks: u32) {
        let duration = self.ticks_to_duration(ticks);
        thread::sleep(time::Duration::from_micros(duration.to_micros()));
    }

    fn tick_rate(&self) -> HertzU32 {
        self.tick_rate
    }
}

impl Clock for StdPlatform {
    fn now(&self) -> Instant {
        Instant::from_ticks(self.epoch.elapsed().as_micros() as u64)
    }

    fn cycles(&self) -> u32 {
        let nanos = self.epoch.elapsed().as_nanos();
        (nanos * u128::from(self.cpu_clock.to_Hz()) / 1_000_000_000) as u32
    }
}

/// Output pin that only counts its edges
#[derive(Debug, Default)]
pub struct FakePin {
    high: bool,
    edges: u64,
}

impl FakePin {
    pub fn is_high(&self) -> bool {
        self.high
    }

    pub fn edges(&self) -> u64 {
        self.edges
    }

    fn set(&mut self, high: bool) {
        if self.high != high {
            self.edges += 1;
        }
        self.high = high;
    }
}

impl ErrorType for FakePin {
    type Error = Infallible;
}

impl OutputPin for FakePin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set(true);
        Ok(())
    }
}
