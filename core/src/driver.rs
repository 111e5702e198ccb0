//! The platform services the example runs on top of
//!
//! The continuous ADC driver, the task scheduler and the monotonic clock all
//! belong to the platform's hardware abstraction layer. The example only ever
//! talks to them through these traits. Digital outputs use
//! [`embedded_hal::digital::OutputPin`].

use fugit::{HertzU32, MillisDurationU32, TimerDurationU64, TimerInstantU64};

use crate::capture::{ConfigError, DigitalConfig, InitConfig};

/// Microsecond resolution instant of the platform clock
pub type Instant = TimerInstantU64<1_000_000>;
pub type Duration = TimerDurationU64<1_000_000>;

/// How long a read may block, `None` waits until data arrives
pub type ReadTimeout = Option<MillisDurationU32>;

/// Status codes of the continuous ADC driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    #[error("invalid argument")]
    InvalidArgument,
    #[error("invalid state")]
    InvalidState,
    #[error("not supported")]
    NotSupported,
    #[error("out of memory")]
    NoMemory,
    #[error("timed out")]
    Timeout,
    #[error("generic failure")]
    Fail,
}

impl From<ConfigError> for DriverError {
    fn from(value: ConfigError) -> Self {
        match value {
            ConfigError::UnsupportedMode(_) | ConfigError::UnsupportedFormat(_) => {
                DriverError::NotSupported
            }
            _ => DriverError::InvalidArgument,
        }
    }
}

/// Successful outcomes of a read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n` bytes were delivered
    Complete(usize),
    /// `n` bytes were delivered, but conversions were dropped since the
    /// previous read because the reader fell behind
    Overrun(usize),
    /// Nothing arrived before the timeout
    Timeout,
}

impl ReadOutcome {
    pub fn bytes(&self) -> usize {
        match self {
            ReadOutcome::Complete(n) | ReadOutcome::Overrun(n) => *n,
            ReadOutcome::Timeout => 0,
        }
    }
}

/// DMA driven continuous conversion
///
/// Calls follow the order `initialize`, `configure`, `start`, any number of
/// `read`s, `stop`, `deinitialize`. A driver may reject anything out of order
/// with [`DriverError::InvalidState`].
pub trait ContinuousAdc {
    /// Allocate the driver's ring buffer and claim the channels in the masks
    fn initialize(&mut self, config: &InitConfig) -> Result<(), DriverError>;

    /// Program the digital controller
    fn configure(&mut self, config: &DigitalConfig) -> Result<(), DriverError>;

    fn start(&mut self) -> Result<(), DriverError>;

    /// Copy up to `buffer.len()` bytes of finished conversions into `buffer`
    ///
    /// The number of bytes delivered is always a multiple of the record
    /// width.
    fn read(&mut self, buffer: &mut [u8], timeout: ReadTimeout)
        -> Result<ReadOutcome, DriverError>;

    fn stop(&mut self) -> Result<(), DriverError>;

    /// Release the ring buffer and interrupt registrations
    fn deinitialize(&mut self) -> Result<(), DriverError>;
}

pub trait Scheduler {
    /// Suspend the calling task for `ticks` scheduler ticks
    fn delay_ticks(&mut self, ticks: u32);

    fn tick_rate(&self) -> HertzU32;

    /// Give lower priority tasks (and the idle task feeding the watchdog) a
    /// chance to run
    fn yield_now(&mut self) {
        self.delay_ticks(1);
    }

    fn ticks_to_duration(&self, ticks: u32) -> Duration {
        let hz = u64::from(self.tick_rate().to_Hz().max(1));
        Duration::micros(u64::from(ticks) * 1_000_000 / hz)
    }
}

pub trait Clock {
    fn now(&self) -> Instant;

    /// Free running CPU cycle counter, wraps
    fn cycles(&self) -> u32;
}
