//! The acquisition runner
//!
//! Drives one continuous capture session through
//! `Uninitialized → Configured → Running → Stopped`. Each state is its own
//! type so the driver can only be called in the order it expects.
//! [`AcquisitionRunner::initialize`] is the way out of `Uninitialized`, a
//! configured runner can either be started or released right away, and a
//! stopped runner can be configured again.

use crate::{
    capture::{CaptureConfig, RESULT_BUFFER_LEN},
    config::Config,
    driver::{Clock, ContinuousAdc, Instant, ReadOutcome, ReadTimeout, Scheduler},
    record::{decode_and_log, DecodeSummary},
    target::{ChannelDescriptor, TargetProfile},
    Error,
};

/// Scheduler ticks to back off after a read timed out
pub const TIMEOUT_BACKOFF_TICKS: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Uninitialized,
    Configured,
    Running,
    Stopped,
}

mod sealed {
    pub trait Sealed {}
}

pub trait CaptureState: sealed::Sealed {
    const STATE: State;
}

/// Driver initialized and configured, not converting yet
pub struct Configured;

/// Converting
pub struct Running {
    started: Instant,
    started_cycles: u32,
}

/// Driver released
pub struct Stopped;

impl sealed::Sealed for Configured {}
impl sealed::Sealed for Running {}
impl sealed::Sealed for Stopped {}

impl CaptureState for Configured {
    const STATE: State = State::Configured;
}

impl CaptureState for Running {
    const STATE: State = State::Running;
}

impl CaptureState for Stopped {
    const STATE: State = State::Stopped;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerOptions {
    pub read_timeout: ReadTimeout,
    pub backoff_ticks: u32,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            read_timeout: None,
            backoff_ticks: TIMEOUT_BACKOFF_TICKS,
        }
    }
}

/// Result of a single [`AcquisitionRunner::read_batch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch {
    pub outcome: ReadOutcome,
    pub decoded: DecodeSummary,
}

impl Batch {
    pub fn bytes(&self) -> usize {
        self.outcome.bytes()
    }
}

pub struct AcquisitionRunner<D, P, S> {
    driver: D,
    platform: P,
    profile: &'static TargetProfile,
    config: CaptureConfig,
    options: RunnerOptions,
    buffer: [u8; RESULT_BUFFER_LEN],
    state: S,
}

impl<D, P, S: CaptureState> AcquisitionRunner<D, P, S> {
    pub fn state(&self) -> State {
        S::STATE
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn profile(&self) -> &'static TargetProfile {
        self.profile
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    fn into_state<T>(self, state: T) -> AcquisitionRunner<D, P, T> {
        AcquisitionRunner {
            driver: self.driver,
            platform: self.platform,
            profile: self.profile,
            config: self.config,
            options: self.options,
            buffer: self.buffer,
            state,
        }
    }
}

impl<D, P> AcquisitionRunner<D, P, Configured>
where
    D: ContinuousAdc,
    P: Scheduler + Clock,
{
    /// Set up a capture of `channels` at `sample_rate_khz`
    pub fn initialize(
        driver: D,
        platform: P,
        profile: &'static TargetProfile,
        channels: &[ChannelDescriptor],
        sample_rate_khz: u32,
        options: RunnerOptions,
    ) -> Result<Self, Error> {
        let config = CaptureConfig::with_channels(profile, channels, sample_rate_khz)?;
        Self::initialize_with(driver, platform, profile, config, options)
    }

    /// Set up a capture from a prepared configuration
    pub fn initialize_with(
        mut driver: D,
        platform: P,
        profile: &'static TargetProfile,
        config: CaptureConfig,
        options: RunnerOptions,
    ) -> Result<Self, Error> {
        config.check(profile)?;
        driver.initialize(&config.init).map_err(Error::Configure)?;

        for (i, pattern) in config.digital.patterns.iter().enumerate() {
            log::info!(
                "Pattern {}: unit {}, channel {}, attenuation {:?}, {} bit",
                i,
                pattern.unit.index() + 1,
                pattern.channel,
                pattern.attenuation,
                pattern.bit_width
            );
        }

        driver
            .configure(&config.digital)
            .map_err(Error::Configure)?;

        log::info!(
            "Conversion frame {} bytes, sample rate {} Hz",
            config.init.conv_frame_size,
            config.digital.sample_rate.to_Hz()
        );

        Ok(Self {
            driver,
            platform,
            profile,
            config,
            options,
            buffer: [0xcc; RESULT_BUFFER_LEN],
            state: Configured,
        })
    }

    pub fn start(mut self) -> Result<AcquisitionRunner<D, P, Running>, Error> {
        self.driver.start().map_err(Error::Start)?;

        let state = Running {
            started: self.platform.now(),
            started_cycles: self.platform.cycles(),
        };
        Ok(self.into_state(state))
    }

    /// Give the session back without ever starting it
    pub fn release(mut self) -> Result<AcquisitionRunner<D, P, Stopped>, Error> {
        self.driver.deinitialize().map_err(Error::Release)?;
        Ok(self.into_state(Stopped))
    }
}

impl<D, P> AcquisitionRunner<D, P, Running>
where
    D: ContinuousAdc,
    P: Scheduler + Clock,
{
    /// Block until conversions arrive, then decode and log them
    ///
    /// An overrun is not an error: whatever did arrive is still decoded, the
    /// dropped conversions are simply gone. After decoding the runner always
    /// yields once, as printing every record is slow enough that the read
    /// would otherwise never block and starve the idle task. A timeout is
    /// logged and followed by a long back-off.
    pub fn read_batch(&mut self) -> Result<Batch, Error> {
        let outcome = self
            .driver
            .read(&mut self.buffer, self.options.read_timeout)
            .map_err(Error::Read)?;

        let elapsed = self.platform.now() - self.state.started;
        let cycles = self.platform.cycles().wrapping_sub(self.state.started_cycles);
        log::info!(
            "Read took {} us ({} cycles) since start, {} bytes",
            elapsed.to_micros(),
            cycles,
            outcome.bytes()
        );

        let decoded = match outcome {
            ReadOutcome::Complete(len) | ReadOutcome::Overrun(len) => {
                if let ReadOutcome::Overrun(_) = outcome {
                    log::warn!("Conversions were dropped, reading can not keep up with the sample rate");
                }

                let decoded = decode_and_log(&self.buffer[..len.min(RESULT_BUFFER_LEN)], self.profile);
                self.platform.yield_now();
                decoded
            }
            ReadOutcome::Timeout => {
                log::warn!("No data, increase timeout or reduce the conversion frame size");
                self.platform.delay_ticks(self.options.backoff_ticks);
                DecodeSummary::default()
            }
        };

        Ok(Batch { outcome, decoded })
    }

    /// Stop converting and release the session
    pub fn stop(mut self) -> Result<AcquisitionRunner<D, P, Stopped>, Error> {
        self.driver.stop().map_err(Error::Release)?;
        self.driver.deinitialize().map_err(Error::Release)?;
        Ok(self.into_state(Stopped))
    }
}

impl<D, P> AcquisitionRunner<D, P, Stopped>
where
    D: ContinuousAdc,
    P: Scheduler + Clock,
{
    /// Set up a new session on the same driver
    pub fn reinitialize(self, config: CaptureConfig) -> Result<AcquisitionRunner<D, P, Configured>, Error> {
        AcquisitionRunner::initialize_with(self.driver, self.platform, self.profile, config, self.options)
    }

    pub fn into_parts(self) -> (D, P) {
        (self.driver, self.platform)
    }
}

/// Totals over all batches of a [`run`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub batches: u32,
    pub bytes: usize,
    pub decoded: DecodeSummary,
    pub overruns: u32,
    pub timeouts: u32,
}

impl RunSummary {
    fn add(&mut self, batch: &Batch) {
        self.batches += 1;
        self.bytes += batch.bytes();
        self.decoded += batch.decoded;
        match batch.outcome {
            ReadOutcome::Complete(_) => {}
            ReadOutcome::Overrun(_) => self.overruns += 1,
            ReadOutcome::Timeout => self.timeouts += 1,
        }
    }
}

/// Run the whole example once: configure the target's channel set, start,
/// read `config.batches` batches (forever if 0), then stop and release
pub fn run<D, P>(
    driver: D,
    platform: P,
    config: &Config,
) -> Result<(RunSummary, AcquisitionRunner<D, P, Stopped>), Error>
where
    D: ContinuousAdc,
    P: Scheduler + Clock,
{
    let profile = config.profile();
    log::info!("Capturing on {}", profile.target);

    let mut running = AcquisitionRunner::initialize(
        driver,
        platform,
        profile,
        profile.channels,
        config.sample_rate_khz,
        config.runner_options(),
    )?
    .start()?;

    let mut summary = RunSummary::default();
    while config.batches == 0 || summary.batches < config.batches {
        let batch = running.read_batch()?;
        summary.add(&batch);
    }

    let stopped = running.stop()?;
    log::info!(
        "Done after {} batches: {} bytes, {} valid and {} invalid records, {} overruns, {} timeouts",
        summary.batches,
        summary.bytes,
        summary.decoded.valid,
        summary.decoded.invalid,
        summary.overruns,
        summary.timeouts
    );

    Ok((summary, stopped))
}
