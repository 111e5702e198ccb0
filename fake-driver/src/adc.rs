//! Continuous ADC running on a host thread
//!
//! A producer thread plays the DMA engine: every conversion frame period it
//! writes one frame of records into the shared ring and wakes the reader.
//! When the reader falls behind, frames that no longer fit are dropped and
//! the next read reports an overrun.

use std::{
    sync::{Arc, Condvar, Mutex, MutexGuard},
    thread::{self, JoinHandle},
    time::Duration,
};

use adc_dma_core::{
    capture::{DigitalConfig, InitConfig},
    driver::{ContinuousAdc, DriverError, ReadOutcome, ReadTimeout},
    record::{RecordLayout, SampleRecord},
    target::TargetProfile,
};

use crate::{
    platform::DEFAULT_TICK_RATE,
    ring_buffer::RingBuffer,
    signal::{CosineSignal, SignalSettings},
};

/// Behaviour of the simulation that can be set from the config file
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub signal: SignalSettings,
    /// Report every read as an overrun
    pub force_overrun: bool,
    /// Start converting but never deliver a frame
    pub stall: bool,
    /// Scheduler tick rate, ticks are what delays and the timeout back-off
    /// are counted in
    pub tick_rate_hz: u32,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            signal: SignalSettings::default(),
            force_overrun: false,
            stall: false,
            tick_rate_hz: DEFAULT_TICK_RATE.to_Hz(),
        }
    }
}

/// Driver entry points a fault can be injected into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Initialize,
    Configure,
    Start,
    Read,
    Stop,
    Deinitialize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriverState {
    Uninitialized,
    Initialized,
    Configured,
    Running,
}

struct Ring {
    buffer: RingBuffer,
    overrun: bool,
    running: bool,
}

struct Shared {
    ring: Mutex<Ring>,
    changed: Condvar,
}

impl Shared {
    fn lock(&self) -> Result<MutexGuard<'_, Ring>, DriverError> {
        self.ring.lock().map_err(|_| DriverError::Fail)
    }
}

pub struct FakeAdc {
    profile: &'static TargetProfile,
    settings: SimulationSettings,
    faults: Vec<(Operation, DriverError)>,
    state: DriverState,
    init: Option<InitConfig>,
    digital: Option<DigitalConfig>,
    shared: Option<Arc<Shared>>,
    producer: Option<JoinHandle<()>>,
}

impl FakeAdc {
    pub fn new(profile: &'static TargetProfile, settings: SimulationSettings) -> Self {
        Self {
            profile,
            settings,
            faults: Vec::new(),
            state: DriverState::Uninitialized,
            init: None,
            digital: None,
            shared: None,
            producer: None,
        }
    }

    /// Make `operation` fail with `error` from now on
    pub fn with_fault(mut self, operation: Operation, error: DriverError) -> Self {
        self.faults.push((operation, error));
        self
    }

    pub fn is_running(&self) -> bool {
        self.state == DriverState::Running
    }

    fn check_fault(&self, operation: Operation) -> Result<(), DriverError> {
        match self.faults.iter().find(|(op, _)| *op == operation) {
            Some((_, error)) => {
                log::debug!("Injected {error} on {operation:?}");
                Err(*error)
            }
            None => Ok(()),
        }
    }

    fn require(&self, states: &[DriverState]) -> Result<(), DriverError> {
        if states.contains(&self.state) {
            Ok(())
        } else {
            Err(DriverError::InvalidState)
        }
    }

    fn shared(&self) -> Result<&Arc<Shared>, DriverError> {
        self.shared.as_ref().ok_or(DriverError::InvalidState)
    }

    fn halt_producer(&mut self) -> Result<(), DriverError> {
        if let Some(shared) = &self.shared {
            shared.lock()?.running = false;
            shared.changed.notify_all();
        }

        match self.producer.take() {
            Some(producer) => producer.join().map_err(|_| DriverError::Fail),
            None => Ok(()),
        }
    }
}

impl ContinuousAdc for FakeAdc {
    fn initialize(&mut self, config: &InitConfig) -> Result<(), DriverError> {
        self.check_fault(Operation::Initialize)?;
        self.require(&[DriverState::Uninitialized])?;
        config.check(self.profile)?;

        self.shared = Some(Arc::new(Shared {
            ring: Mutex::new(Ring {
                buffer: RingBuffer::new(config.max_store_buf_size),
                overrun: false,
                running: false,
            }),
            changed: Condvar::new(),
        }));
        self.init = Some(config.clone());
        self.state = DriverState::Initialized;
        Ok(())
    }

    fn configure(&mut self, config: &DigitalConfig) -> Result<(), DriverError> {
        self.check_fault(Operation::Configure)?;
        self.require(&[DriverState::Initialized, DriverState::Configured])?;
        config.check(self.profile)?;

        let init = self.init.as_ref().ok_or(DriverError::InvalidState)?;
        for pattern in &config.patterns {
            let bit = 1u16.checked_shl(pattern.channel.into()).unwrap_or(0);
            if init.chan_mask(pattern.unit) & bit == 0 {
                log::debug!("Channel {} of {:?} was not claimed", pattern.channel, pattern.unit);
                return Err(DriverError::InvalidArgument);
            }
        }

        self.digital = Some(config.clone());
        self.state = DriverState::Configured;
        Ok(())
    }

    fn start(&mut self) -> Result<(), DriverError> {
        self.check_fault(Operation::Start)?;
        self.require(&[DriverState::Configured])?;

        let (Some(init), Some(digital)) = (&self.init, &self.digital) else {
            return Err(DriverError::InvalidState);
        };
        let shared = self.shared()?.clone();

        {
            let mut ring = shared.lock()?;
            ring.buffer.clear();
            ring.overrun = false;
            ring.running = true;
        }

        let producer = Producer {
            shared,
            layout: self.profile.layout,
            digital: digital.clone(),
            frame_size: init.conv_frame_size,
            signal: CosineSignal::new(self.settings.signal, digital.sample_rate.to_Hz()),
            stall: self.settings.stall,
            index: 0,
        };

        self.producer = Some(
            thread::Builder::new()
                .name("adc-dma".into())
                .spawn(move || producer.run())
                .map_err(|_| DriverError::NoMemory)?,
        );
        self.state = DriverState::Running;
        Ok(())
    }

    fn read(
        &mut self,
        buffer: &mut [u8],
        timeout: ReadTimeout,
    ) -> Result<ReadOutcome, DriverError> {
        self.check_fault(Operation::Read)?;
        self.require(&[DriverState::Running])?;

        let shared = self.shared()?;
        let waiting = |ring: &mut Ring| ring.buffer.is_empty() && ring.running;
        let guard = shared.lock()?;
        let mut ring = match timeout {
            Some(timeout) => {
                let timeout = Duration::from_millis(timeout.to_millis().into());
                shared
                    .changed
                    .wait_timeout_while(guard, timeout, waiting)
                    .map_err(|_| DriverError::Fail)?
                    .0
            }
            None => shared
                .changed
                .wait_while(guard, waiting)
                .map_err(|_| DriverError::Fail)?,
        };

        let len = ring.buffer.pop_into(buffer, self.profile.record_width());
        if len == 0 {
            return Ok(ReadOutcome::Timeout);
        }

        let overrun = core::mem::take(&mut ring.overrun) || self.settings.force_overrun;
        Ok(if overrun {
            ReadOutcome::Overrun(len)
        } else {
            ReadOutcome::Complete(len)
        })
    }

    fn stop(&mut self) -> Result<(), DriverError> {
        self.check_fault(Operation::Stop)?;
        self.require(&[DriverState::Running])?;

        self.halt_producer()?;
        self.state = DriverState::Configured;
        Ok(())
    }

    fn deinitialize(&mut self) -> Result<(), DriverError> {
        self.check_fault(Operation::Deinitialize)?;
        self.require(&[DriverState::Initialized, DriverState::Configured])?;

        self.shared = None;
        self.init = None;
        self.digital = None;
        self.state = DriverState::Uninitialized;
        Ok(())
    }
}

impl Drop for FakeAdc {
    fn drop(&mut self) {
        if let Err(e) = self.halt_producer() {
            log::error!("Simulated DMA did not shut down: {e}");
        }
    }
}

struct Producer {
    shared: Arc<Shared>,
    layout: RecordLayout,
    digital: DigitalConfig,
    frame_size: usize,
    signal: CosineSignal,
    stall: bool,
    index: u64,
}

impl Producer {
    fn frame_period(&self) -> Duration {
        let records = (self.frame_size / self.layout.width) as u64;
        let hz = u64::from(self.digital.sample_rate.to_Hz().max(1));
        Duration::from_micros(records * 1_000_000 / hz)
    }

    fn fill(&mut self, frame: &mut [u8]) {
        let patterns = &self.digital.patterns;
        if patterns.is_empty() {
            return;
        }

        for out in frame.chunks_exact_mut(self.layout.width) {
            let slot = (self.index % patterns.len() as u64) as usize;
            let pattern = &patterns[slot];
            let phase = slot as f32 * core::f32::consts::FRAC_PI_2;
            let bits = pattern.bit_width.min(self.layout.value_bits);

            let record = SampleRecord {
                unit: pattern.unit.index(),
                channel: pattern.channel,
                value: self.signal.sample(self.index, phase, bits),
            };
            self.layout.encode(&record, out);
            self.index += 1;
        }
    }

    fn run(mut self) {
        let period = self.frame_period();
        let mut frame = vec![0; self.frame_size];
        log::debug!("Simulated DMA running, one frame every {} us", period.as_micros());

        loop {
            let Ok(guard) = self.shared.lock() else {
                return;
            };
            let Ok((ring, _)) = self
                .shared
                .changed
                .wait_timeout_while(guard, period, |ring| ring.running)
            else {
                return;
            };

            if !ring.running {
                break;
            }
            if self.stall {
                continue;
            }

            drop(ring);
            self.fill(&mut frame);
            let Ok(mut ring) = self.shared.lock() else {
                return;
            };

            if !ring.buffer.push_frame(&frame) {
                log::trace!("Ring full, frame dropped");
                ring.overrun = true;
            }
            self.shared.changed.notify_all();
        }

        log::debug!("Simulated DMA stopped");
    }
}
