//! In-memory driver, platform and log capture for the unit tests

use std::{cell::Cell, cell::RefCell, collections::VecDeque, string::String, vec::Vec};

use fugit::HertzU32;

use crate::{
    capture::{DigitalConfig, InitConfig},
    driver::{Clock, ContinuousAdc, DriverError, Instant, ReadOutcome, ReadTimeout, Scheduler},
    record::{RecordLayout, SampleRecord},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Initialize,
    Configure,
    Start,
    Read,
    Stop,
    Deinitialize,
}

/// Driver that replays queued read results
#[derive(Debug, Default)]
pub struct ScriptedAdc {
    pub calls: Vec<Call>,
    pub reads: VecDeque<Result<(ReadOutcome, Vec<u8>), DriverError>>,
    pub fail_initialize: Option<DriverError>,
    pub fail_configure: Option<DriverError>,
    pub fail_start: Option<DriverError>,
    pub fail_deinitialize: Option<DriverError>,
}

impl ScriptedAdc {
    pub fn push_read(&mut self, outcome: ReadOutcome, data: &[u8]) {
        self.reads.push_back(Ok((outcome, data.to_vec())));
    }

    pub fn push_read_error(&mut self, error: DriverError) {
        self.reads.push_back(Err(error));
    }

    fn call(&mut self, call: Call, fail: Option<DriverError>) -> Result<(), DriverError> {
        self.calls.push(call);
        fail.map_or(Ok(()), Err)
    }
}

impl ContinuousAdc for ScriptedAdc {
    fn initialize(&mut self, _config: &InitConfig) -> Result<(), DriverError> {
        self.call(Call::Initialize, self.fail_initialize)
    }

    fn configure(&mut self, _config: &DigitalConfig) -> Result<(), DriverError> {
        self.call(Call::Configure, self.fail_configure)
    }

    fn start(&mut self) -> Result<(), DriverError> {
        self.call(Call::Start, self.fail_start)
    }

    fn read(
        &mut self,
        buffer: &mut [u8],
        _timeout: ReadTimeout,
    ) -> Result<ReadOutcome, DriverError> {
        self.calls.push(Call::Read);
        let (outcome, data) = self.reads.pop_front().unwrap_or(Ok((ReadOutcome::Timeout, Vec::new())))?;
        buffer[..data.len()].copy_from_slice(&data);
        Ok(outcome)
    }

    fn stop(&mut self) -> Result<(), DriverError> {
        self.call(Call::Stop, None)
    }

    fn deinitialize(&mut self) -> Result<(), DriverError> {
        self.call(Call::Deinitialize, self.fail_deinitialize)
    }
}

/// Scheduler and clock on simulated time
///
/// Time only moves when the runner delays, plus a microsecond per clock read.
#[derive(Debug, Default)]
pub struct SimPlatform {
    pub delays: Vec<u32>,
    micros: Cell<u64>,
}

impl SimPlatform {
    const TICK_RATE_HZ: u32 = 100;
}

impl Scheduler for SimPlatform {
    fn delay_ticks(&mut self, ticks: u32) {
        self.delays.push(ticks);
        let micros = self.ticks_to_duration(ticks).to_micros();
        self.micros.set(self.micros.get() + micros);
    }

    fn tick_rate(&self) -> HertzU32 {
        HertzU32::Hz(Self::TICK_RATE_HZ)
    }
}

impl Clock for SimPlatform {
    fn now(&self) -> Instant {
        let now = self.micros.get() + 1;
        self.micros.set(now);
        Instant::from_ticks(now)
    }

    fn cycles(&self) -> u32 {
        (self.micros.get() as u32).wrapping_mul(160)
    }
}

pub fn encode_records(layout: &RecordLayout, records: &[SampleRecord]) -> Vec<u8> {
    let mut data = vec![0; records.len() * layout.width];
    for (record, out) in records.iter().zip(data.chunks_exact_mut(layout.width)) {
        layout.encode(record, out);
    }
    data
}

thread_local! {
    static CAPTURED: RefCell<Option<Vec<String>>> = const { RefCell::new(None) };
}

struct CaptureLogger;

impl log::Log for CaptureLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        CAPTURED.with(|captured| {
            if let Some(lines) = captured.borrow_mut().as_mut() {
                lines.push(record.args().to_string());
            }
        });
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;

/// Run `f` and return the messages it logged on this thread
pub fn captured_logs<R>(f: impl FnOnce() -> R) -> (R, Vec<String>) {
    // Another test may have installed it already
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(log::LevelFilter::Trace);

    CAPTURED.with(|captured| *captured.borrow_mut() = Some(Vec::new()));
    let result = f();
    let lines = CAPTURED.with(|captured| captured.borrow_mut().take().unwrap_or_default());

    (result, lines)
}
