use adc_dma_core::{
    driver::DriverError, runner::State, AcquisitionRunner, CaptureConfig, Config, Error, Target,
};
use adc_dma_fake_driver::{FakeAdc, Operation, SimulationSettings, StdPlatform};
use fugit::HertzU32;

fn config(target: Target, sample_rate_khz: u32, batches: u32) -> Config {
    Config {
        target,
        sample_rate_khz,
        batches,
        read_timeout_ms: Some(1000),
        backoff_ticks: 5,
    }
}

fn platform() -> StdPlatform {
    StdPlatform::new(HertzU32::Hz(1000))
}

#[test]
fn every_target_runs_end_to_end() {
    for target in Target::ALL {
        let khz = if target == Target::Esp32 { 200 } else { 40 };
        let config = config(target, khz, 3);
        let driver = FakeAdc::new(config.profile(), SimulationSettings::default());

        let (summary, stopped) = adc_dma_core::run(driver, platform(), &config).unwrap();

        assert_eq!(summary.batches, 3, "{target}");
        assert_eq!(summary.timeouts, 0, "{target}");
        assert!(summary.bytes > 0, "{target}");
        assert_eq!(summary.decoded.invalid, 0, "{target}");
        assert_eq!(
            summary.decoded.valid * target.profile().record_width(),
            summary.bytes,
            "{target}"
        );

        let (driver, _) = stopped.into_parts();
        assert!(!driver.is_running());
    }
}

#[test]
fn stalled_converter_times_out_every_batch() {
    let mut config = config(Target::Esp32C3, 20, 2);
    config.read_timeout_ms = Some(10);
    let settings = SimulationSettings {
        stall: true,
        ..Default::default()
    };
    let driver = FakeAdc::new(config.profile(), settings);

    let (summary, _) = adc_dma_core::run(driver, platform(), &config).unwrap();
    assert_eq!(summary.timeouts, 2);
    assert_eq!(summary.bytes, 0);
    assert_eq!(summary.decoded.records(), 0);
}

#[test]
fn overruns_still_decode() {
    let config = config(Target::Esp32S3, 40, 2);
    let settings = SimulationSettings {
        force_overrun: true,
        ..Default::default()
    };
    let driver = FakeAdc::new(config.profile(), settings);

    let (summary, _) = adc_dma_core::run(driver, platform(), &config).unwrap();
    assert_eq!(summary.overruns, 2);
    assert!(summary.decoded.valid > 0);
}

#[test]
fn driver_faults_are_fatal() {
    let config = config(Target::Esp32S3, 40, 1);

    let driver = FakeAdc::new(config.profile(), SimulationSettings::default())
        .with_fault(Operation::Read, DriverError::Fail);
    assert!(matches!(
        adc_dma_core::run(driver, platform(), &config),
        Err(Error::Read(DriverError::Fail))
    ));

    let driver = FakeAdc::new(config.profile(), SimulationSettings::default())
        .with_fault(Operation::Deinitialize, DriverError::InvalidState);
    assert!(matches!(
        adc_dma_core::run(driver, platform(), &config),
        Err(Error::Release(DriverError::InvalidState))
    ));
}

#[test]
fn out_of_range_rate_never_reaches_the_driver() {
    let config = config(Target::Esp32H2, 100, 1);
    let driver = FakeAdc::new(config.profile(), SimulationSettings::default());

    assert!(matches!(
        adc_dma_core::run(driver, platform(), &config),
        Err(Error::Config(_))
    ));
}

#[test]
fn runner_can_be_reused_after_stop() {
    let profile = Target::Esp32S2.profile();
    let driver = FakeAdc::new(profile, SimulationSettings::default());
    let options = config(Target::Esp32S2, 40, 1).runner_options();

    let mut running = AcquisitionRunner::initialize(driver, platform(), profile, profile.channels, 40, options)
        .unwrap()
        .start()
        .unwrap();
    assert!(running.read_batch().unwrap().bytes() > 0);
    let stopped = running.stop().unwrap();

    let config = CaptureConfig::new(profile, 80).unwrap();
    let mut running = stopped.reinitialize(config).unwrap().start().unwrap();
    assert_eq!(running.state(), State::Running);
    assert!(running.read_batch().unwrap().bytes() > 0);
    assert_eq!(running.stop().unwrap().state(), State::Stopped);
}
