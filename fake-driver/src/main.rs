use std::{error::Error, path::PathBuf};

use adc_dma_core::Config;
use adc_dma_fake_driver::Settings;
use fugit::HertzU32;

fn main() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::init();

    let settings = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => Settings::load(Some(path.as_path()))?,
        None => Settings::load(None).unwrap_or_else(|e| {
            log::warn!("Could not load {}, using defaults: {e}", Config::FILE_NAME);
            Settings::default()
        }),
    };
    log::debug!("{settings:?}");

    run(settings);
    Ok(())
}

#[cfg(not(feature = "gpio-benchmark"))]
fn run(settings: Settings) {
    use adc_dma_fake_driver::{FakeAdc, StdPlatform};

    let driver = FakeAdc::new(settings.acquisition.profile(), settings.simulation);
    let platform = StdPlatform::new(HertzU32::Hz(settings.simulation.tick_rate_hz));

    // There is nothing to recover to on the device, halt
    if let Err(e) = adc_dma_core::run(driver, platform, &settings.acquisition) {
        panic!("Acquisition failed: {e}");
    }
}

#[cfg(feature = "gpio-benchmark")]
fn run(settings: Settings) {
    use adc_dma_core::benchmark::{ToggleBenchmark, DEFAULT_REPORT_EVERY};
    use adc_dma_fake_driver::{FakePin, StdPlatform};

    log::info!("Toggling the output pin");
    let platform = StdPlatform::new(HertzU32::Hz(settings.simulation.tick_rate_hz));
    let bench = ToggleBenchmark::new(FakePin::default(), platform, DEFAULT_REPORT_EVERY);
    let (Ok(never) | Err(never)) = bench.run();
    match never {}
}
