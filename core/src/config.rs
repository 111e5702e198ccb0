use crate::{
    driver::ReadTimeout,
    runner::{RunnerOptions, TIMEOUT_BACKOFF_TICKS},
    target::{Target, TargetProfile},
};

/// Sample rate the example captures at unless configured otherwise
pub const DEFAULT_SAMPLE_RATE_KHZ: u32 = 2000;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    pub target: Target,
    pub sample_rate_khz: u32,
    /// Number of reads before stopping, 0 keeps reading forever
    pub batches: u32,
    /// Absent means a read blocks until data arrives
    pub read_timeout_ms: Option<u32>,
    pub backoff_ticks: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target: Target::Esp32,
            sample_rate_khz: DEFAULT_SAMPLE_RATE_KHZ,
            batches: 1,
            read_timeout_ms: None,
            backoff_ticks: TIMEOUT_BACKOFF_TICKS,
        }
    }
}

impl Config {
    pub fn profile(&self) -> &'static TargetProfile {
        self.target.profile()
    }

    pub fn read_timeout(&self) -> ReadTimeout {
        self.read_timeout_ms.map(fugit::MillisDurationU32::millis)
    }

    pub fn runner_options(&self) -> RunnerOptions {
        RunnerOptions {
            read_timeout: self.read_timeout(),
            backoff_ticks: self.backoff_ticks,
        }
    }
}

#[cfg(feature = "config")]
mod file {
    use std::{error::Error, path::Path};

    use super::Config;

    impl Config {
        pub const FILE_NAME: &'static str = "adc-dma.toml";

        /// Load the config from `path`, or from the first `adc-dma.toml`
        /// found in the working directory or one of its ancestors
        pub fn load(path: Option<&Path>) -> Result<Self, Box<dyn Error>> {
            load(path, Self::FILE_NAME)
        }
    }

    /// Deserialize any TOML settings file the same way [`Config::load`] does
    pub fn load<T: serde::de::DeserializeOwned>(
        path: Option<&Path>,
        file_name: &str,
    ) -> Result<T, Box<dyn Error>> {
        let paths = match path {
            Some(p) => vec![p.into()],
            None => std::env::current_dir()?
                .ancestors()
                .map(|path| path.join(file_name))
                .collect(),
        };

        let mut last_error = None;

        for path in paths {
            match std::fs::read_to_string(&path) {
                Ok(config_string) => {
                    log::debug!("Loading config from {}", path.display());
                    return Ok(toml::from_str(&config_string)?);
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.map_or_else(|| format!("no {file_name} found").into(), Into::into))
    }
}

#[cfg(feature = "config")]
pub use file::load;
