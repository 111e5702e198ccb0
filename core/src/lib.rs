#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod benchmark;
pub mod capture;
pub mod config;
pub mod driver;
mod error;
pub mod record;
pub mod runner;
pub mod target;

#[cfg(test)]
mod testing;

pub use capture::{CaptureConfig, ConfigError};
pub use config::Config;
pub use driver::{Clock, ContinuousAdc, DriverError, ReadOutcome, Scheduler};
pub use error::Error;
pub use record::{decode_and_log, DecodeSummary, SampleRecord};
pub use runner::{run, AcquisitionRunner, RunSummary};
pub use target::{Target, TargetProfile};
