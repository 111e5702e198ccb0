use crate::{capture::ConfigError, driver::DriverError};

/// Failures that end an acquisition
///
/// None of these are recoverable: a peripheral that can not be configured,
/// started, read or released leaves the device in an unknown state. Callers
/// on a real target are expected to halt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid capture configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("driver rejected the capture configuration: {0}")]
    Configure(DriverError),
    #[error("could not start conversions: {0}")]
    Start(DriverError),
    #[error("could not read conversions: {0}")]
    Read(DriverError),
    #[error("could not release the capture session: {0}")]
    Release(DriverError),
}

impl Error {
    /// The driver status that caused this error, if it came from the driver
    pub fn driver_error(&self) -> Option<DriverError> {
        match self {
            Error::Config(_) => None,
            Error::Configure(e) | Error::Start(e) | Error::Read(e) | Error::Release(e) => Some(*e),
        }
    }
}
