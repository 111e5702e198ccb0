use std::{error::Error, path::Path};

use adc_dma_core::Config;

use crate::adc::SimulationSettings;

/// Contents of `adc-dma.toml` for the simulator
///
/// The acquisition settings sit at the top level, the simulator's own in a
/// `[simulation]` table.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(flatten)]
    pub acquisition: Config,
    pub simulation: SimulationSettings,
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self, Box<dyn Error>> {
        adc_dma_core::config::load(path, Config::FILE_NAME)
    }
}
