//! Host-side stand-ins for the ESP-IDF continuous ADC driver, the FreeRTOS
//! scheduler and a GPIO, so the acquisition can run on a development machine

mod adc;
mod platform;
mod ring_buffer;
mod settings;
mod signal;

pub use adc::{FakeAdc, Operation, SimulationSettings};
pub use platform::{FakePin, StdPlatform, DEFAULT_CPU_CLOCK, DEFAULT_TICK_RATE};
pub use ring_buffer::RingBuffer;
pub use settings::Settings;
pub use signal::{CosineSignal, SignalSettings};
