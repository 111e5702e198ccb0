//! Test signal seen by the simulated ADC inputs
//!
//! On the bench the inputs are wired to the DAC's cosine generator, so the
//! simulator produces a cosine with some noise on top. Every pattern entry gets
//! its own phase offset so the channels can be told apart in the log.

use std::f32::consts::PI;

use rand::{rngs::StdRng, Rng, SeedableRng};

#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct SignalSettings {
    pub frequency_hz: f32,
    /// Peak amplitude as a fraction of full scale
    pub amplitude: f32,
    /// DC offset as a fraction of full scale
    pub offset: f32,
    /// Peak noise as a fraction of full scale
    pub noise: f32,
    /// Fixed seed for the noise, random if absent
    pub seed: Option<u64>,
}

impl Default for SignalSettings {
    fn default() -> Self {
        Self {
            frequency_hz: 130.0,
            amplitude: 0.4,
            offset: 0.5,
            noise: 0.01,
            seed: None,
        }
    }
}

pub struct CosineSignal {
    settings: SignalSettings,
    sample_rate_hz: f32,
    rng: StdRng,
}

impl CosineSignal {
    pub fn new(settings: SignalSettings, sample_rate_hz: u32) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            settings,
            sample_rate_hz: sample_rate_hz.max(1) as f32,
            rng,
        }
    }

    /// Conversion result of the `index`th sample for a `bits` wide value,
    /// with the signal shifted by `phase` radians
    pub fn sample(&mut self, index: u64, phase: f32, bits: u8) -> u16 {
        let t = (index as f64 / f64::from(self.sample_rate_hz)) as f32;
        let noise = (self.rng.gen::<f32>() - 0.5) * self.settings.noise * 2.0;
        let level = self.settings.offset
            + self.settings.amplitude * (2.0 * PI * self.settings.frequency_hz * t + phase).cos()
            + noise;

        let full_scale = ((1u32 << bits.min(16)) - 1) as f32;
        (level.clamp(0.0, 1.0) * full_scale).round() as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet() -> SignalSettings {
        SignalSettings {
            noise: 0.0,
            seed: Some(1),
            ..Default::default()
        }
    }

    #[test]
    fn starts_at_the_peak() {
        let mut signal = CosineSignal::new(quiet(), 20_000);
        // 0.9 of 4095
        assert!((3684..=3687).contains(&signal.sample(0, 0.0, 12)));
    }

    #[test]
    fn stays_within_the_value_width() {
        let settings = SignalSettings {
            amplitude: 2.0,
            noise: 0.5,
            seed: Some(7),
            ..Default::default()
        };
        let mut signal = CosineSignal::new(settings, 611);

        for index in 0..1000 {
            assert!(signal.sample(index, 0.0, 11) <= 0x7ff);
        }
    }

    #[test]
    fn phase_separates_channels() {
        let mut signal = CosineSignal::new(quiet(), 20_000);
        assert_ne!(signal.sample(0, 0.0, 12), signal.sample(0, PI, 12));
    }
}
