//! Capture configuration handed to the continuous ADC driver

use fugit::HertzU32;
use heapless::Vec;

use crate::target::{AdcUnit, ChannelDescriptor, ConvMode, OutputFormat, TargetProfile, PATTERN_LEN_MAX};

/// Bytes read from the driver per batch
pub const RESULT_BUFFER_LEN: usize = 1024;
/// Size of the driver's internal ring buffer
pub const MAX_STORE_BUF_SIZE: usize = 1024;
/// Bytes of conversion results produced per DMA interrupt
pub const CONV_FRAME_SIZE: usize = 1024;
/// Conversions after which the controller restarts its count, where enabled
pub const CONV_LIMIT_NUM: u32 = 250;
/// Largest buffer a single DMA descriptor chain can cover
pub const DMA_BUF_SIZE_MAX: usize = 4092;

pub type Patterns = Vec<ChannelDescriptor, PATTERN_LEN_MAX>;

/// Driver initialisation parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitConfig {
    pub max_store_buf_size: usize,
    pub conv_frame_size: usize,
    pub adc1_chan_mask: u16,
    pub adc2_chan_mask: u16,
}

impl InitConfig {
    pub fn chan_mask(&self, unit: AdcUnit) -> u16 {
        match unit {
            AdcUnit::Unit1 => self.adc1_chan_mask,
            AdcUnit::Unit2 => self.adc2_chan_mask,
        }
    }

    pub fn check(&self, profile: &TargetProfile) -> Result<(), ConfigError> {
        let width = profile.record_width();

        if self.adc1_chan_mask == 0 && self.adc2_chan_mask == 0 {
            return Err(ConfigError::NoChannels);
        }
        if self.max_store_buf_size == 0 || self.max_store_buf_size > DMA_BUF_SIZE_MAX {
            return Err(ConfigError::BufferSize {
                size: self.max_store_buf_size,
                max: DMA_BUF_SIZE_MAX,
            });
        }
        if self.conv_frame_size == 0
            || self.conv_frame_size % width != 0
            || self.conv_frame_size > self.max_store_buf_size
        {
            return Err(ConfigError::FrameSize {
                frame: self.conv_frame_size,
                buffer: self.max_store_buf_size,
                width,
            });
        }

        Ok(())
    }
}

/// Digital controller parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigitalConfig {
    pub conv_limit: Option<u32>,
    pub sample_rate: HertzU32,
    pub conv_mode: ConvMode,
    pub format: OutputFormat,
    pub patterns: Patterns,
}

impl DigitalConfig {
    pub fn check(&self, profile: &TargetProfile) -> Result<(), ConfigError> {
        if self.patterns.is_empty() {
            return Err(ConfigError::NoChannels);
        }
        if self.patterns.len() > profile.pattern_len_max {
            return Err(ConfigError::TooManyPatterns {
                len: self.patterns.len(),
                max: profile.pattern_len_max,
            });
        }
        if !profile.supports_mode(self.conv_mode) {
            return Err(ConfigError::UnsupportedMode(self.conv_mode));
        }
        if self.format != profile.layout.format {
            return Err(ConfigError::UnsupportedFormat(self.format));
        }
        if self.sample_rate < profile.min_sample_rate || self.sample_rate > profile.max_sample_rate
        {
            return Err(ConfigError::SampleRate {
                hz: self.sample_rate.to_Hz(),
                min: profile.min_sample_rate.to_Hz(),
                max: profile.max_sample_rate.to_Hz(),
            });
        }
        match self.conv_limit {
            Some(0) => return Err(ConfigError::ConvLimit(0)),
            Some(limit) if limit > 255 => return Err(ConfigError::ConvLimit(limit)),
            None if profile.conv_limit => return Err(ConfigError::ConvLimitRequired),
            _ => {}
        }

        for pattern in &self.patterns {
            let channels = profile.channels_per_unit[pattern.unit.index() as usize];
            if pattern.channel >= channels || !self.conv_mode.uses_unit(pattern.unit) {
                return Err(ConfigError::InvalidChannel {
                    unit: pattern.unit,
                    channel: pattern.channel,
                });
            }
            if pattern.bit_width > profile.max_bit_width {
                return Err(ConfigError::BitWidth(pattern.bit_width));
            }
        }

        Ok(())
    }
}

/// Everything the driver needs to run a continuous capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    pub init: InitConfig,
    pub digital: DigitalConfig,
}

impl CaptureConfig {
    /// Build the example's capture setup for a variant, sampling its channel
    /// set at `sample_rate_khz`
    pub fn new(profile: &TargetProfile, sample_rate_khz: u32) -> Result<Self, ConfigError> {
        Self::with_channels(profile, profile.channels, sample_rate_khz)
    }

    pub fn with_channels(
        profile: &TargetProfile,
        channels: &[ChannelDescriptor],
        sample_rate_khz: u32,
    ) -> Result<Self, ConfigError> {
        let sample_rate = sample_rate_khz
            .checked_mul(1000)
            .map(HertzU32::Hz)
            .ok_or(ConfigError::SampleRate {
                hz: u32::MAX,
                min: profile.min_sample_rate.to_Hz(),
                max: profile.max_sample_rate.to_Hz(),
            })?;

        let patterns = Patterns::from_slice(channels).map_err(|_| ConfigError::TooManyPatterns {
            len: channels.len(),
            max: PATTERN_LEN_MAX,
        })?;

        let chan_mask = |unit| {
            patterns
                .iter()
                .filter(|pattern| pattern.unit == unit)
                .fold(0u16, |mask, pattern| {
                    mask | 1u16.checked_shl(pattern.channel.into()).unwrap_or(0)
                })
        };

        Ok(Self {
            init: InitConfig {
                max_store_buf_size: MAX_STORE_BUF_SIZE,
                conv_frame_size: CONV_FRAME_SIZE,
                adc1_chan_mask: chan_mask(AdcUnit::Unit1),
                adc2_chan_mask: chan_mask(AdcUnit::Unit2),
            },
            digital: DigitalConfig {
                conv_limit: profile.conv_limit.then_some(CONV_LIMIT_NUM),
                sample_rate,
                conv_mode: profile.conv_mode,
                format: profile.layout.format,
                patterns,
            },
        })
    }

    pub fn check(&self, profile: &TargetProfile) -> Result<(), ConfigError> {
        self.init.check(profile)?;
        self.digital.check(profile)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("no channels selected")]
    NoChannels,
    #[error("{len} pattern entries, at most {max} supported")]
    TooManyPatterns { len: usize, max: usize },
    #[error("conversion mode {0:?} is not supported on this target")]
    UnsupportedMode(ConvMode),
    #[error("output format {0:?} is not supported on this target")]
    UnsupportedFormat(OutputFormat),
    #[error("sample rate {hz} Hz outside of {min}..={max} Hz")]
    SampleRate { hz: u32, min: u32, max: u32 },
    #[error("buffer size {size} outside of 1..={max} bytes")]
    BufferSize { size: usize, max: usize },
    #[error("conversion frame of {frame} bytes does not fit a {buffer} byte buffer of {width} byte records")]
    FrameSize { frame: usize, buffer: usize, width: usize },
    #[error("conversion limit {0} outside of 1..=255")]
    ConvLimit(u32),
    #[error("this target requires the conversion limit to be enabled")]
    ConvLimitRequired,
    #[error("channel {channel} of {unit:?} can not be sampled")]
    InvalidChannel { unit: AdcUnit, channel: u8 },
    #[error("bit width {0} is not supported")]
    BitWidth(u8),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::Target;

    #[test]
    fn example_config_per_variant() {
        for target in Target::ALL {
            let profile = target.profile();
            let rate_khz = profile.min_sample_rate.to_Hz() / 1000 + 1;
            let config = CaptureConfig::new(profile, rate_khz).unwrap();
            assert_eq!(config.check(profile), Ok(()), "{target}");
            assert_eq!(config.digital.patterns.len(), profile.channels.len());
            assert_eq!(config.digital.conv_limit.is_some(), profile.conv_limit);
        }
    }

    #[test]
    fn channel_masks_follow_channel_set() {
        let config = CaptureConfig::new(Target::Esp32C3.profile(), 20).unwrap();
        assert_eq!(config.init.adc1_chan_mask, (1 << 2) | (1 << 3));
        assert_eq!(config.init.adc2_chan_mask, 1 << 0);

        let config = CaptureConfig::new(Target::Esp32.profile(), 2000).unwrap();
        assert_eq!(config.init.chan_mask(AdcUnit::Unit1), 1 << 7);
        assert_eq!(config.init.chan_mask(AdcUnit::Unit2), 0);
    }

    #[test]
    fn sample_rate_is_converted_to_hz() {
        let config = CaptureConfig::new(Target::Esp32.profile(), 2000).unwrap();
        assert_eq!(config.digital.sample_rate.to_Hz(), 2_000_000);

        assert!(matches!(
            CaptureConfig::new(Target::Esp32.profile(), u32::MAX),
            Err(ConfigError::SampleRate { .. })
        ));
    }

    #[test]
    fn rejects_rate_out_of_range() {
        let profile = Target::Esp32C3.profile();
        let config = CaptureConfig::new(profile, 2000).unwrap();
        assert_eq!(
            config.check(profile),
            Err(ConfigError::SampleRate {
                hz: 2_000_000,
                min: 611,
                max: 83_333
            })
        );
    }

    #[test]
    fn rejects_unsupported_mode() {
        let profile = Target::Esp32C3.profile();
        let mut config = CaptureConfig::new(profile, 20).unwrap();
        config.digital.conv_mode = ConvMode::BothUnit;
        assert_eq!(
            config.check(profile),
            Err(ConfigError::UnsupportedMode(ConvMode::BothUnit))
        );
    }

    #[test]
    fn rejects_too_many_patterns() {
        let profile = Target::Esp32S3.profile();
        let channels = [ChannelDescriptor::new(AdcUnit::Unit1, 0); PATTERN_LEN_MAX + 1];
        assert_eq!(
            CaptureConfig::with_channels(profile, &channels, 20),
            Err(ConfigError::TooManyPatterns {
                len: PATTERN_LEN_MAX + 1,
                max: PATTERN_LEN_MAX
            })
        );
    }

    #[test]
    fn rejects_empty_channel_set() {
        let profile = Target::Esp32S3.profile();
        let config = CaptureConfig::with_channels(profile, &[], 20).unwrap();
        assert_eq!(config.check(profile), Err(ConfigError::NoChannels));
    }

    #[test]
    fn rejects_oversized_buffer() {
        let profile = Target::Esp32S3.profile();
        let mut config = CaptureConfig::new(profile, 20).unwrap();
        config.init.max_store_buf_size = 8192;
        assert!(matches!(
            config.check(profile),
            Err(ConfigError::BufferSize { size: 8192, .. })
        ));
    }

    #[test]
    fn rejects_channel_the_unit_does_not_have() {
        let profile = Target::Esp32C3.profile();
        let channels = [ChannelDescriptor::new(AdcUnit::Unit2, 1)];
        let config = CaptureConfig::with_channels(profile, &channels, 20).unwrap();
        assert_eq!(
            config.check(profile),
            Err(ConfigError::InvalidChannel {
                unit: AdcUnit::Unit2,
                channel: 1
            })
        );
    }

    #[test]
    fn single_unit_variant_requires_conv_limit() {
        let profile = Target::Esp32.profile();
        let mut config = CaptureConfig::new(profile, 2000).unwrap();
        config.digital.conv_limit = None;
        assert_eq!(config.check(profile), Err(ConfigError::ConvLimitRequired));
    }
}
