//! Per-variant hardware table
//!
//! Every chip variant the example runs on needs a slightly different capture
//! setup: which channels get sampled, how the DMA records are laid out, which
//! conversion modes the controller supports and what sample rates it accepts.
//! Instead of branching at compile time, the variant is picked once at
//! startup through [`Target::profile`].

use core::{fmt, str::FromStr};

use fugit::HertzU32;

use crate::record::{RecordLayout, SampleRecord};

/// Maximum digital bit-width of a conversion on every supported variant
pub const MAX_BIT_WIDTH: u8 = 12;

/// Maximum number of entries in the digital controller's pattern table
pub const PATTERN_LEN_MAX: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Esp32,
    Esp32S2,
    Esp32S3,
    Esp32C3,
    Esp32H2,
}

impl Target {
    pub const ALL: [Target; 5] = [
        Target::Esp32,
        Target::Esp32S2,
        Target::Esp32S3,
        Target::Esp32C3,
        Target::Esp32H2,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            Target::Esp32 => "esp32",
            Target::Esp32S2 => "esp32s2",
            Target::Esp32S3 => "esp32s3",
            Target::Esp32C3 => "esp32c3",
            Target::Esp32H2 => "esp32h2",
        }
    }

    pub fn profile(&self) -> &'static TargetProfile {
        match self {
            Target::Esp32 => &ESP32,
            Target::Esp32S2 => &ESP32S2,
            Target::Esp32S3 => &ESP32S3,
            Target::Esp32C3 => &ESP32C3,
            Target::Esp32H2 => &ESP32H2,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown target, expected one of esp32, esp32s2, esp32s3, esp32c3, esp32h2")]
pub struct UnknownTarget;

impl FromStr for Target {
    type Err = UnknownTarget;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Target::ALL
            .into_iter()
            .find(|target| target.name().eq_ignore_ascii_case(s))
            .ok_or(UnknownTarget)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AdcUnit {
    Unit1,
    Unit2,
}

impl AdcUnit {
    /// Zero-based unit index as encoded in sample records
    pub const fn index(&self) -> u8 {
        match self {
            AdcUnit::Unit1 => 0,
            AdcUnit::Unit2 => 1,
        }
    }

    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(AdcUnit::Unit1),
            1 => Some(AdcUnit::Unit2),
            _ => None,
        }
    }
}

/// Input attenuation, register encoding in the discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attenuation {
    Attenuation0dB = 0b00,
    Attenuation2p5dB = 0b01,
    Attenuation6dB = 0b10,
    Attenuation11dB = 0b11,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConvMode {
    /// Only ADC1 is sampled
    SingleUnit1,
    /// Only ADC2 is sampled
    SingleUnit2,
    /// Both units sample simultaneously
    BothUnit,
    /// Units take turns
    AlterUnit,
}

impl ConvMode {
    pub const fn uses_unit(&self, unit: AdcUnit) -> bool {
        match self {
            ConvMode::SingleUnit1 => matches!(unit, AdcUnit::Unit1),
            ConvMode::SingleUnit2 => matches!(unit, AdcUnit::Unit2),
            ConvMode::BothUnit | ConvMode::AlterUnit => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// Value and channel only, unit implied by the conversion mode
    Type1,
    /// Value, channel and unit
    Type2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelDescriptor {
    pub unit: AdcUnit,
    pub channel: u8,
    pub attenuation: Attenuation,
    pub bit_width: u8,
}

impl ChannelDescriptor {
    /// Channel at 0 dB attenuation and full resolution, as the example samples them
    pub const fn new(unit: AdcUnit, channel: u8) -> Self {
        Self {
            unit,
            channel,
            attenuation: Attenuation::Attenuation0dB,
            bit_width: MAX_BIT_WIDTH,
        }
    }
}

#[derive(Debug)]
pub struct TargetProfile {
    pub target: Target,
    /// Channels sampled by the example, in pattern order
    pub channels: &'static [ChannelDescriptor],
    /// Hardware channel count of ADC1 and ADC2
    pub channels_per_unit: [u8; 2],
    pub layout: RecordLayout,
    pub conv_mode: ConvMode,
    pub supported_modes: &'static [ConvMode],
    /// Whether the conversion limit has to be enabled on this variant
    pub conv_limit: bool,
    pub min_sample_rate: HertzU32,
    pub max_sample_rate: HertzU32,
    pub pattern_len_max: usize,
    pub max_bit_width: u8,
}

impl TargetProfile {
    pub fn record_width(&self) -> usize {
        self.layout.width
    }

    pub fn channels_in_unit(&self, unit: u8) -> Option<u8> {
        AdcUnit::from_index(unit).map(|unit| self.channels_per_unit[unit.index() as usize])
    }

    /// A record is usable when it names a unit that exists and a channel that
    /// unit actually has
    pub fn is_valid_record(&self, record: &SampleRecord) -> bool {
        match self.channels_in_unit(record.unit) {
            Some(count) => record.channel < count,
            None => false,
        }
    }

    pub fn supports_mode(&self, mode: ConvMode) -> bool {
        self.supported_modes.contains(&mode)
    }
}

const ADC1_CH2_CH3_ADC2_CH0: [ChannelDescriptor; 3] = [
    ChannelDescriptor::new(AdcUnit::Unit1, 2),
    ChannelDescriptor::new(AdcUnit::Unit1, 3),
    ChannelDescriptor::new(AdcUnit::Unit2, 0),
];

// The first generation part only has ADC1 wired to DMA
static ESP32: TargetProfile = TargetProfile {
    target: Target::Esp32,
    channels: &[ChannelDescriptor::new(AdcUnit::Unit1, 7)],
    channels_per_unit: [8, 10],
    layout: RecordLayout::TYPE1_UNIT1,
    conv_mode: ConvMode::SingleUnit1,
    supported_modes: &[ConvMode::SingleUnit1],
    conv_limit: true,
    min_sample_rate: HertzU32::Hz(20_000),
    max_sample_rate: HertzU32::Hz(2_000_000),
    pattern_len_max: PATTERN_LEN_MAX,
    max_bit_width: MAX_BIT_WIDTH,
};

static ESP32S2: TargetProfile = TargetProfile {
    target: Target::Esp32S2,
    channels: &ADC1_CH2_CH3_ADC2_CH0,
    channels_per_unit: [10, 10],
    layout: RecordLayout::TYPE2_16,
    conv_mode: ConvMode::BothUnit,
    supported_modes: &[
        ConvMode::SingleUnit1,
        ConvMode::SingleUnit2,
        ConvMode::BothUnit,
        ConvMode::AlterUnit,
    ],
    conv_limit: false,
    min_sample_rate: HertzU32::Hz(611),
    max_sample_rate: HertzU32::Hz(83_333),
    pattern_len_max: PATTERN_LEN_MAX,
    max_bit_width: MAX_BIT_WIDTH,
};

static ESP32S3: TargetProfile = TargetProfile {
    target: Target::Esp32S3,
    channels: &ADC1_CH2_CH3_ADC2_CH0,
    channels_per_unit: [10, 10],
    layout: RecordLayout::TYPE2_32,
    conv_mode: ConvMode::BothUnit,
    supported_modes: &[
        ConvMode::SingleUnit1,
        ConvMode::SingleUnit2,
        ConvMode::BothUnit,
        ConvMode::AlterUnit,
    ],
    conv_limit: false,
    min_sample_rate: HertzU32::Hz(611),
    max_sample_rate: HertzU32::Hz(83_333),
    pattern_len_max: PATTERN_LEN_MAX,
    max_bit_width: MAX_BIT_WIDTH,
};

// Alternating units is the only DMA mode on the RISC-V parts
static ESP32C3: TargetProfile = TargetProfile {
    target: Target::Esp32C3,
    channels: &ADC1_CH2_CH3_ADC2_CH0,
    channels_per_unit: [5, 1],
    layout: RecordLayout::TYPE2_32,
    conv_mode: ConvMode::AlterUnit,
    supported_modes: &[ConvMode::AlterUnit],
    conv_limit: false,
    min_sample_rate: HertzU32::Hz(611),
    max_sample_rate: HertzU32::Hz(83_333),
    pattern_len_max: PATTERN_LEN_MAX,
    max_bit_width: MAX_BIT_WIDTH,
};

static ESP32H2: TargetProfile = TargetProfile {
    target: Target::Esp32H2,
    channels: &ADC1_CH2_CH3_ADC2_CH0,
    channels_per_unit: [5, 1],
    layout: RecordLayout::TYPE2_32,
    conv_mode: ConvMode::AlterUnit,
    supported_modes: &[ConvMode::AlterUnit],
    conv_limit: false,
    min_sample_rate: HertzU32::Hz(611),
    max_sample_rate: HertzU32::Hz(83_333),
    pattern_len_max: PATTERN_LEN_MAX,
    max_bit_width: MAX_BIT_WIDTH,
};
