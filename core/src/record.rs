//! Sample records as written by the ADC's DMA engine

use crate::target::{AdcUnit, OutputFormat, TargetProfile};

/// Where the unit of a record comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitField {
    /// Not encoded, every record belongs to this unit
    Implied(AdcUnit),
    Bits { shift: u8, bits: u8 },
}

/// Bit layout of one fixed-width little-endian record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    pub format: OutputFormat,
    /// Bytes per record
    pub width: usize,
    pub value_bits: u8,
    pub channel_shift: u8,
    pub channel_bits: u8,
    pub unit: UnitField,
}

impl RecordLayout {
    pub const TYPE1_UNIT1: Self = Self {
        format: OutputFormat::Type1,
        width: 2,
        value_bits: 12,
        channel_shift: 12,
        channel_bits: 4,
        unit: UnitField::Implied(AdcUnit::Unit1),
    };

    pub const TYPE2_16: Self = Self {
        format: OutputFormat::Type2,
        width: 2,
        value_bits: 11,
        channel_shift: 11,
        channel_bits: 4,
        unit: UnitField::Bits { shift: 15, bits: 1 },
    };

    // Bit 12 is reserved, bits 19..32 as well
    pub const TYPE2_32: Self = Self {
        format: OutputFormat::Type2,
        width: 4,
        value_bits: 12,
        channel_shift: 13,
        channel_bits: 4,
        unit: UnitField::Bits { shift: 17, bits: 2 },
    };

    /// Decode a single record
    ///
    /// Panics if `bytes` is not exactly [`Self::width`] long.
    pub fn decode(&self, bytes: &[u8]) -> SampleRecord {
        assert_eq!(bytes.len(), self.width, "Record has the wrong width");

        let raw = bytes
            .iter()
            .rev()
            .fold(0u32, |acc, &byte| (acc << 8) | u32::from(byte));

        let unit = match self.unit {
            UnitField::Implied(unit) => unit.index(),
            UnitField::Bits { shift, bits } => field(raw, shift, bits) as u8,
        };

        SampleRecord {
            unit,
            channel: field(raw, self.channel_shift, self.channel_bits) as u8,
            value: field(raw, 0, self.value_bits) as u16,
        }
    }

    /// Encode a record, truncating fields that do not fit
    pub fn encode(&self, record: &SampleRecord, out: &mut [u8]) {
        assert_eq!(out.len(), self.width, "Record has the wrong width");

        let mut raw = (u32::from(record.value) & mask(self.value_bits))
            | ((u32::from(record.channel) & mask(self.channel_bits)) << self.channel_shift);
        if let UnitField::Bits { shift, bits } = self.unit {
            raw |= (u32::from(record.unit) & mask(bits)) << shift;
        }

        out.copy_from_slice(&raw.to_le_bytes()[..self.width]);
    }

    /// Iterate over all whole records in `data`
    ///
    /// A trailing partial record is not yielded.
    pub fn records<'a>(&self, data: &'a [u8]) -> impl Iterator<Item = SampleRecord> + 'a {
        let layout = *self;
        data.chunks_exact(self.width)
            .map(move |chunk| layout.decode(chunk))
    }
}

const fn mask(bits: u8) -> u32 {
    if bits >= 32 {
        u32::MAX
    } else {
        (1 << bits) - 1
    }
}

const fn field(raw: u32, shift: u8, bits: u8) -> u32 {
    (raw >> shift) & mask(bits)
}

/// One decoded conversion
///
/// `unit` is the zero-based index as found in the record. It has not been
/// checked against the hardware, see [`TargetProfile::is_valid_record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleRecord {
    pub unit: u8,
    pub channel: u8,
    pub value: u16,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DecodeSummary {
    pub valid: usize,
    pub invalid: usize,
}

impl DecodeSummary {
    pub fn records(&self) -> usize {
        self.valid + self.invalid
    }
}

impl core::ops::AddAssign for DecodeSummary {
    fn add_assign(&mut self, rhs: Self) {
        self.valid += rhs.valid;
        self.invalid += rhs.invalid;
    }
}

/// Decode the records in `data` and log one line for each of them
///
/// Units are logged one-based, the way the hardware documentation names them.
pub fn decode_and_log(data: &[u8], profile: &TargetProfile) -> DecodeSummary {
    let layout = &profile.layout;
    let mut summary = DecodeSummary::default();

    if data.len() % layout.width != 0 {
        log::warn!(
            "Ignoring {} trailing bytes that do not form a whole record",
            data.len() % layout.width
        );
    }

    for record in layout.records(data) {
        if profile.is_valid_record(&record) {
            log::info!(
                "Unit: {}, Channel: {}, Value: {:x}",
                u16::from(record.unit) + 1,
                record.channel,
                record.value
            );
            summary.valid += 1;
        } else {
            log::info!(
                "Invalid data [{}_{}_{:x}]",
                u16::from(record.unit) + 1,
                record.channel,
                record.value
            );
            summary.invalid += 1;
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::Target;
    use crate::testing::{captured_logs, encode_records};

    #[test]
    fn decode_type2_wide() {
        // value 0xABC, channel 3, unit 1
        let raw: u32 = 0xABC | (3 << 13) | (1 << 17);
        let record = RecordLayout::TYPE2_32.decode(&raw.to_le_bytes());
        assert_eq!(
            record,
            SampleRecord {
                unit: 1,
                channel: 3,
                value: 0xABC
            }
        );
    }

    #[test]
    fn decode_type2_narrow() {
        let raw: u16 = 0x7FF | (9 << 11) | (1 << 15);
        let record = RecordLayout::TYPE2_16.decode(&raw.to_le_bytes());
        assert_eq!(
            record,
            SampleRecord {
                unit: 1,
                channel: 9,
                value: 0x7FF
            }
        );
    }

    #[test]
    fn decode_type1_implies_unit() {
        let raw: u16 = 0x321 | (7 << 12);
        let record = RecordLayout::TYPE1_UNIT1.decode(&raw.to_le_bytes());
        assert_eq!(
            record,
            SampleRecord {
                unit: 0,
                channel: 7,
                value: 0x321
            }
        );
    }

    #[test]
    fn reserved_bits_are_ignored() {
        let raw: u32 = 0xFFF8_0000 | 0x1000 | 0x055;
        let record = RecordLayout::TYPE2_32.decode(&raw.to_le_bytes());
        assert_eq!(record.value, 0x055);
        assert_eq!(record.channel, 0);
        assert_eq!(record.unit, 0);
    }

    #[test]
    fn records_skip_trailing_partial() {
        let data = [0u8; 10];
        assert_eq!(RecordLayout::TYPE2_32.records(&data).count(), 2);
        assert_eq!(RecordLayout::TYPE2_16.records(&data).count(), 5);
    }

    #[test]
    fn decode_and_log_reports_invalid_records() {
        let profile = Target::Esp32C3.profile();
        let data = encode_records(
            &profile.layout,
            &[
                SampleRecord { unit: 0, channel: 2, value: 0x100 },
                SampleRecord { unit: 0, channel: 3, value: 0x200 },
                SampleRecord { unit: 3, channel: 0, value: 0x300 },
                SampleRecord { unit: 1, channel: 0, value: 0x400 },
            ],
        );

        let (summary, logs) = captured_logs(|| decode_and_log(&data, profile));

        assert_eq!(summary, DecodeSummary { valid: 3, invalid: 1 });
        assert_eq!(
            logs,
            [
                "Unit: 1, Channel: 2, Value: 100",
                "Unit: 1, Channel: 3, Value: 200",
                "Invalid data [4_0_300]",
                "Unit: 2, Channel: 0, Value: 400",
            ]
        );
    }

    #[test]
    fn decode_and_log_flags_out_of_range_channels() {
        let profile = Target::Esp32S2.profile();
        let data = encode_records(
            &profile.layout,
            &[
                SampleRecord { unit: 0, channel: 9, value: 0x10 },
                SampleRecord { unit: 1, channel: 12, value: 0x20 },
            ],
        );

        let (summary, logs) = captured_logs(|| decode_and_log(&data, profile));

        assert_eq!(summary, DecodeSummary { valid: 1, invalid: 1 });
        assert_eq!(logs[1], "Invalid data [2_12_20]");
    }

    #[test]
    fn every_variant_uses_two_or_four_byte_records() {
        for target in Target::ALL {
            let layout = target.profile().layout;
            assert!(layout.width == 2 || layout.width == 4);
            let mut buffer = [0u8; 4];
            let record = SampleRecord {
                unit: 0,
                channel: 1,
                value: 0x7f,
            };
            layout.encode(&record, &mut buffer[..layout.width]);
            assert_eq!(layout.decode(&buffer[..layout.width]), record);
        }
    }
}
