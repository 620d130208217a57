//! Parameter records (spec.md §3) and the architecture-selector table.
//!
//! The source (`original_source/grc/protocol_layer/protocol_structures.h`)
//! represents a parameter as `{ ParamKind m_kind; union { int; float; } }`.
//! Per spec.md §9 we re-architect this as a tagged sum type; the wire form
//! is unchanged: `kind` as one byte followed by four raw payload bytes.

/// External-status sub-selector for `AskExtStatus` (protocol_structures.h `ExtStatusReq`).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ExtStatusReq {
    CatsQty = 1,
    SaveDataLen = 2,
    NextDataElm = 3,
}

/// One device architecture: (input channels, reservoir neurons).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Architecture {
    pub channels: u8,
    pub neurons: u8,
}

/// The eight fixed (channels, neurons) pairs the device supports, indexed by
/// their 1-based `ArchType` wire code. `CUSTOM` (an unfinished draft in the
/// source that reads fields not present in `grc_config`) is intentionally
/// omitted, per spec.md §9.
const ARCHITECTURES: [Architecture; 8] = [
    Architecture { channels: 1, neurons: 10 },
    Architecture { channels: 1, neurons: 18 },
    Architecture { channels: 1, neurons: 30 },
    Architecture { channels: 1, neurons: 100 },
    Architecture { channels: 3, neurons: 10 },
    Architecture { channels: 3, neurons: 30 },
    Architecture { channels: 3, neurons: 100 },
    Architecture { channels: 6, neurons: 17 },
];

/// Resolves a (channels, neurons) pair to its 1-based `ArchType` wire code.
pub fn arch_type_for(channels: u8, neurons: u8) -> Option<u8> {
    ARCHITECTURES
        .iter()
        .position(|a| a.channels == channels && a.neurons == neurons)
        .map(|idx| (idx + 1) as u8)
}

/// A tagged parameter value. The wire payload is always four bytes,
/// regardless of whether `kind` carries an integer or a float.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Param {
    PredictSignal(bool),
    SeparateInaccuracies(bool),
    Noise(f32),
    InputScaling(f32),
    FeedbackScaling(f32),
    ThresholdFactor(f32),
    ArchType(u8),
    AskExtStatus(ExtStatusReq),
    LoadTrainData(i32),
    ReqCategory(i32),
}

impl Param {
    /// One-byte `kind` discriminant used on the wire.
    pub fn kind_byte(&self) -> u8 {
        match self {
            Param::PredictSignal(_) => 1,
            Param::SeparateInaccuracies(_) => 2,
            Param::Noise(_) => 3,
            Param::InputScaling(_) => 4,
            Param::FeedbackScaling(_) => 5,
            Param::ThresholdFactor(_) => 6,
            Param::ArchType(_) => 10,
            Param::AskExtStatus(_) => 20,
            Param::LoadTrainData(_) => 21,
            Param::ReqCategory(_) => 22,
        }
    }

    /// The four raw payload bytes (little-endian, float bit-cast).
    pub fn value_bytes(&self) -> [u8; 4] {
        match *self {
            Param::PredictSignal(v) | Param::SeparateInaccuracies(v) => {
                (v as i32).to_le_bytes()
            }
            Param::Noise(v)
            | Param::InputScaling(v)
            | Param::FeedbackScaling(v)
            | Param::ThresholdFactor(v) => v.to_bits().to_le_bytes(),
            Param::ArchType(v) => (v as i32).to_le_bytes(),
            Param::AskExtStatus(v) => (v as i32).to_le_bytes(),
            Param::LoadTrainData(v) | Param::ReqCategory(v) => v.to_le_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arch_lookup_matches_closed_set() {
        assert_eq!(arch_type_for(1, 10), Some(1));
        assert_eq!(arch_type_for(3, 10), Some(5));
        assert_eq!(arch_type_for(6, 17), Some(8));
        assert_eq!(arch_type_for(6, 18), None);
        assert_eq!(arch_type_for(2, 10), None);
    }

    #[test]
    fn bool_params_encode_as_zero_or_one() {
        assert_eq!(Param::PredictSignal(true).value_bytes(), [1, 0, 0, 0]);
        assert_eq!(Param::PredictSignal(false).value_bytes(), [0, 0, 0, 0]);
    }

    #[test]
    fn float_params_roundtrip_bit_pattern() {
        let bytes = Param::Noise(1.5).value_bytes();
        let back = f32::from_bits(u32::from_le_bytes(bytes));
        assert_eq!(back, 1.5);
    }

    #[test]
    fn arch_type_5_is_three_by_ten() {
        // Matches S1 in spec.md §8: ArchType=5 <=> (channels=3, neurons=10).
        assert_eq!(arch_type_for(3, 10), Some(5));
        assert_eq!(Param::ArchType(5).value_bytes(), [5, 0, 0, 0]);
    }
}
