//! Error taxonomy (spec.md §4.7)
//!
//! Every fallible operation returns `Result<T, GrcError>`. The original C
//! driver (`original_source/grc/protocol_layer/protocol_structures.h`'s
//! `Retcode` enum and `original_source/grc/grc_i2c.c`'s `retcode_to_result`)
//! uses a single negative integer return convention; we keep the same kinds
//! but as a proper enum.

/// Device-reported return code, one byte on the wire (spec.md §3).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Retcode {
    Ok = 0,
    Error = 1,
    InvalState = 10,
    InvalParm = 11,
    InvalDataLen = 12,
    NotCalled = 20,
    NotImplemented = 30,
}

impl Retcode {
    /// Decode the low 6 bits of a function-status byte.
    ///
    /// The device only ever emits the values above; anything else is a
    /// wire-level protocol violation, not a valid retcode, so the caller
    /// maps it to `GrcError::WrongGrcAnswer` rather than calling this.
    pub fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Retcode::Ok),
            1 => Some(Retcode::Error),
            10 => Some(Retcode::InvalState),
            11 => Some(Retcode::InvalParm),
            12 => Some(Retcode::InvalDataLen),
            20 => Some(Retcode::NotCalled),
            30 => Some(Retcode::NotImplemented),
            _ => None,
        }
    }
}

/// Unified error kind for the whole driver.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GrcError {
    /// Transport-level write/read failure.
    I2cError,
    /// Not every block in a streaming session was acknowledged.
    DataNotDelivered,
    /// Device answered with a byte outside the set this protocol defines.
    WrongGrcAnswer,
    /// A remote function is already in progress on the device.
    GrcIsBusy,
    /// `get-sdk-version` returned something other than 1.
    SdkVersionMismatch,
    /// Caller passed an argument the protocol or session layer rejects.
    ArgumentError,
    /// Inference ran but did not classify the input (retcode -1 by convention).
    NotClassified,
    /// Caller requested a host-side feature this driver never honours
    /// (asynchronous train/inference). Distinct from `RemoteFunctionNotImplemented`:
    /// no bytes reach the device before this is returned.
    NotImplemented,
    /// Remote function completed with a non-`Ok` retcode.
    RemoteFunctionError,
    RemoteFunctionInvalState,
    RemoteFunctionInvalParam,
    RemoteFunctionInvalDataLen,
    RemoteFunctionNotCalled,
    RemoteFunctionNotImplemented,
}

impl GrcError {
    /// Maps a device retcode to the corresponding `REMOTE_` error kind.
    ///
    /// Mirrors `retcode_to_result` in `original_source/grc/grc_i2c.c`.
    pub fn from_retcode(retcode: Retcode) -> Result<(), GrcError> {
        match retcode {
            Retcode::Ok => Ok(()),
            Retcode::Error => Err(GrcError::RemoteFunctionError),
            Retcode::InvalState => Err(GrcError::RemoteFunctionInvalState),
            Retcode::InvalParm => Err(GrcError::RemoteFunctionInvalParam),
            Retcode::InvalDataLen => Err(GrcError::RemoteFunctionInvalDataLen),
            Retcode::NotCalled => Err(GrcError::RemoteFunctionNotCalled),
            Retcode::NotImplemented => Err(GrcError::RemoteFunctionNotImplemented),
        }
    }
}

pub type GrcResult<T> = Result<T, GrcError>;

/// The sentinel inference result for "input did not match any trained class".
pub const NOT_CLASSIFIED: i32 = -1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retcode_roundtrips_known_values() {
        for &(byte, expect) in &[
            (0u8, Retcode::Ok),
            (1, Retcode::Error),
            (10, Retcode::InvalState),
            (11, Retcode::InvalParm),
            (12, Retcode::InvalDataLen),
            (20, Retcode::NotCalled),
            (30, Retcode::NotImplemented),
        ] {
            assert_eq!(Retcode::from_wire(byte), Some(expect));
        }
        assert_eq!(Retcode::from_wire(2), None);
        assert_eq!(Retcode::from_wire(255), None);
    }

    #[test]
    fn remote_error_mapping() {
        assert_eq!(GrcError::from_retcode(Retcode::Ok), Ok(()));
        assert_eq!(
            GrcError::from_retcode(Retcode::Error),
            Err(GrcError::RemoteFunctionError)
        );
        assert_eq!(
            GrcError::from_retcode(Retcode::NotImplemented),
            Err(GrcError::RemoteFunctionNotImplemented)
        );
    }
}
