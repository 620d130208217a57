//! One function per wire command.
//!
//! One function per wire verb. Each does exactly one [`Transport::write`]
//! and at most one [`Transport::read`] of a well-known size, with the
//! settling sleep the device needs between the two.

use crate::error::{GrcError, GrcResult, Retcode};
use crate::frame::encode_activate_streaming;
use crate::transport::Transport;

/// Remote function IDs live in this window.
pub const FUNCTION_MIN: u8 = 0x07;
pub const FUNCTION_MAX: u8 = 0x0F;

fn write_all<T: Transport>(transport: &mut T, bytes: &[u8]) -> GrcResult<()> {
    transport.write(bytes).map_err(|_| GrcError::I2cError)?;
    Ok(())
}

fn read_exact<T: Transport, const N: usize>(transport: &mut T) -> GrcResult<[u8; N]> {
    let mut buf = [0u8; N];
    let n = transport.read(&mut buf).map_err(|_| GrcError::I2cError)?;
    if n != N {
        return Err(GrcError::I2cError);
    }
    Ok(buf)
}

/// `01`: reports the remote function currently in progress, or 0 if idle.
pub fn get_current_function<T: Transport>(transport: &mut T) -> GrcResult<u8> {
    write_all(transport, &[0x01])?;
    transport.sleep_ms(10);
    let [byte] = read_exact::<T, 1>(transport)?;
    Ok(byte)
}

/// `02 block-size block-count`, immediately followed by the data blocks the
/// caller writes itself.
pub fn activate_streaming<T: Transport>(
    transport: &mut T,
    block_size: u8,
    block_count: u8,
) -> GrcResult<()> {
    write_all(transport, &encode_activate_streaming(block_size, block_count))
}

/// `03`: 32-byte delivery bitmap for the most recent streaming session.
pub fn get_stream_result<T: Transport>(transport: &mut T) -> GrcResult<[u8; 32]> {
    write_all(transport, &[0x03])?;
    transport.sleep_ms(1);
    read_exact::<T, 32>(transport)
}

/// `04 f`: invokes remote function `f`.
pub fn call_function<T: Transport>(transport: &mut T, function: u8) -> GrcResult<()> {
    if !(FUNCTION_MIN..=FUNCTION_MAX).contains(&function) {
        return Err(GrcError::ArgumentError);
    }
    write_all(transport, &[0x04, function])
}

/// Decoded `get-function-status` response.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FunctionStatus {
    pub called: bool,
    pub running: bool,
    pub retcode: Retcode,
}

/// `05 f`: one status byte. Bit 7 called, bit 6 running, bits 5..0 retcode.
pub fn get_function_status<T: Transport>(
    transport: &mut T,
    function: u8,
) -> GrcResult<FunctionStatus> {
    if !(FUNCTION_MIN..=FUNCTION_MAX).contains(&function) {
        return Err(GrcError::ArgumentError);
    }
    write_all(transport, &[0x05, function])?;
    transport.sleep_ms(1);
    let [byte] = read_exact::<T, 1>(transport)?;
    let called = byte & 0x80 != 0;
    let running = byte & 0x40 != 0;
    let retcode = Retcode::from_wire(byte & 0x3F).ok_or(GrcError::WrongGrcAnswer)?;
    Ok(FunctionStatus { called, running, retcode })
}

/// `06 f`: 4-byte little-endian signed result of remote function `f`.
pub fn get_function_result<T: Transport>(transport: &mut T, function: u8) -> GrcResult<i32> {
    if !(FUNCTION_MIN..=FUNCTION_MAX).contains(&function) {
        return Err(GrcError::ArgumentError);
    }
    write_all(transport, &[0x06, function])?;
    transport.sleep_ms(1);
    let bytes = read_exact::<T, 4>(transport)?;
    Ok(i32::from_le_bytes(bytes))
}

/// `07`: SDK version reported by the device; only `1` is accepted.
pub fn get_sdk_version<T: Transport>(transport: &mut T) -> GrcResult<u32> {
    write_all(transport, &[0x07])?;
    transport.sleep_ms(10);
    let bytes = read_exact::<T, 4>(transport)?;
    Ok(u32::from_le_bytes(bytes))
}
