//! Frame codec for the data-block wire format.
//!
//! Pure encode/decode functions over byte slices; nothing here touches a
//! [`crate::transport::Transport`]. The data-block shape is
//! `FF FE | block-index | payload... | crc8`, block indexing 1-based.

use crate::crc::crc8;
use crate::error::{GrcError, GrcResult};
use crate::params::Param;
use crate::transport::Transport;
use heapless::Vec;

/// `FF FE` block marker.
const MARKER: [u8; 2] = [0xFF, 0xFE];

/// Maximum values packed into one float-array block before the streaming
/// session needs another block.
pub const MAX_VALUES_PER_BLOCK: usize = 62;

/// Maximum number of blocks a single streaming session may use.
pub const MAX_BLOCK_COUNT: usize = 255;

/// Scratch buffer big enough for one bus transaction.
pub const SCRATCH_CAP: usize = 256;

pub type Scratch = Vec<u8, SCRATCH_CAP>;

fn push_block(out: &mut Scratch, index: u8, payload: &[u8], block_size: usize) -> GrcResult<()> {
    out.clear();
    out.extend_from_slice(&MARKER).map_err(|_| GrcError::ArgumentError)?;
    out.push(index).map_err(|_| GrcError::ArgumentError)?;
    out.extend_from_slice(payload).map_err(|_| GrcError::ArgumentError)?;
    let crc = crc8(&out[2..]);
    out.push(crc).map_err(|_| GrcError::ArgumentError)?;
    debug_assert_eq!(out.len(), block_size);
    Ok(())
}

/// `02 block-size block-count`
pub fn encode_activate_streaming(block_size: u8, block_count: u8) -> [u8; 3] {
    [0x02, block_size, block_count]
}

/// `FF FE | 01 | int32 | crc8`, block-size 8.
pub fn encode_int_block(value: i32) -> GrcResult<Scratch> {
    let mut out = Scratch::new();
    push_block(&mut out, 1, &value.to_le_bytes(), 8)?;
    Ok(out)
}

/// `FF FE | 01 | float32 | crc8`, block-size 8.
pub fn encode_float_block(value: f32) -> GrcResult<Scratch> {
    let mut out = Scratch::new();
    push_block(&mut out, 1, &value.to_bits().to_le_bytes(), 8)?;
    Ok(out)
}

/// `FF FE | 01 | kind(u8) | value(4 bytes) | crc8`, block-size 9.
pub fn encode_param_block(param: &Param) -> GrcResult<Scratch> {
    let mut payload = Vec::<u8, 5>::new();
    payload.push(param.kind_byte()).map_err(|_| GrcError::ArgumentError)?;
    payload
        .extend_from_slice(&param.value_bytes())
        .map_err(|_| GrcError::ArgumentError)?;
    let mut out = Scratch::new();
    push_block(&mut out, 1, &payload, 9)?;
    Ok(out)
}

/// Geometry of a float-array streaming session.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ArrayGeometry {
    pub block_count: u8,
    pub block_size: u8,
    /// 4-byte slots per block (length prefix + floats), before padding.
    pub slots_per_block: usize,
}

fn div_ceil(a: usize, b: usize) -> usize {
    (a + b - 1) / b
}

/// Computes the block geometry for an array of `len` floats.
///
/// `len == 0` is rejected by the caller before this is reached (`feed_array`
/// on an empty slice is an argument error, not a zero-block session).
pub fn array_geometry(len: usize) -> GrcResult<ArrayGeometry> {
    if len == 0 {
        return Err(GrcError::ArgumentError);
    }
    let total_slots = len + 1;
    let block_count = div_ceil(total_slots, MAX_VALUES_PER_BLOCK);
    if block_count > MAX_BLOCK_COUNT {
        return Err(GrcError::ArgumentError);
    }
    let slots_per_block = div_ceil(total_slots, block_count);
    let block_size = slots_per_block * 4 + 4;
    if block_size > 255 {
        return Err(GrcError::ArgumentError);
    }
    Ok(ArrayGeometry {
        block_count: block_count as u8,
        block_size: block_size as u8,
        slots_per_block,
    })
}

/// Encodes and writes the blocks of a float-array streaming session,
/// flushing through `transport` one block at a time. The activate-streaming
/// command must already have been written by the caller (it precedes the
/// whole session, not each block).
pub fn write_float_array_blocks<T: Transport>(
    transport: &mut T,
    values: &[f32],
    geometry: ArrayGeometry,
) -> GrcResult<()> {
    let mut scratch = Scratch::new();
    let slots_per_block = geometry.slots_per_block;
    let block_size = geometry.block_size as usize;

    for block_idx in 0..geometry.block_count as usize {
        let mut payload = Vec::<u8, 252>::new();
        let slot_start = block_idx * slots_per_block;
        for slot in slot_start..slot_start + slots_per_block {
            let bytes = if slot == 0 {
                (values.len() as i32).to_le_bytes()
            } else if slot - 1 < values.len() {
                values[slot - 1].to_bits().to_le_bytes()
            } else {
                // Past the last real value: zero padding.
                [0u8; 4]
            };
            payload
                .extend_from_slice(&bytes)
                .map_err(|_| GrcError::ArgumentError)?;
        }
        push_block(&mut scratch, (block_idx + 1) as u8, &payload, block_size)?;
        transport.write(&scratch).map_err(|_| GrcError::I2cError)?;
    }
    Ok(())
}

/// Checks the 32-byte stream-result bitmap: every block `1..=block_count`
/// must have its bit set, else the whole session is `DataNotDelivered`.
///
/// Bit `k-1` (for block `k`) lives at byte `31 - (k-1)/8`, bit `(k-1) % 8`.
pub fn check_delivery(bitmap: &[u8; 32], block_count: u8) -> GrcResult<()> {
    for k in 1..=block_count {
        let bit_index = (k - 1) as usize;
        let byte = 31 - bit_index / 8;
        let shift = bit_index % 8;
        if bitmap[byte] & (1 << shift) == 0 {
            return Err(GrcError::DataNotDelivered);
        }
    }
    Ok(())
}
