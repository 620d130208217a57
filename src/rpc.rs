//! RPC state machine built on top of the command layer.
//!
//! One operation per remote function. The canonical sequence for an
//! operation that carries arguments is: precondition check, argument
//! streaming, delivery verification, invocation, completion polling, and
//! (only for `get-status`) result retrieval.

use crate::command::{self, FUNCTION_MAX, FUNCTION_MIN};
use crate::error::{GrcError, GrcResult, Retcode};
use crate::frame::{self, array_geometry};
use crate::params::Param;
use crate::transport::Transport;

pub const FN_START_TRAINING: u8 = 0x07;
pub const FN_STOP_TRAINING: u8 = 0x08;
pub const FN_START_INFERENCE: u8 = 0x09;
pub const FN_STOP_INFERENCE: u8 = 0x0A;
pub const FN_FEED_SINGLE: u8 = 0x0B;
pub const FN_FEED_ARRAY: u8 = 0x0C;
pub const FN_GET_STATUS: u8 = 0x0D;
pub const FN_CLEAR: u8 = 0x0E;
pub const FN_SET_PARAMETERS: u8 = 0x0F;

/// Step 1: require the device idle (current-function byte 0).
///
/// An in-range nonzero value means another function is running; an
/// out-of-range value is a wire-level protocol violation.
fn check_idle<T: Transport>(transport: &mut T) -> GrcResult<()> {
    let current = command::get_current_function(transport)?;
    if current == 0 {
        return Ok(());
    }
    if (FUNCTION_MIN..=FUNCTION_MAX).contains(&current) {
        #[cfg(feature = "defmt")]
        defmt::warn!("grc busy: function {=u8:#04x} in progress", current);
        Err(GrcError::GrcIsBusy)
    } else {
        Err(GrcError::WrongGrcAnswer)
    }
}

/// Steps 5 (and the implicit retcode surfacing of step 4): poll until the
/// device is neither called nor running, then return its retcode.
fn poll_completion<T: Transport>(transport: &mut T, function: u8) -> GrcResult<Retcode> {
    loop {
        let status = command::get_function_status(transport, function)?;
        if status.called || status.running {
            transport.sleep_ms(2);
            continue;
        }
        return Ok(status.retcode);
    }
}

/// Runs the full argument-carrying sequence for one already-encoded block.
fn run_with_block<T: Transport>(
    transport: &mut T,
    function: u8,
    block: &[u8],
    block_size: u8,
) -> GrcResult<Retcode> {
    check_idle(transport)?;
    command::activate_streaming(transport, block_size, 1)?;
    transport.write(block).map_err(|_| GrcError::I2cError)?;
    let bitmap = command::get_stream_result(transport)?;
    frame::check_delivery(&bitmap, 1)?;
    command::call_function(transport, function)?;
    poll_completion(transport, function)
}

/// Runs the sequence for an operation with no arguments (steps 2–3 skipped).
fn run_without_args<T: Transport>(transport: &mut T, function: u8) -> GrcResult<Retcode> {
    check_idle(transport)?;
    command::call_function(transport, function)?;
    poll_completion(transport, function)
}

fn retcode_result(retcode: Retcode) -> GrcResult<()> {
    let result = GrcError::from_retcode(retcode);
    #[cfg(feature = "defmt")]
    if let Err(err) = result {
        defmt::warn!("remote function returned {}: {}", retcode, err);
    }
    result
}

/// Sends one parameter and invokes `set-parameters`. A batch of parameters
/// repeats this full sequence per parameter (spec.md §4.5).
pub fn set_parameters<T: Transport>(transport: &mut T, param: &Param) -> GrcResult<()> {
    let block = frame::encode_param_block(param)?;
    let retcode = run_with_block(transport, FN_SET_PARAMETERS, &block, 9)?;
    retcode_result(retcode)
}

/// Starts training on `category` (a device-side class index, or negative to
/// mean "append a new class" per spec.md §4.6).
pub fn start_training<T: Transport>(transport: &mut T, category: i32) -> GrcResult<()> {
    let block = frame::encode_int_block(category)?;
    let retcode = run_with_block(transport, FN_START_TRAINING, &block, 8)?;
    retcode_result(retcode)
}

pub fn stop_training<T: Transport>(transport: &mut T) -> GrcResult<()> {
    retcode_result(run_without_args(transport, FN_STOP_TRAINING)?)
}

pub fn start_inference<T: Transport>(transport: &mut T) -> GrcResult<()> {
    retcode_result(run_without_args(transport, FN_START_INFERENCE)?)
}

pub fn stop_inference<T: Transport>(transport: &mut T) -> GrcResult<()> {
    retcode_result(run_without_args(transport, FN_STOP_INFERENCE)?)
}

/// Feeds one float value (used by upload, one element at a time).
pub fn feed_single<T: Transport>(transport: &mut T, value: f32) -> GrcResult<()> {
    let block = frame::encode_float_block(value)?;
    let retcode = run_with_block(transport, FN_FEED_SINGLE, &block, 8)?;
    retcode_result(retcode)
}

/// Feeds an array of floats (used by train/inference sample delivery).
pub fn feed_array<T: Transport>(transport: &mut T, values: &[f32]) -> GrcResult<()> {
    check_idle(transport)?;
    let geometry = array_geometry(values.len())?;
    command::activate_streaming(transport, geometry.block_size, geometry.block_count)?;
    frame::write_float_array_blocks(transport, values, geometry)?;
    let bitmap = command::get_stream_result(transport)?;
    frame::check_delivery(&bitmap, geometry.block_count)?;
    command::call_function(transport, FN_FEED_ARRAY)?;
    let retcode = poll_completion(transport, FN_FEED_ARRAY)?;
    retcode_result(retcode)
}

pub fn clear<T: Transport>(transport: &mut T) -> GrcResult<()> {
    retcode_result(run_without_args(transport, FN_CLEAR)?)
}

/// Runs `get-status` and fetches its signed integer result (the only
/// operation whose step 6, result retrieval, applies).
pub fn get_status<T: Transport>(transport: &mut T) -> GrcResult<i32> {
    let retcode = run_without_args(transport, FN_GET_STATUS)?;
    retcode_result(retcode)?;
    command::get_function_result(transport, FN_GET_STATUS)
}
