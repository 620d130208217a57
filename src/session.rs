//! Session layer (spec.md §4.6)
//!
//! Sequences init, parameter set, clear, train, inference and model
//! download/upload on top of [`crate::rpc`], and owns the per-handle class
//! tag table. One `Session` per device handle; per spec.md §9 every field
//! is owned, not shared global state.

use crate::command;
use crate::error::{GrcError, GrcResult};
use crate::params::{arch_type_for, ExtStatusReq, Param};
use crate::rpc;
use crate::tags::{Tag, TagTable};
use crate::transport::Transport;
use heapless::Vec;

/// Architecture selector supplied at `open` (spec.md §6): a (channels,
/// neurons) pair from the closed set of eight, not a raw wire code.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub channels: u8,
    pub neurons: u8,
}

/// Flags for `train` (spec.md §4.6, `grc.h` `GRC_PARAMS_*`).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TrainFlags {
    pub async_mode: bool,
    pub overwrite: bool,
    pub add_new_tag: bool,
}

/// Flags for `inference`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct InferenceFlags {
    pub async_mode: bool,
    pub single_class: bool,
}

/// Maximum internal-state length `download`/`upload` can hold. The source
/// has no such bound (it `malloc`s); a `no_std` driver needs one. Chosen
/// generously relative to the largest architecture (100 reservoir neurons);
/// see DESIGN.md.
pub const MAX_INTERNAL_STATE_LEN: usize = 512;

pub type StateBuffer = Vec<f32, MAX_INTERNAL_STATE_LEN>;

/// One device handle: an owned transport plus the host-side tag table.
pub struct Session<T: Transport> {
    transport: T,
    tags: TagTable,
}

impl<T: Transport> Session<T> {
    /// `open`: reads and checks the SDK version, pushes the architecture
    /// selector, and starts with an empty tag table.
    pub fn open(mut transport: T, config: Config) -> GrcResult<Self> {
        let version = command::get_sdk_version(&mut transport)?;
        if version != 1 {
            #[cfg(feature = "defmt")]
            defmt::warn!("grc sdk version mismatch: got {=u32}, want 1", version);
            return Err(GrcError::SdkVersionMismatch);
        }
        let arch = arch_type_for(config.channels, config.neurons)
            .ok_or(GrcError::ArgumentError)?;
        rpc::set_parameters(&mut transport, &Param::ArchType(arch))?;
        #[cfg(feature = "defmt")]
        defmt::info!("grc session open: {} channels, {} neurons", config.channels, config.neurons);
        Ok(Self { transport, tags: TagTable::new() })
    }

    /// `set_config`: one `set-parameters` RPC per hyperparameter. Only the
    /// six hyperparameter kinds are accepted here; the architecture/control
    /// kinds are internal-only and rejected as unrecognised.
    pub fn set_config(&mut self, hyperparams: &[Param]) -> GrcResult<()> {
        for param in hyperparams {
            if !is_hyperparam(param) {
                return Err(GrcError::ArgumentError);
            }
            rpc::set_parameters(&mut self.transport, param)?;
        }
        Ok(())
    }

    /// `clear_state`: clears device state, then the tag table.
    pub fn clear_state(&mut self) -> GrcResult<()> {
        rpc::clear(&mut self.transport)?;
        self.tags.clear();
        Ok(())
    }

    /// `train`: see spec.md §4.6 for the full decision table.
    pub fn train(&mut self, flags: TrainFlags, tag: Tag, values: &[f32]) -> GrcResult<usize> {
        let existing = if flags.add_new_tag {
            None
        } else {
            self.tags.index_for_tag(tag)
        };
        if !flags.overwrite && existing.is_some() {
            return Err(GrcError::ArgumentError);
        }
        if flags.async_mode {
            return Err(GrcError::NotImplemented);
        }

        let wire_class_idx: i32 = match existing {
            Some(idx) => idx as i32,
            None => -1,
        };
        rpc::start_training(&mut self.transport, wire_class_idx)?;
        rpc::feed_array(&mut self.transport, values)?;
        rpc::stop_training(&mut self.transport)?;

        match existing {
            Some(idx) => Ok(idx),
            None => {
                let next_index = self.tags.len() as Tag;
                let tag_to_store = if flags.add_new_tag { next_index } else { tag };
                self.tags.push(tag_to_store)
            }
        }
    }

    /// `inference`: see spec.md §4.6. Returns the caller's tag, or
    /// `Err(GrcError::NotClassified)` for the device's `-1` sentinel.
    pub fn inference(
        &mut self,
        flags: InferenceFlags,
        tag: Tag,
        values: &[f32],
    ) -> GrcResult<Tag> {
        if flags.async_mode {
            return Err(GrcError::NotImplemented);
        }
        if flags.single_class {
            let idx = self.tags.index_for_tag(tag).ok_or(GrcError::ArgumentError)?;
            rpc::set_parameters(&mut self.transport, &Param::ReqCategory(idx as i32))?;
        }
        rpc::start_inference(&mut self.transport)?;
        rpc::feed_array(&mut self.transport, values)?;
        rpc::stop_inference(&mut self.transport)?;
        let class_idx = rpc::get_status(&mut self.transport)?;

        if class_idx >= self.tags.len() as i32 {
            return Err(GrcError::WrongGrcAnswer);
        }
        if class_idx < 0 {
            return Err(GrcError::NotClassified);
        }
        self.tags
            .tag_for_index(class_idx as usize)
            .ok_or(GrcError::WrongGrcAnswer)
    }

    /// `classes_count`: number of trained classes known to the device.
    pub fn classes_count(&mut self) -> GrcResult<i32> {
        rpc::set_parameters(
            &mut self.transport,
            &Param::AskExtStatus(ExtStatusReq::CatsQty),
        )?;
        rpc::get_status(&mut self.transport)
    }

    /// `download`: reads the device's internal state buffer, one 32-bit
    /// pattern at a time, relying on the device to advance its own cursor
    /// between consecutive `get-status` calls after `NextDataElm` is armed.
    pub fn download(&mut self) -> GrcResult<(StateBuffer, i32)> {
        rpc::set_parameters(
            &mut self.transport,
            &Param::AskExtStatus(ExtStatusReq::SaveDataLen),
        )?;
        let len = rpc::get_status(&mut self.transport)?;
        if len < 0 || len as usize > MAX_INTERNAL_STATE_LEN {
            return Err(GrcError::WrongGrcAnswer);
        }

        rpc::set_parameters(
            &mut self.transport,
            &Param::AskExtStatus(ExtStatusReq::NextDataElm),
        )?;

        let mut buffer = StateBuffer::new();
        for _ in 0..len {
            let bits = rpc::get_status(&mut self.transport)?;
            buffer
                .push(f32::from_bits(bits as u32))
                .map_err(|_| GrcError::WrongGrcAnswer)?;
        }

        let class_count = self.classes_count()?;
        Ok((buffer, class_count))
    }

    /// `upload`: streams `buffer` one element at a time, then tells the
    /// device how many classes it represents and reinitialises the tag
    /// table to the identity map.
    pub fn upload(&mut self, buffer: &[f32], class_count: usize) -> GrcResult<()> {
        for &value in buffer {
            rpc::feed_single(&mut self.transport, value)?;
        }
        rpc::set_parameters(&mut self.transport, &Param::LoadTrainData(class_count as i32))?;
        self.tags.reinit_identity(class_count)
    }

    /// Drives the optional hardware reset line low then high. A no-op if
    /// the transport has no reset capability.
    pub fn reset(&mut self) -> GrcResult<()> {
        if !self.transport.has_reset() {
            return Ok(());
        }
        self.transport.reset_low();
        self.transport.sleep_ms(1);
        self.transport.reset_high();
        Ok(())
    }

    /// `close`: consumes the handle; the transport is released by drop.
    pub fn close(self) {}
}

fn is_hyperparam(param: &Param) -> bool {
    matches!(
        param,
        Param::PredictSignal(_)
            | Param::SeparateInaccuracies(_)
            | Param::Noise(_)
            | Param::InputScaling(_)
            | Param::FeedbackScaling(_)
            | Param::ThresholdFactor(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;

    fn open_session(t: MockTransport) -> Session<MockTransport> {
        let mut t = t;
        // SDK version handshake.
        t.push_read(&1u32.to_le_bytes());
        // set-parameters(ArchType) sequence: idle, delivered, ok.
        t.push_read(&[0x00]);
        t.push_read(&[0xFFu8; 32]);
        t.push_read(&[0x00]);
        Session::open(t, Config { channels: 3, neurons: 10 }).unwrap()
    }

    #[test]
    fn open_rejects_sdk_version_mismatch() {
        let mut t = MockTransport::new();
        t.push_read(&2u32.to_le_bytes());
        let err = Session::open(t, Config { channels: 1, neurons: 10 }).unwrap_err();
        assert_eq!(err, GrcError::SdkVersionMismatch);
    }

    #[test]
    fn open_rejects_unknown_architecture() {
        let mut t = MockTransport::new();
        t.push_read(&1u32.to_le_bytes());
        let err = Session::open(t, Config { channels: 2, neurons: 10 }).unwrap_err();
        assert_eq!(err, GrcError::ArgumentError);
    }

    #[test]
    fn scenario_s1_open_sequence() {
        // spec.md §8 S1: open() checks get-sdk-version, then streams
        // ArchType=5 for (channels=3, neurons=10) and succeeds.
        let mut t = MockTransport::new();
        t.push_read(&1u32.to_le_bytes()); // get-sdk-version -> 1
        t.push_read(&[0x00]); // idle check inside set_parameters
        t.push_read(&[0xFFu8; 32]); // delivered
        t.push_read(&[0x00]); // retcode Ok

        let session = Session::open(t, Config { channels: 3, neurons: 10 });
        assert!(session.is_ok());
    }

    #[test]
    fn train_with_add_new_tag_assigns_sequential_indices() {
        let mut session = open_session(MockTransport::new());
        // First train: idle, delivered(start), array delivered, idle/delivered(stop).
        let t = &mut session.transport;
        t.push_read(&[0x00]); // idle (start-training)
        t.push_read(&[0xFFu8; 32]); // start-training block delivered
        t.push_read(&[0x00]); // start-training retcode ok
        t.push_read(&[0x00]); // idle (feed-array)
        t.push_read(&[0xFFu8; 32]); // feed-array delivered
        t.push_read(&[0x00]); // feed-array retcode ok
        t.push_read(&[0x00]); // idle (stop-training)
        t.push_read(&[0x00]); // stop-training retcode ok

        let flags = TrainFlags { add_new_tag: true, ..Default::default() };
        let idx = session.train(flags, 0, &[1.0, 2.0]).unwrap();
        assert_eq!(idx, 0);
    }

    #[test]
    fn train_rejects_existing_tag_without_overwrite() {
        let mut session = open_session(MockTransport::new());
        // Manually seed the tag table as if a previous train had completed.
        session.tags.push(7).unwrap();
        let flags = TrainFlags::default();
        assert_eq!(
            session.train(flags, 7, &[1.0]),
            Err(GrcError::ArgumentError)
        );
    }

    #[test]
    fn train_async_is_not_implemented() {
        let mut session = open_session(MockTransport::new());
        let flags = TrainFlags { async_mode: true, ..Default::default() };
        assert_eq!(
            session.train(flags, 1, &[1.0]),
            Err(GrcError::NotImplemented)
        );
    }

    #[test]
    fn scenario_s5_inference_translates_index_to_tag() {
        let mut session = open_session(MockTransport::new());
        session.tags.push(7).unwrap();
        session.tags.push(42).unwrap();

        let t = &mut session.transport;
        t.push_read(&[0x00]); // idle (start-inference)
        t.push_read(&[0x00]); // start-inference retcode ok
        t.push_read(&[0x00]); // idle (feed-array)
        t.push_read(&[0xFFu8; 32]); // feed-array delivered
        t.push_read(&[0x00]); // feed-array retcode ok
        t.push_read(&[0x00]); // idle (stop-inference)
        t.push_read(&[0x00]); // stop-inference retcode ok
        t.push_read(&[0x00]); // idle (get-status)
        t.push_read(&[0x00]); // get-status retcode ok
        t.push_read(&1i32.to_le_bytes()); // function result -> index 1

        let flags = InferenceFlags::default();
        assert_eq!(session.inference(flags, 0, &[1.0]).unwrap(), 42);
    }

    #[test]
    fn scenario_s5_out_of_range_index_is_wrong_answer() {
        let mut session = open_session(MockTransport::new());
        session.tags.push(7).unwrap();
        session.tags.push(42).unwrap();

        let t = &mut session.transport;
        t.push_read(&[0x00]);
        t.push_read(&[0x00]);
        t.push_read(&[0x00]);
        t.push_read(&[0xFFu8; 32]);
        t.push_read(&[0x00]);
        t.push_read(&[0x00]);
        t.push_read(&[0x00]);
        t.push_read(&[0x00]);
        t.push_read(&[0x00]);
        t.push_read(&5i32.to_le_bytes()); // index 5 >= table len 2

        let flags = InferenceFlags::default();
        assert_eq!(
            session.inference(flags, 0, &[1.0]),
            Err(GrcError::WrongGrcAnswer)
        );
    }

    #[test]
    fn inference_not_classified_passes_through_as_error() {
        let mut session = open_session(MockTransport::new());
        let t = &mut session.transport;
        t.push_read(&[0x00]);
        t.push_read(&[0x00]);
        t.push_read(&[0x00]);
        t.push_read(&[0xFFu8; 32]);
        t.push_read(&[0x00]);
        t.push_read(&[0x00]);
        t.push_read(&[0x00]);
        t.push_read(&[0x00]);
        t.push_read(&[0x00]);
        t.push_read(&(-1i32).to_le_bytes());

        let flags = InferenceFlags::default();
        assert_eq!(
            session.inference(flags, 0, &[1.0]),
            Err(GrcError::NotClassified)
        );
    }

    #[test]
    fn set_config_rejects_unrecognised_kind() {
        let mut session = open_session(MockTransport::new());
        let err = session.set_config(&[Param::ArchType(1)]).unwrap_err();
        assert_eq!(err, GrcError::ArgumentError);
    }

    #[test]
    fn scenario_s6_download_then_upload_roundtrip() {
        let mut session = open_session(MockTransport::new());
        {
            let t = &mut session.transport;
            // download: SaveDataLen -> get-status(len=2)
            t.push_read(&[0x00]);
            t.push_read(&[0xFFu8; 32]);
            t.push_read(&[0x00]);
            t.push_read(&[0x00]); // idle (get-status)
            t.push_read(&[0x00]); // retcode ok
            t.push_read(&2i32.to_le_bytes()); // len = 2
            // NextDataElm set
            t.push_read(&[0x00]);
            t.push_read(&[0xFFu8; 32]);
            t.push_read(&[0x00]);
            // two consecutive get-status reads, one per element
            t.push_read(&[0x00]);
            t.push_read(&[0x00]);
            t.push_read(&0.5f32.to_bits().to_le_bytes());
            t.push_read(&[0x00]);
            t.push_read(&[0x00]);
            t.push_read(&(-1.0f32).to_bits().to_le_bytes());
            // classes_count: AskExtStatus(CatsQty) + get-status
            t.push_read(&[0x00]);
            t.push_read(&[0xFFu8; 32]);
            t.push_read(&[0x00]);
            t.push_read(&[0x00]);
            t.push_read(&[0x00]);
            t.push_read(&1i32.to_le_bytes());
        }

        let (buffer, class_count) = session.download().unwrap();
        assert_eq!(buffer.as_slice(), &[0.5, -1.0]);
        assert_eq!(class_count, 1);

        {
            let t = &mut session.transport;
            // upload: two feed_single calls
            for _ in 0..2 {
                t.push_read(&[0x00]);
                t.push_read(&[0xFFu8; 32]);
                t.push_read(&[0x00]);
            }
            // set-parameters(LoadTrainData)
            t.push_read(&[0x00]);
            t.push_read(&[0xFFu8; 32]);
            t.push_read(&[0x00]);
        }
        session.upload(&buffer, 1).unwrap();
        assert_eq!(session.tags.len(), 1);
        assert_eq!(session.tags.tag_for_index(0), Some(0));
    }

    #[test]
    fn reset_drives_low_then_high_with_a_sleep_between() {
        let mut session = open_session(MockTransport::new());
        session.reset().unwrap();
        let t = &session.transport;
        assert_eq!(t.reset_log.as_slice(), &[false, true]);
        assert_eq!(t.sleeps_ms.last(), Some(&1));
    }

    #[test]
    fn reset_is_a_no_op_without_the_capability() {
        let mut session = open_session(MockTransport::without_reset());
        let sleeps_before = session.transport.sleeps_ms.len();
        session.reset().unwrap();
        let t = &session.transport;
        assert!(t.reset_log.is_empty());
        assert_eq!(t.sleeps_ms.len(), sleeps_before);
    }
}
