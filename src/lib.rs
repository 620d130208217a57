//! Host-side driver for the GRC reservoir-computing accelerator.
//!
//! `no_std` everywhere except `cargo test`, where the host toolchain's
//! `std` is available for the mock-transport unit tests. Callers provide a
//! [`Transport`] (an [`I2cTransport`] wrapping `embedded-hal` I2C, or any
//! other impl) and drive a [`Session`] through training and inference.

#![cfg_attr(not(test), no_std)]

mod command;
mod crc;
pub mod error;
mod frame;
mod params;
mod rpc;
mod session;
mod tags;
mod transport;

pub use error::{GrcError, GrcResult};
pub use params::{Architecture, ExtStatusReq, Param};
pub use session::{Config, InferenceFlags, Session, StateBuffer, TrainFlags, MAX_INTERNAL_STATE_LEN};
pub use tags::{Tag, CAPACITY as TAG_TABLE_CAPACITY};
pub use transport::{I2cTransport, NoReset, ResetPin, Transport};
