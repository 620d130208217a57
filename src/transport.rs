//! Transport capability (spec.md §4.1)
//!
//! The rest of the core never touches the bus directly; every on-wire frame
//! is built by [`crate::frame`] and handed to [`Transport::write`] in one
//! call. Grounded in the teacher's split between framing (`protocol.rs`)
//! and the physical link (`serial.rs`/`serial_usb.rs`): those own the bytes,
//! the protocol layer never does.

/// Pluggable bus capability the protocol stack is built on.
///
/// Implementations must send each [`Transport::write`] call as a single,
/// atomic bus transaction. The codec relies on a whole frame (or whole
/// run of streamed blocks) reaching the device as one unit.
pub trait Transport {
    /// Transport-level error type (e.g. an I2C NACK).
    type Error;

    /// Write `bytes` as one bus transaction. Returns the count written.
    fn write(&mut self, bytes: &[u8]) -> Result<usize, Self::Error>;

    /// Read up to `buf.len()` bytes, blocking until at least one byte (or
    /// the implementation's own timeout) arrives. Returns the count read.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Cooperative millisecond delay.
    fn sleep_ms(&mut self, ms: u32);

    /// Optional hardware reset line, driven high. No-op if absent.
    fn reset_high(&mut self) {}

    /// Optional hardware reset line, driven low. No-op if absent.
    fn reset_low(&mut self) {}

    /// Whether the reset line is physically present. Transports without a
    /// reset capability override this to `false` so callers can skip the
    /// reset sequence (and its settling sleep) entirely.
    fn has_reset(&self) -> bool {
        true
    }
}

/// Adapts an `embedded-hal` blocking I2C peripheral (plus a delay provider
/// and an optional reset pin) into a [`Transport`].
///
/// The device address is fixed per handle, matching spec.md §3's "opaque
/// pair (transport capability, negotiated protocol version)".
pub struct I2cTransport<I2C, DELAY, RESET = NoReset> {
    i2c: I2C,
    delay: DELAY,
    reset: RESET,
    address: u8,
}

impl<I2C, DELAY> I2cTransport<I2C, DELAY, NoReset> {
    pub fn new(i2c: I2C, delay: DELAY, address: u8) -> Self {
        Self { i2c, delay, reset: NoReset, address }
    }
}

impl<I2C, DELAY, RESET> I2cTransport<I2C, DELAY, RESET> {
    pub fn with_reset(i2c: I2C, delay: DELAY, reset: RESET, address: u8) -> Self {
        Self { i2c, delay, reset, address }
    }
}

impl<I2C, DELAY, RESET> Transport for I2cTransport<I2C, DELAY, RESET>
where
    I2C: embedded_hal::i2c::I2c,
    DELAY: embedded_hal::delay::DelayNs,
    RESET: ResetPin,
{
    type Error = I2C::Error;

    fn write(&mut self, bytes: &[u8]) -> Result<usize, Self::Error> {
        self.i2c.write(self.address, bytes)?;
        Ok(bytes.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.i2c.read(self.address, buf)?;
        Ok(buf.len())
    }

    fn sleep_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    fn reset_high(&mut self) {
        self.reset.set_high();
    }

    fn reset_low(&mut self) {
        self.reset.set_low();
    }

    fn has_reset(&self) -> bool {
        self.reset.is_present()
    }
}

/// Abstraction over the optional hardware reset pin, separate from
/// `embedded_hal::digital::OutputPin` so a transport with no reset pin at
/// all (`NoReset`) can implement it as a no-op instead of needing an
/// `Option<impl OutputPin>` at every call site.
pub trait ResetPin {
    fn set_high(&mut self);
    fn set_low(&mut self);

    /// Whether this is a real reset line, not the absent-capability marker.
    fn is_present(&self) -> bool {
        true
    }
}

/// Marker for a transport with no physical reset line.
pub struct NoReset;

impl ResetPin for NoReset {
    fn set_high(&mut self) {}
    fn set_low(&mut self) {}
    fn is_present(&self) -> bool {
        false
    }
}

impl<P: embedded_hal::digital::OutputPin> ResetPin for P {
    fn set_high(&mut self) {
        let _ = embedded_hal::digital::OutputPin::set_high(self);
    }

    fn set_low(&mut self) {
        let _ = embedded_hal::digital::OutputPin::set_low(self);
    }
}
