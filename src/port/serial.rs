use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::serial;

use crate::port::traits::{Port, ReadError};

/// Default per-call read timeout in milliseconds
pub const DEFAULT_READ_TIMEOUT_MS: u32 = 1000;

/// Millisecond time source
pub trait Clock {
    /// Monotonic milliseconds, wrapping at `u32::MAX`
    fn millis(&mut self) -> u32;
}

/// [`Port`] over an `embedded-hal` serial peripheral
///
/// The peripheral is expected to be configured (pins, baud rate) by the
/// HAL before it is handed over, so [`Port::open`] only clears stale input.
pub struct SerialPort<S, DL, CLK> {
    serial: S,
    delay: DL,
    clock: CLK,
    read_timeout_ms: u32,
}

impl<S, DL, CLK> SerialPort<S, DL, CLK> {
    /// Create new serial port
    pub fn new(serial: S, delay: DL, clock: CLK) -> Self {
        Self {
            serial,
            delay,
            clock,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
        }
    }

    /// Set the per-call read timeout
    pub fn set_read_timeout(&mut self, timeout_ms: u32) {
        self.read_timeout_ms = timeout_ms;
    }

    /// Give back the wrapped peripherals
    pub fn release(self) -> (S, DL, CLK) {
        (self.serial, self.delay, self.clock)
    }
}

impl<S, DL, CLK, E> Port for SerialPort<S, DL, CLK>
where
    S: serial::Read<u8, Error = E> + serial::Write<u8, Error = E>,
    DL: DelayMs<u32>,
    CLK: Clock,
{
    type Error = E;

    fn open(&mut self, baud_rate: u32, _device: Option<&str>) -> Result<(), Self::Error> {
        debug!("serial port opened at {} baud", baud_rate);
        self.flush_rx();
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        for &byte in data {
            nb::block!(self.serial.write(byte))?;
        }
        nb::block!(self.serial.flush())?;
        Ok(data.len())
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, ReadError<Self::Error>> {
        let start = self.clock.millis();
        let mut count = 0;

        while count < buffer.len() {
            match self.serial.read() {
                Ok(byte) => {
                    buffer[count] = byte;
                    count += 1;
                }
                Err(nb::Error::WouldBlock) => {
                    if self.clock.millis().wrapping_sub(start) >= self.read_timeout_ms {
                        break;
                    }
                }
                Err(nb::Error::Other(e)) => return Err(ReadError::Other(e)),
            }
        }

        if count == 0 && !buffer.is_empty() {
            return Err(ReadError::Timeout);
        }
        Ok(count)
    }

    fn flush_rx(&mut self) {
        // Drain until the peripheral has nothing left or reports an error
        while self.serial.read().is_ok() {}
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    fn millis(&mut self) -> u32 {
        self.clock.millis()
    }
}
