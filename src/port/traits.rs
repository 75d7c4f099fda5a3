/// Read failure reported by a [`Port`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadError<E> {
    /// No byte arrived within the port's read timeout
    Timeout,
    /// The receiver dropped bytes
    Overrun,
    /// Any other hardware error
    Other(E),
}

/// Byte transport and timing services the driver runs on
///
/// This is the boundary to the platform: a UART plus a millisecond clock
/// and a blocking delay. Implementations are expected to apply their own
/// per-call read timeout.
pub trait Port {
    /// Error type for port operations
    type Error;

    /// Open the underlying device at the given baud rate
    fn open(&mut self, baud_rate: u32, device: Option<&str>) -> Result<(), Self::Error>;

    /// Write all bytes, returning the number written
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Read into `buffer` until it is full or the read timeout elapses
    ///
    /// Returns the number of bytes read. A partial read is reported as
    /// `Ok(n)` with `n < buffer.len()`; nothing at all is
    /// [`ReadError::Timeout`].
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, ReadError<Self::Error>>;

    /// Discard everything pending in the receive buffer
    fn flush_rx(&mut self);

    /// Block for `ms` milliseconds
    fn delay_ms(&mut self, ms: u32);

    /// Monotonic milliseconds since an arbitrary epoch, wrapping at `u32::MAX`
    fn millis(&mut self) -> u32;

    /// Pulse the module's reset line
    ///
    /// Returns `Ok(false)` when the port has no reset line wired.
    fn hard_reset(&mut self) -> Result<bool, Self::Error> {
        Ok(false)
    }
}
