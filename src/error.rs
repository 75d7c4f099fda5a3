//! Driver error type
//!
//! Every fallible operation returns [`Error`], parametrised by the
//! transport's own error type so hardware failures pass through untouched.

use core::fmt;

use crate::port::ReadError;

/// Step of a socket operation a failure happened at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SocketStage {
    /// Waiting for the create response
    Create,
    /// Waiting for the connect response
    ConnectResponse,
    /// Waiting for the socket status after a successful connect response
    ConnectStatus,
    /// Waiting for the bind response
    Bind,
    /// Waiting for the socket status after a close request
    Close,
}

/// Driver error
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Transport error
    Port(E),
    /// Transport read timed out mid-frame
    Timeout,
    /// Transport dropped received bytes
    Overrun,
    /// First byte read was not the start delimiter
    InvalidStartDelimiter(u8),
    /// Length field exceeds the receive buffer
    FrameTooLarge(u16),
    /// Length field of zero, so no frame type
    EmptyFrame,
    /// Checksum did not verify
    InvalidChecksum,
    /// Payload does not fit a frame or exceeds the protocol cap
    PayloadTooLarge,
    /// Result bytes do not fit the caller's buffer
    BufferTooSmall,
    /// No matching command response before the deadline
    ResponseTimeout,
    /// Module answered a command with a nonzero status
    CommandRejected(u8),
    /// Command response had an unexpected shape
    UnexpectedResponse,
    /// Socket confirmation did not arrive in time
    SocketTimeout(SocketStage),
    /// Socket confirmation carried a failure status
    SocketRejected {
        /// Step that failed
        stage: SocketStage,
        /// Status byte reported by the module
        status: u8,
    },
    /// Socket confirmation referred to another request or socket
    SocketMismatch(SocketStage),
    /// Network join/attach did not complete within the configured number of polls
    ConnectFailed,
    /// Argument rejected before any I/O
    InvalidParameter,
    /// Operation has no meaning for this module family
    NotSupported,
}

impl<E> From<ReadError<E>> for Error<E> {
    fn from(error: ReadError<E>) -> Self {
        match error {
            ReadError::Timeout => Error::Timeout,
            ReadError::Overrun => Error::Overrun,
            ReadError::Other(e) => Error::Port(e),
        }
    }
}

impl<E> Error<E> {
    /// Whether this is a framing or read-timeout failure a poll loop can skip over
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Timeout
                | Error::Overrun
                | Error::InvalidStartDelimiter(_)
                | Error::FrameTooLarge(_)
                | Error::EmptyFrame
                | Error::InvalidChecksum
        )
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Port(e) => write!(f, "port error: {:?}", e),
            Error::Timeout => f.write_str("read timed out"),
            Error::Overrun => f.write_str("receive overrun"),
            Error::InvalidStartDelimiter(b) => write!(f, "invalid start delimiter 0x{:02X}", b),
            Error::FrameTooLarge(len) => write!(f, "frame length {} exceeds buffer", len),
            Error::EmptyFrame => f.write_str("empty frame"),
            Error::InvalidChecksum => f.write_str("invalid checksum"),
            Error::PayloadTooLarge => f.write_str("payload too large"),
            Error::BufferTooSmall => f.write_str("response buffer too small"),
            Error::ResponseTimeout => f.write_str("timed out waiting for command response"),
            Error::CommandRejected(status) => write!(f, "command rejected with status 0x{:02X}", status),
            Error::UnexpectedResponse => f.write_str("unexpected command response"),
            Error::SocketTimeout(stage) => write!(f, "socket {:?} timed out", stage),
            Error::SocketRejected { stage, status } => {
                write!(f, "socket {:?} failed with status 0x{:02X}", stage, status)
            }
            Error::SocketMismatch(stage) => write!(f, "socket {:?} confirmation mismatch", stage),
            Error::ConnectFailed => f.write_str("network connect failed"),
            Error::InvalidParameter => f.write_str("invalid parameter"),
            Error::NotSupported => f.write_str("not supported by this module"),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for Error<E> {}
