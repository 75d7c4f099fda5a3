use heapless::Vec;

use crate::error::Error;
use crate::port::Port;

/// Start delimiter opening every API frame
pub const START_DELIMITER: u8 = 0x7E;

/// Maximum frame data size (type byte plus payload)
pub const MAX_FRAME_DATA_SIZE: usize = 256;

/// Maximum payload size following the type byte
pub const MAX_PAYLOAD_SIZE: usize = MAX_FRAME_DATA_SIZE - 1;

/// Delimiter, two length bytes and checksum
pub const FRAME_OVERHEAD: usize = 4;

/// Largest encoded frame
pub const MAX_ENCODED_SIZE: usize = MAX_FRAME_DATA_SIZE + FRAME_OVERHEAD;

/// API frame types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FrameType {
    /// AT command request
    AtCommand = 0x08,
    /// Cellular IPv4 transmit request
    CellularTxIpv4 = 0x20,
    /// Socket create request
    SocketCreate = 0x40,
    /// Socket option request
    SocketOption = 0x41,
    /// Socket connect request
    SocketConnect = 0x42,
    /// Socket close request
    SocketClose = 0x43,
    /// Socket send request
    SocketSend = 0x44,
    /// Socket send-to request
    SocketSendTo = 0x45,
    /// Socket bind request
    SocketBind = 0x46,
    /// LoRaWAN transmit request
    LrTxRequest = 0x50,
    /// AT command response
    AtResponse = 0x88,
    /// Transmit status
    TxStatus = 0x89,
    /// Modem status
    ModemStatus = 0x8A,
    /// Cellular IPv4 receive
    CellularRxIpv4 = 0xB0,
    /// Socket create response
    SocketCreateResponse = 0xC0,
    /// Socket option response
    SocketOptionResponse = 0xC1,
    /// Socket connect response
    SocketConnectResponse = 0xC2,
    /// Socket close response
    SocketCloseResponse = 0xC3,
    /// Socket bind response
    SocketBindResponse = 0xC6,
    /// Socket receive
    SocketReceive = 0xCD,
    /// Socket receive-from
    SocketReceiveFrom = 0xCE,
    /// Socket status
    SocketStatus = 0xCF,
    /// LoRaWAN receive
    LrRxPacket = 0xD0,
    /// LoRaWAN explicit receive
    LrExplicitRxPacket = 0xD1,
}

impl FrameType {
    /// Look up a frame type by its tag
    pub fn from_u8(tag: u8) -> Option<Self> {
        let frame_type = match tag {
            0x08 => FrameType::AtCommand,
            0x20 => FrameType::CellularTxIpv4,
            0x40 => FrameType::SocketCreate,
            0x41 => FrameType::SocketOption,
            0x42 => FrameType::SocketConnect,
            0x43 => FrameType::SocketClose,
            0x44 => FrameType::SocketSend,
            0x45 => FrameType::SocketSendTo,
            0x46 => FrameType::SocketBind,
            0x50 => FrameType::LrTxRequest,
            0x88 => FrameType::AtResponse,
            0x89 => FrameType::TxStatus,
            0x8A => FrameType::ModemStatus,
            0xB0 => FrameType::CellularRxIpv4,
            0xC0 => FrameType::SocketCreateResponse,
            0xC1 => FrameType::SocketOptionResponse,
            0xC2 => FrameType::SocketConnectResponse,
            0xC3 => FrameType::SocketCloseResponse,
            0xC6 => FrameType::SocketBindResponse,
            0xCD => FrameType::SocketReceive,
            0xCE => FrameType::SocketReceiveFrom,
            0xCF => FrameType::SocketStatus,
            0xD0 => FrameType::LrRxPacket,
            0xD1 => FrameType::LrExplicitRxPacket,
            _ => return None,
        };
        Some(frame_type)
    }

    /// Whether frames of this type carry inbound application data
    pub fn is_inbound_data(self) -> bool {
        matches!(
            self,
            FrameType::LrRxPacket
                | FrameType::LrExplicitRxPacket
                | FrameType::CellularRxIpv4
                | FrameType::SocketReceive
                | FrameType::SocketReceiveFrom
        )
    }
}

/// A decoded API frame
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Raw type tag
    pub frame_type: u8,
    /// Bytes following the type tag
    pub data: Vec<u8, MAX_PAYLOAD_SIZE>,
    /// Checksum as received
    pub checksum: u8,
}

impl Frame {
    /// Build a frame from a type tag and payload, computing its checksum
    pub fn new(frame_type: u8, payload: &[u8]) -> Option<Self> {
        let mut data = Vec::new();
        data.extend_from_slice(payload).ok()?;
        Some(Self {
            frame_type,
            checksum: checksum(frame_type, payload),
            data,
        })
    }

    /// Known frame type, if the tag is recognised
    pub fn kind(&self) -> Option<FrameType> {
        FrameType::from_u8(self.frame_type)
    }

    /// Whether this frame has the given type
    pub fn is(&self, frame_type: FrameType) -> bool {
        self.frame_type == frame_type as u8
    }

    /// Payload bytes following the type tag
    pub fn payload(&self) -> &[u8] {
        &self.data
    }

    /// Length as carried in the length field
    pub fn length(&self) -> u16 {
        self.data.len() as u16 + 1
    }
}

/// Sum of type tag and payload, modulo 256
fn sum(frame_type: u8, payload: &[u8]) -> u8 {
    payload
        .iter()
        .fold(frame_type, |acc, &byte| acc.wrapping_add(byte))
}

/// Checksum over the type tag and payload
pub fn checksum(frame_type: u8, payload: &[u8]) -> u8 {
    0xFF - sum(frame_type, payload)
}

/// Whether a stored checksum verifies against type tag and payload
pub fn verify(frame_type: u8, payload: &[u8], checksum: u8) -> bool {
    sum(frame_type, payload).wrapping_add(checksum) == 0xFF
}

/// Encode a frame for transmission
pub fn encode<E>(frame_type: u8, payload: &[u8]) -> Result<Vec<u8, MAX_ENCODED_SIZE>, Error<E>> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(Error::PayloadTooLarge);
    }

    let length = (payload.len() + 1) as u16;
    let mut buffer = Vec::new();

    // Capacity covers the largest payload checked above
    buffer.push(START_DELIMITER).map_err(|_| Error::PayloadTooLarge)?;
    buffer
        .extend_from_slice(&length.to_be_bytes())
        .map_err(|_| Error::PayloadTooLarge)?;
    buffer.push(frame_type).map_err(|_| Error::PayloadTooLarge)?;
    buffer
        .extend_from_slice(payload)
        .map_err(|_| Error::PayloadTooLarge)?;
    buffer
        .push(checksum(frame_type, payload))
        .map_err(|_| Error::PayloadTooLarge)?;

    Ok(buffer)
}

/// Read exactly `buffer.len()` bytes; anything less is a timeout
fn read_exact<P: Port>(port: &mut P, buffer: &mut [u8]) -> Result<(), Error<P::Error>> {
    let count = port.read(buffer)?;
    if count != buffer.len() {
        return Err(Error::Timeout);
    }
    Ok(())
}

/// Decode one frame from the port
///
/// Reads a delimiter, the length, the frame data and the checksum, each
/// bounded by the port's read timeout. Never retries.
pub fn decode<P: Port>(port: &mut P) -> Result<Frame, Error<P::Error>> {
    let mut delimiter = [0u8; 1];
    read_exact(port, &mut delimiter)?;
    if delimiter[0] != START_DELIMITER {
        trace!("invalid start delimiter 0x{:x}", delimiter[0]);
        return Err(Error::InvalidStartDelimiter(delimiter[0]));
    }

    let mut length_bytes = [0u8; 2];
    read_exact(port, &mut length_bytes)?;
    let length = u16::from_be_bytes(length_bytes);
    if length as usize > MAX_FRAME_DATA_SIZE {
        warn!("frame length {} exceeds buffer", length);
        return Err(Error::FrameTooLarge(length));
    }
    if length == 0 {
        return Err(Error::EmptyFrame);
    }

    let mut raw = [0u8; MAX_FRAME_DATA_SIZE];
    let raw = &mut raw[..length as usize];
    read_exact(port, raw)?;

    let mut checksum = [0u8; 1];
    read_exact(port, &mut checksum)?;

    let (frame_type, payload) = (raw[0], &raw[1..]);
    if !verify(frame_type, payload, checksum[0]) {
        warn!("checksum mismatch on frame type 0x{:x}", frame_type);
        return Err(Error::InvalidChecksum);
    }

    let mut data = Vec::new();
    data.extend_from_slice(payload)
        .map_err(|_| Error::FrameTooLarge(length))?;

    trace!("received frame type 0x{:x}, {} bytes", frame_type, payload.len());
    Ok(Frame {
        frame_type,
        data,
        checksum: checksum[0],
    })
}
