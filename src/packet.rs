//! Application-facing packet views
//!
//! Packets borrow their payload from the frame or caller buffer they were
//! built from and are only valid for the duration of a callback or call.

/// Transport protocol of a cellular socket or datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Protocol {
    /// UDP
    Udp = 0x00,
    /// TCP
    Tcp = 0x01,
    /// TLS over TCP
    Ssl = 0x04,
}

impl Protocol {
    /// Look up a protocol by its wire code
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(Protocol::Udp),
            0x01 => Some(Protocol::Tcp),
            0x04 => Some(Protocol::Ssl),
            _ => None,
        }
    }
}

/// LoRaWAN uplink or downlink
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LoRaWanPacket<'a> {
    /// Application payload
    pub payload: &'a [u8],
    /// LoRaWAN application port
    pub port: u8,
    /// Confirmed uplink requested
    pub ack: bool,
    /// Transaction id of the uplink (send confirmations)
    pub frame_id: u8,
    /// Delivery status (send confirmations)
    pub status: u8,
    /// Received signal strength (explicit downlinks)
    pub rssi: i8,
    /// Signal to noise ratio (explicit downlinks)
    pub snr: i8,
    /// Data rate index (explicit downlinks)
    pub data_rate: u8,
    /// Downlink frame counter (explicit downlinks)
    pub counter: u32,
    /// Downlink frequency in Hz (explicit downlinks)
    pub frequency: u32,
}

impl<'a> LoRaWanPacket<'a> {
    /// Create an uplink on `port`
    pub fn uplink(port: u8, payload: &'a [u8], ack: bool) -> Self {
        Self {
            payload,
            port,
            ack,
            ..Default::default()
        }
    }
}

/// Cellular datagram or socket data
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CellularPacket<'a> {
    /// Protocol, unknown for socket receive frames
    pub protocol: Option<Protocol>,
    /// Destination port (send) or source port (receive-from)
    pub port: u16,
    /// Destination or source IPv4 address
    pub ip: [u8; 4],
    /// Application payload
    pub payload: &'a [u8],
    /// Transaction id
    pub frame_id: u8,
    /// Socket the data arrived on
    pub socket_id: u8,
    /// Source port of a received datagram
    pub remote_port: u16,
    /// Status byte carried by receive frames
    pub status: u8,
}

impl<'a> CellularPacket<'a> {
    /// Create an outbound IPv4 datagram
    pub fn new(protocol: Protocol, ip: [u8; 4], port: u16, payload: &'a [u8]) -> Self {
        Self {
            protocol: Some(protocol),
            port,
            ip,
            payload,
            ..Default::default()
        }
    }
}

/// Packet handed to application callbacks, tagged by module family
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Packet<'a> {
    /// From a LoRaWAN module
    LoRaWan(LoRaWanPacket<'a>),
    /// From a cellular module
    Cellular(CellularPacket<'a>),
}
