//! Cellular module driver
//!
//! Applies SIM/APN/carrier settings, polls the association indicator until
//! the module attaches, and sends stateless IPv4 datagrams. The socket API
//! lives in [`crate::module::socket`].

use heapless::Vec;

use crate::{
    api::{
        commands::AtCommand,
        frame::{Frame, FrameType, MAX_PAYLOAD_SIZE},
    },
    config::device::CellularConfig,
    device::XBee,
    error::Error,
    module::{Callbacks, Driver},
    packet::{CellularPacket, Packet, Protocol},
    port::Port,
};

/// Largest datagram payload the module accepts in one frame
pub const MAX_CELLULAR_PAYLOAD: usize = 120;
/// Default number of attach status polls
pub const DEFAULT_ATTACH_ATTEMPTS: u16 = 60;
/// Default delay between attach status polls
pub const DEFAULT_ATTACH_POLL_INTERVAL_MS: u32 = 1000;

/// Association indicator value once attached
const AI_ATTACHED: u8 = 0;
/// Socket receive header: `[frame id][socket][status]`
const SOCKET_RX_HEADER_LEN: usize = 3;
/// Socket receive-from header: `[frame id][socket][ip x4][port x2][status]`
const SOCKET_RX_FROM_HEADER_LEN: usize = 9;
/// IPv4 receive header: `[ip x4][local port x2][remote port x2][protocol][status]`
const RX_IPV4_HEADER_LEN: usize = 10;

/// Cellular driver state
#[derive(Debug, Clone, PartialEq)]
pub struct Cellular {
    config: CellularConfig,
    attach_attempts: u16,
    attach_poll_interval_ms: u32,
}

impl Default for Cellular {
    fn default() -> Self {
        Self::new(CellularConfig::default())
    }
}

impl Cellular {
    /// Create new driver with the given network configuration
    pub fn new(config: CellularConfig) -> Self {
        Self {
            config,
            attach_attempts: DEFAULT_ATTACH_ATTEMPTS,
            attach_poll_interval_ms: DEFAULT_ATTACH_POLL_INTERVAL_MS,
        }
    }

    /// Set the number of attach status polls
    pub fn attach_attempts(mut self, attempts: u16) -> Self {
        self.attach_attempts = attempts;
        self
    }

    /// Set the delay between attach status polls
    pub fn attach_poll_interval(mut self, interval_ms: u32) -> Self {
        self.attach_poll_interval_ms = interval_ms;
        self
    }

    /// Current network configuration
    pub fn config(&self) -> &CellularConfig {
        &self.config
    }
}

impl Driver for Cellular {
    type Packet<'a> = CellularPacket<'a>;
    type Config = CellularConfig;

    fn connect<P: Port, C: Callbacks>(
        dev: &mut XBee<P, Self, C>,
        blocking: bool,
    ) -> Result<(), Error<P::Error>> {
        info!("applying cellular configuration");
        let config = dev.driver().config.clone();
        if !config.sim_pin.is_empty() {
            dev.send_command(AtCommand::PN, config.sim_pin.as_bytes())?;
        }
        if !config.apn.is_empty() {
            dev.send_command(AtCommand::AN, config.apn.as_bytes())?;
        }
        if !config.carrier.is_empty() {
            dev.send_command(AtCommand::CP, config.carrier.as_bytes())?;
        }

        if !blocking {
            return Ok(());
        }

        let (attempts, interval) = (dev.driver().attach_attempts, dev.driver().attach_poll_interval_ms);
        for _ in 0..attempts {
            match Self::is_connected(dev) {
                Ok(true) => {
                    info!("attached to cellular network");
                    dev.callbacks_mut().on_connect();
                    return Ok(());
                }
                Ok(false) => {}
                Err(e) if matches!(e, Error::ResponseTimeout) || e.is_transient() => {}
                Err(e) => return Err(e),
            }
            dev.port_mut().delay_ms(interval);
        }

        warn!("network attach failed after {} polls", attempts);
        Err(Error::ConnectFailed)
    }

    fn disconnect<P: Port, C: Callbacks>(dev: &mut XBee<P, Self, C>) -> Result<(), Error<P::Error>> {
        dev.send_command(AtCommand::SD, &[])?;
        dev.callbacks_mut().on_disconnect();
        Ok(())
    }

    fn send<P: Port, C: Callbacks>(
        dev: &mut XBee<P, Self, C>,
        packet: &CellularPacket<'_>,
    ) -> Result<(), Error<P::Error>> {
        if packet.payload.len() > MAX_CELLULAR_PAYLOAD {
            return Err(Error::PayloadTooLarge);
        }
        let protocol = packet.protocol.ok_or(Error::InvalidParameter)?;

        let frame_id = dev.next_frame_id();
        let mut payload: Vec<u8, MAX_PAYLOAD_SIZE> = Vec::new();
        payload
            .extend_from_slice(&[frame_id, protocol as u8])
            .map_err(|_| Error::PayloadTooLarge)?;
        payload
            .extend_from_slice(&packet.port.to_be_bytes())
            .map_err(|_| Error::PayloadTooLarge)?;
        payload
            .extend_from_slice(&packet.ip)
            .map_err(|_| Error::PayloadTooLarge)?;
        payload
            .extend_from_slice(packet.payload)
            .map_err(|_| Error::PayloadTooLarge)?;

        debug!("datagram {} to port {}, {} bytes", frame_id, packet.port, packet.payload.len());
        dev.send_frame(FrameType::CellularTxIpv4, &payload)
    }

    fn soft_reset<P: Port, C: Callbacks>(dev: &mut XBee<P, Self, C>) -> Result<(), Error<P::Error>> {
        dev.send_command(AtCommand::SD, &[]).map(|_| ())
    }

    fn is_connected<P: Port, C: Callbacks>(dev: &mut XBee<P, Self, C>) -> Result<bool, Error<P::Error>> {
        Ok(dev.association_indication()? == AI_ATTACHED)
    }

    fn configure<P: Port, C: Callbacks>(
        dev: &mut XBee<P, Self, C>,
        config: &CellularConfig,
    ) -> Result<(), Error<P::Error>> {
        dev.driver_mut().config = config.clone();
        Ok(())
    }

    fn handle_inbound_data_frame<C: Callbacks>(&mut self, frame: &Frame, callbacks: &mut C) {
        let packet = match frame.kind() {
            Some(FrameType::SocketReceive) => parse_socket_rx(frame.payload()),
            Some(FrameType::SocketReceiveFrom) => parse_socket_rx_from(frame.payload()),
            Some(FrameType::CellularRxIpv4) => parse_rx_ipv4(frame.payload()),
            _ => None,
        };

        match packet {
            Some(packet) => {
                debug!(
                    "socket {} received {} bytes (status 0x{:x})",
                    packet.socket_id,
                    packet.payload.len(),
                    packet.status
                );
                callbacks.on_receive(Packet::Cellular(packet));
            }
            None => warn!("malformed socket receive frame 0x{:x}", frame.frame_type),
        }
    }
}

/// Parse a `0xCD` payload: `[frame id][socket][status][data...]`
fn parse_socket_rx(payload: &[u8]) -> Option<CellularPacket<'_>> {
    if payload.len() < SOCKET_RX_HEADER_LEN {
        return None;
    }
    Some(CellularPacket {
        frame_id: payload[0],
        socket_id: payload[1],
        status: payload[2],
        payload: &payload[SOCKET_RX_HEADER_LEN..],
        ..Default::default()
    })
}

/// Parse a `0xCE` payload: `[frame id][socket][ip x4][port x2][status][data...]`
fn parse_socket_rx_from(payload: &[u8]) -> Option<CellularPacket<'_>> {
    if payload.len() < SOCKET_RX_FROM_HEADER_LEN {
        return None;
    }
    let remote_port = u16::from_be_bytes([payload[6], payload[7]]);
    Some(CellularPacket {
        frame_id: payload[0],
        socket_id: payload[1],
        ip: [payload[2], payload[3], payload[4], payload[5]],
        port: remote_port,
        remote_port,
        status: payload[8],
        payload: &payload[SOCKET_RX_FROM_HEADER_LEN..],
        ..Default::default()
    })
}

/// Parse a `0xB0` payload:
/// `[ip x4][local port x2][remote port x2][protocol][status][data...]`
fn parse_rx_ipv4(payload: &[u8]) -> Option<CellularPacket<'_>> {
    if payload.len() < RX_IPV4_HEADER_LEN {
        return None;
    }
    Some(CellularPacket {
        ip: [payload[0], payload[1], payload[2], payload[3]],
        port: u16::from_be_bytes([payload[4], payload[5]]),
        remote_port: u16::from_be_bytes([payload[6], payload[7]]),
        protocol: Protocol::from_u8(payload[8]),
        status: payload[9],
        payload: &payload[RX_IPV4_HEADER_LEN..],
        ..Default::default()
    })
}
