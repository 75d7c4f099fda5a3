//! LoRaWAN module driver
//!
//! Joins through the module's `JN` command and polls the association
//! indicator. Uplinks go out as LoRaWAN transmit requests; downlinks and
//! transmit status frames are reported through [`Callbacks`].

use heapless::Vec;

use crate::{
    api::{
        commands::{AtCommand, DeliveryStatus},
        frame::{Frame, FrameType, MAX_PAYLOAD_SIZE},
    },
    config::device::{AESKey, DeviceClass, EUI64},
    device::{XBee, DEFAULT_COMMAND_TIMEOUT_MS},
    error::Error,
    module::{Callbacks, Driver},
    packet::{LoRaWanPacket, Packet},
    port::Port,
};

/// Largest uplink payload the module accepts
pub const MAX_UPLINK_PAYLOAD: usize = 242;
/// Default number of join status polls
pub const DEFAULT_JOIN_ATTEMPTS: u16 = 20;
/// Default delay between join status polls
pub const DEFAULT_JOIN_POLL_INTERVAL_MS: u32 = 500;

/// Association indicator value once joined
const AI_JOINED: u8 = 1;
/// Length of the explicit downlink header before the payload
const EXPLICIT_RX_HEADER_LEN: usize = 12;
/// Transmit option requesting a confirmed uplink
const TX_OPTION_ACK: u8 = 0x01;
/// Delay between idle polls while waiting for a transmit status
const STATUS_POLL_DELAY_MS: u32 = 1;

/// LoRaWAN driver state
#[derive(Debug, Clone, PartialEq)]
pub struct LoRaWan {
    join_attempts: u16,
    join_poll_interval_ms: u32,
    last_tx_status: Option<(u8, DeliveryStatus)>,
}

impl Default for LoRaWan {
    fn default() -> Self {
        Self::new()
    }
}

impl LoRaWan {
    /// Create new driver with default join polling
    pub fn new() -> Self {
        Self {
            join_attempts: DEFAULT_JOIN_ATTEMPTS,
            join_poll_interval_ms: DEFAULT_JOIN_POLL_INTERVAL_MS,
            last_tx_status: None,
        }
    }

    /// Set the number of join status polls
    pub fn join_attempts(mut self, attempts: u16) -> Self {
        self.join_attempts = attempts;
        self
    }

    /// Set the delay between join status polls
    pub fn join_poll_interval(mut self, interval_ms: u32) -> Self {
        self.join_poll_interval_ms = interval_ms;
        self
    }

    /// Frame id and outcome of the last transmit status received
    pub fn last_tx_status(&self) -> Option<(u8, DeliveryStatus)> {
        self.last_tx_status
    }
}

impl Driver for LoRaWan {
    type Packet<'a> = LoRaWanPacket<'a>;
    type Config = ();

    fn connect<P: Port, C: Callbacks>(
        dev: &mut XBee<P, Self, C>,
        blocking: bool,
    ) -> Result<(), Error<P::Error>> {
        if Self::is_connected(dev)? {
            debug!("already joined");
            dev.callbacks_mut().on_connect();
            return Ok(());
        }

        info!("joining network");
        dev.send_command(AtCommand::JN, &[])?;
        if !blocking {
            return Ok(());
        }

        let (attempts, interval) = (dev.driver().join_attempts, dev.driver().join_poll_interval_ms);
        for _ in 0..attempts {
            dev.port_mut().delay_ms(interval);
            // Polls that go unanswered while the join is in progress are retried
            match Self::is_connected(dev) {
                Ok(true) => {
                    info!("joined");
                    dev.callbacks_mut().on_connect();
                    return Ok(());
                }
                Ok(false) => {}
                Err(e) if matches!(e, Error::ResponseTimeout) || e.is_transient() => {}
                Err(e) => return Err(e),
            }
        }

        warn!("join did not complete after {} polls", attempts);
        Err(Error::ConnectFailed)
    }

    fn disconnect<P: Port, C: Callbacks>(dev: &mut XBee<P, Self, C>) -> Result<(), Error<P::Error>> {
        // The module keeps its session; leaving is local only
        debug!("disconnected");
        dev.callbacks_mut().on_disconnect();
        Ok(())
    }

    fn send<P: Port, C: Callbacks>(
        dev: &mut XBee<P, Self, C>,
        packet: &LoRaWanPacket<'_>,
    ) -> Result<(), Error<P::Error>> {
        send_uplink(dev, packet).map(|_| ())
    }

    fn soft_reset<P: Port, C: Callbacks>(dev: &mut XBee<P, Self, C>) -> Result<(), Error<P::Error>> {
        dev.send_command(AtCommand::RE, &[]).map(|_| ())
    }

    fn is_connected<P: Port, C: Callbacks>(dev: &mut XBee<P, Self, C>) -> Result<bool, Error<P::Error>> {
        Ok(dev.association_indication()? == AI_JOINED)
    }

    fn handle_inbound_data_frame<C: Callbacks>(&mut self, frame: &Frame, callbacks: &mut C) {
        let packet = match frame.kind() {
            Some(FrameType::LrRxPacket) => parse_rx(frame.payload()),
            Some(FrameType::LrExplicitRxPacket) => parse_explicit_rx(frame.payload()),
            _ => None,
        };

        match packet {
            Some(packet) => {
                debug!("downlink on port {}, {} bytes", packet.port, packet.payload.len());
                callbacks.on_receive(Packet::LoRaWan(packet));
            }
            None => warn!("malformed downlink frame 0x{:x}", frame.frame_type),
        }
    }

    fn handle_delivery_status_frame<C: Callbacks>(&mut self, frame: &Frame, callbacks: &mut C) {
        let (frame_id, status) = match frame.payload() {
            [frame_id, status, ..] => (*frame_id, *status),
            _ => {
                warn!("truncated transmit status");
                return;
            }
        };

        let delivery = DeliveryStatus::from(status);
        match delivery {
            DeliveryStatus::Success => debug!("uplink {} delivered", frame_id),
            _ => warn!("uplink {} failed: {:?}", frame_id, delivery),
        }
        self.last_tx_status = Some((frame_id, delivery));

        callbacks.on_send(Packet::LoRaWan(LoRaWanPacket {
            frame_id,
            status,
            ..Default::default()
        }));
    }
}

/// Parse a `0xD0` payload: `[port][data...]`
fn parse_rx(payload: &[u8]) -> Option<LoRaWanPacket<'_>> {
    let (&port, data) = payload.split_first()?;
    Some(LoRaWanPacket {
        port,
        payload: data,
        ..Default::default()
    })
}

/// Parse a `0xD1` payload:
/// `[port][rssi][snr][dr][counter x4][frequency x4][data...]`
fn parse_explicit_rx(payload: &[u8]) -> Option<LoRaWanPacket<'_>> {
    if payload.len() < EXPLICIT_RX_HEADER_LEN {
        return None;
    }
    let (header, data) = payload.split_at(EXPLICIT_RX_HEADER_LEN);
    Some(LoRaWanPacket {
        port: header[0],
        rssi: header[1] as i8,
        snr: header[2] as i8,
        data_rate: header[3],
        counter: u32::from_be_bytes([header[4], header[5], header[6], header[7]]),
        frequency: u32::from_be_bytes([header[8], header[9], header[10], header[11]]),
        payload: data,
        ..Default::default()
    })
}

/// Build and write an uplink, returning its frame id
fn send_uplink<P: Port, C: Callbacks>(
    dev: &mut XBee<P, LoRaWan, C>,
    packet: &LoRaWanPacket<'_>,
) -> Result<u8, Error<P::Error>> {
    if packet.payload.is_empty() {
        return Err(Error::InvalidParameter);
    }
    if packet.payload.len() > MAX_UPLINK_PAYLOAD {
        return Err(Error::PayloadTooLarge);
    }

    let frame_id = dev.next_frame_id();
    let options = if packet.ack { TX_OPTION_ACK } else { 0 };

    let mut payload: Vec<u8, MAX_PAYLOAD_SIZE> = Vec::new();
    payload
        .extend_from_slice(&[frame_id, packet.port, options])
        .map_err(|_| Error::PayloadTooLarge)?;
    payload
        .extend_from_slice(packet.payload)
        .map_err(|_| Error::PayloadTooLarge)?;

    debug!("uplink {} on port {}, {} bytes", frame_id, packet.port, packet.payload.len());
    dev.send_frame(FrameType::LrTxRequest, &payload)?;
    Ok(frame_id)
}

impl<P: Port, C: Callbacks> XBee<P, LoRaWan, C> {
    /// Send an uplink and wait for its transmit status
    ///
    /// Other frames are dispatched while waiting. The status also reaches
    /// [`Callbacks::on_send`].
    pub fn send_and_wait_status(
        &mut self,
        packet: &LoRaWanPacket<'_>,
        timeout_ms: u32,
    ) -> Result<DeliveryStatus, Error<P::Error>> {
        let frame_id = send_uplink(self, packet)?;
        let start = self.port_mut().millis();

        loop {
            if let Some(frame) = self.receive_frame()? {
                let ours = frame.is(FrameType::TxStatus) && frame.payload().first() == Some(&frame_id);
                self.dispatch(&frame);
                // A truncated status leaves the previous uplink's outcome in place
                match self.driver().last_tx_status() {
                    Some((id, status)) if ours && id == frame_id => return Ok(status),
                    _ => {}
                }
            }

            if self.port_mut().millis().wrapping_sub(start) >= timeout_ms {
                warn!("no transmit status for uplink {}", frame_id);
                return Err(Error::ResponseTimeout);
            }
            self.port_mut().delay_ms(STATUS_POLL_DELAY_MS);
        }
    }

    /// Device EUI
    pub fn dev_eui(&mut self) -> Result<EUI64, Error<P::Error>> {
        let mut eui = [0u8; 8];
        let len = self.send_command_and_wait(AtCommand::DE, &[], &mut eui, DEFAULT_COMMAND_TIMEOUT_MS)?;
        if len != eui.len() {
            return Err(Error::UnexpectedResponse);
        }
        Ok(eui)
    }

    /// Set the application (join) EUI
    pub fn set_app_eui(&mut self, app_eui: &EUI64) -> Result<(), Error<P::Error>> {
        self.set(AtCommand::AE, app_eui)
    }

    /// Set the application key
    pub fn set_app_key(&mut self, app_key: &AESKey) -> Result<(), Error<P::Error>> {
        self.set(AtCommand::AK, app_key)
    }

    /// Set the network key
    pub fn set_nwk_key(&mut self, nwk_key: &AESKey) -> Result<(), Error<P::Error>> {
        self.set(AtCommand::NK, nwk_key)
    }

    /// Set the LoRaWAN device class
    pub fn set_class(&mut self, class: DeviceClass) -> Result<(), Error<P::Error>> {
        self.set(AtCommand::LC, &[class.as_byte()])
    }

    /// Set the join accept RX1 delay in milliseconds
    pub fn set_join_rx1_delay(&mut self, delay_ms: u16) -> Result<(), Error<P::Error>> {
        self.set(AtCommand::J1, &delay_ms.to_be_bytes())
    }

    /// Set the RX2 window frequency in Hz
    pub fn set_rx2_frequency(&mut self, frequency: u32) -> Result<(), Error<P::Error>> {
        self.set(AtCommand::XF, &frequency.to_be_bytes())
    }
}
