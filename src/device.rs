//! High-level XBee device interface
//!
//! [`XBee`] owns the transport, the module driver and the application
//! callbacks. It runs the command/response correlator and the frame
//! dispatcher shared by every module family; family-specific behaviour is
//! forwarded to the [`Driver`].

use crate::{
    api::{
        commands::{AtCommand, AtResponse, ModemStatus},
        frame::{self, Frame, FrameType, MAX_PAYLOAD_SIZE},
    },
    error::Error,
    module::{Callbacks, Driver},
    port::Port,
};
use heapless::Vec;

/// Default timeout for AT command responses
pub const DEFAULT_COMMAND_TIMEOUT_MS: u32 = 5000;
/// Timeout for short identity queries (RSSI, hardware version, serial number)
pub const SHORT_COMMAND_TIMEOUT_MS: u32 = 2000;
/// Delay between idle correlator polls
const COMMAND_POLL_DELAY_MS: u32 = 1;

/// AT command frame header: frame id plus the two mnemonic bytes
const AT_HEADER_LEN: usize = 3;

/// XBee device
pub struct XBee<P: Port, D: Driver, C: Callbacks = ()> {
    port: P,
    driver: D,
    callbacks: C,
    /// Next transaction id, never 0
    frame_id: u8,
    last_modem_status: Option<ModemStatus>,
}

impl<P: Port, D: Driver, C: Callbacks> XBee<P, D, C> {
    /// Create new device
    pub fn new(port: P, driver: D, callbacks: C) -> Self {
        Self {
            port,
            driver,
            callbacks,
            frame_id: 1,
            last_modem_status: None,
        }
    }

    /// Open the transport and reset the transaction counter
    pub fn init(&mut self, baud_rate: u32, device: Option<&str>) -> Result<(), Error<P::Error>> {
        self.frame_id = 1;
        self.last_modem_status = None;
        D::init(self, baud_rate, device)
    }

    /// Join or attach to the network
    pub fn connect(&mut self, blocking: bool) -> Result<(), Error<P::Error>> {
        D::connect(self, blocking)
    }

    /// Leave or detach from the network
    pub fn disconnect(&mut self) -> Result<(), Error<P::Error>> {
        D::disconnect(self)
    }

    /// Send a family-specific packet
    pub fn send(&mut self, packet: &D::Packet<'_>) -> Result<(), Error<P::Error>> {
        D::send(self, packet)
    }

    /// Software reset of the module
    pub fn soft_reset(&mut self) -> Result<(), Error<P::Error>> {
        D::soft_reset(self)
    }

    /// Hardware reset of the module
    pub fn hard_reset(&mut self) -> Result<(), Error<P::Error>> {
        D::hard_reset(self)
    }

    /// Process at most one inbound frame
    ///
    /// Returns the type tag of the frame that was dispatched, or `None` if
    /// the read timed out with nothing pending. Call this on a fixed
    /// interval to keep unsolicited events flowing.
    pub fn process(&mut self) -> Result<Option<u8>, Error<P::Error>> {
        D::process(self)
    }

    /// Whether the module reports being joined or attached
    pub fn is_connected(&mut self) -> Result<bool, Error<P::Error>> {
        D::is_connected(self)
    }

    /// Apply family-specific configuration
    pub fn configure(&mut self, config: &D::Config) -> Result<(), Error<P::Error>> {
        D::configure(self, config)
    }

    /// Get transport reference
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Get mutable transport reference
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Get driver reference
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Get mutable driver reference
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Get callbacks reference
    pub fn callbacks(&self) -> &C {
        &self.callbacks
    }

    /// Get mutable callbacks reference
    pub fn callbacks_mut(&mut self) -> &mut C {
        &mut self.callbacks
    }

    /// Last modem status reported by the module
    pub fn last_modem_status(&self) -> Option<ModemStatus> {
        self.last_modem_status
    }

    /// Transaction id the next request will carry
    pub fn peek_frame_id(&self) -> u8 {
        self.frame_id
    }

    /// Tear the device down, giving back its parts
    pub fn release(self) -> (P, D, C) {
        (self.port, self.driver, self.callbacks)
    }

    /// Take the next transaction id
    pub fn next_frame_id(&mut self) -> u8 {
        let id = self.frame_id;
        self.frame_id = self.frame_id.wrapping_add(1);
        if self.frame_id == 0 {
            self.frame_id = 1;
        }
        id
    }

    /// Encode and write one frame
    pub fn send_frame(&mut self, frame_type: FrameType, payload: &[u8]) -> Result<(), Error<P::Error>> {
        let encoded = frame::encode::<P::Error>(frame_type as u8, payload)?;
        let written = self.port.write(&encoded).map_err(Error::Port)?;
        if written != encoded.len() {
            warn!("short write: {} of {} bytes", written, encoded.len());
            return Err(Error::Timeout);
        }
        trace!("sent frame type 0x{:x}, {} bytes", frame_type as u8, payload.len());
        Ok(())
    }

    /// Send an AT command without waiting for its response
    ///
    /// Returns the transaction id the request carried.
    pub fn send_command(&mut self, command: AtCommand, parameter: &[u8]) -> Result<u8, Error<P::Error>> {
        if parameter.len() > MAX_PAYLOAD_SIZE - AT_HEADER_LEN {
            return Err(Error::PayloadTooLarge);
        }

        let frame_id = self.next_frame_id();
        let mnemonic = command.mnemonic();

        let mut payload: Vec<u8, MAX_PAYLOAD_SIZE> = Vec::new();
        payload.push(frame_id).map_err(|_| Error::PayloadTooLarge)?;
        payload
            .extend_from_slice(&mnemonic)
            .map_err(|_| Error::PayloadTooLarge)?;
        payload
            .extend_from_slice(parameter)
            .map_err(|_| Error::PayloadTooLarge)?;

        debug!("AT{:?} sent with frame id {}", command, frame_id);
        self.send_frame(FrameType::AtCommand, &payload)?;
        Ok(frame_id)
    }

    /// Send an AT command and wait for its response
    ///
    /// Frames other than the response to this request are dispatched while
    /// waiting. On success the result bytes are copied into `response` and
    /// their count is returned.
    pub fn send_command_and_wait(
        &mut self,
        command: AtCommand,
        parameter: &[u8],
        response: &mut [u8],
        timeout_ms: u32,
    ) -> Result<usize, Error<P::Error>> {
        let frame_id = self.send_command(command, parameter)?;
        let start = self.port.millis();

        loop {
            if let Some(frame) = self.receive_frame()? {
                match AtResponse::from_bytes(frame.payload()) {
                    Some(reply) if frame.is(FrameType::AtResponse) && reply.frame_id == frame_id => {
                        if reply.status != 0 {
                            warn!("AT{:?} rejected with status {}", command, reply.status);
                            return Err(Error::CommandRejected(reply.status));
                        }
                        let dest = response
                            .get_mut(..reply.data.len())
                            .ok_or(Error::BufferTooSmall)?;
                        dest.copy_from_slice(reply.data);
                        return Ok(reply.data.len());
                    }
                    _ => self.dispatch(&frame),
                }
            }

            if self.port.millis().wrapping_sub(start) >= timeout_ms {
                warn!("AT{:?} timed out after {} ms", command, timeout_ms);
                return Err(Error::ResponseTimeout);
            }
            self.port.delay_ms(COMMAND_POLL_DELAY_MS);
        }
    }

    /// Decode one frame, reporting every failure
    pub fn read_frame(&mut self) -> Result<Frame, Error<P::Error>> {
        frame::decode(&mut self.port)
    }

    /// Decode one frame, treating framing failures as "nothing yet"
    pub(crate) fn receive_frame(&mut self) -> Result<Option<Frame>, Error<P::Error>> {
        match self.read_frame() {
            Ok(frame) => Ok(Some(frame)),
            Err(e) if e.is_transient() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Route a decoded frame to its handler
    pub fn dispatch(&mut self, frame: &Frame) {
        match frame.kind() {
            Some(FrameType::AtResponse) => match AtResponse::from_bytes(frame.payload()) {
                Some(reply) => debug!(
                    "AT response {}{} id {} status {} ({} bytes)",
                    reply.command[0] as char,
                    reply.command[1] as char,
                    reply.frame_id,
                    reply.status,
                    reply.data.len()
                ),
                None => warn!("truncated AT response"),
            },
            Some(FrameType::ModemStatus) => match frame.payload().first() {
                Some(&code) => {
                    let status = ModemStatus::from(code);
                    info!("modem status {:?}", status);
                    self.last_modem_status = Some(status);
                }
                None => warn!("empty modem status"),
            },
            Some(FrameType::SocketStatus) => match frame.payload() {
                [socket, status, ..] => {
                    debug!("socket {} status 0x{:x}", socket, status)
                }
                _ => warn!("truncated socket status"),
            },
            Some(FrameType::TxStatus) => {
                self.driver
                    .handle_delivery_status_frame(frame, &mut self.callbacks);
            }
            Some(kind) if kind.is_inbound_data() => {
                self.driver
                    .handle_inbound_data_frame(frame, &mut self.callbacks);
            }
            _ => warn!("unhandled frame type 0x{:x}", frame.frame_type),
        }
    }

    /// Query a fixed-size register
    fn query<const N: usize>(&mut self, command: AtCommand, timeout_ms: u32) -> Result<[u8; N], Error<P::Error>> {
        let mut buffer = [0u8; N];
        let len = self.send_command_and_wait(command, &[], &mut buffer, timeout_ms)?;
        if len != N {
            return Err(Error::UnexpectedResponse);
        }
        Ok(buffer)
    }

    /// Set a register, discarding any result bytes
    pub(crate) fn set(&mut self, command: AtCommand, parameter: &[u8]) -> Result<(), Error<P::Error>> {
        let mut scratch = [0u8; 8];
        self.send_command_and_wait(command, parameter, &mut scratch, DEFAULT_COMMAND_TIMEOUT_MS)?;
        Ok(())
    }

    /// Query the association indicator
    pub(crate) fn association_indication(&mut self) -> Result<u8, Error<P::Error>> {
        let [ai] = self.query::<1>(AtCommand::AI, DEFAULT_COMMAND_TIMEOUT_MS)?;
        Ok(ai)
    }

    /// Firmware version
    pub fn firmware_version(&mut self) -> Result<u32, Error<P::Error>> {
        let bytes = self.query::<4>(AtCommand::VR, DEFAULT_COMMAND_TIMEOUT_MS)?;
        Ok(u32::from_be_bytes(bytes))
    }

    /// Hardware version
    pub fn hardware_version(&mut self) -> Result<u16, Error<P::Error>> {
        let bytes = self.query::<2>(AtCommand::HV, SHORT_COMMAND_TIMEOUT_MS)?;
        Ok(u16::from_be_bytes(bytes))
    }

    /// 64-bit serial number (`SH` high word, `SL` low word)
    pub fn serial_number(&mut self) -> Result<u64, Error<P::Error>> {
        let high = self.query::<4>(AtCommand::SH, SHORT_COMMAND_TIMEOUT_MS)?;
        let low = self.query::<4>(AtCommand::SL, SHORT_COMMAND_TIMEOUT_MS)?;
        Ok((u32::from_be_bytes(high) as u64) << 32 | u32::from_be_bytes(low) as u64)
    }

    /// RSSI of the last received packet in dBm
    pub fn last_rssi(&mut self) -> Result<i16, Error<P::Error>> {
        let [magnitude] = self.query::<1>(AtCommand::DB, SHORT_COMMAND_TIMEOUT_MS)?;
        Ok(-(magnitude as i16))
    }

    /// Write the active configuration to non-volatile memory
    pub fn write_config(&mut self) -> Result<(), Error<P::Error>> {
        self.set(AtCommand::WR, &[])
    }

    /// Apply pending configuration changes
    pub fn apply_changes(&mut self) -> Result<(), Error<P::Error>> {
        self.set(AtCommand::AC, &[])
    }

    /// Set the API options byte
    pub fn set_api_options(&mut self, options: u8) -> Result<(), Error<P::Error>> {
        self.set(AtCommand::AO, &[options])
    }

    /// Restore factory defaults
    pub fn factory_reset(&mut self) -> Result<(), Error<P::Error>> {
        self.set(AtCommand::FR, &[])
    }

    /// Leave command mode
    pub fn exit_command_mode(&mut self) -> Result<(), Error<P::Error>> {
        self.set(AtCommand::CN, &[])
    }

    /// Set the API enable mode (1 = API, 2 = API with escaping)
    pub fn set_api_enable(&mut self, mode: u8) -> Result<(), Error<P::Error>> {
        self.set(AtCommand::AP, &[mode])
    }

    /// Set the serial baud rate index
    pub fn set_baud_rate(&mut self, rate: u8) -> Result<(), Error<P::Error>> {
        self.set(AtCommand::BD, &[rate])
    }
}
