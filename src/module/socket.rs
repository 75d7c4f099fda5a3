//! Cellular socket lifecycle
//!
//! Sockets live on the module and are referenced by the id it assigns. No
//! socket table is kept here: every operation is a request frame followed,
//! where the module confirms it, by a correlated wait.
//!
//! Socket waits are strict: the first frame of the awaited type decides the
//! outcome, and one that names another request or socket is a failure.
//! Frames of any other type are dispatched as usual.

use heapless::Vec;

use crate::{
    api::frame::{Frame, FrameType, MAX_PAYLOAD_SIZE},
    device::XBee,
    error::{Error, SocketStage},
    module::{cellular::MAX_CELLULAR_PAYLOAD, Callbacks, Cellular},
    packet::Protocol,
    port::Port,
};

/// Timeout for create, connect, bind and close confirmations
pub const SOCKET_RESPONSE_TIMEOUT_MS: u32 = 3000;
/// Timeout for the connected status after a connect response
pub const SOCKET_CONNECT_TIMEOUT_MS: u32 = 20000;
/// Delay between idle socket polls
const SOCKET_POLL_DELAY_MS: u32 = 10;

/// Socket status: connected
const STATUS_CONNECTED: u8 = 0x00;
/// Socket status: closed
const STATUS_CLOSED: u8 = 0x01;

/// Remote endpoint of a socket connect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketAddress<'a> {
    /// IPv4 address
    Ipv4([u8; 4]),
    /// Hostname resolved by the module
    Host(&'a str),
}

impl SocketAddress<'_> {
    fn kind(&self) -> u8 {
        match self {
            SocketAddress::Ipv4(_) => 0x00,
            SocketAddress::Host(_) => 0x01,
        }
    }

    fn as_bytes(&self) -> &[u8] {
        match self {
            SocketAddress::Ipv4(ip) => ip,
            SocketAddress::Host(host) => host.as_bytes(),
        }
    }
}

/// Socket option identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SocketOption {
    /// Local port to bind
    BindPort = 0x00,
    /// Listen for inbound connections
    Listen = 0x01,
    /// TCP keepalive
    KeepAlive = 0x02,
}

/// Collect frame parts into one payload
fn build(parts: &[&[u8]]) -> Option<Vec<u8, MAX_PAYLOAD_SIZE>> {
    let mut payload = Vec::new();
    for part in parts {
        payload.extend_from_slice(part).ok()?;
    }
    Some(payload)
}

/// Check `[frame id][socket][status]` of a socket response
fn check_response<E>(
    frame: &Frame,
    frame_id: u8,
    socket: Option<u8>,
    stage: SocketStage,
) -> Result<u8, Error<E>> {
    let (id, assigned, status) = match frame.payload() {
        &[id, assigned, status, ..] => (id, assigned, status),
        _ => return Err(Error::SocketMismatch(stage)),
    };
    if id != frame_id || socket.map_or(false, |s| s != assigned) {
        warn!("socket {:?}: response for request {} socket {}", stage, id, assigned);
        return Err(Error::SocketMismatch(stage));
    }
    if status != 0 {
        warn!("socket {:?} failed with status 0x{:x}", stage, status);
        return Err(Error::SocketRejected { stage, status });
    }
    Ok(assigned)
}

/// Check `[socket][status]` of a socket status frame
fn check_status<E>(frame: &Frame, socket: u8, expected: u8, stage: SocketStage) -> Result<(), Error<E>> {
    let (id, status) = match frame.payload() {
        &[id, status, ..] => (id, status),
        _ => return Err(Error::SocketMismatch(stage)),
    };
    if id != socket {
        warn!("socket {:?}: status for socket {}", stage, id);
        return Err(Error::SocketMismatch(stage));
    }
    if status != expected {
        warn!("socket {:?}: unexpected status 0x{:x}", stage, status);
        return Err(Error::SocketRejected { stage, status });
    }
    Ok(())
}

impl<P: Port, C: Callbacks> XBee<P, Cellular, C> {
    /// Wait for the first frame of `expected` type, dispatching others
    fn wait_socket_frame(
        &mut self,
        expected: FrameType,
        stage: SocketStage,
        timeout_ms: u32,
    ) -> Result<Frame, Error<P::Error>> {
        let start = self.port_mut().millis();
        loop {
            if let Some(frame) = self.receive_frame()? {
                if frame.is(expected) {
                    return Ok(frame);
                }
                self.dispatch(&frame);
            }

            if self.port_mut().millis().wrapping_sub(start) >= timeout_ms {
                warn!("socket {:?} timed out", stage);
                return Err(Error::SocketTimeout(stage));
            }
            self.port_mut().delay_ms(SOCKET_POLL_DELAY_MS);
        }
    }

    /// Create a socket, returning the id the module assigned
    pub fn socket_create(&mut self, protocol: Protocol) -> Result<u8, Error<P::Error>> {
        let frame_id = self.next_frame_id();
        self.send_frame(FrameType::SocketCreate, &[frame_id, protocol as u8])?;

        let frame = self.wait_socket_frame(
            FrameType::SocketCreateResponse,
            SocketStage::Create,
            SOCKET_RESPONSE_TIMEOUT_MS,
        )?;
        let socket = check_response(&frame, frame_id, None, SocketStage::Create)?;
        info!("socket {} created", socket);
        Ok(socket)
    }

    /// Connect a socket to a remote endpoint
    ///
    /// Succeeds only once the module has accepted the request and then
    /// reported the socket as connected.
    pub fn socket_connect(
        &mut self,
        socket: u8,
        address: SocketAddress<'_>,
        port: u16,
    ) -> Result<(), Error<P::Error>> {
        if address.as_bytes().is_empty() {
            return Err(Error::InvalidParameter);
        }

        let frame_id = self.next_frame_id();
        let payload = build(&[
            &[frame_id, socket],
            &port.to_be_bytes(),
            &[address.kind()],
            address.as_bytes(),
        ])
        .ok_or(Error::PayloadTooLarge)?;
        self.send_frame(FrameType::SocketConnect, &payload)?;

        let frame = self.wait_socket_frame(
            FrameType::SocketConnectResponse,
            SocketStage::ConnectResponse,
            SOCKET_RESPONSE_TIMEOUT_MS,
        )?;
        check_response(&frame, frame_id, Some(socket), SocketStage::ConnectResponse)?;
        debug!("socket {} connect accepted", socket);

        let frame = self.wait_socket_frame(
            FrameType::SocketStatus,
            SocketStage::ConnectStatus,
            SOCKET_CONNECT_TIMEOUT_MS,
        )?;
        check_status(&frame, socket, STATUS_CONNECTED, SocketStage::ConnectStatus)?;
        info!("socket {} connected", socket);
        Ok(())
    }

    /// Bind a socket to a local port
    pub fn socket_bind(&mut self, socket: u8, port: u16, blocking: bool) -> Result<(), Error<P::Error>> {
        let frame_id = self.next_frame_id();
        let [hi, lo] = port.to_be_bytes();
        self.send_frame(FrameType::SocketBind, &[frame_id, socket, hi, lo])?;
        if !blocking {
            return Ok(());
        }

        let frame = self.wait_socket_frame(
            FrameType::SocketBindResponse,
            SocketStage::Bind,
            SOCKET_RESPONSE_TIMEOUT_MS,
        )?;
        check_response(&frame, frame_id, Some(socket), SocketStage::Bind)?;
        debug!("socket {} bound to port {}", socket, port);
        Ok(())
    }

    /// Send data on a connected socket
    pub fn socket_send(&mut self, socket: u8, data: &[u8]) -> Result<(), Error<P::Error>> {
        check_payload(data)?;
        let frame_id = self.next_frame_id();
        let payload = build(&[&[frame_id, socket, 0x00], data]).ok_or(Error::PayloadTooLarge)?;
        self.send_frame(FrameType::SocketSend, &payload)
    }

    /// Send a datagram to an explicit endpoint
    pub fn socket_send_to(
        &mut self,
        socket: u8,
        ip: [u8; 4],
        port: u16,
        data: &[u8],
    ) -> Result<(), Error<P::Error>> {
        check_payload(data)?;
        let frame_id = self.next_frame_id();
        let payload = build(&[&[frame_id, socket], &ip, &port.to_be_bytes(), &[0x00], data])
            .ok_or(Error::PayloadTooLarge)?;
        self.send_frame(FrameType::SocketSendTo, &payload)
    }

    /// Close a socket
    pub fn socket_close(&mut self, socket: u8, blocking: bool) -> Result<(), Error<P::Error>> {
        let frame_id = self.next_frame_id();
        self.send_frame(FrameType::SocketClose, &[frame_id, socket])?;
        if !blocking {
            return Ok(());
        }

        let frame = self.wait_socket_frame(
            FrameType::SocketStatus,
            SocketStage::Close,
            SOCKET_RESPONSE_TIMEOUT_MS,
        )?;
        check_status(&frame, socket, STATUS_CLOSED, SocketStage::Close)?;
        info!("socket {} closed", socket);
        Ok(())
    }

    /// Set a socket option
    pub fn socket_set_option(
        &mut self,
        socket: u8,
        option: SocketOption,
        value: &[u8],
    ) -> Result<(), Error<P::Error>> {
        if value.is_empty() {
            return Err(Error::InvalidParameter);
        }
        let frame_id = self.next_frame_id();
        let payload = build(&[&[frame_id, socket, option as u8], value]).ok_or(Error::PayloadTooLarge)?;
        self.send_frame(FrameType::SocketOption, &payload)
    }
}

fn check_payload<E>(data: &[u8]) -> Result<(), Error<E>> {
    if data.is_empty() {
        return Err(Error::InvalidParameter);
    }
    if data.len() > MAX_CELLULAR_PAYLOAD {
        return Err(Error::PayloadTooLarge);
    }
    Ok(())
}
