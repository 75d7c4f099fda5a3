//! Module family drivers
//!
//! This module contains the driver abstraction and its implementations:
//! - [`Driver`]: capability set every module family provides
//! - [`Callbacks`]: application hooks for inbound data and link events
//! - LoRaWAN and cellular drivers, plus the cellular socket API

/// Cellular driver
pub mod cellular;

/// LoRaWAN driver
pub mod lorawan;

/// Cellular socket lifecycle
pub mod socket;

pub use cellular::Cellular;
pub use lorawan::LoRaWan;
pub use socket::{SocketAddress, SocketOption};

use crate::{
    api::frame::Frame,
    device::XBee,
    error::Error,
    packet::Packet,
    port::Port,
};

/// Application callbacks
///
/// Every hook is optional. Callbacks get no access to the device, so they
/// cannot issue requests from inside the dispatch path.
pub trait Callbacks {
    /// Inbound data arrived
    fn on_receive(&mut self, _packet: Packet<'_>) {}

    /// A transmit status arrived for an earlier send
    fn on_send(&mut self, _packet: Packet<'_>) {}

    /// Network join/attach completed
    fn on_connect(&mut self) {}

    /// Network left/detached
    fn on_disconnect(&mut self) {}
}

impl Callbacks for () {}

/// Capability set of a module family
///
/// Operations are associated functions over the owning [`XBee`] so they can
/// use the shared correlator; frame handlers are methods on the driver
/// state and report to the application through [`Callbacks`].
pub trait Driver: Sized {
    /// Outbound packet type accepted by [`Driver::send`]
    type Packet<'a>;

    /// Configuration accepted by [`Driver::configure`]
    type Config;

    /// Open the transport
    fn init<P: Port, C: Callbacks>(
        dev: &mut XBee<P, Self, C>,
        baud_rate: u32,
        device: Option<&str>,
    ) -> Result<(), Error<P::Error>> {
        dev.port_mut().open(baud_rate, device).map_err(Error::Port)
    }

    /// Join or attach to the network
    fn connect<P: Port, C: Callbacks>(
        dev: &mut XBee<P, Self, C>,
        blocking: bool,
    ) -> Result<(), Error<P::Error>>;

    /// Leave or detach from the network
    fn disconnect<P: Port, C: Callbacks>(dev: &mut XBee<P, Self, C>) -> Result<(), Error<P::Error>>;

    /// Send one packet
    fn send<P: Port, C: Callbacks>(
        dev: &mut XBee<P, Self, C>,
        packet: &Self::Packet<'_>,
    ) -> Result<(), Error<P::Error>>;

    /// Software reset
    fn soft_reset<P: Port, C: Callbacks>(dev: &mut XBee<P, Self, C>) -> Result<(), Error<P::Error>>;

    /// Hardware reset through the transport's reset line
    fn hard_reset<P: Port, C: Callbacks>(dev: &mut XBee<P, Self, C>) -> Result<(), Error<P::Error>> {
        match dev.port_mut().hard_reset() {
            Ok(true) => Ok(()),
            Ok(false) => Err(Error::NotSupported),
            Err(e) => Err(Error::Port(e)),
        }
    }

    /// Decode and dispatch at most one frame
    fn process<P: Port, C: Callbacks>(dev: &mut XBee<P, Self, C>) -> Result<Option<u8>, Error<P::Error>> {
        match dev.read_frame() {
            Ok(frame) => {
                dev.dispatch(&frame);
                Ok(Some(frame.frame_type))
            }
            Err(Error::Timeout) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Whether the module is joined or attached
    fn is_connected<P: Port, C: Callbacks>(dev: &mut XBee<P, Self, C>) -> Result<bool, Error<P::Error>>;

    /// Apply configuration
    fn configure<P: Port, C: Callbacks>(
        _dev: &mut XBee<P, Self, C>,
        _config: &Self::Config,
    ) -> Result<(), Error<P::Error>> {
        Err(Error::NotSupported)
    }

    /// Handle an inbound data frame
    fn handle_inbound_data_frame<C: Callbacks>(&mut self, frame: &Frame, _callbacks: &mut C) {
        debug!("inbound frame 0x{:x} ignored", frame.frame_type);
    }

    /// Handle a transmit status frame
    fn handle_delivery_status_frame<C: Callbacks>(&mut self, frame: &Frame, _callbacks: &mut C) {
        debug!("transmit status 0x{:x} ignored", frame.frame_type);
    }
}
