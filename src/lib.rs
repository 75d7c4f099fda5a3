//! XBee API-frame driver in Rust
//!
//! This crate drives Digi XBee radio modules over their binary API frame
//! protocol. It provides the frame codec, a synchronous command/response
//! correlator running over the module's unsolicited frame stream, and
//! drivers for the LoRaWAN and cellular module families behind one generic
//! device type.
//!
//! # Features
//! - Checksummed frame codec with fixed-capacity buffers
//! - AT command requests with transaction-id correlation
//! - LoRaWAN join, uplinks, downlinks and transmit status
//! - Cellular attach, IPv4 datagrams and a socket API
//! - Transport abstraction with an `embedded-hal` serial adapter
//! - `no_std`, no allocator, no unsafe code
//!
//! # Example
//! ```no_run
//! use xbee::{
//!     device::XBee,
//!     module::{Callbacks, LoRaWan},
//!     packet::{LoRaWanPacket, Packet},
//!     port::Port,
//! };
//!
//! struct App;
//!
//! impl Callbacks for App {
//!     fn on_receive(&mut self, packet: Packet<'_>) {
//!         if let Packet::LoRaWan(downlink) = packet {
//!             let _ = downlink.payload;
//!         }
//!     }
//! }
//!
//! fn run<P: Port>(port: P) -> Result<(), xbee::Error<P::Error>>
//! where
//!     P::Error: core::fmt::Debug,
//! {
//!     let mut xbee = XBee::new(port, LoRaWan::new(), App);
//!     xbee.init(9600, None)?;
//!     xbee.connect(true)?;
//!
//!     xbee.send(&LoRaWanPacket::uplink(2, b"Hello, LoRaWAN!", true))?;
//!     loop {
//!         // Line noise surfaces as a framing error; the next call resumes
//!         match xbee.process() {
//!             Err(e) if e.is_transient() => {}
//!             result => {
//!                 result?;
//!             }
//!         }
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![no_std]

#[cfg(feature = "std")]
extern crate std;

#[macro_use]
mod fmt;

/// XBee API frame protocol
pub mod api;

/// Module configuration
pub mod config;

/// High-level device interface
pub mod device;

/// Driver error type
pub mod error;

/// Module family drivers
pub mod module;

/// Application packet views
pub mod packet;

/// Transport abstraction
pub mod port;

pub use device::XBee;
pub use error::{Error, SocketStage};
pub use heapless;
