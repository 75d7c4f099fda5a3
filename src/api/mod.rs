//! XBee API frame protocol
//!
//! This module contains the wire-level pieces shared by every module family:
//! - Frame encoding, decoding and checksums
//! - AT command mnemonics and response parsing
//! - Status codes carried by unsolicited frames

/// AT command table and response views
pub mod commands;

/// Frame codec
pub mod frame;

pub use commands::{AtCommand, AtResponse, DeliveryStatus, ModemStatus};
pub use frame::{decode, encode, Frame, FrameType};
