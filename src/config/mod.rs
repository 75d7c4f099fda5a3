//! Module configuration
//!
//! This module contains the configuration types handed to the drivers:
//! - Cellular network settings (APN, SIM PIN, carrier profile)
//! - LoRaWAN identifiers and keys used for provisioning
//! - LoRaWAN device class

/// Configuration types
pub mod device;

pub use device::{AESKey, CellularConfig, DeviceClass, EUI64};
