use heapless::String;

/// EUI-64 (8 bytes)
pub type EUI64 = [u8; 8];
/// AES-128 key (16 bytes)
pub type AESKey = [u8; 16];

/// Maximum access point name length
pub const MAX_APN_LEN: usize = 64;
/// Maximum SIM PIN length
pub const MAX_SIM_PIN_LEN: usize = 8;
/// Maximum carrier profile length
pub const MAX_CARRIER_LEN: usize = 16;

/// LoRaWAN device class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceClass {
    /// Class A: Uplink followed by two receive windows
    A,
    /// Class B: Scheduled receive slots (beaconing)
    B,
    /// Class C: Continuously listening except when transmitting
    C,
}

impl DeviceClass {
    /// Class letter as the module expects it
    pub fn as_byte(self) -> u8 {
        match self {
            DeviceClass::A => b'A',
            DeviceClass::B => b'B',
            DeviceClass::C => b'C',
        }
    }
}

/// Cellular network configuration
///
/// Empty fields are left untouched on the module when connecting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellularConfig {
    /// Access point name
    pub apn: String<MAX_APN_LEN>,
    /// SIM PIN
    pub sim_pin: String<MAX_SIM_PIN_LEN>,
    /// Carrier profile
    pub carrier: String<MAX_CARRIER_LEN>,
}

impl CellularConfig {
    /// Create a configuration, failing if any field is too long
    pub fn new(apn: &str, sim_pin: &str, carrier: &str) -> Option<Self> {
        let mut config = Self::default();
        config.apn.push_str(apn).ok()?;
        config.sim_pin.push_str(sim_pin).ok()?;
        config.carrier.push_str(carrier).ok()?;
        Some(config)
    }

    /// Configuration that only sets the access point name
    pub fn with_apn(apn: &str) -> Option<Self> {
        Self::new(apn, "", "")
    }
}
