/// AT command identifiers
///
/// Each command travels as its two-character mnemonic inside an AT command
/// frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AtCommand {
    /// Association indication (network join/attach state)
    AI,
    /// Apply pending changes
    AC,
    /// API enable mode
    AP,
    /// API options
    AO,
    /// Serial baud rate
    BD,
    /// Exit command mode
    CN,
    /// Last packet RSSI
    DB,
    /// Factory reset
    FR,
    /// Hardware version
    HV,
    /// Software reset
    RE,
    /// Serial number high
    SH,
    /// Serial number low
    SL,
    /// Firmware version
    VR,
    /// Write configuration to non-volatile memory
    WR,
    /// LoRaWAN application EUI
    AE,
    /// LoRaWAN application key
    AK,
    /// LoRaWAN device EUI
    DE,
    /// LoRaWAN join RX1 delay
    J1,
    /// LoRaWAN join network
    JN,
    /// LoRaWAN device class
    LC,
    /// LoRaWAN network key
    NK,
    /// LoRaWAN RX2 frequency
    XF,
    /// Cellular access point name
    AN,
    /// Cellular carrier profile
    CP,
    /// Cellular SIM PIN
    PN,
    /// Cellular shutdown
    SD,
}

impl AtCommand {
    /// Two-byte mnemonic as sent on the wire
    pub fn mnemonic(self) -> [u8; 2] {
        let s: &[u8; 2] = match self {
            AtCommand::AI => b"AI",
            AtCommand::AC => b"AC",
            AtCommand::AP => b"AP",
            AtCommand::AO => b"AO",
            AtCommand::BD => b"BD",
            AtCommand::CN => b"CN",
            AtCommand::DB => b"DB",
            AtCommand::FR => b"FR",
            AtCommand::HV => b"HV",
            AtCommand::RE => b"RE",
            AtCommand::SH => b"SH",
            AtCommand::SL => b"SL",
            AtCommand::VR => b"VR",
            AtCommand::WR => b"WR",
            AtCommand::AE => b"AE",
            AtCommand::AK => b"AK",
            AtCommand::DE => b"DE",
            AtCommand::J1 => b"J1",
            AtCommand::JN => b"JN",
            AtCommand::LC => b"LC",
            AtCommand::NK => b"NK",
            AtCommand::XF => b"XF",
            AtCommand::AN => b"AN",
            AtCommand::CP => b"CP",
            AtCommand::PN => b"PN",
            AtCommand::SD => b"SD",
        };
        *s
    }
}

/// Parsed AT command response
///
/// Borrowed view over the payload of an AT response frame:
/// `[frame id][c0][c1][status][data...]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtResponse<'a> {
    /// Transaction id echoed from the request
    pub frame_id: u8,
    /// Command mnemonic
    pub command: [u8; 2],
    /// Status byte, zero on success
    pub status: u8,
    /// Result bytes
    pub data: &'a [u8],
}

impl<'a> AtResponse<'a> {
    /// Parse an AT response payload
    pub fn from_bytes(payload: &'a [u8]) -> Option<Self> {
        if payload.len() < 4 {
            return None;
        }
        Some(Self {
            frame_id: payload[0],
            command: [payload[1], payload[2]],
            status: payload[3],
            data: &payload[4..],
        })
    }
}

/// Modem status codes reported by unsolicited modem status frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModemStatus {
    /// Hardware reset or power up
    HardwareReset,
    /// Watchdog timer reset
    WatchdogReset,
    /// Joined or registered with the network
    Joined,
    /// Left or deregistered from the network
    Disassociated,
    /// Any other code
    Other(u8),
}

impl From<u8> for ModemStatus {
    fn from(code: u8) -> Self {
        match code {
            0x00 => ModemStatus::HardwareReset,
            0x01 => ModemStatus::WatchdogReset,
            0x02 => ModemStatus::Joined,
            0x03 => ModemStatus::Disassociated,
            other => ModemStatus::Other(other),
        }
    }
}

/// Outcome of a transmitted packet, reported by a transmit status frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeliveryStatus {
    /// Delivered (and acknowledged if requested)
    Success,
    /// No acknowledgement received
    AckFailed,
    /// Module is not joined to a network
    NotConnected,
    /// Any other reason code
    Other(u8),
}

impl From<u8> for DeliveryStatus {
    fn from(code: u8) -> Self {
        match code {
            0x00 => DeliveryStatus::Success,
            0x01 => DeliveryStatus::AckFailed,
            0x22 => DeliveryStatus::NotConnected,
            other => DeliveryStatus::Other(other),
        }
    }
}
