//! Configuration constants for the Nordic serial DFU protocol over I2C.

// ============================================================================
// SLIP Protocol Constants
// ============================================================================

/// SLIP frame delimiter (END byte).
pub const SLIP_END: u8 = 0xC0;

/// SLIP escape byte.
pub const SLIP_ESC: u8 = 0xDB;

/// SLIP escaped END (0xC0 encoded as 0xDB 0xDC).
pub const SLIP_ESC_END: u8 = 0xDC;

/// SLIP escaped ESC (0xDB encoded as 0xDB 0xDD).
pub const SLIP_ESC_ESC: u8 = 0xDD;

/// Maximum allowed decoded SLIP frame size.
///
/// Responses fit well within one fixed-size bus read; anything larger is a
/// corrupted stream. Prevents unbounded buffering on malformed data.
pub const MAX_SLIP_FRAME_SIZE: usize = 512;

// ============================================================================
// I2C Transfer Configuration
// ============================================================================

/// Fixed expected-response length for every bus transfer.
///
/// The target always answers with a buffer of this size: one significant
/// length byte, then payload, then padding.
pub const FIXED_READ_SIZE: usize = 58;

// ============================================================================
// DFU Protocol Configuration
// ============================================================================

/// First byte of every DFU response.
pub const RESPONSE_MARKER: u8 = 0x60;

/// Default packet receipt notification interval.
///
/// A value of 1 disables batching: every write is acknowledged individually.
pub const DEFAULT_PRN: u16 = 16;

/// Flash word alignment for data writes.
///
/// The negotiated MTU is rounded down to a multiple of this; writing an
/// unaligned number of bytes causes a flash error on most chips.
pub const MTU_ALIGNMENT: usize = 4;

/// Image-type byte meaning "no image at this index" in a
/// GetFirmwareVersion response.
pub const IMAGE_TYPE_NONE: u8 = 0xFF;

// ============================================================================
// DFU Opcodes (serial DFU protocol, SDK >= v15 bootloaders)
// ============================================================================

/// Serial DFU operation opcodes.
///
/// Each request is a single opcode byte followed by opcode-specific
/// parameters; the matching response echoes the opcode after the
/// [`RESPONSE_MARKER`] byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DfuOpcode {
    /// Query the DFU protocol version implemented by the target.
    ProtocolVersion = 0x00,
    /// Set the packet receipt notification interval.
    SetPrn = 0x02,
    /// Request the serial wire MTU.
    GetMtu = 0x07,
    /// Write a data chunk (init packet or firmware image bytes).
    WriteData = 0x08,
    /// Query hardware part/variant/memory layout.
    HardwareVersion = 0x0A,
    /// Query a firmware image slot by index.
    FirmwareVersion = 0x0B,
}

impl DfuOpcode {
    /// Expected response payload length beyond the echoed opcode.
    pub fn expected_response_len(self) -> usize {
        match self {
            DfuOpcode::ProtocolVersion => 1,
            DfuOpcode::SetPrn => 0,
            DfuOpcode::GetMtu => 2,
            DfuOpcode::WriteData => 0,
            DfuOpcode::HardwareVersion => 20,
            DfuOpcode::FirmwareVersion => 13,
        }
    }
}

/// Firmware image type reported by GetFirmwareVersion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ImageType {
    SoftDevice = 0x00,
    Application = 0x01,
    Bootloader = 0x02,
}

impl ImageType {
    /// Parse an image type from a response byte.
    ///
    /// Returns `None` for unknown codes; [`IMAGE_TYPE_NONE`] is handled by
    /// the caller before this point.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(ImageType::SoftDevice),
            0x01 => Some(ImageType::Application),
            0x02 => Some(ImageType::Bootloader),
            _ => None,
        }
    }
}
