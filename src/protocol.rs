//! DFU command protocol for serial-DFU-over-I2C targets.
//!
//! Owns the per-connection session state (PRN interval, negotiated MTU,
//! readiness) and the opcode vocabulary: every request is issued through
//! [`I2cLink::exchange`] and its response validated against the opcode
//! table before any payload is interpreted.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::{DfuOpcode, ImageType, DEFAULT_PRN, IMAGE_TYPE_NONE, MTU_ALIGNMENT,
    RESPONSE_MARKER};
use crate::error::{DfuError, DfuResult};
use crate::transport::{I2cBus, I2cLink};

/// Hardware description returned by GetHardwareVersion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareVersion {
    pub part: i32,
    pub variant: i32,
    pub rom_size: i32,
    pub ram_size: i32,
    pub rom_page_size: i32,
}

/// Description of one firmware image slot, from GetFirmwareVersion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareImage {
    pub image_type: ImageType,
    pub version: u32,
    pub addr: u32,
    pub length: u32,
}

/// DFU command protocol bound to one I2C device.
///
/// Holds the session state exclusively; everything above this layer only
/// reads the negotiated values. CRC queries over transferred objects are
/// an extension point for targets whose DFU variant requires them; this
/// engine does not issue them.
pub struct DfuProtocol<B: I2cBus> {
    link: I2cLink<B>,
    prn: u16,
    mtu: Option<usize>,
    ready: Option<DfuResult<()>>,
}

impl<B: I2cBus> DfuProtocol<B> {
    /// Create a protocol instance for the device at `addr` with the
    /// default PRN interval.
    pub fn new(bus: B, addr: u16) -> Self {
        Self::with_prn(bus, addr, DEFAULT_PRN)
    }

    /// Create a protocol instance with an explicit PRN interval.
    ///
    /// A PRN of 1 disables batching: the target acknowledges every write
    /// individually.
    pub fn with_prn(bus: B, addr: u16, prn: u16) -> Self {
        Self {
            link: I2cLink::new(bus, addr),
            prn,
            mtu: None,
            ready: None,
        }
    }

    /// The configured PRN interval.
    pub fn prn(&self) -> u16 {
        self.prn
    }

    /// Negotiated max unencoded payload bytes per write, once ready.
    pub fn mtu(&self) -> Option<usize> {
        self.mtu
    }

    /// Initialize the DFU session: set the PRN interval and negotiate
    /// the MTU.
    ///
    /// Idempotent: the first call performs the exchanges and the outcome,
    /// success or failure, is memoized; repeated calls return it without
    /// touching the bus.
    pub fn ready(&mut self) -> DfuResult<()> {
        if let Some(outcome) = &self.ready {
            return outcome.clone();
        }

        let outcome = self.init_session();
        self.ready = Some(outcome.clone());
        outcome
    }

    fn init_session(&mut self) -> DfuResult<()> {
        self.request(DfuOpcode::SetPrn, &self.prn.to_le_bytes())?;

        let payload = self.request(DfuOpcode::GetMtu, &[])?;
        let wire_mtu = u16::from_le_bytes([payload[0], payload[1]]);

        // Convert the wire MTU into the max unencoded data size per write,
        // accounting for SLIP expansion (/2), the END separator and the
        // write-command opcode (-2), then align down for flash writes.
        let mut mtu = (wire_mtu as usize / 2).saturating_sub(2);
        mtu -= mtu % MTU_ALIGNMENT;
        if mtu == 0 {
            return Err(DfuError::UnusableMtu { wire_mtu });
        }

        info!("serial wire MTU: {wire_mtu}; un-encoded data max size: {mtu}");
        self.mtu = Some(mtu);
        Ok(())
    }

    /// Query the DFU protocol version implemented by the target.
    ///
    /// Only bootloaders from SDK >= v15 implement this command.
    pub fn get_protocol_version(&mut self) -> DfuResult<u8> {
        let payload = self.request(DfuOpcode::ProtocolVersion, &[])?;
        debug!("protocol version: {}", payload[0]);
        Ok(payload[0])
    }

    /// Query the hardware part, variant and memory layout.
    pub fn get_hardware_version(&mut self) -> DfuResult<HardwareVersion> {
        let payload = self.request(DfuOpcode::HardwareVersion, &[])?;
        let version = HardwareVersion {
            part: le_i32(&payload, 0),
            variant: le_i32(&payload, 4),
            rom_size: le_i32(&payload, 8),
            ram_size: le_i32(&payload, 12),
            rom_page_size: le_i32(&payload, 16),
        };
        debug!(
            "hardware version: part 0x{:X}, variant 0x{:X}",
            version.part, version.variant
        );
        Ok(version)
    }

    /// Query the firmware image slot at `index` (0-based).
    ///
    /// Returns `None` when there is no image at that index.
    pub fn get_firmware_version(&mut self, index: u8) -> DfuResult<Option<FirmwareImage>> {
        let payload = self.request(DfuOpcode::FirmwareVersion, &[index])?;

        let type_byte = payload[0];
        if type_byte == IMAGE_TYPE_NONE {
            debug!("firmware version: no image at index {index}");
            return Ok(None);
        }
        let image_type = ImageType::from_byte(type_byte)
            .ok_or(DfuError::UnsupportedImageType { code: type_byte })?;

        let image = FirmwareImage {
            image_type,
            version: le_u32(&payload, 1),
            addr: le_u32(&payload, 5),
            length: le_u32(&payload, 9),
        };
        debug!(
            "firmware version: image {index} is {:?} @0x{:X}+0x{:X}",
            image.image_type, image.addr, image.length
        );
        Ok(Some(image))
    }

    /// Query every populated firmware image slot, in index order.
    pub fn get_all_firmware_versions(&mut self) -> DfuResult<Vec<FirmwareImage>> {
        let mut images = Vec::new();
        for index in 0..=u8::MAX {
            match self.get_firmware_version(index)? {
                Some(image) => images.push(image),
                None => break,
            }
        }
        Ok(images)
    }

    /// Write one data chunk (init-packet or firmware bytes).
    ///
    /// The caller guarantees `chunk` is no larger than the negotiated MTU.
    pub fn write_data(&mut self, chunk: &[u8]) -> DfuResult<()> {
        self.request(DfuOpcode::WriteData, chunk)?;
        Ok(())
    }

    /// Issue one command and validate its response against the opcode
    /// table, returning the payload beyond the echoed opcode.
    fn request(&mut self, opcode: DfuOpcode, params: &[u8]) -> DfuResult<Vec<u8>> {
        let mut command = Vec::with_capacity(1 + params.len());
        command.push(opcode as u8);
        command.extend_from_slice(params);

        let response = self.link.exchange(&command)?;
        Self::assert_response(opcode, response)
    }

    fn assert_response(opcode: DfuOpcode, response: Option<Vec<u8>>) -> DfuResult<Vec<u8>> {
        let frame = match response {
            Some(frame) if frame.len() >= 2 => frame,
            _ => return Err(DfuError::EmptyResponse { opcode: opcode as u8 }),
        };

        if frame[0] != RESPONSE_MARKER {
            return Err(DfuError::BadResponseMarker { marker: frame[0] });
        }
        if frame[1] != opcode as u8 {
            return Err(DfuError::UnexpectedResponseOpcode {
                expected: opcode as u8,
                actual: frame[1],
            });
        }

        let payload = &frame[2..];
        let expected = opcode.expected_response_len();
        if payload.len() != expected {
            return Err(DfuError::UnexpectedResponseLength {
                opcode: opcode as u8,
                expected,
                actual: payload.len(),
            });
        }

        Ok(payload.to_vec())
    }
}

fn le_i32(payload: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([
        payload[offset],
        payload[offset + 1],
        payload[offset + 2],
        payload[offset + 3],
    ])
}

fn le_u32(payload: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        payload[offset],
        payload[offset + 1],
        payload[offset + 2],
        payload[offset + 3],
    ])
}
