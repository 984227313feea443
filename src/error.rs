//! Error types for the DFU protocol engine.

use thiserror::Error;

/// Result type alias for DFU operations.
pub type DfuResult<T> = Result<T, DfuError>;

/// Errors that can occur during a DFU operation.
///
/// The taxonomy has three layers: framing errors at the SLIP codec
/// boundary, protocol errors on validated responses, and transport errors
/// from the underlying bus. Every variant is `Clone` so terminal outcomes
/// can be memoized by the readiness check and the update sequencer.
#[derive(Debug, Clone, Error)]
pub enum DfuError {
    /// Invalid SLIP escape sequence encountered during decoding.
    #[error("Invalid SLIP escape sequence")]
    InvalidSlipEscape,

    /// Decoded SLIP frame exceeds the maximum frame size.
    #[error("SLIP frame of {size} bytes exceeds maximum {max_size}")]
    SlipBufferOverflow { size: usize, max_size: usize },

    /// Response does not start with the 0x60 marker byte.
    #[error("Response does not start with 0x60: got 0x{marker:02X}")]
    BadResponseMarker { marker: u8 },

    /// Response echoes a different opcode than the request.
    #[error("Unexpected response opcode: expected 0x{expected:02X}, got 0x{actual:02X}")]
    UnexpectedResponseOpcode { expected: u8, actual: u8 },

    /// Response payload length does not match the opcode table.
    #[error(
        "Unexpected response length for opcode 0x{opcode:02X}: expected {expected}, got {actual}"
    )]
    UnexpectedResponseLength {
        opcode: u8,
        expected: usize,
        actual: usize,
    },

    /// No response frame arrived for a command that requires one.
    #[error("Empty response for opcode 0x{opcode:02X}")]
    EmptyResponse { opcode: u8 },

    /// More than one decoded frame was pending for a single exchange.
    #[error("Received two response messages for one exchange")]
    ReceivedTwoResponses,

    /// The target advertised a wire MTU too small to carry any data.
    #[error("Unusable MTU: wire MTU {wire_mtu} leaves no room for data")]
    UnusableMtu { wire_mtu: u16 },

    /// GetFirmwareVersion returned an image-type code outside the
    /// documented set.
    #[error("Unsupported firmware image type 0x{code:02X}")]
    UnsupportedImageType { code: u8 },

    /// A data write was attempted before PRN/MTU negotiation.
    #[error("Transport not ready: PRN/MTU negotiation has not completed")]
    NotReady,

    /// Underlying bus fault (timeout, address NACK, driver failure).
    #[error("Transport error: {message}")]
    Transport { message: String },
}

impl DfuError {
    /// Whether this error originates at the framing (SLIP codec) boundary.
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            DfuError::InvalidSlipEscape | DfuError::SlipBufferOverflow { .. }
        )
    }

    /// Whether this error is a protocol violation in a target response.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            DfuError::BadResponseMarker { .. }
                | DfuError::UnexpectedResponseOpcode { .. }
                | DfuError::UnexpectedResponseLength { .. }
                | DfuError::EmptyResponse { .. }
                | DfuError::ReceivedTwoResponses
                | DfuError::UnusableMtu { .. }
                | DfuError::UnsupportedImageType { .. }
                | DfuError::NotReady
        )
    }

    /// Whether this error came from the underlying bus.
    pub fn is_transport(&self) -> bool {
        matches!(self, DfuError::Transport { .. })
    }

    /// Get a stable error code for support purposes.
    pub fn error_code(&self) -> &'static str {
        match self {
            DfuError::InvalidSlipEscape => "DFU-010",
            DfuError::SlipBufferOverflow { .. } => "DFU-011",
            DfuError::BadResponseMarker { .. } => "DFU-020",
            DfuError::UnexpectedResponseOpcode { .. } => "DFU-021",
            DfuError::UnexpectedResponseLength { .. } => "DFU-022",
            DfuError::EmptyResponse { .. } => "DFU-023",
            DfuError::ReceivedTwoResponses => "DFU-024",
            DfuError::UnusableMtu { .. } => "DFU-030",
            DfuError::UnsupportedImageType { .. } => "DFU-031",
            DfuError::NotReady => "DFU-032",
            DfuError::Transport { .. } => "DFU-040",
        }
    }
}

impl From<std::io::Error> for DfuError {
    fn from(err: std::io::Error) -> Self {
        DfuError::Transport {
            message: err.to_string(),
        }
    }
}
