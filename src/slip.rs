//! SLIP (Serial Line Internet Protocol) encoding and decoding.
//!
//! Implements RFC 1055 framing for DFU messages carried over the byte
//! stream. See: https://datatracker.ietf.org/doc/html/rfc1055

use crate::config::{MAX_SLIP_FRAME_SIZE, SLIP_END, SLIP_ESC, SLIP_ESC_END, SLIP_ESC_ESC};
use crate::error::{DfuError, DfuResult};

/// Encode data using SLIP framing.
///
/// Wraps the data with END delimiters and escapes any special bytes.
/// The transport strips the leading END before transmission to work
/// around a framing defect in the target-side SLIP implementation.
pub fn encode(data: &[u8]) -> Vec<u8> {
    // Pre-allocate with some extra space for escapes and delimiters
    let mut encoded = Vec::with_capacity(data.len() * 2 + 2);

    encoded.push(SLIP_END);

    for &byte in data {
        match byte {
            SLIP_END => {
                encoded.push(SLIP_ESC);
                encoded.push(SLIP_ESC_END);
            }
            SLIP_ESC => {
                encoded.push(SLIP_ESC);
                encoded.push(SLIP_ESC_ESC);
            }
            _ => encoded.push(byte),
        }
    }

    encoded.push(SLIP_END);

    encoded
}

/// Streaming SLIP decoder for incremental parsing.
///
/// Raw bytes may arrive fragmented across multiple bus reads; the decoder
/// accumulates state between calls and emits each payload as soon as its
/// terminating END byte is observed. A leading END is not required, and
/// empty frames (an END immediately following another frame's terminator)
/// are discarded.
#[derive(Debug, Default)]
pub struct SlipDecoder {
    buffer: Vec<u8>,
    escape_next: bool,
}

impl SlipDecoder {
    /// Create a new SLIP decoder.
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MAX_SLIP_FRAME_SIZE),
            escape_next: false,
        }
    }

    /// Feed a single byte to the decoder.
    ///
    /// # Returns
    /// - `Some(Ok(payload))` if this byte completed a frame
    /// - `Some(Err(e))` on a malformed stream; the decoder resets to a
    ///   clean scan state and subsequent bytes decode normally
    /// - `None` if more data is needed
    pub fn feed(&mut self, byte: u8) -> Option<DfuResult<Vec<u8>>> {
        if self.escape_next {
            self.escape_next = false;
            match byte {
                SLIP_ESC_END => self.buffer.push(SLIP_END),
                SLIP_ESC_ESC => self.buffer.push(SLIP_ESC),
                _ => {
                    self.reset();
                    return Some(Err(DfuError::InvalidSlipEscape));
                }
            }
            return None;
        }

        match byte {
            SLIP_END => {
                if self.buffer.is_empty() {
                    // Delimiter opening the next frame, or back-to-back
                    // terminators: nothing to emit.
                    None
                } else {
                    Some(Ok(std::mem::take(&mut self.buffer)))
                }
            }
            SLIP_ESC => {
                self.escape_next = true;
                None
            }
            _ => {
                if self.buffer.len() >= MAX_SLIP_FRAME_SIZE {
                    let size = self.buffer.len();
                    self.reset();
                    return Some(Err(DfuError::SlipBufferOverflow {
                        size,
                        max_size: MAX_SLIP_FRAME_SIZE,
                    }));
                }
                self.buffer.push(byte);
                None
            }
        }
    }

    /// Feed a slice of bytes, collecting every frame completed by it.
    ///
    /// Stops at the first framing error; the decoder has already reset
    /// itself at that point.
    pub fn push(&mut self, data: &[u8], frames: &mut Vec<Vec<u8>>) -> DfuResult<()> {
        for &byte in data {
            if let Some(result) = self.feed(byte) {
                frames.push(result?);
            }
        }
        Ok(())
    }

    /// Reset the decoder state.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.escape_next = false;
    }
}
