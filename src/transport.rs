//! I2C transport layer for DFU communication.
//!
//! Provides a trait-based abstraction over the bus transfer primitive,
//! enabling both real hardware and mock testing, plus the adapter that
//! turns one blocking write-then-read transaction into a framed
//! request/response exchange.

use std::collections::VecDeque;

use log::{debug, trace};

#[cfg(test)]
use mockall::automock;

use crate::config::FIXED_READ_SIZE;
use crate::error::{DfuError, DfuResult};
use crate::slip::{self, SlipDecoder};

/// Trait for the underlying I2C bus transfer primitive.
///
/// Implementations wrap a concrete bus driver (Linux i2c-dev, a debug
/// probe, a test double). One call is one half-duplex transaction: write
/// `write` to the device at `addr`, then read back exactly `read_len`
/// bytes. The returned buffer is length-prefixed: byte 0 holds the
/// significant payload length, the rest is payload followed by padding.
///
/// Bus faults (timeout, address NACK) must surface as
/// [`DfuError::Transport`].
#[cfg_attr(test, automock)]
pub trait I2cBus {
    /// Perform a single write-then-read transaction.
    fn transfer(&mut self, addr: u16, write: &[u8], read_len: usize) -> DfuResult<Vec<u8>>;
}

/// Framed request/response adapter over an [`I2cBus`].
///
/// Exchanges are strictly sequential: responses are matched to requests
/// purely by temporal ordering, so `&mut self` on [`exchange`] is what
/// enforces the one-outstanding-exchange invariant.
///
/// [`exchange`]: I2cLink::exchange
pub struct I2cLink<B: I2cBus> {
    bus: B,
    addr: u16,
    decoder: SlipDecoder,
    pending: VecDeque<Vec<u8>>,
}

impl<B: I2cBus> I2cLink<B> {
    /// Create a new link for the device at `addr`.
    pub fn new(bus: B, addr: u16) -> Self {
        Self {
            bus,
            addr,
            decoder: SlipDecoder::new(),
            pending: VecDeque::new(),
        }
    }

    /// The device address this link is bound to.
    pub fn addr(&self) -> u16 {
        self.addr
    }

    /// Send one command and collect the response frame, if any.
    ///
    /// The command is SLIP-encoded with the leading END stripped (the
    /// target-side SLIP implementation chokes on it), transferred with a
    /// fixed expected-response length, and the significant slice of the
    /// read-back buffer is fed to the streaming decoder. A raw response
    /// of one byte or less carries no data and is not an error.
    pub fn exchange(&mut self, command: &[u8]) -> DfuResult<Option<Vec<u8>>> {
        let encoded = slip::encode(command);
        // Strip the heading END byte to avoid a bug in the nRF SDK
        // implementation of SLIP framing.
        let wire = &encoded[1..];

        debug!(
            "exchange --> addr 0x{:02X}: {} bytes (opcode 0x{:02X})",
            self.addr,
            wire.len(),
            command.first().copied().unwrap_or(0)
        );

        let raw = self.bus.transfer(self.addr, wire, FIXED_READ_SIZE)?;
        trace!("exchange <-- addr 0x{:02X}: {:02X?}", self.addr, raw);

        if raw.len() > 1 {
            let len = raw[0] as usize;
            let end = raw.len().min(1 + len);
            let mut frames = Vec::new();
            self.decoder.push(&raw[1..end], &mut frames)?;
            self.pending.extend(frames);
        }

        if self.pending.len() > 1 {
            self.pending.clear();
            self.decoder.reset();
            return Err(DfuError::ReceivedTwoResponses);
        }

        Ok(self.pending.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SLIP_END, SLIP_ESC};

    /// Length-prefix a SLIP-encoded frame and pad to the fixed read size.
    fn bus_response(frame_payload: &[u8]) -> Vec<u8> {
        let encoded = slip::encode(frame_payload);
        let mut raw = vec![encoded.len() as u8];
        raw.extend_from_slice(&encoded);
        raw.resize(FIXED_READ_SIZE, 0x00);
        raw
    }

    #[test]
    fn test_exchange_strips_leading_end() {
        let mut bus = MockI2cBus::new();
        bus.expect_transfer()
            .withf(|addr, write, read_len| {
                *addr == 0x2A
                    && *read_len == FIXED_READ_SIZE
                    && write.first() != Some(&SLIP_END)
                    && write.last() == Some(&SLIP_END)
            })
            .times(1)
            .returning(|_, _, _| Ok(vec![0x00]));

        let mut link = I2cLink::new(bus, 0x2A);
        let response = link.exchange(&[0x02, 0x10, 0x00]).unwrap();
        assert!(response.is_none());
    }

    #[test]
    fn test_exchange_slices_length_prefixed_payload() {
        let mut bus = MockI2cBus::new();
        bus.expect_transfer()
            .returning(|_, _, _| Ok(bus_response(&[0x60, 0x02])));

        let mut link = I2cLink::new(bus, 0x2A);
        let response = link.exchange(&[0x02, 0x10, 0x00]).unwrap();
        assert_eq!(response, Some(vec![0x60, 0x02]));
    }

    #[test]
    fn test_exchange_ignores_padding_past_length_byte() {
        let mut bus = MockI2cBus::new();
        bus.expect_transfer().returning(|_, _, _| {
            let mut raw = bus_response(&[0x60, 0x07, 0x14, 0x00]);
            // Garbage in the padding region must never reach the decoder
            raw[20] = SLIP_ESC;
            raw[21] = 0xFF;
            Ok(raw)
        });

        let mut link = I2cLink::new(bus, 0x2A);
        let response = link.exchange(&[0x07]).unwrap();
        assert_eq!(response, Some(vec![0x60, 0x07, 0x14, 0x00]));
    }

    #[test]
    fn test_exchange_short_read_is_no_data() {
        let mut bus = MockI2cBus::new();
        bus.expect_transfer().returning(|_, _, _| Ok(vec![0x00]));

        let mut link = I2cLink::new(bus, 0x2A);
        assert!(link.exchange(&[0x08, 0x01]).unwrap().is_none());
    }

    #[test]
    fn test_exchange_propagates_transport_error() {
        let mut bus = MockI2cBus::new();
        bus.expect_transfer().returning(|_, _, _| {
            Err(DfuError::Transport {
                message: "address NACK".into(),
            })
        });

        let mut link = I2cLink::new(bus, 0x2A);
        let result = link.exchange(&[0x00]);
        assert!(matches!(result, Err(DfuError::Transport { .. })));
    }

    #[test]
    fn test_exchange_response_fragmented_across_transfers() {
        let encoded = slip::encode(&[0x60, 0x00, 0x01]);
        let (first, second) = encoded.split_at(3);

        let mut raw1 = vec![first.len() as u8];
        raw1.extend_from_slice(first);
        raw1.resize(FIXED_READ_SIZE, 0x00);
        let mut raw2 = vec![second.len() as u8];
        raw2.extend_from_slice(second);
        raw2.resize(FIXED_READ_SIZE, 0x00);

        let mut responses = VecDeque::from([raw1, raw2]);
        let mut bus = MockI2cBus::new();
        bus.expect_transfer()
            .times(2)
            .returning(move |_, _, _| Ok(responses.pop_front().unwrap()));

        let mut link = I2cLink::new(bus, 0x2A);
        assert!(link.exchange(&[0x00]).unwrap().is_none());
        assert_eq!(link.exchange(&[0x00]).unwrap(), Some(vec![0x60, 0x00, 0x01]));
    }

    #[test]
    fn test_exchange_two_pending_frames_is_error() {
        let mut bus = MockI2cBus::new();
        bus.expect_transfer().returning(|_, _, _| {
            let mut encoded = slip::encode(&[0x60, 0x02]);
            encoded.extend_from_slice(&slip::encode(&[0x60, 0x07, 0x14, 0x00]));
            let mut raw = vec![encoded.len() as u8];
            raw.extend_from_slice(&encoded);
            raw.resize(FIXED_READ_SIZE, 0x00);
            Ok(raw)
        });

        let mut link = I2cLink::new(bus, 0x2A);
        let result = link.exchange(&[0x02, 0x10, 0x00]);
        assert!(matches!(result, Err(DfuError::ReceivedTwoResponses)));
    }

    #[test]
    fn test_exchange_framing_error_aborts() {
        let mut bus = MockI2cBus::new();
        bus.expect_transfer().returning(|_, _, _| {
            let bad = [SLIP_END, 0x60, SLIP_ESC, 0xFF, SLIP_END];
            let mut raw = vec![bad.len() as u8];
            raw.extend_from_slice(&bad);
            raw.resize(FIXED_READ_SIZE, 0x00);
            Ok(raw)
        });

        let mut link = I2cLink::new(bus, 0x2A);
        let result = link.exchange(&[0x00]);
        assert!(matches!(result, Err(DfuError::InvalidSlipEscape)));
    }
}
