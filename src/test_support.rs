//! Shared test doubles for protocol and sequencer tests.

use std::collections::VecDeque;

use crate::config::{DfuOpcode, FIXED_READ_SIZE, RESPONSE_MARKER};
use crate::error::{DfuError, DfuResult};
use crate::slip;
use crate::transport::I2cBus;

/// A bus double that replays a scripted list of raw read-back buffers and
/// records every write it sees.
pub struct ScriptedBus {
    responses: VecDeque<DfuResult<Vec<u8>>>,
    pub writes: Vec<Vec<u8>>,
}

impl ScriptedBus {
    pub fn new() -> Self {
        Self {
            responses: VecDeque::new(),
            writes: Vec::new(),
        }
    }

    /// Queue a raw length-prefixed read-back buffer.
    pub fn push_raw(&mut self, raw: Vec<u8>) {
        self.responses.push_back(Ok(raw));
    }

    /// Queue a well-formed response frame for `opcode` with `payload`.
    pub fn push_response(&mut self, opcode: DfuOpcode, payload: &[u8]) {
        let mut frame = vec![RESPONSE_MARKER, opcode as u8];
        frame.extend_from_slice(payload);
        self.push_frame(&frame);
    }

    /// Queue an arbitrary frame (for malformed-response tests).
    pub fn push_frame(&mut self, frame: &[u8]) {
        let encoded = slip::encode(frame);
        let mut raw = vec![encoded.len() as u8];
        raw.extend_from_slice(&encoded);
        raw.resize(FIXED_READ_SIZE, 0x00);
        self.push_raw(raw);
    }

    /// Queue a transport fault.
    pub fn push_error(&mut self, message: &str) {
        self.responses.push_back(Err(DfuError::Transport {
            message: message.into(),
        }));
    }

    /// Number of transfers performed so far.
    pub fn transfer_count(&self) -> usize {
        self.writes.len()
    }
}

impl I2cBus for ScriptedBus {
    fn transfer(&mut self, _addr: u16, write: &[u8], _read_len: usize) -> DfuResult<Vec<u8>> {
        self.writes.push(write.to_vec());
        match self.responses.pop_front() {
            Some(response) => response,
            // Script exhausted: answer "no data this exchange"
            None => Ok(vec![0x00]),
        }
    }
}

/// Shared handle to a [`ScriptedBus`] so tests can inspect writes after
/// the bus has been moved into the protocol stack.
#[derive(Clone)]
pub struct SharedBus(pub std::rc::Rc<std::cell::RefCell<ScriptedBus>>);

impl SharedBus {
    pub fn new(bus: ScriptedBus) -> Self {
        Self(std::rc::Rc::new(std::cell::RefCell::new(bus)))
    }

    pub fn transfer_count(&self) -> usize {
        self.0.borrow().transfer_count()
    }

    /// Decoded command bytes (SLIP decoded, leading END restored) of the
    /// nth write, for asserting opcode and chunk sizes.
    pub fn command(&self, n: usize) -> Vec<u8> {
        let bus = self.0.borrow();
        let mut decoder = slip::SlipDecoder::new();
        let mut frames = Vec::new();
        decoder
            .push(&bus.writes[n], &mut frames)
            .expect("scripted write should decode");
        frames.pop().expect("write should contain one frame")
    }
}

impl I2cBus for SharedBus {
    fn transfer(&mut self, addr: u16, write: &[u8], read_len: usize) -> DfuResult<Vec<u8>> {
        self.0.borrow_mut().transfer(addr, write, read_len)
    }
}
