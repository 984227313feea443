//! Nordic DFU (Device Firmware Update) protocol engine for targets
//! attached over an addressed, half-duplex I2C bus.
//!
//! The crate covers the transport protocol only: SLIP message framing,
//! request/response pairing over a blocking bus transfer primitive, PRN
//! and MTU negotiation, chunked payload transfer with progress events,
//! and the sequencing of one or more (init packet, firmware image) pairs
//! to completion. Parsing firmware archives into those pairs and the
//! physical bus driver are the caller's concern.
//!
//! # Protocol Stack
//!
//! - [`DfuOperation`] — sequences the update job list
//! - [`writer`] — MTU-bounded chunking with progress reporting
//! - [`DfuProtocol`] — opcodes, response validation, session state
//! - [`I2cLink`] — framed exchanges over the [`I2cBus`] primitive
//! - [`slip`] — RFC 1055 byte framing
//!
//! # Example
//!
//! ```no_run
//! use nrf_dfu_i2c::{DfuOperation, DfuProtocol, DfuResult, DfuUpdates, I2cBus};
//!
//! fn update(bus: impl I2cBus, init: Vec<u8>, image: Vec<u8>) -> DfuResult<()> {
//!     // PRN of 1 disables batching: every write is acknowledged
//!     let protocol = DfuProtocol::with_prn(bus, 0x2A, 1);
//!     let updates = DfuUpdates::single(init, image);
//!
//!     let mut dfu = DfuOperation::new(updates, protocol);
//!     dfu.on_progress(|progress| {
//!         println!(
//!             "{:?}: {}/{} bytes",
//!             progress.part, progress.bytes_sent, progress.total_bytes
//!         );
//!     });
//!     dfu.start()
//! }
//! ```

pub mod config;
mod error;
mod operation;
mod protocol;
pub mod slip;
mod transport;
mod updates;
pub mod writer;

#[cfg(test)]
mod test_support;

pub use config::{DfuOpcode, ImageType, DEFAULT_PRN};
pub use error::{DfuError, DfuResult};
pub use operation::{DfuOperation, OperationState};
pub use protocol::{DfuProtocol, FirmwareImage, HardwareVersion};
pub use transport::{I2cBus, I2cLink};
pub use updates::{DfuUpdate, DfuUpdates};
pub use writer::{send_payload, ProgressEvent, UpdatePhase};
