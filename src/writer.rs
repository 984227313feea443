//! Chunked payload delivery with progress reporting.
//!
//! Splits a payload into MTU-bounded slices and drives them through the
//! command protocol one at a time, each slice acknowledged before the
//! next is sent. Flow control therefore matches the half-duplex link:
//! there is never a speculative or concurrent send.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{DfuError, DfuResult};
use crate::protocol::DfuProtocol;
use crate::transport::I2cBus;

/// Which part of an update a payload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdatePhase {
    Init,
    Firmware,
}

/// Progress snapshot emitted after every successfully acknowledged write.
///
/// Values are cumulative within the current phase of the current update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// 0-based index of the update being delivered.
    pub current_update: usize,
    /// Total number of updates in the job list.
    pub total_updates: usize,
    /// Phase this payload belongs to.
    pub part: UpdatePhase,
    /// Bytes acknowledged so far in this phase.
    pub bytes_sent: usize,
    /// Total bytes in this phase.
    pub total_bytes: usize,
}

/// Deliver `bytes` through `protocol` in MTU-bounded slices.
///
/// Emits a [`ProgressEvent`] after each acknowledged slice. On the first
/// failure delivery stops and the error propagates; slices already
/// acknowledged are not rolled back (the caller restarts the job on a
/// resettable target if it wants a clean slate).
pub fn send_payload<B, F>(
    protocol: &mut DfuProtocol<B>,
    bytes: &[u8],
    part: UpdatePhase,
    current_update: usize,
    total_updates: usize,
    mut on_progress: F,
) -> DfuResult<()>
where
    B: I2cBus,
    F: FnMut(&ProgressEvent),
{
    let mtu = protocol.mtu().ok_or(DfuError::NotReady)?;
    let total_bytes = bytes.len();
    let mut bytes_sent = 0;

    debug!(
        "sending {total_bytes} byte {part:?} payload in {} byte chunks \
         (update {}/{total_updates})",
        mtu,
        current_update + 1,
    );

    // Explicit chunk loop keeps memory bounded for large images.
    for chunk in bytes.chunks(mtu) {
        protocol.write_data(chunk)?;
        bytes_sent += chunk.len();

        on_progress(&ProgressEvent {
            current_update,
            total_updates,
            part,
            bytes_sent,
            total_bytes,
        });
    }

    Ok(())
}
