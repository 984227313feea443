//! The DFU operation: delivering a job list to one target.
//!
//! The sequencer does not care how the target is attached; it drives the
//! command protocol it is given. Orchestration is a plain state machine
//! with a single advance loop rather than a chain of continuations, so
//! job and chunk counts never grow the stack.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{DfuError, DfuResult};
use crate::protocol::DfuProtocol;
use crate::transport::I2cBus;
use crate::updates::DfuUpdates;
use crate::writer::{self, ProgressEvent, UpdatePhase};

/// Lifecycle of a [`DfuOperation`]. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationState {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Drives an ordered list of updates to completion over one protocol
/// instance.
///
/// Observers are registered before [`start`]; both are invoked
/// synchronously on the caller's flow of control, so a progress event is
/// always seen before the write after it is issued.
///
/// [`start`]: DfuOperation::start
pub struct DfuOperation<B: I2cBus> {
    updates: DfuUpdates,
    protocol: DfuProtocol<B>,
    state: OperationState,
    outcome: Option<DfuResult<()>>,
    on_progress: Option<Box<dyn FnMut(&ProgressEvent)>>,
    on_error: Option<Box<dyn FnMut(&DfuError)>>,
}

impl<B: I2cBus> DfuOperation<B> {
    pub fn new(updates: DfuUpdates, protocol: DfuProtocol<B>) -> Self {
        Self {
            updates,
            protocol,
            state: OperationState::Idle,
            outcome: None,
            on_progress: None,
            on_error: None,
        }
    }

    /// Register the progress observer.
    pub fn on_progress(&mut self, callback: impl FnMut(&ProgressEvent) + 'static) {
        self.on_progress = Some(Box::new(callback));
    }

    /// Register the error observer. It receives the failure that
    /// terminated the operation, after the state transition to `Failed`.
    pub fn on_error(&mut self, callback: impl FnMut(&DfuError) + 'static) {
        self.on_error = Some(Box::new(callback));
    }

    pub fn state(&self) -> OperationState {
        self.state
    }

    /// Terminal outcome, if the operation has finished.
    pub fn outcome(&self) -> Option<&DfuResult<()>> {
        self.outcome.as_ref()
    }

    /// Access the underlying protocol, e.g. for version queries before
    /// starting the transfer.
    pub fn protocol_mut(&mut self) -> &mut DfuProtocol<B> {
        &mut self.protocol
    }

    /// Perform the DFU operation.
    ///
    /// Idempotent: the first call runs the job list; once the operation
    /// has completed or failed, further calls return the memoized outcome
    /// without issuing any bus exchange. Updates already delivered before
    /// a failure are not undone.
    pub fn start(&mut self) -> DfuResult<()> {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }

        self.state = OperationState::Running;
        info!("starting DFU operation: {} update(s)", self.updates.len());

        let outcome = self.run();
        match &outcome {
            Ok(()) => {
                self.state = OperationState::Completed;
                info!("DFU operation completed");
            }
            Err(err) => {
                self.state = OperationState::Failed;
                warn!("DFU operation failed [{}]: {err}", err.error_code());
                if let Some(callback) = self.on_error.as_mut() {
                    callback(err);
                }
            }
        }

        self.outcome = Some(outcome.clone());
        outcome
    }

    fn run(&mut self) -> DfuResult<()> {
        let total = self.updates.len();
        let Self {
            updates,
            protocol,
            on_progress,
            ..
        } = self;
        let mut emit = |event: &ProgressEvent| {
            if let Some(callback) = on_progress.as_mut() {
                callback(event);
            }
        };

        for (index, update) in updates.iter().enumerate() {
            protocol.ready()?;

            writer::send_payload(
                protocol,
                &update.init_packet,
                UpdatePhase::Init,
                index,
                total,
                &mut emit,
            )?;
            writer::send_payload(
                protocol,
                &update.firmware_image,
                UpdatePhase::Firmware,
                index,
                total,
                &mut emit,
            )?;

            info!("update {}/{total} delivered", index + 1);
        }

        Ok(())
    }
}
