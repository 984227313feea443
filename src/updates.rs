//! Update job list types.
//!
//! A firmware update is composed of one or more (init-packet, image)
//! pairs, e.g. bootloader then application, delivered strictly in order.
//! Producing these pairs from a firmware archive is the caller's concern;
//! this engine treats the list as read-only input.

/// One update job: an init packet and the firmware image it describes.
#[derive(Debug, Clone)]
pub struct DfuUpdate {
    pub init_packet: Vec<u8>,
    pub firmware_image: Vec<u8>,
}

impl DfuUpdate {
    pub fn new(init_packet: Vec<u8>, firmware_image: Vec<u8>) -> Self {
        Self {
            init_packet,
            firmware_image,
        }
    }
}

/// Ordered list of update jobs.
#[derive(Debug, Clone, Default)]
pub struct DfuUpdates {
    updates: Vec<DfuUpdate>,
}

impl DfuUpdates {
    pub fn new(updates: Vec<DfuUpdate>) -> Self {
        Self { updates }
    }

    /// Convenience constructor for the common single-image case.
    pub fn single(init_packet: Vec<u8>, firmware_image: Vec<u8>) -> Self {
        Self::new(vec![DfuUpdate::new(init_packet, firmware_image)])
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DfuUpdate> {
        self.updates.iter()
    }
}
