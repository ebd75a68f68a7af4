use crate::{Epoch, Hash256};
use serde_derive::{Deserialize, Serialize};

/// Casper FFG checkpoint, used in attestations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct Checkpoint {
    pub epoch: Epoch,
    pub root: Hash256,
}

impl Checkpoint {
    pub fn new(epoch: Epoch, root: Hash256) -> Self {
        Self { epoch, root }
    }

    /// The first slot of the checkpoint's epoch.
    pub fn epoch_start_slot(&self, slots_per_epoch: u64) -> crate::Slot {
        self.epoch.start_slot(slots_per_epoch)
    }
}
