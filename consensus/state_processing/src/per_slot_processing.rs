use crate::{per_epoch_processing, EpochProcessingError};
use types::{BeaconState, EthSpec};

#[derive(Debug, Clone, PartialEq)]
pub enum SlotProcessingError {
    EpochProcessingError(EpochProcessingError),
}

impl From<EpochProcessingError> for SlotProcessingError {
    fn from(e: EpochProcessingError) -> Self {
        SlotProcessingError::EpochProcessingError(e)
    }
}

/// Advance the state by a single slot.
///
/// Caches the root of the block in effect at the vacated slot into the history ring, runs epoch
/// processing when the vacated slot closes an epoch, then increments the slot.
pub fn per_slot_processing<E: EthSpec>(
    state: &mut BeaconState<E>,
) -> Result<(), SlotProcessingError> {
    let latest_block_root = state.latest_block_header.canonical_root();
    state.set_block_root_at_slot(state.slot, latest_block_root);

    if (state.slot + 1) % E::slots_per_epoch() == 0 {
        per_epoch_processing(state)?;
    }

    state.slot += 1;

    Ok(())
}
