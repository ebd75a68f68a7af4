//! The state transition function, reduced to the operations block import and finality
//! accounting require.

mod per_block_processing;
mod per_epoch_processing;
mod per_slot_processing;

pub use per_block_processing::{per_block_processing, BlockProcessingError};
pub use per_epoch_processing::{per_epoch_processing, EpochProcessingError};
pub use per_slot_processing::{per_slot_processing, SlotProcessingError};

use types::{BeaconState, EthSpec, SignedBeaconBlock, Slot};

#[derive(Debug, Clone, PartialEq)]
pub enum StateTransitionError {
    BlockSlotBehindState { state_slot: Slot, block_slot: Slot },
    SlotProcessingError(SlotProcessingError),
    BlockProcessingError(BlockProcessingError),
}

impl From<SlotProcessingError> for StateTransitionError {
    fn from(e: SlotProcessingError) -> Self {
        StateTransitionError::SlotProcessingError(e)
    }
}

impl From<BlockProcessingError> for StateTransitionError {
    fn from(e: BlockProcessingError) -> Self {
        StateTransitionError::BlockProcessingError(e)
    }
}

/// Advance `state` to `slot`, running epoch processing at each epoch boundary crossed.
pub fn process_slots<E: EthSpec>(
    state: &mut BeaconState<E>,
    slot: Slot,
) -> Result<(), SlotProcessingError> {
    while state.slot < slot {
        per_slot_processing(state)?;
    }
    Ok(())
}

/// Advance `state` to the block's slot and apply the block.
///
/// This is the whole transition used by block import; it does not verify the block's declared
/// state root (proposer signatures and roots are checked upstream).
pub fn state_transition<E: EthSpec>(
    state: &mut BeaconState<E>,
    signed_block: &SignedBeaconBlock,
) -> Result<(), StateTransitionError> {
    let block = &signed_block.message;
    if block.slot < state.slot {
        return Err(StateTransitionError::BlockSlotBehindState {
            state_slot: state.slot,
            block_slot: block.slot,
        });
    }
    process_slots(state, block.slot)?;
    per_block_processing(state, block)?;
    Ok(())
}
