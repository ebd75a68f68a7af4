use itertools::Itertools;
use types::{BeaconState, BeaconStateError, Checkpoint, Epoch, EthSpec, PendingAttestation};

#[derive(Debug, Clone, PartialEq)]
pub enum EpochProcessingError {
    BeaconStateError(BeaconStateError),
}

impl From<BeaconStateError> for EpochProcessingError {
    fn from(e: BeaconStateError) -> Self {
        EpochProcessingError::BeaconStateError(e)
    }
}

/// Run epoch processing on a state sitting at the last slot of an epoch.
pub fn per_epoch_processing<E: EthSpec>(
    state: &mut BeaconState<E>,
) -> Result<(), EpochProcessingError> {
    process_justification_and_finalization(state)?;

    state.previous_epoch_attestations = std::mem::take(&mut state.current_epoch_attestations);

    Ok(())
}

/// The Casper FFG justification and finalization rules over the pending attestation lists.
fn process_justification_and_finalization<E: EthSpec>(
    state: &mut BeaconState<E>,
) -> Result<(), EpochProcessingError> {
    let current_epoch = state.current_epoch();
    if current_epoch <= Epoch::new(1) {
        return Ok(());
    }

    let total_balance = state.total_active_balance();
    if total_balance == 0 {
        return Ok(());
    }

    let previous_epoch = state.previous_epoch();
    let old_previous_justified = state.previous_justified_checkpoint;
    let old_current_justified = state.current_justified_checkpoint;

    let previous_target_balance =
        matching_target_balance(state, &state.previous_epoch_attestations, previous_epoch)?;
    let current_target_balance =
        matching_target_balance(state, &state.current_epoch_attestations, current_epoch)?;

    state.previous_justified_checkpoint = state.current_justified_checkpoint;
    state.justification_bits.shift_up();

    if previous_target_balance * 3 >= total_balance * 2 {
        state.current_justified_checkpoint =
            Checkpoint::new(previous_epoch, state.get_block_root_at_epoch(previous_epoch)?);
        state.justification_bits.set(1, true);
    }
    if current_target_balance * 3 >= total_balance * 2 {
        state.current_justified_checkpoint =
            Checkpoint::new(current_epoch, state.get_block_root_at_epoch(current_epoch)?);
        state.justification_bits.set(0, true);
    }

    let bits = state.justification_bits;

    // The 2nd/3rd/4th most recent epochs are justified, the 4th was the supermajority link source.
    if bits.all_set(1..4) && old_previous_justified.epoch + 3 == current_epoch {
        state.finalized_checkpoint = old_previous_justified;
    }
    // The 2nd/3rd most recent epochs are justified, the 3rd was the supermajority link source.
    if bits.all_set(1..3) && old_previous_justified.epoch + 2 == current_epoch {
        state.finalized_checkpoint = old_previous_justified;
    }
    // The 1st/2nd/3rd most recent epochs are justified, the 3rd was the supermajority link source.
    if bits.all_set(0..3) && old_current_justified.epoch + 2 == current_epoch {
        state.finalized_checkpoint = old_current_justified;
    }
    // The 1st/2nd most recent epochs are justified, the 2nd was the supermajority link source.
    if bits.all_set(0..2) && old_current_justified.epoch + 1 == current_epoch {
        state.finalized_checkpoint = old_current_justified;
    }

    Ok(())
}

/// Sum of effective balances of the distinct, active, unslashed validators whose attestation
/// targets the canonical checkpoint of `epoch`.
fn matching_target_balance<E: EthSpec>(
    state: &BeaconState<E>,
    attestations: &[PendingAttestation],
    epoch: Epoch,
) -> Result<u64, EpochProcessingError> {
    let target_root = state.get_block_root_at_epoch(epoch)?;

    let balance = attestations
        .iter()
        .filter(|a| a.data.target.epoch == epoch && a.data.target.root == target_root)
        .flat_map(|a| a.attesting_indices.iter().copied())
        .unique()
        .filter_map(|index| state.validators.get(index as usize))
        .filter(|v| v.is_active_at(epoch) && !v.slashed)
        .map(|v| v.effective_balance)
        .sum();

    Ok(balance)
}
