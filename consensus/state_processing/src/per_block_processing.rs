use types::{
    BeaconBlock, BeaconState, Checkpoint, Epoch, EthSpec, Hash256, IndexedAttestation,
    PendingAttestation, Slot,
};

#[derive(Debug, Clone, PartialEq)]
pub enum BlockProcessingError {
    StateSlotMismatch {
        state_slot: Slot,
        block_slot: Slot,
    },
    ParentBlockRootMismatch {
        state: Hash256,
        block: Hash256,
    },
    BlockSlotNotAfterParent {
        parent_slot: Slot,
        block_slot: Slot,
    },
    UnknownProposer(u64),
    AttestationInvalid {
        index: usize,
        reason: AttestationInvalid,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttestationInvalid {
    EmptyAggregation,
    /// The target epoch is neither the state's current nor previous epoch.
    TargetEpochOutOfRange {
        target: Epoch,
    },
    /// The source checkpoint does not match the state's justified checkpoint for the target
    /// epoch.
    SourceMismatch {
        expected: Checkpoint,
        attestation: Checkpoint,
    },
    UnknownAttester(u64),
}

/// Apply `block` to a state already advanced to the block's slot.
///
/// On error the state may be partially mutated; callers are expected to work on a disposable
/// clone, as block import does.
pub fn per_block_processing<E: EthSpec>(
    state: &mut BeaconState<E>,
    block: &BeaconBlock,
) -> Result<(), BlockProcessingError> {
    if state.slot != block.slot {
        return Err(BlockProcessingError::StateSlotMismatch {
            state_slot: state.slot,
            block_slot: block.slot,
        });
    }

    if block.slot <= state.latest_block_header.slot {
        return Err(BlockProcessingError::BlockSlotNotAfterParent {
            parent_slot: state.latest_block_header.slot,
            block_slot: block.slot,
        });
    }

    let expected_parent = state.latest_block_header.canonical_root();
    if block.parent_root != expected_parent {
        return Err(BlockProcessingError::ParentBlockRootMismatch {
            state: expected_parent,
            block: block.parent_root,
        });
    }

    if block.proposer_index as usize >= state.validators.len() && !state.validators.is_empty() {
        return Err(BlockProcessingError::UnknownProposer(block.proposer_index));
    }

    process_attestations(state, &block.body.attestations)?;

    state.latest_block_header = block.block_header();

    Ok(())
}

fn process_attestations<E: EthSpec>(
    state: &mut BeaconState<E>,
    attestations: &[IndexedAttestation],
) -> Result<(), BlockProcessingError> {
    for (i, attestation) in attestations.iter().enumerate() {
        validate_attestation(state, attestation)
            .map_err(|reason| BlockProcessingError::AttestationInvalid { index: i, reason })?;

        let pending = PendingAttestation {
            attesting_indices: attestation.attesting_indices.clone(),
            data: attestation.data,
            inclusion_slot: state.slot,
        };

        if attestation.data.target.epoch == state.current_epoch() {
            state.current_epoch_attestations.push(pending);
        } else {
            state.previous_epoch_attestations.push(pending);
        }
    }
    Ok(())
}

fn validate_attestation<E: EthSpec>(
    state: &BeaconState<E>,
    attestation: &IndexedAttestation,
) -> Result<(), AttestationInvalid> {
    if attestation.is_empty() {
        return Err(AttestationInvalid::EmptyAggregation);
    }

    let target = attestation.data.target.epoch;
    let expected_source = if target == state.current_epoch() {
        state.current_justified_checkpoint
    } else if target == state.previous_epoch() {
        state.previous_justified_checkpoint
    } else {
        return Err(AttestationInvalid::TargetEpochOutOfRange { target });
    };

    if attestation.data.source != expected_source {
        return Err(AttestationInvalid::SourceMismatch {
            expected: expected_source,
            attestation: attestation.data.source,
        });
    }

    for &index in &attestation.attesting_indices {
        if index as usize >= state.validators.len() {
            return Err(AttestationInvalid::UnknownAttester(index));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::per_slot_processing;
    use types::{MinimalEthSpec, Validator};

    fn state_with_validators(n: usize) -> BeaconState<MinimalEthSpec> {
        let validators = (0..n)
            .map(|_| Validator {
                effective_balance: 32_000_000_000,
                slashed: false,
                activation_epoch: Epoch::new(0),
                exit_epoch: Epoch::max_value(),
            })
            .collect();
        BeaconState::genesis(0, [0; 4], validators)
    }

    fn block_on(state: &BeaconState<MinimalEthSpec>) -> BeaconBlock {
        BeaconBlock {
            slot: state.slot,
            proposer_index: 0,
            parent_root: state.latest_block_header.canonical_root(),
            state_root: Hash256::zero(),
            ..BeaconBlock::default()
        }
    }

    #[test]
    fn rejects_wrong_slot() {
        let mut state = state_with_validators(4);
        per_slot_processing(&mut state).unwrap();

        let mut block = block_on(&state);
        block.slot = Slot::new(5);

        assert_eq!(
            per_block_processing(&mut state, &block),
            Err(BlockProcessingError::StateSlotMismatch {
                state_slot: Slot::new(1),
                block_slot: Slot::new(5),
            })
        );
    }

    #[test]
    fn rejects_wrong_parent() {
        let mut state = state_with_validators(4);
        per_slot_processing(&mut state).unwrap();

        let mut block = block_on(&state);
        block.parent_root = Hash256::repeat_byte(0xff);

        assert!(matches!(
            per_block_processing(&mut state, &block),
            Err(BlockProcessingError::ParentBlockRootMismatch { .. })
        ));
    }

    #[test]
    fn applies_block_and_updates_header() {
        let mut state = state_with_validators(4);
        per_slot_processing(&mut state).unwrap();

        let block = block_on(&state);
        per_block_processing(&mut state, &block).unwrap();

        assert_eq!(
            state.latest_block_header.canonical_root(),
            block.canonical_root()
        );
    }

    #[test]
    fn stages_attestations_into_pending_lists() {
        let mut state = state_with_validators(4);
        per_slot_processing(&mut state).unwrap();

        let mut block = block_on(&state);
        block.body.attestations.push(IndexedAttestation {
            attesting_indices: vec![0, 1],
            data: types::AttestationData {
                slot: Slot::new(0),
                index: 0,
                beacon_block_root: Hash256::zero(),
                source: state.current_justified_checkpoint,
                target: Checkpoint::new(Epoch::new(0), Hash256::repeat_byte(1)),
            },
        });

        per_block_processing(&mut state, &block).unwrap();
        assert_eq!(state.current_epoch_attestations.len(), 1);
        assert!(state.previous_epoch_attestations.is_empty());
    }
}
