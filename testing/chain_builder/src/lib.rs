//! A deterministic chain generator for tests.
//!
//! Blocks are produced by running the real state transition, so everything a builder emits can
//! be imported by fork choice without special-casing.

use state_processing::{per_block_processing, process_slots};
use types::{
    AttestationData, BeaconBlock, BeaconState, Checkpoint, EthSpec, ForkDigest, Hash256,
    IndexedAttestation, Signature, SignedBeaconBlock, SignedBlockAndState, Slot, Validator,
};

pub const DEFAULT_EFFECTIVE_BALANCE: u64 = 32_000_000_000;

/// Extra inputs for a generated block.
#[derive(Debug, Clone, Default)]
pub struct BlockOptions {
    pub attestations: Vec<IndexedAttestation>,
    /// Distinguishes otherwise-identical blocks, e.g. two forks at the same slot.
    pub graffiti: Option<[u8; 32]>,
}

pub struct ChainBuilder<E: EthSpec> {
    chain: Vec<SignedBlockAndState<E>>,
    validator_count: usize,
}

impl<E: EthSpec> ChainBuilder<E> {
    pub fn new(validator_count: usize) -> Self {
        Self::with_fork_digest(validator_count, E::default_spec().genesis_fork_digest)
    }

    pub fn with_fork_digest(validator_count: usize, fork_digest: ForkDigest) -> Self {
        let validators = (0..validator_count)
            .map(|_| Validator {
                effective_balance: DEFAULT_EFFECTIVE_BALANCE,
                slashed: false,
                activation_epoch: types::Epoch::new(0),
                exit_epoch: types::Epoch::max_value(),
            })
            .collect();

        let genesis_state: BeaconState<E> = BeaconState::genesis(0, fork_digest, validators);
        let genesis_block =
            SignedBeaconBlock::from_block(BeaconBlock::default(), Signature::empty());

        Self {
            chain: vec![SignedBlockAndState::new(genesis_block, genesis_state)],
            validator_count,
        }
    }

    pub fn genesis(&self) -> &SignedBlockAndState<E> {
        &self.chain[0]
    }

    pub fn latest(&self) -> &SignedBlockAndState<E> {
        self.chain.last().expect("chain always contains genesis")
    }

    /// The block generated at exactly `slot`, if any.
    pub fn block_at_slot(&self, slot: Slot) -> Option<&SignedBlockAndState<E>> {
        self.chain.iter().find(|b| b.slot() == slot)
    }

    /// The most recent block with a slot no greater than `slot`.
    pub fn block_in_effect_at_slot(&self, slot: Slot) -> &SignedBlockAndState<E> {
        self.chain
            .iter()
            .rev()
            .find(|b| b.slot() <= slot)
            .expect("genesis covers every slot")
    }

    /// The parent of the block generated at `slot`.
    pub fn parent_of(&self, block: &SignedBlockAndState<E>) -> Option<&SignedBlockAndState<E>> {
        self.chain
            .iter()
            .find(|b| b.root() == block.block.parent_root())
    }

    /// Start an independent branch from the current chain.
    pub fn fork(&self) -> Self {
        Self {
            chain: self.chain.clone(),
            validator_count: self.validator_count,
        }
    }

    pub fn generate_block_at_slot(&mut self, slot: Slot) -> SignedBlockAndState<E> {
        self.generate_block_at_slot_with_options(slot, BlockOptions::default())
    }

    pub fn generate_block_at_slot_with_options(
        &mut self,
        slot: Slot,
        options: BlockOptions,
    ) -> SignedBlockAndState<E> {
        let parent = self.latest();
        assert!(
            slot > parent.slot(),
            "block slot {} must be after the latest block at {}",
            slot,
            parent.slot()
        );

        let mut state = parent.state.clone();
        let parent_root = parent.root();
        process_slots(&mut state, slot).expect("builder states advance cleanly");

        let mut block = BeaconBlock {
            slot,
            proposer_index: slot.as_u64() % self.validator_count.max(1) as u64,
            parent_root,
            // Post-state roots are not verified by the core; the identity of a block is carried
            // by its slot, parent and body.
            state_root: Hash256::zero(),
            ..BeaconBlock::default()
        };
        block.body.attestations = options.attestations;
        if let Some(graffiti) = options.graffiti {
            block.body.graffiti = graffiti;
        }

        per_block_processing(&mut state, &block).expect("builder blocks apply cleanly");

        let block_and_state =
            SignedBlockAndState::new(SignedBeaconBlock::from_block(block, Signature::empty()), state);
        self.chain.push(block_and_state.clone());
        block_and_state
    }

    /// One block per slot up to and including `slot`.
    pub fn generate_blocks_up_to_slot(&mut self, slot: Slot) -> Vec<SignedBlockAndState<E>> {
        let mut generated = vec![];
        let mut next = self.latest().slot() + 1;
        while next <= slot {
            generated.push(self.generate_block_at_slot(next));
            next += 1;
        }
        generated
    }

    /// One block per slot, each carrying a full-participation attestation for its parent, which
    /// drives justification and finalization forward.
    pub fn generate_attested_blocks_up_to_slot(
        &mut self,
        slot: Slot,
    ) -> Vec<SignedBlockAndState<E>> {
        let all_validators: Vec<u64> = (0..self.validator_count as u64).collect();
        let mut generated = vec![];
        let mut next = self.latest().slot() + 1;
        while next <= slot {
            let attestation = self.attestation_for_head(&all_validators);
            let options = BlockOptions {
                attestations: vec![attestation],
                graffiti: None,
            };
            generated.push(self.generate_block_at_slot_with_options(next, options));
            next += 1;
        }
        generated
    }

    /// An attestation by `indices` voting for the current head and its epoch checkpoint.
    pub fn attestation_for_head(&self, indices: &[u64]) -> IndexedAttestation {
        let head = self.latest();
        let epoch = head.state.current_epoch();
        let target_root = head
            .state
            .get_block_root_at_epoch(epoch)
            .expect("builder heads cover their own epoch");

        IndexedAttestation {
            attesting_indices: indices.to_vec(),
            data: AttestationData {
                slot: head.slot(),
                index: 0,
                beacon_block_root: head.root(),
                source: head.state.current_justified_checkpoint,
                target: Checkpoint::new(epoch, target_root),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::MinimalEthSpec;

    #[test]
    fn generates_importable_chain() {
        let mut builder: ChainBuilder<MinimalEthSpec> = ChainBuilder::new(8);
        let blocks = builder.generate_blocks_up_to_slot(Slot::new(5));

        assert_eq!(blocks.len(), 5);
        assert_eq!(blocks[0].block.parent_root(), builder.genesis().root());
        for pair in blocks.windows(2) {
            assert_eq!(pair[1].block.parent_root(), pair[0].root());
        }
    }

    #[test]
    fn forks_diverge() {
        let mut builder: ChainBuilder<MinimalEthSpec> = ChainBuilder::new(8);
        let mut fork = builder.fork();

        let canonical = builder.generate_block_at_slot(Slot::new(1));
        let forked = fork.generate_block_at_slot_with_options(
            Slot::new(1),
            BlockOptions {
                attestations: vec![],
                graffiti: Some([0xab; 32]),
            },
        );

        assert_ne!(canonical.root(), forked.root());
        assert_eq!(canonical.block.parent_root(), forked.block.parent_root());
    }

    #[test]
    fn attested_chain_finalizes() {
        let mut builder: ChainBuilder<MinimalEthSpec> = ChainBuilder::new(8);
        let slots_per_epoch = MinimalEthSpec::slots_per_epoch();
        builder.generate_attested_blocks_up_to_slot(Slot::new(slots_per_epoch * 5));

        let state = &builder.latest().state;
        assert!(state.finalized_checkpoint.epoch >= types::Epoch::new(2));
    }
}
