use crate::{
    BeaconBlockHeader, Checkpoint, Epoch, EthSpec, ForkDigest, Hash256, PendingAttestation, Slot,
    Validator,
};
use ethereum_hashing::hash;
use std::marker::PhantomData;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BeaconStateError {
    /// The requested slot is not covered by the block-roots history ring.
    SlotOutOfBounds { requested: Slot, state_slot: Slot },
    UnknownValidator(u64),
}

/// The state transition function's view of the world at a given slot.
///
/// A heavily reduced registry: RANDAO, eth1 data and the operation queues are maintained by
/// external collaborators. What remains is everything fork choice and finality accounting read.
#[derive(Debug, Clone, PartialEq)]
pub struct BeaconState<E: EthSpec> {
    pub slot: Slot,
    pub genesis_time: u64,
    pub fork_digest: ForkDigest,

    // History
    pub latest_block_header: BeaconBlockHeader,
    pub block_roots: Vec<Hash256>,

    // Registry
    pub validators: Vec<Validator>,
    pub balances: Vec<u64>,

    // Attestations pending epoch processing
    pub previous_epoch_attestations: Vec<PendingAttestation>,
    pub current_epoch_attestations: Vec<PendingAttestation>,

    // Finality
    pub justification_bits: JustificationBits,
    pub previous_justified_checkpoint: Checkpoint,
    pub current_justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,

    _phantom: PhantomData<E>,
}

impl<E: EthSpec> BeaconState<E> {
    /// Instantiate a state at the genesis slot.
    ///
    /// The latest block header is the header of the (implicit) genesis block, whose state root is
    /// left at zero.
    pub fn genesis(
        genesis_time: u64,
        fork_digest: ForkDigest,
        validators: Vec<Validator>,
    ) -> Self {
        let balances = validators.iter().map(|v| v.effective_balance).collect();
        Self {
            slot: Slot::new(0),
            genesis_time,
            fork_digest,
            latest_block_header: crate::BeaconBlock::default().block_header(),
            block_roots: vec![Hash256::zero(); E::slots_per_historical_root()],
            validators,
            balances,
            previous_epoch_attestations: vec![],
            current_epoch_attestations: vec![],
            justification_bits: JustificationBits::default(),
            previous_justified_checkpoint: Checkpoint::default(),
            current_justified_checkpoint: Checkpoint::default(),
            finalized_checkpoint: Checkpoint::default(),
            _phantom: PhantomData,
        }
    }

    pub fn current_epoch(&self) -> Epoch {
        self.slot.epoch(E::slots_per_epoch())
    }

    /// The epoch prior to `self.current_epoch()`, clamped to the genesis epoch.
    pub fn previous_epoch(&self) -> Epoch {
        let current = self.current_epoch();
        if current > Epoch::new(0) {
            current - 1
        } else {
            current
        }
    }

    /// The block root in effect at `slot`, read from the history ring.
    ///
    /// Only valid for slots within `E::slots_per_historical_root()` of `self.slot`, exclusive of
    /// `self.slot` itself.
    pub fn get_block_root_at_slot(&self, slot: Slot) -> Result<Hash256, BeaconStateError> {
        if slot < self.slot && self.slot <= slot + E::slots_per_historical_root() as u64 {
            Ok(self.block_roots[slot.as_usize() % E::slots_per_historical_root()])
        } else {
            Err(BeaconStateError::SlotOutOfBounds {
                requested: slot,
                state_slot: self.slot,
            })
        }
    }

    /// The block root in effect at the start of `epoch`.
    pub fn get_block_root_at_epoch(&self, epoch: Epoch) -> Result<Hash256, BeaconStateError> {
        let slot = epoch.start_slot(E::slots_per_epoch());
        if slot == self.slot {
            // The header for the current slot is not yet in the ring.
            Ok(self.latest_block_header.canonical_root())
        } else {
            self.get_block_root_at_slot(slot)
        }
    }

    pub fn set_block_root_at_slot(&mut self, slot: Slot, root: Hash256) {
        let i = slot.as_usize() % E::slots_per_historical_root();
        self.block_roots[i] = root;
    }

    /// Sum of the effective balances of all validators active in the current epoch.
    pub fn total_active_balance(&self) -> u64 {
        let epoch = self.current_epoch();
        self.validators
            .iter()
            .filter(|v| v.is_active_at(epoch))
            .map(|v| v.effective_balance)
            .sum()
    }

    pub fn effective_balance(&self, validator_index: u64) -> Result<u64, BeaconStateError> {
        self.validators
            .get(validator_index as usize)
            .map(|v| v.effective_balance)
            .ok_or(BeaconStateError::UnknownValidator(validator_index))
    }

    /// Digest standing in for the hash-tree-root of the state.
    pub fn canonical_root(&self) -> Hash256 {
        let mut buf = Vec::with_capacity(256);
        buf.extend_from_slice(&self.slot.as_u64().to_le_bytes());
        buf.extend_from_slice(&self.genesis_time.to_le_bytes());
        buf.extend_from_slice(&self.fork_digest);
        buf.extend_from_slice(self.latest_block_header.canonical_root().as_bytes());
        buf.push(self.justification_bits.as_u8());
        for checkpoint in [
            &self.previous_justified_checkpoint,
            &self.current_justified_checkpoint,
            &self.finalized_checkpoint,
        ] {
            buf.extend_from_slice(&checkpoint.epoch.as_u64().to_le_bytes());
            buf.extend_from_slice(checkpoint.root.as_bytes());
        }
        for balance in &self.balances {
            buf.extend_from_slice(&balance.to_le_bytes());
        }
        Hash256::from_slice(&hash(&buf))
    }
}

/// The four-epoch window of justification bits, bit 0 being the current epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JustificationBits(u8);

impl JustificationBits {
    pub fn get(&self, i: usize) -> bool {
        debug_assert!(i < 4);
        self.0 & (1 << i) != 0
    }

    pub fn set(&mut self, i: usize, value: bool) {
        debug_assert!(i < 4);
        if value {
            self.0 |= 1 << i;
        } else {
            self.0 &= !(1 << i);
        }
    }

    /// Shift every bit towards the past by one epoch, clearing the current-epoch bit.
    pub fn shift_up(&mut self) {
        self.0 = (self.0 << 1) & 0b1111;
    }

    /// True if all of bits `range.start..range.end` are set.
    pub fn all_set(&self, range: std::ops::Range<usize>) -> bool {
        range.into_iter().all(|i| self.get(i))
    }

    pub fn as_u8(&self) -> u8 {
        self.0
    }
}
