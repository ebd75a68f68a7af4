use crate::{Error, Store};
use slot_clock::SlotClock;
use std::sync::Arc;
use types::{Checkpoint, Epoch, EthSpec, ForkDigest, SignedBeaconBlock, Slot, SlotAndBlockRoot};

/// Read-only view over the finalized and hot chain data, combined with the wall clock.
///
/// This is the surface handed to components that must never mutate the store, such as peer
/// chain validation.
#[derive(Clone)]
pub struct ChainDataClient<S, E: EthSpec> {
    store: Arc<Store<E>>,
    slot_clock: S,
}

impl<S: SlotClock, E: EthSpec> ChainDataClient<S, E> {
    pub fn new(store: Arc<Store<E>>, slot_clock: S) -> Self {
        Self { store, slot_clock }
    }

    pub fn store(&self) -> &Arc<Store<E>> {
        &self.store
    }

    /// The wall-clock slot, falling back to the genesis slot if the clock reads pre-genesis.
    pub fn current_slot(&self) -> Slot {
        self.slot_clock
            .now()
            .unwrap_or_else(|| self.slot_clock.genesis_slot())
    }

    pub fn current_epoch(&self) -> Epoch {
        self.current_slot().epoch(E::slots_per_epoch())
    }

    pub fn head(&self) -> SlotAndBlockRoot {
        self.store.head()
    }

    pub fn finalized_checkpoint(&self) -> Checkpoint {
        self.store.finalized_checkpoint()
    }

    /// The slot of the latest finalized block (not the finalized epoch's start slot; the two
    /// differ when the epoch-start slot was empty).
    pub fn finalized_block_slot(&self) -> Slot {
        self.store.finalized_slot()
    }

    /// The fork digest in force on our chain.
    pub fn fork_digest(&self) -> ForkDigest {
        self.store.finalized_block_and_state().state.fork_digest
    }

    /// The most recent canonical block with a slot no greater than `slot`.
    pub fn block_in_effect_at_slot(&self, slot: Slot) -> Result<SignedBeaconBlock, Error> {
        self.store.block_in_effect_at_slot(slot)
    }
}
