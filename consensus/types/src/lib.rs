//! Types used across the consensus core.
//!
//! SSZ encoding, tree hashing and BLS verification are external collaborators; the
//! `canonical_root` digests defined here stand in for hash-tree-root identities.

#[macro_use]
mod slot_epoch_macros;

mod attestation;
mod beacon_block;
mod beacon_state;
mod chain_spec;
mod checkpoint;
mod eth_spec;
mod slot_epoch;
mod validator;
mod vote;

pub use attestation::{AttestationData, IndexedAttestation, PendingAttestation};
pub use beacon_block::{
    BeaconBlock, BeaconBlockBody, BeaconBlockHeader, Signature, SignedBeaconBlock,
};
pub use beacon_state::{BeaconState, BeaconStateError, JustificationBits};
pub use chain_spec::ChainSpec;
pub use checkpoint::Checkpoint;
pub use eth_spec::{EthSpec, MainnetEthSpec, MinimalEthSpec};
pub use slot_epoch::{Epoch, Slot};
pub use validator::Validator;
pub use vote::VoteTracker;

pub use ethereum_types::H256 as Hash256;

/// Four-byte tag identifying the fork protocol in force.
pub type ForkDigest = [u8; 4];

/// A block and its post-state, bundled because most store operations move them together.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedBlockAndState<E: EthSpec> {
    pub block: SignedBeaconBlock,
    pub state: BeaconState<E>,
}

impl<E: EthSpec> SignedBlockAndState<E> {
    pub fn new(block: SignedBeaconBlock, state: BeaconState<E>) -> Self {
        Self { block, state }
    }

    pub fn root(&self) -> Hash256 {
        self.block.canonical_root()
    }

    pub fn slot(&self) -> Slot {
        self.block.slot()
    }
}

/// A slot paired with the root of the block in effect at that slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotAndBlockRoot {
    pub slot: Slot,
    pub block_root: Hash256,
}
