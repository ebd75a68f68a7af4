use std::collections::{HashMap, HashSet};
use types::{
    BeaconState, Checkpoint, EthSpec, Hash256, SignedBeaconBlock, SignedBlockAndState, Slot,
    SlotAndBlockRoot, VoteTracker,
};

/// The chain data that became finalized in a commit.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedChainData<E: EthSpec> {
    pub finalized_checkpoint: Checkpoint,
    pub latest_finalized_block_and_state: SignedBlockAndState<E>,
}

/// Emitted on every transaction commit; the durable storage layer applies these idempotently and
/// in order.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageUpdate<E: EthSpec> {
    pub time: Option<u64>,
    pub genesis_time: Option<u64>,
    pub finalized_chain_data: Option<FinalizedChainData<E>>,
    pub justified_checkpoint: Option<Checkpoint>,
    pub best_justified_checkpoint: Option<Checkpoint>,
    pub hot_blocks: HashMap<Hash256, SignedBeaconBlock>,
    /// The subset of staged states flagged for disk persistence.
    pub hot_states_to_persist: HashMap<Hash256, BeaconState<E>>,
    pub pruned_hot_block_roots: HashSet<Hash256>,
    pub votes: HashMap<u64, VoteTracker>,
    pub state_roots: HashMap<Hash256, SlotAndBlockRoot>,
}

/// Emitted when the canonical head moves somewhere that is not a descendant of the previous
/// head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReorgEvent {
    pub best_block_root: Hash256,
    pub best_slot: Slot,
}
