//! The hot (post-finalization) chain store.
//!
//! A single-writer, many-reader structure: readers take point-in-time snapshots, all mutation
//! happens through a [`Transaction`] whose `commit` applies every staged change under one
//! exclusive section and emits a [`StorageUpdate`] for the durable backend.

mod block_tree;
mod client;
mod errors;
mod events;

pub use block_tree::{BlockTree, BlockTreeError};
pub use client::ChainDataClient;
pub use errors::Error;
pub use events::{FinalizedChainData, ReorgEvent, StorageUpdate};

use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::mpsc;
use types::{
    BeaconState, Checkpoint, EthSpec, Hash256, Signature, SignedBeaconBlock, SignedBlockAndState,
    Slot, SlotAndBlockRoot, VoteTracker,
};

struct StoreInner<E: EthSpec> {
    time: u64,
    genesis_time: u64,

    finalized_checkpoint: Checkpoint,
    latest_finalized: SignedBlockAndState<E>,
    justified_checkpoint: Checkpoint,
    best_justified_checkpoint: Checkpoint,

    blocks: HashMap<Hash256, SignedBeaconBlock>,
    block_states: HashMap<Hash256, BeaconState<E>>,
    block_tree: BlockTree,
    votes: HashMap<u64, VoteTracker>,
    state_roots: HashMap<Hash256, SlotAndBlockRoot>,

    head: SlotAndBlockRoot,

    /// Canonical roots below the finalized slot, retained so historical block-in-effect lookups
    /// keep answering after pruning.
    frozen_block_roots: BTreeMap<Slot, Hash256>,
    frozen_blocks: HashMap<Hash256, SignedBeaconBlock>,
}

pub struct Store<E: EthSpec> {
    inner: RwLock<StoreInner<E>>,
    /// Serializes commits so concurrent imports apply in some sequential order.
    transaction_lock: Mutex<()>,
    storage_tx: mpsc::UnboundedSender<StorageUpdate<E>>,
}

impl<E: EthSpec> Store<E> {
    /// Build a store whose finalized, justified and head pointers all sit on the genesis block
    /// derived from `genesis_state`'s latest block header.
    ///
    /// Returns the receiver for the storage-update event stream alongside the store.
    pub fn initialize_from_genesis(
        genesis_state: BeaconState<E>,
    ) -> (Self, mpsc::UnboundedReceiver<StorageUpdate<E>>) {
        let genesis_block = SignedBeaconBlock::from_block(
            types::BeaconBlock::default(),
            Signature::empty(),
        );
        let genesis_root = genesis_block.canonical_root();
        debug_assert_eq!(
            genesis_root,
            genesis_state.latest_block_header.canonical_root()
        );

        let checkpoint = Checkpoint::new(types::Epoch::new(0), genesis_root);
        let genesis_time = genesis_state.genesis_time;

        let mut blocks = HashMap::new();
        blocks.insert(genesis_root, genesis_block.clone());
        let mut block_states = HashMap::new();
        block_states.insert(genesis_root, genesis_state.clone());

        let inner = StoreInner {
            time: genesis_time,
            genesis_time,
            finalized_checkpoint: checkpoint,
            latest_finalized: SignedBlockAndState::new(genesis_block, genesis_state),
            justified_checkpoint: checkpoint,
            best_justified_checkpoint: checkpoint,
            blocks,
            block_states,
            block_tree: BlockTree::new(genesis_root, Slot::new(0)),
            votes: HashMap::new(),
            state_roots: HashMap::new(),
            head: SlotAndBlockRoot {
                slot: Slot::new(0),
                block_root: genesis_root,
            },
            frozen_block_roots: BTreeMap::new(),
            frozen_blocks: HashMap::new(),
        };

        let (storage_tx, storage_rx) = mpsc::unbounded_channel();

        (
            Self {
                inner: RwLock::new(inner),
                transaction_lock: Mutex::new(()),
                storage_tx,
            },
            storage_rx,
        )
    }

    /* Snapshot reads */

    pub fn time(&self) -> u64 {
        self.inner.read().time
    }

    pub fn genesis_time(&self) -> u64 {
        self.inner.read().genesis_time
    }

    pub fn finalized_checkpoint(&self) -> Checkpoint {
        self.inner.read().finalized_checkpoint
    }

    pub fn finalized_block_and_state(&self) -> SignedBlockAndState<E> {
        self.inner.read().latest_finalized.clone()
    }

    pub fn finalized_slot(&self) -> Slot {
        self.inner.read().latest_finalized.block.slot()
    }

    pub fn justified_checkpoint(&self) -> Checkpoint {
        self.inner.read().justified_checkpoint
    }

    pub fn best_justified_checkpoint(&self) -> Checkpoint {
        self.inner.read().best_justified_checkpoint
    }

    pub fn head(&self) -> SlotAndBlockRoot {
        self.inner.read().head
    }

    pub fn contains_block(&self, block_root: &Hash256) -> bool {
        self.inner.read().blocks.contains_key(block_root)
    }

    pub fn block(&self, block_root: &Hash256) -> Option<SignedBeaconBlock> {
        self.inner.read().blocks.get(block_root).cloned()
    }

    pub fn block_state(&self, block_root: &Hash256) -> Option<BeaconState<E>> {
        self.inner.read().block_states.get(block_root).cloned()
    }

    pub fn vote(&self, validator_index: u64) -> VoteTracker {
        self.inner
            .read()
            .votes
            .get(&validator_index)
            .copied()
            .unwrap_or_default()
    }

    pub fn votes(&self) -> HashMap<u64, VoteTracker> {
        self.inner.read().votes.clone()
    }

    /// A point-in-time snapshot of the hot block tree.
    pub fn block_tree(&self) -> BlockTree {
        self.inner.read().block_tree.clone()
    }

    pub fn slot_and_block_root_for_state(&self, state_root: &Hash256) -> Option<SlotAndBlockRoot> {
        self.inner.read().state_roots.get(state_root).copied()
    }

    /// The most recent canonical block with a slot no greater than `slot`.
    ///
    /// Canonical means: along the head's ancestry for hot slots, along the finalized chain below
    /// it. A gap where a block must exist is store corruption and surfaces as
    /// [`Error::MissingHistoricalBlock`].
    pub fn block_in_effect_at_slot(&self, slot: Slot) -> Result<SignedBeaconBlock, Error> {
        let inner = self.inner.read();

        if let Some(root) = inner
            .block_tree
            .ancestor_at_slot(&inner.head.block_root, slot)
        {
            return inner
                .blocks
                .get(&root)
                .cloned()
                .ok_or(Error::MissingHistoricalBlock { slot });
        }

        // Below the hot tree; consult the frozen canonical index.
        let root = inner
            .frozen_block_roots
            .range(..=slot)
            .next_back()
            .map(|(_, root)| *root)
            .ok_or(Error::MissingHistoricalBlock { slot })?;
        inner
            .frozen_blocks
            .get(&root)
            .cloned()
            .ok_or(Error::MissingHistoricalBlock { slot })
    }

    /// Move the head pointer. Emitting any resulting reorg event is the caller's concern.
    pub fn update_head(&self, block_root: Hash256, slot: Slot) {
        self.inner.write().head = SlotAndBlockRoot { slot, block_root };
    }

    pub fn start_transaction(&self) -> Transaction<'_, E> {
        Transaction {
            store: self,
            time: None,
            genesis_time: None,
            justified_checkpoint: None,
            best_justified_checkpoint: None,
            finalized_chain_data: None,
            blocks: HashMap::new(),
            block_states: HashMap::new(),
            states_to_persist: HashSet::new(),
            votes: HashMap::new(),
            state_roots: HashMap::new(),
        }
    }
}

/// A private overlay over the store. Staged changes become visible to readers only after
/// `commit`; a dropped transaction has no effect.
pub struct Transaction<'a, E: EthSpec> {
    store: &'a Store<E>,
    time: Option<u64>,
    genesis_time: Option<u64>,
    justified_checkpoint: Option<Checkpoint>,
    best_justified_checkpoint: Option<Checkpoint>,
    finalized_chain_data: Option<FinalizedChainData<E>>,
    blocks: HashMap<Hash256, SignedBeaconBlock>,
    block_states: HashMap<Hash256, BeaconState<E>>,
    states_to_persist: HashSet<Hash256>,
    votes: HashMap<u64, VoteTracker>,
    state_roots: HashMap<Hash256, SlotAndBlockRoot>,
}

impl<'a, E: EthSpec> Transaction<'a, E> {
    /* Read-through views */

    pub fn contains_block(&self, block_root: &Hash256) -> bool {
        self.blocks.contains_key(block_root) || self.store.contains_block(block_root)
    }

    pub fn block(&self, block_root: &Hash256) -> Option<SignedBeaconBlock> {
        self.blocks
            .get(block_root)
            .cloned()
            .or_else(|| self.store.block(block_root))
    }

    pub fn block_state(&self, block_root: &Hash256) -> Option<BeaconState<E>> {
        self.block_states
            .get(block_root)
            .cloned()
            .or_else(|| self.store.block_state(block_root))
    }

    pub fn justified_checkpoint(&self) -> Checkpoint {
        self.justified_checkpoint
            .unwrap_or_else(|| self.store.justified_checkpoint())
    }

    pub fn finalized_checkpoint(&self) -> Checkpoint {
        self.finalized_chain_data
            .as_ref()
            .map(|f| f.finalized_checkpoint)
            .unwrap_or_else(|| self.store.finalized_checkpoint())
    }

    /* Staging */

    pub fn set_time(&mut self, time: u64) {
        self.time = Some(time);
    }

    pub fn set_genesis_time(&mut self, genesis_time: u64) {
        self.genesis_time = Some(genesis_time);
    }

    pub fn set_justified_checkpoint(&mut self, checkpoint: Checkpoint) {
        self.justified_checkpoint = Some(checkpoint);
    }

    pub fn set_best_justified_checkpoint(&mut self, checkpoint: Checkpoint) {
        self.best_justified_checkpoint = Some(checkpoint);
    }

    pub fn set_finalized_checkpoint(
        &mut self,
        checkpoint: Checkpoint,
        block_and_state: SignedBlockAndState<E>,
    ) {
        self.finalized_chain_data = Some(FinalizedChainData {
            finalized_checkpoint: checkpoint,
            latest_finalized_block_and_state: block_and_state,
        });
    }

    /// Stage a block and its post-state. `persist` flags the state for disk persistence in the
    /// resulting storage update.
    pub fn put_block_and_state(
        &mut self,
        block: SignedBeaconBlock,
        state: BeaconState<E>,
        persist: bool,
    ) {
        let block_root = block.canonical_root();
        self.state_roots.insert(
            state.canonical_root(),
            SlotAndBlockRoot {
                slot: block.slot(),
                block_root,
            },
        );
        if persist {
            self.states_to_persist.insert(block_root);
        }
        self.blocks.insert(block_root, block);
        self.block_states.insert(block_root, state);
    }

    /// Record a latest-message vote, returning `true` if the tracker changed.
    ///
    /// A message only replaces the previous one when its target epoch is strictly greater.
    pub fn record_vote(&mut self, validator_index: u64, root: Hash256, epoch: types::Epoch) -> bool {
        let mut tracker = self
            .votes
            .get(&validator_index)
            .copied()
            .unwrap_or_else(|| self.store.vote(validator_index));

        if tracker.observe(root, epoch) {
            self.votes.insert(validator_index, tracker);
            true
        } else {
            false
        }
    }

    /// Apply every staged change atomically and emit a single `StorageUpdate`.
    ///
    /// Every staged change is validated before anything is applied, so a failing commit leaves
    /// the store exactly as it was.
    pub fn commit(self) -> Result<(), Error> {
        let store = self.store;
        let _commit_guard = store.transaction_lock.lock();
        let mut inner = store.inner.write();

        // Order staged blocks parents-first so intra-transaction chains link up.
        let mut staged: Vec<(Hash256, Slot, Hash256)> = self
            .blocks
            .iter()
            .map(|(root, block)| (*root, block.slot(), block.parent_root()))
            .collect();
        staged.sort_by_key(|(_, slot, _)| *slot);

        // Validation pass: nothing below may fail once mutation starts.
        let mut linkable: HashSet<Hash256> = HashSet::new();
        for (block_root, _, parent_root) in &staged {
            if self.block_states.get(block_root).is_none()
                && !inner.block_states.contains_key(block_root)
            {
                return Err(Error::MissingHotState(*block_root));
            }
            if !inner.block_tree.contains(parent_root) && !linkable.contains(parent_root) {
                return Err(Error::UnknownParent {
                    block_root: *block_root,
                    parent_root: *parent_root,
                });
            }
            linkable.insert(*block_root);
        }

        let is_hot_after_commit =
            |root: &Hash256| inner.block_tree.contains(root) || linkable.contains(root);

        if let Some(justified) = self.justified_checkpoint {
            if !is_hot_after_commit(&justified.root) {
                return Err(Error::JustifiedBlockMissingFromHotSet(justified.root));
            }
        }
        if let Some(finalized) = &self.finalized_chain_data {
            let new_root = finalized.latest_finalized_block_and_state.root();
            if !is_hot_after_commit(&new_root) {
                return Err(Error::UnknownFinalizedBlock(new_root));
            }
        }

        // Apply pass.
        for (block_root, slot, parent_root) in staged {
            inner.block_tree.add_block(block_root, parent_root, slot)?;
        }

        inner.blocks.extend(self.blocks.clone());
        inner.block_states.extend(self.block_states.clone());

        for (validator_index, tracker) in &self.votes {
            inner.votes.insert(*validator_index, *tracker);
        }
        inner.state_roots.extend(self.state_roots.clone());

        if let Some(time) = self.time {
            inner.time = time;
        }
        if let Some(genesis_time) = self.genesis_time {
            inner.genesis_time = genesis_time;
        }

        if let Some(justified) = self.justified_checkpoint {
            inner.justified_checkpoint = justified;
        }

        // `best_justified_checkpoint` is monotone non-decreasing in epoch.
        if let Some(best) = self.best_justified_checkpoint {
            if best.epoch >= inner.best_justified_checkpoint.epoch {
                inner.best_justified_checkpoint = best;
            }
        }

        let mut pruned_hot_block_roots = HashSet::new();

        if let Some(finalized) = &self.finalized_chain_data {
            let new_root = finalized.latest_finalized_block_and_state.root();
            let new_slot = finalized.latest_finalized_block_and_state.slot();

            // Ancestors of the new finalized block stay canonical: they move to the frozen
            // index rather than the pruned set.
            let ancestors: HashSet<Hash256> = inner
                .block_tree
                .chain_to_root(&new_root)
                .into_iter()
                .skip(1)
                .collect();

            let removed = inner.block_tree.prune_to(new_root)?;
            for root in removed {
                let block = inner.blocks.remove(&root);
                inner.block_states.remove(&root);
                if ancestors.contains(&root) {
                    if let Some(block) = block {
                        inner.frozen_block_roots.insert(block.slot(), root);
                        inner.frozen_blocks.insert(root, block);
                    }
                } else {
                    pruned_hot_block_roots.insert(root);
                }
            }

            inner.finalized_checkpoint = finalized.finalized_checkpoint;
            inner.latest_finalized = finalized.latest_finalized_block_and_state.clone();

            if !inner.block_tree.contains(&inner.head.block_root) {
                inner.head = SlotAndBlockRoot {
                    slot: new_slot,
                    block_root: new_root,
                };
            }
        }

        let hot_states_to_persist = self
            .block_states
            .iter()
            .filter(|(root, _)| self.states_to_persist.contains(*root))
            .map(|(root, state)| (*root, state.clone()))
            .collect();

        let update = StorageUpdate {
            time: self.time,
            genesis_time: self.genesis_time,
            finalized_chain_data: self.finalized_chain_data,
            justified_checkpoint: self.justified_checkpoint,
            best_justified_checkpoint: self.best_justified_checkpoint,
            hot_blocks: self.blocks,
            hot_states_to_persist,
            pruned_hot_block_roots,
            votes: self.votes,
            state_roots: self.state_roots,
        };

        drop(inner);

        // The backend consumes updates asynchronously; a closed channel means it has shut down.
        let _ = store.storage_tx.send(update);

        Ok(())
    }
}
