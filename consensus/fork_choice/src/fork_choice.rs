use crate::{lmd_ghost, metrics};
use parking_lot::Mutex;
use slog::{debug, trace, warn, Logger};
use slot_clock::SlotClock;
use state_processing::{state_transition, StateTransitionError};
use std::sync::Arc;
use store::{ReorgEvent, Store, Transaction};
use tokio::sync::mpsc;
use types::{
    BeaconState, Checkpoint, Epoch, EthSpec, Hash256, IndexedAttestation, SignedBeaconBlock,
    SignedBlockAndState, Slot,
};

#[derive(Debug)]
pub enum Error {
    InvalidAttestation(InvalidAttestation),
    StoreError(store::Error),
    /// The justified checkpoint does not resolve to a hot block and state. The store is
    /// corrupt; head selection cannot proceed.
    MissingJustifiedBlock { justified_checkpoint: Checkpoint },
}

impl From<store::Error> for Error {
    fn from(e: store::Error) -> Self {
        Error::StoreError(e)
    }
}

impl From<InvalidAttestation> for Error {
    fn from(e: InvalidAttestation) -> Self {
        Error::InvalidAttestation(e)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InvalidAttestation {
    /// The attestation's attesting indices were empty when they shouldn't be.
    EmptyAggregationBitfield,
    /// The `attestation.data.beacon_block_root` block is unknown.
    UnknownHeadBlock { beacon_block_root: Hash256 },
    /// The `attestation.data.slot` is not from the same epoch as `data.target.epoch` and
    /// therefore the attestation is invalid.
    BadTargetEpoch { target: Epoch, slot: Slot },
    /// The attestation is for an epoch in the future.
    FutureEpoch {
        attestation_epoch: Epoch,
        current_epoch: Epoch,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum InvalidBlock {
    /// The block's slot does not come after the finalized epoch's start slot.
    FinalizedSlot {
        finalized_slot: Slot,
        block_slot: Slot,
    },
}

/// The outcome of `ForkChoice::on_block`.
#[derive(Debug)]
pub enum BlockImportResult {
    Successful { block_root: Hash256 },
    InvalidBlock(InvalidBlock),
    FailedStateTransition(StateTransitionError),
    /// The block's slot is later than the wall clock; the caller may retry once it is not.
    BlockIsFromFuture { block_slot: Slot },
    /// The parent is neither a hot block nor the finalized block; retry after syncing it.
    ParentUnknown { parent_root: Hash256 },
}

impl BlockImportResult {
    pub fn is_successful(&self) -> bool {
        matches!(self, BlockImportResult::Successful { .. })
    }
}

/// Used for queuing attestations from the current slot. Only contains the minimum necessary
/// information about the attestation.
#[derive(Debug, Clone, PartialEq)]
struct QueuedAttestation {
    slot: Slot,
    attesting_indices: Vec<u64>,
    block_root: Hash256,
    target_epoch: Epoch,
}

impl From<&IndexedAttestation> for QueuedAttestation {
    fn from(a: &IndexedAttestation) -> Self {
        Self {
            slot: a.data.slot,
            attesting_indices: a.attesting_indices.clone(),
            block_root: a.data.beacon_block_root,
            target_epoch: a.data.target.epoch,
        }
    }
}

/// Returns all values in `queued_attestations` that have a slot that is earlier than the
/// current slot. Also removes those values from `queued_attestations`.
fn dequeue_attestations(
    current_slot: Slot,
    queued_attestations: &mut Vec<QueuedAttestation>,
) -> Vec<QueuedAttestation> {
    let remaining = queued_attestations.split_off(
        queued_attestations
            .iter()
            .position(|a| a.slot >= current_slot)
            .unwrap_or(queued_attestations.len()),
    );

    std::mem::replace(queued_attestations, remaining)
}

/// Maintains the canonical head over the store's tree of hot blocks.
///
/// Three public operations: `on_block` imports a block, `process_head` runs LMD-GHOST and
/// `on_attestation` applies a latest-message vote. Reorg events are emitted whenever the head
/// moves somewhere that is not a descendant extension of the previous head.
pub struct ForkChoice<S, E: EthSpec> {
    store: Arc<Store<E>>,
    slot_clock: S,
    /// Attestations that arrived at the current slot and must be queued for later processing.
    queued_attestations: Mutex<Vec<QueuedAttestation>>,
    reorg_tx: mpsc::UnboundedSender<ReorgEvent>,
    log: Logger,
}

impl<S: SlotClock, E: EthSpec> ForkChoice<S, E> {
    /// Returns the engine along with the receiving end of its reorg event stream.
    pub fn new(
        store: Arc<Store<E>>,
        slot_clock: S,
        log: Logger,
    ) -> (Self, mpsc::UnboundedReceiver<ReorgEvent>) {
        let (reorg_tx, reorg_rx) = mpsc::unbounded_channel();
        (
            Self {
                store,
                slot_clock,
                queued_attestations: Mutex::new(vec![]),
                reorg_tx,
                log,
            },
            reorg_rx,
        )
    }

    pub fn store(&self) -> &Arc<Store<E>> {
        &self.store
    }

    fn current_slot(&self) -> Slot {
        self.slot_clock
            .now()
            .unwrap_or_else(|| self.slot_clock.genesis_slot())
    }

    /// Import a block, staging it and its post-state into the store.
    ///
    /// `pre_state_hint` is used as the transition's starting point when it belongs to the
    /// block's parent; otherwise the parent's post-state is fetched from the store. The store
    /// is left untouched on every non-successful outcome.
    pub async fn on_block(
        &self,
        signed_block: SignedBeaconBlock,
        pre_state_hint: Option<BeaconState<E>>,
    ) -> Result<BlockImportResult, Error> {
        let block_root = signed_block.canonical_root();
        let block_slot = signed_block.slot();
        let parent_root = signed_block.parent_root();

        // Re-importing a known block is a no-op: same head, no new reorg.
        if self.store.contains_block(&block_root) {
            return Ok(BlockImportResult::Successful { block_root });
        }

        if block_slot > self.current_slot() {
            return Ok(BlockImportResult::BlockIsFromFuture { block_slot });
        }

        let finalized = self.store.finalized_checkpoint();
        let finalized_slot = finalized.epoch_start_slot(E::slots_per_epoch());
        if block_slot <= finalized_slot {
            return Ok(BlockImportResult::InvalidBlock(InvalidBlock::FinalizedSlot {
                finalized_slot,
                block_slot,
            }));
        }

        if !self.store.contains_block(&parent_root) {
            return Ok(BlockImportResult::ParentUnknown { parent_root });
        }

        let pre_state = match pre_state_hint
            .filter(|state| state.latest_block_header.canonical_root() == parent_root)
        {
            Some(state) => state,
            None => self
                .store
                .block_state(&parent_root)
                .ok_or(store::Error::MissingHotState(parent_root))?,
        };

        let mut state = pre_state;
        if let Err(e) = state_transition(&mut state, &signed_block) {
            trace!(
                self.log,
                "Block failed state transition";
                "block_root" => ?block_root,
                "slot" => %block_slot,
                "error" => ?e,
            );
            return Ok(BlockImportResult::FailedStateTransition(e));
        }

        let mut tx = self.store.start_transaction();

        // Epoch-boundary states are flagged for disk persistence.
        let persist = block_slot % E::slots_per_epoch() == Slot::new(0);
        tx.put_block_and_state(signed_block.clone(), state.clone(), persist);

        self.update_checkpoints(&mut tx, &state)?;

        // Votes carried by the block are applied after it is staged and before the commit, so
        // the whole import lands atomically.
        for attestation in &signed_block.message.body.attestations {
            self.apply_votes(&mut tx, &QueuedAttestation::from(attestation));
        }

        tx.commit()?;

        metrics::inc_counter(&metrics::BLOCK_IMPORTS);
        debug!(
            self.log,
            "Block imported";
            "block_root" => ?block_root,
            "slot" => %block_slot,
        );

        // Fast path: a child of the current head becomes the head without a full tree walk.
        let head = self.store.head();
        if parent_root == head.block_root {
            self.store.update_head(block_root, block_slot);
            self.maybe_emit_reorg(head.block_root, head.slot, block_root, block_slot);
        }

        Ok(BlockImportResult::Successful { block_root })
    }

    /// Run LMD-GHOST over the hot tree with the votes known as of `node_slot` and move the
    /// store's head pointer to the result.
    pub fn process_head(&self, node_slot: Slot) -> Result<Hash256, Error> {
        metrics::inc_counter(&metrics::PROCESS_HEAD_RUNS);

        let dequeued = dequeue_attestations(node_slot, &mut self.queued_attestations.lock());
        if !dequeued.is_empty() {
            let mut tx = self.store.start_transaction();
            for attestation in &dequeued {
                self.apply_votes(&mut tx, attestation);
            }
            tx.commit()?;
        }

        let justified_checkpoint = self.store.justified_checkpoint();
        let justified_state = self
            .store
            .block_state(&justified_checkpoint.root)
            .ok_or(Error::MissingJustifiedBlock {
                justified_checkpoint,
            })?;

        let tree = self.store.block_tree();
        let votes = self.store.votes();

        let head_root =
            lmd_ghost::find_head(&tree, &votes, &justified_state, justified_checkpoint.root)
                .ok_or(Error::MissingJustifiedBlock {
                    justified_checkpoint,
                })?;

        let old_head = self.store.head();
        self.store.update_head(head_root, node_slot);
        self.maybe_emit_reorg(old_head.block_root, old_head.slot, head_root, node_slot);

        Ok(head_root)
    }

    /// Apply a latest-message vote for each attesting index.
    ///
    /// Attestations from the current or a future slot are queued and applied by the next
    /// `process_head` whose node slot has moved past them.
    pub fn on_attestation(&self, attestation: &IndexedAttestation) -> Result<(), Error> {
        if attestation.is_empty() {
            return Err(InvalidAttestation::EmptyAggregationBitfield.into());
        }

        let target = attestation.data.target;
        let current_epoch = self.current_slot().epoch(E::slots_per_epoch());
        if target.epoch > current_epoch {
            return Err(InvalidAttestation::FutureEpoch {
                attestation_epoch: target.epoch,
                current_epoch,
            }
            .into());
        }

        if attestation.data.slot.epoch(E::slots_per_epoch()) != target.epoch {
            return Err(InvalidAttestation::BadTargetEpoch {
                target: target.epoch,
                slot: attestation.data.slot,
            }
            .into());
        }

        if attestation.data.slot >= self.current_slot() {
            self.queued_attestations
                .lock()
                .push(QueuedAttestation::from(attestation));
            return Ok(());
        }

        if !self.store.contains_block(&attestation.data.beacon_block_root) {
            return Err(InvalidAttestation::UnknownHeadBlock {
                beacon_block_root: attestation.data.beacon_block_root,
            }
            .into());
        }

        let mut tx = self.store.start_transaction();
        self.apply_votes(&mut tx, &QueuedAttestation::from(attestation));
        tx.commit()?;

        Ok(())
    }

    fn apply_votes(&self, tx: &mut Transaction<'_, E>, attestation: &QueuedAttestation) {
        for validator_index in &attestation.attesting_indices {
            let updated = tx.record_vote(
                *validator_index,
                attestation.block_root,
                attestation.target_epoch,
            );
            if updated {
                trace!(
                    self.log,
                    "Vote updated";
                    "validator" => validator_index,
                    "block_root" => ?attestation.block_root,
                    "target_epoch" => %attestation.target_epoch,
                );
            }
        }
    }

    /// Stage justified/finalized checkpoint advances carried by a freshly computed post-state.
    fn update_checkpoints(
        &self,
        tx: &mut Transaction<'_, E>,
        state: &BeaconState<E>,
    ) -> Result<(), Error> {
        if state.current_justified_checkpoint.epoch > tx.justified_checkpoint().epoch {
            tx.set_justified_checkpoint(state.current_justified_checkpoint);
            tx.set_best_justified_checkpoint(state.current_justified_checkpoint);
        }

        if state.finalized_checkpoint.epoch > tx.finalized_checkpoint().epoch {
            let root = state.finalized_checkpoint.root;
            let block = tx
                .block(&root)
                .ok_or(store::Error::MissingHistoricalBlock {
                    slot: state
                        .finalized_checkpoint
                        .epoch_start_slot(E::slots_per_epoch()),
                })?;
            let block_state = tx.block_state(&root).ok_or(store::Error::MissingHotState(root))?;
            tx.set_finalized_checkpoint(
                state.finalized_checkpoint,
                SignedBlockAndState::new(block, block_state),
            );
        }

        Ok(())
    }

    /// A reorg happened iff the new head's chain at the old best slot does not pass through the
    /// old head, i.e. the move was lateral rather than a descendant extension. Pure slot
    /// advances with an unchanged head never emit.
    fn maybe_emit_reorg(
        &self,
        old_root: Hash256,
        old_slot: Slot,
        new_root: Hash256,
        new_slot: Slot,
    ) {
        if new_root == old_root {
            return;
        }

        let tree = self.store.block_tree();
        if tree.ancestor_at_slot(&new_root, old_slot) == Some(old_root) {
            return;
        }

        metrics::inc_counter(&metrics::REORGS);
        warn!(
            self.log,
            "Chain reorganisation";
            "previous_head" => ?old_root,
            "previous_slot" => %old_slot,
            "new_head" => ?new_root,
            "new_slot" => %new_slot,
        );
        let _ = self.reorg_tx.send(ReorgEvent {
            best_block_root: new_root,
            best_slot: new_slot,
        });
    }
}
