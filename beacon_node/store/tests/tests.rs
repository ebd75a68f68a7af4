use chain_builder::{BlockOptions, ChainBuilder};
use std::sync::Arc;
use store::{Error, Store, StorageUpdate};
use tokio::sync::mpsc::UnboundedReceiver;
use types::{Checkpoint, Epoch, Hash256, MinimalEthSpec, SignedBlockAndState, Slot};

type E = MinimalEthSpec;

fn setup() -> (
    ChainBuilder<E>,
    Arc<Store<E>>,
    UnboundedReceiver<StorageUpdate<E>>,
) {
    let builder: ChainBuilder<E> = ChainBuilder::new(8);
    let (store, storage_rx) = Store::initialize_from_genesis(builder.genesis().state.clone());
    (builder, Arc::new(store), storage_rx)
}

fn stage_blocks(store: &Store<E>, blocks: &[SignedBlockAndState<E>]) {
    let mut tx = store.start_transaction();
    for block in blocks {
        tx.put_block_and_state(block.block.clone(), block.state.clone(), false);
    }
    tx.commit().unwrap();
}

#[test]
fn initializes_with_genesis_everywhere() {
    let (builder, store, _rx) = setup();
    let genesis_root = builder.genesis().root();

    assert_eq!(store.finalized_checkpoint().root, genesis_root);
    assert_eq!(store.justified_checkpoint().root, genesis_root);
    assert_eq!(store.best_justified_checkpoint().root, genesis_root);
    assert_eq!(store.head().block_root, genesis_root);
    assert!(store.contains_block(&genesis_root));
    assert!(store.block_state(&genesis_root).is_some());
}

#[test]
fn commit_makes_staged_changes_visible_atomically() {
    let (mut builder, store, mut rx) = setup();
    let block = builder.generate_block_at_slot(Slot::new(1));

    let mut tx = store.start_transaction();
    tx.put_block_and_state(block.block.clone(), block.state.clone(), true);
    tx.set_time(42);

    // Nothing is visible before the commit.
    assert!(!store.contains_block(&block.root()));
    assert_ne!(store.time(), 42);

    tx.commit().unwrap();

    assert!(store.contains_block(&block.root()));
    assert_eq!(store.time(), 42);

    let update = rx.try_recv().unwrap();
    assert_eq!(update.time, Some(42));
    assert!(update.hot_blocks.contains_key(&block.root()));
    // The state was flagged for persistence.
    assert!(update.hot_states_to_persist.contains_key(&block.root()));
    assert!(update.pruned_hot_block_roots.is_empty());
}

#[test]
fn dropped_transaction_has_no_effect() {
    let (mut builder, store, mut rx) = setup();
    let block = builder.generate_block_at_slot(Slot::new(1));

    {
        let mut tx = store.start_transaction();
        tx.put_block_and_state(block.block.clone(), block.state.clone(), false);
        tx.set_time(42);
        // Dropped without commit.
    }

    assert!(!store.contains_block(&block.root()));
    assert_ne!(store.time(), 42);
    assert!(rx.try_recv().is_err());
}

#[test]
fn commit_rejects_block_with_unknown_parent() {
    let (mut builder, store, _rx) = setup();
    builder.generate_block_at_slot(Slot::new(1));
    let orphan = builder.generate_block_at_slot(Slot::new(2));

    let mut tx = store.start_transaction();
    tx.put_block_and_state(orphan.block.clone(), orphan.state.clone(), false);

    assert!(matches!(
        tx.commit(),
        Err(Error::UnknownParent { .. })
    ));
    assert!(!store.contains_block(&orphan.root()));
}

#[test]
fn intra_transaction_chains_commit_in_one_go() {
    let (mut builder, store, _rx) = setup();
    let blocks = builder.generate_blocks_up_to_slot(Slot::new(3));

    stage_blocks(&store, &blocks);

    for block in &blocks {
        assert!(store.contains_block(&block.root()));
        assert!(store.block_state(&block.root()).is_some());
    }
    assert_eq!(store.block_tree().len(), 4);
}

#[test]
fn justified_checkpoint_must_point_at_a_hot_block() {
    let (_builder, store, _rx) = setup();

    let mut tx = store.start_transaction();
    tx.set_justified_checkpoint(Checkpoint::new(Epoch::new(1), Hash256::repeat_byte(0x99)));

    assert!(matches!(
        tx.commit(),
        Err(Error::JustifiedBlockMissingFromHotSet(_))
    ));
}

#[test]
fn best_justified_checkpoint_is_monotone() {
    let (mut builder, store, _rx) = setup();
    let blocks = builder.generate_blocks_up_to_slot(Slot::new(2));
    stage_blocks(&store, &blocks);

    let mut tx = store.start_transaction();
    tx.set_best_justified_checkpoint(Checkpoint::new(Epoch::new(5), blocks[0].root()));
    tx.commit().unwrap();
    assert_eq!(store.best_justified_checkpoint().epoch, Epoch::new(5));

    // An older checkpoint cannot move it backwards.
    let mut tx = store.start_transaction();
    tx.set_best_justified_checkpoint(Checkpoint::new(Epoch::new(3), blocks[1].root()));
    tx.commit().unwrap();
    assert_eq!(store.best_justified_checkpoint().epoch, Epoch::new(5));
}

#[test]
fn finalization_prunes_side_branches_and_freezes_ancestors() {
    let (mut builder, store, mut rx) = setup();

    let mut fork = builder.fork();
    let fork_block = fork.generate_block_at_slot_with_options(
        Slot::new(1),
        BlockOptions {
            attestations: vec![],
            graffiti: Some([0xab; 32]),
        },
    );
    let canonical = builder.generate_blocks_up_to_slot(Slot::new(3));

    stage_blocks(&store, &canonical);
    stage_blocks(&store, &[fork_block.clone()]);
    while rx.try_recv().is_ok() {}

    // Finalize the canonical block at slot 2.
    let finalized_block = &canonical[1];
    let checkpoint = Checkpoint::new(Epoch::new(1), finalized_block.root());
    let mut tx = store.start_transaction();
    tx.set_finalized_checkpoint(checkpoint, finalized_block.clone());
    tx.commit().unwrap();

    // The tree is re-rooted at the finalized block.
    let tree = store.block_tree();
    assert_eq!(tree.root(), finalized_block.root());
    assert!(tree.contains(&canonical[2].root()));
    assert!(!tree.contains(&fork_block.root()));

    // The side branch is pruned, the canonical ancestors are not.
    let update = rx.try_recv().unwrap();
    assert!(update.pruned_hot_block_roots.contains(&fork_block.root()));
    assert!(!update.pruned_hot_block_roots.contains(&canonical[0].root()));
    assert!(!update
        .pruned_hot_block_roots
        .contains(&builder.genesis().root()));

    // Ancestors left the hot set but remain reachable through historical lookup.
    assert!(!store.contains_block(&canonical[0].root()));
    assert_eq!(
        store.block_in_effect_at_slot(Slot::new(1)).unwrap().canonical_root(),
        canonical[0].root()
    );
    assert_eq!(
        store.block_in_effect_at_slot(Slot::new(0)).unwrap().canonical_root(),
        builder.genesis().root()
    );

    // The head pointer left the pruned region.
    assert_eq!(store.head().block_root, finalized_block.root());

    assert_eq!(store.finalized_checkpoint(), checkpoint);
    assert_eq!(
        store.finalized_block_and_state().root(),
        finalized_block.root()
    );
}

#[test]
fn finalizing_an_unknown_block_is_an_error() {
    let (mut builder, store, _rx) = setup();
    let mut fork = builder.fork();
    let unknown = fork.generate_block_at_slot(Slot::new(1));

    let mut tx = store.start_transaction();
    tx.set_finalized_checkpoint(
        Checkpoint::new(Epoch::new(1), unknown.root()),
        unknown.clone(),
    );

    assert!(matches!(
        tx.commit(),
        Err(Error::UnknownFinalizedBlock(_))
    ));
}

#[test]
fn votes_are_recorded_and_published() {
    let (mut builder, store, mut rx) = setup();
    let block = builder.generate_block_at_slot(Slot::new(1));
    stage_blocks(&store, &[block.clone()]);
    while rx.try_recv().is_ok() {}

    let mut tx = store.start_transaction();
    assert!(tx.record_vote(3, block.root(), Epoch::new(1)));
    // Same epoch: the existing vote stands.
    assert!(!tx.record_vote(3, Hash256::repeat_byte(0x77), Epoch::new(1)));
    tx.commit().unwrap();

    assert_eq!(store.vote(3).root, block.root());
    assert_eq!(store.vote(3).epoch, Epoch::new(1));

    let update = rx.try_recv().unwrap();
    assert_eq!(update.votes.get(&3).map(|v| v.root), Some(block.root()));
}

#[test]
fn state_roots_index_is_maintained() {
    let (mut builder, store, _rx) = setup();
    let block = builder.generate_block_at_slot(Slot::new(1));
    stage_blocks(&store, &[block.clone()]);

    let state_root = block.state.canonical_root();
    let entry = store.slot_and_block_root_for_state(&state_root).unwrap();
    assert_eq!(entry.slot, Slot::new(1));
    assert_eq!(entry.block_root, block.root());
}

#[test]
fn block_in_effect_walks_past_empty_slots() {
    let (mut builder, store, _rx) = setup();
    // Blocks at slots 1 and 4 only.
    let block1 = builder.generate_block_at_slot(Slot::new(1));
    let block4 = builder.generate_block_at_slot(Slot::new(4));
    stage_blocks(&store, &[block1.clone(), block4.clone()]);
    store.update_head(block4.root(), Slot::new(4));

    assert_eq!(
        store.block_in_effect_at_slot(Slot::new(3)).unwrap().canonical_root(),
        block1.root()
    );
    assert_eq!(
        store.block_in_effect_at_slot(Slot::new(4)).unwrap().canonical_root(),
        block4.root()
    );
    // Beyond the head resolves to the head.
    assert_eq!(
        store.block_in_effect_at_slot(Slot::new(9)).unwrap().canonical_root(),
        block4.root()
    );
}
