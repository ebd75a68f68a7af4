use chain_builder::{BlockOptions, ChainBuilder};
use fork_choice::{BlockImportResult, ForkChoice, InvalidBlock};
use slog::o;
use slot_clock::{ManualSlotClock, SlotClock};
use std::sync::Arc;
use std::time::Duration;
use store::{ReorgEvent, Store, StorageUpdate};
use tokio::sync::mpsc::UnboundedReceiver;
use types::{EthSpec, MinimalEthSpec, SignedBlockAndState, Slot};

type E = MinimalEthSpec;

struct Harness {
    builder: ChainBuilder<E>,
    store: Arc<Store<E>>,
    clock: ManualSlotClock,
    fork_choice: ForkChoice<ManualSlotClock, E>,
    reorg_rx: UnboundedReceiver<ReorgEvent>,
    #[allow(dead_code)]
    storage_rx: UnboundedReceiver<StorageUpdate<E>>,
}

fn harness() -> Harness {
    let builder: ChainBuilder<E> = ChainBuilder::new(8);
    let (store, storage_rx) = Store::initialize_from_genesis(builder.genesis().state.clone());
    let store = Arc::new(store);
    let clock = ManualSlotClock::new(
        Slot::new(0),
        Duration::from_secs(0),
        Duration::from_secs(6),
    );
    // Keep the wall clock well ahead so generated blocks are never "from the future".
    clock.set_slot(1_000);

    let log = slog::Logger::root(slog::Discard, o!());
    let (fork_choice, reorg_rx) = ForkChoice::new(store.clone(), clock.clone(), log);

    Harness {
        builder,
        store,
        clock,
        fork_choice,
        reorg_rx,
        storage_rx,
    }
}

impl Harness {
    async fn import(&self, block_and_state: &SignedBlockAndState<E>) {
        let pre_state = self
            .builder
            .parent_of(block_and_state)
            .map(|parent| parent.state.clone());
        let result = self
            .fork_choice
            .on_block(block_and_state.block.clone(), pre_state)
            .await
            .expect("import must not hit a store error");
        assert!(result.is_successful(), "unexpected result: {:?}", result);
    }

    fn drain_reorgs(&mut self) -> Vec<ReorgEvent> {
        let mut events = vec![];
        while let Ok(event) = self.reorg_rx.try_recv() {
            events.push(event);
        }
        events
    }
}

#[tokio::test]
async fn empty_head_slot_filled_triggers_reorg() {
    let mut harness = harness();

    // Run fork choice with an empty slot 1.
    harness.fork_choice.process_head(Slot::new(1)).unwrap();
    assert!(harness.drain_reorgs().is_empty());

    // Then rerun with a filled slot 1.
    let slot1_block = harness.builder.generate_block_at_slot(Slot::new(1));
    harness.import(&slot1_block).await;
    harness.fork_choice.process_head(Slot::new(1)).unwrap();

    let reorgs = harness.drain_reorgs();
    assert_eq!(reorgs.len(), 1);
    assert_eq!(reorgs[0].best_slot, Slot::new(1));
    assert_eq!(reorgs[0].best_block_root, slot1_block.root());
}

#[tokio::test]
async fn child_of_current_head_immediately_becomes_head() {
    let mut harness = harness();

    let block = harness.builder.generate_block_at_slot(Slot::new(1));
    harness.import(&block).await;

    let head = harness.store.head();
    assert_eq!(head.block_root, block.root());
    assert_eq!(head.slot, Slot::new(1));
    // A plain descendant extension is not a reorg.
    assert!(harness.drain_reorgs().is_empty());
}

#[tokio::test]
async fn child_of_head_reorgs_when_fork_choice_slot_has_advanced() {
    let mut harness = harness();

    // Advance the current head past the block's slot.
    harness.fork_choice.process_head(Slot::new(5)).unwrap();

    let block = harness.builder.generate_block_at_slot(Slot::new(1));
    harness.import(&block).await;

    let head = harness.store.head();
    assert_eq!(head.block_root, block.root());
    assert_eq!(head.slot, Slot::new(1));

    let reorgs = harness.drain_reorgs();
    assert_eq!(reorgs.len(), 1);
    assert_eq!(reorgs[0].best_block_root, block.root());
    assert_eq!(reorgs[0].best_slot, Slot::new(1));
}

#[tokio::test]
async fn votes_in_blocks_move_the_head_across_forks() {
    let mut harness = harness();

    // A lone fork block which briefly becomes the head.
    let mut fork = harness.builder.fork();
    let fork_block = fork.generate_block_at_slot_with_options(
        Slot::new(1),
        BlockOptions {
            attestations: vec![],
            graffiti: Some([0xab; 32]),
        },
    );
    harness.import(&fork_block).await;
    assert_eq!(harness.store.head().block_root, fork_block.root());

    // A longer chain on the canonical builder, not yet attested to.
    let better_chain = harness.builder.generate_blocks_up_to_slot(Slot::new(3));
    for block in &better_chain {
        harness.import(block).await;
    }
    // No attestations and no head run yet, so the head is unchanged.
    assert_eq!(harness.store.head().block_root, fork_block.root());

    // A block carrying attestations for the longer chain.
    let attestation = harness.builder.attestation_for_head(&[0, 1, 2]);
    let attested_block = harness.builder.generate_block_at_slot_with_options(
        Slot::new(4),
        BlockOptions {
            attestations: vec![attestation],
            graffiti: None,
        },
    );
    harness.import(&attested_block).await;

    let head = harness.fork_choice.process_head(Slot::new(4)).unwrap();
    assert_eq!(head, attested_block.root());
    assert_eq!(harness.store.head().block_root, attested_block.root());
}

#[tokio::test]
async fn importing_the_same_block_twice_is_idempotent() {
    let mut harness = harness();

    let block = harness.builder.generate_block_at_slot(Slot::new(1));
    harness.import(&block).await;
    let head_after_first = harness.store.head();
    harness.drain_reorgs();

    harness.import(&block).await;

    assert_eq!(harness.store.head(), head_after_first);
    assert!(harness.drain_reorgs().is_empty());
}

#[tokio::test]
async fn block_from_the_future_is_rejected() {
    let harness = harness();
    harness.clock.set_slot(0);

    let mut builder = harness.builder.fork();
    let block = builder.generate_block_at_slot(Slot::new(1));

    let result = harness
        .fork_choice
        .on_block(block.block.clone(), None)
        .await
        .unwrap();

    assert!(matches!(
        result,
        BlockImportResult::BlockIsFromFuture { block_slot } if block_slot == Slot::new(1)
    ));
    assert!(!harness.store.contains_block(&block.root()));
}

#[tokio::test]
async fn block_with_unknown_parent_is_rejected() {
    let harness = harness();

    let mut builder = harness.builder.fork();
    builder.generate_block_at_slot(Slot::new(1));
    let orphan = builder.generate_block_at_slot(Slot::new(2));

    let result = harness
        .fork_choice
        .on_block(orphan.block.clone(), None)
        .await
        .unwrap();

    assert!(matches!(
        result,
        BlockImportResult::ParentUnknown { parent_root } if parent_root == orphan.block.parent_root()
    ));
}

#[tokio::test]
async fn failed_state_transition_leaves_store_unchanged() {
    let harness = harness();

    let mut builder = harness.builder.fork();
    let mut block = builder.generate_block_at_slot(Slot::new(1));
    // Corrupt the proposer so block processing fails.
    block.block.message.proposer_index = 1_000;
    let tampered_root = block.block.canonical_root();

    let result = harness
        .fork_choice
        .on_block(block.block.clone(), None)
        .await
        .unwrap();

    assert!(matches!(
        result,
        BlockImportResult::FailedStateTransition(_)
    ));
    assert!(!harness.store.contains_block(&tampered_root));
    assert_eq!(harness.store.head().block_root, harness.builder.genesis().root());
}

#[tokio::test]
async fn attested_chain_finalizes_and_prunes() {
    let mut harness = harness();

    let slots_per_epoch = E::slots_per_epoch();
    let blocks = harness
        .builder
        .generate_attested_blocks_up_to_slot(Slot::new(slots_per_epoch * 5));
    for block in &blocks {
        harness.import(block).await;
    }

    let finalized = harness.store.finalized_checkpoint();
    assert!(finalized.epoch >= types::Epoch::new(2));

    // The tree is re-rooted at the finalized block and blocks below it left the hot set.
    let tree = harness.store.block_tree();
    assert_eq!(tree.root(), finalized.root);
    assert!(!harness.store.contains_block(&harness.builder.genesis().root()));

    // Historical lookups below the finalized slot still answer.
    let genesis_block = harness.store.block_in_effect_at_slot(Slot::new(0)).unwrap();
    assert_eq!(genesis_block.canonical_root(), harness.builder.genesis().root());

    // Every hot block retains its cached post-state.
    let finalized_slot = harness.store.finalized_slot();
    for block in &blocks {
        if block.slot() >= finalized_slot {
            assert!(harness.store.contains_block(&block.root()));
            assert!(harness.store.block_state(&block.root()).is_some());
        }
    }

    let head = harness.fork_choice.process_head(blocks.last().unwrap().slot()).unwrap();
    assert_eq!(head, blocks.last().unwrap().root());
}

#[tokio::test]
async fn block_at_or_below_finalized_slot_is_rejected() {
    let mut harness = harness();

    let slots_per_epoch = E::slots_per_epoch();
    let mut fork = harness.builder.fork();

    let blocks = harness
        .builder
        .generate_attested_blocks_up_to_slot(Slot::new(slots_per_epoch * 5));
    for block in &blocks {
        harness.import(block).await;
    }
    let finalized = harness.store.finalized_checkpoint();
    assert!(finalized.epoch >= types::Epoch::new(2));

    // A competing block from before finality.
    let stale = fork.generate_block_at_slot_with_options(
        Slot::new(1),
        BlockOptions {
            attestations: vec![],
            graffiti: Some([0xcd; 32]),
        },
    );

    let result = harness
        .fork_choice
        .on_block(stale.block.clone(), None)
        .await
        .unwrap();

    assert!(matches!(
        result,
        BlockImportResult::InvalidBlock(InvalidBlock::FinalizedSlot { .. })
    ));
}

#[tokio::test]
async fn head_is_deterministic_for_identical_inputs() {
    let harness_a = harness();
    let harness_b = harness();

    // Both harnesses share the same deterministic genesis; build one set of forked chains and
    // import it into each in a different arrival order.
    let mut builder: ChainBuilder<E> = ChainBuilder::new(8);
    let mut fork = builder.fork();
    let fork_block = fork.generate_block_at_slot_with_options(
        Slot::new(1),
        BlockOptions {
            attestations: vec![],
            graffiti: Some([0xab; 32]),
        },
    );
    let canonical_blocks = builder.generate_blocks_up_to_slot(Slot::new(2));

    harness_a
        .fork_choice
        .on_block(fork_block.block.clone(), None)
        .await
        .unwrap();
    for block in &canonical_blocks {
        harness_a
            .fork_choice
            .on_block(block.block.clone(), None)
            .await
            .unwrap();
    }

    for block in &canonical_blocks {
        harness_b
            .fork_choice
            .on_block(block.block.clone(), None)
            .await
            .unwrap();
    }
    harness_b
        .fork_choice
        .on_block(fork_block.block.clone(), None)
        .await
        .unwrap();

    let head_a = harness_a.fork_choice.process_head(Slot::new(2)).unwrap();
    let head_b = harness_b.fork_choice.process_head(Slot::new(2)).unwrap();
    assert_eq!(head_a, head_b);

    // With no votes the tie at slot 1 breaks to the greater root, identically on both nodes.
    let expected = if fork_block.root() > canonical_blocks[0].root() {
        fork_block.root()
    } else {
        canonical_blocks.last().unwrap().root()
    };
    assert_eq!(head_a, expected);
}

#[tokio::test]
async fn current_slot_attestations_are_queued_until_a_later_head_run() {
    let mut harness = harness();

    let block = harness.builder.generate_block_at_slot(Slot::new(1));
    harness.import(&block).await;

    // Wind the clock back to the attestation's slot so it counts as "current".
    harness.clock.set_slot(1);
    let attestation = harness.builder.attestation_for_head(&[0, 1]);
    harness.fork_choice.on_attestation(&attestation).unwrap();

    // Not applied yet: the node slot has not moved past the attestation's slot.
    harness.fork_choice.process_head(Slot::new(1)).unwrap();
    assert_eq!(harness.store.vote(0).root, types::Hash256::zero());

    harness.fork_choice.process_head(Slot::new(2)).unwrap();
    assert_eq!(harness.store.vote(0).root, block.root());
    assert_eq!(harness.store.vote(1).root, block.root());
}

#[tokio::test]
async fn past_slot_attestations_apply_immediately() {
    let mut harness = harness();

    let block = harness.builder.generate_block_at_slot(Slot::new(1));
    harness.import(&block).await;

    let attestation = harness.builder.attestation_for_head(&[3]);
    harness.fork_choice.on_attestation(&attestation).unwrap();

    assert_eq!(harness.store.vote(3).root, block.root());
}

#[tokio::test]
async fn invalid_attestations_are_rejected() {
    let mut harness = harness();

    let block = harness.builder.generate_block_at_slot(Slot::new(1));
    harness.import(&block).await;

    // Empty aggregation.
    let mut empty = harness.builder.attestation_for_head(&[0]);
    empty.attesting_indices.clear();
    assert!(matches!(
        harness.fork_choice.on_attestation(&empty),
        Err(fork_choice::Error::InvalidAttestation(
            fork_choice::InvalidAttestation::EmptyAggregationBitfield
        ))
    ));

    // Attestation for an unknown head block.
    let mut unknown = harness.builder.attestation_for_head(&[0]);
    unknown.data.beacon_block_root = types::Hash256::repeat_byte(0x42);
    assert!(matches!(
        harness.fork_choice.on_attestation(&unknown),
        Err(fork_choice::Error::InvalidAttestation(
            fork_choice::InvalidAttestation::UnknownHeadBlock { .. }
        ))
    ));

    // Attestation targeting a future epoch.
    let mut future = harness.builder.attestation_for_head(&[0]);
    future.data.target.epoch = types::Epoch::new(10_000);
    assert!(matches!(
        harness.fork_choice.on_attestation(&future),
        Err(fork_choice::Error::InvalidAttestation(
            fork_choice::InvalidAttestation::FutureEpoch { .. }
        ))
    ));
}

#[tokio::test]
async fn process_head_without_new_blocks_does_not_reorg() {
    let mut harness = harness();

    let block = harness.builder.generate_block_at_slot(Slot::new(1));
    harness.import(&block).await;
    harness.fork_choice.process_head(Slot::new(1)).unwrap();
    harness.drain_reorgs();

    // Advancing the node slot with an unchanged head is not a reorg.
    harness.fork_choice.process_head(Slot::new(2)).unwrap();
    harness.fork_choice.process_head(Slot::new(3)).unwrap();

    assert!(harness.drain_reorgs().is_empty());
    assert_eq!(harness.store.head().slot, Slot::new(3));
}
