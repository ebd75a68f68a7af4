use crate::events::{EventHandler, PipelineEvent};
use crate::metrics;
use types::{AttestationData, Checkpoint, Hash256, IndexedAttestation, Slot};

/// Produces the slot's attestations once every required input has arrived: the post-import
/// head, the shard heads and the shard blocks awaiting a crosslink.
pub struct BeaconAttester {
    validator_indices: Vec<u64>,
    slots_per_epoch: u64,

    slot: Option<Slot>,
    head: Option<Hash256>,
    shard_heads: Option<Vec<Hash256>>,
    blocks_to_crosslink: Option<Vec<Hash256>>,
    published: bool,
}

impl BeaconAttester {
    pub fn new(validator_indices: Vec<u64>, slots_per_epoch: u64) -> Self {
        Self {
            validator_indices,
            slots_per_epoch,
            slot: None,
            head: None,
            shard_heads: None,
            blocks_to_crosslink: None,
            published: false,
        }
    }

    fn reset_slot_state(&mut self) {
        self.head = None;
        self.shard_heads = None;
        self.blocks_to_crosslink = None;
        self.published = false;
    }

    fn ready(&self) -> bool {
        !self.published
            && self.head.is_some()
            && self.shard_heads.is_some()
            && self.blocks_to_crosslink.is_some()
    }

    fn produce(&mut self) -> Vec<PipelineEvent> {
        let slot = match self.slot {
            Some(slot) => slot,
            None => return vec![],
        };
        let head = self.head.expect("checked by ready()");
        self.published = true;
        metrics::inc_counter_vec(&metrics::ATTESTATION_DUTIES, metrics::DUTY_PRODUCED);

        let attestation = IndexedAttestation {
            attesting_indices: self.validator_indices.clone(),
            data: AttestationData {
                slot,
                index: 0,
                beacon_block_root: head,
                source: Checkpoint::default(),
                target: Checkpoint::new(slot.epoch(self.slots_per_epoch), head),
            },
        };

        vec![PipelineEvent::NewAttestations {
            slot,
            attestations: vec![attestation],
        }]
    }
}

impl EventHandler for BeaconAttester {
    fn name(&self) -> &'static str {
        "beacon_attester"
    }

    fn handle(&mut self, event: PipelineEvent) -> Vec<PipelineEvent> {
        match event {
            PipelineEvent::NewSlot(slot) => {
                self.reset_slot_state();
                self.slot = Some(slot);
            }
            PipelineEvent::HeadAfterNewBeaconBlock { slot, block_root }
                if Some(slot) == self.slot =>
            {
                self.head = Some(block_root);
            }
            PipelineEvent::NewShardHeads { slot, shard_heads } if Some(slot) == self.slot => {
                self.shard_heads = Some(shard_heads);
            }
            PipelineEvent::NotCrosslinkedBlocksPublished { slot, block_roots }
                if Some(slot) == self.slot =>
            {
                self.blocks_to_crosslink = Some(block_roots);
            }
            PipelineEvent::SlotTerminal(slot) if Some(slot) == self.slot => {
                if !self.published {
                    metrics::inc_counter_vec(&metrics::ATTESTATION_DUTIES, metrics::DUTY_MISSED);
                }
                self.reset_slot_state();
            }
            // Inputs for other slots arrive when this actor lags; they carry no value once the
            // slot has passed.
            _ => {}
        }

        if self.ready() {
            self.produce()
        } else {
            vec![]
        }
    }
}
