use types::{Hash256, IndexedAttestation, Slot};

/// The tagged event vocabulary flowing between pipeline actors.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// The wall clock entered a new slot. Never dropped by queues.
    NewSlot(Slot),
    /// The head moved after importing a beacon block for this slot.
    HeadAfterNewBeaconBlock { slot: Slot, block_root: Hash256 },
    /// The heads of every shard as of this slot.
    NewShardHeads { slot: Slot, shard_heads: Vec<Hash256> },
    /// Shard blocks awaiting a crosslink, published for attesters to pick up.
    NotCrosslinkedBlocksPublished { slot: Slot, block_roots: Vec<Hash256> },
    /// An actor finished its work for the slot; per-slot state may be reset.
    SlotTerminal(Slot),
    /// Attestations produced by the attester for this slot.
    NewAttestations {
        slot: Slot,
        attestations: Vec<IndexedAttestation>,
    },
    /// The previous slot's attestations, re-published once the slot has closed.
    PrevSlotAttestationsPublished {
        slot: Slot,
        attestations: Vec<IndexedAttestation>,
    },
}

impl PipelineEvent {
    pub fn slot(&self) -> Slot {
        match self {
            PipelineEvent::NewSlot(slot)
            | PipelineEvent::SlotTerminal(slot)
            | PipelineEvent::HeadAfterNewBeaconBlock { slot, .. }
            | PipelineEvent::NewShardHeads { slot, .. }
            | PipelineEvent::NotCrosslinkedBlocksPublished { slot, .. }
            | PipelineEvent::NewAttestations { slot, .. }
            | PipelineEvent::PrevSlotAttestationsPublished { slot, .. } => *slot,
        }
    }

    /// Critical events are never dropped on queue overflow.
    pub fn is_critical(&self) -> bool {
        matches!(self, PipelineEvent::NewSlot(_))
    }
}

/// One actor of the mesh: consumes events in arrival order, publishes derived events.
///
/// Implementations keep per-slot state and must only rely on the ordering guarantees the bus
/// provides: FIFO per sender, and `NewSlot` strictly before any derived event of its slot.
pub trait EventHandler: Send {
    fn name(&self) -> &'static str;

    fn handle(&mut self, event: PipelineEvent) -> Vec<PipelineEvent>;
}
