use crate::events::{EventHandler, PipelineEvent};
use std::collections::HashMap;
use types::{IndexedAttestation, Slot};

/// Holds each slot's attestations back until the slot has passed, then re-publishes them and
/// closes the slot with a `SlotTerminal`.
#[derive(Default)]
pub struct DelayedAttestationsProcessor {
    pending: HashMap<Slot, Vec<IndexedAttestation>>,
}

impl DelayedAttestationsProcessor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventHandler for DelayedAttestationsProcessor {
    fn name(&self) -> &'static str {
        "delayed_attestations_processor"
    }

    fn handle(&mut self, event: PipelineEvent) -> Vec<PipelineEvent> {
        match event {
            PipelineEvent::NewAttestations { slot, attestations } => {
                self.pending.entry(slot).or_default().extend(attestations);
                vec![]
            }
            PipelineEvent::NewSlot(slot) if slot > Slot::new(0) => {
                let prev_slot = slot - 1;
                let attestations = self.pending.remove(&prev_slot).unwrap_or_default();
                vec![
                    PipelineEvent::PrevSlotAttestationsPublished {
                        slot: prev_slot,
                        attestations,
                    },
                    PipelineEvent::SlotTerminal(prev_slot),
                ]
            }
            _ => vec![],
        }
    }
}
